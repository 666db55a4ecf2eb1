//! Scatch storefront library.
//!
//! The whole web application lives here so the binary stays a thin
//! launcher and the integration tests can drive [`app::router`] directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
