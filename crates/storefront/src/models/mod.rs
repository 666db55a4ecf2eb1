//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from database row
//! types. Every storage backend produces and consumes exactly these.

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{CartIncrement, CartItem, CartMutation};
pub use order::Order;
pub use product::{Product, ProductFilter, ProductImage, ProductInput, ProductValidationError};
pub use session::{Notice, NoticeKind};
pub use user::{Admin, NewAdmin, NewUser, User};
