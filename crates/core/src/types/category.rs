//! Product categories.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a known [`Category`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct CategoryError(String);

/// The fixed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_category", rename_all = "snake_case")
)]
pub enum Category {
    Backpacks,
    Handbags,
    Clutches,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 3] = [Self::Backpacks, Self::Handbags, Self::Clutches];

    /// Display label, also the value used in query strings and forms.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Backpacks => "Backpacks",
            Self::Handbags => "Handbags",
            Self::Clutches => "Clutches",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CategoryError(wanted.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("handbags".parse::<Category>(), Ok(Category::Handbags));
        assert_eq!(" Clutches ".parse::<Category>(), Ok(Category::Clutches));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("Shoes".parse::<Category>().is_err());
        assert!("".parse::<Category>().is_err());
    }

    #[test]
    fn test_display_matches_label() {
        for category in Category::ALL {
            assert_eq!(category.to_string(), category.label());
        }
    }
}
