//! Catalog categories.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct CategoryError(pub String);

/// The department a product is listed under.
///
/// Stored and serialized in lowercase (`women`, `men`, `kid`). Parsing is
/// case-insensitive and also accepts the plural route segment `kids`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Category {
    Women,
    Men,
    Kid,
}

impl Category {
    pub const ALL: [Self; 3] = [Self::Women, Self::Men, Self::Kid];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Women => "women",
            Self::Men => "men",
            Self::Kid => "kid",
        }
    }

    /// Path segment used by the listing routes (`/women`, `/men`, `/kids`).
    #[must_use]
    pub const fn route_segment(self) -> &'static str {
        match self {
            Self::Women => "women",
            Self::Men => "men",
            Self::Kid => "kids",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "women" => Ok(Self::Women),
            "men" => Ok(Self::Men),
            "kid" | "kids" => Ok(Self::Kid),
            _ => Err(CategoryError(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Category {
    type Error = CategoryError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_route_segments_and_stored_names() {
        for category in Category::ALL {
            assert_eq!(category.route_segment().parse::<Category>().unwrap(), category);
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert_eq!("WOMEN".parse::<Category>().unwrap(), Category::Women);
        assert!("unisex".parse::<Category>().is_err());
    }

    #[test]
    fn serde_accepts_capitalized_names() {
        let c: Category = serde_json::from_str("\"Kid\"").unwrap();
        assert_eq!(c, Category::Kid);
        let c: Category = serde_json::from_str("\"WOMEN\"").unwrap();
        assert_eq!(c, Category::Women);
        assert!(serde_json::from_str::<Category>("\"hats\"").is_err());
        assert_eq!(serde_json::to_string(&Category::Men).unwrap(), "\"men\"");
    }
}
