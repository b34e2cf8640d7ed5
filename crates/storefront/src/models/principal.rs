//! Request principal.

use serde::{Deserialize, Serialize};

use wardrobe_core::UserId;

/// The authenticated caller, derived from a verified token.
///
/// Serialized form is the token payload's identity part: `{"id": 12}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
}
