//! Authentication session types.

use serde::{Deserialize, Serialize};
use vitrine_core::AccountId;

/// The authenticated identity reported by the backend's auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Auth identity; `profiles` rows are keyed by this value.
    pub id: AccountId,
    pub email: String,
}

/// A signed-in session.
///
/// The access token authenticates every subsequent table and storage call,
/// so row-level rules on the backend see the account's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

impl AuthSession {
    /// The signed-in account's ID.
    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        self.user.id
    }
}
