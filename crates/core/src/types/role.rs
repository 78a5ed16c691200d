//! Account roles.

use serde::{Deserialize, Serialize};

/// Account role with different permission levels.
///
/// Every account receives a profile row with `client` on sign-up; the two
/// elevated roles unlock the administration area. Rows carrying a role
/// outside this set fail to parse, which downstream access checks treat as
/// unauthorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular shopper; no administration access.
    Client,
    /// Store management access, but may not change account roles.
    Moderator,
    /// Full access including role management.
    Admin,
}

impl Role {
    /// Whether this role may hand out roles to other accounts.
    #[must_use]
    pub const fn can_assign_roles(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Moderator => write!(f, "moderator"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}
