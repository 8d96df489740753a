//! Identity model

use serde::{Deserialize, Serialize};

/// Who a request acts as, as embedded in a signed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub username: String,
    pub is_admin: bool,
}

impl Identity {
    /// Derive the identity for a username that passed the credential check.
    ///
    /// Exactly one username (`admin_username`) is granted admin privileges.
    pub fn for_login(username: impl Into<String>, admin_username: &str) -> Self {
        let username = username.into();
        let is_admin = username == admin_username;
        Self { username, is_admin }
    }
}
