//! Authentication service
//!
//! Login against the credential store, token authentication, and logout
//! through the revocation ledger.
//!
//! Authentication checks the ledger before the signature: a revoked token is
//! rejected as `Revoked` even while its signature and expiry are still good.

use std::sync::Arc;

use crate::db::repositories::RevocationRepository;
use crate::models::Identity;
use crate::services::credentials::CredentialStore;
use crate::services::token::{TokenError, TokenIssuer};

/// Error types for authentication and authorization
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Access token missing")]
    MissingToken,

    #[error("Token has been revoked")]
    Revoked,

    #[error("Invalid or expired token")]
    InvalidOrExpired,

    #[error("Forbidden: admin access only")]
    Forbidden,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => AuthError::InvalidOrExpired,
            TokenError::Signing(msg) => AuthError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub identity: Identity,
}

pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
    revocations: Arc<dyn RevocationRepository>,
    admin_username: String,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        issuer: TokenIssuer,
        revocations: Arc<dyn RevocationRepository>,
        admin_username: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            issuer,
            revocations,
            admin_username: admin_username.into(),
        }
    }

    /// Check credentials and issue a token.
    ///
    /// No token is produced unless the password matches.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        if !self.credentials.verify(username, password).await? {
            tracing::debug!("Rejected login for {}", username);
            return Err(AuthError::InvalidCredentials);
        }

        let identity = Identity::for_login(username, &self.admin_username);
        let token = self.issuer.issue(&identity)?;

        tracing::info!(username = %identity.username, is_admin = identity.is_admin, "User logged in");
        Ok(LoginOutcome { token, identity })
    }

    /// Admit a bearer token, returning the identity it carries
    pub async fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        if self.revocations.is_revoked(token).await? {
            return Err(AuthError::Revoked);
        }

        Ok(self.issuer.verify(token)?)
    }

    /// Revoke a token. Returns once the revocation is persisted.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.revocations.revoke(token).await?;
        Ok(())
    }

    /// Admin gate, composed after `authenticate`
    pub fn require_admin(identity: &Identity) -> Result<(), AuthError> {
        if identity.is_admin {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}
