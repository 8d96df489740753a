//! Credential store
//!
//! Read-only lookup of username/password pairs, consulted once per login.
//! The file form is a JSON array:
//!
//! ```json
//! [
//!   { "username": "admin@mail.com", "password_hash": "$argon2id$v=19$..." }
//! ]
//! ```
//!
//! Hashes are produced with the `hash-password` binary.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::services::password::{hash_password, verify_password};

/// One entry of the credential file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password_hash: String,
}

/// Credential lookup used by login
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Whether `password` is the secret for `username`.
    ///
    /// Unknown usernames and wrong passwords are both `Ok(false)`.
    async fn verify(&self, username: &str, password: &str) -> Result<bool>;
}

/// Credentials loaded once into memory
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    hashes: HashMap<String, String>,
}

impl StaticCredentialStore {
    pub fn new(credentials: impl IntoIterator<Item = Credential>) -> Self {
        Self {
            hashes: credentials
                .into_iter()
                .map(|c| (c.username, c.password_hash))
                .collect(),
        }
    }

    /// Load the credential file.
    ///
    /// A missing file yields an empty store, so nobody can log in.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Credential file {} not found; no user can log in", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credential file '{}'", path.display()))?;
        let credentials: Vec<Credential> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse credential file '{}'", path.display()))?;

        Ok(Self::new(credentials))
    }

    /// Build a store from plaintext pairs, hashing each password
    pub fn from_plaintext<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let credentials = pairs
            .into_iter()
            .map(|(username, password)| {
                Ok(Credential {
                    username: username.to_string(),
                    password_hash: hash_password(password)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(credentials))
    }

    pub fn boxed(self) -> Arc<dyn CredentialStore> {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn verify(&self, username: &str, password: &str) -> Result<bool> {
        let Some(hash) = self.hashes.get(username) else {
            return Ok(false);
        };

        let hash = hash.clone();
        let password = password.to_string();
        // Argon2 is CPU-bound; keep it off the async workers
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .context("Password verification task failed")?
    }
}
