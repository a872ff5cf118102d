//! The credential-check seam.
//!
//! The connection handler only ever asks one question — "is this
//! username/password pair acceptable?" — and treats the answer as opaque.
//! Matching rules (case sensitivity, storage format, external directories)
//! are entirely the implementation's business.
//!
//! [`StaticCredentialStore`] is the built-in implementation backed by the
//! `[[users]]` entries of the config file. Tests use the generated
//! [`MockAuthenticator`].

use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::infrastructure::storage::config::UserEntry;

/// Decides whether a login attempt's credentials are acceptable.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> bool;
}

/// In-memory credential store loaded from configuration.
///
/// Performs exact, case-sensitive equality on both fields. An unknown
/// username and a wrong password are indistinguishable to the caller.
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    credentials: HashMap<String, String>,
}

impl StaticCredentialStore {
    /// Builds the store from the config file's user list. Later duplicate
    /// usernames override earlier ones.
    pub fn from_users(users: &[UserEntry]) -> Self {
        Self {
            credentials: users
                .iter()
                .map(|entry| (entry.username.clone(), entry.password.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl Authenticator for StaticCredentialStore {
    async fn authenticate(&self, username: &str, password: &str) -> bool {
        self.credentials
            .get(username)
            .is_some_and(|stored| stored == password)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
