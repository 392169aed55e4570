//! Credential provider boundary for the sync account.
//!
//! Token acquisition (OAuth, account pickers, keychains) belongs to the host
//! application; the core only asks a [`CredentialProvider`] for a credential
//! right before a sync run.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::util::{normalize_text_option, unix_timestamp_now};

const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Access credential for one sync account
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub account: String,
    pub token: String,
    /// Expiry as Unix seconds, `None` for non-expiring credentials
    pub expires_at: Option<i64>,
}

impl Credential {
    pub fn new(account: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            token: token.into(),
            expires_at: None,
        }
    }

    #[must_use]
    pub const fn with_expiry(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credential")
            .field("account", &self.account)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of credentials for sync accounts.
///
/// Fails with [`Error::NoCredential`] when nothing is stored for the account
/// and with [`Error::AuthExpired`] when the stored credential is no longer valid.
pub trait CredentialProvider: Send + Sync {
    fn credential(&self, account: &str) -> Result<Credential>;
}

/// In-memory credential provider keyed by account identifier
#[derive(Clone, Default)]
pub struct StaticCredentialProvider {
    credentials: HashMap<String, Credential>,
}

impl StaticCredentialProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a credential, ignoring blank tokens
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        if normalize_text_option(Some(credential.token.clone())).is_some() {
            self.credentials
                .insert(credential.account.trim().to_string(), credential);
        }
        self
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn credential(&self, account: &str) -> Result<Credential> {
        let account = account.trim();
        let credential = self
            .credentials
            .get(account)
            .ok_or_else(|| Error::NoCredential(format!("no credential stored for {account}")))?;

        if credential.is_expired() {
            return Err(Error::AuthExpired(format!(
                "credential for {account} has expired"
            )));
        }
        Ok(credential.clone())
    }
}
