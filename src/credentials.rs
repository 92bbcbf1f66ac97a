//! Exchange API credentials and the lookup capability that resolves them.
//!
//! Credentials are resolved once per request from an identity (the chat
//! sender for the webhook, [`DEFAULT_IDENTITY`] for the REST endpoints) and
//! then threaded through the pipeline as a plain value. Nothing here is
//! process-global, so two senders can never see each other's keys.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use thiserror::Error;

/// Identity used by the structured REST endpoints.
pub const DEFAULT_IDENTITY: &str = "default";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("No credentials configured for identity {0}")]
    UnknownIdentity(String),
    #[error("Credential lookup failed: {0}")]
    Lookup(String),
}

/// API key / secret pair for one exchange account.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    secret_key: SecretString,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: SecretString::from(secret_key.into()),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Only for signing. Never log the return value.
    pub fn expose_secret(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn resolve(&self, identity: &str) -> Result<Credentials, CredentialError>;
}

/// Credentials loaded once from configuration.
///
/// `accounts` is keyed by identity (a WhatsApp sender id). The default
/// account only answers [`DEFAULT_IDENTITY`]; unknown chat senders are
/// refused rather than silently trading on the operator's account.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentialProvider {
    default: Option<Credentials>,
    accounts: HashMap<String, Credentials>,
}

impl StaticCredentialProvider {
    pub fn new(default: Option<Credentials>, accounts: HashMap<String, Credentials>) -> Self {
        Self { default, accounts }
    }

    pub fn with_default(credentials: Credentials) -> Self {
        Self::new(Some(credentials), HashMap::new())
    }

    pub fn insert(&mut self, identity: impl Into<String>, credentials: Credentials) {
        self.accounts.insert(identity.into(), credentials);
    }

    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.accounts.is_empty()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn resolve(&self, identity: &str) -> Result<Credentials, CredentialError> {
        if let Some(creds) = self.accounts.get(identity) {
            return Ok(creds.clone());
        }
        if identity == DEFAULT_IDENTITY {
            if let Some(creds) = &self.default {
                return Ok(creds.clone());
            }
        }
        Err(CredentialError::UnknownIdentity(identity.to_string()))
    }
}
