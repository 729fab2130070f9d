//! Credential acquisition for the remote chat API
//!
//! Thin collaborator: the scraper asks a [`CredentialProvider`] for a
//! credential at the start of every run and fails with
//! [`Error::Unauthenticated`](crate::error::Error::Unauthenticated) when none
//! is available. Storage and interactive prompting live outside this crate.

use crate::error::{Error, Result};
use async_trait::async_trait;

/// An opaque bearer-style credential for the remote API
///
/// Holds the exact `Authorization` header value. The token never appears in
/// `Debug` output.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw header value (sent verbatim)
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Build a bot credential (`Bot <token>` header form)
    pub fn bot(token: impl AsRef<str>) -> Self {
        Self(format!("Bot {}", token.as_ref()))
    }

    /// The `Authorization` header value
    pub fn authorization(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

/// Source of credentials for a scrape run
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Produce a credential, or fail with `Unauthenticated` when absent
    async fn credential(&self) -> Result<Credential>;
}

/// Provider returning a credential fixed at construction time
pub struct StaticCredential(Credential);

impl StaticCredential {
    /// Wrap an already-acquired credential
    pub fn new(credential: Credential) -> Self {
        Self(credential)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn credential(&self) -> Result<Credential> {
        Ok(self.0.clone())
    }
}

/// Provider reading the credential from an environment variable at call time
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    /// Read the credential from `var` each time one is requested
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredential {
    async fn credential(&self) -> Result<Credential> {
        match std::env::var(&self.var) {
            Ok(token) if !token.is_empty() => Ok(Credential::new(token)),
            _ => Err(Error::Unauthenticated(format!(
                "environment variable {} is not set",
                self.var
            ))),
        }
    }
}
