//! Credential resolution for storage clients.
//!
//! Storage clients receive a [`CredentialsProvider`] and ask it for a key
//! pair; they never inspect where the pair came from.

use std::env;
use std::fmt;

use tracing::debug;

pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";

/// An access key pair. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// Source of credentials for a storage client.
pub trait CredentialsProvider: Send + Sync {
    /// Short label used in logs, never the credentials themselves.
    fn name(&self) -> &'static str;

    /// Resolve a key pair, or `None` if this source has nothing to offer.
    fn credentials(&self) -> Option<Credentials>;
}

/// Credentials given explicitly, e.g. on the command line.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    key: Option<String>,
    secret: Option<String>,
}

impl StaticCredentials {
    pub fn new(key: Option<String>, secret: Option<String>) -> Self {
        Self { key, secret }
    }
}

impl CredentialsProvider for StaticCredentials {
    fn name(&self) -> &'static str {
        "static"
    }

    fn credentials(&self) -> Option<Credentials> {
        match (&self.key, &self.secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some(Credentials::new(key.clone(), secret.clone()))
            }
            _ => None,
        }
    }
}

/// Credentials from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials;

impl CredentialsProvider for EnvCredentials {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn credentials(&self) -> Option<Credentials> {
        let key = env::var(ACCESS_KEY_ENV).ok().filter(|k| !k.is_empty())?;
        let secret = env::var(SECRET_KEY_ENV).ok().filter(|s| !s.is_empty())?;
        Some(Credentials::new(key, secret))
    }
}

/// Tries each provider in order and returns the first key pair found.
#[derive(Default)]
pub struct ChainCredentials {
    providers: Vec<Box<dyn CredentialsProvider>>,
}

impl ChainCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl CredentialsProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl CredentialsProvider for ChainCredentials {
    fn name(&self) -> &'static str {
        "chain"
    }

    fn credentials(&self) -> Option<Credentials> {
        self.providers.iter().find_map(|p| {
            let found = p.credentials();
            debug!(provider = p.name(), found = found.is_some(), "Resolving credentials");
            found
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("AKIDEXAMPLE", "very-secret");
        let printed = format!("{creds:?}");
        assert!(printed.contains("AKIDEXAMPLE"));
        assert!(!printed.contains("very-secret"));
    }

    #[test]
    fn static_requires_both_halves() {
        assert!(StaticCredentials::new(Some("k".into()), None).credentials().is_none());
        assert!(StaticCredentials::new(Some("k".into()), Some(String::new()))
            .credentials()
            .is_none());
        assert_eq!(
            StaticCredentials::new(Some("k".into()), Some("s".into())).credentials(),
            Some(Credentials::new("k", "s"))
        );
    }

    #[test]
    #[serial]
    fn chain_prefers_first_provider() {
        env::set_var(ACCESS_KEY_ENV, "env-key");
        env::set_var(SECRET_KEY_ENV, "env-secret");

        let chain = ChainCredentials::new()
            .with(StaticCredentials::new(Some("cli-key".into()), Some("cli-secret".into())))
            .with(EnvCredentials);
        assert_eq!(chain.credentials(), Some(Credentials::new("cli-key", "cli-secret")));

        let chain = ChainCredentials::new()
            .with(StaticCredentials::new(None, None))
            .with(EnvCredentials);
        assert_eq!(chain.credentials(), Some(Credentials::new("env-key", "env-secret")));

        env::remove_var(ACCESS_KEY_ENV);
        env::remove_var(SECRET_KEY_ENV);
    }

    #[test]
    #[serial]
    fn empty_chain_yields_nothing() {
        env::remove_var(ACCESS_KEY_ENV);
        env::remove_var(SECRET_KEY_ENV);
        let chain = ChainCredentials::new().with(EnvCredentials);
        assert!(chain.credentials().is_none());
    }
}
