//! Account identity and credentials.

use std::fmt;

/// Exchange API credentials for one account.
///
/// Immutable once built. The secret never appears in `Debug` output,
/// so credentials can be logged as part of larger structures.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
    /// Exchange top-level domain, lowercase (e.g., "us", "com").
    domain: String,
}

impl Credentials {
    pub fn new(api_key: &str, api_secret: &str, domain: &str) -> Self {
        Self {
            api_key: api_key.trim().to_string(),
            api_secret: api_secret.trim().to_string(),
            domain: domain.trim().to_lowercase(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Host name the credentials belong to, for log lines.
    pub fn host(&self) -> String {
        format!("binance.{}", self.domain)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}
