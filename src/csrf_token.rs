use crate::crypto::{self, RandomSourceError, SecureRandomSource};

/// Number of random bytes backing a CSRF token.
pub(crate) const CSRF_TOKEN_BYTES: usize = 16;

/// Cryptographically secure token round-tripped through the authorization redirect as `state`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CsrfToken {
    csrf_token: String,
}

impl CsrfToken {
    /// Generate a new CSRF token from 16 bytes of cryptographically secure random data,
    /// base64 url encoded as a 22 character string.
    pub fn generate(random: &impl SecureRandomSource) -> Result<Self, RandomSourceError> {
        let bytes = crypto::random_bytes::<CSRF_TOKEN_BYTES>(random)?;
        Ok(Self {
            csrf_token: crypto::base64_url_encode(bytes),
        })
    }

    pub(crate) fn from_stored(csrf_token: String) -> Self {
        Self { csrf_token }
    }

    pub fn as_str(&self) -> &str {
        &self.csrf_token
    }

    /// Exact comparison against a `state` value received on the callback.
    ///
    /// Not constant time. The token is single use, so an attacker gets no repeated attempts
    /// against the same expected value.
    pub fn matches(&self, received: Option<&str>) -> bool {
        match received {
            Some(received) => !self.csrf_token.is_empty() && self.csrf_token == received,
            None => false,
        }
    }
}
