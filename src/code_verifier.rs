use crate::crypto::{self, RandomSourceError, SecureRandomSource};
use std::fmt::{Debug, Formatter};

/// Number of random bytes backing a code verifier. Encodes to 43 characters, the RFC 7636 minimum.
pub(crate) const CODE_VERIFIER_BYTES: usize = 32;

#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CodeVerifier {
    code_verifier: String,
}

impl CodeVerifier {
    /// see: https://datatracker.ietf.org/doc/html/rfc7636
    pub(crate) fn generate(random: &impl SecureRandomSource) -> Result<Self, RandomSourceError> {
        let bytes = crypto::random_bytes::<CODE_VERIFIER_BYTES>(random)?;
        Ok(Self {
            code_verifier: crypto::base64_url_encode(bytes),
        })
    }

    /// Wrap a previously generated verifier, e.g. one read back from session storage.
    pub(crate) fn from_stored(code_verifier: String) -> Self {
        Self { code_verifier }
    }

    pub fn to_code_challenge(&self) -> CodeChallenge {
        let digest = crypto::sha256(self.code_verifier.as_bytes());

        CodeChallenge {
            code_challenge: crypto::base64_url_encode(digest),
            code_challenge_method: CodeChallengeMethod::S256,
        }
    }

    pub fn code_verifier(&self) -> &str {
        self.code_verifier.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.code_verifier.is_empty()
    }
}

// The verifier must never end up in logs.
impl Debug for CodeVerifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeVerifier")
            .field("code_verifier", &"<redacted>")
            .finish()
    }
}

/// Only `S256` is supported. The `plain` method is never used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeChallengeMethod {
    S256,
}

impl CodeChallengeMethod {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            CodeChallengeMethod::S256 => "S256",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChallenge {
    code_challenge: String,
    code_challenge_method: CodeChallengeMethod,
}

impl CodeChallenge {
    pub fn code_challenge(&self) -> &str {
        self.code_challenge.as_str()
    }

    pub fn code_challenge_method(&self) -> CodeChallengeMethod {
        self.code_challenge_method
    }
}
