use crate::crypto::RandomSourceError;
use crate::request::RequestError;
use crate::response::ErrorResponse;
use crate::token_claims::IdTokenFormatError;
use snafu::Snafu;
use std::fmt::{Display, Formatter};

/// Every way a login or session operation can fail.
///
/// All variants are recovered at the UI boundary. None of them is retried automatically.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EntraAuthError {
    /// Fatal. Surfaced before any redirect happens.
    #[snafu(display("EntraAuthError: Invalid configuration: {message}"))]
    Configuration { message: String },

    /// Fatal configuration error of the platform: there is no secure random source.
    #[snafu(display("EntraAuthError: Invalid configuration: {source}"))]
    NoSecureRandom { source: RandomSourceError },

    /// The identity provider redirected back with an `error`.
    #[snafu(display(
        "EntraAuthError: Authorization error: {} - {}",
        error_response.error,
        error_response.error_description.as_deref().unwrap_or("No description")
    ))]
    Authorization { error_response: ErrorResponse },

    /// Malformed callback, e.g. neither `code` nor `error` present.
    #[snafu(display("EntraAuthError: Protocol error: {message}"))]
    Protocol { message: String },

    #[snafu(display("EntraAuthError: Possible CSRF attack detected: {violation}"))]
    Csrf { violation: CsrfViolation },

    #[snafu(display("EntraAuthError: {source}"))]
    TokenExchange { source: RequestError },

    #[snafu(display("EntraAuthError: Could not decode ID token: {source}"))]
    Format { source: IdTokenFormatError },

    /// Broken invariants of our own storage.
    #[snafu(display("EntraAuthError: Internal error: {message}"))]
    Internal { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfViolation {
    /// No login was begun in this session, or its state was already consumed.
    NoPendingAuthorization,

    /// A login is pending, but the callback carries a different (or no) `state`.
    StateMismatch,
}

impl Display for CsrfViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CsrfViolation::NoPendingAuthorization => f.write_str("no pending authorization"),
            CsrfViolation::StateMismatch => f.write_str("state mismatch"),
        }
    }
}

/// Flat classification of [`EntraAuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Authorization,
    Protocol,
    Csrf,
    TokenExchange,
    Format,
    Internal,
}

impl EntraAuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EntraAuthError::Configuration { .. } | EntraAuthError::NoSecureRandom { .. } => {
                ErrorKind::Configuration
            }
            EntraAuthError::Authorization { .. } => ErrorKind::Authorization,
            EntraAuthError::Protocol { .. } => ErrorKind::Protocol,
            EntraAuthError::Csrf { .. } => ErrorKind::Csrf,
            EntraAuthError::TokenExchange { .. } => ErrorKind::TokenExchange,
            EntraAuthError::Format { .. } => ErrorKind::Format,
            EntraAuthError::Internal { .. } => ErrorKind::Internal,
        }
    }
}
