use crate::crypto::base64_url_decode;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};
use std::collections::HashMap;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum IdTokenFormatError {
    #[snafu(display(
        "IdTokenFormatError: Expected 3 dot separated segments, got {segments}"
    ))]
    SegmentCount { segments: usize },

    #[snafu(display("IdTokenFormatError: Payload is not valid base64url: {source}"))]
    Base64 { source: base64::DecodeError },

    #[snafu(display("IdTokenFormatError: Payload is not a JSON object: {source}"))]
    Json { source: serde_json::Error },
}

/// Claims of an Entra ID identity token we care about.
///
/// See: <https://learn.microsoft.com/en-us/entra/identity-platform/id-token-claims-reference>
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct EntraIdTokenClaims {
    /// (name) Human readable display name of the subject.
    pub name: Option<String>,

    /// (email) Only present for accounts with an email address and when the `email` scope was
    /// requested.
    pub email: Option<String>,

    /// (`preferred_username`) Usually the UPN, which commonly looks like an email address.
    pub preferred_username: Option<String>,

    /// (oid) Immutable id of the user across all applications of the tenant.
    pub oid: Option<String>,

    /// (sub) Pairwise subject identifier, unique per application.
    pub sub: Option<String>,

    /// (tid) Tenant the user signed in to.
    pub tid: Option<String>,

    #[serde(flatten)]
    pub remaining: HashMap<String, serde_json::Value>,
}

/// Minimal identity of the signed-in user.
///
/// Every field is always present, but may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct UserIdentity {
    pub display_name: String,
    pub email: String,
    pub subject_id: String,
}

impl From<EntraIdTokenClaims> for UserIdentity {
    fn from(claims: EntraIdTokenClaims) -> Self {
        Self {
            display_name: claims.name.unwrap_or_default(),
            email: claims
                .email
                .or(claims.preferred_username)
                .unwrap_or_default(),
            subject_id: claims.oid.or(claims.sub).unwrap_or_default(),
        }
    }
}

/// Read the payload of an identity token.
///
/// This checks the structure only. The signature is NOT verified. Use
/// [`crate::token_validation::validate`] when the claims must be trusted.
pub fn decode_claims(id_token: &str) -> Result<EntraIdTokenClaims, IdTokenFormatError> {
    let segments = id_token.split('.').collect::<Vec<_>>();
    ensure!(
        segments.len() == 3,
        SegmentCountSnafu {
            segments: segments.len()
        }
    );

    let payload = base64_url_decode(segments[1]).context(Base64Snafu {})?;
    serde_json::from_slice::<EntraIdTokenClaims>(&payload).context(JsonSnafu {})
}

/// Structural decode of an identity token into a [`UserIdentity`].
pub fn decode_identity(id_token: &str) -> Result<UserIdentity, IdTokenFormatError> {
    decode_claims(id_token).map(UserIdentity::from)
}
