use leptos_router::params::{ParamsError, ParamsMap};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Debug, Display, Formatter};
use url::Url;

/// What the identity provider handed back to our redirect uri.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub enum CallbackResponse {
    SuccessfulLogin(SuccessLoginResponse),
    Error(ErrorResponse),

    /// Neither `code` nor `error` present.
    NoCode { state: Option<String> },
}

#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SuccessLoginResponse {
    pub code: String,
    pub state: Option<String>,
}

impl Debug for SuccessLoginResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuccessLoginResponse")
            .field("code", &"<redacted>")
            .field("state", &self.state)
            .finish()
    }
}

impl CallbackResponse {
    /// Parse the query of a full redirect-back url.
    pub fn from_url(callback_url: &Url) -> Self {
        Self::from_lookup(|key| {
            callback_url
                .query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        })
    }

    /// `error` wins over `code`. Empty values count as absent.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(error) = lookup("error") {
            return CallbackResponse::Error(ErrorResponse {
                error: OidcErrorCode::from(error.as_str()),
                error_description: lookup("error_description"),
                error_uri: lookup("error_uri"),
            });
        }

        match lookup("code") {
            Some(code) => CallbackResponse::SuccessfulLogin(SuccessLoginResponse {
                code,
                state: lookup("state"),
            }),
            None => CallbackResponse::NoCode {
                state: lookup("state"),
            },
        }
    }

    /// Whether the parameters look like the provider redirected back to us at all.
    pub fn is_callback(&self) -> bool {
        match self {
            CallbackResponse::SuccessfulLogin(_) | CallbackResponse::Error(_) => true,
            CallbackResponse::NoCode { .. } => false,
        }
    }
}

/// A trait for converting parameters from a map to a structure for `CallbackResponse`.
impl leptos_router::params::Params for CallbackResponse {
    fn from_map(map: &ParamsMap) -> Result<Self, ParamsError> {
        Ok(Self::from_lookup(|key| map.get(key)))
    }
}

/// Successful response of the token endpoint.
///
/// Every field is optional on the wire. A login is only completed when `access_token` is
/// present, see [`crate::handle_callback`].
#[derive(Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,

    /// Lifetime of the access token in seconds, relative to the moment of receipt.
    #[serde(default, deserialize_with = "deserialize_expires_in")]
    pub expires_in: Option<i64>,

    pub token_type: Option<String>,
    pub scope: Option<String>,
}

impl Debug for TokenResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let redact = |token: &Option<String>| token.as_ref().map(|_| "<redacted>");
        f.debug_struct("TokenResponse")
            .field("access_token", &redact(&self.access_token))
            .field("id_token", &redact(&self.id_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

// Some endpoints send `expires_in` as a string.
fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawExpiresIn {
        Number(i64),
        Text(String),
    }

    match Option::<RawExpiresIn>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawExpiresIn::Number(seconds)) => Ok(Some(seconds)),
        Some(RawExpiresIn::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// See [RFC 6749 Section 4.1.2.1](https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1)
/// and [Section 5.2](https://datatracker.ietf.org/doc/html/rfc6749#section-5.2) for details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum KnownOidcErrorCode {
    /// The request is missing a required parameter, includes an invalid parameter value,
    /// includes a parameter more than once, or is otherwise malformed.
    #[serde(rename = "invalid_request")]
    InvalidRequest,

    /// Client authentication failed.
    #[serde(rename = "invalid_client")]
    InvalidClient,

    /// The provided authorization grant is invalid, expired, revoked, does not match the
    /// redirection URI used in the authorization request, or was issued to another client.
    /// Also returned when the `code_verifier` does not match the `code_challenge`.
    #[serde(rename = "invalid_grant")]
    InvalidGrant,

    #[serde(rename = "unauthorized_client")]
    UnauthorizedClient,

    #[serde(rename = "unsupported_grant_type")]
    UnsupportedGrantType,

    #[serde(rename = "invalid_scope")]
    InvalidScope,

    /// The resource owner or authorization server denied the request.
    #[serde(rename = "access_denied")]
    AccessDenied,

    #[serde(rename = "unsupported_response_type")]
    UnsupportedResponseType,

    #[serde(rename = "server_error")]
    ServerError,

    #[serde(rename = "temporarily_unavailable")]
    TemporarilyUnavailable,

    /// OIDC: the user must interact with the provider before a login can complete.
    #[serde(rename = "interaction_required")]
    InteractionRequired,

    #[serde(rename = "login_required")]
    LoginRequired,

    #[serde(rename = "consent_required")]
    ConsentRequired,
}

impl KnownOidcErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownOidcErrorCode::InvalidRequest => "invalid_request",
            KnownOidcErrorCode::InvalidClient => "invalid_client",
            KnownOidcErrorCode::InvalidGrant => "invalid_grant",
            KnownOidcErrorCode::UnauthorizedClient => "unauthorized_client",
            KnownOidcErrorCode::UnsupportedGrantType => "unsupported_grant_type",
            KnownOidcErrorCode::InvalidScope => "invalid_scope",
            KnownOidcErrorCode::AccessDenied => "access_denied",
            KnownOidcErrorCode::UnsupportedResponseType => "unsupported_response_type",
            KnownOidcErrorCode::ServerError => "server_error",
            KnownOidcErrorCode::TemporarilyUnavailable => "temporarily_unavailable",
            KnownOidcErrorCode::InteractionRequired => "interaction_required",
            KnownOidcErrorCode::LoginRequired => "login_required",
            KnownOidcErrorCode::ConsentRequired => "consent_required",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OidcErrorCode {
    Known(KnownOidcErrorCode),
    Unknown(String),
}

impl OidcErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            OidcErrorCode::Known(known) => known.as_str(),
            OidcErrorCode::Unknown(unknown) => unknown.as_str(),
        }
    }
}

impl From<&str> for OidcErrorCode {
    fn from(code: &str) -> Self {
        serde_json::from_value::<KnownOidcErrorCode>(serde_json::Value::String(code.to_owned()))
            .map(OidcErrorCode::Known)
            .unwrap_or_else(|_| OidcErrorCode::Unknown(code.to_owned()))
    }
}

impl Display for OidcErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth error response, either from the callback query or from the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorResponse {
    /// The error code (e.g., `access_denied` or `invalid_grant`).
    pub error: OidcErrorCode,

    /// OPTIONAL. Human-readable ASCII text providing additional information.
    pub error_description: Option<String>,

    /// OPTIONAL. A URI identifying a human-readable web page with information about the error.
    pub error_uri: Option<String>,
}

impl ErrorResponse {
    pub fn is_access_denied(&self) -> bool {
        self.error == OidcErrorCode::Known(KnownOidcErrorCode::AccessDenied)
    }
}
