use crate::TokenEndpoint;
use crate::response::TokenResponse;
use http::StatusCode;
use reqwest::IntoUrl;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};
use std::fmt::{Debug, Formatter};
use std::time::Duration;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RequestError {
    #[snafu(display("RequestError: Could not send request: {source}"))]
    Send { source: reqwest::Error },

    #[snafu(display("RequestError: Request timed out"))]
    Timeout { source: reqwest::Error },

    #[snafu(display("RequestError: Could not decode payload: {source}"))]
    Decode { source: reqwest::Error },

    #[snafu(display("RequestError: Token exchange failed: {description}"))]
    ErrResponse {
        status: StatusCode,
        /// `error_description` of the response body, or the status text if the body carried none.
        description: String,
    },
}

impl RequestError {
    fn from_send(source: reqwest::Error) -> Self {
        if source.is_timeout() {
            RequestError::Timeout { source }
        } else {
            RequestError::Send { source }
        }
    }
}

/// Form body of the authorization code grant.
///
/// There is no client secret. Public clients prove possession through the `code_verifier`.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRequest<'a> {
    pub client_id: &'a str,
    pub code: &'a str,
    pub redirect_uri: &'a str,
    pub code_verifier: &'a str,
}

impl TokenRequest<'_> {
    pub fn form_params(&self) -> [(&'static str, &str); 5] {
        [
            ("client_id", self.client_id),
            ("grant_type", "authorization_code"),
            ("code", self.code),
            ("redirect_uri", self.redirect_uri),
            ("code_verifier", self.code_verifier),
        ]
    }
}

impl Debug for TokenRequest<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// Performs the server-to-server code-to-token exchange.
#[allow(async_fn_in_trait)]
pub trait TokenClient {
    async fn exchange_code_for_token(
        &self,
        token_endpoint: TokenEndpoint,
        request: TokenRequest<'_>,
    ) -> Result<TokenResponse, RequestError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTokenClient {
    client: reqwest::Client,
    #[cfg_attr(target_arch = "wasm32", allow(dead_code))]
    timeout: Option<Duration>,
}

impl ReqwestTokenClient {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

impl Default for ReqwestTokenClient {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TokenClient for ReqwestTokenClient {
    async fn exchange_code_for_token(
        &self,
        token_endpoint: TokenEndpoint,
        request: TokenRequest<'_>,
    ) -> Result<TokenResponse, RequestError> {
        let builder = self
            .client
            .post(token_endpoint)
            .form(&request.form_params());

        // The browser fetch api offers no timeout.
        #[cfg(not(target_arch = "wasm32"))]
        let builder = match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        };

        let response = builder.send().await.map_err(RequestError::from_send)?;
        let status = response.status();

        if !status.is_success() {
            let description = error_description_of(status, response).await;
            tracing::error!(%status, description = description.as_str(), "Token exchange was rejected.");
            return ErrResponseSnafu {
                status,
                description,
            }
            .fail();
        }

        response.json::<TokenResponse>().await.context(DecodeSnafu {})
    }
}

async fn error_description_of(status: StatusCode, response: reqwest::Response) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        error_description: Option<String>,
    }

    let status_text = || {
        status
            .canonical_reason()
            .unwrap_or(status.as_str())
            .to_owned()
    };

    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            tracing::debug!(?err, "Could not read token endpoint error body.");
            return status_text();
        }
    };

    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody {
            error_description: Some(description),
            ..
        }) if !description.is_empty() => description,
        Ok(ErrorBody {
            error: Some(error), ..
        }) if !error.is_empty() => error,
        _ => status_text(),
    }
}

/// Fetch the signing keys of the tenant. Keys that cannot be parsed are skipped.
///
/// `timeout` limits the whole request on native targets, like
/// [`ReqwestTokenClient::new`] does for the code exchange.
pub async fn retrieve_jwk_set(
    jwk_set_endpoint: impl IntoUrl,
    timeout: Option<Duration>,
) -> Result<jsonwebtoken::jwk::JwkSet, RequestError> {
    #[derive(Deserialize)]
    pub struct RawJwkSet {
        pub keys: Vec<serde_json::Value>,
    }

    let builder = reqwest::Client::new().get(jwk_set_endpoint);

    #[cfg(not(target_arch = "wasm32"))]
    let builder = match timeout {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    };
    #[cfg(target_arch = "wasm32")]
    let _ = timeout;

    let raw_set = builder
        .send()
        .await
        .map_err(RequestError::from_send)?
        .json::<RawJwkSet>()
        .await
        .map_err(|source| {
            if source.is_timeout() {
                RequestError::Timeout { source }
            } else {
                RequestError::Decode { source }
            }
        })?;
    let mut set = jsonwebtoken::jwk::JwkSet { keys: Vec::new() };
    for key in raw_set.keys {
        match serde_json::from_value::<jsonwebtoken::jwk::Jwk>(key) {
            Ok(parsed) => set.keys.push(parsed),
            Err(err) => tracing::warn!(?err, "Found non-decodable JWK"),
        }
    }
    Ok(set)
}
