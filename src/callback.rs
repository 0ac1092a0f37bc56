use crate::config::EntraAuthOptions;
use crate::error::{
    AuthorizationSnafu, CsrfSnafu, CsrfViolation, EntraAuthError, InternalSnafu, ProtocolSnafu,
    TokenExchangeSnafu,
};
use crate::pkce_store::PkceStateStore;
use crate::request::{TokenClient, TokenRequest};
use crate::response::{CallbackResponse, TokenResponse};
use crate::storage::SessionKeyValueStore;
use snafu::{OptionExt, ResultExt, ensure};

/// Validate what the identity provider redirected back with and redeem the code.
///
/// The pending authorization is consumed whenever a code arrived, so every outcome past that
/// point leaves no pending state behind. A provider error also clears it. A callback carrying
/// neither code nor error leaves it untouched.
///
/// No request is sent unless the returned `state` equals the pending one.
pub async fn handle_callback<S, T>(
    response: CallbackResponse,
    options: &EntraAuthOptions,
    pkce_store: &PkceStateStore<S>,
    token_client: &T,
) -> Result<TokenResponse, EntraAuthError>
where
    S: SessionKeyValueStore,
    T: TokenClient,
{
    let login = match response {
        CallbackResponse::Error(error_response) => {
            pkce_store.clear();
            tracing::warn!(
                error = %error_response.error,
                error_description = ?error_response.error_description,
                "Identity provider reported an authorization error."
            );
            return AuthorizationSnafu { error_response }.fail();
        }
        CallbackResponse::NoCode { .. } => {
            return ProtocolSnafu {
                message: "no code received",
            }
            .fail();
        }
        CallbackResponse::SuccessfulLogin(login) => login,
    };

    let pending = pkce_store.consume().context(CsrfSnafu {
        violation: CsrfViolation::NoPendingAuthorization,
    });
    let pending = match pending {
        Ok(pending) => pending,
        Err(err) => {
            tracing::warn!("Received a code, but no login was pending.");
            return Err(err);
        }
    };

    if !pending.state.matches(login.state.as_deref()) {
        tracing::warn!("Returned state does not match the pending login.");
        return CsrfSnafu {
            violation: CsrfViolation::StateMismatch,
        }
        .fail();
    }

    ensure!(
        !pending.code_verifier.is_empty(),
        InternalSnafu {
            message: "pending authorization has no code verifier",
        }
    );

    tracing::trace!("State verified. Exchanging code for tokens.");
    let token_response = token_client
        .exchange_code_for_token(
            options.token_endpoint(),
            TokenRequest {
                client_id: &options.client_id,
                code: &login.code,
                redirect_uri: options.redirect_uri.as_str(),
                code_verifier: pending.code_verifier.code_verifier(),
            },
        )
        .await
        .context(TokenExchangeSnafu {})?;

    let has_access_token = token_response
        .access_token
        .as_deref()
        .is_some_and(|access_token| !access_token.is_empty());
    if !has_access_token {
        tracing::error!("Token endpoint answered successfully, but issued no access token.");
        return ProtocolSnafu {
            message: "token response carries no access token",
        }
        .fail();
    }

    tracing::debug!("Code exchanged for tokens.");
    Ok(token_response)
}
