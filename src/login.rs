use crate::AuthorizationEndpoint;
use crate::code_verifier::CodeChallenge;
use crate::config::EntraAuthOptions;
use crate::crypto::SecureRandomSource;
use crate::csrf_token::CsrfToken;
use crate::error::{ConfigurationSnafu, EntraAuthError, NoSecureRandomSnafu};
use crate::pkce_store::PkceStateStore;
use crate::storage::SessionKeyValueStore;
use itertools::Itertools;
use snafu::{ResultExt, ensure};
use url::Url;

/// Begin a login attempt and return the url the browser must navigate to.
///
/// Fails with a configuration error before anything is stored if no client id is configured.
/// On success, the new pending authorization replaces any previous one.
pub fn create_login_url<S: SessionKeyValueStore>(
    options: &EntraAuthOptions,
    pkce_store: &PkceStateStore<S>,
    random: &impl SecureRandomSource,
) -> Result<Url, EntraAuthError> {
    ensure!(
        options.has_client_id(),
        ConfigurationSnafu {
            message: "Client id is not configured. Cannot initiate login."
        }
    );

    let pending = pkce_store.begin(random).context(NoSecureRandomSnafu {})?;
    let code_challenge = pending.code_verifier.to_code_challenge();

    let login_url = authorization_url(
        options.authorization_endpoint(),
        &options.client_id,
        options.redirect_uri.as_str(),
        &normalize_scope(options.scope()),
        &pending.state,
        &code_challenge,
    );
    tracing::trace!(authorization_endpoint = %options.authorization_endpoint(), "Created login url.");
    Ok(login_url)
}

/// Whitespace separated, duplicates removed, `openid` always included.
fn normalize_scope(scope: &str) -> String {
    scope
        .split_whitespace()
        .chain(["openid"])
        .unique()
        .join(" ")
}

fn authorization_url(
    authorization_endpoint: AuthorizationEndpoint,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    state: &CsrfToken,
    code_challenge: &CodeChallenge,
) -> Url {
    let mut login_url: Url = authorization_endpoint;
    login_url
        .query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("scope", scope)
        .append_pair("state", state.as_str())
        .append_pair("code_challenge", code_challenge.code_challenge())
        .append_pair(
            "code_challenge_method",
            code_challenge.code_challenge_method().as_str(),
        )
        .append_pair("response_mode", "query");
    login_url
}
