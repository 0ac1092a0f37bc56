use crate::callback::handle_callback;
use crate::config::EntraAuthOptions;
use crate::crypto::{OsRandom, SecureRandomSource};
use crate::error::{EntraAuthError, FormatSnafu};
use crate::login::create_login_url;
use crate::logout::create_logout_url;
use crate::pkce_store::PkceStateStore;
use crate::request::{ReqwestTokenClient, TokenClient};
use crate::response::CallbackResponse;
use crate::storage::SessionKeyValueStore;
use crate::time_ext::{Clock, SystemClock};
use crate::token::{TokenSet, TokenStore};
use crate::token_claims::{UserIdentity, decode_identity};
use crate::token_validation::{self, JwtValidationError};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use url::Url;

/// What the UI needs to know about the current session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Session {
    pub is_authenticated: bool,

    /// `None` when not authenticated, or when no readable identity token is stored.
    pub user: Option<UserIdentity>,
}

/// The session contract: begin a login, complete it on the callback, ask who is signed in and
/// sign out again.
///
/// Owns its session store. Every capability is swappable:
/// - `S`: where pending logins and tokens live.
/// - `R`: the secure random source.
/// - `C`: the clock deciding token expiry.
/// - `T`: the transport redeeming authorization codes.
#[derive(Debug, Clone)]
pub struct Authenticator<S, R = OsRandom, C = SystemClock, T = ReqwestTokenClient> {
    options: EntraAuthOptions,
    pkce_store: PkceStateStore<S>,
    tokens: TokenStore<S, C>,
    random: R,
    token_client: T,
}

impl<S: SessionKeyValueStore + Clone> Authenticator<S> {
    /// Authenticator using the OS random source, the system clock and a reqwest client limited
    /// by [`crate::config::AdvancedOptions::token_exchange_timeout`].
    pub fn new(options: EntraAuthOptions, store: S) -> Self {
        let token_client =
            ReqwestTokenClient::new(Some(options.advanced.token_exchange_timeout));
        Self::with_capabilities(options, store, OsRandom, SystemClock, token_client)
    }
}

impl<S, R, C, T> Authenticator<S, R, C, T>
where
    S: SessionKeyValueStore + Clone,
    R: SecureRandomSource,
    C: Clock,
    T: TokenClient,
{
    pub fn with_capabilities(
        options: EntraAuthOptions,
        store: S,
        random: R,
        clock: C,
        token_client: T,
    ) -> Self {
        Self {
            options,
            pkce_store: PkceStateStore::new(store.clone()),
            tokens: TokenStore::new(store, clock),
            random,
            token_client,
        }
    }

    pub fn options(&self) -> &EntraAuthOptions {
        &self.options
    }

    /// Begin a login. The caller navigates the browser to the returned url.
    pub fn login_url(&self) -> Result<Url, EntraAuthError> {
        create_login_url(&self.options, &self.pkce_store, &self.random)
    }

    pub fn has_pending_login(&self) -> bool {
        self.pkce_store.has_pending()
    }

    /// Finish a login from the parameters the identity provider redirected back with.
    ///
    /// Issued tokens are stored. A rejected callback drops all token data, so no failure leaves
    /// a session authenticated. An identity token that cannot be decoded is rejected the same
    /// way.
    pub async fn complete_login(
        &self,
        response: CallbackResponse,
    ) -> Result<Session, EntraAuthError> {
        let result = self.redeem(response).await;
        if let Err(err) = &result {
            tracing::warn!(%err, "Login was rejected. Dropping all token data.");
            self.tokens.clear();
        }
        result
    }

    /// [`Self::complete_login`] for the full redirect-back url.
    pub async fn complete_login_from_url(
        &self,
        callback_url: &Url,
    ) -> Result<Session, EntraAuthError> {
        self.complete_login(CallbackResponse::from_url(callback_url))
            .await
    }

    async fn redeem(&self, response: CallbackResponse) -> Result<Session, EntraAuthError> {
        let token_response =
            handle_callback(response, &self.options, &self.pkce_store, &self.token_client).await?;

        // A new login replaces the previous session. Nothing of it may survive next to the new
        // user's tokens.
        self.tokens.clear();
        self.tokens.store(&token_response);

        let user = self.try_user()?;
        Ok(Session {
            is_authenticated: self.tokens.is_session_valid(),
            user,
        })
    }

    /// Whether a non-expired access token is stored. Drops expired tokens.
    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_session_valid()
    }

    /// Tokens of the current session, if it is still valid.
    pub fn tokens(&self) -> Option<TokenSet> {
        self.tokens.valid_tokens()
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens().map(|tokens| tokens.access_token)
    }

    /// Identity of the signed-in user, decoded from the stored identity token.
    ///
    /// `Ok(None)` if the session is not valid or no identity token was issued. The signature is
    /// not verified, see [`Self::verified_user`].
    pub fn try_user(&self) -> Result<Option<UserIdentity>, EntraAuthError> {
        let Some(id_token) = self.tokens().and_then(|tokens| tokens.id_token) else {
            return Ok(None);
        };
        decode_identity(&id_token)
            .map(Some)
            .context(FormatSnafu {})
    }

    /// Like [`Self::try_user`], but an undecodable identity token is logged and reported as
    /// `None`.
    pub fn user(&self) -> Option<UserIdentity> {
        self.try_user().unwrap_or_else(|err| {
            tracing::error!(%err, "Could not read user from identity token.");
            None
        })
    }

    /// Identity of the signed-in user after verifying the identity token against the tenant's
    /// signing keys, our client id as audience and, for a specific tenant, the tenant's issuer.
    pub fn verified_user(
        &self,
        jwk_set: &jsonwebtoken::jwk::JwkSet,
    ) -> Result<Option<UserIdentity>, JwtValidationError> {
        let Some(id_token) = self.tokens().and_then(|tokens| tokens.id_token) else {
            return Ok(None);
        };
        let audiences = [self.options.client_id.clone()];
        let issuers = [self.options.expected_issuer()];
        token_validation::validate(
            &id_token,
            jwk_set,
            Some(audiences.as_slice()),
            self.options
                .has_specific_tenant()
                .then_some(issuers.as_slice()),
        )
        .map(Some)
    }

    pub fn session(&self) -> Session {
        let is_authenticated = self.is_authenticated();
        Session {
            is_authenticated,
            user: if is_authenticated { self.user() } else { None },
        }
    }

    /// Drop all local session data and any pending login.
    ///
    /// Returns where to navigate next: the provider logout when `with_provider_logout` is set and
    /// a client id is configured, the redirect uri otherwise.
    pub fn logout(&self, with_provider_logout: bool) -> Url {
        self.tokens.clear();
        self.pkce_store.clear();
        tracing::debug!(with_provider_logout, "Logged out.");

        if with_provider_logout {
            create_logout_url(&self.options)
        } else {
            self.options.redirect_uri.clone()
        }
    }
}
