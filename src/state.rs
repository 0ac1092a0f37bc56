use crate::BrowserAuthenticator;
use crate::authenticator::Session;
use crate::token_claims::UserIdentity;
use leptos::prelude::*;
use std::sync::Arc;
use url::Url;

/// The session state this library tracks for you, plus the operations to change it.
///
/// Provided as context by [`crate::use_entra_auth`]. Use
/// ```no_run
/// use leptos::prelude::expect_context;
/// use leptos_entra_auth::EntraAuth;
///
/// let auth = expect_context::<EntraAuth>();
/// ```
/// in any component rendered below the one that performed the `use_entra_auth` call.
///
/// There is no background work. Expiry is detected whenever the session is re-evaluated, which
/// happens on [`EntraAuth::check_session`] and on every read of [`EntraAuth::access_token`].
#[derive(Debug, Clone, Copy)]
pub struct EntraAuth {
    pub(crate) authenticator: StoredValue<Arc<BrowserAuthenticator>>,

    pub(crate) session: ReadSignal<Session>,
    pub(crate) set_session: WriteSignal<Session>,
    pub(crate) set_error: WriteSignal<Option<String>>,

    /// `true` while a non-expired access token is stored.
    pub is_authenticated: Signal<bool>,

    /// The signed-in user. `None` when not authenticated.
    pub user: Signal<Option<UserIdentity>>,

    /// Human readable message of the last failed login. Cleared when a new login starts.
    pub error: Signal<Option<String>>,

    /// `true` until a pending callback was handled and the initial session was evaluated.
    pub loading: Signal<bool>,
}

impl EntraAuth {
    /// Snapshot of the session as last evaluated.
    pub fn session(&self) -> Signal<Session> {
        self.session.into()
    }

    /// Begin a login by leaving the app for the identity provider's sign-in page.
    ///
    /// A configuration error is reported through [`EntraAuth::error`] and nothing is stored.
    pub fn login(&self) {
        self.set_error.set(None);

        match self.authenticator.with_value(|auth| auth.login_url()) {
            Ok(login_url) => {
                tracing::trace!("Redirecting to login...");
                go_to(&login_url);
            }
            Err(err) => {
                tracing::error!(%err, "Could not initiate login.");
                self.set_error.set(Some(err.to_string()));
            }
        }
    }

    /// Drop the local session and end the session at the identity provider.
    pub fn logout(&self) {
        self.logout_and_end_provider_session(true);
    }

    /// Drop the local session. Only when `end_provider_session` is set (and a client id is
    /// configured) is the browser sent to the provider logout. Otherwise it goes to the redirect
    /// uri.
    pub fn logout_and_end_provider_session(&self, end_provider_session: bool) {
        let target = self
            .authenticator
            .with_value(|auth| auth.logout(end_provider_session));
        self.set_session.set(Session::default());
        self.set_error.set(None);
        go_to(&target);
    }

    /// Re-evaluate the stored session. Drops expired tokens and updates all signals.
    pub fn check_session(&self) -> bool {
        let session = self.authenticator.with_value(|auth| auth.session());
        let is_authenticated = session.is_authenticated;
        if self.session.with_untracked(|current| current != &session) {
            self.set_session.set(session);
        }
        is_authenticated
    }

    /// The current access token, if the session is still valid.
    pub fn access_token(&self) -> Option<String> {
        let access_token = self.authenticator.with_value(|auth| auth.access_token());
        if access_token.is_none() && self.session.with_untracked(|it| it.is_authenticated) {
            self.set_session.set(Session::default());
        }
        access_token
    }
}

/// Full page navigation. Login and logout leave the app, so the router is not involved.
fn go_to(url: &Url) {
    if let Err(err) = location().set_href(url.as_str()) {
        tracing::error!(?err, %url, "Could not navigate.");
    }
}
