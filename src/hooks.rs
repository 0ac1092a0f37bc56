use crate::action::create_complete_login_action;
use crate::authenticator::{Authenticator, Session};
use crate::config::EntraAuthOptions;
use crate::error::EntraAuthError;
use crate::response::CallbackResponse;
use crate::storage::BrowserSessionStore;
use crate::EntraAuth;
use leptos::prelude::*;
use leptos_router::NavigateOptions;
use leptos_router::hooks::{use_location, use_navigate, use_query};
use leptos_router::params::ParamsError;
use std::sync::Arc;

/// Initializes a new `EntraAuth` instance with the provided options and provides it as context.
///
/// Must be called inside a `<Router>`, at the route the identity provider redirects back to.
/// When the current url carries a callback (`code` or `error`), the login is completed, and the
/// query is removed from the visible url in any case, so that a page refresh does not
/// re-trigger the exchange.
pub fn use_entra_auth(options: EntraAuthOptions) -> EntraAuth {
    tracing::trace!("Initializing Entra auth...");

    let authenticator = Arc::new(Authenticator::new(options, BrowserSessionStore::new()));
    let authenticator = StoredValue::new(authenticator);

    let (session, set_session) = signal(Session::default());
    let (error, set_error) = signal::<Option<String>>(None);
    let (loading, set_loading) = signal(true);

    let on_complete = Callback::new(move |result: Result<Session, EntraAuthError>| {
        let (session, error) = settle_login(result);
        set_session.set(session);
        set_error.set(error);
        set_loading.set(false);
    });
    let complete_login = create_complete_login_action(authenticator, on_complete);

    // Current state of our url parameters.
    let url_state = use_query::<CallbackResponse>();
    let location = use_location();
    let navigate = use_navigate();

    // Runs once, on the client only.
    Effect::new(move |_| {
        match mount_step(url_state.get_untracked(), &location.pathname.get_untracked()) {
            MountStep::RestoreSession => {
                set_session.set(authenticator.with_value(|auth| auth.session()));
                set_loading.set(false);
            }
            MountStep::CompleteLogin { response, path } => {
                tracing::trace!("Handling login callback.");
                complete_login.dispatch(response);
                navigate(&path, strip_query_options());
            }
        }
    });

    let auth = EntraAuth {
        authenticator,
        session,
        set_session,
        set_error,
        is_authenticated: Signal::derive(move || session.read().is_authenticated),
        user: Signal::derive(move || session.read().user.clone()),
        error: error.into(),
        loading: loading.into(),
    };

    // We guarantee that the EntraAuth state is provided as context.
    provide_context(auth);

    auth
}

/// Access the `EntraAuth` provided by an ancestor `use_entra_auth` call.
///
/// # Panics
/// If no `EntraAuth` was provided.
pub fn expect_entra_auth() -> EntraAuth {
    expect_context::<EntraAuth>()
}

pub fn try_use_entra_auth() -> Option<EntraAuth> {
    use_context::<EntraAuth>()
}

/// What to do with the url `use_entra_auth` was mounted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MountStep {
    /// No callback parameters. Evaluate the stored session.
    RestoreSession,

    /// Complete the login, then navigate to `path`, which carries no query.
    CompleteLogin {
        response: CallbackResponse,
        path: String,
    },
}

pub(crate) fn mount_step(
    url_state: Result<CallbackResponse, ParamsError>,
    pathname: &str,
) -> MountStep {
    match url_state {
        Ok(response) if response.is_callback() => MountStep::CompleteLogin {
            response,
            path: pathname.to_owned(),
        },
        Ok(_) | Err(_) => MountStep::RestoreSession,
    }
}

/// The callback parameters were consumed. Replace the history entry so that neither a refresh
/// nor the back button hands them to us again.
pub(crate) fn strip_query_options() -> NavigateOptions {
    NavigateOptions {
        replace: true,
        ..NavigateOptions::default()
    }
}

/// Session and error message to show after a login attempt. A failure never leaves the UI
/// authenticated.
pub(crate) fn settle_login(result: Result<Session, EntraAuthError>) -> (Session, Option<String>) {
    match result {
        Ok(session) => (session, None),
        Err(err) => (Session::default(), Some(err.to_string())),
    }
}
