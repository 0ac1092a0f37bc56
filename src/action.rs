use crate::BrowserAuthenticator;
use crate::authenticator::Session;
use crate::error::EntraAuthError;
use crate::response::CallbackResponse;
use leptos::prelude::*;
use std::sync::Arc;

pub(crate) fn create_complete_login_action(
    authenticator: StoredValue<Arc<BrowserAuthenticator>>,
    on_complete: Callback<Result<Session, EntraAuthError>>,
) -> Action<CallbackResponse, ()> {
    Action::new(move |response: &CallbackResponse| {
        let response = response.clone();
        let authenticator = authenticator.get_value();
        async move {
            leptos::task::spawn_local(async move {
                let result = authenticator.complete_login(response).await;
                if let Err(err) = &result {
                    tracing::error!(%err, "Could not complete login.");
                }
                on_complete.run(result);
            });
        }
    })
}
