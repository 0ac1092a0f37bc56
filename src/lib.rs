//! Sign users of a Leptos single page application in with Microsoft Entra ID, using the
//! authorization code flow with PKCE. No client secret, no backend.
//!
//! The flow itself lives in [`Authenticator`], which only depends on small capabilities
//! ([`SessionKeyValueStore`], [`SecureRandomSource`], [`Clock`], [`TokenClient`]) and can be
//! driven without any UI. [`use_entra_auth`] and the [`components`] wire it into a Leptos app
//! backed by the browser's `sessionStorage`.
//!
//! ```no_run
//! use leptos::prelude::*;
//! use leptos_router::{path, components::{Route, Router, Routes}};
//! use leptos_entra_auth::{components::ShowWhenAuthenticated, url::Url, use_entra_auth, EntraAuthOptions};
//!
//! #[component]
//! pub fn App() -> impl IntoView {
//!     view! {
//!         <main>
//!             <Router>
//!                 <Routes fallback=|| view! { "Page not found." }>
//!                     <Route path=path!("/") view=|| view! {
//!                         <Protected>
//!                             <Greeting/>
//!                         </Protected>
//!                     }/>
//!                 </Routes>
//!             </Router>
//!         </main>
//!     }
//! }
//!
//! #[component]
//! pub fn Protected(children: ChildrenFn) -> impl IntoView {
//!     // Note: The redirect uri must point to the route rendering this component.
//!     //       Otherwise the callback is never handled and a login can never be completed.
//!     let auth = use_entra_auth(EntraAuthOptions::new(
//!         "00000000-0000-0000-0000-000000000000",
//!         Url::parse("http://localhost:5173/").unwrap(),
//!     ));
//!
//!     view! {
//!         <ShowWhenAuthenticated fallback=move || view! {
//!             <button on:click=move |_| auth.login()>"Sign in"</button>
//!             <p>{ move || auth.error.get() }</p>
//!         }>
//!             { children() }
//!         </ShowWhenAuthenticated>
//!     }
//! }
//!
//! #[component]
//! pub fn Greeting() -> impl IntoView {
//!     let auth = leptos_entra_auth::expect_entra_auth();
//!
//!     view! {
//!         <p>"Hello, " { move || auth.user.get().map(|user| user.display_name) }</p>
//!         <button on:click=move |_| auth.logout()>"Sign out"</button>
//!     }
//! }
//! ```
//!

mod action;
mod authenticator;
mod callback;
mod code_verifier;
pub mod components;
mod config;
mod crypto;
mod csrf_token;
mod error;
mod hooks;
mod login;
mod logout;
mod pkce_store;
mod request;
mod response;
mod state;
mod storage;
mod time_ext;
mod token;
mod token_claims;
mod token_validation;

// Library exports (additional to pub modules).
pub use authenticator::*;
pub use callback::handle_callback;
pub use code_verifier::{CodeChallenge, CodeChallengeMethod, CodeVerifier};
pub use config::*;
pub use crypto::{OsRandom, RandomSourceError, SecureRandomSource, base64_url_encode, sha256};
pub use csrf_token::CsrfToken;
pub use error::*;
pub use hooks::*;
pub use login::create_login_url;
pub use logout::create_logout_url;
pub use pkce_store::{PendingAuthorization, PkceStateStore};
pub use request::{ReqwestTokenClient, RequestError, TokenClient, TokenRequest, retrieve_jwk_set};
pub use response::*;
pub use state::*;
pub use storage::{BrowserSessionStore, InMemorySessionStore, SessionKeyValueStore, keys};
pub use time_ext::{Clock, SystemClock};
pub use token::{TokenSet, TokenStore};
pub use token_claims::*;
pub use token_validation::{JwtValidationError, validate as validate_id_token};
pub mod url {
    pub use url::Url;
}
pub mod reqwest {
    pub use reqwest::*;
}

/// The authenticator [`use_entra_auth`] builds: browser session storage, OS randomness, system
/// clock and a reqwest based token exchange.
pub type BrowserAuthenticator = Authenticator<BrowserSessionStore>;

type JwkSetEndpoint = url::Url;
type AuthorizationEndpoint = url::Url;
type TokenEndpoint = url::Url;
type EndSessionEndpoint = url::Url;
