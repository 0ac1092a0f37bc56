use crate::config::{AdvancedOptions, DEFAULT_TENANT_ID, EntraAuthOptions};
use crate::{EntraAuth, expect_entra_auth, use_entra_auth};
use leptos::prelude::*;
use url::Url;

/// Initialize Entra ID authentication and provide it to child components.
///
/// This component wraps [`use_entra_auth`] with a declarative API and the defaults of
/// [`EntraAuthOptions::new`].
///
/// # Example
/// ```no_run
/// use leptos::prelude::*;
/// use leptos_entra_auth::components::AuthProvider;
/// use leptos_entra_auth::url::Url;
/// use leptos_router::components::Router;
///
/// # #[component]
/// # fn Example() -> impl IntoView {
/// view! {
///     <Router>
///         <AuthProvider
///             client_id="00000000-0000-0000-0000-000000000000"
///             redirect_uri=Url::parse("http://localhost:5173/").expect("valid redirect uri")
///         >
///             <p>"<Routes> and further app content..."</p>
///         </AuthProvider>
///     </Router>
/// }
/// # }
/// ```
#[allow(clippy::must_use_candidate)]
#[component]
pub fn AuthProvider(
    /// Application (client) id of the app registration.
    #[prop(into)]
    client_id: String,

    /// Url the identity provider redirects back to. Must be the route rendering this component.
    redirect_uri: Url,

    /// Tenant id or domain. Defaults to `common`.
    #[prop(into, optional)]
    tenant_id: Option<String>,

    /// Defaults to "https://login.microsoftonline.com".
    #[prop(optional)]
    authority: Option<Url>,

    /// Defaults to `redirect_uri`.
    #[prop(optional)]
    post_logout_redirect_uri: Option<Url>,

    /// Space separated scopes (openid is always included).
    #[prop(into, optional)]
    scope: Option<String>,

    #[prop(optional)]
    advanced: Option<AdvancedOptions>,

    children: Children,
) -> impl IntoView {
    let mut options = EntraAuthOptions::new(client_id, redirect_uri);
    if let Some(authority) = authority {
        options.authority = authority;
    }
    options.tenant_id = tenant_id.unwrap_or_else(|| DEFAULT_TENANT_ID.to_owned());
    options.post_logout_redirect_uri = post_logout_redirect_uri;
    options.scope = scope;
    options.advanced = advanced.unwrap_or_default();

    let _auth = use_entra_auth(options);

    view! {
        { children() }
    }
}

/// Calls [`expect_entra_auth`] for you and hands the state to `render`.
#[component]
pub fn WithAuth<R, IV>(render: R) -> impl IntoView
where
    R: FnOnce(EntraAuth) -> IV + 'static,
    IV: IntoView,
{
    let auth = expect_entra_auth();
    render(auth)
}

/// Show `children` only when the user is authenticated. Renders `fallback` otherwise, and
/// nothing while the initial session is still being evaluated.
///
/// # Example
/// ```no_run
/// use leptos::prelude::*;
/// use leptos_entra_auth::components::ShowWhenAuthenticated;
/// use leptos_entra_auth::expect_entra_auth;
///
/// # #[component]
/// # fn Component() -> impl IntoView {
/// let auth = expect_entra_auth();
/// view! {
///     <ShowWhenAuthenticated fallback=move || view! {
///         <button on:click=move |_| auth.login()>"Sign in"</button>
///     }>
///         <p>"Hello, " { move || auth.user.get().map(|user| user.display_name) }</p>
///     </ShowWhenAuthenticated>
/// }
/// # }
/// ```
#[component(transparent)]
#[allow(clippy::must_use_candidate)]
pub fn ShowWhenAuthenticated(
    #[prop(into, optional)] fallback: ViewFn,
    children: ChildrenFn,
) -> impl IntoView {
    let auth = expect_entra_auth();
    let loading = auth.loading;
    let is_authenticated = auth.is_authenticated;

    let fallback = move || {
        let fallback = fallback.clone();
        move || (!loading.get()).then(|| fallback.run())
    };

    view! {
        <Show when=move || is_authenticated.get() fallback=fallback>
            { children() }
        </Show>
    }
}
