use crate::error::{ConfigurationSnafu, EntraAuthError};
use crate::{AuthorizationEndpoint, EndSessionEndpoint, JwkSetEndpoint, TokenEndpoint};
use std::time::Duration;
use url::Url;

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_TENANT_ID: &str = "common";
pub const DEFAULT_SCOPE: &str = "openid profile email User.Read";

const GENERIC_TENANT_IDS: [&str; 3] = ["common", "organizations", "consumers"];

/// Names of the environment variables read by [`EntraAuthOptions::from_env`].
pub mod env {
    pub const AUTHORITY: &str = "ENTRA_AUTHORITY";
    pub const TENANT_ID: &str = "ENTRA_TENANT_ID";
    pub const CLIENT_ID: &str = "ENTRA_CLIENT_ID";
    pub const REDIRECT_URI: &str = "ENTRA_REDIRECT_URI";
    pub const POST_LOGOUT_REDIRECT_URI: &str = "ENTRA_POST_LOGOUT_REDIRECT_URI";
    pub const SCOPES: &str = "ENTRA_SCOPES";
}

/// Everything needed to talk to an Entra ID tenant as a public (secret-less) client.
#[derive(Debug, Clone, PartialEq)]
pub struct EntraAuthOptions {
    /// Base url of the identity provider, e.g. "https://login.microsoftonline.com".
    pub authority: Url,

    /// Tenant id, domain or one of the generic values `common`, `organizations`, `consumers`.
    pub tenant_id: String,

    /// Application (client) id of the app registration. Must not be empty for logins.
    pub client_id: String,

    /// Url the identity provider redirects back to. Must match the app registration.
    pub redirect_uri: Url,

    /// Url to return to after a provider logout. Defaults to `redirect_uri`.
    pub post_logout_redirect_uri: Option<Url>,

    /// Space separated scopes. Defaults to [`DEFAULT_SCOPE`].
    pub scope: Option<String>,

    pub advanced: AdvancedOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedOptions {
    /// Upper bound for the code-to-token exchange request.
    /// Only enforced on native targets.
    /// Defaults to `Duration::from_secs(30)`.
    pub token_exchange_timeout: Duration,
}

impl Default for AdvancedOptions {
    fn default() -> Self {
        Self {
            token_exchange_timeout: Duration::from_secs(30),
        }
    }
}

impl EntraAuthOptions {
    /// Options for the public Microsoft authority and the multi-tenant `common` endpoint.
    pub fn new(client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            authority: default_authority(),
            tenant_id: DEFAULT_TENANT_ID.to_owned(),
            client_id: client_id.into(),
            redirect_uri,
            post_logout_redirect_uri: None,
            scope: None,
            advanced: AdvancedOptions::default(),
        }
    }

    /// Read options from the process environment. See [`env`] for the variable names.
    pub fn from_env() -> Result<Self, EntraAuthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read options through an arbitrary lookup function.
    ///
    /// Only `ENTRA_REDIRECT_URI` is required. An empty or missing client id is accepted here and
    /// rejected when a login is attempted.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, EntraAuthError> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let redirect_uri = match lookup(env::REDIRECT_URI) {
            Some(raw) => parse_url(env::REDIRECT_URI, &raw)?,
            None => {
                return ConfigurationSnafu {
                    message: format!("{} is not set", env::REDIRECT_URI),
                }
                .fail();
            }
        };
        let authority = match lookup(env::AUTHORITY) {
            Some(raw) => parse_url(env::AUTHORITY, &raw)?,
            None => default_authority(),
        };
        let post_logout_redirect_uri = lookup(env::POST_LOGOUT_REDIRECT_URI)
            .map(|raw| parse_url(env::POST_LOGOUT_REDIRECT_URI, &raw))
            .transpose()?;

        Ok(Self {
            authority,
            tenant_id: lookup(env::TENANT_ID).unwrap_or_else(|| DEFAULT_TENANT_ID.to_owned()),
            client_id: lookup(env::CLIENT_ID).unwrap_or_default(),
            redirect_uri,
            post_logout_redirect_uri,
            scope: lookup(env::SCOPES),
            advanced: AdvancedOptions::default(),
        })
    }

    pub fn has_client_id(&self) -> bool {
        !self.client_id.trim().is_empty()
    }

    /// `false` for the generic `common`, `organizations` and `consumers` tenants, whose tokens
    /// are issued by whichever tenant the user belongs to.
    pub fn has_specific_tenant(&self) -> bool {
        !GENERIC_TENANT_IDS
            .iter()
            .any(|generic| self.tenant_id.eq_ignore_ascii_case(generic))
    }

    pub fn scope(&self) -> &str {
        self.scope
            .as_deref()
            .filter(|scope| !scope.trim().is_empty())
            .unwrap_or(DEFAULT_SCOPE)
    }

    pub fn post_logout_redirect_uri(&self) -> &Url {
        self.post_logout_redirect_uri
            .as_ref()
            .unwrap_or(&self.redirect_uri)
    }

    pub fn authorization_endpoint(&self) -> AuthorizationEndpoint {
        self.tenant_url(&["oauth2", "v2.0", "authorize"])
    }

    pub fn token_endpoint(&self) -> TokenEndpoint {
        self.tenant_url(&["oauth2", "v2.0", "token"])
    }

    pub fn end_session_endpoint(&self) -> EndSessionEndpoint {
        self.tenant_url(&["oauth2", "v2.0", "logout"])
    }

    pub fn jwks_endpoint(&self) -> JwkSetEndpoint {
        self.tenant_url(&["discovery", "v2.0", "keys"])
    }

    /// Issuer the v2.0 endpoints put into identity tokens of a specific tenant.
    pub fn expected_issuer(&self) -> String {
        let mut url = self.tenant_url(&["v2.0"]);
        url.set_query(None);
        url.to_string()
    }

    fn tenant_url(&self, segments: &[&str]) -> Url {
        let mut url = self.authority.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.tenant_id).extend(segments);
        } else {
            // Only "cannot-be-a-base" urls (like `mailto:`) end up here.
            tracing::warn!(authority = %self.authority, "Authority cannot carry a path.");
        }
        url
    }
}

fn default_authority() -> Url {
    Url::parse(DEFAULT_AUTHORITY).expect("valid default authority")
}

fn parse_url(name: &str, raw: &str) -> Result<Url, EntraAuthError> {
    Url::parse(raw.trim()).map_err(|err| {
        ConfigurationSnafu {
            message: format!("{name} is not a valid url: {err}"),
        }
        .build()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertr::prelude::*;
    use std::collections::HashMap;

    fn options() -> EntraAuthOptions {
        let mut options = EntraAuthOptions::new(
            "client-123",
            Url::parse("http://localhost:5173").unwrap(),
        );
        options.tenant_id = "my-tenant".to_owned();
        options
    }

    #[test]
    fn derives_tenant_endpoints() {
        let options = options();
        assert_that(options.authorization_endpoint().as_str()).is_equal_to(
            "https://login.microsoftonline.com/my-tenant/oauth2/v2.0/authorize",
        );
        assert_that(options.token_endpoint().as_str())
            .is_equal_to("https://login.microsoftonline.com/my-tenant/oauth2/v2.0/token");
        assert_that(options.end_session_endpoint().as_str())
            .is_equal_to("https://login.microsoftonline.com/my-tenant/oauth2/v2.0/logout");
        assert_that(options.jwks_endpoint().as_str())
            .is_equal_to("https://login.microsoftonline.com/my-tenant/discovery/v2.0/keys");
        assert_that(options.expected_issuer().as_str())
            .is_equal_to("https://login.microsoftonline.com/my-tenant/v2.0");
    }

    #[test]
    fn authority_with_path_keeps_prefix() {
        let mut options = options();
        options.authority = Url::parse("http://127.0.0.1:8080/idp/").unwrap();
        assert_that(options.token_endpoint().as_str())
            .is_equal_to("http://127.0.0.1:8080/idp/my-tenant/oauth2/v2.0/token");
    }

    #[test]
    fn scope_defaults_when_missing_or_blank() {
        let mut options = options();
        assert_that(options.scope()).is_equal_to(DEFAULT_SCOPE);
        options.scope = Some("  ".to_owned());
        assert_that(options.scope()).is_equal_to(DEFAULT_SCOPE);
        options.scope = Some("openid".to_owned());
        assert_that(options.scope()).is_equal_to("openid");
    }

    #[test]
    fn generic_tenants_are_not_specific() {
        let mut options = options();
        assert_that(options.has_specific_tenant()).is_true();
        options.tenant_id = "Organizations".to_owned();
        assert_that(options.has_specific_tenant()).is_false();
        options.tenant_id = DEFAULT_TENANT_ID.to_owned();
        assert_that(options.has_specific_tenant()).is_false();
    }

    #[test]
    fn from_lookup_applies_defaults() {
        let vars = HashMap::from([
            (env::CLIENT_ID, "abc"),
            (env::REDIRECT_URI, "http://localhost:5173/"),
        ]);
        let options =
            EntraAuthOptions::from_lookup(|name| vars.get(name).map(|v| (*v).to_owned())).unwrap();

        assert_that(options.tenant_id.as_str()).is_equal_to(DEFAULT_TENANT_ID);
        assert_that(options.client_id.as_str()).is_equal_to("abc");
        assert_that(options.scope()).is_equal_to(DEFAULT_SCOPE);
        assert_that(options.authority.as_str()).is_equal_to("https://login.microsoftonline.com/");
        assert_that(options.post_logout_redirect_uri().as_str())
            .is_equal_to("http://localhost:5173/");
    }

    #[test]
    fn from_lookup_accepts_missing_client_id() {
        let options = EntraAuthOptions::from_lookup(|name| {
            (name == env::REDIRECT_URI).then(|| "http://localhost:5173".to_owned())
        })
        .unwrap();
        assert_that(options.has_client_id()).is_false();
    }

    #[test]
    fn from_lookup_rejects_invalid_redirect_uri() {
        let result = EntraAuthOptions::from_lookup(|name| {
            (name == env::REDIRECT_URI).then(|| "not a url".to_owned())
        });
        assert_that(matches!(result, Err(EntraAuthError::Configuration { .. }))).is_true();
    }

    #[test]
    fn from_lookup_requires_redirect_uri() {
        let result = EntraAuthOptions::from_lookup(|_| None);
        assert_that(matches!(result, Err(EntraAuthError::Configuration { .. }))).is_true();
    }
}
