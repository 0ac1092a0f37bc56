use crate::config::EntraAuthOptions;
use url::Url;

/// Where the browser should go after local session data was dropped.
///
/// Without a client id there is no provider session to end, so this is the plain redirect uri.
pub fn create_logout_url(options: &EntraAuthOptions) -> Url {
    if !options.has_client_id() {
        return options.redirect_uri.clone();
    }

    let mut logout_url = options.end_session_endpoint();
    logout_url.query_pairs_mut().append_pair(
        "post_logout_redirect_uri",
        options.post_logout_redirect_uri().as_str(),
    );
    logout_url
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertr::prelude::*;

    #[test]
    fn logout_url_targets_tenant_logout_endpoint() {
        let options =
            EntraAuthOptions::new("client", Url::parse("http://localhost:5173/").unwrap());

        let url = create_logout_url(&options);

        assert_that(url.as_str()).is_equal_to(
            "https://login.microsoftonline.com/common/oauth2/v2.0/logout?post_logout_redirect_uri=http%3A%2F%2Flocalhost%3A5173%2F",
        );
    }

    #[test]
    fn explicit_post_logout_redirect_uri_wins() {
        let mut options =
            EntraAuthOptions::new("client", Url::parse("http://localhost:5173/").unwrap());
        options.post_logout_redirect_uri = Some(Url::parse("http://localhost:5173/bye").unwrap());

        let url = create_logout_url(&options);
        let (key, value) = url.query_pairs().next().unwrap();

        assert_that(key.as_ref()).is_equal_to("post_logout_redirect_uri");
        assert_that(value.as_ref()).is_equal_to("http://localhost:5173/bye");
    }

    #[test]
    fn without_client_id_returns_redirect_uri() {
        let options = EntraAuthOptions::new("", Url::parse("http://localhost:5173/").unwrap());
        assert_that(create_logout_url(&options).as_str()).is_equal_to("http://localhost:5173/");
    }
}
