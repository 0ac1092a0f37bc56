use crate::response::TokenResponse;
use crate::storage::{SessionKeyValueStore, keys};
use crate::time_ext::{Clock, OffsetDateTimeExt};
use std::fmt::{Debug, Formatter};
use time::{Duration, OffsetDateTime};

/// Tokens of the current session, as persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSet {
    /// Access token. Allows access to resources requiring authentication unless expired.
    pub access_token: String,

    /// Identity token. JWT shaped claims about the user.
    pub id_token: Option<String>,

    /// Stored when issued. Never redeemed by this crate.
    pub refresh_token: Option<String>,

    /// Point in time when the `access_token` expires. Computed on receipt from `expires_in`.
    pub expires_at: Option<OffsetDateTime>,
}

impl Debug for TokenSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"<redacted>")
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl TokenSet {
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Persists issued tokens and decides whether the session is still authenticated.
#[derive(Debug, Clone)]
pub struct TokenStore<S, C> {
    store: S,
    clock: C,
}

impl<S: SessionKeyValueStore, C: Clock> TokenStore<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Persist a token response.
    ///
    /// Tokens missing from the response keep their previously stored value. The expiry is always
    /// replaced: it is recomputed from `expires_in` or, when the response carries none, removed,
    /// as an older expiry does not describe the newly stored access token.
    pub fn store(&self, response: &TokenResponse) {
        let now = self.clock.now();

        if let Some(access_token) = response.access_token.as_deref() {
            self.store.set(keys::ACCESS_TOKEN, access_token.to_owned());
        }
        if let Some(id_token) = response.id_token.as_deref() {
            self.store.set(keys::ID_TOKEN, id_token.to_owned());
        }
        if let Some(refresh_token) = response.refresh_token.as_deref() {
            self.store.set(keys::REFRESH_TOKEN, refresh_token.to_owned());
        }

        match response.expires_in {
            Some(expires_in) => {
                let expires_at = now.saturating_add(Duration::seconds(expires_in));
                self.store.set(
                    keys::TOKEN_EXPIRES_AT,
                    expires_at.unix_timestamp_millis().to_string(),
                );
                tracing::trace!(%expires_at, "Stored token data.");
            }
            None => {
                self.store.remove(keys::TOKEN_EXPIRES_AT);
                tracing::trace!("Stored token data without expiry.");
            }
        }
    }

    /// Erase all token data. Idempotent.
    pub fn clear(&self) {
        self.store.remove(keys::ACCESS_TOKEN);
        self.store.remove(keys::ID_TOKEN);
        self.store.remove(keys::REFRESH_TOKEN);
        self.store.remove(keys::TOKEN_EXPIRES_AT);
    }

    /// `true` if an access token is stored and it is not expired.
    ///
    /// Detecting an expired (or unreadable) expiry clears the store.
    pub fn is_session_valid(&self) -> bool {
        if self.store.get(keys::ACCESS_TOKEN).is_none() {
            return false;
        }

        let Some(raw_expires_at) = self.store.get(keys::TOKEN_EXPIRES_AT) else {
            return true;
        };

        let expires_at = raw_expires_at
            .trim()
            .parse::<i128>()
            .ok()
            .and_then(OffsetDateTime::from_unix_timestamp_millis);

        match expires_at {
            Some(expires_at) if self.clock.now() < expires_at => true,
            Some(expires_at) => {
                tracing::debug!(%expires_at, "Access token expired. Dropping all token data.");
                self.clear();
                false
            }
            None => {
                tracing::warn!(
                    raw_expires_at,
                    "Stored token expiry is unreadable. Dropping all token data."
                );
                self.clear();
                false
            }
        }
    }

    /// Whatever is currently stored, without checking expiry.
    pub fn current_tokens(&self) -> Option<TokenSet> {
        let access_token = self.store.get(keys::ACCESS_TOKEN)?;
        Some(TokenSet {
            access_token,
            id_token: self.store.get(keys::ID_TOKEN),
            refresh_token: self.store.get(keys::REFRESH_TOKEN),
            expires_at: self
                .store
                .get(keys::TOKEN_EXPIRES_AT)
                .and_then(|raw| raw.trim().parse::<i128>().ok())
                .and_then(OffsetDateTime::from_unix_timestamp_millis),
        })
    }

    /// Tokens of a still valid session. Clears expired tokens as a side effect.
    pub fn valid_tokens(&self) -> Option<TokenSet> {
        if self.is_session_valid() {
            self.current_tokens()
        } else {
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::InMemorySessionStore;
    use assertr::prelude::*;
    use std::sync::{Arc, Mutex};

    /// Manually advanced clock.
    #[derive(Debug, Clone)]
    pub(crate) struct TestClock(Arc<Mutex<OffsetDateTime>>);

    impl TestClock {
        pub(crate) fn new() -> Self {
            Self(Arc::new(Mutex::new(
                OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            )))
        }

        pub(crate) fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> OffsetDateTime {
            *self.0.lock().unwrap()
        }
    }

    fn cut() -> (
        TokenStore<Arc<InMemorySessionStore>, TestClock>,
        Arc<InMemorySessionStore>,
        TestClock,
    ) {
        let store = Arc::new(InMemorySessionStore::new());
        let clock = TestClock::new();
        (
            TokenStore::new(Arc::clone(&store), clock.clone()),
            store,
            clock,
        )
    }

    fn response(access_token: &str, expires_in: Option<i64>) -> TokenResponse {
        TokenResponse {
            access_token: Some(access_token.to_owned()),
            expires_in,
            ..Default::default()
        }
    }

    #[test]
    fn empty_store_is_not_valid() {
        let (tokens, _, _) = cut();
        assert_that(tokens.is_session_valid()).is_false();
        assert_that(tokens.current_tokens()).is_equal_to(None);
    }

    #[test]
    fn session_expires_after_expires_in() {
        let (tokens, store, clock) = cut();
        tokens.store(&response("a", Some(3600)));

        assert_that(tokens.is_session_valid()).is_true();
        assert_that(store.get(keys::TOKEN_EXPIRES_AT)).is_equal_to(Some(
            ((1_700_000_000i128 + 3600) * 1000).to_string(),
        ));

        clock.advance(Duration::seconds(3599));
        assert_that(tokens.is_session_valid()).is_true();

        clock.advance(Duration::seconds(2));
        assert_that(tokens.is_session_valid()).is_false();
        assert_that(tokens.current_tokens()).is_equal_to(None);
        assert_that(store.is_empty()).is_true();
    }

    #[test]
    fn session_is_invalid_exactly_at_expiry() {
        let (tokens, _, clock) = cut();
        tokens.store(&response("a", Some(60)));
        clock.advance(Duration::seconds(60));
        assert_that(tokens.is_session_valid()).is_false();
    }

    #[test]
    fn session_without_expiry_stays_valid() {
        let (tokens, _, clock) = cut();
        tokens.store(&response("a", None));
        clock.advance(Duration::days(365));
        assert_that(tokens.is_session_valid()).is_true();
    }

    #[test]
    fn unreadable_expiry_clears_session() {
        let (tokens, store, _) = cut();
        tokens.store(&response("a", Some(60)));
        store.set(keys::TOKEN_EXPIRES_AT, "soon".to_owned());

        assert_that(tokens.is_session_valid()).is_false();
        assert_that(store.get(keys::ACCESS_TOKEN)).is_equal_to(None);
    }

    #[test]
    fn absent_tokens_keep_previous_values() {
        let (tokens, _, _) = cut();
        tokens.store(&TokenResponse {
            access_token: Some("a1".to_owned()),
            id_token: Some("i1".to_owned()),
            refresh_token: Some("r1".to_owned()),
            expires_in: Some(60),
            ..Default::default()
        });
        tokens.store(&response("a2", Some(120)));

        let current = tokens.current_tokens().unwrap();
        assert_that(current.access_token.as_str()).is_equal_to("a2");
        assert_that(current.id_token).is_equal_to(Some("i1".to_owned()));
        assert_that(current.refresh_token).is_equal_to(Some("r1".to_owned()));
    }

    #[test]
    fn response_without_expiry_drops_previous_expiry() {
        let (tokens, _, clock) = cut();
        tokens.store(&response("a1", Some(60)));
        tokens.store(&response("a2", None));

        assert_that(tokens.current_tokens().unwrap().expires_at).is_equal_to(None);
        clock.advance(Duration::seconds(61));
        assert_that(tokens.is_session_valid()).is_true();
    }

    #[test]
    fn clear_is_idempotent() {
        let (tokens, store, _) = cut();
        tokens.store(&response("a", Some(60)));
        tokens.clear();
        tokens.clear();
        assert_that(store.is_empty()).is_true();
        assert_that(tokens.is_session_valid()).is_false();
    }

    #[test]
    fn current_tokens_reports_expiry() {
        let (tokens, _, clock) = cut();
        tokens.store(&response("a", Some(10)));
        let current = tokens.current_tokens().unwrap();
        assert_that(current.expires_at).is_equal_to(Some(clock.now() + Duration::seconds(10)));
        assert_that(current.is_expired_at(clock.now())).is_false();
        assert_that(current.is_expired_at(clock.now() + Duration::seconds(10))).is_true();
    }
}
