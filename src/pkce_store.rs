use crate::code_verifier::CodeVerifier;
use crate::crypto::{RandomSourceError, SecureRandomSource};
use crate::csrf_token::CsrfToken;
use crate::storage::{SessionKeyValueStore, keys};

/// The `state` and `code_verifier` of the one login attempt currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub state: CsrfToken,
    pub code_verifier: CodeVerifier,
}

/// Single-flight, single-use storage of the pending authorization.
///
/// `begin` replaces whatever was pending before. `consume` reads and erases, so a second call
/// yields `None`.
#[derive(Debug, Clone)]
pub struct PkceStateStore<S> {
    store: S,
}

impl<S: SessionKeyValueStore> PkceStateStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn begin(
        &self,
        random: &impl SecureRandomSource,
    ) -> Result<PendingAuthorization, RandomSourceError> {
        // Generate both values before touching storage, so a failing random source leaves
        // no half written authorization behind.
        let state = CsrfToken::generate(random)?;
        let code_verifier = CodeVerifier::generate(random)?;

        if self.store.get(keys::PKCE_STATE).is_some() {
            tracing::debug!("Discarding previously pending authorization.");
        }
        self.store.set(keys::PKCE_STATE, state.as_str().to_owned());
        self.store.set(
            keys::PKCE_CODE_VERIFIER,
            code_verifier.code_verifier().to_owned(),
        );
        tracing::trace!("Stored new pending authorization.");

        Ok(PendingAuthorization {
            state,
            code_verifier,
        })
    }

    /// Read and erase the pending authorization.
    ///
    /// Both entries are removed regardless of what was found. A stored state without a verifier
    /// is returned with an empty verifier; callers must reject it.
    pub fn consume(&self) -> Option<PendingAuthorization> {
        let state = self.store.get(keys::PKCE_STATE);
        let code_verifier = self.store.get(keys::PKCE_CODE_VERIFIER);

        self.store.remove(keys::PKCE_STATE);
        self.store.remove(keys::PKCE_CODE_VERIFIER);

        let state = state?;
        Some(PendingAuthorization {
            state: CsrfToken::from_stored(state),
            code_verifier: CodeVerifier::from_stored(code_verifier.unwrap_or_default()),
        })
    }

    pub fn clear(&self) {
        self.store.remove(keys::PKCE_STATE);
        self.store.remove(keys::PKCE_CODE_VERIFIER);
    }

    pub fn has_pending(&self) -> bool {
        self.store.get(keys::PKCE_STATE).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::OsRandom;
    use crate::storage::InMemorySessionStore;
    use assertr::prelude::*;
    use std::sync::Arc;

    fn cut() -> (PkceStateStore<Arc<InMemorySessionStore>>, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::new());
        (PkceStateStore::new(Arc::clone(&store)), store)
    }

    #[test]
    fn begin_persists_state_and_verifier() {
        let (pkce, store) = cut();
        let pending = pkce.begin(&OsRandom).unwrap();

        assert_that(store.get(keys::PKCE_STATE)).is_equal_to(Some(pending.state.as_str().to_owned()));
        assert_that(store.get(keys::PKCE_CODE_VERIFIER))
            .is_equal_to(Some(pending.code_verifier.code_verifier().to_owned()));
    }

    #[test]
    fn consume_twice_yields_none_the_second_time() {
        let (pkce, store) = cut();
        let pending = pkce.begin(&OsRandom).unwrap();

        assert_that(pkce.consume()).is_equal_to(Some(pending));
        assert_that(pkce.consume()).is_equal_to(None);
        assert_that(store.is_empty()).is_true();
    }

    #[test]
    fn consume_without_begin_yields_none() {
        let (pkce, _store) = cut();
        assert_that(pkce.consume()).is_equal_to(None);
    }

    #[test]
    fn second_begin_replaces_first() {
        let (pkce, _store) = cut();
        let first = pkce.begin(&OsRandom).unwrap();
        let second = pkce.begin(&OsRandom).unwrap();

        assert_that(first.state.as_str()).is_not_equal_to(second.state.as_str());
        assert_that(pkce.consume()).is_equal_to(Some(second));
    }

    #[test]
    fn generated_values_are_url_safe_and_unique() {
        let (pkce, _store) = cut();
        let mut previous: Option<String> = None;
        for _ in 0..1000 {
            let pending = pkce.begin(&OsRandom).unwrap();
            for value in [pending.state.as_str(), pending.code_verifier.code_verifier()] {
                assert_that(value.is_empty()).is_false();
                assert_that(value.contains(['+', '/', '='])).is_false();
            }
            assert_that(previous.as_deref() == Some(pending.state.as_str())).is_false();
            previous = Some(pending.state.as_str().to_owned());
        }
    }

    #[test]
    fn consume_with_missing_verifier_returns_empty_verifier() {
        let (pkce, store) = cut();
        store.set(keys::PKCE_STATE, "s".to_owned());

        let pending = pkce.consume().unwrap();
        assert_that(pending.code_verifier.is_empty()).is_true();
        assert_that(store.is_empty()).is_true();
    }
}
