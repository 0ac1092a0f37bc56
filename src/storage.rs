use codee::string::FromToStringCodec;
use leptos::prelude::{GetUntracked, Set, Signal, WriteSignal};
use leptos_use::storage::{
    StorageType, UseStorageError, UseStorageOptions, use_storage_with_options,
};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

/// Keys of all values this crate persists. Everything lives in session scoped storage.
pub mod keys {
    pub const PKCE_STATE: &str = "pkce_state";
    pub const PKCE_CODE_VERIFIER: &str = "pkce_code_verifier";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const ID_TOKEN: &str = "id_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// String encoded epoch milliseconds.
    pub const TOKEN_EXPIRES_AT: &str = "token_expires_at";

    pub const ALL: [&str; 6] = [
        PKCE_STATE,
        PKCE_CODE_VERIFIER,
        ACCESS_TOKEN,
        ID_TOKEN,
        REFRESH_TOKEN,
        TOKEN_EXPIRES_AT,
    ];
}

/// Key/value storage scoped to one session (one browser tab).
pub trait SessionKeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

impl<S: SessionKeyValueStore + ?Sized> SessionKeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) {
        (**self).set(key, value);
    }

    fn remove(&self, key: &str) {
        (**self).remove(key);
    }
}

/// Process local store. Used outside the browser and in tests.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionKeyValueStore for InMemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[derive(Clone)]
struct SessionEntry {
    read: Signal<String>,
    write: WriteSignal<String>,
    remove: Arc<dyn Fn() + Send + Sync>,
}

/// Browser `sessionStorage` backed store. One reactive storage entry per known key.
///
/// Must be created inside a reactive owner. Unknown keys are ignored.
#[derive(Clone)]
pub struct BrowserSessionStore {
    entries: Arc<HashMap<&'static str, SessionEntry>>,
}

impl Debug for BrowserSessionStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSessionStore")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl BrowserSessionStore {
    pub fn new() -> Self {
        let entries = keys::ALL
            .into_iter()
            .map(|key| (key, use_session_entry(key)))
            .collect::<HashMap<_, _>>();
        Self {
            entries: Arc::new(entries),
        }
    }

    fn entry(&self, key: &str) -> Option<&SessionEntry> {
        let entry = self.entries.get(key);
        if entry.is_none() {
            tracing::debug!(key, "Ignoring access to unknown session storage key.");
        }
        entry
    }
}

impl Default for BrowserSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionKeyValueStore for BrowserSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entry(key)
            .map(|entry| entry.read.get_untracked())
            .filter(|value| !value.is_empty())
    }

    fn set(&self, key: &str, value: String) {
        if let Some(entry) = self.entry(key) {
            entry.write.set(value);
        }
    }

    fn remove(&self, key: &str) {
        if let Some(entry) = self.entry(key) {
            // Resetting the signal first keeps reactive readers consistent with the storage.
            entry.write.set(String::new());
            (entry.remove)();
        }
    }
}

fn use_session_entry(key: &'static str) -> SessionEntry {
    let options = UseStorageOptions::default()
        .initial_value(String::new())
        .listen_to_storage_changes(true)
        .delay_during_hydration(false)
        .on_error(move |err| {
            let log_as_error = match &err {
                UseStorageError::StorageNotAvailable(_)
                | UseStorageError::StorageReturnedNone
                | UseStorageError::GetItemFailed(_)
                | UseStorageError::SetItemFailed(_)
                | UseStorageError::RemoveItemFailed(_)
                | UseStorageError::NotifyItemChangedFailed(_) => true,
                UseStorageError::ItemCodecError(_) => false,
            };
            if log_as_error {
                tracing::error!(?err, "Error accessing '{key}' in session storage.");
            } else {
                tracing::debug!(?err, "Could not decode '{key}' from session storage.");
            }
        });

    let (read, write, remove) =
        use_storage_with_options::<String, FromToStringCodec>(StorageType::Session, key, options);

    SessionEntry {
        read,
        write,
        remove: Arc::new(remove),
    }
}
