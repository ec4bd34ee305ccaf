//! A single named slot of durable storage, observed as an in-memory value.
//!
//! A [`StoredValue`] starts out `loading` and kicks off one read of its key
//! as soon as it is opened. `loading` flips to `false` when that first read
//! settles and never goes back, however many times the slot is refreshed or
//! saved afterwards.
//!
//! A read that was already in flight when the handle saved does not get to
//! replace the saved value with what it fetched.

use chaitr_core::{ChaitrError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::store::KeyValueStore;

/// Snapshot of a slot as seen by observers.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotState<T> {
    pub value: Option<T>,
    pub loading: bool,
}

/// Read-through/write-through handle on one key of a [`KeyValueStore`].
///
/// Two handles opened on the same key do not see each other's writes until
/// each of them refreshes.
pub struct StoredValue<T> {
    key: String,
    store: Arc<dyn KeyValueStore>,
    state: Arc<watch::Sender<SlotState<T>>>,
    writes: Arc<AtomicU64>,
    initial_read: JoinHandle<()>,
}

impl<T> StoredValue<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Open `key`, seeding the in-memory value with `initial_value`.
    ///
    /// The seed is not written anywhere until [`save`](Self::save) is called.
    /// Must be called from within a tokio runtime.
    pub fn open(store: Arc<dyn KeyValueStore>, key: impl Into<String>, initial_value: Option<T>) -> Self {
        let key = key.into();
        let (state, _) = watch::channel(SlotState {
            value: initial_value,
            loading: true,
        });
        let state = Arc::new(state);
        let writes = Arc::new(AtomicU64::new(0));

        let initial_read = tokio::spawn({
            let store = Arc::clone(&store);
            let state = Arc::clone(&state);
            let writes = Arc::clone(&writes);
            let key = key.clone();
            async move {
                if let Err(e) = read_slot(store.as_ref(), &key, &state, &writes).await {
                    warn!("Initial read of '{}' failed: {}", key, e);
                }
            }
        });

        Self {
            key,
            store,
            state,
            writes,
            initial_read,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Last known value: the stored record, or the seed if none was found.
    pub fn value(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    /// True until the first read of the slot has settled.
    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn subscribe(&self) -> watch::Receiver<SlotState<T>> {
        self.state.subscribe()
    }

    /// Wait for the initial read to settle.
    pub async fn loaded(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so this only returns once loading is over
        let _ = rx.wait_for(|slot| !slot.loading).await;
    }

    /// Re-read the slot. A missing record leaves the current value in place.
    pub async fn refresh(&self) -> Result<()> {
        read_slot(self.store.as_ref(), &self.key, &self.state, &self.writes).await
    }

    /// Durably write `new_value`, then adopt it as the in-memory value.
    ///
    /// If the write is rejected the in-memory value is left untouched.
    pub async fn save(&self, new_value: T) -> Result<()> {
        let raw = serde_json::to_string(&new_value)?;

        self.store
            .set(&self.key, &raw)
            .await
            .map_err(|e| match e {
                e @ ChaitrError::PersistenceWrite { .. } => e,
                other => ChaitrError::PersistenceWrite {
                    key: self.key.clone(),
                    message: other.to_string(),
                },
            })?;

        self.state.send_modify(|slot| {
            self.writes.fetch_add(1, Ordering::SeqCst);
            slot.value = Some(new_value);
        });
        debug!("Saved slot '{}'", self.key);
        Ok(())
    }
}

async fn read_slot<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
    state: &watch::Sender<SlotState<T>>,
    writes: &AtomicU64,
) -> Result<()> {
    let generation = writes.load(Ordering::SeqCst);
    let outcome = match store.get(key).await {
        Ok(Some(raw)) => serde_json::from_str::<T>(&raw)
            .map(Some)
            .map_err(ChaitrError::from),
        Ok(None) => Ok(None),
        Err(e @ ChaitrError::PersistenceRead { .. }) => Err(e),
        Err(other) => Err(ChaitrError::PersistenceRead {
            key: key.to_string(),
            message: other.to_string(),
        }),
    };

    let (found, result) = match outcome {
        Ok(found) => (found, Ok(())),
        Err(e) => (None, Err(e)),
    };
    debug!("Read slot '{}' (record found: {})", key, found.is_some());

    state.send_modify(move |slot| {
        // Stale if the handle saved while the read was in flight
        let stale = writes.load(Ordering::SeqCst) != generation;
        if let Some(value) = found.filter(|_| !stale) {
            slot.value = Some(value);
        }
        slot.loading = false;
    });

    result
}

impl<T> Drop for StoredValue<T> {
    fn drop(&mut self) {
        self.initial_read.abort();
    }
}

impl<T: fmt::Debug> fmt::Debug for StoredValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredValue")
            .field("key", &self.key)
            .field("state", &*self.state.borrow())
            .finish()
    }
}
