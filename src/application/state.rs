use tokio::sync::watch;

use crate::domain::Person;
use crate::ports::TranslatedError;

/// Mirrored collection as seen by readers.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceState<T> {
    pub data: Option<Vec<T>>,
    pub loading: bool,
    pub error: Option<TranslatedError>,
}

impl<T> Default for SliceState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }
}

/// Single-writer, many-reader slice of application state.
///
/// Data, loading flag and error are set independently; readers either take a
/// snapshot or wait for a state they care about.
pub struct StateSlice<T> {
    tx: watch::Sender<SliceState<T>>,
}

impl<T: Clone> StateSlice<T> {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SliceState::default());
        Self { tx }
    }

    pub fn set_data(&self, data: Option<Vec<T>>) {
        self.tx.send_modify(move |state| state.data = data);
    }

    pub fn set_loading(&self, loading: bool) {
        self.tx.send_modify(|state| state.loading = loading);
    }

    pub fn set_error(&self, error: Option<TranslatedError>) {
        self.tx.send_modify(move |state| state.error = error);
    }

    pub fn snapshot(&self) -> SliceState<T> {
        self.tx.borrow().clone()
    }

    /// Current documents, empty when nothing has been mirrored.
    pub fn data(&self) -> Vec<T> {
        self.tx.borrow().data.clone().unwrap_or_default()
    }

    /// Waits until `ready` holds for the slice and returns that state.
    pub async fn wait_for(&self, ready: impl FnMut(&SliceState<T>) -> bool) -> SliceState<T> {
        let mut rx = self.tx.subscribe();
        let state = match rx.wait_for(ready).await {
            Ok(state) => state.clone(),
            // the sender lives in `self`, so the channel cannot be closed here
            Err(_) => self.snapshot(),
        };
        state
    }
}

impl<T: Clone> Default for StateSlice<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Signed-in identity, observed by the collection mirrors.
pub struct AuthState {
    tx: watch::Sender<Option<Person>>,
}

impl AuthState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn sign_in(&self, person: Person) {
        tracing::info!("Signed in as {person}");
        self.tx.send_replace(Some(person));
    }

    pub fn sign_out(&self) {
        tracing::info!("Signed out");
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<Person> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Person>> {
        self.tx.subscribe()
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}
