//! Load-state values published to observers.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// The lifecycle of a single document load.
///
/// Exactly one variant is active at a time. A session starts in `Idle`, every
/// load request moves it to `Loading`, and each request resolves to either
/// `Success` or `Error`. There is no `Idle -> Success/Error` shortcut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
    /// No load has been requested yet
    Idle,

    /// A fetch is in flight
    Loading,

    /// The fetch completed with the given payload
    Success(T),

    /// The fetch failed, with an optional human-readable reason
    Error(Option<String>),
}

impl<T> LoadState<T> {
    pub fn idle() -> Self {
        LoadState::Idle
    }

    pub fn loading() -> Self {
        LoadState::Loading
    }

    pub fn success(data: T) -> Self {
        LoadState::Success(data)
    }

    pub fn error(message: Option<String>) -> Self {
        LoadState::Error(message)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, LoadState::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    /// Returns true for `Success` and `Error`, the states a request ends in.
    pub fn is_terminal(&self) -> bool {
        match self {
            LoadState::Idle | LoadState::Loading => false,
            LoadState::Success(_) | LoadState::Error(_) => true,
        }
    }

    /// Transforms the success payload, leaving the other variants untouched.
    pub fn map<U, F>(self, f: F) -> LoadState<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            LoadState::Idle => LoadState::Idle,
            LoadState::Loading => LoadState::Loading,
            LoadState::Success(data) => LoadState::Success(f(data)),
            LoadState::Error(message) => LoadState::Error(message),
        }
    }

    /// Short variant name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            LoadState::Idle => "Idle",
            LoadState::Loading => "Loading",
            LoadState::Success(_) => "Success",
            LoadState::Error(_) => "Error",
        }
    }
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        LoadState::Idle
    }
}

/// A cloneable cell that hands its value to exactly one taker.
///
/// State values are shared by every observer, but a byte stream can only be
/// consumed once. Wrapping it in a `Handoff` lets all observers see the same
/// `Success` while the first one to call [`take`](Handoff::take) becomes the
/// sole owner of the stream.
pub struct Handoff<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Handoff<T> {
    pub fn new(value: T) -> Self {
        Handoff {
            slot: Arc::new(Mutex::new(Some(value))),
        }
    }

    /// Moves the value out. Returns `None` once any clone has taken it.
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    pub fn is_taken(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl<T> Clone for Handoff<T> {
    fn clone(&self) -> Self {
        Handoff {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> PartialEq for Handoff<T> {
    /// Two handoffs are equal when they share the same slot.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T> Eq for Handoff<T> {}

impl<T> fmt::Debug for Handoff<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handoff")
            .field("taken", &self.is_taken())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let state: LoadState<u8> = LoadState::default();
        assert!(state.is_idle());
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_terminal_variants() {
        assert!(LoadState::success(1).is_terminal());
        assert!(LoadState::<u8>::error(None).is_terminal());
        assert!(!LoadState::<u8>::loading().is_terminal());
        assert!(LoadState::<u8>::loading().is_loading());
    }

    #[test]
    fn test_map_only_touches_success() {
        assert_eq!(LoadState::success(2).map(|n| n * 10), LoadState::Success(20));
        assert_eq!(
            LoadState::<u8>::error(Some("boom".into())).map(|n| n * 10),
            LoadState::Error(Some("boom".into()))
        );
        assert_eq!(LoadState::<u8>::Loading.map(|n| n * 10), LoadState::Loading);
    }

    #[test]
    fn test_names() {
        assert_eq!(LoadState::<u8>::Idle.name(), "Idle");
        assert_eq!(LoadState::success(()).name(), "Success");
    }

    #[test]
    fn test_handoff_takes_once_across_clones() {
        let first = Handoff::new(String::from("stream"));
        let second = first.clone();

        assert!(!second.is_taken());
        assert_eq!(second.take().as_deref(), Some("stream"));
        assert!(first.is_taken());
        assert_eq!(first.take(), None);
        assert_eq!(first, second);
    }

    #[test]
    fn test_handoff_identity() {
        let a = Handoff::new(1);
        let b = Handoff::new(1);
        assert_ne!(a, b);
    }
}
