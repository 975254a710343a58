//! Observable load-state machine.
//!
//! A [`StatePublisher`] owns the current [`LoadState`] of one load session and
//! the list of observers watching it. Each call to
//! [`load_pdf`](StatePublisher::load_pdf) emits `Loading` immediately, runs the
//! fetch on a Tokio task, and emits the outcome when it arrives:
//!
//! ```text
//! Idle ──load_pdf──► Loading ──ok──► Success(stream)
//!                       ▲    └─err─► Error(reason)
//!                       └──────load_pdf again──────┘
//! ```
//!
//! Loads are tagged with a monotonically increasing token. Starting a new load
//! aborts the previous fetch, and any result whose token is no longer current
//! is dropped instead of published, so a slow stale response can never
//! overwrite a newer one.

use super::byte_stream::ByteStream;
use super::error::FetchResult;
use super::loader::{HttpLoader, Loader};
use super::state::{Handoff, LoadState};
use crate::config::FetchConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

/// The state type published by [`StatePublisher`].
pub type DocumentState = LoadState<Handoff<ByteStream>>;

/// State shared between the publisher and its fetch tasks.
struct Session {
    /// The most recently emitted state
    current: DocumentState,

    /// One channel per live observer
    observers: Vec<mpsc::UnboundedSender<DocumentState>>,

    /// Token of the most recent load request
    token: u64,

    /// Abort handle of the most recent fetch task
    in_flight: Option<AbortHandle>,
}

impl Session {
    /// Records `state` as current and delivers it to every observer,
    /// dropping observers that have gone away.
    fn emit(&mut self, state: DocumentState) {
        self.observers.retain(|tx| tx.send(state.clone()).is_ok());
        debug!(
            state = state.name(),
            observers = self.observers.len(),
            token = self.token,
            "Emitted load state"
        );
        self.current = state;
    }
}

/// Publishes the load lifecycle of a document to any number of observers.
///
/// # Example
/// ```no_run
/// use pdf_fetch::config::FetchConfig;
/// use pdf_fetch::core::{LoadState, StatePublisher};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let publisher = StatePublisher::from_config(&FetchConfig::default())?;
///     let mut observer = publisher.observe();
///
///     publisher.load_pdf(None);
///
///     while let Some(state) = observer.next().await {
///         match state {
///             LoadState::Idle => {}
///             LoadState::Loading => println!("loading..."),
///             LoadState::Success(handoff) => {
///                 if let Some(stream) = handoff.take() {
///                     println!("{} bytes", stream.read_to_end().await?.len());
///                 }
///                 break;
///             }
///             LoadState::Error(reason) => {
///                 println!("error: {:?}", reason);
///                 break;
///             }
///         }
///     }
///     Ok(())
/// }
/// ```
pub struct StatePublisher<L = HttpLoader> {
    loader: Arc<L>,
    default_url: String,
    session: Arc<Mutex<Session>>,
}

impl StatePublisher<HttpLoader> {
    /// Creates a publisher with an [`HttpLoader`] built from `config`.
    pub fn from_config(config: &FetchConfig) -> FetchResult<Self> {
        let loader = HttpLoader::new(config)?;
        Ok(Self::new(loader, config.default_url.clone()))
    }
}

impl<L: Loader> StatePublisher<L> {
    /// Creates a publisher in the `Idle` state.
    pub fn new(loader: L, default_url: impl Into<String>) -> Self {
        Self::with_shared_loader(Arc::new(loader), default_url)
    }

    /// Creates a publisher around a loader that is shared with other sessions.
    pub fn with_shared_loader(loader: Arc<L>, default_url: impl Into<String>) -> Self {
        StatePublisher {
            loader,
            default_url: default_url.into(),
            session: Arc::new(Mutex::new(Session {
                current: LoadState::Idle,
                observers: Vec::new(),
                token: 0,
                in_flight: None,
            })),
        }
    }

    /// Starts loading `url`, or the default URL when `None`.
    ///
    /// `Loading` is emitted before this returns. The fetch runs on a spawned
    /// task, so this must be called from within a Tokio runtime. Any fetch
    /// still running from an earlier call is aborted and its result will not
    /// be published.
    ///
    /// The returned ticket can be awaited to know when this request has
    /// finished; dropping it does not cancel anything.
    pub fn load_pdf(&self, url: Option<&str>) -> LoadTicket {
        let url = url.unwrap_or(&self.default_url).to_string();

        let mut session = self.session.lock();
        session.token += 1;
        let token = session.token;

        if let Some(previous) = session.in_flight.take() {
            if !previous.is_finished() {
                warn!(token, "Aborting superseded fetch");
                previous.abort();
            }
        }

        session.emit(LoadState::Loading);

        let loader = Arc::clone(&self.loader);
        let shared = Arc::clone(&self.session);
        let handle = tokio::spawn(async move {
            let outcome = match loader.fetch(&url).await {
                Ok(stream) => LoadState::Success(Handoff::new(stream)),
                Err(e) => {
                    debug!(url = %url, error = %e, "Fetch failed");
                    LoadState::Error(e.into_message())
                }
            };

            let mut session = shared.lock();
            if session.token != token {
                warn!(
                    token,
                    current = session.token,
                    "Dropping result of superseded load"
                );
                return false;
            }
            session.emit(outcome);
            true
        });

        session.in_flight = Some(handle.abort_handle());

        LoadTicket { token, handle }
    }

    /// Subscribes a new observer.
    ///
    /// The observer first receives the current state (latest-only, no
    /// history), then every subsequent transition in order.
    pub fn observe(&self) -> StateObserver {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut session = self.session.lock();
        // Cannot fail: the receiver is still in hand.
        let _ = tx.send(session.current.clone());
        session.observers.push(tx);
        StateObserver { rx }
    }

    /// Returns a snapshot of the current state.
    pub fn current(&self) -> DocumentState {
        self.session.lock().current.clone()
    }

    /// Returns the URL used when `load_pdf` gets `None`.
    pub fn default_url(&self) -> &str {
        &self.default_url
    }
}

impl<L> StatePublisher<L> {
    /// Number of observers that were alive at the last emission.
    pub fn observer_count(&self) -> usize {
        self.session.lock().observers.len()
    }
}

impl<L> Drop for StatePublisher<L> {
    fn drop(&mut self) {
        let mut session = self.session.lock();
        if let Some(in_flight) = session.in_flight.take() {
            if !in_flight.is_finished() {
                debug!("Session ended with a fetch in flight, aborting");
                in_flight.abort();
            }
        }
        // Ends every observer stream
        session.observers.clear();
    }
}

/// A subscription to a publisher's state transitions.
#[derive(Debug)]
pub struct StateObserver {
    rx: mpsc::UnboundedReceiver<DocumentState>,
}

impl StateObserver {
    /// Waits for the next state. Returns `None` once the session has ended.
    pub async fn next(&mut self) -> Option<DocumentState> {
        self.rx.recv().await
    }

    /// Returns the next state if one is already queued.
    pub fn try_next(&mut self) -> Option<DocumentState> {
        self.rx.try_recv().ok()
    }

    /// Skips ahead to the next `Success` or `Error`.
    pub async fn next_terminal(&mut self) -> Option<DocumentState> {
        while let Some(state) = self.next().await {
            if state.is_terminal() {
                return Some(state);
            }
        }
        None
    }
}

/// Handle to one `load_pdf` request.
#[derive(Debug)]
pub struct LoadTicket {
    token: u64,
    handle: JoinHandle<bool>,
}

/// How a load request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The request's `Success` or `Error` was published
    Published,

    /// A newer request or session teardown made this one obsolete
    Superseded,
}

impl LoadTicket {
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Waits until the request has either published its result or been
    /// superseded.
    pub async fn finished(self) -> LoadOutcome {
        match self.handle.await {
            Ok(true) => LoadOutcome::Published,
            Ok(false) => LoadOutcome::Superseded,
            Err(e) if e.is_cancelled() => LoadOutcome::Superseded,
            Err(e) => {
                warn!(token = self.token, error = %e, "Fetch task panicked");
                LoadOutcome::Superseded
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FetchError;
    use async_trait::async_trait;

    /// Succeeds for URLs ending in ".pdf", fails for everything else.
    struct SuffixLoader;

    #[async_trait]
    impl Loader for SuffixLoader {
        async fn fetch(&self, url: &str) -> FetchResult<ByteStream> {
            if url.ends_with(".pdf") {
                Ok(ByteStream::from_bytes(url, b"%PDF-1.4".to_vec()))
            } else {
                Err(FetchError::new(format!("not a pdf: {}", url)))
            }
        }
    }

    #[tokio::test]
    async fn test_initial_state_is_idle() {
        let publisher = StatePublisher::new(SuffixLoader, "mem://doc.pdf");
        assert!(publisher.current().is_idle());

        let mut observer = publisher.observe();
        assert!(observer.next().await.unwrap().is_idle());
        assert!(observer.try_next().is_none());
    }

    #[tokio::test]
    async fn test_success_sequence() {
        let publisher = StatePublisher::new(SuffixLoader, "mem://doc.pdf");
        let mut observer = publisher.observe();

        let ticket = publisher.load_pdf(None);
        assert_eq!(ticket.finished().await, LoadOutcome::Published);

        assert!(observer.next().await.unwrap().is_idle());
        assert!(observer.next().await.unwrap().is_loading());
        match observer.next().await.unwrap() {
            LoadState::Success(handoff) => {
                let stream = handoff.take().unwrap();
                assert_eq!(stream.source(), "mem://doc.pdf");
            }
            other => panic!("expected Success, got {:?}", other),
        }
        assert!(observer.try_next().is_none());
    }

    #[tokio::test]
    async fn test_error_sequence() {
        let publisher = StatePublisher::new(SuffixLoader, "mem://doc.pdf");
        let mut observer = publisher.observe();

        publisher.load_pdf(Some("mem://notes.txt")).finished().await;

        assert!(observer.next().await.unwrap().is_idle());
        assert!(observer.next().await.unwrap().is_loading());
        assert_eq!(
            observer.next().await.unwrap(),
            LoadState::Error(Some("not a pdf: mem://notes.txt".to_string()))
        );
    }

    #[tokio::test]
    async fn test_dropped_observers_are_pruned() {
        let publisher = StatePublisher::new(SuffixLoader, "mem://doc.pdf");
        let kept = publisher.observe();
        drop(publisher.observe());
        assert_eq!(publisher.observer_count(), 2);

        publisher.load_pdf(None).finished().await;
        assert_eq!(publisher.observer_count(), 1);
        drop(kept);
    }

    #[tokio::test]
    async fn test_drop_ends_observer_streams() {
        let publisher = StatePublisher::new(SuffixLoader, "mem://doc.pdf");
        let mut observer = publisher.observe();
        drop(publisher);

        assert!(observer.next().await.unwrap().is_idle());
        assert!(observer.next().await.is_none());
    }

    #[tokio::test]
    async fn test_tokens_increase() {
        let publisher = StatePublisher::new(SuffixLoader, "mem://doc.pdf");
        let first = publisher.load_pdf(None);
        let second = publisher.load_pdf(None);
        assert!(second.token() > first.token());
        second.finished().await;
    }
}
