//! # pdf-fetch
//!
//! Downloads a PDF from a URL and publishes the load lifecycle to observers.
//!
//! A session is a [`StatePublisher`]. It starts `Idle`; every
//! [`load_pdf`](StatePublisher::load_pdf) call moves it to `Loading` and then to
//! `Success` with a [`ByteStream`] over the response body, or to `Error` with
//! the failure message. Observers get the current state on subscription and
//! every transition after that.
//!
//! ```no_run
//! use pdf_fetch::config::FetchConfig;
//! use pdf_fetch::core::{LoadState, PdfDocument, StatePublisher};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FetchConfig::default();
//! let publisher = StatePublisher::from_config(&config)?;
//! let mut observer = publisher.observe();
//! publisher.load_pdf(None);
//!
//! if let Some(LoadState::Success(handoff)) = observer.next_terminal().await {
//!     if let Some(stream) = handoff.take() {
//!         let data = stream.read_to_end().await?;
//!         let doc = PdfDocument::load(&data, &config.viewer)?;
//!         for bookmark in doc.bookmarks()? {
//!             println!("{} -> {:?}", bookmark.title, bookmark.page_idx);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The downloaded bytes can be opened with [`PdfDocument`] to read the
//! document metadata and bookmark tree.

pub mod config;
pub mod core;

// Re-export main types for convenience
pub use config::{ConfigError, FetchConfig, FitPolicy, ViewerOptions};
pub use self::core::{
    Bookmark, ByteStream, DocumentError, DocumentMeta, DocumentState, FetchError, Handoff,
    HttpLoader, LoadOutcome, LoadState, LoadTicket, Loader, PdfDocument, StateObserver,
    StatePublisher,
};
