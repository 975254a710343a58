pub mod byte_stream;
pub mod document;
pub mod error;
pub mod loader;
pub mod outline;
pub mod publisher;
pub mod state;

pub use byte_stream::ByteStream;
pub use document::{DocumentMeta, PdfDocument};
pub use error::{DocumentError, DocumentResult, FetchError, FetchResult};
pub use loader::{HttpLoader, Loader};
pub use outline::Bookmark;
pub use publisher::{DocumentState, LoadOutcome, LoadTicket, StateObserver, StatePublisher};
pub use state::{Handoff, LoadState};
