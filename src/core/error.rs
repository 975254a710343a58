use thiserror::Error;

/// Failure of a document fetch.
///
/// Every transport-level problem (DNS failure, refused connection, timeout,
/// malformed or empty URL, non-2xx status, oversized body) collapses into this
/// single kind. The message is the only detail carried; it is optional because
/// some transport failures have nothing useful to say.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .message.as_deref().unwrap_or("fetch failed"))]
pub struct FetchError {
    pub message: Option<String>,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        FetchError {
            message: Some(message.into()),
        }
    }

    /// An error without a message.
    pub fn unknown() -> Self {
        FetchError { message: None }
    }

    /// Consumes the error and returns its message, if any.
    pub fn into_message(self) -> Option<String> {
        self.message
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest's Display omits the source chain ("error sending request"),
        // which hides the DNS/connect reason. Walk it so the message is useful.
        let mut message = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        FetchError::new(message)
    }
}

/// Result type alias for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors raised while inspecting a downloaded document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The bytes could not be parsed as a PDF
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),

    /// The trailer has no usable /Root catalog
    #[error("Document catalog not found")]
    MissingCatalog,

    /// The outline tree is structurally broken
    #[error("Invalid outline: {0}")]
    InvalidOutline(String),

    /// A configured page index does not exist in the document
    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },
}

/// Result type alias for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;
