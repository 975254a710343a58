//! Network fetch of a document body.
//!
//! A [`Loader`] turns a URL into a [`ByteStream`] over the response body. The
//! default implementation, [`HttpLoader`], uses reqwest and hands back the
//! response as soon as the headers arrive; the body is pulled lazily by the
//! stream's owner.

use super::byte_stream::ByteStream;
use super::error::{FetchError, FetchResult};
use crate::config::FetchConfig;
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

/// Anything that can open a document stream from a URL.
///
/// Implementations must convert every failure into a [`FetchError`] and must
/// not retry. The returned stream belongs to the caller.
#[async_trait]
pub trait Loader: Send + Sync + 'static {
    async fn fetch(&self, url: &str) -> FetchResult<ByteStream>;
}

/// Loader backed by a shared reqwest client.
///
/// # Example
/// ```no_run
/// use pdf_fetch::config::FetchConfig;
/// use pdf_fetch::core::{HttpLoader, Loader};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let loader = HttpLoader::new(&FetchConfig::default())?;
///     let stream = loader.fetch("https://example.com/document.pdf").await?;
///     let bytes = stream.read_to_end().await?;
///     println!("PDF size: {} bytes", bytes.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct HttpLoader {
    /// HTTP client (connection pool is shared between clones)
    client: Client,

    /// Maximum body size accepted, if any
    max_document_bytes: Option<u64>,
}

impl HttpLoader {
    /// Builds a loader whose client honours the timeouts and user agent of
    /// `config`.
    pub fn new(config: &FetchConfig) -> FetchResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone());

        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::new(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(client, config.max_document_bytes))
    }

    /// Wraps an existing client.
    pub fn with_client(client: Client, max_document_bytes: Option<u64>) -> Self {
        HttpLoader {
            client,
            max_document_bytes,
        }
    }
}

#[async_trait]
impl Loader for HttpLoader {
    async fn fetch(&self, url: &str) -> FetchResult<ByteStream> {
        info!(url, "Fetching document");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(format!(
                "HTTP {} {} for {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                url
            )));
        }

        // Reject early when the server already tells us the body is too big
        if let (Some(limit), Some(length)) = (self.max_document_bytes, response.content_length()) {
            if length > limit {
                return Err(FetchError::new(format!(
                    "Document from {} is {} bytes, over the {} byte limit",
                    url, length, limit
                )));
            }
        }

        info!(
            url,
            status = status.as_u16(),
            content_length = ?response.content_length(),
            "Response headers received"
        );

        Ok(ByteStream::from_response(response, self.max_document_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_url_is_a_fetch_error() {
        let loader = HttpLoader::new(&FetchConfig::default()).unwrap();
        let err = loader.fetch("").await.unwrap_err();
        assert!(err.message.is_some());
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_a_fetch_error() {
        let loader = HttpLoader::new(&FetchConfig::default()).unwrap();
        let result = loader.fetch("ftp://example.com/doc.pdf").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_public_pdf() {
        let url = "https://www.w3.org/WAI/ER/tests/xhtml/testfiles/resources/pdf/dummy.pdf";
        let loader = HttpLoader::new(&FetchConfig::default()).unwrap();

        match loader.fetch(url).await {
            Ok(stream) => {
                let data = stream.read_to_end().await.unwrap();
                assert!(data.starts_with(b"%PDF"));
            }
            Err(e) => {
                println!("Test skipped (network error): {}", e);
            }
        }
    }
}
