use super::error::{FetchError, FetchResult};
use bytes::Bytes;
use std::collections::VecDeque;
use std::fmt;

/// Upper bound on the buffer reserved up front from an advertised length.
const MAX_PREALLOC_BYTES: u64 = 8 * 1024 * 1024;

/// Where the bytes of a [`ByteStream`] come from.
enum Body {
    /// A live HTTP response, read chunk by chunk as the server sends it
    Http(reqwest::Response),

    /// Data already in memory, split into chunks
    Memory(VecDeque<Bytes>),
}

/// A sequential, forward-only reader over a fetched document body.
///
/// The stream never buffers the whole document on its own: chunks are pulled
/// from the underlying response only when [`next_chunk`](ByteStream::next_chunk)
/// is called. Whoever holds the stream owns it; the loader that produced it
/// keeps no reference.
pub struct ByteStream {
    /// URL (or label) the stream was opened from
    source: String,

    /// Length advertised by the source, if known
    content_length: Option<u64>,

    /// Bytes handed out so far
    bytes_read: u64,

    /// Optional ceiling on the total body size
    limit: Option<u64>,

    body: Body,
}

impl ByteStream {
    /// Wraps a successful HTTP response.
    pub(crate) fn from_response(response: reqwest::Response, limit: Option<u64>) -> Self {
        ByteStream {
            source: response.url().to_string(),
            content_length: response.content_length(),
            bytes_read: 0,
            limit,
            body: Body::Http(response),
        }
    }

    /// Creates a stream over in-memory data.
    ///
    /// # Example
    /// ```
    /// use pdf_fetch::core::ByteStream;
    ///
    /// let stream = ByteStream::from_bytes("memory", b"%PDF-1.4".to_vec());
    /// assert_eq!(stream.content_length(), Some(8));
    /// ```
    pub fn from_bytes(source: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::from_chunks(source, vec![data.into()])
    }

    /// Creates a stream that yields the given chunks in order.
    pub fn from_chunks(source: impl Into<String>, chunks: Vec<Bytes>) -> Self {
        let length = chunks.iter().map(|c| c.len() as u64).sum();
        ByteStream {
            source: source.into(),
            content_length: Some(length),
            bytes_read: 0,
            limit: None,
            body: Body::Memory(chunks.into_iter().filter(|c| !c.is_empty()).collect()),
        }
    }

    /// Sets a ceiling on the number of bytes this stream will yield.
    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Returns the URL the stream was opened from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the length advertised by the source, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Returns the number of bytes yielded so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Reads the next chunk of the body.
    ///
    /// Returns `Ok(None)` once the body is exhausted. Fails if the transport
    /// breaks mid-body or the configured size limit is exceeded.
    pub async fn next_chunk(&mut self) -> FetchResult<Option<Bytes>> {
        let chunk = match &mut self.body {
            Body::Http(response) => response.chunk().await?,
            Body::Memory(chunks) => chunks.pop_front(),
        };

        let Some(chunk) = chunk else {
            return Ok(None);
        };

        self.bytes_read += chunk.len() as u64;
        if let Some(limit) = self.limit {
            if self.bytes_read > limit {
                return Err(FetchError::new(format!(
                    "Document from {} exceeds the {} byte limit",
                    self.source, limit
                )));
            }
        }

        Ok(Some(chunk))
    }

    /// Drains the rest of the stream into a single buffer.
    pub async fn read_to_end(mut self) -> FetchResult<Vec<u8>> {
        // The advertised length is only a hint; the buffer grows with the body
        let capacity = self
            .content_length
            .map(|len| self.limit.map_or(len, |limit| len.min(limit)))
            .map_or(0, |len| len.min(MAX_PREALLOC_BYTES) as usize);
        let mut data = Vec::with_capacity(capacity);

        while let Some(chunk) = self.next_chunk().await? {
            data.extend_from_slice(&chunk);
        }

        Ok(data)
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.body {
            Body::Http(_) => "http",
            Body::Memory(_) => "memory",
        };
        f.debug_struct("ByteStream")
            .field("source", &self.source)
            .field("kind", &kind)
            .field("content_length", &self.content_length)
            .field("bytes_read", &self.bytes_read)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunks_are_yielded_in_order() {
        let mut stream = ByteStream::from_chunks(
            "memory",
            vec![Bytes::from_static(b"%PDF"), Bytes::new(), Bytes::from_static(b"-1.7")],
        );

        assert_eq!(stream.content_length(), Some(8));
        assert_eq!(stream.next_chunk().await.unwrap().as_deref(), Some(&b"%PDF"[..]));
        assert_eq!(stream.next_chunk().await.unwrap().as_deref(), Some(&b"-1.7"[..]));
        assert_eq!(stream.next_chunk().await.unwrap(), None);
        assert_eq!(stream.bytes_read(), 8);
    }

    #[tokio::test]
    async fn test_read_to_end() {
        let stream = ByteStream::from_chunks(
            "memory",
            vec![Bytes::from_static(b"abc"), Bytes::from_static(b"def")],
        );
        assert_eq!(stream.read_to_end().await.unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn test_huge_advertised_length_does_not_preallocate() {
        let mut stream = ByteStream::from_bytes("memory", b"%PDF-1.4".to_vec());
        stream.content_length = Some(1_000_000_000_000_000);

        let data = stream.read_to_end().await.unwrap();
        assert_eq!(data, b"%PDF-1.4");
        assert!(data.capacity() as u64 <= MAX_PREALLOC_BYTES);
    }

    #[tokio::test]
    async fn test_limit_is_enforced() {
        let stream = ByteStream::from_chunks(
            "http://example.test/big.pdf",
            vec![Bytes::from_static(b"0123"), Bytes::from_static(b"4567")],
        )
        .with_limit(Some(6));

        let err = stream.read_to_end().await.unwrap_err();
        let message = err.message.unwrap();
        assert!(message.contains("6 byte limit"), "unexpected message: {}", message);
        assert!(message.contains("big.pdf"));
    }

    #[tokio::test]
    async fn test_limit_equal_to_length_is_fine() {
        let stream = ByteStream::from_bytes("memory", b"1234".to_vec()).with_limit(Some(4));
        assert_eq!(stream.read_to_end().await.unwrap().len(), 4);
    }

    #[test]
    fn test_debug_output() {
        let stream = ByteStream::from_bytes("memory", b"x".to_vec());
        let text = format!("{:?}", stream);
        assert!(text.contains("memory"));
        assert!(text.contains("content_length: Some(1)"));
    }
}
