//! Cache Entry Module
//!
//! Request identity, response representation and the stored entry with its
//! expiration metadata.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

/// Chunk size used when streaming an in-memory body.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

// == Request Key ==
/// Request identity: method plus URL.
///
/// The method is upper-cased on construction; the URL is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: impl AsRef<str>, url: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            url: url.into(),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

// == Http Response ==
/// A fully received response. Cloning shares the body buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// True for 2xx statuses. Only these responses are ever persisted.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Streams the body as zero-copy slices of at most `chunk_size` bytes.
    pub fn body_chunks(&self, chunk_size: usize) -> BoxStream<'static, std::io::Result<Bytes>> {
        let body = self.body.clone();
        let chunk_size = chunk_size.max(1);
        let offsets: Vec<usize> = (0..body.len()).step_by(chunk_size).collect();

        stream::iter(offsets)
            .map(move |start| {
                let end = (start + chunk_size).min(body.len());
                Ok(body.slice(start..end))
            })
            .boxed()
    }
}

// == Entry Metadata ==
/// Expiration metadata stamped on every entry this crate writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// When the response was captured
    pub captured_at: DateTime<Utc>,
    /// Max age in milliseconds
    pub max_age_ms: u64,
}

impl EntryMetadata {
    pub fn new(captured_at: DateTime<Utc>, max_age: Duration) -> Self {
        Self {
            captured_at,
            max_age_ms: max_age.as_millis() as u64,
        }
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    /// Age of the entry at `now`, clamped to zero for clock skew.
    pub fn age_ms(&self, now: DateTime<Utc>) -> u64 {
        (now - self.captured_at).num_milliseconds().max(0) as u64
    }

    /// An entry is stale once its age strictly exceeds its max age.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age_ms(now) > self.max_age_ms
    }
}

// == Stored Entry ==
/// A response as held by a [`CacheStore`](crate::store::CacheStore).
///
/// `metadata` is `None` for entries written by someone other than this crate;
/// such entries are never swept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub response: HttpResponse,
    pub metadata: Option<EntryMetadata>,
}

impl StoredEntry {
    pub fn new(response: HttpResponse, metadata: EntryMetadata) -> Self {
        Self {
            response,
            metadata: Some(metadata),
        }
    }

    /// An entry without expiration metadata.
    pub fn foreign(response: HttpResponse) -> Self {
        Self {
            response,
            metadata: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.metadata.map(|m| m.is_expired(now)).unwrap_or(false)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::TryStreamExt;

    fn epoch() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(0).unwrap()
    }

    #[test]
    fn test_request_key_normalizes_method() {
        let key = RequestKey::new("post", "https://example.com/a");
        assert_eq!(key.method, "POST");
        assert_eq!(key, RequestKey::new("POST", "https://example.com/a"));
        assert_eq!(key.to_string(), "POST https://example.com/a");
    }

    #[test]
    fn test_request_key_url_is_verbatim() {
        assert_ne!(
            RequestKey::get("https://example.com/A"),
            RequestKey::get("https://example.com/a")
        );
    }

    #[test]
    fn test_is_success_range() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(199, "").is_success());
        assert!(!HttpResponse::new(304, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resp = HttpResponse::new(200, "").with_header("Content-Type", "image/png");
        assert_eq!(resp.header("content-type"), Some("image/png"));
        assert_eq!(resp.header("etag"), None);
    }

    #[tokio::test]
    async fn test_body_chunks() {
        let resp = HttpResponse::new(200, vec![7u8; 250]);
        let chunks: Vec<Bytes> = resp.body_chunks(100).try_collect().await.unwrap();

        let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn test_body_chunks_empty_body() {
        let resp = HttpResponse::new(200, Bytes::new());
        let chunks: Vec<Bytes> = resp.body_chunks(100).try_collect().await.unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_expiration_boundary() {
        let meta = EntryMetadata::new(epoch(), Duration::from_millis(1000));

        assert!(!meta.is_expired(epoch() + chrono::Duration::milliseconds(900)));
        assert!(!meta.is_expired(epoch() + chrono::Duration::milliseconds(1000)));
        assert!(meta.is_expired(epoch() + chrono::Duration::milliseconds(1001)));
    }

    #[test]
    fn test_age_clamped_for_future_capture() {
        let meta = EntryMetadata::new(epoch() + chrono::Duration::seconds(10), Duration::ZERO);
        assert_eq!(meta.age_ms(epoch()), 0);
        assert!(!meta.is_expired(epoch()));
    }

    #[test]
    fn test_foreign_entry_never_expires() {
        let entry = StoredEntry::foreign(HttpResponse::new(200, "x"));
        assert!(!entry.is_expired(epoch() + chrono::Duration::days(365 * 10)));
    }
}
