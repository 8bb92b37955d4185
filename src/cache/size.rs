//! Size Accounting
//!
//! Sums stored body sizes by streaming each body chunk by chunk.

use futures::TryStreamExt;
use serde::Serialize;

use crate::store::BodyStream;

/// Stored size of one registered category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySize {
    pub category: String,
    pub store_name: String,
    pub size_bytes: u64,
    pub entries: usize,
}

/// Aggregate size across categories.
pub fn total_size(sizes: &[CategorySize]) -> u64 {
    sizes.iter().map(|s| s.size_bytes).sum()
}

/// Consumes a body stream, holding at most one chunk at a time.
pub async fn stream_len(body: BodyStream) -> std::io::Result<u64> {
    body.try_fold(0u64, |total, chunk| async move { Ok(total + chunk.len() as u64) })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::stream::{self, StreamExt};

    #[tokio::test]
    async fn test_stream_len_sums_chunks() {
        let body: BodyStream = stream::iter(vec![
            Ok(Bytes::from(vec![0u8; 100])),
            Ok(Bytes::from(vec![0u8; 150])),
        ])
        .boxed();

        assert_eq!(stream_len(body).await.unwrap(), 250);
    }

    #[test]
    fn test_total_size_sums_categories() {
        let size = |category: &str, size_bytes| CategorySize {
            category: category.to_string(),
            store_name: format!("{}-v1", category),
            size_bytes,
            entries: 1,
        };

        assert_eq!(total_size(&[size("a", 100), size("b", 250)]), 350);
        assert_eq!(total_size(&[]), 0);
    }

    #[tokio::test]
    async fn test_stream_len_empty() {
        let body: BodyStream = stream::empty().boxed();
        assert_eq!(stream_len(body).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stream_len_propagates_read_error() {
        let body: BodyStream = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated")),
        ])
        .boxed();

        assert!(stream_len(body).await.is_err());
    }
}
