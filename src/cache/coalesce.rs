//! Request Coalescing
//!
//! Lets concurrent identical network fetches share one in-flight future.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use crate::cache::{HttpResponse, RequestKey};
use crate::error::Result;

type SharedFetch = Shared<BoxFuture<'static, Result<HttpResponse>>>;

/// In-flight map keyed by store name and normalized request key.
#[derive(Clone, Default)]
pub struct RequestCoalescer {
    in_flight: Arc<Mutex<HashMap<(String, RequestKey), SharedFetch>>>,
}

impl fmt::Debug for RequestCoalescer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl RequestCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Runs `start()` unless an identical operation is already in flight, in
    /// which case its result is shared.
    ///
    /// The map entry is removed by the operation itself when it completes, so
    /// a dropped first caller does not strand later ones.
    pub async fn run<F>(&self, store: &str, key: &RequestKey, start: F) -> Result<HttpResponse>
    where
        F: FnOnce() -> BoxFuture<'static, Result<HttpResponse>>,
    {
        let map_key = (store.to_string(), key.clone());

        let shared = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&map_key) {
                Some(existing) => existing.clone(),
                None => {
                    let registry = self.in_flight.clone();
                    let cleanup_key = map_key.clone();
                    let inner = start();
                    let fut = async move {
                        let result = inner.await;
                        registry.lock().remove(&cleanup_key);
                        result
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(map_key, fut.clone());
                    fut
                }
            }
        };

        shared.await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn slow_fetch(calls: Arc<AtomicUsize>, status: u16) -> BoxFuture<'static, Result<HttpResponse>> {
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(HttpResponse::new(status, "shared"))
        }
        .boxed()
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests_share_one_fetch() {
        let coalescer = RequestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = RequestKey::get("https://example.com/a");

        let (a, b, c) = tokio::join!(
            coalescer.run("s", &key, || slow_fetch(calls.clone(), 200)),
            coalescer.run("s", &key, || slow_fetch(calls.clone(), 200)),
            coalescer.run("s", &key, || slow_fetch(calls.clone(), 200)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap(), b.clone().unwrap());
        assert_eq!(b.unwrap(), c.unwrap());
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_are_not_coalesced() {
        let coalescer = RequestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let key_a = RequestKey::get("a");
        let key_b = RequestKey::get("b");
        let (_, _) = tokio::join!(
            coalescer.run("s", &key_a, || slow_fetch(calls.clone(), 200)),
            coalescer.run("s", &key_b, || slow_fetch(calls.clone(), 200)),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sequential_requests_fetch_again() {
        let coalescer = RequestCoalescer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = RequestKey::get("a");

        coalescer.run("s", &key, || slow_fetch(calls.clone(), 200)).await.unwrap();
        coalescer.run("s", &key, || slow_fetch(calls.clone(), 200)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_shared() {
        let coalescer = RequestCoalescer::new();
        let key = RequestKey::get("a");

        let fail = || {
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err::<HttpResponse, _>(CacheError::Network("connection refused".to_string()))
            }
            .boxed()
        };

        let (a, b) = tokio::join!(coalescer.run("s", &key, fail), coalescer.run("s", &key, fail));
        assert!(matches!(a, Err(CacheError::Network(_))));
        assert_eq!(a, b);
    }
}
