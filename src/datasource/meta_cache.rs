//! Time-bounded cache for read-mostly venue metadata.

use super::DataSourceError;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Holds one metadata value and refetches it once it is older than `ttl`.
///
/// The lock is held across the fetch so concurrent callers share a single
/// refresh. A failed refresh keeps nothing and is retried by the next caller.
#[derive(Debug)]
pub struct MetaCache<T> {
    ttl: Duration,
    slot: Mutex<Option<(Instant, Arc<T>)>>,
}

impl<T> MetaCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Result<Arc<T>, DataSourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DataSourceError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some((fetched_at, value)) = slot.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(value.clone());
            }
        }

        let value = Arc::new(fetch().await?);
        *slot = Some((Instant::now(), value.clone()));
        Ok(value)
    }
}
