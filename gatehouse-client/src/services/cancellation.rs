//! Auto-cancellation of superseded requests.
//!
//! Starting a request under a key that already has one in flight cancels
//! the older request. The cancelled caller gets `ErrorKind::Cancelled`.

use gatehouse_core::error::AppError;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct AutoCancelRegistry {
    inflight: Mutex<HashMap<String, (u64, CancellationToken)>>,
    next_id: AtomicU64,
}

impl AutoCancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` under `key`, superseding any request already using it.
    pub async fn run<F, T>(self: &Arc<Self>, key: &str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        let guard = self.begin(key);
        let token = guard.token.clone();

        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(request_key = %key, "Request autocancelled by a newer one");
                Err(AppError::Cancelled(format!("request '{}' was autocancelled", key)))
            }
            result = fut => result,
        }
    }

    /// Cancel every in-flight request.
    pub fn cancel_all(&self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, (_, token)) in inflight.drain() {
            token.cancel();
        }
    }

    pub fn cancel(&self, key: &str) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, token)) = inflight.remove(key) {
            token.cancel();
        }
    }

    pub fn inflight_count(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn begin(self: &Arc<Self>, key: &str) -> InflightGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, previous)) = inflight.insert(key.to_string(), (id, token.clone())) {
            previous.cancel();
        }

        InflightGuard {
            registry: Arc::clone(self),
            key: key.to_string(),
            id,
            token,
        }
    }
}

struct InflightGuard {
    registry: Arc<AutoCancelRegistry>,
    key: String,
    id: u64,
    token: CancellationToken,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        let mut inflight = self
            .registry
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // A newer request may own the key by now
        if inflight.get(&self.key).is_some_and(|(id, _)| *id == self.id) {
            inflight.remove(&self.key);
        }
    }
}
