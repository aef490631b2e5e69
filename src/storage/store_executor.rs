use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tracing::trace;
use tracing::warn;

use crate::metrics::STORE_OPERATION_DURATION_METRIC;
use crate::metrics::STORE_TIMEOUT_METRIC;
use crate::ElectionStore;
use crate::Result;
use crate::SystemError;

/// Runs store calls on the blocking pool under a bounded timeout.
///
/// A timed-out call is not cancelled: the write may still land after the caller has seen
/// `Timeout`, so callers must re-query before retrying.
pub struct StoreExecutor<S: ElectionStore> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S: ElectionStore> Clone for StoreExecutor<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            timeout: self.timeout,
        }
    }
}

impl<S: ElectionStore> StoreExecutor<S> {
    pub fn new(
        store: Arc<S>,
        timeout: Duration,
    ) -> Self {
        Self { store, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run<T, F>(
        &self,
        operation: &'static str,
        f: F,
    ) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        let started = Instant::now();
        let handle = tokio::task::spawn_blocking(move || f(&store));

        let result = match tokio::time::timeout(self.timeout, handle).await {
            Ok(joined) => joined?,
            Err(_) => {
                warn!(operation, timeout = ?self.timeout, "store operation timed out");
                STORE_TIMEOUT_METRIC.with_label_values(&[operation]).inc();
                return Err(SystemError::Timeout {
                    operation,
                    duration: self.timeout,
                }
                .into());
            }
        };

        let elapsed = started.elapsed();
        STORE_OPERATION_DURATION_METRIC
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64() * 1000.0);
        trace!(operation, ?elapsed, "store operation finished");

        result
    }
}
