//! Workflow configuration and the per-call store deadline.

use std::future::Future;
use std::time::Duration;

use store::StoreError;

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables shared by the checkout, order and cart services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// Upper bound on every individual store call. A call that exceeds it is
    /// treated as a failure of that call.
    pub store_timeout: Duration,
}

impl CheckoutConfig {
    pub fn with_store_timeout(store_timeout: Duration) -> Self {
        Self { store_timeout }
    }

    /// Runs a store call under the configured deadline.
    pub(crate) async fn bounded<T, F>(&self, call: F) -> store::Result<T>
    where
        F: Future<Output = store::Result<T>>,
    {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))?
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}
