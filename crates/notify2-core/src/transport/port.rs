use async_trait::async_trait;

use crate::{request::ApiCall, transport::types::DeliveryResult, Result};

/// Executes a single attempt of an API call.
///
/// Implementations classify failures: [`crate::Error::Transport`] when the
/// endpoint could not be reached or replied with something that is not a Bot
/// API envelope, [`crate::Error::Api`] when the envelope says `ok: false`.
/// Retrying is layered on top by [`crate::transport::retry::RetryingTransport`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, call: &ApiCall) -> Result<DeliveryResult>;

    /// Release pooled connections. Must be safe to call more than once.
    fn close(&self) {}
}
