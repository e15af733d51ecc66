//! Delivery engine: the public notifier surface.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tracing::{debug, info};

use crate::{
    config::Config,
    domain::MessageId,
    errors::Error,
    request::{ApiMethod, DeliveryRequest, EditOptions, MediaOptions, TextOptions},
    transport::{
        port::Transport,
        retry::{RetryPolicy, RetryingTransport},
        types::{BotInfo, DeliveryResult},
    },
    Result,
};

/// Sends notifications to the configured chat.
///
/// Owns its transport for its whole lifetime. Calls are sequential from the
/// caller's point of view: each one validates, builds the request, and runs it
/// through the retrying transport before returning. Call [`Notifier::close`]
/// when done; dropping the notifier closes it as well.
pub struct Notifier {
    config: Config,
    transport: RetryingTransport,
    closed: AtomicBool,
}

impl Notifier {
    /// Wrap `transport` with the retry policy from `config`.
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        let policy = RetryPolicy::from_config(&config);
        Self {
            config,
            transport: RetryingTransport::new(transport, policy),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release the transport's connection pool. Later calls are no-ops.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("closing notifier transport");
            self.transport.close();
        }
    }

    /// Validate, build and execute one request.
    pub async fn deliver(&self, request: &DeliveryRequest) -> Result<DeliveryResult> {
        if self.is_closed() {
            return Err(Error::validation(format!(
                "{}: notifier is closed",
                request.method().as_str()
            )));
        }

        let call = request
            .build(self.config.chat_id(), Some(self.config.parse_mode()))
            .await?;
        debug!(operation = call.method.as_str(), "delivering");
        self.transport.execute(&call).await
    }

    pub async fn send_message(&self, text: &str, options: TextOptions) -> Result<DeliveryResult> {
        self.deliver(&DeliveryRequest::Text {
            text: text.to_string(),
            options,
        })
        .await
    }

    pub async fn send_photo(
        &self,
        path: impl AsRef<Path>,
        options: MediaOptions,
    ) -> Result<DeliveryResult> {
        self.deliver(&DeliveryRequest::Photo {
            path: path.as_ref().to_path_buf(),
            options,
        })
        .await
    }

    pub async fn send_document(
        &self,
        path: impl AsRef<Path>,
        options: MediaOptions,
    ) -> Result<DeliveryResult> {
        self.deliver(&DeliveryRequest::Document {
            path: path.as_ref().to_path_buf(),
            options,
        })
        .await
    }

    pub async fn edit_message_text(
        &self,
        message_id: MessageId,
        text: &str,
        options: EditOptions,
    ) -> Result<DeliveryResult> {
        self.deliver(&DeliveryRequest::EditText {
            message_id,
            text: text.to_string(),
            options,
        })
        .await
    }

    /// Raw `getMe` reply.
    pub async fn get_self_info(&self) -> Result<DeliveryResult> {
        self.deliver(&DeliveryRequest::SelfInfo).await
    }

    pub async fn bot_info(&self) -> Result<BotInfo> {
        self.get_self_info().await?.parse(ApiMethod::GetMe)
    }

    /// `getMe`, result discarded. Fails with the classified error.
    pub async fn test_connection(&self) -> Result<()> {
        let reply = self.get_self_info().await?;
        let bot_id = reply.result().get("id").and_then(|v| v.as_i64());
        let username = reply.result().get("username").and_then(|v| v.as_str());
        info!(?bot_id, ?username, "telegram connection ok");
        Ok(())
    }

    /// Like [`Notifier::test_connection`] but collapses any failure to `false`.
    pub async fn check_connection(&self) -> bool {
        self.test_connection().await.is_ok()
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.close();
    }
}
