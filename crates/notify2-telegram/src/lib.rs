//! Telegram Bot API transport (reqwest).
//!
//! Implements the `notify2-core` [`Transport`] port: one pooled HTTP client
//! per transport, the configured timeout applied to every attempt, form or
//! multipart bodies, and Bot API envelope classification.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use notify2_core::{
    errors::Error,
    request::{ApiCall, ApiMethod},
    transport::{
        port::Transport,
        types::{decode_response, DeliveryResult},
    },
    Config, Notifier, Result,
};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramTransport {
    base_url: String,
    http: Mutex<Option<reqwest::Client>>,
}

impl TelegramTransport {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_api_base(config, DEFAULT_API_BASE)
    }

    /// Point at a different Bot API server (self-hosted `telegram-bot-api`, tests).
    pub fn with_api_base(config: &Config, api_base: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;

        Ok(Self {
            base_url: format!(
                "{}/bot{}",
                api_base.trim_end_matches('/'),
                config.bot_token()
            ),
            http: Mutex::new(Some(http)),
        })
    }

    fn url(&self, method: ApiMethod) -> String {
        format!("{}/{}", self.base_url, method.as_str())
    }

    fn client(&self) -> Option<reqwest::Client> {
        self.http
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn request(&self, http: &reqwest::Client, call: &ApiCall) -> reqwest::RequestBuilder {
        let req = http.post(self.url(call.method));
        let Some(att) = &call.attachment else {
            return req.form(&call.fields);
        };

        let mut form = Form::new();
        for (name, value) in &call.fields {
            form = form.text(*name, value.clone());
        }
        let part = Part::bytes(att.bytes.clone()).file_name(att.file_name.clone());
        req.multipart(form.part(att.field, part))
    }
}

/// Open a [`Notifier`] backed by the public Bot API.
pub fn connect(config: Config) -> Result<Notifier> {
    let transport = TelegramTransport::new(&config)?;
    Ok(Notifier::new(config, std::sync::Arc::new(transport)))
}

fn transport_error(operation: &str, e: reqwest::Error) -> Error {
    let what = if e.is_timeout() {
        "request timed out"
    } else if e.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    // The URL carries the bot token; keep it out of error text.
    Error::transport(operation, format!("{what}: {}", e.without_url()))
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn execute(&self, call: &ApiCall) -> Result<DeliveryResult> {
        let operation = call.method.as_str();
        let http = self
            .client()
            .ok_or_else(|| Error::validation(format!("{operation}: transport is closed")))?;

        let resp = self
            .request(&http, call)
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| transport_error(operation, e))?;
        debug!(operation, status, "telegram replied");

        decode_response(call.method, status, &body)
    }

    fn close(&self) {
        let mut http = self.http.lock().unwrap_or_else(PoisonError::into_inner);
        if http.take().is_some() {
            debug!("telegram http client released");
        }
    }
}
