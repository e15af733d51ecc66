//! In-memory transport used by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::{
    errors::Error,
    request::{ApiCall, ApiMethod},
    transport::{port::Transport, types::DeliveryResult},
    Result,
};

/// Plays back scripted outcomes, then answers every call successfully with a
/// fresh message id. Calls whose method is in `always_fail` fail every time.
#[derive(Default)]
pub struct FakeTransport {
    script: Mutex<VecDeque<Result<DeliveryResult>>>,
    always_fail: Mutex<Vec<ApiMethod>>,
    next_id: Mutex<i64>,
    pub calls: Mutex<Vec<ApiCall>>,
    pub closed: Mutex<u32>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(100),
            ..Default::default()
        }
    }

    pub fn scripted(script: Vec<Result<DeliveryResult>>) -> Self {
        let t = Self::new();
        *t.script.lock().unwrap() = script.into();
        t
    }

    pub fn failing(self, method: ApiMethod) -> Self {
        self.always_fail.lock().unwrap().push(method);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn methods(&self) -> Vec<ApiMethod> {
        self.calls.lock().unwrap().iter().map(|c| c.method).collect()
    }
}

pub fn net_err(operation: &str) -> Result<DeliveryResult> {
    Err(Error::transport(operation, "connection refused"))
}

pub fn api_err(operation: &str) -> Result<DeliveryResult> {
    Err(Error::Api {
        operation: operation.to_string(),
        error_code: Some(400),
        description: "Bad Request: message to edit not found".to_string(),
        retry_after: None,
    })
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, call: &ApiCall) -> Result<DeliveryResult> {
        self.calls.lock().unwrap().push(call.clone());

        if self.always_fail.lock().unwrap().contains(&call.method) {
            return api_err(call.method.as_str());
        }
        if let Some(outcome) = self.script.lock().unwrap().pop_front() {
            return outcome;
        }

        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        Ok(DeliveryResult::new(json!({
            "message_id": *next,
            "chat": {"id": 42},
            "text": call.field("text"),
        })))
    }

    fn close(&self) {
        *self.closed.lock().unwrap() += 1;
    }
}
