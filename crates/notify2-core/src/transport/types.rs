use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{domain::MessageId, errors::Error, request::ApiMethod, Result};

/// Successful Bot API reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub ok: bool,
    #[serde(default)]
    pub result: Value,
}

impl DeliveryResult {
    pub fn new(result: Value) -> Self {
        Self { ok: true, result }
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    /// Id assigned to a sent or edited message.
    pub fn message_id(&self) -> Option<MessageId> {
        self.result
            .get("message_id")
            .and_then(Value::as_i64)
            .map(MessageId)
    }

    /// Typed view of `result`. A shape mismatch is reported against `method`.
    pub fn parse<T: DeserializeOwned>(&self, method: ApiMethod) -> Result<T> {
        serde_json::from_value(self.result.clone()).map_err(|e| {
            Error::transport(method.as_str(), format!("unexpected result shape: {e}"))
        })
    }
}

/// `getMe` payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub can_join_groups: bool,
    #[serde(default)]
    pub can_read_all_group_messages: bool,
    #[serde(default)]
    pub supports_inline_queries: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Raw Bot API envelope (`{"ok": .., "result": ..}` or an error description).
#[derive(Clone, Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

/// Classify an HTTP reply body.
///
/// Telegram answers rejections with a JSON envelope (usually with a 4xx
/// status), which becomes [`Error::Api`]. A body that is not an envelope at
/// all, e.g. a proxy's 502 page, is treated as a transport failure.
pub fn decode_response(method: ApiMethod, status: u16, body: &str) -> Result<DeliveryResult> {
    let operation = method.as_str();
    let envelope: Envelope = serde_json::from_str(body).map_err(|_| {
        Error::transport(
            operation,
            format!("unexpected response (HTTP {status}): {}", snippet(body, 200)),
        )
    })?;

    if !envelope.ok {
        return Err(Error::Api {
            operation: operation.to_string(),
            error_code: envelope.error_code.or(Some(i64::from(status))),
            description: envelope
                .description
                .unwrap_or_else(|| "Unknown error".to_string()),
            retry_after: envelope.parameters.and_then(|p| p.retry_after),
        });
    }

    Ok(DeliveryResult::new(envelope.result.unwrap_or(Value::Null)))
}

fn snippet(s: &str, max: usize) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    format!("{}...", trimmed.chars().take(max).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_success_and_exposes_message_id() {
        let body = json!({
            "ok": true,
            "result": {"message_id": 123, "chat": {"id": 42}, "date": 1, "text": "hi"}
        })
        .to_string();
        let res = decode_response(ApiMethod::SendMessage, 200, &body).unwrap();
        assert!(res.ok);
        assert_eq!(res.message_id(), Some(MessageId(123)));
    }

    #[test]
    fn api_rejection_keeps_description_and_retry_hint() {
        let body = json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 5",
            "parameters": {"retry_after": 5}
        })
        .to_string();
        let err = decode_response(ApiMethod::SendMessage, 429, &body).unwrap_err();
        match err {
            Error::Api {
                operation,
                error_code,
                description,
                retry_after,
            } => {
                assert_eq!(operation, "sendMessage");
                assert_eq!(error_code, Some(429));
                assert!(description.contains("Too Many Requests"));
                assert_eq!(retry_after, Some(5));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn non_envelope_body_is_transport_failure() {
        let err =
            decode_response(ApiMethod::GetMe, 502, "<html>Bad Gateway</html>").unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("HTTP 502"));
    }

    #[test]
    fn parses_bot_info() {
        let res = DeliveryResult::new(json!({
            "id": 1, "is_bot": true, "first_name": "Notifier", "username": "notify_bot",
            "can_join_groups": true
        }));
        let info: BotInfo = res.parse(ApiMethod::GetMe).unwrap();
        assert_eq!(info.username.as_deref(), Some("notify_bot"));
        assert!(info.can_join_groups);
        assert!(!info.supports_inline_queries);
    }

    #[test]
    fn result_shape_mismatch_names_the_method() {
        let res = DeliveryResult::new(json!({"id": 7}));
        let err = res.parse::<BotInfo>(ApiMethod::GetMe).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Transport);
        assert!(err.to_string().contains("getMe"), "{err}");
        assert!(err.to_string().contains("first_name"), "{err}");
    }
}
