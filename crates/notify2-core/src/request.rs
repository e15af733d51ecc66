//! Request builders: turn a [`DeliveryRequest`] into the wire-level [`ApiCall`].
//!
//! Everything here is checked locally; a request that fails to build never
//! reaches a transport.

use std::path::{Path, PathBuf};

use crate::{
    domain::{MessageId, ParseMode},
    errors::Error,
    Result,
};

/// Telegram's hard limit for message text.
pub const MAX_TEXT_LEN: usize = 4096;
/// Telegram's hard limit for media captions.
pub const MAX_CAPTION_LEN: usize = 1024;

/// Bot API method names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    SendMessage,
    SendPhoto,
    SendDocument,
    EditMessageText,
    GetMe,
}

impl ApiMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiMethod::SendMessage => "sendMessage",
            ApiMethod::SendPhoto => "sendPhoto",
            ApiMethod::SendDocument => "sendDocument",
            ApiMethod::EditMessageText => "editMessageText",
            ApiMethod::GetMe => "getMe",
        }
    }
}

/// A file uploaded as one multipart part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub field: &'static str,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Wire representation of one API call.
///
/// `fields` go out form-encoded, or as text parts when there is an attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiCall {
    pub method: ApiMethod,
    pub fields: Vec<(&'static str, String)>,
    pub attachment: Option<Attachment>,
}

impl ApiCall {
    fn new(method: ApiMethod) -> Self {
        Self {
            method,
            fields: Vec::new(),
            attachment: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    fn push(&mut self, name: &'static str, value: impl Into<String>) {
        self.fields.push((name, value.into()));
    }

    fn push_flag(&mut self, name: &'static str, on: bool) {
        if on {
            self.push(name, "true");
        }
    }

    fn push_parse_mode(&mut self, mode: Option<ParseMode>) {
        if let Some(mode) = mode {
            self.push("parse_mode", mode.as_str());
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextOptions {
    pub parse_mode: Option<ParseMode>,
    pub disable_web_page_preview: bool,
    /// Deliver silently.
    pub disable_notification: bool,
    pub reply_to_message_id: Option<MessageId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditOptions {
    pub parse_mode: Option<ParseMode>,
    pub disable_web_page_preview: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaOptions {
    pub caption: Option<String>,
    pub parse_mode: Option<ParseMode>,
    pub disable_notification: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    Text,
    Photo,
    Document,
    EditText,
    SelfInfo,
}

/// One caller request, consumed by a single delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryRequest {
    Text {
        text: String,
        options: TextOptions,
    },
    Photo {
        path: PathBuf,
        options: MediaOptions,
    },
    Document {
        path: PathBuf,
        options: MediaOptions,
    },
    EditText {
        message_id: MessageId,
        text: String,
        options: EditOptions,
    },
    SelfInfo,
}

impl DeliveryRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            DeliveryRequest::Text { .. } => RequestKind::Text,
            DeliveryRequest::Photo { .. } => RequestKind::Photo,
            DeliveryRequest::Document { .. } => RequestKind::Document,
            DeliveryRequest::EditText { .. } => RequestKind::EditText,
            DeliveryRequest::SelfInfo => RequestKind::SelfInfo,
        }
    }

    pub fn method(&self) -> ApiMethod {
        match self.kind() {
            RequestKind::Text => ApiMethod::SendMessage,
            RequestKind::Photo => ApiMethod::SendPhoto,
            RequestKind::Document => ApiMethod::SendDocument,
            RequestKind::EditText => ApiMethod::EditMessageText,
            RequestKind::SelfInfo => ApiMethod::GetMe,
        }
    }

    /// Validate and assemble the call for `chat_id`.
    ///
    /// `default_mode` applies when the request carries no parse mode of its
    /// own; if both are `None` the field is left out and Telegram's default
    /// applies.
    pub async fn build(&self, chat_id: &str, default_mode: Option<ParseMode>) -> Result<ApiCall> {
        match self {
            DeliveryRequest::Text { text, options } => {
                send_message(chat_id, text, options, default_mode)
            }
            DeliveryRequest::EditText {
                message_id,
                text,
                options,
            } => edit_message_text(chat_id, *message_id, text, options, default_mode),
            DeliveryRequest::Photo { path, options } => {
                send_media(ApiMethod::SendPhoto, "photo", chat_id, path, options, default_mode)
                    .await
            }
            DeliveryRequest::Document { path, options } => {
                send_media(
                    ApiMethod::SendDocument,
                    "document",
                    chat_id,
                    path,
                    options,
                    default_mode,
                )
                .await
            }
            DeliveryRequest::SelfInfo => Ok(ApiCall::new(ApiMethod::GetMe)),
        }
    }
}

/// Non-empty (after trimming) and at most [`MAX_TEXT_LEN`] characters.
pub fn validate_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::validation("message text cannot be empty"));
    }
    let len = text.chars().count();
    if len > MAX_TEXT_LEN {
        return Err(Error::validation(format!(
            "message text too long ({len} characters, max {MAX_TEXT_LEN})"
        )));
    }
    Ok(())
}

pub fn send_message(
    chat_id: &str,
    text: &str,
    options: &TextOptions,
    default_mode: Option<ParseMode>,
) -> Result<ApiCall> {
    validate_text(text)?;

    let mut call = ApiCall::new(ApiMethod::SendMessage);
    call.push("chat_id", chat_id);
    call.push("text", text);
    call.push_parse_mode(options.parse_mode.or(default_mode));
    call.push_flag("disable_web_page_preview", options.disable_web_page_preview);
    call.push_flag("disable_notification", options.disable_notification);
    if let Some(reply_to) = options.reply_to_message_id {
        call.push("reply_to_message_id", reply_to.to_string());
    }
    Ok(call)
}

pub fn edit_message_text(
    chat_id: &str,
    message_id: MessageId,
    text: &str,
    options: &EditOptions,
    default_mode: Option<ParseMode>,
) -> Result<ApiCall> {
    validate_text(text)?;

    let mut call = ApiCall::new(ApiMethod::EditMessageText);
    call.push("chat_id", chat_id);
    call.push("message_id", message_id.to_string());
    call.push("text", text);
    call.push_parse_mode(options.parse_mode.or(default_mode));
    call.push_flag("disable_web_page_preview", options.disable_web_page_preview);
    Ok(call)
}

async fn send_media(
    method: ApiMethod,
    field: &'static str,
    chat_id: &str,
    path: &Path,
    options: &MediaOptions,
    default_mode: Option<ParseMode>,
) -> Result<ApiCall> {
    let caption = options
        .caption
        .as_deref()
        .filter(|c| !c.trim().is_empty());
    if let Some(caption) = caption {
        let len = caption.chars().count();
        if len > MAX_CAPTION_LEN {
            return Err(Error::validation(format!(
                "caption too long ({len} characters, max {MAX_CAPTION_LEN})"
            )));
        }
    }

    let attachment = read_attachment(field, path).await?;

    let mut call = ApiCall::new(method);
    call.push("chat_id", chat_id);
    if let Some(caption) = caption {
        call.push("caption", caption);
        call.push_parse_mode(options.parse_mode.or(default_mode));
    }
    call.push_flag("disable_notification", options.disable_notification);
    call.attachment = Some(attachment);
    Ok(call)
}

async fn read_attachment(field: &'static str, path: &Path) -> Result<Attachment> {
    let is_file = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(Error::validation(format!(
            "{field} file not found: {}",
            path.display()
        )));
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        Error::validation(format!("cannot read {field} file {}: {e}", path.display()))
    })?;

    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(field)
        .to_string();

    Ok(Attachment {
        field,
        file_name,
        bytes,
    })
}
