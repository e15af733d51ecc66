/// Core error type for notify2.
///
/// Every public operation returns this one type so callers can handle failures
/// broadly, or narrowly via [`Error::kind`]. Adapter crates map their transport
/// errors into it at the port boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller input failed a local precondition. Never sent, never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// The remote endpoint could not be reached (connect, DNS, timeout, broken reply).
    #[error("{operation} failed: transport error: {message}")]
    Transport { operation: String, message: String },

    /// The remote endpoint answered and rejected the request.
    #[error("{operation} failed: telegram api error{}: {description}", fmt_code(.error_code))]
    Api {
        operation: String,
        error_code: Option<i64>,
        description: String,
        retry_after: Option<u64>,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used to drive retry and propagation decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Api,
    Config,
    Io,
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Api { .. } => ErrorKind::Api,
            Self::Config(_) | Self::Json(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Only network-level failures are worth another attempt; platform
    /// rejections are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

fn fmt_code(code: &Option<i64>) -> String {
    code.map(|c| format!(" {c}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
