//! Transport port: one API call against the Bot API, plus the retry decorator.

pub mod port;
pub mod retry;
pub mod types;
