//! Core of notify2: config model, request builders, the transport port with
//! its retry decorator, the delivery engine and the progress reporter.
//!
//! This crate does no HTTP itself. The Telegram transport lives in
//! `notify2-telegram` behind [`transport::port::Transport`].

pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod progress;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use engine::Notifier;
pub use errors::{Error, ErrorKind, Result};
