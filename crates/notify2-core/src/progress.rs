//! Progress bar that lives in a Telegram message.
//!
//! [`Notifier::progress`] wraps a sequence of known length. Every item pulled
//! through [`Progress::next`] first edits the bound message to show the new
//! percentage, then hands the item back unchanged. The bar is display only:
//! a failed edit is logged and iteration carries on.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    domain::{MessageId, ParseMode},
    engine::Notifier,
    errors::Error,
    request::{validate_text, EditOptions, TextOptions},
    Result,
};

pub const DEFAULT_PREFIX: &str = "Progress:";
pub const DEFAULT_BAR_LENGTH: usize = 20;
const PREFIX_WIDTH: usize = 15;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressOptions {
    pub prefix: String,
    /// Edit this message instead of sending a new one.
    pub message_id: Option<MessageId>,
    pub bar_length: usize,
    /// Skip intermediate edits closer together than this. The final tick is
    /// always rendered. Zero edits on every tick.
    pub min_update_interval: Duration,
}

impl Default for ProgressOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            message_id: None,
            bar_length: DEFAULT_BAR_LENGTH,
            min_update_interval: Duration::ZERO,
        }
    }
}

/// Monospace bar as a MarkdownV2 code block, e.g.
/// `Progress:       |[==========          ]|   50.0%`.
pub fn render_progress(prefix: &str, completed: usize, total: usize, bar_length: usize) -> String {
    let fraction = if total == 0 {
        1.0
    } else {
        (completed as f64 / total as f64).min(1.0)
    };
    let filled = if total == 0 {
        bar_length
    } else {
        (completed.min(total) as u128 * bar_length as u128 / total as u128) as usize
    };
    let bar = format!("{}{}", "=".repeat(filled), " ".repeat(bar_length - filled));
    let prefix = escape_code(prefix);
    let percent = fraction * 100.0;
    format!("```\n{prefix:<PREFIX_WIDTH$} |[{bar}]| {percent:6.1}%\n```")
}

/// Inside a MarkdownV2 code block only backslash and backtick need escaping.
fn escape_code(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch == '\\' || ch == '`' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug)]
struct ProgressState {
    total: usize,
    completed: usize,
    bound_message_id: MessageId,
    last_edit: Option<Instant>,
    /// Text the bound message is known to show.
    last_text: Option<String>,
}

/// Pull-based wrapper returned by [`Notifier::progress`].
///
/// Dropping it early is fine: the message keeps its last rendered percentage.
pub struct Progress<'a, I> {
    notifier: &'a Notifier,
    items: I,
    state: ProgressState,
    prefix: String,
    bar_length: usize,
    min_update_interval: Duration,
}

impl<I: Iterator> Progress<'_, I> {
    /// Next item, after the bound message has been updated for it.
    pub async fn next(&mut self) -> Option<I::Item> {
        let item = self.items.next()?;
        self.state.completed += 1;
        self.tick().await;
        Some(item)
    }

    pub fn message_id(&self) -> MessageId {
        self.state.bound_message_id
    }

    pub fn completed(&self) -> usize {
        self.state.completed
    }

    pub fn total(&self) -> usize {
        self.state.total
    }

    async fn tick(&mut self) {
        let now = Instant::now();
        let is_last = self.state.completed >= self.state.total;
        if !is_last && !self.min_update_interval.is_zero() {
            if let Some(last) = self.state.last_edit {
                if now.duration_since(last) < self.min_update_interval {
                    return;
                }
            }
        }

        let text = render_progress(
            &self.prefix,
            self.state.completed,
            self.state.total,
            self.bar_length,
        );
        // Telegram rejects edits that leave the text unchanged.
        if self.state.last_text.as_deref() == Some(text.as_str()) {
            return;
        }
        let options = EditOptions {
            parse_mode: Some(ParseMode::MarkdownV2),
            ..Default::default()
        };
        // Best-effort: the caller's work must not stall on a display update.
        match self
            .notifier
            .edit_message_text(self.state.bound_message_id, &text, options)
            .await
        {
            Ok(_) => self.state.last_text = Some(text),
            Err(e) => warn!(
                message_id = %self.state.bound_message_id,
                completed = self.state.completed,
                total = self.state.total,
                error = %e,
                "progress update failed"
            ),
        }
        self.state.last_edit = Some(now);
    }
}

impl Notifier {
    /// Track iteration over `items` in a Telegram message.
    ///
    /// The length must be known before iterating (exact `size_hint`), which
    /// rules out filters and other lazily-sized iterators. Without
    /// `options.message_id` an initial 0% message is sent; its failure is
    /// returned and nothing is yielded.
    pub async fn progress<T>(
        &self,
        items: T,
        options: ProgressOptions,
    ) -> Result<Progress<'_, T::IntoIter>>
    where
        T: IntoIterator,
    {
        let items = items.into_iter();
        let total = match items.size_hint() {
            (lo, Some(hi)) if lo == hi => lo,
            _ => {
                return Err(Error::validation(
                    "progress: sequence length must be known before iterating",
                ))
            }
        };
        if options.bar_length == 0 {
            return Err(Error::validation("progress: bar length must be at least 1"));
        }
        // Widest rendering; if this fits, every tick does.
        validate_text(&render_progress(
            &options.prefix,
            total,
            total,
            options.bar_length,
        ))?;
        if self.is_closed() {
            return Err(Error::validation("progress: notifier is closed"));
        }

        let mut last_text = None;
        let bound_message_id = match options.message_id {
            Some(id) => id,
            None => {
                let initial = render_progress(&options.prefix, 0, total, options.bar_length);
                let sent = self
                    .send_message(
                        &initial,
                        TextOptions {
                            parse_mode: Some(ParseMode::MarkdownV2),
                            ..Default::default()
                        },
                    )
                    .await?;
                let id = sent.message_id().ok_or_else(|| {
                    Error::transport("sendMessage", "reply did not include a message_id")
                })?;
                last_text = Some(initial);
                id
            }
        };
        debug!(total, message_id = %bound_message_id, "progress started");

        Ok(Progress {
            notifier: self,
            items,
            state: ProgressState {
                total,
                completed: 0,
                bound_message_id,
                last_edit: None,
                last_text,
            },
            prefix: options.prefix,
            bar_length: options.bar_length,
            min_update_interval: options.min_update_interval,
        })
    }
}
