use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram text formatting mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseMode {
    #[default]
    #[serde(rename = "HTML")]
    Html,
    Markdown,
    MarkdownV2,
}

impl ParseMode {
    pub const ALL: [ParseMode; 3] = [ParseMode::Html, ParseMode::Markdown, ParseMode::MarkdownV2];

    pub fn as_str(self) -> &'static str {
        match self {
            ParseMode::Html => "HTML",
            ParseMode::Markdown => "Markdown",
            ParseMode::MarkdownV2 => "MarkdownV2",
        }
    }
}

impl fmt::Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParseMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParseMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| {
                Error::validation(format!(
                    "invalid parse mode {s:?} (expected HTML, Markdown or MarkdownV2)"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mode_parses_platform_names() {
        assert_eq!("HTML".parse::<ParseMode>().unwrap(), ParseMode::Html);
        assert_eq!(" MarkdownV2 ".parse::<ParseMode>().unwrap(), ParseMode::MarkdownV2);
        assert!("html".parse::<ParseMode>().is_err());
    }

    #[test]
    fn parse_mode_serializes_as_platform_name() {
        let json = serde_json::to_string(&ParseMode::Html).unwrap();
        assert_eq!(json, "\"HTML\"");
        let back: ParseMode = serde_json::from_str("\"Markdown\"").unwrap();
        assert_eq!(back, ParseMode::Markdown);
    }
}
