use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::Duration,
};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{domain::ParseMode, errors::Error, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 1.0;

const TIMEOUT_RANGE: (u64, u64) = (1, 300);
const RETRY_ATTEMPTS_MAX: u32 = 10;
const RETRY_DELAY_RANGE: (f64, f64) = (0.1, 60.0);
const TOKEN_MIN_LEN: usize = 10;

/// Validated, immutable notifier settings.
///
/// Construction is the only place validation happens; once a `Config` exists
/// every field is known to be in range. The engine never loads files or reads
/// the environment itself, callers hand it a finished value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigFile", into = "ConfigFile")]
pub struct Config {
    bot_token: String,
    chat_id: String,
    parse_mode: ParseMode,
    timeout_secs: u64,
    retry_attempts: u32,
    retry_delay_secs: f64,
}

impl Config {
    /// Config with default network settings.
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self> {
        Self::builder(bot_token, chat_id).build()
    }

    pub fn builder(bot_token: impl Into<String>, chat_id: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            parse_mode: ParseMode::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS as i64,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS as i64,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
        }
    }

    pub fn bot_token(&self) -> &str {
        &self.bot_token
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn parse_mode(&self) -> ParseMode {
        self.parse_mode
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f64(self.retry_delay_secs)
    }

    pub fn retry_delay_secs(&self) -> f64 {
        self.retry_delay_secs
    }

    /// Token shortened for display (`info` output, logs).
    pub fn redacted_token(&self) -> String {
        if self.bot_token.chars().count() > 10 {
            format!("{}...", self.bot_token.chars().take(10).collect::<String>())
        } else {
            self.bot_token.clone()
        }
    }

    /// `$HOME/.notify2/config.json`.
    pub fn default_path() -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| Error::Config("HOME is not set".to_string()))?;
        Ok(home.join(".notify2").join("config.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Config(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let file: ConfigFile = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("invalid configuration file {}: {e}", path.display()))
        })?;
        Config::try_from(file)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string_pretty(self)?;
        fs::write(path, body).map_err(|e| {
            Error::Config(format!(
                "failed to save configuration to {}: {e}",
                path.display()
            ))
        })
    }

    /// Load from process environment (a `.env` in the working directory is
    /// read first; variables already set win).
    pub fn from_env() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` is this over `std::env`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let bot_token = get("TELEGRAM_BOT_TOKEN").ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })?;
        let chat_id = get("TELEGRAM_CHAT_ID").ok_or_else(|| {
            Error::Config("TELEGRAM_CHAT_ID environment variable is required".to_string())
        })?;

        let mut builder = Config::builder(bot_token, chat_id);
        if let Some(mode) = get("TELEGRAM_PARSE_MODE") {
            builder = builder.parse_mode(mode.parse()?);
        }
        if let Some(v) = get("NOTIFY2_TIMEOUT") {
            builder = builder.timeout_secs(parse_env_num("NOTIFY2_TIMEOUT", &v)?);
        }
        if let Some(v) = get("NOTIFY2_RETRY_ATTEMPTS") {
            builder = builder.retry_attempts(parse_env_num("NOTIFY2_RETRY_ATTEMPTS", &v)?);
        }
        if let Some(v) = get("NOTIFY2_RETRY_DELAY") {
            builder = builder.retry_delay_secs(parse_env_num("NOTIFY2_RETRY_DELAY", &v)?);
        }
        builder.build()
    }
}

/// Builder that validates everything in [`ConfigBuilder::build`].
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    bot_token: String,
    chat_id: String,
    parse_mode: ParseMode,
    timeout_secs: i64,
    retry_attempts: i64,
    retry_delay_secs: f64,
}

impl ConfigBuilder {
    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    pub fn timeout_secs(mut self, secs: i64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn retry_attempts(mut self, attempts: i64) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn retry_delay_secs(mut self, secs: f64) -> Self {
        self.retry_delay_secs = secs;
        self
    }

    pub fn build(self) -> Result<Config> {
        validate_bot_token(&self.bot_token)?;
        if self.chat_id.trim().is_empty() {
            return Err(Error::validation("chat id cannot be empty"));
        }

        let (lo, hi) = TIMEOUT_RANGE;
        let timeout_secs = u64::try_from(self.timeout_secs)
            .ok()
            .filter(|t| (lo..=hi).contains(t))
            .ok_or_else(|| {
                Error::validation(format!(
                    "timeout must be between {lo} and {hi} seconds (got {})",
                    self.timeout_secs
                ))
            })?;

        let retry_attempts = u32::try_from(self.retry_attempts)
            .ok()
            .filter(|n| *n <= RETRY_ATTEMPTS_MAX)
            .ok_or_else(|| {
                Error::validation(format!(
                    "retry_attempts must be between 0 and {RETRY_ATTEMPTS_MAX} (got {})",
                    self.retry_attempts
                ))
            })?;

        let (dlo, dhi) = RETRY_DELAY_RANGE;
        if !(dlo..=dhi).contains(&self.retry_delay_secs) {
            return Err(Error::validation(format!(
                "retry_delay must be between {dlo} and {dhi} seconds (got {})",
                self.retry_delay_secs
            )));
        }

        Ok(Config {
            bot_token: self.bot_token,
            chat_id: self.chat_id,
            parse_mode: self.parse_mode,
            timeout_secs,
            retry_attempts,
            retry_delay_secs: self.retry_delay_secs,
        })
    }
}

fn validate_bot_token(token: &str) -> Result<()> {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

    if token.chars().count() < TOKEN_MIN_LEN {
        return Err(Error::validation(format!(
            "bot token must be at least {TOKEN_MIN_LEN} characters long"
        )));
    }
    if !token.contains(':') {
        return Err(Error::validation("bot token must contain a colon separator"));
    }
    let re = TOKEN_RE.get_or_init(|| Regex::new(r"^\d+:[A-Za-z0-9_-]+$").expect("valid regex"));
    if !re.is_match(token) {
        return Err(Error::validation(
            "bot token must look like <digits>:<alphanumeric secret>",
        ));
    }
    Ok(())
}

/// On-disk shape, kept compatible with existing `config.json` files.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ConfigFile {
    telegram: TelegramSection,
    #[serde(default = "default_timeout")]
    timeout: i64,
    #[serde(default = "default_retry_attempts")]
    retry_attempts: i64,
    #[serde(default = "default_retry_delay")]
    retry_delay: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TelegramSection {
    bot_token: String,
    chat_id: String,
    #[serde(default)]
    parse_mode: ParseMode,
}

fn default_timeout() -> i64 {
    DEFAULT_TIMEOUT_SECS as i64
}

fn default_retry_attempts() -> i64 {
    DEFAULT_RETRY_ATTEMPTS as i64
}

fn default_retry_delay() -> f64 {
    DEFAULT_RETRY_DELAY_SECS
}

impl TryFrom<ConfigFile> for Config {
    type Error = Error;

    fn try_from(f: ConfigFile) -> Result<Self> {
        Config::builder(f.telegram.bot_token, f.telegram.chat_id)
            .parse_mode(f.telegram.parse_mode)
            .timeout_secs(f.timeout)
            .retry_attempts(f.retry_attempts)
            .retry_delay_secs(f.retry_delay)
            .build()
    }
}

impl From<Config> for ConfigFile {
    fn from(c: Config) -> Self {
        Self {
            telegram: TelegramSection {
                bot_token: c.bot_token,
                chat_id: c.chat_id,
                parse_mode: c.parse_mode,
            },
            timeout: c.timeout_secs as i64,
            retry_attempts: i64::from(c.retry_attempts),
            retry_delay: c.retry_delay_secs,
        }
    }
}

fn parse_env_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| Error::validation(format!("{key} is not a valid number: {value:?}")))
}

/// Variables `from_env` reads; anything else in a `.env` file is ignored.
const ENV_KEYS: [&str; 6] = [
    "TELEGRAM_BOT_TOKEN",
    "TELEGRAM_CHAT_ID",
    "TELEGRAM_PARSE_MODE",
    "NOTIFY2_TIMEOUT",
    "NOTIFY2_RETRY_ATTEMPTS",
    "NOTIFY2_RETRY_DELAY",
];

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for (key, value) in dotenv_pairs(&contents) {
        if env::var_os(key).is_none() {
            env::set_var(key, value);
        }
    }
}

/// `KEY=value` lines for known keys. `export` prefixes and one level of
/// matching quotes are stripped.
fn dotenv_pairs(contents: &str) -> Vec<(&str, &str)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.strip_prefix("export ").unwrap_or(line).split_once('='))
        .map(|(k, v)| (k.trim(), unquote(v.trim())))
        .filter(|(k, _)| ENV_KEYS.contains(k))
        .collect()
}

fn unquote(v: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = v.strip_prefix(q).and_then(|rest| rest.strip_suffix(q)) {
            return inner;
        }
    }
    v
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const TOKEN: &str = "123456:ABCDEFGHIJ";

    #[test]
    fn dotenv_keeps_only_known_keys() {
        let contents = "# notify2\n\
                        export TELEGRAM_BOT_TOKEN=\"123456:ABCDEFGHIJ\"\n\
                        TELEGRAM_CHAT_ID = '-100'\n\
                        DATABASE_URL=postgres://x\n\
                        NOTIFY2_TIMEOUT\n\
                        NOTIFY2_RETRY_DELAY=\"\n";
        assert_eq!(
            dotenv_pairs(contents),
            vec![
                ("TELEGRAM_BOT_TOKEN", "123456:ABCDEFGHIJ"),
                ("TELEGRAM_CHAT_ID", "-100"),
                ("NOTIFY2_RETRY_DELAY", "\""),
            ]
        );
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::new(TOKEN, "42").unwrap();
        assert_eq!(cfg.parse_mode(), ParseMode::Html);
        assert_eq!(cfg.timeout_secs(), 10);
        assert_eq!(cfg.retry_attempts(), 3);
        assert_eq!(cfg.retry_delay(), Duration::from_secs(1));
    }

    #[test]
    fn timeout_bounds_are_inclusive() {
        for ok in [1, 300] {
            assert!(Config::builder(TOKEN, "42").timeout_secs(ok).build().is_ok());
        }
        for bad in [0, 301, -5] {
            let err = Config::builder(TOKEN, "42")
                .timeout_secs(bad)
                .build()
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn retry_bounds_are_enforced() {
        assert!(Config::builder(TOKEN, "42").retry_attempts(0).build().is_ok());
        assert!(Config::builder(TOKEN, "42").retry_attempts(10).build().is_ok());
        assert!(Config::builder(TOKEN, "42").retry_attempts(11).build().is_err());
        assert!(Config::builder(TOKEN, "42").retry_attempts(-1).build().is_err());

        assert!(Config::builder(TOKEN, "42").retry_delay_secs(0.1).build().is_ok());
        assert!(Config::builder(TOKEN, "42").retry_delay_secs(60.0).build().is_ok());
        assert!(Config::builder(TOKEN, "42").retry_delay_secs(0.05).build().is_err());
        assert!(Config::builder(TOKEN, "42").retry_delay_secs(60.5).build().is_err());
        assert!(Config::builder(TOKEN, "42").retry_delay_secs(f64::NAN).build().is_err());
    }

    #[test]
    fn rejects_malformed_tokens_and_chat_ids() {
        for bad in ["", "short:1", "1234567890", "abc:defghijkl", "123456:has space"] {
            let err = Config::new(bad, "42").unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{bad:?}: {err}");
        }
        assert!(matches!(
            Config::new(TOKEN, "  ").unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[test]
    fn file_round_trip_preserves_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        for mode in ParseMode::ALL {
            for (timeout, attempts, delay) in [(1, 0, 0.1), (10, 3, 1.0), (300, 10, 60.0)] {
                let cfg = Config::builder(TOKEN, "-100123")
                    .parse_mode(mode)
                    .timeout_secs(timeout)
                    .retry_attempts(attempts)
                    .retry_delay_secs(delay)
                    .build()
                    .unwrap();
                cfg.save_to_file(&path).unwrap();
                assert_eq!(Config::from_file(&path).unwrap(), cfg);
            }
        }
    }

    #[test]
    fn persisted_shape_nests_telegram_section() {
        let cfg = Config::new(TOKEN, "42").unwrap();
        let v = serde_json::to_value(&cfg).unwrap();
        assert_eq!(v["telegram"]["bot_token"], TOKEN);
        assert_eq!(v["telegram"]["parse_mode"], "HTML");
        assert_eq!(v["timeout"], 10);
        assert_eq!(v["retry_attempts"], 3);
    }

    #[test]
    fn loading_applies_defaults_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        fs::write(
            &path,
            r#"{"telegram": {"bot_token": "123456:ABCDEFGHIJ", "chat_id": "42"}}"#,
        )
        .unwrap();
        let cfg = Config::from_file(&path).unwrap();
        assert_eq!(cfg.timeout_secs(), DEFAULT_TIMEOUT_SECS);

        fs::write(
            &path,
            r#"{"telegram": {"bot_token": "123456:ABCDEFGHIJ", "chat_id": "42"}, "timeout": 0}"#,
        )
        .unwrap();
        assert!(Config::from_file(&path).is_err());

        let missing = dir.path().join("nope.json");
        assert!(matches!(
            Config::from_file(&missing).unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn lookup_requires_token_and_chat() {
        let vars: HashMap<&str, &str> = HashMap::from([("TELEGRAM_BOT_TOKEN", TOKEN)]);
        let err = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_CHAT_ID"));

        let vars: HashMap<&str, &str> = HashMap::from([
            ("TELEGRAM_BOT_TOKEN", TOKEN),
            ("TELEGRAM_CHAT_ID", "42"),
            ("TELEGRAM_PARSE_MODE", "MarkdownV2"),
            ("NOTIFY2_TIMEOUT", "30"),
            ("NOTIFY2_RETRY_DELAY", "0.5"),
        ]);
        let cfg = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.parse_mode(), ParseMode::MarkdownV2);
        assert_eq!(cfg.timeout_secs(), 30);
        assert_eq!(cfg.retry_delay_secs(), 0.5);
        assert_eq!(cfg.retry_attempts(), DEFAULT_RETRY_ATTEMPTS);
    }

    #[test]
    fn redacts_long_tokens() {
        let cfg = Config::new(TOKEN, "42").unwrap();
        assert_eq!(cfg.redacted_token(), "123456:ABC...");
    }
}
