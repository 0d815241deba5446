use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use chrono::NaiveTime;

use crate::{domain::ChatId, errors::Error, Result};

pub const DEFAULT_AI_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_AI_MODEL: &str = "openrouter/gpt-4o";
pub const DEFAULT_AI_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_AI_TIMEOUT_MS: u64 = 10_000;

/// Typed configuration, loaded from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_token: String,
    pub bot_username: String,
    pub channel_id: ChatId,

    // AI endpoint
    pub openrouter_api_key: String,
    pub ai_endpoint: String,
    pub ai_model: String,
    pub ai_temperature: f32,
    pub ai_timeout: Duration,

    // Storage
    pub database_path: PathBuf,

    // Publication
    pub publish_time: NaiveTime,
    pub publish_language: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source. Missing or invalid required settings
    /// are a `Config` error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required
        let telegram_token = get("TELEGRAM_TOKEN").ok_or_else(|| missing("TELEGRAM_TOKEN"))?;
        let openrouter_api_key =
            get("OPENROUTER_API_KEY").ok_or_else(|| missing("OPENROUTER_API_KEY"))?;
        let bot_username = get("BOT_USERNAME")
            .map(|s| s.trim().trim_start_matches('@').to_string())
            .and_then(non_empty)
            .ok_or_else(|| missing("BOT_USERNAME"))?;

        let channel_raw = get("CHANNEL_ID").ok_or_else(|| missing("CHANNEL_ID"))?;
        let channel_id = channel_raw
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::Config(format!("CHANNEL_ID must be an integer, got {channel_raw:?}")))?;
        if channel_id == 0 {
            return Err(Error::Config("CHANNEL_ID must be non-zero".to_string()));
        }

        // AI endpoint
        let ai_endpoint = get("AI_ENDPOINT").unwrap_or_else(|| DEFAULT_AI_ENDPOINT.to_string());
        let ai_model = get("AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string());
        let ai_temperature = match get("AI_TEMPERATURE") {
            Some(raw) => raw
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|t| (0.0..=2.0).contains(t))
                .ok_or_else(|| Error::Config(format!("AI_TEMPERATURE must be 0..=2, got {raw:?}")))?,
            None => DEFAULT_AI_TEMPERATURE,
        };
        let ai_timeout = match get("AI_TIMEOUT_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| {
                    Error::Config(format!("AI_TIMEOUT_MS must be a positive integer, got {raw:?}"))
                })?,
            None => Duration::from_millis(DEFAULT_AI_TIMEOUT_MS),
        };

        // Storage
        let database_path =
            PathBuf::from(get("DATABASE_PATH").unwrap_or_else(|| "posts.db".to_string()));

        // Publication
        let publish_time = match get("PUBLISH_TIME") {
            Some(raw) => parse_time_of_day(&raw)?,
            None => NaiveTime::from_hms_opt(9, 0, 0)
                .ok_or_else(|| Error::Config("invalid default publish time".to_string()))?,
        };
        let publish_language = get("PUBLISH_LANGUAGE")
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_else(|| "ru".to_string());

        Ok(Self {
            telegram_token,
            bot_username,
            channel_id: ChatId(channel_id),
            openrouter_api_key,
            ai_endpoint,
            ai_model,
            ai_temperature,
            ai_timeout,
            database_path,
            publish_time,
            publish_language,
        })
    }
}

fn missing(key: &str) -> Error {
    Error::Config(format!("{key} environment variable is required"))
}

/// `HH:MM` or `HH:MM:SS`.
fn parse_time_of_day(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| Error::Config(format!("PUBLISH_TIME must be HH:MM, got {raw:?}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
