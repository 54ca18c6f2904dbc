use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use url::Url;

use crate::error::ConfigError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub openai: OpenAiConfig,
    pub quiz: QuizSettings,
    pub webhook: Option<WebhookConfig>,
    pub log_level: String,
}

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

// Secrets stay out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openai", &self.openai)
            .field("quiz", &self.quiz)
            .field("webhook", &self.webhook)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Knobs of the quiz workflow itself.
#[derive(Debug, Clone)]
pub struct QuizSettings {
    pub language: String,
    pub question_count: usize,
    pub page_limit: usize,
    pub char_budget: usize,
    pub max_document_bytes: u64,
    pub min_duration: u32,
    pub max_duration: u32,
    pub pacing_buffer: Duration,
    pub scratch_dir: PathBuf,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            language: "Hindi".to_owned(),
            question_count: 5,
            page_limit: 5,
            char_budget: 3000,
            max_document_bytes: 10 * 1024 * 1024,
            min_duration: 10,
            // Telegram refuses a poll open_period above 600 seconds.
            max_duration: 600,
            pacing_buffer: Duration::from_secs(2),
            scratch_dir: env::temp_dir(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: Url,
    pub addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source, `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bot_token = lookup("BOT_TOKEN")
            .or_else(|| lookup("TELOXIDE_TOKEN"))
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        let api_key = lookup("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let openai = OpenAiConfig {
            api_key,
            base_url: lookup("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            model: lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            temperature: parse_or(&lookup, "OPENAI_TEMPERATURE", 0.3)?,
            connect_timeout: Duration::from_secs(parse_or(&lookup, "HTTP_CONNECT_TIMEOUT_SECS", 10)?),
            timeout: Duration::from_secs(parse_or(&lookup, "HTTP_TIMEOUT_SECS", 60)?),
        };

        let defaults = QuizSettings::default();
        let quiz = QuizSettings {
            language: lookup("QUIZ_LANGUAGE").unwrap_or(defaults.language),
            question_count: parse_or(&lookup, "QUIZ_QUESTION_COUNT", defaults.question_count)?,
            page_limit: parse_or(&lookup, "QUIZ_PAGE_LIMIT", defaults.page_limit)?,
            char_budget: parse_or(&lookup, "QUIZ_CHAR_BUDGET", defaults.char_budget)?,
            max_document_bytes: parse_or(
                &lookup,
                "QUIZ_MAX_DOCUMENT_BYTES",
                defaults.max_document_bytes,
            )?,
            pacing_buffer: Duration::from_secs(parse_or(
                &lookup,
                "QUIZ_PACING_BUFFER_SECS",
                defaults.pacing_buffer.as_secs(),
            )?),
            scratch_dir: lookup("QUIZ_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            ..defaults
        };

        let webhook = match (lookup("WEBHOOK_URL"), lookup("WEBHOOK_ADDR")) {
            (Some(url), Some(addr)) => Some(WebhookConfig {
                url: parse_value("WEBHOOK_URL", url)?,
                addr: parse_value("WEBHOOK_ADDR", addr)?,
            }),
            _ => None,
        };

        Ok(Self {
            bot_token,
            openai,
            quiz,
            webhook,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_owned()),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => parse_value(name, value),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
