use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_OPENROUTER_KEY: &str = "OPENROUTER_KEY";
pub const ENV_WEBHOOK_SECRET: &str = "TELEGRAM_WEBHOOK_SECRET";
pub const ENV_MODEL_NAME: &str = "MODEL_NAME";
pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "HOST";

/// Process-wide settings, built once before the listener starts.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub heartbeat: HeartbeatConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Shared secret expected in `X-Telegram-Bot-Api-Secret-Token`. Empty disables the check.
    pub webhook_secret: Option<String>,
    /// Bot API base URL override (self-hosted Bot API server).
    pub api_url: Option<String>,
    /// Send the translation as a reply to the source message.
    pub reply_to_source: bool,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HeartbeatConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            webhook_secret: None,
            api_url: None,
            reply_to_source: false,
            timeout_secs: 10,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "meta-llama/llama-3.2-3b-instruct:free".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            max_tokens: 1500,
            temperature: 0.1,
            timeout_secs: 30,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

impl TelegramConfig {
    /// The configured secret, if any. Blank values count as unset.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// Ceiling for one sendMessage call
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl LlmConfig {
    /// Full chat-completions endpoint derived from `base_url`
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Ceiling for one completion call
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl ServerConfig {
    /// `host:port` for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Defaults, then the optional TOML file, then environment variables
    /// (a `.env` file in the working directory is honoured).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                Self::from_toml_str(&content)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| dotenvy::var(key).ok())?;
        Ok(config)
    }

    /// Parse a settings file, filling unset fields with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML")
    }

    /// Overlay values from an environment lookup. Unset variables leave the
    /// current value untouched.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = var(ENV_BOT_TOKEN) {
            self.telegram.bot_token = token;
        }
        if let Some(key) = var(ENV_OPENROUTER_KEY) {
            self.llm.api_key = key;
        }
        if let Some(secret) = var(ENV_WEBHOOK_SECRET) {
            self.telegram.webhook_secret = Some(secret);
        }
        if let Some(model) = var(ENV_MODEL_NAME).filter(|m| !m.trim().is_empty()) {
            self.llm.model = model;
        }
        if let Some(host) = var(ENV_HOST).filter(|h| !h.trim().is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = var(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PORT} is not a valid port: {port}"))?;
        }
        Ok(())
    }

    /// Names of required credentials that are not set.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.telegram.bot_token.trim().is_empty() {
            missing.push(ENV_BOT_TOKEN);
        }
        if self.llm.api_key.trim().is_empty() {
            missing.push(ENV_OPENROUTER_KEY);
        }
        missing
    }
}
