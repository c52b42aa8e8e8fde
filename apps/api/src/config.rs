use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Read once at startup; nothing re-reads it mid-session.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub form_version: String,
    pub dates_placeholder: String,
    pub link_placeholder: String,
    pub placeholder_text: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            api_endpoint: require_env("API_ENDPOINT")?,
            model: env_or("MODEL", "claude-sonnet-4-5"),
            max_tokens: env_or("MAX_TOKENS", "1500")
                .parse::<u32>()
                .context("MAX_TOKENS must be a positive integer")?,
            form_version: env_or("FORM_VERSION", "1.0"),
            dates_placeholder: env_or("DATES_PLACEHOLDER", "[dates to be announced]"),
            link_placeholder: env_or("LINK_PLACEHOLDER", "[sign-up link to be shared]"),
            placeholder_text: env_or("PLACEHOLDER_TEXT", "Type your response here..."),
            port: env_or("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
