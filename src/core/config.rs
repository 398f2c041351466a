use std::env;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use url::Url;

use crate::errors::SummarizeError;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2:7b";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 3000));
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamProvider {
    Ollama,
    OpenAi,
}

impl UpstreamProvider {
    fn parse(raw: &str) -> Result<Self, SummarizeError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(SummarizeError::Configuration(format!(
                "UPSTREAM_PROVIDER: unknown provider `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: UpstreamProvider,
    pub ollama_url: Url,
    pub ollama_model: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Url,
    pub openai_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub bind_addr: SocketAddr,
    pub connect_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, SummarizeError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SummarizeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("UPSTREAM_PROVIDER") {
            Some(raw) => UpstreamProvider::parse(&raw)?,
            None => UpstreamProvider::Ollama,
        };

        Ok(Self {
            provider,
            ollama_url: parse_url(
                "OLLAMA_URL",
                get("OLLAMA_URL").as_deref().unwrap_or(DEFAULT_OLLAMA_URL),
            )?,
            ollama_model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: parse_url(
                "OPENAI_BASE_URL",
                get("OPENAI_BASE_URL")
                    .as_deref()
                    .unwrap_or(DEFAULT_OPENAI_BASE_URL),
            )?,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            temperature: parse_or(
                "SUMMARY_TEMPERATURE",
                get("SUMMARY_TEMPERATURE"),
                DEFAULT_TEMPERATURE,
            )?,
            max_tokens: parse_or(
                "SUMMARY_MAX_TOKENS",
                get("SUMMARY_MAX_TOKENS"),
                DEFAULT_MAX_TOKENS,
            )?,
            bind_addr: parse_or("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR)?,
            connect_timeout: Duration::from_secs(parse_or(
                "UPSTREAM_CONNECT_TIMEOUT_SECS",
                get("UPSTREAM_CONNECT_TIMEOUT_SECS"),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?),
        })
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, SummarizeError> {
    Url::parse(raw).map_err(|e| SummarizeError::Configuration(format!("{key}: {e}")))
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, SummarizeError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| SummarizeError::Configuration(format!("{key}: {e}"))),
        None => Ok(default),
    }
}
