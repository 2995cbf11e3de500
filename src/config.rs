use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};

use chrono::{DateTime, SecondsFormat, Utc};

pub const DEFAULT_PORT: u16 = 43110;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub models: Vec<String>,
    pub codec: ResponseCodec,
}

/// Formatting rules shared by every response record.
///
/// Built once at startup and handed to handlers by reference, so no request
/// ever touches process-global formatter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseCodec {
    pub precision: SecondsFormat,
}

impl Default for ResponseCodec {
    fn default() -> Self {
        Self {
            precision: SecondsFormat::Micros,
        }
    }
}

impl ResponseCodec {
    pub fn format(&self, at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(self.precision, false)
    }

    pub fn now(&self) -> String {
        self.format(Utc::now())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            models: vec!["default".to_string()],
            codec: ResponseCodec::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::from_lookup(|key| env::var(key).ok()))
    }

    /// Builds the config from `lookup`; unset or unparsable values take their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = lookup("OLLAMA_GATEWAY_HOST")
            .and_then(|v| v.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let port = lookup("OLLAMA_GATEWAY_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let models = lookup("OLLAMA_GATEWAY_MODELS")
            .map(|raw| parse_model_list(&raw))
            .unwrap_or_default();
        let models = if models.is_empty() {
            vec!["default".to_string()]
        } else {
            models
        };

        let precision = lookup("OLLAMA_GATEWAY_TIMESTAMP_PRECISION")
            .and_then(|v| parse_precision(&v))
            .unwrap_or(SecondsFormat::Micros);

        Self {
            listen_addr: SocketAddr::new(host, port),
            models,
            codec: ResponseCodec { precision },
        }
    }
}

fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_precision(raw: &str) -> Option<SecondsFormat> {
    match raw.trim().to_lowercase().as_str() {
        "millis" => Some(SecondsFormat::Millis),
        "micros" => Some(SecondsFormat::Micros),
        "nanos" => Some(SecondsFormat::Nanos),
        _ => None,
    }
}
