use anyhow::Context;
use tracing_subscriber::EnvFilter;

pub const GATEWAY_URL_ENV: &str = "ROSTERD_GATEWAY_URL";
pub const LOG_ENV: &str = "ROSTERD_LOG";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Not validated; a bad URL surfaces as a transport failure on first use.
    pub gateway_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            gateway_url: normalize_url(lookup(GATEWAY_URL_ENV)),
        }
    }
}

pub fn normalize_url(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Logs go to stderr; stdout belongs to the protocol.
pub fn init_logging() -> anyhow::Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => EnvFilter::try_new(&directives)
            .with_context(|| format!("invalid {LOG_ENV}: {directives}"))?,
        Err(_) => EnvFilter::new("info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_gateway_url_is_unset() {
        let cfg = Config::from_lookup(|_| Some("   ".to_string()));
        assert_eq!(cfg.gateway_url, None);
        let cfg = Config::from_lookup(|_| None);
        assert_eq!(cfg.gateway_url, None);
    }

    #[test]
    fn gateway_url_is_trimmed() {
        let cfg = Config::from_lookup(|k| {
            (k == GATEWAY_URL_ENV).then(|| " https://script.example/exec\n".to_string())
        });
        assert_eq!(cfg.gateway_url.as_deref(), Some("https://script.example/exec"));
    }
}
