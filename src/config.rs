use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub sender: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: SocketAddr,
    /// `None` means mail is logged instead of sent.
    pub mail: Option<MailConfig>,
    pub session_cache_secs: i64,
    pub local_dev: bool,
}

impl Config {
    /// Reads the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| dotenvy::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_address = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:9093".parse().ok())?;

        let mail = match lookup("MAIL_API_URL") {
            Some(api_url) => Some(MailConfig {
                api_url,
                api_key: lookup("MAIL_API_KEY"),
                sender: lookup("MAIL_SENDER").unwrap_or_else(|| "no-reply@coursereview.local".to_string()),
                timeout: Duration::from_secs(parse_or(&lookup, "MAIL_TIMEOUT_SECS", Some(10))?),
            }),
            None => None,
        };

        Ok(Config {
            database_url,
            bind_address,
            mail,
            session_cache_secs: parse_or(&lookup, "SESSION_CACHE_SECS", Some(300))?,
            local_dev: lookup("LOCAL_DEV_DEPLOYMENT").is_some(),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
        None => default.ok_or(ConfigError::Missing(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn requires_a_database_url() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn falls_back_to_defaults() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/reviews")]).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:9093".parse().unwrap());
        assert!(config.mail.is_none());
        assert_eq!(config.session_cache_secs, 300);
        assert!(!config.local_dev);
    }

    #[test]
    fn reads_mail_settings() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/reviews"),
            ("MAIL_API_URL", "https://mail.example.com/send"),
            ("MAIL_API_KEY", "secret"),
            ("MAIL_TIMEOUT_SECS", "3"),
            ("LOCAL_DEV_DEPLOYMENT", "1"),
        ])
        .unwrap();

        let mail = config.mail.unwrap();
        assert_eq!(mail.api_url, "https://mail.example.com/send");
        assert_eq!(mail.api_key.as_deref(), Some("secret"));
        assert_eq!(mail.timeout, Duration::from_secs(3));
        assert!(config.local_dev);
    }

    #[test]
    fn rejects_unparseable_values() {
        let result = config(&[("DATABASE_URL", "postgres://localhost/reviews"), ("BIND_ADDRESS", "nowhere")]);
        assert!(matches!(result, Err(ConfigError::Invalid { name: "BIND_ADDRESS", .. })));
    }
}
