//! Service configuration from environment variables
//!
//! Unset or unparseable values fall back to defaults.

use crate::sms::SmsConfig;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 120;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Where sessions are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionBackendKind {
    #[default]
    Memory,
    Sqlite,
}

impl SessionBackendKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(SessionBackendKind::Memory),
            "sqlite" | "database" => Some(SessionBackendKind::Sqlite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: String,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    pub session_backend: SessionBackendKind,
    /// Mount the session inspection routes
    pub admin_enabled: bool,
    /// `None` means SMS is logged, not sent
    pub sms: Option<SmsConfig>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("USSD_DB_PATH").unwrap_or_else(|| {
            let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
            format!("{home}/.agriconnect/agriconnect.db")
        });

        let port = lookup("USSD_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let seconds = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map_or(Duration::from_secs(default), Duration::from_secs)
        };

        let session_backend = match lookup("USSD_SESSION_BACKEND") {
            None => SessionBackendKind::default(),
            Some(raw) => SessionBackendKind::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Unknown USSD_SESSION_BACKEND, using memory");
                SessionBackendKind::default()
            }),
        };

        let admin_enabled = lookup("USSD_ADMIN_ENABLED")
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let sms = match (
            non_empty("AFRICASTALKING_USERNAME"),
            non_empty("AFRICASTALKING_API_KEY"),
        ) {
            (Some(username), Some(api_key)) => Some(SmsConfig::new(
                username,
                api_key,
                non_empty("AFRICASTALKING_SENDER_ID"),
                non_empty("AFRICASTALKING_SMS_URL"),
            )),
            _ => None,
        };

        Self {
            port,
            db_path,
            session_ttl: seconds("USSD_SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS),
            sweep_interval: seconds("USSD_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS),
            session_backend,
            admin_enabled,
            sms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("HOME", "/home/asha")]);
        assert_eq!(config.port, 3001);
        assert_eq!(config.db_path, "/home/asha/.agriconnect/agriconnect.db");
        assert_eq!(config.session_ttl, Duration::from_mins(2));
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.session_backend, SessionBackendKind::Memory);
        assert!(!config.admin_enabled);
        assert!(config.sms.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("USSD_PORT", "8080"),
            ("USSD_DB_PATH", "/var/lib/ussd.db"),
            ("USSD_SESSION_TTL_SECS", "300"),
            ("USSD_SESSION_BACKEND", "sqlite"),
            ("USSD_ADMIN_ENABLED", "true"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_path, "/var/lib/ussd.db");
        assert_eq!(config.session_ttl, Duration::from_mins(5));
        assert_eq!(config.session_backend, SessionBackendKind::Sqlite);
        assert!(config.admin_enabled);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config(&[
            ("USSD_PORT", "eighty"),
            ("USSD_SESSION_TTL_SECS", "0"),
            ("USSD_SWEEP_INTERVAL_SECS", "-5"),
            ("USSD_SESSION_BACKEND", "redis"),
            ("USSD_ADMIN_ENABLED", "maybe"),
        ]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.session_ttl, Duration::from_secs(DEFAULT_SESSION_TTL_SECS));
        assert_eq!(config.sweep_interval, Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS));
        assert_eq!(config.session_backend, SessionBackendKind::Memory);
        assert!(!config.admin_enabled);
    }

    #[test]
    fn test_sms_requires_username_and_key() {
        assert!(config(&[("AFRICASTALKING_USERNAME", "sandbox")]).sms.is_none());
        assert!(config(&[("AFRICASTALKING_USERNAME", "sandbox"), ("AFRICASTALKING_API_KEY", " ")])
            .sms
            .is_none());

        let sms = config(&[
            ("AFRICASTALKING_USERNAME", "agriconnect"),
            ("AFRICASTALKING_API_KEY", "secret"),
            ("AFRICASTALKING_SENDER_ID", "AGRICONNECT"),
        ])
        .sms
        .unwrap();
        assert_eq!(sms.username, "agriconnect");
        assert_eq!(sms.sender_id.as_deref(), Some("AGRICONNECT"));
        assert_eq!(sms.url, "https://api.africastalking.com/version1/messaging");
    }
}
