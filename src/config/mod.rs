//! Environment configuration for the three service roles
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file. Loaders take a lookup function so tests never touch process env.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Errors from loading configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env {0}")]
    Missing(&'static str),
    #[error("unknown service role '{0}' (expected queue, bus or database)")]
    UnknownRole(String),
}

/// Which subsystem this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Queue,
    Bus,
    Database,
}

impl FromStr for Role {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queue" => Ok(Role::Queue),
            "bus" => Ok(Role::Bus),
            "database" | "db" => Ok(Role::Database),
            other => Err(ConfigError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Queue => write!(f, "queue"),
            Role::Bus => write!(f, "bus"),
            Role::Database => write!(f, "database"),
        }
    }
}

/// Load `.env` into the process environment if present
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }
}

fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Read a string variable, treating empty as unset
fn parse_env_string<F>(lookup: &F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

/// Read a positive integer variable; invalid or < 1 falls back to `default`
fn parse_env_int<F>(lookup: &F, name: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    let Some(v) = lookup(name).filter(|v| !v.is_empty()) else {
        return default;
    };

    match v.trim().parse::<i64>() {
        Ok(n) if n >= 1 => n as u64,
        Ok(_) => {
            tracing::warn!(name, value = %v, "Invalid value: must be at least 1, using default");
            default
        }
        Err(e) => {
            tracing::warn!(name, value = %v, error = %e, "Invalid value, using default");
            default
        }
    }
}

fn parse_port<F>(lookup: &F, default: u16) -> u16
where
    F: Fn(&str) -> Option<String>,
{
    let port = parse_env_int(lookup, "PORT", u64::from(default));
    u16::try_from(port).unwrap_or_else(|_| {
        tracing::warn!(port, "PORT out of range, using default");
        default
    })
}

/// Split on `sep`, trim entries and drop empty ones
fn split_and_trim(s: &str, sep: char) -> Vec<String> {
    s.split(sep)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

/// Retry queue settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub port: u16,
    /// Maximum number of events held by the queue
    pub capacity: usize,
    /// Webhook that receives every queued event
    pub consumer_url: String,
    /// Attempts per event before it is dead-lettered
    pub delivery_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            capacity: 1000,
            consumer_url: "http://localhost:4000".to_string(),
            delivery_attempts: 3,
        }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let defaults = Self::default();
        Self {
            port: parse_port(&lookup, defaults.port),
            capacity: parse_env_int(&lookup, "CAPACITY", defaults.capacity as u64) as usize,
            consumer_url: parse_env_string(&lookup, "CONSUMER_URL", &defaults.consumer_url),
            delivery_attempts: parse_env_int(
                &lookup,
                "DELIVERY_ATTEMPTS",
                u64::from(defaults.delivery_attempts),
            )
            .min(u64::from(u32::MAX)) as u32,
        }
    }
}

/// Pub/sub bus settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    pub port: u16,
    /// Webhooks receiving every published event, in delivery order
    pub subscribers: Vec<String>,
}

impl BusConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(process_env)
    }

    /// `SUBSCRIBER_URLS` is required (comma-separated webhook URLs)
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let urls = parse_env_string(&lookup, "SUBSCRIBER_URLS", "");
        let subscribers = split_and_trim(&urls, ',');
        if subscribers.is_empty() {
            return Err(ConfigError::Missing("SUBSCRIBER_URLS"));
        }

        Ok(Self {
            port: parse_port(&lookup, 3000),
            subscribers,
        })
    }
}

/// Event store settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub port: u16,
    /// Directory holding database.json
    pub data_dir: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            data_dir: PathBuf::from("."),
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let defaults = Self::default();
        Self {
            port: parse_port(&lookup, defaults.port),
            data_dir: PathBuf::from(parse_env_string(&lookup, "DATA_DIR", ".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_queue_defaults() {
        let cfg = QueueConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, QueueConfig::default());
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.capacity, 1000);
        assert_eq!(cfg.consumer_url, "http://localhost:4000");
        assert_eq!(cfg.delivery_attempts, 3);
    }

    #[test]
    fn test_queue_env_values() {
        let cfg = QueueConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("CAPACITY", "42"),
            ("CONSUMER_URL", "http://test/webhook"),
            ("DELIVERY_ATTEMPTS", "5"),
        ]));
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.capacity, 42);
        assert_eq!(cfg.consumer_url, "http://test/webhook");
        assert_eq!(cfg.delivery_attempts, 5);
    }

    #[test]
    fn test_queue_invalid_values_fall_back() {
        let cfg = QueueConfig::from_lookup(lookup(&[
            ("PORT", "notanint"),
            ("CAPACITY", "badint"),
            ("DELIVERY_ATTEMPTS", "0"),
            ("CONSUMER_URL", ""),
        ]));
        assert_eq!(cfg, QueueConfig::default());

        let cfg = QueueConfig::from_lookup(lookup(&[("PORT", "70000"), ("CAPACITY", "-3")]));
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.capacity, 1000);
    }

    #[test]
    fn test_bus_requires_subscribers() {
        assert_eq!(
            BusConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("SUBSCRIBER_URLS"))
        );
        assert_eq!(
            BusConfig::from_lookup(lookup(&[("SUBSCRIBER_URLS", " , ,")])),
            Err(ConfigError::Missing("SUBSCRIBER_URLS"))
        );
    }

    #[test]
    fn test_bus_subscribers_are_split_and_trimmed() {
        let cfg = BusConfig::from_lookup(lookup(&[
            ("PORT", "4100"),
            ("SUBSCRIBER_URLS", " http://a:1/hook ,http://b:2/hook,, http://c:3/hook "),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 4100);
        assert_eq!(
            cfg.subscribers,
            vec!["http://a:1/hook", "http://b:2/hook", "http://c:3/hook"]
        );
    }

    #[test]
    fn test_database_config() {
        assert_eq!(DatabaseConfig::from_lookup(lookup(&[])), DatabaseConfig::default());

        let cfg = DatabaseConfig::from_lookup(lookup(&[("PORT", "6000"), ("DATA_DIR", "/tmp/events")]));
        assert_eq!(cfg.port, 6000);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/events"));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("queue".parse::<Role>(), Ok(Role::Queue));
        assert_eq!(" BUS ".parse::<Role>(), Ok(Role::Bus));
        assert_eq!("db".parse::<Role>(), Ok(Role::Database));
        assert_eq!(Role::Database.to_string(), "database");
        assert_eq!(
            "worker".parse::<Role>(),
            Err(ConfigError::UnknownRole("worker".to_string()))
        );
    }
}
