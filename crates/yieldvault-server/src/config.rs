//! Server configuration loaded from the environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Production sweep cadence: once a day.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 86_400;
pub const DEFAULT_ITEM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
/// Sweeps may run faster in staging, but never sub-second.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("Sweep interval must be at least {min:?}, got {actual:?}")]
    IntervalTooShort { min: Duration, actual: Duration },
}

/// Where ledger state is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local state, lost on restart. Local development only.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

/// Timing of the maturity sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Upper bound for settling a single investment.
    pub item_timeout: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            item_timeout: Duration::from_secs(DEFAULT_ITEM_TIMEOUT_SECS),
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval < MIN_SWEEP_INTERVAL {
            return Err(ConfigError::IntervalTooShort {
                min: MIN_SWEEP_INTERVAL,
                actual: self.interval,
            });
        }
        if self.item_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "MATURITY_ITEM_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreBackend,
    /// Required for the Postgres backend.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub sweep: SweepConfig,
}

impl ServerConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr: SocketAddr = parse_or(&lookup, "BIND_ADDR", "0.0.0.0:3000".parse().ok())?;
        let store = match lookup("STORE_BACKEND") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "STORE_BACKEND",
                value,
            })?,
            None => StoreBackend::Postgres,
        };
        let database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let max_connections: u32 =
            parse_or(&lookup, "DB_MAX_CONNECTIONS", Some(DEFAULT_MAX_CONNECTIONS))?;
        let interval_secs: u64 = parse_or(
            &lookup,
            "MATURITY_SWEEP_INTERVAL_SECS",
            Some(DEFAULT_SWEEP_INTERVAL_SECS),
        )?;
        let timeout_secs: u64 = parse_or(
            &lookup,
            "MATURITY_ITEM_TIMEOUT_SECS",
            Some(DEFAULT_ITEM_TIMEOUT_SECS),
        )?;

        let sweep = SweepConfig {
            interval: Duration::from_secs(interval_secs),
            item_timeout: Duration::from_secs(timeout_secs),
        };
        sweep.validate()?;

        Ok(Self {
            bind_addr,
            store,
            database_url,
            max_connections,
            sweep,
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => default.ok_or(ConfigError::Missing(name)),
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
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_with_database_url() {
        let config =
            ServerConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/yv")]))
                .unwrap();
        assert_eq!(config.store, StoreBackend::Postgres);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.sweep.interval, Duration::from_secs(86_400));
        assert_eq!(config.sweep.item_timeout, Duration::from_secs(30));
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = ServerConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_memory_backend_needs_no_database() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("MATURITY_SWEEP_INTERVAL_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.sweep.interval, Duration::from_secs(60));
    }

    #[test]
    fn test_sub_second_interval_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("MATURITY_SWEEP_INTERVAL_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::IntervalTooShort { .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("STORE_BACKEND", "memory"),
            ("BIND_ADDR", "not-an-address"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BIND_ADDR", .. }));

        let err = ServerConfig::from_lookup(lookup(&[("STORE_BACKEND", "redis")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "STORE_BACKEND", .. }));
    }
}
