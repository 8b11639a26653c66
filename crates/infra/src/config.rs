//! Process configuration read from the environment.
//!
//! Unset variables fall back to defaults; set-but-malformed variables are
//! errors.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

use estate_auth::HashCost;

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/estate.sock";
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 600;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub socket_path: PathBuf,
    pub tcp_addr: Option<SocketAddr>,
    pub http_addr: SocketAddr,
    pub max_request_bytes: usize,
    /// `None` disables the expired-session sweeper.
    pub sweep_interval: Option<Duration>,
    pub hash_cost: HashCost,
    /// Login granted the group-management flag at startup, if it exists.
    pub bootstrap_admin: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_connections = parse_or(&var, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let database = match (var("DATABASE_URL"), var("DBUSER")) {
            (Some(url), _) => Some(url),
            (None, Some(user)) => {
                let pass = lookup("DBPASS").unwrap_or_default();
                let host = var("DBHOST").unwrap_or_else(|| "127.0.0.1:5432".to_string());
                let name = var("DBNAME").unwrap_or_else(|| "estate".to_string());
                Some(format!("postgres://{user}:{pass}@{host}/{name}"))
            }
            (None, None) => None,
        }
        .map(|url| DatabaseConfig { url, max_connections });

        let max_request_bytes = parse_or(&var, "ESTATE_MAX_REQUEST_BYTES", DEFAULT_MAX_REQUEST_BYTES)?;
        if max_request_bytes == 0 {
            bail!("ESTATE_MAX_REQUEST_BYTES must be greater than zero");
        }

        let sweep_secs: u64 = parse_or(&var, "ESTATE_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;

        let hash_cost = match var("ESTATE_HASH_COST").as_deref() {
            None | Some("default") => HashCost::Default,
            Some("fast") => HashCost::Fast,
            Some(other) => bail!("ESTATE_HASH_COST must be `default` or `fast`, got `{other}`"),
        };

        Ok(Self {
            database,
            socket_path: var("ESTATE_SOCKET")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH)),
            tcp_addr: parse_opt(&var, "ESTATE_TCP_ADDR")?,
            http_addr: parse_or(&var, "ESTATE_HTTP_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            max_request_bytes,
            sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            hash_cost,
            bootstrap_admin: var("ESTATE_BOOTSTRAP_ADMIN"),
        })
    }
}

fn parse_opt<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {key}: `{raw}`"))
        })
        .transpose()
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_opt(var, key)?.unwrap_or(default))
}
