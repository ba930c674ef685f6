//! Configuration loading and database path resolution

use crate::{Error, Result};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Default HTTP port when nothing else is configured
pub const DEFAULT_PORT: u16 = 3000;

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to
    pub host: IpAddr,
    /// Port the HTTP server listens on
    pub port: u16,
    /// Path to the SQLite database file
    pub database_path: PathBuf,
}

/// Optional values parsed from the TOML config file
#[derive(Debug, Default, serde::Deserialize)]
struct FileConfig {
    host: Option<IpAddr>,
    port: Option<u16>,
    database: Option<PathBuf>,
}

/// Resolve service configuration following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable (`SMAP_HOST`, `SMAP_PORT`, `SMAP_DATABASE`)
/// 3. TOML config file
/// 4. Compiled default (fallback)
pub fn resolve(
    cli_host: Option<IpAddr>,
    cli_port: Option<u16>,
    cli_database: Option<PathBuf>,
) -> Result<ServiceConfig> {
    let file = load_config_file().unwrap_or_default();

    let host = cli_host
        .or_else(|| env_parsed("SMAP_HOST"))
        .or(file.host)
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

    let port = cli_port
        .or_else(|| env_parsed("SMAP_PORT"))
        .or(file.port)
        .unwrap_or(DEFAULT_PORT);

    let database_path = cli_database
        .or_else(|| std::env::var("SMAP_DATABASE").ok().map(PathBuf::from))
        .or(file.database)
        .unwrap_or_else(default_database_path);

    Ok(ServiceConfig {
        host,
        port,
        database_path,
    })
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Load the TOML config file if one exists
///
/// Looks for `$XDG_CONFIG_HOME/smap/config.toml` (user) and then
/// `/etc/smap/config.toml` (system-wide, Linux only).
fn load_config_file() -> Result<FileConfig> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("smap").join("config.toml"));
    }
    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/smap/config.toml"));
    }

    for path in candidates {
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            return toml::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)));
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// OS-dependent default database location, e.g. `~/.local/share/smap/smap.db`
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("smap"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/smap"))
        .join("smap.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins_over_defaults() {
        let config = resolve(
            None,
            Some(8080),
            Some(PathBuf::from("/tmp/test-smap.db")),
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, PathBuf::from("/tmp/test-smap.db"));
    }

    #[test]
    fn defaults_apply_when_nothing_configured() {
        // Environment may override in CI; only check the fallback shape
        let config = resolve(None, None, None).unwrap();
        assert!(config.database_path.to_string_lossy().ends_with(".db"));
    }
}
