use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::registry::{ValveInfo, ValveRegistry};

// Relay controller wire constants
pub const DEFAULT_DEVICE_HOST: &str = "192.168.1.48";
pub const DEFAULT_DEVICE_PORT: u16 = 8080;
pub const DEFAULT_DEVICE_TIMEOUT_MS: u64 = 5_000;
pub const STATUS_RECV_LIMIT: usize = 1024; // single receive, as the controller replies in one frame

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_TICK_MS: u64 = 1_000;
pub const DEFAULT_RECENT_ACTIONS: usize = 30;

/// Top-level config (irrigo.toml + IRRIGO_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrigoConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Initial valve table. Used only while the database has no valves yet.
    #[serde(default = "default_valves")]
    pub valves: Vec<ValveInfo>,
}

impl Default for IrrigoConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            scheduler: SchedulerConfig::default(),
            valves: default_valves(),
        }
    }
}

/// Relay controller endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_host")]
    pub host: String,
    #[serde(default = "default_device_port")]
    pub port: u16,
    /// Bound on connect, send and receive. The controller itself never
    /// enforced one; a hung connection would otherwise stall a trigger.
    #[serde(default = "default_device_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: default_device_host(),
            port: DEFAULT_DEVICE_PORT,
            timeout_ms: DEFAULT_DEVICE_TIMEOUT_MS,
        }
    }
}

impl DeviceConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Operator console HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Engine polling cadence.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// How many entries `GET /actions` returns when no limit is given.
    #[serde(default = "default_recent_actions")]
    pub action_log_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            action_log_limit: DEFAULT_RECENT_ACTIONS,
        }
    }
}

fn default_device_host() -> String {
    DEFAULT_DEVICE_HOST.to_string()
}
fn default_device_port() -> u16 {
    DEFAULT_DEVICE_PORT
}
fn default_device_timeout_ms() -> u64 {
    DEFAULT_DEVICE_TIMEOUT_MS
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}
fn default_recent_actions() -> usize {
    DEFAULT_RECENT_ACTIONS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.irrigo/irrigo.db", home)
}

/// The four-channel board the controller firmware ships with.
fn default_valves() -> Vec<ValveInfo> {
    [(1, 16), (2, 14), (3, 12), (4, 13)]
        .into_iter()
        .map(|(id, physical)| ValveInfo {
            id,
            physical: Some(physical),
            name: Some(format!("Valve {id}")),
        })
        .collect()
}

impl IrrigoConfig {
    /// Load config from a TOML file with IRRIGO_* env var overrides.
    ///
    /// Nested keys use a double underscore: `IRRIGO_DEVICE__HOST=10.0.0.5`.
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.irrigo/irrigo.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(%path, "loading config");

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::IrrigoError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(IrrigoConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("IRRIGO_").split("__"))
    }

    /// Registry seeded from the `[[valves]]` table.
    pub fn seed_registry(&self) -> ValveRegistry {
        ValveRegistry::from_rows(self.valves.iter().cloned())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.irrigo/irrigo.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let config = IrrigoConfig::load(Some("nope.toml")).expect("defaults");
            assert_eq!(config.device.host, DEFAULT_DEVICE_HOST);
            assert_eq!(config.device.port, DEFAULT_DEVICE_PORT);
            assert_eq!(config.scheduler.action_log_limit, DEFAULT_RECENT_ACTIONS);
            assert_eq!(config.seed_registry().resolve_physical(2), 14);
            Ok(())
        });
    }

    #[test]
    fn toml_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "irrigo.toml",
                r#"
[device]
host = "10.0.0.7"
timeout_ms = 750

[[valves]]
id = 1
physical = 5
name = "Front lawn"

[[valves]]
id = 2
"#,
            )?;
            let config = IrrigoConfig::load(Some("irrigo.toml")).expect("config");
            assert_eq!(config.device.address(), "10.0.0.7:8080");
            assert_eq!(config.device.timeout_ms, 750);
            let registry = config.seed_registry();
            assert_eq!(registry.resolve_physical(1), 5);
            assert_eq!(registry.display_name(1), "Front lawn");
            assert_eq!(registry.resolve_physical(2), 2);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_toml() {
        Jail::expect_with(|jail| {
            jail.create_file("irrigo.toml", "[device]\nport = 9000\n")?;
            jail.set_env("IRRIGO_DEVICE__PORT", "9100");
            jail.set_env("IRRIGO_GATEWAY__BIND", "0.0.0.0");
            let config = IrrigoConfig::load(Some("irrigo.toml")).expect("config");
            assert_eq!(config.device.port, 9100);
            assert_eq!(config.gateway.bind, "0.0.0.0");
            Ok(())
        });
    }
}
