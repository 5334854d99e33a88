//! Configuration for the DWG SMS server.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use dwg_core::{DwgError, ServerConfig};
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Gateway connection settings.
    pub gateway: GatewayConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Gateway connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// TCP port the gateway connects to.
    pub listen_port: u16,
    /// Local address to bind.
    pub bind_address: String,
    /// User the gateway must present (at most 15 visible ASCII characters).
    pub user: String,
    /// Password the gateway must present.
    pub password: String,
    /// How long to wait for the gateway to answer a send request.
    pub response_timeout_secs: u64,
    /// Server-initiated keep-alive period. 0 disables it.
    pub keepalive_interval_secs: u64,
    /// Notifications buffered before new ones are dropped.
    pub event_queue_capacity: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_port: 6000,
            bind_address: "0.0.0.0".into(),
            user: "admin".into(),
            password: "admin".into(),
            response_timeout_secs: 30,
            keepalive_interval_secs: 0,
            event_queue_capacity: 256,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Validate the gateway section into a `ServerConfig`.
    pub fn to_server_config(&self) -> Result<ServerConfig, DwgError> {
        let gw = &self.gateway;
        let bind_address: IpAddr = gw.bind_address.parse().map_err(|e| {
            DwgError::InvalidConfiguration(format!("bind_address {:?}: {e}", gw.bind_address))
        })?;
        let keepalive = (gw.keepalive_interval_secs > 0)
            .then(|| Duration::from_secs(gw.keepalive_interval_secs));

        Ok(
            ServerConfig::new(gw.listen_port, gw.user.as_str(), gw.password.as_str())?
                .with_bind_address(bind_address)
                .with_response_timeout(Duration::from_secs(gw.response_timeout_secs))
                .with_event_capacity(gw.event_queue_capacity)
                .with_keepalive_interval(keepalive),
        )
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(text.contains("[gateway]"));
        assert!(text.contains("listen_port"));
        assert!(text.contains("[logging]"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: AppConfig = toml::from_str("[gateway]\nlisten_port = 7001\nuser = \"svc\"\n").unwrap();
        assert_eq!(cfg.gateway.listen_port, 7001);
        assert_eq!(cfg.gateway.user, "svc");
        assert_eq!(cfg.gateway.password, "admin");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn converts_to_server_config() {
        let mut cfg = AppConfig::default();
        cfg.gateway.bind_address = "127.0.0.1".into();
        cfg.gateway.response_timeout_secs = 5;
        cfg.gateway.keepalive_interval_secs = 20;

        let server = cfg.to_server_config().unwrap();
        assert_eq!(server.socket_addr().to_string(), "127.0.0.1:6000");
        assert_eq!(server.response_timeout(), Duration::from_secs(5));
        assert_eq!(server.keepalive_interval(), Some(Duration::from_secs(20)));
        assert_eq!(server.user(), "admin");
    }

    #[test]
    fn keepalive_zero_is_off() {
        let server = AppConfig::default().to_server_config().unwrap();
        assert_eq!(server.keepalive_interval(), None);
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.gateway.bind_address = "not-an-ip".into();
        assert!(matches!(
            cfg.to_server_config(),
            Err(DwgError::InvalidConfiguration(_))
        ));

        let mut cfg = AppConfig::default();
        cfg.gateway.password = String::new();
        assert!(matches!(
            cfg.to_server_config(),
            Err(DwgError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn write_then_load() {
        let path = std::env::temp_dir().join(format!("dwg-server-{}.toml", std::process::id()));
        AppConfig::write_default(&path).unwrap();
        let cfg = AppConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.gateway.listen_port, 6000);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = AppConfig::load(Path::new("/nonexistent/dwg-server.toml"));
        assert_eq!(cfg.gateway.event_queue_capacity, 256);
    }
}
