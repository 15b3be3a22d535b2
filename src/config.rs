use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path (or bare command name) of the LibreOffice binary
    #[serde(default = "default_libreoffice_path")]
    pub libreoffice_path: String,

    /// Log level filter for the tracing subscriber
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            libreoffice_path: default_libreoffice_path(),
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional `docpdf` config file, overridden
    /// by environment variables (`PORT`, `LIBREOFFICE_PATH`, `BIND_ADDR`,
    /// `LOG_LEVEL`).
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("docpdf").required(false))
            .add_source(config::Environment::default());

        Ok(builder.build()?.try_deserialize()?)
    }

    /// The socket address to bind to.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_libreoffice_path() -> String {
    "libreoffice".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.bind_addr, "0.0.0.0");
        assert_eq!(cfg.libreoffice_path, "libreoffice");
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }
}
