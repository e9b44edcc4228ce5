use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::store::DEFAULT_FILE;

/// Registration server configuration.
///
/// Loaded from `REGISTRAR_*` environment variables by the server binary.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default: 127.0.0.1:8000)
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Path of the registrations CSV file.
    #[serde(default = "default_registrations_file")]
    pub registrations_file: PathBuf,

    /// TLS certificate (PEM). HTTPS is enabled when both cert and key are set.
    #[serde(default)]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key (PEM).
    #[serde(default)]
    pub tls_key: Option<PathBuf>,
}

impl ServerConfig {
    /// Certificate and key paths when both are configured.
    #[must_use]
    pub fn tls_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.tls_cert.as_ref().zip(self.tls_key.as_ref())
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_registrations_file() -> PathBuf {
    PathBuf::from(DEFAULT_FILE)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            registrations_file: default_registrations_file(),
            tls_cert: None,
            tls_key: None,
        }
    }
}
