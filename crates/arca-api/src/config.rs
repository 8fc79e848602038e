//! # Server Configuration
//!
//! [`AppConfig`] is resolved in three layers, later layers winning:
//!
//! 1. Built-in defaults.
//! 2. An optional YAML file (`ARCA_CONFIG`, default `/etc/arca/arca.yaml`).
//!    A missing file is not an error.
//! 3. Environment variables.
//!
//! ```yaml
//! network:
//!   ip_address: 0.0.0.0
//!   port: 8888
//! repository:
//!   root: /var/lib/arca
//!   package_extension: apk
//!   max_upload_bytes: 536870912
//! ```
//!
//! | Variable | Field |
//! |---|---|
//! | `ARCA_BIND` | `bind_address` |
//! | `PORT` | `port` |
//! | `ARCA_ROOT` | `root` |
//! | `ARCA_PACKAGE_EXTENSION` | `package_extension` |
//! | `ARCA_MAX_UPLOAD_BYTES` | `max_upload_bytes` |
//! | `ARCA_METRICS_ENABLED` | `metrics_enabled` (anything but `false` enables) |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use arca_catalog::RepositoryLayout;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/arca/arca.yaml";
pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_ROOT: &str = "./arca-data";
pub const DEFAULT_EXTENSION: &str = "apk";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    /// Repository root; content and catalog live beneath it.
    pub root: PathBuf,
    /// Accepted package extension, without the dot.
    pub package_extension: String,
    pub max_upload_bytes: usize,
    pub metrics_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            root: PathBuf::from(DEFAULT_ROOT),
            package_extension: DEFAULT_EXTENSION.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            metrics_enabled: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    network: NetworkSection,
    repository: RepositorySection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct NetworkSection {
    ip_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RepositorySection {
    root: Option<PathBuf>,
    package_extension: Option<String>,
    max_upload_bytes: Option<usize>,
}

impl AppConfig {
    /// Load from the process environment and the config file it names.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("ARCA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let yaml = match std::fs::read_to_string(&path) {
            Ok(s) => Some(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path, "no config file, using defaults");
                None
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: PathBuf::from(path),
                    source,
                })
            }
        };
        Self::from_sources(Path::new(&path), yaml.as_deref(), |key| std::env::var(key).ok())
    }

    /// Resolve from an optional YAML document and an environment lookup.
    /// `path` is only used in error messages.
    pub fn from_sources(
        path: &Path,
        yaml: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(yaml) = yaml {
            let file: FileConfig = if yaml.trim().is_empty() {
                FileConfig::default()
            } else {
                serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            };
            if let Some(ip) = file.network.ip_address {
                config.bind_address = parse_ip("network.ip_address", &ip)?;
            }
            if let Some(port) = file.network.port {
                config.port = port;
            }
            if let Some(root) = file.repository.root {
                config.root = root;
            }
            if let Some(ext) = file.repository.package_extension {
                config.package_extension = normalize_extension("repository.package_extension", &ext)?;
            }
            if let Some(max) = file.repository.max_upload_bytes {
                config.max_upload_bytes = max;
            }
        }

        if let Some(ip) = env("ARCA_BIND") {
            config.bind_address = parse_ip("ARCA_BIND", &ip)?;
        }
        if let Some(port) = env("PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: port.clone(),
            })?;
        }
        if let Some(root) = env("ARCA_ROOT") {
            config.root = PathBuf::from(root);
        }
        if let Some(ext) = env("ARCA_PACKAGE_EXTENSION") {
            config.package_extension = normalize_extension("ARCA_PACKAGE_EXTENSION", &ext)?;
        }
        if let Some(max) = env("ARCA_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = max.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "ARCA_MAX_UPLOAD_BYTES",
                value: max.clone(),
            })?;
        }
        if let Some(flag) = env("ARCA_METRICS_ENABLED") {
            config.metrics_enabled = flag.to_lowercase() != "false";
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn layout(&self) -> RepositoryLayout {
        RepositoryLayout::new(&self.root)
    }
}

fn parse_ip(key: &'static str, value: &str) -> Result<IpAddr, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn normalize_extension(key: &'static str, value: &str) -> Result<String, ConfigError> {
    let ext = value.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        });
    }
    Ok(ext)
}
