use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File as ConfigFile};

pub const DEFAULT_CONFIG_FILE: &str = "dirsvc.toml";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5101;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_FORMAT: &str = "pretty";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub config_path: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
}

impl AppConfig {
    /// Layer the optional config file under `DIRSVC_*` environment variables.
    pub fn load(config_path_override: Option<&str>) -> Result<Self> {
        let resolved_path = match config_path_override {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    anyhow::bail!(
                        "Configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path)
            }
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|path| path.exists()),
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }
        builder = builder.add_source(Environment::with_prefix("DIRSVC"));

        let config = builder
            .build()
            .context("failed to assemble configuration sources")?;

        let port = match get_string_value(&config, &["port", "server.port"]) {
            Some(value) => value
                .parse()
                .with_context(|| format!("invalid port {value:?}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            config_path: resolved_path,
            host: get_string_value(&config, &["host", "server.host"])
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            log_level: get_string_value(&config, &["log_level", "log.level"])
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format: get_string_value(&config, &["log_format", "log.format"])
                .unwrap_or_else(|| DEFAULT_LOG_FORMAT.to_string()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

fn get_string_value(config: &Config, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        config
            .get_string(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
