// Application configuration
//
// Layering (later wins): built-in defaults -> TOML file -> MINEOPS__SECTION__KEY env vars.

use crate::artifacts::id_card::Branding;
use crate::utils::path_resolver;
use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "MINEOPS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every entity endpoint is joined onto.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Host key-value store file. Empty means the per-user data folder.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Empty means the per-user data folder.
    pub folder: String,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            folder: String::new(),
            level: "debug".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level
            .trim()
            .parse()
            .unwrap_or(log::LevelFilter::Debug)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub branding: Branding,
}

impl AppConfig {
    /// Load using the standard search path when `explicit` is `None`.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let file = match explicit {
            Some(p) => Some((p.to_path_buf(), true)),
            None => path_resolver::config_candidates()
                .into_iter()
                .find(|p| p.is_file())
                .map(|p| (p, false)),
        };
        Self::load_from(file.as_ref().map(|(p, req)| (p.as_path(), *req)), ENV_PREFIX)
    }

    /// `file` is `(path, required)`.
    pub fn load_from(file: Option<(&Path, bool)>, env_prefix: &str) -> anyhow::Result<Self> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&AppConfig::default()).context("Failed to seed default config")?,
        );
        if let Some((path, required)) = file {
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(required),
            );
        }
        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        cfg.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), String> {
        let url = url::Url::parse(self.api.base_url.trim())
            .map_err(|e| format!("api.base_url is not a valid URL: {}", e))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err("api.base_url must use http or https".to_string());
        }
        if self.api.timeout_secs == 0 {
            return Err("api.timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn log_folder(&self) -> Option<PathBuf> {
        non_empty_path(&self.logging.folder)
    }

    pub fn storage_path(&self) -> PathBuf {
        path_resolver::resolve_storage_path(non_empty_path(&self.storage.path).as_deref())
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}

fn non_empty_path(raw: &str) -> Option<PathBuf> {
    let t = raw.trim();
    if t.is_empty() {
        None
    } else {
        Some(PathBuf::from(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.logging.level_filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn file_overrides_defaults_and_keeps_the_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mineops.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"https://ops.example.co.zw/api/\"\n\n[branding]\norganisation = \"Zim Gold Co-op\"\n",
        )
        .expect("write");

        let cfg = AppConfig::load_from(Some((&path, true)), "MINEOPS_TEST_FILE").expect("load");
        assert_eq!(cfg.api.base_url, "https://ops.example.co.zw/api/");
        assert_eq!(cfg.api.timeout_secs, 30);
        assert_eq!(cfg.branding.organisation, "Zim Gold Co-op");
        assert_eq!(cfg.branding.tagline, Branding::default().tagline);
    }

    #[test]
    fn env_overrides_file() {
        std::env::set_var("MINEOPS_TEST_ENV__API__TIMEOUT_SECS", "5");
        let cfg = AppConfig::load_from(None, "MINEOPS_TEST_ENV").expect("load");
        std::env::remove_var("MINEOPS_TEST_ENV__API__TIMEOUT_SECS");
        assert_eq!(cfg.api.timeout_secs, 5);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let err = AppConfig::load_from(Some((Path::new("/nope/mineops.toml"), true)), "MINEOPS_TEST_MISSING");
        assert!(err.is_err());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.api.base_url = "ftp://files".to_string();
        assert!(cfg.validate().unwrap_err().contains("http"));
    }

    #[test]
    fn renders_as_toml() {
        let text = AppConfig::default().to_toml().expect("toml");
        assert!(text.contains("[api]"));
        assert!(text.contains("timeout_secs = 30"));
    }
}
