use std::{fs, io, path::{Path, PathBuf}};

use json_comments::StripComments;
use log::trace;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config read error {path}: {source}")]
  Read {path: String, source: io::Error},
  #[error("config parse error {path}: {source}")]
  Parse {path: String, source: serde_json::Error},
}

/// Bridge settings, read from a JSON file that may carry comments.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
  pub name: String,
  pub log_level: Option<String>,
  /// Module allow-list; every module is registered when absent.
  pub modules: Option<Vec<String>>,
}

impl Default for BridgeConfig {
  fn default() -> Self {
    BridgeConfig {name: "main-bridge".to_string(), log_level: None, modules: None}
  }
}

impl BridgeConfig {
  pub fn parse(text: &str) -> Result<BridgeConfig, serde_json::Error> {
    serde_json::from_reader(StripComments::new(text.as_bytes()))
  }

  pub fn load(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let text = fs::read_to_string(path)
      .map_err(|source| ConfigError::Read {path: path.display().to_string(), source})?;
    BridgeConfig::parse(&text)
      .map_err(|source| ConfigError::Parse {path: path.display().to_string(), source})
  }

  /// Defaults when the file does not exist.
  pub fn load_or_default(path: &Path) -> Result<BridgeConfig, ConfigError> {
    if !path.exists() {
      trace!("no bridge config at {}", path.display());
      return Ok(BridgeConfig::default());
    }
    BridgeConfig::load(path)
  }

  /// `<config dir>/bridge.json` of the named application.
  pub fn default_path(app_name: &str) -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", app_name).map(|dirs| dirs.config_dir().join("bridge.json"))
  }

  pub fn is_enabled(&self, module: &str) -> bool {
    match &self.modules {
      Some(modules) => modules.iter().any(|m| m == module),
      None => true,
    }
  }

  pub fn log_filter(&self) -> &str {
    self.log_level.as_deref().unwrap_or("info")
  }
}
