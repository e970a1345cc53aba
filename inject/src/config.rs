//! Build-mode configuration deciding whether injection is active.

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::env;

/// Environment variable naming the current environment (e.g. `test`).
pub const ENV_VAR: &str = "FIBRE_INJECT_ENV";
/// Environment variable forcing injection on (`1`/`true`) or off (`0`/`false`).
pub const ENABLED_VAR: &str = "FIBRE_INJECT_ENABLED";

static PROCESS_CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

/// Runtime configuration.
///
/// Injection is meant for development and tests; in any other environment the
/// consumer entry point is a pure pass-through.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// Name of the current environment. `None` picks `development` in debug
  /// builds and `production` otherwise.
  pub env: Option<String>,
  /// Environments in which injection is active.
  pub enabled_envs: Vec<String>,
  /// Explicit override of the environment check.
  pub enabled: Option<bool>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      env: None,
      enabled_envs: vec!["development".to_owned(), "test".to_owned()],
      enabled: None,
    }
  }
}

impl Config {
  /// Reads [`ENV_VAR`] and [`ENABLED_VAR`] on top of the defaults.
  pub fn from_env() -> Self {
    let mut config = Config::default();
    if let Ok(name) = env::var(ENV_VAR) {
      if !name.trim().is_empty() {
        config.env = Some(name.trim().to_owned());
      }
    }
    if let Ok(flag) = env::var(ENABLED_VAR) {
      config.enabled = parse_flag(&flag);
      if config.enabled.is_none() {
        tracing::warn!(value = %flag, "ignoring unrecognized {}", ENABLED_VAR);
      }
    }
    config
  }

  pub fn from_yaml_str(source: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(source)
  }

  /// The configuration of this process, read once on first access.
  pub fn process() -> &'static Config {
    &PROCESS_CONFIG
  }

  pub fn current_env(&self) -> &str {
    match &self.env {
      Some(name) => name.as_str(),
      None if cfg!(debug_assertions) => "development",
      None => "production",
    }
  }

  pub fn is_enabled(&self) -> bool {
    match self.enabled {
      Some(flag) => flag,
      None => {
        let current = self.current_env();
        self.enabled_envs.iter().any(|e| e == current)
      }
    }
  }
}

fn parse_flag(value: &str) -> Option<bool> {
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "0" | "false" | "no" | "off" => Some(false),
    _ => None,
  }
}
