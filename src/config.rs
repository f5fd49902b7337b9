use crate::types::{DEFAULT_BIND_ADDR, DEFAULT_LOG_DIR};
use serde::{Deserialize, Serialize};
use std::{
    env,
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
  pub bind_addr: String,
  pub log_dir: String,
  /// Fixed seed for the start-of-tournament shuffle. Clock-seeded when unset.
  pub shuffle_seed: Option<u64>,
  pub log_requests: bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    ServerConfig {
      bind_addr: DEFAULT_BIND_ADDR.to_string(),
      log_dir: DEFAULT_LOG_DIR.to_string(),
      shuffle_seed: None,
      log_requests: false,
    }
  }
}

impl ServerConfig {
  pub fn resolved_shuffle_seed(&self) -> u64 {
    self.shuffle_seed.unwrap_or_else(now_ms)
  }

  pub fn resolved_log_dir(&self) -> PathBuf {
    resolve_repo_path(&self.log_dir)
  }
}

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
  let path = PathBuf::from(raw);
  if path.is_absolute() {
    path
  } else {
    repo_root().join(path)
  }
}

pub fn config_path() -> PathBuf {
  if let Some(raw) = env_default("BRACKET_CONFIG_PATH") {
    return resolve_repo_path(&raw);
  }
  repo_root().join("config.json")
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn parse_flag(value: &str) -> bool {
  let value = value.trim().to_ascii_lowercase();
  matches!(value.as_str(), "1" | "true" | "yes" | "on")
}

pub fn apply_env_defaults(mut config: ServerConfig) -> ServerConfig {
  apply_overrides(&mut config, env_default);
  config
}

/// Environment overrides, read through `lookup` so they can be exercised
/// without touching the process environment.
pub fn apply_overrides<F>(config: &mut ServerConfig, lookup: F)
where
  F: Fn(&str) -> Option<String>,
{
  if let Some(value) = lookup("BRACKET_BIND_ADDR") {
    config.bind_addr = value;
  }
  if let Some(value) = lookup("BRACKET_LOG_DIR") {
    config.log_dir = value;
  }
  if let Some(value) = lookup("BRACKET_SHUFFLE_SEED") {
    match value.parse::<u64>() {
      Ok(seed) => config.shuffle_seed = Some(seed),
      Err(_) => tracing::warn!("ignoring BRACKET_SHUFFLE_SEED={value:?}: not a number"),
    }
  }
  if let Some(value) = lookup("BRACKET_LOG_REQUESTS") {
    config.log_requests = parse_flag(&value);
  }
}

pub fn load_config_inner() -> Result<ServerConfig, String> {
  load_config_from(&config_path()).map(apply_env_defaults)
}

pub fn load_config_from(path: &Path) -> Result<ServerConfig, String> {
  if !path.is_file() {
    return Ok(ServerConfig::default());
  }
  let data = fs::read_to_string(path).map_err(|e| format!("read config {}: {e}", path.display()))?;
  serde_json::from_str::<ServerConfig>(&data).map_err(|e| format!("parse config {}: {e}", path.display()))
}

pub fn load_env_file() {
  let env_path = repo_root().join(".env");
  if !env_path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(&env_path) {
    Ok(data) => data,
    Err(_) => return,
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}

pub fn now_ms() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as u64
}

pub fn log_env_warnings(config: &ServerConfig) {
  let mut warnings = Vec::new();

  if config.shuffle_seed.is_none() {
    warnings.push("BRACKET_SHUFFLE_SEED not set and no shuffleSeed in config; draft shuffles will not be reproducible");
  }
  if !config.bind_addr.starts_with("127.") && !config.bind_addr.starts_with("localhost") {
    warnings.push("server is bound to a non-loopback address; score submission has no authentication");
  }

  for msg in warnings {
    tracing::warn!("{}", msg);
  }
}
