//! Layered configuration loader
//!
//! Merges configuration from three sources, lowest priority first:
//! 1. compiled-in defaults
//! 2. environment variables (prefix-scoped)
//! 3. YAML file

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use tracing::{debug, info};

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Layered configuration loader
pub struct ConfigLoader<T>
where
    T: Default + DeserializeOwned + Serialize,
{
    /// Default configuration
    defaults: T,
    /// Environment variable prefix
    env_prefix: Option<String>,
    /// YAML file path
    yaml_path: Option<String>,
}

impl<T> Default for ConfigLoader<T>
where
    T: Default + DeserializeOwned + Serialize,
{
    fn default() -> Self {
        Self {
            defaults: T::default(),
            env_prefix: None,
            yaml_path: None,
        }
    }
}

impl<T> ConfigLoader<T>
where
    T: Default + DeserializeOwned + Serialize,
{
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default configuration
    pub fn with_defaults(mut self, defaults: T) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set the environment variable prefix
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Set the YAML configuration file path
    pub fn with_yaml_file(mut self, path: &str) -> Self {
        self.yaml_path = Some(path.to_string());
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<T> {
        // 1. start from defaults
        let mut config_json = serde_json::to_value(&self.defaults)?;
        debug!("Starting from default configuration");

        // 2. apply environment variables (medium priority)
        if let Some(prefix) = &self.env_prefix {
            debug!("Applying environment variables, prefix: {}", prefix);
            apply_env_vars(&mut config_json, prefix);
        }

        // 3. apply YAML file (highest priority)
        if let Some(yaml_path) = &self.yaml_path {
            if Path::new(yaml_path).exists() {
                info!("Loading YAML config file: {}", yaml_path);
                let yaml_content = std::fs::read_to_string(yaml_path)?;
                let yaml_value: YamlValue = serde_yaml::from_str(&yaml_content)?;
                merge_yaml_into_json(&mut config_json, &yaml_value)?;
            } else {
                debug!("YAML config file not found, skipping: {}", yaml_path);
            }
        }

        // 4. deserialize into the final configuration
        let config: T = serde_json::from_value(config_json)?;
        Ok(config)
    }
}

/// Apply prefixed environment variables onto a JSON configuration tree.
///
/// `PREFIX_SERVICE_PORT=6010` maps to `service.port`. Because key names may
/// themselves contain underscores (`poll_interval_ms`), path segments are
/// resolved greedily against the keys that already exist in the tree.
fn apply_env_vars(config: &mut JsonValue, prefix: &str) {
    let env_vars: HashMap<String, String> = env::vars()
        .filter(|(k, _)| k.starts_with(prefix))
        .collect();

    for (key, value) in env_vars {
        let tokens: Vec<String> = key
            .strip_prefix(prefix)
            .unwrap_or(&key)
            .trim_start_matches('_')
            .to_lowercase()
            .split('_')
            .map(|s| s.to_string())
            .collect();

        if tokens.iter().all(|t| t.is_empty()) {
            continue;
        }

        debug!("Applying environment variable {} = {}", key, value);
        set_by_tokens(config, &tokens, &value);
    }
}

/// Walk the config tree matching the longest run of tokens against existing
/// keys at each level; the leaf value is parsed as JSON scalar when possible.
fn set_by_tokens(node: &mut JsonValue, tokens: &[String], value: &str) {
    if tokens.is_empty() {
        return;
    }

    let Some(obj) = node.as_object_mut() else {
        return;
    };

    // Longest prefix of tokens that names an existing key wins
    for take in (1..=tokens.len()).rev() {
        let candidate = tokens[..take].join("_");
        if obj.contains_key(&candidate) {
            if take == tokens.len() {
                obj.insert(candidate, parse_scalar(value));
            } else {
                let child = obj
                    .entry(candidate)
                    .or_insert_with(|| JsonValue::Object(Default::default()));
                set_by_tokens(child, &tokens[take..], value);
            }
            return;
        }
    }

    // Nothing matched: set the full joined name at this level
    obj.insert(tokens.join("_"), parse_scalar(value));
}

/// Interpret an environment string as bool/number when it parses as one
fn parse_scalar(value: &str) -> JsonValue {
    if let Ok(b) = value.parse::<bool>() {
        return JsonValue::Bool(b);
    }
    if let Ok(i) = value.parse::<i64>() {
        return JsonValue::from(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        return JsonValue::from(f);
    }
    JsonValue::String(value.to_string())
}

/// Recursively merge a YAML mapping into the JSON configuration tree
fn merge_yaml_into_json(target: &mut JsonValue, yaml: &YamlValue) -> Result<()> {
    let yaml_json: JsonValue = serde_json::to_value(yaml)?;
    merge_json(target, &yaml_json);
    Ok(())
}

fn merge_json(target: &mut JsonValue, source: &JsonValue) {
    match (target, source) {
        (JsonValue::Object(target_map), JsonValue::Object(source_map)) => {
            for (key, source_value) in source_map {
                match target_map.get_mut(key) {
                    Some(target_value) => merge_json(target_value, source_value),
                    None => {
                        target_map.insert(key.clone(), source_value.clone());
                    },
                }
            }
        },
        (target, source) => {
            *target = source.clone();
        },
    }
}
