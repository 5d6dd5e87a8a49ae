//! Configuration loading and environment parsing.

use super::validation::validate_config;
use super::Config;
use serde_json::Value;
use std::env;
use std::fs;
use std::path::Path;

/// Load configuration with the following precedence (highest first):
/// 1) `BATTLE_MEDIATION_CONFIG_JSON` env var containing raw JSON
/// 2) File pointed to by `BATTLE_MEDIATION_CONFIG_PATH`
/// 3) `config.json` in the current working directory
/// 4) Defaults compiled into the binary
///
/// After merging, the individual environment variables named in spec.md §6
/// (`BATTLE_PORT`, `LOG_LEVEL`, `LLM_API_KEY`) are applied as final overrides,
/// since those are the contract the spec guarantees regardless of any config
/// file mechanism.
///
/// Errors while reading/parsing are printed to stderr and defaults are used;
/// `load()` always returns a `Config`. Call [`validate_config`] on the result
/// if hard failure on an invalid config is desired.
#[must_use]
pub fn load() -> Config {
    let defaults = Config::default();
    let mut merged =
        serde_json::to_value(&defaults).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

    if let Ok(json) = env::var("BATTLE_MEDIATION_CONFIG_JSON") {
        if let Some(value) = parse_json_document(&json, "BATTLE_MEDIATION_CONFIG_JSON") {
            merge_values(&mut merged, value);
        }
    }

    if let Ok(path) = env::var("BATTLE_MEDIATION_CONFIG_PATH") {
        merge_file_source(&mut merged, Path::new(&path));
    }

    merge_file_source(&mut merged, Path::new("config.json"));

    let mut config = match serde_json::from_value::<Config>(merged) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to deserialize config; using defaults: {e}");
            defaults
        }
    };

    apply_named_env_overrides(&mut config);
    config
}

fn apply_named_env_overrides(config: &mut Config) {
    if let Ok(port) = env::var("BATTLE_PORT") {
        match port.parse() {
            Ok(p) => config.port = p,
            Err(_) => eprintln!("Ignoring invalid BATTLE_PORT={port}"),
        }
    }

    if let Ok(level) = env::var("LOG_LEVEL") {
        match level.parse() {
            Ok(l) => config.logging.level = Some(l),
            Err(_) => eprintln!("Ignoring invalid LOG_LEVEL={level}"),
        }
    }

    if let Ok(key) = env::var("LLM_API_KEY") {
        if !key.is_empty() {
            config.ai.llm_api_key = Some(key);
        }
    }
}

fn parse_json_document(raw: &str, source: &str) -> Option<Value> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            eprintln!("Failed to parse config from {source}: {e}");
            None
        }
    }
}

fn merge_file_source(merged: &mut Value, path: &Path) {
    if !path.exists() {
        return;
    }
    match fs::read_to_string(path) {
        Ok(raw) => {
            if let Some(value) = parse_json_document(&raw, &path.display().to_string()) {
                merge_values(merged, value);
            }
        }
        Err(e) => eprintln!("Failed to read config file {}: {e}", path.display()),
    }
}

/// Recursive merge: `incoming` wins on scalars, merges on objects.
fn merge_values(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (key, value) in incoming_map {
                merge_values(base_map.entry(key).or_insert(Value::Null), value);
            }
        }
        (base_slot, incoming_value) => {
            *base_slot = incoming_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_env_overrides_win_over_defaults() {
        let mut config = Config::default();
        env::set_var("BATTLE_PORT", "9999");
        env::set_var("LOG_LEVEL", "debug");
        apply_named_env_overrides(&mut config);
        assert_eq!(config.port, 9999);
        assert_eq!(config.logging.level.unwrap().as_str(), "debug");
        env::remove_var("BATTLE_PORT");
        env::remove_var("LOG_LEVEL");
    }

    #[test]
    fn merge_values_is_deep_for_objects() {
        let mut base = serde_json::json!({"a": {"b": 1, "c": 2}});
        let incoming = serde_json::json!({"a": {"b": 9}});
        merge_values(&mut base, incoming);
        assert_eq!(base, serde_json::json!({"a": {"b": 9, "c": 2}}));
    }
}
