//! Plugin parameters (§4.6): the merged agent settings plus CLI overrides
//! handed to `set_params` before the first role call.
//!
//! Grounded on the same "parse, then override" shape `mads_core::config`
//! uses for TOML, but the merge target here is a flat key-value map rather
//! than a typed struct, since a plugin's own parameter set is not known to
//! the host.

use std::collections::HashMap;

use serde_json::Value;

/// A single `-o key=value` CLI override. Values are parsed as integer, then
/// floating-point, then string, in that order (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct ParamOverride {
    pub key: String,
    pub value: Value,
}

impl ParamOverride {
    pub fn parse(raw: &str) -> Option<Self> {
        let (key, value) = raw.split_once('=')?;
        Some(Self {
            key: key.to_string(),
            value: parse_value(value),
        })
    }
}

fn parse_value(raw: &str) -> Value {
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::from(f);
    }
    Value::String(raw.to_string())
}

/// The merged parameter set a plugin receives via `set_params`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginParams {
    values: HashMap<String, Value>,
}

impl PluginParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from the agent's per-agent settings section, flattened to JSON.
    pub fn from_settings(settings: Value) -> Self {
        let mut params = Self::new();
        if let Value::Object(map) = settings {
            for (k, v) in map {
                params.values.insert(k, v);
            }
        }
        params
    }

    /// The installation prefix, injected so a plugin can locate its own
    /// co-installed data files without re-deriving it itself.
    pub fn with_install_prefix(mut self, prefix: &std::path::Path) -> Self {
        self.values.insert(
            "install_prefix".to_string(),
            Value::String(prefix.display().to_string()),
        );
        self
    }

    /// The owning agent's identifier, if one was given on the CLI (`-i`).
    pub fn with_agent_id(mut self, agent_id: Option<&str>) -> Self {
        if let Some(id) = agent_id {
            self.values.insert("agent_id".to_string(), Value::String(id.to_string()));
        }
        self
    }

    /// Apply a batch of `-o key=value` overrides, last-one-wins.
    pub fn apply_overrides(&mut self, overrides: &[ParamOverride]) {
        for o in overrides {
            self.values.insert(o.key.clone(), o.value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(Value::as_u64)
    }

    /// The `silent` override (§4.6): suppresses the plugin's own banner/log
    /// noise independent of the host's own logging level.
    pub fn silent(&self) -> bool {
        self.get_bool("silent").unwrap_or(false)
    }

    /// The `receive_timeout` override, in milliseconds, falling back to the
    /// agent descriptor's own default when absent.
    pub fn receive_timeout_ms(&self, default: u64) -> u64 {
        self.get_u64("receive_timeout").unwrap_or(default)
    }

    /// The transformer-only `dont_block` flag: the loop advances even with
    /// no fresh input rather than waiting out the full receive timeout.
    pub fn dont_block(&self) -> bool {
        self.get_bool("dont_block").unwrap_or(false)
    }

    pub fn as_json(&self) -> Value {
        Value::Object(self.values.clone().into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_parses_integer_before_float_before_string() {
        assert_eq!(ParamOverride::parse("n=42").unwrap().value, Value::from(42));
        assert_eq!(ParamOverride::parse("f=3.5").unwrap().value, Value::from(3.5));
        assert_eq!(
            ParamOverride::parse("s=hello").unwrap().value,
            Value::String("hello".into())
        );
    }

    #[test]
    fn override_without_equals_is_none() {
        assert!(ParamOverride::parse("no-equals-sign").is_none());
    }

    #[test]
    fn apply_overrides_is_last_one_wins() {
        let mut params = PluginParams::new();
        params.apply_overrides(&[
            ParamOverride::parse("n=1").unwrap(),
            ParamOverride::parse("n=2").unwrap(),
        ]);
        assert_eq!(params.get("n"), Some(&Value::from(2)));
    }

    #[test]
    fn from_settings_flattens_object() {
        let params = PluginParams::from_settings(serde_json::json!({"rate": 10, "label": "x"}));
        assert_eq!(params.get_u64("rate"), Some(10));
        assert_eq!(params.get_str("label"), Some("x"));
    }

    #[test]
    fn silent_and_dont_block_default_false() {
        let params = PluginParams::new();
        assert!(!params.silent());
        assert!(!params.dont_block());
    }

    #[test]
    fn receive_timeout_falls_back_to_default() {
        let params = PluginParams::new();
        assert_eq!(params.receive_timeout_ms(500), 500);
    }
}
