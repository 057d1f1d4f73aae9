//! Configuration data model (§3, §6).
//!
//! A TOML document with a fixed `[agents]` global section and one named
//! section per agent. The authoritative copy lives at the broker; each agent
//! receives a verbatim copy on request (C3), so this module is shared by
//! both sides: the broker loads it from disk, the agent parses whatever text
//! it receives.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ATTACHMENT_EXT, DEFAULT_BACKEND_PORT, DEFAULT_FRONTEND_PORT, DEFAULT_SETTINGS_PORT,
    DEFAULT_TIMECODE_FPS,
};
use crate::error::{MadsError, Result};

fn default_frontend_address() -> String {
    format!("tcp://*:{DEFAULT_FRONTEND_PORT}")
}
fn default_backend_address() -> String {
    format!("tcp://*:{DEFAULT_BACKEND_PORT}")
}
fn default_settings_address() -> String {
    format!("tcp://*:{DEFAULT_SETTINGS_PORT}")
}
fn default_timecode_fps() -> f64 {
    DEFAULT_TIMECODE_FPS
}

/// The `[agents]` global section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentsGlobal {
    #[serde(default = "default_frontend_address")]
    pub frontend_address: String,
    #[serde(default = "default_backend_address")]
    pub backend_address: String,
    #[serde(default = "default_settings_address")]
    pub settings_address: String,
    #[serde(default = "default_timecode_fps")]
    pub timecode_fps: f64,
    #[serde(default)]
    pub ip_whitelist: Vec<String>,
    #[serde(default)]
    pub auth_verbose: bool,
    /// Carried over from the original: a dummy/no-op agent flag used for
    /// smoke-testing a broker without a real producer.
    #[serde(default)]
    pub dummy: bool,
}

impl Default for AgentsGlobal {
    fn default() -> Self {
        Self {
            frontend_address: default_frontend_address(),
            backend_address: default_backend_address(),
            settings_address: default_settings_address(),
            timecode_fps: default_timecode_fps(),
            ip_whitelist: Vec::new(),
            auth_verbose: false,
            dummy: false,
        }
    }
}

/// `sub_topic` may be absent, a bare string, or an array of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubTopic {
    One(String),
    Many(Vec<String>),
}

impl SubTopic {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            SubTopic::One(s) => vec![s],
            SubTopic::Many(v) => v,
        }
    }
}

/// A `[<name>]` per-agent section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AgentSection {
    pub pub_topic: Option<String>,
    pub sub_topic: Option<SubTopic>,
    pub time_step: Option<u64>,
    pub attachment: Option<String>,
    pub attachment_ext: Option<String>,
}

impl AgentSection {
    /// Effective publish topic: the section's `pub_topic`, defaulting to the
    /// agent's own name.
    pub fn pub_topic_or(&self, agent_name: &str) -> String {
        self.pub_topic.clone().unwrap_or_else(|| agent_name.to_string())
    }

    /// Effective subscribe topics: empty if absent.
    pub fn sub_topics(&self) -> Vec<String> {
        self.sub_topic
            .clone()
            .map(SubTopic::into_vec)
            .unwrap_or_default()
    }

    /// Effective attachment extension, defaulting to `plugin`.
    pub fn attachment_ext_or_default(&self) -> String {
        self.attachment_ext
            .clone()
            .unwrap_or_else(|| DEFAULT_ATTACHMENT_EXT.to_string())
    }
}

/// The full document: the fixed `[agents]` table plus every other named
/// table, each parsed lazily into an [`AgentSection`] by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MadsConfig {
    #[serde(default)]
    pub agents: AgentsGlobal,
    #[serde(flatten)]
    pub sections: HashMap<String, toml::Value>,
}

impl MadsConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: MadsConfig = toml::from_str(text)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(MadsError::TomlSerialize)
    }

    /// Look up and parse the named per-agent section. Missing section is a
    /// `ConfigError` quoting the agent's name.
    pub fn agent_section(&self, name: &str) -> Result<AgentSection> {
        let raw = self
            .sections
            .get(name)
            .ok_or_else(|| MadsError::Config(format!("missing agent section \"{name}\"")))?;
        raw.clone()
            .try_into()
            .map_err(|e: toml::de::Error| MadsError::Config(format!("agent \"{name}\": {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[agents]
frontend_address = "tcp://*:9090"
backend_address = "tcp://*:9091"
settings_address = "tcp://*:9092"
timecode_fps = 30

[echo]
pub_topic = "echo"
sub_topic = ["echo", "control"]
time_step = 100
"#;

    #[test]
    fn parses_global_and_named_sections() {
        let config = MadsConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.agents.timecode_fps, 30.0);
        let section = config.agent_section("echo").unwrap();
        assert_eq!(section.pub_topic_or("echo"), "echo");
        assert_eq!(section.sub_topics(), vec!["echo", "control"]);
        assert_eq!(section.time_step, Some(100));
    }

    #[test]
    fn missing_section_is_config_error_naming_the_agent() {
        let config = MadsConfig::from_toml_str(SAMPLE).unwrap();
        let err = config.agent_section("nonexistent").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nonexistent"));
    }

    #[test]
    fn sub_topic_absent_is_empty_subscription_list() {
        let config = MadsConfig::from_toml_str(
            r#"
[agents]
[solo]
pub_topic = "solo"
"#,
        )
        .unwrap();
        let section = config.agent_section("solo").unwrap();
        assert!(section.sub_topics().is_empty());
    }

    #[test]
    fn sub_topic_empty_string_means_subscribe_to_all() {
        let config = MadsConfig::from_toml_str(
            r#"
[agents]
[sink]
sub_topic = ""
"#,
        )
        .unwrap();
        let section = config.agent_section("sink").unwrap();
        assert_eq!(section.sub_topics(), vec![""]);
    }

    #[test]
    fn toml_json_toml_roundtrip_is_idempotent() {
        let config = MadsConfig::from_toml_str(SAMPLE).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        let back: MadsConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn defaults_apply_when_agents_table_is_minimal() {
        let config = MadsConfig::from_toml_str("[agents]\n").unwrap();
        assert_eq!(config.agents.frontend_address, "tcp://*:9090");
        assert_eq!(config.agents.timecode_fps, 25.0);
        assert!(!config.agents.auth_verbose);
    }
}
