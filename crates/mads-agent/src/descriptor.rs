//! The agent descriptor (§3): everything an agent knows about itself,
//! assembled during `init` and immutable after `connect`.

use std::path::PathBuf;

use mads_core::config::AgentSection;
use mads_core::constants::DEFAULT_RECEIVE_TIMEOUT_MS;

#[derive(Debug, Clone)]
pub struct AgentDescriptor {
    pub name: String,
    pub hostname: String,
    pub settings_uri: String,
    pub pub_endpoint: String,
    pub sub_endpoint: String,
    pub pub_topic: String,
    pub sub_topics: Vec<String>,
    pub time_step_ms: u64,
    /// The subscribe socket's receive timeout, in milliseconds (§4.5.2,
    /// default 500). Overridable by a plugin's `receive_timeout` param
    /// before `connect` (§4.6).
    pub receive_timeout_ms: u64,
    pub timecode_fps: f64,
    pub timecode_offset: f64,
    pub agent_id: Option<String>,
    pub attachment_path: Option<PathBuf>,
    pub crypto_enabled: bool,
    pub key_dir: PathBuf,
    pub client_key_name: String,
    pub server_key_name: String,
}

impl AgentDescriptor {
    /// Build the descriptor's topic/time-step fields from a parsed per-agent
    /// section, defaulting the publish topic to the agent's own name.
    pub fn apply_section(&mut self, section: &AgentSection) {
        self.pub_topic = section.pub_topic_or(&self.name);
        self.sub_topics = section.sub_topics();
        self.time_step_ms = section.time_step.unwrap_or(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_descriptor() -> AgentDescriptor {
        AgentDescriptor {
            name: "echo".into(),
            hostname: "localhost".into(),
            settings_uri: "tcp://127.0.0.1:9092".into(),
            pub_endpoint: "tcp://127.0.0.1:9090".into(),
            sub_endpoint: "tcp://127.0.0.1:9091".into(),
            pub_topic: String::new(),
            sub_topics: vec![],
            time_step_ms: 0,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            timecode_fps: 25.0,
            timecode_offset: 0.0,
            agent_id: None,
            attachment_path: None,
            crypto_enabled: false,
            key_dir: PathBuf::from("."),
            client_key_name: "echo".into(),
            server_key_name: "broker".into(),
        }
    }

    #[test]
    fn apply_section_defaults_pub_topic_to_agent_name() {
        let mut descriptor = base_descriptor();
        let section = AgentSection::default();
        descriptor.apply_section(&section);
        assert_eq!(descriptor.pub_topic, "echo");
        assert!(descriptor.sub_topics.is_empty());
        assert_eq!(descriptor.time_step_ms, 0);
    }
}
