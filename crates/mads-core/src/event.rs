//! Event and remote-control command data model (§3).

use serde::{Deserialize, Serialize};

/// Event kind classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Startup,
    Shutdown,
    Marker,
    MarkerIn,
    MarkerOut,
    Message,
}

/// Published on the `metadata` topic at lifecycle transitions and markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub name: String,
    pub lib_version: String,
    pub event_name: String,
    pub timecode_offset: f64,
    pub settings_path: String,
    /// Compact snapshot of the agent's settings, for downstream loggers.
    pub settings_snapshot: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
}

/// Remote-control command received on the `control` topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum RemoteCommand {
    Shutdown,
    Restart,
    Info,
}
