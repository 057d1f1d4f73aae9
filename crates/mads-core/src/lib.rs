//! Core data model and wire codec shared by the broker, the agent runtime,
//! and the plugin host: frame encoding (C1), configuration types (§3/§6),
//! the event and remote-control command model (§3), and the supporting
//! utilities (C7).

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod exepath;
pub mod iso8601;
pub mod net;
pub mod timecode;
pub mod topics;
pub mod wire;

pub use config::{AgentSection, AgentsGlobal, MadsConfig, SubTopic};
pub use error::{MadsError, Result};
pub use event::{Event, EventKind, RemoteCommand};
pub use wire::{decode, encode_blob, encode_json, Frame, Grace};
