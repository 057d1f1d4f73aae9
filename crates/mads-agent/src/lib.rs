//! The agent runtime (C5): settings bootstrap, the pub/sub lifecycle state
//! machine, event registration, and remote control.

pub mod client;
pub mod descriptor;
pub mod lifecycle;
pub mod running;

pub use client::{fetch_settings, fetch_timecode, SettingsResponse};
pub use descriptor::AgentDescriptor;
pub use lifecycle::{Agent, Received};
pub use running::{RestartFlag, RunningFlag};
