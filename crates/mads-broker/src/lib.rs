//! The broker: settings service (C3) and forwarding proxy (C4).

pub mod config_watch;
pub mod proxy;
pub mod settings;
pub mod stats;
pub mod steering;
pub mod version;

pub use proxy::{EventProxy, ProxyEndpoints, ProxyMode};
pub use settings::SettingsService;
pub use stats::ProxyStats;
pub use steering::{TerminalAction, Verb};
