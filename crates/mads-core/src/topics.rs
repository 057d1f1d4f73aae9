//! Reserved topic names, following the constant-table convention used for
//! `eisenbahn`'s domain topics.

/// Lifecycle events (startup, shutdown, marker, marker-in, marker-out, message).
pub const METADATA: &str = "metadata";

/// Remote-control commands dispatched to a subscribing agent.
pub const CONTROL: &str = "control";

/// Paused/running hint published by the (out-of-scope) logger.
pub const LOGGER_STATUS: &str = "logger_status";

/// On-demand settings echo, published in response to the `info` remote command.
pub const INFO: &str = "info";
