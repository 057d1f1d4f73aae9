//! Named constants carried over from the original agent runtime (`agent.hpp`),
//! not re-derived.

/// Grace shift applied to startup/shutdown timestamps and timecodes so a
/// slightly-late subscriber still observes the event before any data message.
pub const STARTUP_SHUTDOWN_DELAY_MS: u64 = 500;

/// Default receive timeout on an agent's subscribe socket.
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 500;

/// Default timecode frame rate when `[agents].timecode_fps` is absent.
pub const DEFAULT_TIMECODE_FPS: f64 = 25.0;

/// Default broker ports.
pub const DEFAULT_FRONTEND_PORT: u16 = 9090;
pub const DEFAULT_BACKEND_PORT: u16 = 9091;
pub const DEFAULT_SETTINGS_PORT: u16 = 9092;

/// Settings-service receive-timeout loop interval, to allow cooperative shutdown.
pub const SETTINGS_SERVICE_TIMEOUT_MS: u64 = 1000;

/// Default attachment extension when `attachment_ext` is absent.
pub const DEFAULT_ATTACHMENT_EXT: &str = "plugin";

/// The library/protocol version advertised in settings-service exchanges.
/// Compared by major.minor; a mismatch is a `VersionMismatch` error.
pub const LIB_VERSION: &str = env!("CARGO_PKG_VERSION");
