//! The plugin ABI (C6): one role trait per producer/transformer/consumer,
//! sharing a common capability set, and the five-valued return code that
//! drives the host's dispatch policy.

use serde_json::Value;

/// Role classifier, mirrored from a plugin's `kind()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    Producer,
    Transformer,
    Consumer,
}

/// A plugin's outcome for one call. Ordered loosely by severity; the host
/// dispatch table (see [`dispatch`]) only cares about the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    Success = 0,
    Warning = 1,
    Retry = 2,
    Error = 3,
    Critical = 4,
}

impl ReturnCode {
    pub fn from_raw(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::Warning),
            2 => Some(Self::Retry),
            3 => Some(Self::Error),
            4 => Some(Self::Critical),
            _ => None,
        }
    }
}

/// What the agent loop should do in response to a [`ReturnCode`] (§4.6's
/// table, collapsed to its three distinct control-flow effects; the
/// difference between `Retry` and `Error` — whether the iteration is
/// counted and an `{error: ...}` object is published — is a per-role
/// publishing decision the host makes directly, not a loop-control one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    /// Publish this iteration's output normally.
    Continue,
    /// Drop this iteration's output, but keep looping.
    SkipIteration,
    /// Clear the running flag; this iteration is the plugin's last.
    Stop,
}

/// The per-role dispatch table (§4.6): `Success` and `Warning` both publish
/// (`Warning` additionally merges a warning field and logs); `Retry` and
/// `Error` both skip the iteration's output (`Error` additionally counts
/// and publishes an error object); `Critical` is the only code that stops
/// the loop, after a marker event.
pub fn dispatch(code: ReturnCode) -> DispatchAction {
    match code {
        ReturnCode::Success | ReturnCode::Warning => DispatchAction::Continue,
        ReturnCode::Retry | ReturnCode::Error => DispatchAction::SkipIteration,
        ReturnCode::Critical => DispatchAction::Stop,
    }
}

/// An opaque binary payload a producer or transformer may emit alongside
/// its JSON output, carrying the MIME-like `format` tag a blob frame's meta
/// part requires (§4.1).
#[derive(Debug, Clone, PartialEq)]
pub struct PluginBlob {
    pub format: String,
    pub bytes: Vec<u8>,
}

/// Capabilities shared by every plugin role.
pub trait MadsPlugin: Send {
    /// Apply parameter overrides (from the agent's settings section and any
    /// CLI `option key=value` pairs). Called once before the first role call.
    fn set_params(&mut self, params: &crate::params::PluginParams) -> ReturnCode;

    /// A JSON description of the plugin, published on request (e.g. the
    /// remote-control `info` command).
    fn info(&self) -> Value;

    fn kind(&self) -> PluginKind;

    /// The last error message, if the most recent call returned anything
    /// other than `Success`.
    fn error(&self) -> Option<String>;
}

/// Produces output with no input: the source end of a pipeline.
pub trait ProducerPlugin: MadsPlugin {
    fn get_output(&mut self) -> (ReturnCode, Option<Value>, Option<PluginBlob>);
}

/// Consumes one input and (optionally) produces one output.
pub trait TransformerPlugin: MadsPlugin {
    fn load_data(&mut self, input: &Value, topic: &str) -> ReturnCode;
    fn process(&mut self) -> (ReturnCode, Option<Value>);
}

/// Consumes input with no output: the sink end of a pipeline.
pub trait ConsumerPlugin: MadsPlugin {
    fn load_data(&mut self, input: &Value, topic: &str) -> ReturnCode;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_and_warning_both_continue() {
        assert_eq!(dispatch(ReturnCode::Success), DispatchAction::Continue);
        assert_eq!(dispatch(ReturnCode::Warning), DispatchAction::Continue);
    }

    #[test]
    fn retry_and_error_both_skip_the_iteration() {
        assert_eq!(dispatch(ReturnCode::Retry), DispatchAction::SkipIteration);
        assert_eq!(dispatch(ReturnCode::Error), DispatchAction::SkipIteration);
    }

    #[test]
    fn only_critical_stops() {
        assert_eq!(dispatch(ReturnCode::Critical), DispatchAction::Stop);
        assert_ne!(dispatch(ReturnCode::Error), DispatchAction::Stop);
        assert_ne!(dispatch(ReturnCode::Retry), DispatchAction::Stop);
    }

    #[test]
    fn from_raw_rejects_out_of_range_codes() {
        assert_eq!(ReturnCode::from_raw(5), None);
        assert_eq!(ReturnCode::from_raw(0), Some(ReturnCode::Success));
    }
}
