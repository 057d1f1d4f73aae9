//! A consumer plugin that logs each received body via `tracing`. Recognizes
//! two sentinel fields so the dispatch table's non-`Success` paths can be
//! exercised without a second artifact: `{"stop": true}` returns `Critical`,
//! a non-object body returns `Error`.

use mads_plugin::{ConsumerPlugin, MadsPlugin, PluginKind, PluginParams, ReturnCode};
use serde_json::Value;

#[derive(Default)]
struct LoggerConsumer {
    prefix: String,
    received: u64,
    last_error: Option<String>,
}

impl MadsPlugin for LoggerConsumer {
    fn set_params(&mut self, params: &PluginParams) -> ReturnCode {
        self.prefix = params.get_str("prefix").unwrap_or("consumer-logger").to_string();
        ReturnCode::Success
    }

    fn info(&self) -> Value {
        serde_json::json!({ "plugin": "consumer-logger", "received": self.received })
    }

    fn kind(&self) -> PluginKind {
        PluginKind::Consumer
    }

    fn error(&self) -> Option<String> {
        self.last_error.clone()
    }
}

impl ConsumerPlugin for LoggerConsumer {
    fn load_data(&mut self, input: &Value, topic: &str) -> ReturnCode {
        self.received += 1;
        if !input.is_object() {
            self.last_error = Some("expected a JSON object".to_string());
            return ReturnCode::Error;
        }
        if input.get("stop").and_then(Value::as_bool).unwrap_or(false) {
            tracing::info!(prefix = %self.prefix, topic, "stop sentinel received");
            return ReturnCode::Critical;
        }
        self.last_error = None;
        tracing::info!(prefix = %self.prefix, topic, body = %input, "received");
        ReturnCode::Success
    }
}

#[no_mangle]
pub fn mads_plugin_consumer() -> *mut dyn ConsumerPlugin {
    Box::into_raw(Box::new(LoggerConsumer::default()))
}
