//! A transformer plugin that forwards its input unchanged, optionally
//! stamping a `tag` field. Exercises the load/process two-call shape rather
//! than doing any real transformation.

use mads_plugin::{MadsPlugin, PluginKind, PluginParams, ReturnCode, TransformerPlugin};
use serde_json::Value;

#[derive(Default)]
struct PassthroughTransformer {
    tag: Option<String>,
    pending: Option<Value>,
    processed: u64,
}

impl MadsPlugin for PassthroughTransformer {
    fn set_params(&mut self, params: &PluginParams) -> ReturnCode {
        self.tag = params.get_str("tag").map(str::to_string);
        ReturnCode::Success
    }

    fn info(&self) -> Value {
        serde_json::json!({ "plugin": "transformer-passthrough", "processed": self.processed })
    }

    fn kind(&self) -> PluginKind {
        PluginKind::Transformer
    }

    fn error(&self) -> Option<String> {
        None
    }
}

impl TransformerPlugin for PassthroughTransformer {
    fn load_data(&mut self, input: &Value, _topic: &str) -> ReturnCode {
        self.pending = Some(input.clone());
        ReturnCode::Success
    }

    fn process(&mut self) -> (ReturnCode, Option<Value>) {
        let Some(mut body) = self.pending.take() else {
            return (ReturnCode::Retry, None);
        };
        if let (Some(tag), Some(obj)) = (&self.tag, body.as_object_mut()) {
            obj.insert("tag".to_string(), Value::String(tag.clone()));
        }
        self.processed += 1;
        (ReturnCode::Success, Some(body))
    }
}

#[no_mangle]
pub fn mads_plugin_transformer() -> *mut dyn TransformerPlugin {
    Box::into_raw(Box::new(PassthroughTransformer::default()))
}
