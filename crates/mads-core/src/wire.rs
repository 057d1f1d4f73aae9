//! Wire codec & frame model (C1).
//!
//! Three frame shapes distinguished by part count: a one-part control frame
//! (steering sockets only), a two-part JSON data frame `(topic,
//! snappy-compressed JSON)`, and a three-part blob frame `(topic, JSON meta,
//! raw bytes)`. Topic filtering itself is a prefix match performed by the
//! transport's subscribe side, not by this module.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::{Map, Value};

use crate::constants::STARTUP_SHUTDOWN_DELAY_MS;
use crate::error::{MadsError, Result};
use crate::iso8601;
use crate::timecode;

/// A decoded frame, classified by its part count.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Single-part ASCII verb, used only on internal steering sockets.
    Control(String),
    /// Two-part JSON data frame.
    Json { topic: String, body: Value },
    /// Three-part blob frame: topic, JSON meta (must carry `format`), raw bytes.
    Blob {
        topic: String,
        meta: Value,
        bytes: Vec<u8>,
    },
}

/// Whether injected fields should be shifted backwards by the startup/shutdown
/// grace so late-connecting subscribers still observe the event in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grace {
    None,
    StartupOrShutdown,
}

/// Inject `hostname`, `timestamp.$date`, and `timecode` into a JSON body
/// unless it already supplies `timecode`. Mutates `body` in place; `body`
/// must be a JSON object (non-object bodies are wrapped is the caller's
/// concern, not this function's).
pub fn inject_fields(body: &mut Value, fps: f64, grace: Grace) -> Result<()> {
    let obj = body
        .as_object_mut()
        .ok_or_else(|| MadsError::Payload("JSON body must be an object".into()))?;

    if obj.contains_key("timecode") {
        return Ok(());
    }

    let mut now: DateTime<Utc> = Utc::now();
    if grace == Grace::StartupOrShutdown {
        now -= ChronoDuration::milliseconds(STARTUP_SHUTDOWN_DELAY_MS as i64);
    }

    let hostname = hostname();
    let tc = timecode::timecode_at(now, fps);

    obj.insert("hostname".to_string(), Value::String(hostname));

    let mut ts = Map::new();
    ts.insert(
        "$date".to_string(),
        Value::String(iso8601::format_millis(now)),
    );
    obj.insert("timestamp".to_string(), Value::Object(ts));

    obj.insert(
        "timecode".to_string(),
        serde_json::Number::from_f64(tc)
            .map(Value::Number)
            .unwrap_or(Value::Null),
    );

    Ok(())
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown-host".to_string())
}

/// Compress a JSON value with Snappy.
pub fn compress_json(value: &Value) -> Result<Vec<u8>> {
    let text = serde_json::to_vec(value)?;
    let mut encoder = snap::raw::Encoder::new();
    encoder.compress_vec(&text).map_err(MadsError::Snappy)
}

/// Decompress a Snappy-compressed buffer back into a JSON value.
pub fn decompress_json(bytes: &[u8]) -> Result<Value> {
    let mut decoder = snap::raw::Decoder::new();
    let raw = decoder.decompress_vec(bytes).map_err(MadsError::Snappy)?;
    serde_json::from_slice(&raw).map_err(MadsError::Json)
}

/// Encode a JSON data frame: topic plus Snappy-compressed, field-injected body.
pub fn encode_json(topic: &str, mut body: Value, fps: f64, grace: Grace) -> Result<Vec<Vec<u8>>> {
    if topic.is_empty() {
        return Err(MadsError::Payload("topic must be non-empty".into()));
    }
    inject_fields(&mut body, fps, grace)?;
    let compressed = compress_json(&body)?;
    Ok(vec![topic.as_bytes().to_vec(), compressed])
}

/// Encode a three-part blob frame. `meta` must carry a `format` key.
pub fn encode_blob(topic: &str, mut meta: Value, bytes: Vec<u8>) -> Result<Vec<Vec<u8>>> {
    if topic.is_empty() {
        return Err(MadsError::Payload("topic must be non-empty".into()));
    }
    let obj = meta
        .as_object_mut()
        .ok_or_else(|| MadsError::Payload("blob meta must be an object".into()))?;
    if !obj.contains_key("format") {
        return Err(MadsError::Payload("blob meta must carry `format`".into()));
    }
    let meta_bytes = serde_json::to_vec(&meta)?;
    Ok(vec![topic.as_bytes().to_vec(), meta_bytes, bytes])
}

/// Decode a raw multi-part frame. Zero/one parts or more than three parts is
/// a protocol error ([`MadsError::Transport`]); a JSON body that fails to
/// decompress or parse is [`MadsError::Payload`] and must be counted and
/// discarded by the caller, not treated as fatal.
pub fn decode(parts: &[Vec<u8>]) -> Result<Frame> {
    match parts.len() {
        1 => {
            let verb = String::from_utf8_lossy(&parts[0]).to_string();
            Ok(Frame::Control(verb))
        }
        0 => Err(MadsError::Transport("received a zero-part frame".into())),
        2 => {
            let topic = String::from_utf8_lossy(&parts[0]).to_string();
            let body = decompress_json(&parts[1])?;
            Ok(Frame::Json { topic, body })
        }
        3 => {
            let topic = String::from_utf8_lossy(&parts[0]).to_string();
            let meta: Value = serde_json::from_slice(&parts[1])?;
            Ok(Frame::Blob {
                topic,
                meta,
                bytes: parts[2].clone(),
            })
        }
        n => Err(MadsError::Transport(format!(
            "received a {n}-part frame, expected 1, 2 or 3"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snappy_roundtrip_is_identity() {
        let value = json!({"n": 1, "s": "hello"});
        let compressed = compress_json(&value).unwrap();
        let decompressed = decompress_json(&compressed).unwrap();
        assert_eq!(value, decompressed);
    }

    #[test]
    fn inject_fields_adds_hostname_timestamp_timecode() {
        let mut body = json!({"n": 1});
        inject_fields(&mut body, 25.0, Grace::None).unwrap();
        let obj = body.as_object().unwrap();
        assert!(obj.contains_key("hostname"));
        assert!(obj.contains_key("timestamp"));
        assert!(obj.contains_key("timecode"));
        assert_eq!(obj["n"], json!(1));
    }

    #[test]
    fn inject_fields_skips_when_timecode_present() {
        let mut body = json!({"timecode": 42.0});
        inject_fields(&mut body, 25.0, Grace::None).unwrap();
        assert!(!body.as_object().unwrap().contains_key("hostname"));
    }

    #[test]
    fn encode_json_then_decode_roundtrips() {
        let parts = encode_json("echo", json!({"n": 1}), 25.0, Grace::None).unwrap();
        let frame = decode(&parts).unwrap();
        match frame {
            Frame::Json { topic, body } => {
                assert_eq!(topic, "echo");
                assert_eq!(body["n"], json!(1));
            }
            _ => panic!("expected Json frame"),
        }
    }

    #[test]
    fn encode_blob_requires_format() {
        let result = encode_blob("blobs", json!({"no_format": true}), vec![1, 2, 3]);
        assert!(result.is_err());
    }

    #[test]
    fn decode_rejects_zero_part_frame() {
        assert!(matches!(decode(&[]), Err(MadsError::Transport(_))));
    }

    #[test]
    fn decode_rejects_four_part_frame() {
        let parts = vec![vec![1], vec![2], vec![3], vec![4]];
        assert!(matches!(decode(&parts), Err(MadsError::Transport(_))));
    }

    #[test]
    fn decode_single_part_is_control() {
        let frame = decode(&[b"PAUSE".to_vec()]).unwrap();
        assert_eq!(frame, Frame::Control("PAUSE".to_string()));
    }

    #[test]
    fn decode_malformed_json_payload_is_payload_error_not_transport() {
        let parts = vec![b"topic".to_vec(), b"not snappy data".to_vec()];
        assert!(matches!(decode(&parts), Err(MadsError::Snappy(_))));
    }
}
