//! Settings-service client (§4.3, §4.5.1): the agent side of the REQ/REP
//! configuration and timecode exchange.

use mads_core::constants::LIB_VERSION;
use mads_core::error::{MadsError, Result};
use zeromq::prelude::*;
use zeromq::ReqSocket;

pub struct SettingsResponse {
    pub broker_version: String,
    pub toml_text: String,
    pub attachment: Option<Vec<u8>>,
}

/// Request the named agent's configuration from the settings service at
/// `settings_uri`. A version mismatch is reported by the broker as a
/// single-frame reply (just its own version); that is surfaced here as
/// [`MadsError::VersionMismatch`].
pub async fn fetch_settings(settings_uri: &str, agent_name: &str) -> Result<SettingsResponse> {
    let mut socket = ReqSocket::new();
    socket.connect(settings_uri).await.map_err(MadsError::Zmq)?;

    let request: zeromq::ZmqMessage = vec![
        LIB_VERSION.as_bytes().to_vec(),
        b"settings".to_vec(),
        agent_name.as_bytes().to_vec(),
    ]
    .into();
    socket.send(request).await.map_err(MadsError::Zmq)?;

    let reply = socket.recv().await.map_err(MadsError::Zmq)?;
    let frames: Vec<Vec<u8>> = reply.iter().map(|f| f.to_vec()).collect();

    match frames.len() {
        1 => Err(MadsError::VersionMismatch {
            client: LIB_VERSION.to_string(),
            broker: String::from_utf8_lossy(&frames[0]).to_string(),
        }),
        2 => Ok(SettingsResponse {
            broker_version: String::from_utf8_lossy(&frames[0]).to_string(),
            toml_text: String::from_utf8_lossy(&frames[1]).to_string(),
            attachment: None,
        }),
        3 => Ok(SettingsResponse {
            broker_version: String::from_utf8_lossy(&frames[0]).to_string(),
            toml_text: String::from_utf8_lossy(&frames[1]).to_string(),
            attachment: Some(frames[2].clone()),
        }),
        n => Err(MadsError::Transport(format!(
            "settings reply had {n} parts, expected 1, 2 or 3"
        ))),
    }
}

/// Request the broker's current timecode.
pub async fn fetch_timecode(settings_uri: &str) -> Result<f64> {
    let mut socket = ReqSocket::new();
    socket.connect(settings_uri).await.map_err(MadsError::Zmq)?;

    let request: zeromq::ZmqMessage =
        vec![LIB_VERSION.as_bytes().to_vec(), b"timecode".to_vec()].into();
    socket.send(request).await.map_err(MadsError::Zmq)?;

    let reply = socket.recv().await.map_err(MadsError::Zmq)?;
    let frames: Vec<Vec<u8>> = reply.iter().map(|f| f.to_vec()).collect();
    if frames.len() != 1 {
        return Err(MadsError::Transport(format!(
            "timecode reply had {} parts, expected 1",
            frames.len()
        )));
    }
    String::from_utf8_lossy(&frames[0])
        .parse::<f64>()
        .map_err(|e| MadsError::Payload(format!("malformed timecode reply: {e}")))
}
