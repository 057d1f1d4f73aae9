//! The settings service (C3): a REQ/REP endpoint serving the authoritative
//! TOML configuration text, a per-agent attachment, and the broker timecode.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mads_core::config::MadsConfig;
use mads_core::constants::{LIB_VERSION, SETTINGS_SERVICE_TIMEOUT_MS};
use mads_core::error::{MadsError, Result};
use mads_core::timecode::timecode_now;
use tokio::sync::RwLock;
use zeromq::prelude::*;
use zeromq::{RepSocket, ZmqMessage};

use crate::version::compatible;

/// Request frames recognized by the settings service.
enum Request {
    Settings { client_version: String, agent_name: String },
    Timecode { client_version: String },
    Unknown,
}

fn parse_request(msg: &ZmqMessage) -> Request {
    let frames: Vec<Vec<u8>> = msg.iter().map(|f| f.to_vec()).collect();
    match frames.len() {
        3 => {
            let client_version = String::from_utf8_lossy(&frames[0]).to_string();
            let verb = String::from_utf8_lossy(&frames[1]).to_string();
            let agent_name = String::from_utf8_lossy(&frames[2]).to_string();
            if verb == "settings" {
                Request::Settings { client_version, agent_name }
            } else {
                Request::Unknown
            }
        }
        2 => {
            let client_version = String::from_utf8_lossy(&frames[0]).to_string();
            let verb = String::from_utf8_lossy(&frames[1]).to_string();
            if verb == "timecode" {
                Request::Timecode { client_version }
            } else {
                Request::Unknown
            }
        }
        _ => Request::Unknown,
    }
}

pub struct SettingsService {
    config: Arc<RwLock<MadsConfig>>,
    /// Directory attachment paths are resolved against, when relative.
    install_dir: PathBuf,
    endpoint: String,
    timecode_fps: f64,
    running: Arc<AtomicBool>,
}

impl SettingsService {
    pub fn new(
        config: Arc<RwLock<MadsConfig>>,
        install_dir: PathBuf,
        endpoint: String,
        timecode_fps: f64,
    ) -> Self {
        Self {
            config,
            install_dir,
            endpoint,
            timecode_fps,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Loop with a 1-second receive timeout so the service can shut down
    /// cooperatively without a dedicated cancellation signal.
    pub async fn run(&self) -> Result<()> {
        let mut socket = RepSocket::new();
        socket.bind(&self.endpoint).await.map_err(MadsError::Zmq)?;
        tracing::info!(endpoint = %self.endpoint, "settings service bound");

        while self.running.load(Ordering::SeqCst) {
            let recv = tokio::time::timeout(
                Duration::from_millis(SETTINGS_SERVICE_TIMEOUT_MS),
                socket.recv(),
            )
            .await;

            let msg = match recv {
                Ok(Ok(msg)) => msg,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "settings recv error");
                    continue;
                }
                Err(_) => continue,
            };

            let reply = self.handle(&msg).await;
            if let Err(e) = socket.send(reply).await {
                tracing::warn!(error = %e, "settings send error");
            }
        }
        Ok(())
    }

    async fn handle(&self, msg: &ZmqMessage) -> ZmqMessage {
        match parse_request(msg) {
            Request::Settings { client_version, agent_name } => {
                if !compatible(&client_version, LIB_VERSION) {
                    tracing::warn!(
                        client_version,
                        broker_version = LIB_VERSION,
                        "refusing to serve configuration: version mismatch"
                    );
                    return vec![LIB_VERSION.as_bytes().to_vec()].into();
                }
                self.serve_settings(&agent_name).await
            }
            Request::Timecode { client_version } => {
                if !compatible(&client_version, LIB_VERSION) {
                    return vec![LIB_VERSION.as_bytes().to_vec()].into();
                }
                let tc = timecode_now(self.timecode_fps);
                vec![tc.to_string().into_bytes()].into()
            }
            Request::Unknown => vec![LIB_VERSION.as_bytes().to_vec()].into(),
        }
    }

    async fn serve_settings(&self, agent_name: &str) -> ZmqMessage {
        let config = self.config.read().await;
        let toml_text = match config.to_toml_string() {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize configuration");
                return vec![LIB_VERSION.as_bytes().to_vec()].into();
            }
        };

        let mut parts = vec![
            LIB_VERSION.as_bytes().to_vec(),
            toml_text.into_bytes(),
        ];

        if let Ok(section) = config.agent_section(agent_name) {
            if let Some(attachment) = &section.attachment {
                match self.read_attachment(attachment) {
                    Ok(bytes) => parts.push(bytes),
                    Err(e) => tracing::warn!(agent_name, error = %e, "failed to read attachment"),
                }
            }
        }

        parts.into()
    }

    fn read_attachment(&self, attachment: &str) -> Result<Vec<u8>> {
        let path = Path::new(attachment);
        let resolved = if path.is_relative() {
            self.install_dir.join(path)
        } else {
            path.to_path_buf()
        };
        std::fs::read(&resolved).map_err(MadsError::Io)
    }
}
