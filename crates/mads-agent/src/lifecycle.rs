//! The agent runtime lifecycle state machine (C5, §4.5): init, connect,
//! event registration, receive, cooperative loop, remote control, disconnect.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mads_core::constants::{
    DEFAULT_RECEIVE_TIMEOUT_MS, LIB_VERSION, STARTUP_SHUTDOWN_DELAY_MS,
};
use mads_core::config::MadsConfig;
use mads_core::error::{MadsError, Result};
use mads_core::event::{Event, EventKind, RemoteCommand};
use mads_core::net::rewrite_host;
use mads_core::timecode::TimecodeOffset;
use mads_core::topics::{CONTROL, INFO, METADATA};
use mads_core::wire::{self, Frame, Grace};
use mads_crypto::{GroupKey, LinkCipher};
use serde_json::Value;
use tokio::sync::RwLock;
use zeromq::prelude::*;
use zeromq::{PubSocket, SubSocket};

use crate::client::fetch_settings;
use crate::descriptor::AgentDescriptor;
use crate::running::{RestartFlag, RunningFlag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Created,
    Initialized,
    Connected,
    Disconnected,
}

/// What a single [`Agent::receive`] call classified the frame as.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    None,
    Json { topic: String, body: Value },
    Blob { topic: String, format: Value, bytes: Vec<u8> },
}

pub struct Agent {
    pub descriptor: AgentDescriptor,
    state: LifecycleState,
    pub running: RunningFlag,
    pub restart: RestartFlag,
    remote_control_enabled: bool,
    pub_socket: Option<PubSocket>,
    sub_socket: Option<SubSocket>,
    /// The data-plane group cipher, installed by [`Agent::install_crypto`]
    /// when `descriptor.crypto_enabled` is set.
    data_cipher: Option<LinkCipher>,
    /// Topic -> last received JSON body.
    status: Arc<RwLock<HashMap<String, Value>>>,
    settings_path: String,
    settings_snapshot: Value,
}

impl Agent {
    /// Bootstrap an agent: resolve the settings source (local path or remote
    /// settings-service URI), parse configuration, derive endpoints, and
    /// fetch an initial timecode offset. Runs at most once per descriptor.
    pub async fn init(name: &str, settings_location: &str) -> Result<Self> {
        let (config, settings_path, remote_host, broker_tc, attachment_bytes) =
            if settings_location.contains("://") {
                let response = fetch_settings(settings_location, name).await?;
                let config = MadsConfig::from_toml_str(&response.toml_text)?;
                let broker_tc = crate::client::fetch_timecode(settings_location).await.ok();
                let host = mads_core::net::split_url(settings_location)?.host;
                (config, settings_location.to_string(), Some(host), broker_tc, response.attachment)
            } else {
                let text = std::fs::read_to_string(settings_location).map_err(MadsError::Io)?;
                let config = MadsConfig::from_toml_str(&text)?;
                (config, settings_location.to_string(), None, None, None)
            };

        let section = config.agent_section(name)?;

        let attachment_path = match attachment_bytes {
            Some(bytes) => Some(write_attachment(name, &section.attachment_ext_or_default(), &bytes)?),
            None => None,
        };

        let mut pub_endpoint = config.agents.backend_address.clone();
        let mut sub_endpoint = config.agents.frontend_address.clone();
        if let Some(host) = &remote_host {
            pub_endpoint = rewrite_host(&pub_endpoint, host)?;
            sub_endpoint = rewrite_host(&sub_endpoint, host)?;
        }

        let local_tc = mads_core::timecode::timecode_now(config.agents.timecode_fps);
        let offset = match broker_tc {
            Some(tc) => TimecodeOffset::compute(tc, local_tc),
            None => TimecodeOffset::default(),
        };

        let mut descriptor = AgentDescriptor {
            name: name.to_string(),
            hostname: std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown-host".to_string()),
            settings_uri: settings_location.to_string(),
            pub_endpoint,
            sub_endpoint,
            pub_topic: String::new(),
            sub_topics: Vec::new(),
            time_step_ms: 0,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            timecode_fps: config.agents.timecode_fps,
            timecode_offset: offset.0,
            agent_id: None,
            attachment_path,
            crypto_enabled: false,
            key_dir: PathBuf::from("."),
            client_key_name: name.to_string(),
            server_key_name: "broker".to_string(),
        };
        descriptor.apply_section(&section);

        let settings_snapshot = serde_json::json!({
            "pub_topic": descriptor.pub_topic,
            "sub_topics": descriptor.sub_topics,
            "time_step_ms": descriptor.time_step_ms,
        });

        Ok(Self {
            descriptor,
            state: LifecycleState::Initialized,
            running: RunningFlag::new(),
            restart: RestartFlag::new(),
            remote_control_enabled: false,
            pub_socket: None,
            sub_socket: None,
            data_cipher: None,
            status: Arc::new(RwLock::new(HashMap::new())),
            settings_path,
            settings_snapshot,
        })
    }

    /// Load the data-plane [`GroupKey`] and install the cipher used to seal
    /// and open every publish/receive. A no-op when `crypto_enabled` is
    /// false. Idempotent; safe to call from `connect` on every invocation.
    pub fn install_crypto(&mut self) -> Result<()> {
        if !self.descriptor.crypto_enabled || self.data_cipher.is_some() {
            return Ok(());
        }
        let group = GroupKey::load_from(&self.descriptor.key_dir, &self.descriptor.server_key_name)
            .map_err(MadsError::from)?;
        self.data_cipher = Some(LinkCipher::from_raw_key(&group.0));
        Ok(())
    }

    /// Append the `control` topic to subscriptions. Legal only before
    /// `connect` (§3 invariant).
    pub fn enable_remote_control(&mut self, _threaded: bool) -> Result<()> {
        if self.state != LifecycleState::Initialized {
            return Err(MadsError::Lifecycle(
                "enable_remote_control is only legal before connect".into(),
            ));
        }
        self.remote_control_enabled = true;
        if !self.descriptor.sub_topics.contains(&CONTROL.to_string()) {
            self.descriptor.sub_topics.push(CONTROL.to_string());
        }
        Ok(())
    }

    /// Bind/connect the publish and subscribe sockets. Idempotent.
    pub async fn connect(&mut self, delay: Duration) -> Result<()> {
        if self.state == LifecycleState::Connected {
            return Ok(());
        }
        if self.state == LifecycleState::Disconnected {
            return Err(MadsError::Lifecycle("cannot connect a disconnected agent".into()));
        }

        self.install_crypto()?;

        if !self.descriptor.pub_topic.is_empty() {
            let mut socket = PubSocket::new();
            socket
                .connect(&self.descriptor.pub_endpoint)
                .await
                .map_err(MadsError::Zmq)?;
            self.pub_socket = Some(socket);
        }

        if !self.descriptor.sub_topics.is_empty() {
            let mut socket = SubSocket::new();
            socket
                .connect(&self.descriptor.sub_endpoint)
                .await
                .map_err(MadsError::Zmq)?;
            for topic in &self.descriptor.sub_topics {
                socket.subscribe(topic).await.map_err(MadsError::Zmq)?;
            }
            self.sub_socket = Some(socket);
        }

        self.state = LifecycleState::Connected;

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        Ok(())
    }

    /// Publish a JSON body on the agent's publish topic, with field
    /// injection and the agent's timecode offset applied.
    pub async fn publish(&mut self, mut body: Value, grace: Grace) -> Result<()> {
        let socket = self
            .pub_socket
            .as_mut()
            .ok_or_else(|| MadsError::Lifecycle("publish before connect".into()))?;

        wire::inject_fields(&mut body, self.descriptor.timecode_fps, grace)?;
        if let Some(obj) = body.as_object_mut() {
            if let Some(tc) = obj.get("timecode").and_then(|v| v.as_f64()) {
                obj.insert(
                    "timecode".to_string(),
                    serde_json::Number::from_f64(tc + self.descriptor.timecode_offset)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                );
            }
        }
        let mut compressed = wire::compress_json(&body)?;
        if let Some(cipher) = &self.data_cipher {
            compressed = cipher.seal(&compressed).map_err(MadsError::from)?;
        }
        let parts: zeromq::ZmqMessage =
            vec![self.descriptor.pub_topic.as_bytes().to_vec(), compressed].into();
        socket.send(parts).await.map_err(MadsError::Zmq)?;
        Ok(())
    }

    /// Publish a blob frame (topic, JSON meta carrying `format`, raw bytes)
    /// on the agent's publish topic. The raw bytes are sealed under the
    /// group cipher when crypto is enabled; the meta part is always plain,
    /// since a subscriber must be able to inspect `format` before deciding
    /// whether it can decode the payload at all.
    pub async fn publish_blob(&mut self, meta: Value, mut bytes: Vec<u8>) -> Result<()> {
        let socket = self
            .pub_socket
            .as_mut()
            .ok_or_else(|| MadsError::Lifecycle("publish before connect".into()))?;
        if let Some(cipher) = &self.data_cipher {
            bytes = cipher.seal(&bytes).map_err(MadsError::from)?;
        }
        let parts = wire::encode_blob(&self.descriptor.pub_topic, meta, bytes)?;
        let message: zeromq::ZmqMessage = parts.into();
        socket.send(message).await.map_err(MadsError::Zmq)
    }

    /// A single bounded-wait receive. Classifies the frame by part count;
    /// dispatches `control`-topic JSON to the remote-control handler when
    /// enabled, rather than returning it to the caller.
    pub async fn receive(&mut self, non_blocking: bool) -> Result<Received> {
        let socket = self
            .sub_socket
            .as_mut()
            .ok_or_else(|| MadsError::Lifecycle("receive before connect".into()))?;

        let timeout = if non_blocking {
            Duration::from_millis(0)
        } else {
            Duration::from_millis(self.descriptor.receive_timeout_ms)
        };

        let msg = match tokio::time::timeout(timeout.max(Duration::from_millis(1)), socket.recv()).await {
            Ok(Ok(msg)) => msg,
            Ok(Err(e)) => return Err(MadsError::Transport(e.to_string())),
            Err(_) => return Ok(Received::None),
        };

        let mut parts: Vec<Vec<u8>> = msg.iter().map(|f| f.to_vec()).collect();
        if let Some(cipher) = &self.data_cipher {
            match parts.len() {
                2 => parts[1] = cipher.open(&parts[1]).map_err(MadsError::from)?,
                3 => parts[2] = cipher.open(&parts[2]).map_err(MadsError::from)?,
                _ => {}
            }
        }
        let frame = wire::decode(&parts)?;

        match frame {
            Frame::Control(_) => Ok(Received::None),
            Frame::Json { topic, body } => {
                if self.remote_control_enabled && topic == CONTROL {
                    self.dispatch_control(&body).await;
                    return Ok(Received::None);
                }
                self.status.write().await.insert(topic.clone(), body.clone());
                Ok(Received::Json { topic, body })
            }
            Frame::Blob { topic, meta, bytes } => {
                let format = meta.get("format").cloned().unwrap_or(Value::Null);
                Ok(Received::Blob { topic, format, bytes })
            }
        }
    }

    async fn dispatch_control(&mut self, body: &Value) {
        let command: std::result::Result<RemoteCommand, _> = serde_json::from_value(body.clone());
        match command {
            Ok(RemoteCommand::Shutdown) => self.running.stop(),
            Ok(RemoteCommand::Restart) => {
                self.restart.set();
                self.running.stop();
            }
            Ok(RemoteCommand::Info) => {
                let snapshot = self.settings_snapshot.clone();
                if let Err(e) = self.publish_on(INFO, snapshot, Grace::None).await {
                    tracing::warn!(error = %e, "failed to publish info snapshot");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "malformed remote control command, ignoring");
            }
        }
    }

    async fn publish_on(&mut self, topic: &str, mut body: Value, grace: Grace) -> Result<()> {
        let socket = self
            .pub_socket
            .as_mut()
            .ok_or_else(|| MadsError::Lifecycle("publish before connect".into()))?;
        wire::inject_fields(&mut body, self.descriptor.timecode_fps, grace)?;
        let mut compressed = wire::compress_json(&body)?;
        if let Some(cipher) = &self.data_cipher {
            compressed = cipher.seal(&compressed).map_err(MadsError::from)?;
        }
        let parts: zeromq::ZmqMessage = vec![topic.as_bytes().to_vec(), compressed].into();
        socket.send(parts).await.map_err(MadsError::Zmq)
    }

    fn event_payload(&self, kind: EventKind, event_name: &str, info: Option<Value>) -> Value {
        let event = Event {
            kind,
            name: self.descriptor.name.clone(),
            lib_version: LIB_VERSION.to_string(),
            event_name: event_name.to_string(),
            timecode_offset: self.descriptor.timecode_offset,
            settings_path: self.settings_path.clone(),
            settings_snapshot: self.settings_snapshot.clone(),
            info,
        };
        serde_json::to_value(event).unwrap_or(Value::Null)
    }

    /// Publish a startup event, detached, after the 500 ms grace (§4.5.3).
    pub fn register_startup(self_arc: Arc<RwLock<Agent>>) {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(STARTUP_SHUTDOWN_DELAY_MS)).await;
            let mut agent = self_arc.write().await;
            let payload = agent.event_payload(EventKind::Startup, "startup", None);
            if let Err(e) = agent.publish_on(METADATA, payload, Grace::StartupOrShutdown).await {
                tracing::warn!(error = %e, "failed to publish startup event");
            }
        });
    }

    /// Publish the shutdown event synchronously so the transport can flush
    /// before the process exits (§4.5.3, Design Notes: detached vs. joined).
    pub async fn register_shutdown(&mut self) -> Result<()> {
        let payload = self.event_payload(EventKind::Shutdown, "shutdown", None);
        self.publish_on(METADATA, payload, Grace::StartupOrShutdown).await
    }

    /// Publish a marker event immediately, detached.
    pub fn register_marker(self_arc: Arc<RwLock<Agent>>, info: Option<Value>) {
        tokio::spawn(async move {
            let mut agent = self_arc.write().await;
            let payload = agent.event_payload(EventKind::Marker, "marker", info);
            if let Err(e) = agent.publish_on(METADATA, payload, Grace::None).await {
                tracing::warn!(error = %e, "failed to publish marker event");
            }
        });
    }

    /// Idempotent disconnect; tolerant of already-closed sockets.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state == LifecycleState::Disconnected {
            return Ok(());
        }
        self.pub_socket = None;
        self.sub_socket = None;
        self.state = LifecycleState::Disconnected;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.state == LifecycleState::Connected
    }

    /// Run `on_tick` once per `period_ms`, stopping once [`RunningFlag`]
    /// clears (§4.5.5: "a spawn-sleep-and-join cycle driven by the process
    /// running flag, not a free-running loop the caller must interrupt
    /// externally"). A tick that errors is logged and does not stop the
    /// loop; only `Critical` plugin outcomes or a remote `shutdown`/
    /// `restart` command do that, by clearing the running flag directly.
    pub async fn run_cooperative<F, Fut>(
        self_arc: Arc<RwLock<Agent>>,
        period_ms: u64,
        mut on_tick: F,
    ) where
        F: FnMut(Arc<RwLock<Agent>>) -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        let mut ticker = tokio::time::interval(Duration::from_millis(period_ms.max(1)));
        loop {
            let running = self_arc.read().await.running.is_running();
            if !running {
                break;
            }
            ticker.tick().await;
            if let Err(e) = on_tick(self_arc.clone()).await {
                tracing::warn!(error = %e, "cooperative loop tick failed");
            }
        }
    }
}

/// Write a delivered attachment to `<tmp>/mads/<name>.<ext>`, creating the
/// directory if needed, and return its path.
fn write_attachment(name: &str, ext: &str, bytes: &[u8]) -> Result<PathBuf> {
    let dir = std::env::temp_dir().join("mads");
    std::fs::create_dir_all(&dir).map_err(MadsError::Io)?;
    let path = dir.join(format!("{name}.{ext}"));
    std::fs::write(&path, bytes).map_err(MadsError::Io)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_descriptor() -> AgentDescriptor {
        AgentDescriptor {
            name: "echo".into(),
            hostname: "localhost".into(),
            settings_uri: "local.toml".into(),
            pub_endpoint: "tcp://127.0.0.1:9091".into(),
            sub_endpoint: "tcp://127.0.0.1:9090".into(),
            pub_topic: "echo".into(),
            sub_topics: vec![],
            time_step_ms: 0,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            timecode_fps: 25.0,
            timecode_offset: 0.0,
            agent_id: None,
            attachment_path: None,
            crypto_enabled: false,
            key_dir: PathBuf::from("."),
            client_key_name: "echo".into(),
            server_key_name: "broker".into(),
        }
    }

    fn test_agent() -> Agent {
        Agent {
            descriptor: test_descriptor(),
            state: LifecycleState::Initialized,
            running: RunningFlag::new(),
            restart: RestartFlag::new(),
            remote_control_enabled: false,
            pub_socket: None,
            sub_socket: None,
            data_cipher: None,
            status: Arc::new(RwLock::new(HashMap::new())),
            settings_path: "local.toml".into(),
            settings_snapshot: Value::Null,
        }
    }

    #[test]
    fn enable_remote_control_appends_control_topic() {
        let mut agent = test_agent();
        agent.enable_remote_control(false).unwrap();
        assert!(agent.descriptor.sub_topics.contains(&CONTROL.to_string()));
    }

    #[tokio::test]
    async fn enable_remote_control_after_connect_is_lifecycle_error() {
        let mut agent = test_agent();
        agent.state = LifecycleState::Connected;
        let result = agent.enable_remote_control(false);
        assert!(matches!(result, Err(MadsError::Lifecycle(_))));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let mut agent = test_agent();
        agent.disconnect().await.unwrap();
        agent.disconnect().await.unwrap();
        assert!(!agent.is_connected());
    }

    #[tokio::test]
    async fn receive_before_connect_is_lifecycle_error() {
        let mut agent = test_agent();
        let result = agent.receive(true).await;
        assert!(matches!(result, Err(MadsError::Lifecycle(_))));
    }

    #[tokio::test]
    async fn dispatch_control_shutdown_stops_running_flag() {
        let mut agent = test_agent();
        agent.remote_control_enabled = true;
        agent.dispatch_control(&serde_json::json!({"cmd": "shutdown"})).await;
        assert!(!agent.running.is_running());
    }

    #[tokio::test]
    async fn dispatch_control_restart_sets_restart_and_stops_running() {
        let mut agent = test_agent();
        agent.remote_control_enabled = true;
        agent.dispatch_control(&serde_json::json!({"cmd": "restart"})).await;
        assert!(agent.restart.is_set());
        assert!(!agent.running.is_running());
    }

    #[tokio::test]
    async fn dispatch_control_unknown_command_is_ignored() {
        let mut agent = test_agent();
        agent.remote_control_enabled = true;
        agent.dispatch_control(&serde_json::json!({"cmd": "frobnicate"})).await;
        assert!(agent.running.is_running());
    }

    #[test]
    fn install_crypto_is_a_noop_when_disabled() {
        let mut agent = test_agent();
        agent.install_crypto().unwrap();
        assert!(agent.data_cipher.is_none());
    }

    #[test]
    fn install_crypto_loads_group_key_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        mads_crypto::GroupKey::generate_to(dir.path(), "broker", false).unwrap();

        let mut agent = test_agent();
        agent.descriptor.crypto_enabled = true;
        agent.descriptor.key_dir = dir.path().to_path_buf();
        agent.descriptor.server_key_name = "broker".into();

        agent.install_crypto().unwrap();
        assert!(agent.data_cipher.is_some());
    }

    #[test]
    fn install_crypto_missing_group_key_is_credential_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = test_agent();
        agent.descriptor.crypto_enabled = true;
        agent.descriptor.key_dir = dir.path().to_path_buf();

        let result = agent.install_crypto();
        assert!(matches!(result, Err(MadsError::Credential(_))));
    }

    #[test]
    fn write_attachment_creates_file_under_tmp_mads() {
        let path = write_attachment("test-agent-attachment", "plugin", b"payload").unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn run_cooperative_stops_when_running_flag_clears() {
        let agent = test_agent();
        let running = agent.running.clone();
        let self_arc = Arc::new(RwLock::new(agent));
        let ticks = Arc::new(std::sync::atomic::AtomicU32::new(0));

        let loop_ticks = ticks.clone();
        let loop_running = running.clone();
        let handle = tokio::spawn(async move {
            Agent::run_cooperative(self_arc, 10, move |_agent| {
                let ticks = loop_ticks.clone();
                let running = loop_running.clone();
                async move {
                    let n = ticks.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                    if n >= 3 {
                        running.stop();
                    }
                    Ok(())
                }
            })
            .await;
        });

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("cooperative loop should stop once the running flag clears")
            .unwrap();
        assert!(ticks.load(std::sync::atomic::Ordering::SeqCst) >= 3);
    }
}
