//! The role-parameterized plugin driver (§4.6): one cooperative-loop tick
//! per role, applying the return-code dispatch table to an [`Agent`].
//!
//! Grounded on `eisenbahn::worker::WorkerRunner::run`'s pattern of a single
//! driver owning the long-running loop and delegating the actual work to a
//! caller-supplied trait object — here the trait object is a loaded plugin
//! rather than a `Worker`, and the loop itself is `mads_agent::Agent::run_cooperative`.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mads_agent::{Agent, Received};
use mads_core::error::{MadsError, Result};
use mads_core::topics::METADATA;
use mads_core::wire::Grace;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::loader::{load_consumer, load_producer, load_transformer, LoadedConsumer, LoadedProducer, LoadedTransformer};
use crate::params::PluginParams;
use crate::traits::{dispatch, DispatchAction, PluginBlob, ReturnCode};

/// Which role a loaded artifact plays, owning the wrapper that keeps its
/// `Library` alive for as long as the boxed trait object.
pub enum LoadedRole {
    Producer(LoadedProducer),
    /// `dont_block`: advance the loop even when no fresh input arrived this
    /// tick, rather than waiting out the full receive timeout (§4.6).
    Transformer(LoadedTransformer, bool),
    Consumer(LoadedConsumer),
}

impl LoadedRole {
    /// # Safety
    /// See [`crate::loader::load_producer`] et al.; `path` must export the
    /// factory symbol matching the requested role.
    pub unsafe fn load(role: &str, path: &Path, dont_block: bool) -> Result<Self> {
        match role {
            "producer" => Ok(Self::Producer(unsafe { load_producer(path) }.map_err(MadsError::from)?)),
            "transformer" => Ok(Self::Transformer(
                unsafe { load_transformer(path) }.map_err(MadsError::from)?,
                dont_block,
            )),
            "consumer" => Ok(Self::Consumer(unsafe { load_consumer(path) }.map_err(MadsError::from)?)),
            other => Err(MadsError::Config(format!("unknown plugin role \"{other}\""))),
        }
    }
}

/// Drives one loaded plugin against one connected [`Agent`], applying the
/// dispatch table on every cooperative-loop tick.
pub struct PluginHost {
    role: LoadedRole,
    error_count: AtomicU64,
    /// The `silent` param override (§4.6): suppresses the load banner and
    /// per-tick activity logging, independent of the host's own log level.
    silent: bool,
}

impl PluginHost {
    pub fn new(mut role: LoadedRole, params: &PluginParams) -> Result<Self> {
        let code = match &mut role {
            LoadedRole::Producer(p) => p.plugin.set_params(params),
            LoadedRole::Transformer(p, _) => p.plugin.set_params(params),
            LoadedRole::Consumer(p) => p.plugin.set_params(params),
        };
        if matches!(code, ReturnCode::Error | ReturnCode::Critical) {
            return Err(MadsError::Plugin(format!(
                "set_params rejected parameters with return code {code:?}"
            )));
        }
        let silent = params.silent();
        if !silent {
            let (kind, info) = match &role {
                LoadedRole::Producer(p) => (p.plugin.kind(), p.plugin.info()),
                LoadedRole::Transformer(p, _) => (p.plugin.kind(), p.plugin.info()),
                LoadedRole::Consumer(p) => (p.plugin.kind(), p.plugin.info()),
            };
            tracing::info!(?kind, %info, "plugin loaded");
        }
        Ok(Self {
            role,
            error_count: AtomicU64::new(0),
            silent,
        })
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::SeqCst)
    }

    /// Run one cooperative-loop tick: role-specific input/output, then the
    /// shared dispatch policy. Intended as the `on_tick` callback passed to
    /// [`Agent::run_cooperative`].
    pub async fn tick(host: Arc<RwLock<PluginHost>>, agent: Arc<RwLock<Agent>>) -> Result<()> {
        let mut host = host.write().await;
        match &mut host.role {
            LoadedRole::Producer(loaded) => {
                let (code, body, blob) = loaded.plugin.get_output();
                let error_text = critical_error_text(code, loaded.plugin.as_ref());
                host.apply(agent, code, body, blob, error_text).await
            }
            LoadedRole::Transformer(loaded, dont_block) => {
                let dont_block = *dont_block;
                let received = {
                    let mut agent = agent.write().await;
                    agent.receive(dont_block).await?
                };
                let input = match received {
                    Received::Json { topic, body } => Some((topic, body)),
                    _ => None,
                };
                if input.is_none() && !dont_block {
                    return Ok(());
                }
                if let Some((topic, body)) = &input {
                    let load_code = loaded.plugin.load_data(body, topic);
                    if matches!(dispatch(load_code), DispatchAction::Stop) {
                        let error_text = critical_error_text(load_code, loaded.plugin.as_ref());
                        host.stop(agent, load_code, error_text).await;
                        return Ok(());
                    }
                }
                let (code, body) = loaded.plugin.process();
                let error_text = critical_error_text(code, loaded.plugin.as_ref());
                host.apply(agent, code, body, None, error_text).await
            }
            LoadedRole::Consumer(loaded) => {
                let received = {
                    let mut agent = agent.write().await;
                    agent.receive(false).await?
                };
                let (topic, body) = match received {
                    Received::Json { topic, body } => (topic, body),
                    _ => return Ok(()),
                };
                let code = loaded.plugin.load_data(&body, &topic);
                match dispatch(code) {
                    DispatchAction::Continue => {
                        if !host.silent {
                            tracing::debug!(topic = %topic, "consumer advanced");
                        }
                        Ok(())
                    }
                    DispatchAction::SkipIteration => {
                        if code == ReturnCode::Error {
                            host.publish_error(agent, &body).await;
                        }
                        Ok(())
                    }
                    DispatchAction::Stop => {
                        let error_text = critical_error_text(code, loaded.plugin.as_ref());
                        host.stop(agent, code, error_text).await;
                        Ok(())
                    }
                }
            }
        }
    }

    async fn apply(
        &mut self,
        agent: Arc<RwLock<Agent>>,
        code: ReturnCode,
        body: Option<Value>,
        blob: Option<PluginBlob>,
        error_text: Option<String>,
    ) -> Result<()> {
        match dispatch(code) {
            DispatchAction::Continue => {
                if code == ReturnCode::Warning {
                    tracing::warn!("plugin returned Warning; publishing anyway");
                }
                let mut agent = agent.write().await;
                if let Some(body) = body {
                    if !self.silent {
                        tracing::debug!(%body, "publishing plugin output");
                    }
                    agent.publish(body, Grace::None).await?;
                }
                if let Some(blob) = blob {
                    if !self.silent {
                        tracing::debug!(format = %blob.format, bytes = blob.bytes.len(), "publishing plugin blob");
                    }
                    let meta = json!({ "format": blob.format });
                    agent.publish_blob(meta, blob.bytes).await?;
                }
                Ok(())
            }
            DispatchAction::SkipIteration => {
                if code == ReturnCode::Error {
                    self.error_count.fetch_add(1, Ordering::SeqCst);
                    let mut agent = agent.write().await;
                    let payload = json!({ "error": "plugin call returned Error" });
                    if let Err(e) = agent.publish(payload, Grace::None).await {
                        tracing::warn!(error = %e, "failed to publish plugin error object");
                    }
                }
                Ok(())
            }
            DispatchAction::Stop => {
                self.stop(agent, code, error_text).await;
                Ok(())
            }
        }
    }

    async fn publish_error(&self, agent: Arc<RwLock<Agent>>, input: &Value) {
        self.error_count.fetch_add(1, Ordering::SeqCst);
        let mut agent = agent.write().await;
        let payload = json!({ "error": "plugin call returned Error", "input": input });
        if let Err(e) = agent.publish(payload, Grace::None).await {
            tracing::warn!(error = %e, "failed to publish plugin error object");
        }
    }

    /// `Critical` (§4.6): "register a marker event carrying the error,
    /// clear running flag" — for all three roles alike. Unlike a plugin
    /// `Error`, this does not itself publish a shutdown event; the
    /// surrounding binary's own lifecycle observes the cleared running flag
    /// and registers shutdown once the cooperative loop actually exits.
    async fn stop(&self, agent: Arc<RwLock<Agent>>, code: ReturnCode, error_text: Option<String>) {
        tracing::error!(?code, error = ?error_text, "plugin returned Critical, stopping");
        let info = error_text.map(|e| json!({ "error": e }));
        Agent::register_marker(agent.clone(), info);
        agent.write().await.running.stop();
    }
}

/// The plugin's last error text, when `code` is [`ReturnCode::Critical`] —
/// `None` for any other code, since only a critical return carries the
/// marker-worthy error (§4.6).
fn critical_error_text<P: crate::traits::MadsPlugin + ?Sized>(
    code: ReturnCode,
    plugin: &P,
) -> Option<String> {
    if code == ReturnCode::Critical {
        plugin.error()
    } else {
        None
    }
}

/// The reserved topic marker events are published under.
pub fn metadata_topic() -> &'static str {
    METADATA
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MadsPlugin, PluginKind};

    #[test]
    fn metadata_topic_is_the_reserved_constant() {
        assert_eq!(metadata_topic(), "metadata");
    }

    struct MockPlugin {
        last_error: Option<String>,
    }

    impl MadsPlugin for MockPlugin {
        fn set_params(&mut self, _params: &PluginParams) -> ReturnCode {
            ReturnCode::Success
        }
        fn info(&self) -> Value {
            json!({})
        }
        fn kind(&self) -> PluginKind {
            PluginKind::Producer
        }
        fn error(&self) -> Option<String> {
            self.last_error.clone()
        }
    }

    #[test]
    fn critical_error_text_surfaces_the_plugin_error_only_on_critical() {
        let plugin = MockPlugin {
            last_error: Some("boom".to_string()),
        };
        assert_eq!(
            critical_error_text(ReturnCode::Critical, &plugin),
            Some("boom".to_string())
        );
        assert_eq!(critical_error_text(ReturnCode::Success, &plugin), None);
        assert_eq!(critical_error_text(ReturnCode::Error, &plugin), None);
    }
}
