//! mads-agent-run — the baseline agent binary: connects, registers startup,
//! republishes nothing of its own, and idles on the cooperative loop. Exists
//! mainly as a smoke test for the runtime and a template for plugin-hosting
//! binaries built on top of the same crate (§6 CLI surface, agent baseline).
//! The loop period comes solely from the agent's own `time_step` setting;
//! `-p`/`-d` are plugin-host-only additions (§6) and have no baseline flag.
//!
//! # Usage
//!
//! ```bash
//! mads-agent-run -s mads.toml -n probe
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use mads_agent::Agent;
use tokio::sync::RwLock;

#[derive(Parser, Debug)]
#[command(name = "mads-agent-run", version, about)]
struct Cli {
    /// Settings source: a local TOML path, or `tcp://host:port` for the
    /// broker's settings service.
    #[arg(short = 's', long, env = "MADS_SETTINGS")]
    settings: String,

    /// Agent name; also the default publish topic and settings-section key.
    #[arg(short = 'n', long, env = "MADS_AGENT_NAME")]
    name: String,

    /// Optional agent identifier.
    #[arg(short = 'i', long)]
    id: Option<String>,

    /// Enable the data-plane group cipher.
    #[arg(long, env = "MADS_CRYPTO")]
    crypto: bool,

    /// Directory holding key/group-key files.
    #[arg(long = "keys_dir", env = "MADS_KEYS_DIR", default_value = "keys")]
    keys_dir: PathBuf,

    /// Group-key base name (conventionally the broker's name).
    #[arg(long = "key_broker", env = "MADS_KEY_BROKER", default_value = "broker")]
    key_broker: String,

    /// Unused by the baseline agent (no point-to-point link to authenticate
    /// as); accepted for CLI-surface parity with the plugin-host binaries.
    #[arg(long = "key_client", env = "MADS_KEY_CLIENT")]
    key_client: Option<String>,

    /// Verbose logging.
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
            |_| tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "info" }),
        ))
        .init();

    tracing::info!(name = %cli.name, settings = %cli.settings, "starting mads-agent-run");

    let mut agent = Agent::init(&cli.name, &cli.settings).await?;
    agent.descriptor.crypto_enabled = cli.crypto;
    agent.descriptor.key_dir = cli.keys_dir.clone();
    agent.descriptor.server_key_name = cli.key_broker.clone();
    if let Some(client) = &cli.key_client {
        agent.descriptor.client_key_name = client.clone();
    }
    if let Some(id) = &cli.id {
        agent.descriptor.agent_id = Some(id.clone());
    }

    agent.enable_remote_control(false)?;
    agent.running.install_signal_handlers();
    agent.connect(Duration::ZERO).await?;

    // §6: `time_step` (default 0 → free-run) is the baseline agent's only
    // sanctioned loop-period source; `-p`/`-d` are plugin-host-only additions.
    let period_ms = agent.descriptor.time_step_ms;

    let agent = Arc::new(RwLock::new(agent));
    Agent::register_startup(agent.clone());

    Agent::run_cooperative(agent.clone(), period_ms, |agent_arc| async move {
        let mut agent = agent_arc.write().await;
        if agent.descriptor.sub_topics.is_empty() {
            return Ok(());
        }
        let _ = agent.receive(true).await?;
        Ok(())
    })
    .await;

    let restart = {
        let mut agent = agent.write().await;
        agent.register_shutdown().await?;
        agent.disconnect().await?;
        agent.restart.is_set()
    };

    if restart {
        tracing::info!("restarting: re-executing with the same argv");
        mads_core::exepath::reexec_self()?;
    }

    tracing::info!("mads-agent-run exited cleanly");
    Ok(())
}
