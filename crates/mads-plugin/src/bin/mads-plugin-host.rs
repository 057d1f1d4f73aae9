//! mads-plugin-host — generic driver that loads one native plugin artifact
//! and runs it against a connected agent (C6, §4.6).
//!
//! # Usage
//!
//! ```bash
//! mads-plugin-host --role producer -s mads.toml -n camera-a \
//!     --plugin ./libproducer_echo.so -p 40 -o rate=25
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mads_agent::Agent;
use mads_plugin::host::{LoadedRole, PluginHost};
use mads_plugin::loader::resolve_artifact_path;
use mads_plugin::params::{ParamOverride, PluginParams};
use tokio::sync::RwLock;

#[derive(Parser, Debug)]
#[command(name = "mads-plugin-host", version, about)]
struct Cli {
    /// Agent name; also the default publish topic.
    #[arg(short = 'n', long, env = "MADS_AGENT_NAME")]
    name: String,

    /// Settings source: a local TOML path, or `tcp://host:port` for the
    /// broker's settings service.
    #[arg(short = 's', long, env = "MADS_SETTINGS")]
    settings: String,

    /// Optional agent identifier, passed through to the plugin as a param.
    #[arg(short = 'i', long)]
    agent_id: Option<String>,

    /// Plugin role this artifact implements.
    #[arg(long, value_enum)]
    role: Role,

    /// Explicit path to the plugin artifact. Falls back to the settings
    /// service's delivered attachment, then a default installed file name.
    #[arg(long)]
    plugin: Option<PathBuf>,

    /// Tick period in milliseconds. Falls back to the agent's configured
    /// `time_step` when not given (§6: `time_step`, §4.5.1).
    #[arg(short = 'p', long)]
    period_ms: Option<u64>,

    /// Delay, in milliseconds, after connect before the first tick.
    #[arg(short = 'd', long, default_value_t = 0)]
    delay_ms: u64,

    /// Parameter override, `key=value`, repeatable.
    #[arg(short = 'o', long = "option")]
    options: Vec<String>,

    /// Transformer-only: advance the loop even with no fresh input.
    #[arg(short = 'b', long)]
    dont_block: bool,

    /// Enable the data-plane group cipher.
    #[arg(long, env = "MADS_CRYPTO")]
    crypto: bool,

    /// Directory holding key/group-key files.
    #[arg(long, env = "MADS_KEYS_DIR", default_value = "keys")]
    keys_dir: PathBuf,

    /// Group-key base name (conventionally the broker's name).
    #[arg(long, env = "MADS_KEY_BROKER", default_value = "broker")]
    key_broker: String,

    /// Verbose logging.
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Role {
    Producer,
    Transformer,
    Consumer,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Transformer => "transformer",
            Role::Consumer => "consumer",
        }
    }

    fn default_artifact_name(&self) -> &'static str {
        match self {
            Role::Producer => "libmads_plugin_producer.so",
            Role::Transformer => "libmads_plugin_transformer.so",
            Role::Consumer => "libmads_plugin_consumer.so",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
            |_| tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "info" }),
        ))
        .init();

    tracing::info!(name = %cli.name, role = ?cli.role, "starting mads-plugin-host");

    let mut agent = Agent::init(&cli.name, &cli.settings).await?;
    agent.enable_remote_control(false)?;
    agent.descriptor.crypto_enabled = cli.crypto;
    agent.descriptor.key_dir = cli.keys_dir.clone();
    agent.descriptor.server_key_name = cli.key_broker.clone();

    let install_prefix = mads_core::exepath::install_prefix().unwrap_or_else(|_| PathBuf::from("."));
    let artifact = resolve_artifact_path(
        cli.plugin.clone(),
        agent.descriptor.attachment_path.clone(),
        cli.role.default_artifact_name(),
        &install_prefix,
    )?;
    tracing::info!(artifact = %artifact.display(), "loading plugin artifact");

    let mut params = PluginParams::new()
        .with_install_prefix(&install_prefix)
        .with_agent_id(cli.agent_id.as_deref());
    let overrides: Vec<ParamOverride> = cli
        .options
        .iter()
        .filter_map(|raw| ParamOverride::parse(raw))
        .collect();
    params.apply_overrides(&overrides);

    // §4.6: the host "honors a `silent` and a `receive_timeout` override
    // from params" — the latter drives the subscribe socket's receive
    // timeout, so it must land on the descriptor before `connect`.
    agent.descriptor.receive_timeout_ms =
        params.receive_timeout_ms(mads_core::constants::DEFAULT_RECEIVE_TIMEOUT_MS);

    let role = unsafe { LoadedRole::load(cli.role.as_str(), &artifact, cli.dont_block) }?;
    let host = Arc::new(RwLock::new(PluginHost::new(role, &params)?));

    agent.running.install_signal_handlers();
    agent.connect(Duration::from_millis(cli.delay_ms)).await?;

    // `-p` overrides `time_step` when given; otherwise the config-delivered
    // loop period drives the tick cadence (spec: "time_step … default 0 →
    // free-run" is otherwise dead config, never consulted).
    let period_ms = cli.period_ms.unwrap_or(agent.descriptor.time_step_ms);

    let agent = Arc::new(RwLock::new(agent));
    Agent::register_startup(agent.clone());

    Agent::run_cooperative(agent.clone(), period_ms, move |agent_arc| {
        let host = host.clone();
        async move { PluginHost::tick(host, agent_arc).await }
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

    tracing::info!("mads-plugin-host exited cleanly");
    Ok(())
}
