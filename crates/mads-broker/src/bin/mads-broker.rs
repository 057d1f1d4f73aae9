//! mads-broker — the central pub/sub broker plus settings service.
//!
//! # Usage
//!
//! ```bash
//! # Daemon mode, default ports
//! mads-broker -c mads.toml
//!
//! # Steerable interactive mode, with hot-reload on config change
//! mads-broker -c mads.toml --interactive --watch
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use crossterm::event::{self, Event as TermEvent, KeyCode};
use mads_broker::config_watch::{reexec_self, ConfigWatcher};
use mads_broker::{EventProxy, ProxyEndpoints, ProxyMode, SettingsService, TerminalAction, Verb};
use mads_core::config::MadsConfig;
use tokio::sync::RwLock;

#[derive(Parser, Debug)]
#[command(name = "mads-broker", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short = 'c', long, env = "MADS_CONFIG", default_value = "mads.toml")]
    config: PathBuf,

    /// Run in steerable interactive mode (accepts p/r/i/q/x keystrokes).
    #[arg(long, env = "MADS_INTERACTIVE")]
    interactive: bool,

    /// Watch the configuration file and reload (re-exec) on change.
    /// Only meaningful together with `--interactive`.
    #[arg(long, env = "MADS_WATCH")]
    watch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(?cli, "starting mads-broker");

    let config_text = std::fs::read_to_string(&cli.config)?;
    let config = MadsConfig::from_toml_str(&config_text)?;
    let install_dir = mads_core::exepath::install_prefix().unwrap_or_else(|_| PathBuf::from("."));

    let endpoints = ProxyEndpoints {
        frontend: config.agents.frontend_address.clone(),
        backend: config.agents.backend_address.clone(),
    };
    let settings_endpoint = config.agents.settings_address.clone();
    let timecode_fps = config.agents.timecode_fps;

    let mode = if cli.interactive {
        ProxyMode::Steerable
    } else {
        ProxyMode::Daemon
    };
    let proxy = Arc::new(EventProxy::new(endpoints, mode));

    let settings = Arc::new(SettingsService::new(
        Arc::new(RwLock::new(config)),
        install_dir,
        settings_endpoint,
        timecode_fps,
    ));

    let proxy_for_signal = proxy.clone();
    let settings_for_signal = settings.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");
        proxy_for_signal.apply(Verb::Terminate);
        settings_for_signal.stop();
    });

    let settings_task = {
        let settings = settings.clone();
        tokio::spawn(async move { settings.run().await })
    };

    if cli.interactive {
        println!("Type P to pause, R to resume, I for info, Q to quit, X to reload.");
        let proxy = proxy.clone();
        let watch_path = cli.config.clone();
        tokio::task::spawn_blocking(move || terminal_loop(proxy, cli.watch, &watch_path));
    }

    proxy.run().await?;
    let _ = settings_task.await;

    if proxy.reload_requested() {
        tracing::info!("reloading: re-executing with the same argv");
        let _ = reexec_self();
    }

    tracing::info!("mads-broker exited cleanly");
    Ok(())
}

/// Translate terminal keystrokes (and, if enabled, config-file-watch
/// events) into steering actions. Runs on a blocking thread since
/// `crossterm::event::read` blocks.
fn terminal_loop(proxy: Arc<EventProxy>, watch: bool, config_path: &std::path::Path) {
    let watcher = if watch {
        ConfigWatcher::watch(config_path).ok()
    } else {
        None
    };

    loop {
        if !proxy.is_running() {
            return;
        }
        if let Some(w) = &watcher {
            if w.poll_modified() {
                tracing::info!("configuration file changed, requesting reload");
                proxy.request_reload();
                return;
            }
        }
        if event::poll(std::time::Duration::from_millis(200)).unwrap_or(false) {
            if let Ok(TermEvent::Key(key)) = event::read() {
                if let KeyCode::Char(c) = key.code {
                    match mads_broker::steering::translate_key(c) {
                        Some(TerminalAction::Verb(Verb::Statistics)) => {
                            let wire = proxy.stats().to_wire();
                            let counts: Vec<u64> = wire
                                .chunks_exact(8)
                                .map(|c| u64::from_be_bytes(c.try_into().unwrap()))
                                .collect();
                            println!("statistics: {counts:?}");
                        }
                        Some(TerminalAction::Verb(verb)) => proxy.apply(verb),
                        Some(TerminalAction::Reload) => {
                            proxy.request_reload();
                            return;
                        }
                        Some(TerminalAction::Quit) => {
                            proxy.apply(Verb::Terminate);
                            return;
                        }
                        None => {}
                    }
                }
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for ctrl_c");
    }
}
