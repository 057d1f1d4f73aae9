//! mads-keygen — key-pair and data-plane group-key generation (C2.1).
//!
//! Produces the two files a credential pair is specified as: `<name>.pub`
//! and `<name>.key` under a chosen directory, or the group's `<name>.group`
//! symmetric key for the data plane. Fails if the target files already
//! exist unless `--overwrite` is given (§4.2 failure modes).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mads_crypto::{GroupKey, KeyPair};

#[derive(Parser, Debug)]
#[command(name = "mads-keygen", version, about)]
struct Cli {
    /// Directory the key files are written under.
    #[arg(short = 'd', long, env = "MADS_KEYS_DIR", default_value = "keys")]
    keys_dir: PathBuf,

    /// Overwrite existing key files instead of failing.
    #[arg(long)]
    overwrite: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an X25519 key-pair (`<name>.pub` / `<name>.key`).
    Pair {
        /// Base name for the two key files, e.g. `broker` or an agent name.
        name: String,
    },
    /// Generate the shared data-plane symmetric key (`<name>.group`).
    Group {
        /// Base name for the group-key file, conventionally `broker`.
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.keys_dir)?;

    match cli.command {
        Command::Pair { name } => {
            let pair = KeyPair::generate_to(&cli.keys_dir, &name, cli.overwrite)?;
            println!(
                "wrote {}/{name}.{{pub,key}} (public: {})",
                cli.keys_dir.display(),
                hex::encode(pair.public.as_bytes())
            );
        }
        Command::Group { name } => {
            GroupKey::generate_to(&cli.keys_dir, &name, cli.overwrite)?;
            println!("wrote {}/{name}.group", cli.keys_dir.display());
        }
    }

    Ok(())
}
