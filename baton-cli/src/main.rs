mod runner;
mod storage;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "baton",
    about = "Baton — lease-based leader election over a shared store",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Coordination store: "memory", "sqlite:<path>" or "redis://host:port"
    #[arg(long, default_value = "memory", env = "BATON_STORAGE")]
    storage: String,

    /// Lease key shared by all candidates (overrides the config file)
    #[arg(long, env = "BATON_KEY")]
    key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run competing candidates until the duration elapses or Ctrl-C
    Run {
        #[command(flatten)]
        store: StoreArgs,

        /// Number of candidates to run in this process
        #[arg(short = 'n', long, default_value = "5")]
        candidates: usize,

        /// Stop after this many seconds
        #[arg(short, long, default_value = "100")]
        duration_secs: u64,

        /// JSON file with election settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Lease TTL in milliseconds
        #[arg(long)]
        ttl_ms: Option<u64>,

        /// Renewal interval in milliseconds (must be below the TTL)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Leadership work budget in milliseconds
        #[arg(long)]
        work_ms: Option<u64>,

        /// Seed for reproducible backoff
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the current lease holder
    Holder {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            store,
            candidates,
            duration_secs,
            config,
            ttl_ms,
            tick_ms,
            work_ms,
            seed,
        } => {
            let mut settings = runner::load_config(config.as_deref())?;
            if let Some(key) = store.key {
                settings.key = key;
            }
            settings.ttl_ms = ttl_ms.unwrap_or(settings.ttl_ms);
            settings.tick_interval_ms = tick_ms.unwrap_or(settings.tick_interval_ms);
            settings.work_budget_ms = work_ms.unwrap_or(settings.work_budget_ms);
            settings.seed = seed.or(settings.seed);

            let summary =
                runner::run(settings, &store.storage, candidates, duration_secs).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Holder { store } => {
            let key = store.key.unwrap_or_else(|| baton_core::ElectionConfig::default().key);
            match runner::read_holder(&store.storage, &key).await? {
                Some(holder) => println!("{holder}"),
                None => println!("(no leader)"),
            }
        }
        Commands::Version => {
            println!("baton {}", env!("CARGO_PKG_VERSION"));
            println!("Lease-based leader election over a shared store");
        }
    }

    Ok(())
}
