//! Election participant binary

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zkelect::common::{duration_millis, parse_duration, Config};

#[derive(Parser)]
#[command(name = "zkelect")]
#[command(about = "Single-leader election over ZooKeeper")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./zkelect.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the election and report every leadership change
    Run {
        /// Coordination service, host1:port1[,host2:port2,...][/namespace]
        #[arg(long)]
        target: Option<String>,

        /// Participant ID written into the leader marker
        #[arg(long)]
        node_id: Option<String>,

        /// Session connect timeout (e.g. 3s, 500ms)
        #[arg(long, value_parser = parse_duration)]
        connect_timeout: Option<Duration>,

        /// Back-off after a failed watch (e.g. 1s)
        #[arg(long, value_parser = parse_duration)]
        retry_interval: Option<Duration>,
    },

    /// Show how a target resolves, without connecting
    Resolve {
        /// Coordination service, host1:port1[,host2:port2,...][/namespace]
        target: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // File and environment first, CLI arguments override
    let mut config = Config::load_from(cli.config.as_deref())?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run {
            target,
            node_id,
            connect_timeout,
            retry_interval,
        } => {
            if let Some(target) = target {
                config.target = target;
            }
            if node_id.is_some() {
                config.node_id = node_id;
            }
            if let Some(timeout) = connect_timeout {
                config.connect_timeout_ms = duration_millis(timeout)?;
            }
            if let Some(interval) = retry_interval {
                config.retry_interval_ms = duration_millis(interval)?;
            }
            run(config).await?;
        }

        Commands::Resolve { target } => {
            config.target = target;
            let settings = config.settings()?;
            println!("Endpoints:");
            for endpoint in settings.target.endpoints() {
                println!("  {}", endpoint);
            }
            println!("Root path:   {}", settings.paths.root());
            println!("Marker path: {}", settings.paths.marker());
        }
    }

    Ok(())
}

async fn run(config: Config) -> anyhow::Result<()> {
    let settings = config.settings()?;
    tracing::info!("Joining election as {}", settings.node_id);
    tracing::info!("  Target: {}", settings.target);
    tracing::info!("  Marker: {}", settings.paths.marker());

    let (tx, mut rx) = zkelect::leadership_channel();
    let handle =
        zkelect::start_with(zkelect::coordination::ZooKeeperConnector::new(), settings, tx)
            .await?;

    let mut is_master = false;
    loop {
        tracing::info!("is master: {}", is_master);
        tokio::select! {
            outcome = rx.recv() => {
                let Some(outcome) = outcome else { break };
                is_master = outcome;
                if is_master {
                    tracing::info!("Acting as leader");
                } else {
                    tracing::info!("Standing by");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, leaving the election");
                break;
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}
