use clap::{Parser, Subcommand};
use mini_share::core::config::DEFAULT_TRACKER_PORT;
use mini_share::utils::setup_logging;
use mini_share::{
    FileDirectory, PeerClient, PeerConfig, RegexValidator, Result, Tracker, TrackerConfig,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mini-share")]
#[command(about = "A tracker-coordinated peer-to-peer file sharing overlay")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the central tracker
    Tracker {
        /// Host to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_TRACKER_PORT)]
        port: u16,
    },
    /// Join the overlay as a peer, reading commands from stdin
    Peer {
        /// Tracker address (host:port)
        #[arg(short, long, default_value = "127.0.0.1:13337")]
        tracker: String,
        /// File where known peers and their transfer addresses are kept
        #[arg(short, long, default_value = "peers.json")]
        directory: PathBuf,
        /// Host the transfer server binds to
        #[arg(long, default_value = "127.0.0.1")]
        transfer_host: String,
        /// Seconds between peer list refreshes
        #[arg(long, default_value_t = 30)]
        refresh_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tracker { host, port } => {
            let config = TrackerConfig { host, port };
            let tracker = Tracker::bind(&config).await?;
            tracker.run().await?;
        }
        Commands::Peer {
            tracker,
            directory,
            transfer_host,
            refresh_secs,
        } => {
            let config = PeerConfig {
                tracker_addr: tracker,
                transfer_host,
                directory_path: directory,
                refresh_interval_secs: refresh_secs,
                ..PeerConfig::default()
            };

            let directory = Arc::new(FileDirectory::new(config.directory_path.clone()));
            let validator = Arc::new(RegexValidator::new()?);
            let client = PeerClient::new(config, directory, validator);

            client.run(tokio::io::stdin()).await?;
            client.metrics().print_stats().await;
        }
    }

    Ok(())
}
