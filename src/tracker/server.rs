use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::{Duration, sleep};

use crate::core::TrackerConfig;
use crate::network::Transport;
use crate::tracker::{Registry, SessionHandler};
use crate::utils::{MetricsCollector, Result};

/// The tracker process: one listener, one registry, one task per connection.
pub struct Tracker {
    listener: TcpListener,
    registry: Arc<Registry>,
    metrics: Arc<MetricsCollector>,
}

impl Tracker {
    /// Binding the listener is the only failure that is fatal to the tracker.
    pub async fn bind(config: &TrackerConfig) -> Result<Self> {
        let listener = Transport::listen(&config.bind_addr()).await?;

        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
            metrics: Arc::new(MetricsCollector::new()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Accepts connections forever.
    pub async fn serve(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("Accepted connection from: {}", addr);
                    self.metrics.record_connection_accepted().await;

                    let handler = SessionHandler::new(addr, self.registry.clone(), self.metrics.clone());
                    tokio::spawn(handler.run(stream));
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Serves until Ctrl+C, then prints the collected statistics.
    pub async fn run(self) -> Result<()> {
        info!("Tracker started. Listening on {}", self.local_addr()?);
        let metrics = self.metrics.clone();

        tokio::select! {
            _ = self.serve() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down");
            }
        }

        metrics.print_stats().await;
        Ok(())
    }
}
