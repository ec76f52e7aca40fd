use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::network::Transport;
use crate::utils::{MetricsCollector, Result, ShareError};

/// Fetches whole files from other peers' transfer servers.
#[derive(Clone)]
pub struct TransferClient {
    connect_timeout: Duration,
    metrics: Arc<MetricsCollector>,
}

impl TransferClient {
    pub fn new(connect_timeout: Duration, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            connect_timeout,
            metrics,
        }
    }

    /// Streams `remote_path` from the peer at `addr` into `local_path`,
    /// replacing any existing file. A transfer cut short leaves a truncated
    /// file behind. Returns the number of bytes written.
    pub async fn fetch(&self, addr: &str, remote_path: &str, local_path: &Path) -> Result<u64> {
        match self.try_fetch(addr, remote_path, local_path).await {
            Ok(received) => {
                self.metrics.record_file_downloaded(received).await;
                info!(
                    "Downloaded {} from {} into {:?} ({} bytes)",
                    remote_path, addr, local_path, received
                );
                Ok(received)
            }
            Err(e) => {
                self.metrics.record_download_failed().await;
                warn!("Download of {} from {} failed: {}", remote_path, addr, e);
                Err(e)
            }
        }
    }

    async fn try_fetch(&self, addr: &str, remote_path: &str, local_path: &Path) -> Result<u64> {
        let mut stream = Transport::connect(addr, self.connect_timeout).await?;
        Transport::write_line(&mut stream, remote_path).await?;

        let mut file = File::create(local_path).await.map_err(|e| {
            ShareError::IoError(format!("Failed to create {:?}: {}", local_path, e))
        })?;

        let received = tokio::io::copy(&mut stream, &mut file).await?;
        file.flush().await?;
        Ok(received)
    }
}
