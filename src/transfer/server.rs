use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Duration, sleep};

use crate::network::Transport;
use crate::utils::{MetricsCollector, Result};

/// A peer's passive file endpoint. Each inbound connection names one path on a
/// single line and receives that file's raw bytes until the server closes.
///
/// An unopenable path closes the connection with zero bytes sent, which the
/// fetching side cannot tell apart from an empty file.
pub struct TransferServer {
    listener: TcpListener,
    metrics: Arc<MetricsCollector>,
}

impl TransferServer {
    pub async fn bind(addr: &str, metrics: Arc<MetricsCollector>) -> Result<Self> {
        let listener = Transport::listen(addr).await?;
        Ok(Self { listener, metrics })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("Accepted download request from: {}", addr);
                    let metrics = self.metrics.clone();

                    tokio::spawn(async move {
                        if let Err(e) = Self::serve(stream, addr, metrics).await {
                            warn!("Transfer to {} aborted: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept transfer connection: {}", e);
                    sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn serve(stream: TcpStream, addr: SocketAddr, metrics: Arc<MetricsCollector>) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let Some(path) = Transport::read_line(&mut reader).await? else {
            debug!("{} closed before naming a file", addr);
            return Ok(());
        };

        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Could not open {} for {}: {}", path, addr, e);
                metrics.record_file_missing().await;
                return Ok(());
            }
        };

        let sent = tokio::io::copy(&mut file, &mut writer).await?;
        writer.shutdown().await?;

        metrics.record_file_served(sent).await;
        info!("Sent {} ({} bytes) to {}", path, sent, addr);
        Ok(())
    }
}
