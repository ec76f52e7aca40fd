use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct ShareMetrics {
    pub connections_accepted: u64,
    pub connections_closed: u64,
    pub commands_handled: u64,
    pub protocol_violations: u64,
    pub files_served: u64,
    pub bytes_served: u64,
    pub files_missing: u64,
    pub files_downloaded: u64,
    pub bytes_downloaded: u64,
    pub downloads_failed: u64,
    pub uptime: Duration,
    pub start_time: Instant,
}

impl Default for ShareMetrics {
    fn default() -> Self {
        Self {
            connections_accepted: 0,
            connections_closed: 0,
            commands_handled: 0,
            protocol_violations: 0,
            files_served: 0,
            bytes_served: 0,
            files_missing: 0,
            files_downloaded: 0,
            bytes_downloaded: 0,
            downloads_failed: 0,
            uptime: Duration::new(0, 0),
            start_time: Instant::now(),
        }
    }
}

pub struct MetricsCollector {
    metrics: RwLock<ShareMetrics>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: RwLock::new(ShareMetrics::default()),
        }
    }

    pub async fn record_connection_accepted(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.connections_accepted += 1;
    }

    pub async fn record_connection_closed(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.connections_closed += 1;
    }

    pub async fn record_command(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.commands_handled += 1;
    }

    pub async fn record_protocol_violation(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.protocol_violations += 1;
    }

    pub async fn record_file_served(&self, bytes: u64) {
        let mut metrics = self.metrics.write().await;
        metrics.files_served += 1;
        metrics.bytes_served += bytes;
    }

    pub async fn record_file_missing(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.files_missing += 1;
    }

    pub async fn record_file_downloaded(&self, bytes: u64) {
        let mut metrics = self.metrics.write().await;
        metrics.files_downloaded += 1;
        metrics.bytes_downloaded += bytes;
    }

    pub async fn record_download_failed(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.downloads_failed += 1;
    }

    pub async fn get_metrics(&self) -> ShareMetrics {
        let mut metrics = self.metrics.read().await.clone();
        metrics.uptime = metrics.start_time.elapsed();
        metrics
    }

    pub async fn print_stats(&self) {
        let metrics = self.get_metrics().await;

        println!("\n=== Mini Share Statistics ===");
        println!("Uptime: {:.2?}", metrics.uptime);
        println!(
            "Connections: {} accepted, {} closed",
            metrics.connections_accepted, metrics.connections_closed
        );
        println!(
            "Commands: {} handled, {} malformed or unknown",
            metrics.commands_handled, metrics.protocol_violations
        );
        println!(
            "Served: {} files ({} bytes), {} requests for missing files",
            metrics.files_served, metrics.bytes_served, metrics.files_missing
        );
        println!(
            "Downloaded: {} files ({} bytes), {} failed",
            metrics.files_downloaded, metrics.bytes_downloaded, metrics.downloads_failed
        );
        println!("=============================\n");
    }
}
