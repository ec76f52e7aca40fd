use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TRACKER_PORT: u16 = 13337;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub host: String,
    pub port: u16,
}

impl TrackerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_TRACKER_PORT,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeerConfig {
    pub tracker_addr: String,
    /// Host the transfer server binds to; the port is always ephemeral.
    pub transfer_host: String,
    pub directory_path: PathBuf,
    pub refresh_interval_secs: u64,
    pub connect_timeout_secs: u64,
}

impl PeerConfig {
    pub fn transfer_bind_addr(&self) -> String {
        format!("{}:0", self.transfer_host)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            tracker_addr: format!("127.0.0.1:{}", DEFAULT_TRACKER_PORT),
            transfer_host: "127.0.0.1".to_string(),
            directory_path: PathBuf::from("peers.json"),
            refresh_interval_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}
