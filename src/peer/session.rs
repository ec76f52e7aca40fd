use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::core::protocol::split_args;
use crate::core::{PeerConfig, Request, TrackerReply};
use crate::network::Transport;
use crate::peer::{CommandValidator, PeerDirectory};
use crate::transfer::{TransferClient, TransferServer};
use crate::utils::{MetricsCollector, Result, ShareError};

/// Write side of the tracker connection, shared by the input relay and the
/// refresher. Each line goes out under the lock in one write.
#[derive(Clone)]
struct TrackerWriter {
    inner: Arc<Mutex<OwnedWriteHalf>>,
}

impl TrackerWriter {
    fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    async fn send_line(&self, line: &str) -> Result<()> {
        let mut writer = self.inner.lock().await;
        Transport::write_line(&mut *writer, line).await
    }
}

/// A local `download <user> "<remote>" "<local>"` request.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DownloadRequest {
    user: String,
    remote_path: String,
    local_path: PathBuf,
}

impl DownloadRequest {
    /// `None` when `line` is not a download command at all.
    fn parse(line: &str) -> Option<Result<Self>> {
        let args = split_args(line);
        if args.first().map(String::as_str) != Some("download") {
            return None;
        }

        Some(match &args[1..] {
            [user, remote_path, local_path] => Ok(Self {
                user: user.clone(),
                remote_path: remote_path.clone(),
                local_path: PathBuf::from(local_path),
            }),
            _ => Err(ShareError::MalformedCommand(
                "download expects <user> \"remote path\" \"local path\"".to_string(),
            )),
        })
    }
}

/// A peer's session with the tracker.
///
/// Three lanes share one tracker connection: the input relay forwards
/// validated console lines (intercepting `download`), the response reader
/// classifies tracker replies, and the refresher periodically asks for
/// `list-users` to keep the peer directory current.
#[derive(Clone)]
pub struct PeerClient {
    config: PeerConfig,
    directory: Arc<dyn PeerDirectory>,
    validator: Arc<dyn CommandValidator>,
    metrics: Arc<MetricsCollector>,
}

impl PeerClient {
    pub fn new(
        config: PeerConfig,
        directory: Arc<dyn PeerDirectory>,
        validator: Arc<dyn CommandValidator>,
    ) -> Self {
        Self {
            config,
            directory,
            validator,
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Runs until the tracker closes the connection. On `disconnect` or when
    /// `input` is exhausted the session waits for running downloads and then
    /// sends `disconnect`.
    pub async fn run<R>(&self, input: R) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let transfer_server =
            TransferServer::bind(&self.config.transfer_bind_addr(), self.metrics.clone()).await?;
        let transfer_addr = transfer_server.local_addr()?;
        let transfer_task = tokio::spawn(transfer_server.run());
        info!("MiniServer started. Listening on: {}", transfer_addr);

        let stream = Transport::connect(&self.config.tracker_addr, self.config.connect_timeout()).await?;
        let (reader, writer) = stream.into_split();
        let writer = TrackerWriter::new(writer);

        let announce = Request::RegisterMiniserver {
            address: transfer_addr.to_string(),
        };
        writer.send_line(&announce.to_string()).await?;

        let refresher = self.spawn_refresher(writer.clone());
        let relay = self.spawn_input_relay(input, writer);

        let result = self.read_responses(reader).await;

        refresher.abort();
        relay.abort();
        transfer_task.abort();
        result
    }

    fn spawn_refresher(&self, writer: TrackerWriter) -> JoinHandle<()> {
        let period = self.config.refresh_interval();

        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                if let Err(e) = writer.send_line(&Request::ListUsers.to_string()).await {
                    warn!("Peer directory refresh failed: {}", e);
                    break;
                }
            }
        })
    }

    fn spawn_input_relay<R>(&self, input: R, writer: TrackerWriter) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let client = self.clone();

        tokio::spawn(async move {
            if let Err(e) = client.relay_input(input, &writer).await {
                error!("Input relay stopped: {}", e);
            }
        })
    }

    async fn relay_input<R>(&self, input: R, writer: &TrackerWriter) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut input = BufReader::new(input);
        let mut downloads: Vec<JoinHandle<()>> = Vec::new();

        while let Some(line) = Transport::read_line(&mut input).await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if !self.validator.validate(line) {
                println!("Invalid command: {}", line);
                continue;
            }

            if let Some(request) = DownloadRequest::parse(line) {
                match request {
                    Ok(request) => downloads.push(self.spawn_download(request)),
                    Err(e) => println!("{}", e),
                }
                continue;
            }

            if line == "disconnect" {
                break;
            }
            writer.send_line(line).await?;
        }

        debug!("Leaving, waiting for {} downloads", downloads.len());
        for download in downloads {
            if let Err(e) = download.await {
                warn!("Download task failed: {}", e);
            }
        }
        writer.send_line(&Request::Disconnect.to_string()).await
    }

    fn spawn_download(&self, request: DownloadRequest) -> JoinHandle<()> {
        let directory = self.directory.clone();
        let transfer = TransferClient::new(self.config.connect_timeout(), self.metrics.clone());

        tokio::spawn(async move {
            let addr = match directory.lookup(&request.user).await {
                Ok(addr) => addr,
                Err(e) => {
                    println!("Cannot download from {}: {}", request.user, e);
                    return;
                }
            };

            match transfer
                .fetch(&addr, &request.remote_path, &request.local_path)
                .await
            {
                Ok(bytes) => println!(
                    "Downloaded {} from {} into {} ({} bytes)",
                    request.remote_path,
                    request.user,
                    request.local_path.display(),
                    bytes
                ),
                Err(e) => println!("Download of {} failed: {}", request.remote_path, e),
            }
        })
    }

    async fn read_responses(&self, reader: OwnedReadHalf) -> Result<()> {
        let mut reader = BufReader::new(reader);

        while let Some(line) = Transport::read_line(&mut reader).await? {
            if let Some(display) = self.handle_reply(&line).await {
                println!("{}", display);
            }
        }

        info!("Tracker closed the connection");
        Ok(())
    }

    /// Applies one tracker line and returns what should be shown to the user.
    async fn handle_reply(&self, line: &str) -> Option<String> {
        match TrackerReply::parse(line) {
            TrackerReply::Users(members) => {
                debug!("Tracker lists {} peers", members.len());
                if let Err(e) = self.directory.replace(members).await {
                    warn!("Failed to update peer directory: {}", e);
                }
                None
            }
            TrackerReply::Files(entries) => {
                if entries.is_empty() {
                    return Some("No files are shared right now.".to_string());
                }
                let listing: Vec<String> = entries
                    .iter()
                    .map(|(user, path)| format!("  {} : {}", user, path))
                    .collect();
                Some(format!("Available files:\n{}", listing.join("\n")))
            }
            TrackerReply::Text(text) => Some(format!("From server: {}", text.replace(';', "\n"))),
        }
    }
}
