use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::core::{Request, Response};
use crate::network::Transport;
use crate::tracker::Registry;
use crate::utils::{MetricsCollector, Result, ShareError};

/// Drives one tracker connection: read a line, dispatch it against the
/// registry, write one reply line, repeat until `disconnect` or a read/write
/// failure. The session is always removed from the registry on the way out.
pub struct SessionHandler {
    addr: SocketAddr,
    registry: Arc<Registry>,
    metrics: Arc<MetricsCollector>,
}

impl SessionHandler {
    pub fn new(addr: SocketAddr, registry: Arc<Registry>, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            addr,
            registry,
            metrics,
        }
    }

    pub async fn run(self, stream: TcpStream) {
        self.registry.register_connection(self.addr).await;

        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        if let Err(e) = self.command_loop(&mut reader, &mut writer).await {
            warn!("Connection with {} failed: {}", self.addr, e);
        }

        // cleanup runs before the socket is closed
        self.registry.disconnect(self.addr).await;
        self.metrics.record_connection_closed().await;
        drop(writer);
        info!("Connection closed: {}", self.addr);
    }

    async fn command_loop(
        &self,
        reader: &mut BufReader<OwnedReadHalf>,
        writer: &mut OwnedWriteHalf,
    ) -> Result<()> {
        while let Some(line) = Transport::read_line(reader).await? {
            debug!("From client {}: {}", self.addr, line);

            let Some(response) = self.process(&line).await else {
                break;
            };
            Transport::write_line(writer, &response.to_string()).await?;
        }

        Ok(())
    }

    /// Handles one command line. `None` means the client asked to disconnect.
    pub async fn process(&self, line: &str) -> Option<Response> {
        self.metrics.record_command().await;

        let request = match Request::parse(line) {
            Ok(request) => request,
            Err(e) => {
                if matches!(e, ShareError::MalformedCommand(_) | ShareError::UnknownCommand(_)) {
                    self.metrics.record_protocol_violation().await;
                }
                debug!("Rejected command from {}: {}", self.addr, e);
                return Some(e.into());
            }
        };

        match request {
            Request::Disconnect => None,
            Request::RegisterMiniserver { address } => Some(self.register_miniserver(&address).await),
            Request::Register { user, files } => Some(self.register(&user, &files).await),
            Request::Unregister { user, files } => Some(self.unregister(&user, &files).await),
            Request::ListFiles => Some(Response::Files(self.registry.list_catalog().await)),
            Request::ListUsers => Some(Response::Users(self.registry.list_members().await)),
        }
    }

    async fn register_miniserver(&self, address: &str) -> Response {
        match self.registry.set_transfer_address(self.addr, address).await {
            Ok(()) => Response::MiniserverRegistered,
            Err(e) => e.into(),
        }
    }

    async fn register(&self, user: &str, files: &[String]) -> Response {
        let result = async {
            self.registry.claim_username(self.addr, user).await?;
            self.registry.register_files(self.addr, user, files).await
        }
        .await;

        match result {
            Ok(()) => Response::FilesRegistered,
            Err(e) => self.reject(e),
        }
    }

    async fn unregister(&self, user: &str, files: &[String]) -> Response {
        let result = async {
            self.registry.claim_username(self.addr, user).await?;
            self.registry.unregister_files(self.addr, user, files).await
        }
        .await;

        match result {
            Ok(()) => Response::FilesUnregistered,
            Err(e) => self.reject(e),
        }
    }

    fn reject(&self, e: ShareError) -> Response {
        if e.is_ownership_conflict() {
            info!("Ownership conflict for {}: {}", self.addr, e);
        } else {
            warn!("Request from {} failed: {}", self.addr, e);
        }
        e.into()
    }
}
