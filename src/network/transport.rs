use log::info;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::utils::{Result, ShareError};

pub struct Transport;

impl Transport {
    pub async fn connect(addr: &str, connect_timeout: Duration) -> Result<TcpStream> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ShareError::ConnectionFailed(format!("Timed out connecting to {}", addr)))?
            .map_err(|e| {
                ShareError::ConnectionFailed(format!("Failed to connect to {}: {}", addr, e))
            })?;

        stream
            .set_nodelay(true)
            .map_err(|e| ShareError::NetworkError(format!("Failed to set TCP_NODELAY: {}", e)))?;

        info!("Connected to {}", addr);
        Ok(stream)
    }

    pub async fn listen(addr: &str) -> Result<TcpListener> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ShareError::NetworkError(format!("Failed to bind to {}: {}", addr, e)))?;

        info!("Listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Reads one `\n`-terminated line without its terminator. `None` means the
    /// peer closed the connection before sending anything. Bytes that are not
    /// valid UTF-8 are replaced rather than failing the read.
    pub async fn read_line<R>(reader: &mut R) -> Result<Option<String>>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        let read = reader.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            return Ok(None);
        }

        let mut line = String::from_utf8_lossy(&buf).into_owned();

        let trimmed_len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }

    /// Writes `line` plus the terminator in a single buffer so that concurrent
    /// writers serialised by a lock never interleave partial lines.
    pub async fn write_line<W>(writer: &mut W, line: &str) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut framed = Vec::with_capacity(line.len() + 1);
        framed.extend_from_slice(line.as_bytes());
        framed.push(b'\n');

        writer.write_all(&framed).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_line_framing() {
        let (client, server) = tokio::io::duplex(64);
        let (_, mut client_writer) = tokio::io::split(client);
        let (server_reader, _) = tokio::io::split(server);
        let mut server_reader = BufReader::new(server_reader);

        Transport::write_line(&mut client_writer, "list-files").await.unwrap();
        Transport::write_line(&mut client_writer, "register alice \"a\"\r")
            .await
            .unwrap();
        drop(client_writer);

        assert_eq!(
            Transport::read_line(&mut server_reader).await.unwrap().as_deref(),
            Some("list-files")
        );
        assert_eq!(
            Transport::read_line(&mut server_reader).await.unwrap().as_deref(),
            Some("register alice \"a\"")
        );
        assert_eq!(Transport::read_line(&mut server_reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let (client, server) = tokio::io::duplex(64);
        let (_, mut client_writer) = tokio::io::split(client);
        let (server_reader, _) = tokio::io::split(server);
        let mut server_reader = BufReader::new(server_reader);

        client_writer.write_all(b"list-files \xff\xfe\n").await.unwrap();
        drop(client_writer);

        let line = Transport::read_line(&mut server_reader).await.unwrap().unwrap();
        assert!(line.starts_with("list-files "));
        assert!(line.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_failure() {
        let listener = Transport::listen("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        match Transport::connect(&addr, Duration::from_secs(2)).await {
            Err(ShareError::ConnectionFailed(_)) => {}
            other => panic!("expected connection failure, got {:?}", other.map(|_| ())),
        }
    }
}
