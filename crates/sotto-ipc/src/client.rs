//! Line protocol client.
//!
//! Replies arrive in command order, so the client is a thin wrapper around
//! one stream: write a line, read a line. A connection in watch mode just
//! keeps calling [`Client::recv_line`].

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::{IpcError, IpcResult};

/// Client connection to the daemon.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connect to the daemon at the given address.
    ///
    /// # Errors
    /// Returns an error if the connection fails.
    pub async fn connect(addr: &str) -> IpcResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self { reader: BufReader::new(reader), writer })
    }

    /// Send one command line.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn send(&mut self, command: &str) -> IpcResult<()> {
        self.writer.write_all(format!("{command}\n").as_bytes()).await?;
        Ok(())
    }

    /// Receive one reply or notification line.
    ///
    /// # Errors
    /// Returns `ConnectionClosed` when the daemon closed the connection.
    pub async fn recv_line(&mut self) -> IpcResult<String> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(IpcError::ConnectionClosed);
        }
        Ok(line.trim_end().to_string())
    }

    /// Send one command and wait for its reply.
    ///
    /// # Errors
    /// Returns an error if the write or the read fails.
    pub async fn request(&mut self, command: &str) -> IpcResult<String> {
        self.send(command).await?;
        self.recv_line().await
    }
}
