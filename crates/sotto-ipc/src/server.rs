//! Line protocol server.
//!
//! Accepts TCP connections and runs one handler task per client. Handlers
//! only parse inbound lines into requests and drain the outbound channel;
//! they never touch the device or the settings store.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use sotto_core::Command;

use crate::error::IpcResult;
use crate::messages::{ClientId, Origin, Outbound, Request};

/// Request channel depth; connection readers queue here for the controller.
const REQUEST_QUEUE_DEPTH: usize = 64;

/// Line protocol server over TCP.
pub struct Server {
    listener: TcpListener,
    next_client_id: AtomicU64,
    request_tx: mpsc::Sender<Request>,
}

impl Server {
    /// Bind to the given address.
    ///
    /// Returns the server and the request receiver the controller drains.
    ///
    /// # Errors
    /// Returns an error if the address cannot be bound.
    pub async fn bind(addr: &str) -> IpcResult<(Self, mpsc::Receiver<Request>)> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Listening");

        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);

        Ok((Self { listener, next_client_id: AtomicU64::new(1), request_tx }, request_rx))
    }

    /// The actually bound address (useful with port 0).
    ///
    /// # Errors
    /// Returns an error if the local address cannot be read.
    pub fn local_addr(&self) -> IpcResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,

                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
                        info!(client_id, %peer, "Client connected");

                        let request_tx = self.request_tx.clone();
                        let cancel = cancel.clone();
                        tokio::spawn(async move {
                            handle_client(client_id, stream, request_tx, cancel).await;
                            debug!(client_id, "Client handler exiting");
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Accept error");
                    }
                },
            }
        }
    }
}

/// Read lines into requests, write queued replies, until either side ends.
async fn handle_client(
    client_id: ClientId,
    stream: TcpStream,
    request_tx: mpsc::Sender<Request>,
    cancel: CancellationToken,
) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    let (origin, mut outbound_rx) = Origin::channel(client_id);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,

            result = reader.read_line(&mut line) => {
                match result {
                    Ok(0) => {
                        debug!(client_id, "Client disconnected");
                        break;
                    }
                    Ok(_) => {
                        let raw = line.trim();
                        if !raw.is_empty() {
                            let request = Request {
                                origin: origin.clone(),
                                command: Command::parse(raw),
                                raw: raw.to_string(),
                            };
                            if request_tx.send(request).await.is_err() {
                                // Controller is gone; nothing left to serve.
                                break;
                            }
                        }
                        line.clear();
                    }
                    Err(e) => {
                        error!(client_id, error = %e, "Read error");
                        break;
                    }
                }
            }

            out = outbound_rx.recv() => {
                match out {
                    Some(Outbound::Line(reply)) => {
                        if let Err(e) = writer.write_all(format!("{reply}\n").as_bytes()).await {
                            error!(client_id, error = %e, "Write error");
                            break;
                        }
                    }
                    Some(Outbound::Close) | None => break,
                }
            }
        }
    }

    // Flush whatever was already queued, then let the socket drop.
    while let Ok(Outbound::Line(reply)) = outbound_rx.try_recv() {
        if writer.write_all(format!("{reply}\n").as_bytes()).await.is_err() {
            break;
        }
    }
    let _ = writer.shutdown().await;
}
