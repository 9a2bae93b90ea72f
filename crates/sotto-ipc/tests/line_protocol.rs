//! Server/client round trip over a real socket.

use assert_matches::assert_matches;
use tokio_util::sync::CancellationToken;

use sotto_core::{Command, parse_error_line};
use sotto_ipc::{Client, IpcError, Server};

/// Start a server with a miniature reply loop standing in for the daemon.
async fn start_echo_server(cancel: CancellationToken) -> String {
    let (server, mut request_rx) = Server::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = server.local_addr().expect("no local addr").to_string();

    let server_cancel = cancel.clone();
    tokio::spawn(async move { server.run(server_cancel).await });

    tokio::spawn(async move {
        while let Some(request) = request_rx.recv().await {
            match request.command {
                Command::Get => {
                    request.origin.send_line("Vol: 50, Mute: off");
                }
                Command::SetAbsolute(level) => {
                    request.origin.send_line(format!("Vol: {level}, Mute: off"));
                }
                Command::Quit => {
                    request.origin.close();
                }
                Command::Unparsed => {
                    request.origin.send_line(parse_error_line(&request.raw));
                }
                _ => {}
            }
        }
    });

    addr
}

#[tokio::test]
async fn test_request_reply_round_trip() {
    let cancel = CancellationToken::new();
    let addr = start_echo_server(cancel.clone()).await;

    let mut client = Client::connect(&addr).await.expect("connect failed");
    assert_eq!(client.request("vol").await.unwrap(), "Vol: 50, Mute: off");
    assert_eq!(client.request("vol 40").await.unwrap(), "Vol: 40, Mute: off");

    cancel.cancel();
}

#[tokio::test]
async fn test_lines_arrive_parsed() {
    let cancel = CancellationToken::new();
    let addr = start_echo_server(cancel.clone()).await;

    // Whitespace and case are the server's problem, not the reply loop's.
    let mut client = Client::connect(&addr).await.expect("connect failed");
    assert_eq!(client.request("  VOL   85  ").await.unwrap(), "Vol: 85, Mute: off");

    cancel.cancel();
}

#[tokio::test]
async fn test_unparsed_input_is_reported() {
    let cancel = CancellationToken::new();
    let addr = start_echo_server(cancel.clone()).await;

    let mut client = Client::connect(&addr).await.expect("connect failed");
    assert_eq!(client.request("vol abc").await.unwrap(), "Unable to parse msg: \"vol abc\"");

    cancel.cancel();
}

#[tokio::test]
async fn test_quit_closes_only_that_connection() {
    let cancel = CancellationToken::new();
    let addr = start_echo_server(cancel.clone()).await;

    let mut quitting = Client::connect(&addr).await.expect("connect failed");
    let mut staying = Client::connect(&addr).await.expect("connect failed");

    quitting.send("q").await.unwrap();
    assert_matches!(quitting.recv_line().await, Err(IpcError::ConnectionClosed));

    assert_eq!(staying.request("vol").await.unwrap(), "Vol: 50, Mute: off");

    cancel.cancel();
}
