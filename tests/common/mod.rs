#![allow(dead_code)]

use std::time::Duration;

use axum::http::StatusCode;
use color_eyre::Result;
use futures::SinkExt;
use futures::StreamExt;
use grbl_keel::{
    actions::{Action, Response},
    config::Config,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::info;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Polls often so tests don't wait long for status.
pub fn fast_config() -> Config {
    Config {
        read_timeout_ms: 10,
        status_settle_ms: 5,
        status_interval_ms: 20,
        ..Default::default()
    }
}

pub async fn start_server() -> u16 {
    start_server_with_config(fast_config()).await
}

pub async fn start_server_with_config(config: Config) -> u16 {
    let (port_tx, port_rx) = oneshot::channel();

    tokio::spawn(async move { grbl_keel::server::run_any_port(config, port_tx).await });
    port_rx
        .await
        .expect("Server should reply with allocated port")
}

pub async fn connect(port: u16) -> Result<Client> {
    info!("Connecting to server on port {port}");
    let (stream, http_response) =
        tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}/ws/machine")).await?;

    assert_eq!(http_response.status(), StatusCode::SWITCHING_PROTOCOLS);

    Ok(stream)
}

pub async fn start_server_and_connect() -> Result<Client> {
    let port = start_server().await;
    connect(port).await
}

pub async fn send(client: &mut Client, action: &Action) -> Result<()> {
    client
        .send(tungstenite::Message::Text(action.serialize()))
        .await?;

    Ok(())
}

pub async fn receive(client: &mut Client) -> Result<Response> {
    let response = timeout(Duration::from_secs(5), client.next())
        .await?
        .ok_or_else(|| color_eyre::eyre::eyre!("Stream closed"))??;

    let response = response.to_text()?;
    let response = serde_json::from_str(response)?;

    Ok(response)
}

/// Receive until something other than a position or status update arrives.
pub async fn receive_reply(client: &mut Client) -> Result<Response> {
    loop {
        let response = receive(client).await?;
        if !response.is_status() {
            return Ok(response);
        }
    }
}

/// Receive until `wanted` arrives, skipping everything else.
pub async fn receive_until(
    client: &mut Client,
    wanted: impl Fn(&Response) -> bool,
) -> Result<Response> {
    loop {
        let response = receive(client).await?;
        if wanted(&response) {
            return Ok(response);
        }
    }
}

pub async fn send_receive(client: &mut Client, action: &Action) -> Result<Response> {
    send(client, action).await?;
    receive_reply(client).await
}

/// Nothing but status updates arrive for a while.
pub async fn assert_no_reply(client: &mut Client, wait: Duration) {
    let result = timeout(wait, receive_reply(client)).await;
    assert!(result.is_err(), "Unexpected reply: {result:?}");
}

/// A bare HTTP/1.1 GET, returning the status line and body.
pub async fn http_get(port: u16, path: &str) -> Result<(String, String)> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await?;

    stream
        .write_all(
            format!("GET {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n")
                .as_bytes(),
        )
        .await?;

    let mut raw = String::new();
    timeout(Duration::from_secs(5), stream.read_to_string(&mut raw)).await??;

    let (head, body) = raw
        .split_once("\r\n\r\n")
        .ok_or_else(|| color_eyre::eyre::eyre!("Malformed response: {raw}"))?;
    let status = head.lines().next().unwrap_or_default().to_owned();

    Ok((status, body.to_owned()))
}
