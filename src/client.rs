use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};

use crate::{
    actions::{Action, Response},
    error::Error,
};

/// A client talking to a running server over its machine websocket.
pub struct MachineClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl MachineClient {
    /// Connect to the server at the given host and port.
    pub async fn connect(host: &str, port: u16) -> Result<Self, Error> {
        let url = format!("ws://{host}:{port}/ws/machine");
        info!(%url, "Connecting");

        let (stream, _) = tokio_tungstenite::connect_async(url).await?;

        Ok(Self { stream })
    }

    /// Send an action to the server.
    pub async fn send(&mut self, action: &Action) -> Result<(), Error> {
        let text = serde_json::to_string(action)?;
        debug!(%action, "Sending");

        self.stream
            .send(tungstenite::Message::Text(text))
            .await
            .map_err(Error::from)
    }

    /// Wait for the next message from the server, whatever it is.
    pub async fn next_response(&mut self) -> Result<Response, Error> {
        loop {
            let message = self.stream.next().await.ok_or(Error::ConnectionClosed)??;

            match message {
                tungstenite::Message::Text(text) => {
                    trace!(%text, "Received");
                    return Ok(serde_json::from_str(&text)?);
                }
                tungstenite::Message::Close(_) => return Err(Error::ConnectionClosed),
                other => trace!(?other, "Skipping non-text message"),
            }
        }
    }

    /// Wait for the next message which is not an unprompted status update.
    ///
    /// Note that firmware errors found by polling are not skipped.
    pub async fn next_reply(&mut self) -> Result<Response, Error> {
        loop {
            let response = self.next_response().await?;

            if !response.is_status() {
                return Ok(response);
            }
        }
    }

    /// Send an action and wait for its reply.
    pub async fn request(&mut self, action: &Action) -> Result<Response, Error> {
        self.send(action).await?;
        self.next_reply().await
    }

    /// Close the connection.
    pub async fn close(mut self) -> Result<(), Error> {
        self.stream.close(None).await.map_err(Error::from)
    }
}
