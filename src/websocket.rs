use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, WebSocketUpgrade,
    },
    response::IntoResponse,
    Extension, TypedHeader,
};
use futures::{sink::Sink, stream::Stream, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use crate::{actions::Action, actions::Response, config::Config, peer::Peer, serial::Connector};

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    user_agent: Option<TypedHeader<headers::UserAgent>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Extension(connector): Extension<Arc<dyn Connector>>,
    Extension(config): Extension<Config>,
) -> impl IntoResponse {
    if let Some(TypedHeader(user_agent)) = user_agent {
        info!("`{}`@`{addr}` connected", user_agent.as_str());
    }

    ws.on_upgrade(move |socket| {
        let span = info_span!("Session", id = %Uuid::new_v4(), %addr);

        handle_websocket(socket, connector, config).instrument(span)
    })
}

pub(crate) async fn read<S>(mut receiver: S, peer: Peer, sender: mpsc::UnboundedSender<Response>)
where
    S: Unpin,
    S: Stream<Item = Result<Message, axum::Error>>,
{
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(request_text) => {
                trace!(%request_text, "peer request");
                match serde_json::from_str::<Action>(&request_text) {
                    Ok(action) => {
                        let span = info_span!("Action", %action);
                        if let Some(response) = peer.do_user_action(action).instrument(span).await {
                            if sender.send(response).is_err() {
                                debug!("writer gone");
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        debug!(%e, "ignoring request which is not an action");
                    }
                }
            }
            Message::Binary(_) => {
                debug!("client sent binary data");
            }
            Message::Ping(_) => {
                debug!("socket ping");
            }
            Message::Pong(_) => {
                debug!("socket pong");
            }
            Message::Close(_) => {
                debug!("client disconnected");
                break;
            }
        }
    }

    peer.shutdown().await;

    debug!("no more stuff");
}

pub(crate) async fn write(
    mut sender: impl Sink<Message> + Unpin,
    mut receiver: mpsc::UnboundedReceiver<Response>,
) {
    while let Some(response) = receiver.recv().await {
        match &response {
            Response::Error { text } => info!("Error response: <{text}>"),
            Response::Position { .. } | Response::Status { .. } => trace!("Response: <{response}>"),
            _ => debug!("Response: <{response}>"),
        }

        let response = match serde_json::to_string(&response) {
            Ok(response) => response,
            Err(e) => {
                warn!(%e, "Could not serialize response");
                continue;
            }
        };

        if sender.send(Message::Text(response)).await.is_err() {
            debug!("client disconnected");
            return;
        }
        trace!("Reply flushed");
    }
}

pub(crate) async fn handle_websocket(
    websocket: WebSocket,
    connector: Arc<dyn Connector>,
    config: Config,
) {
    let (stream_sender, stream_receiver) = websocket.split();
    let (response_sender, response_receiver) = mpsc::unbounded_channel::<Response>();

    let peer = Peer::new(connector, &config, response_sender.clone());

    let read_handle = tokio::spawn(
        read(stream_receiver, peer, response_sender).instrument(info_span!("Read")),
    );
    let write_handle =
        tokio::spawn(write(stream_sender, response_receiver).instrument(info_span!("Write")));

    match read_handle.await {
        Ok(()) => debug!("Read task joined"),
        Err(e) => warn!("Read task join error: {e:?}"),
    }

    debug!("Aborting write task");
    // This ensures the underlying TCP connection gets closed,
    // which signals the peer that the session is over.
    write_handle.abort();
}
