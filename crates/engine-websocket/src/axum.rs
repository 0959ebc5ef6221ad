use axum::{
    extract::ws::{self, WebSocket, WebSocketUpgrade},
    response::Response,
};
use futures_util::{future, SinkExt, StreamExt};

use crate::{
    connection::{serve, ConnectionSettings, ConnectionState, SchemaWatcher},
    messages::{CloseFrame, Frame},
};

/// The websocket sub-protocol spoken by the server.
pub const PROTOCOL: &str = "graphql-ws";

/// Accepts websocket upgrades and serves the graphql-ws protocol on them.
#[derive(Clone)]
pub struct WebsocketService {
    schema: SchemaWatcher,
    settings: ConnectionSettings,
}

impl WebsocketService {
    pub fn new(schema: SchemaWatcher, settings: ConnectionSettings) -> Self {
        Self { schema, settings }
    }

    pub fn upgrade(&self, upgrade: WebSocketUpgrade) -> Response {
        let service = self.clone();

        upgrade
            .protocols([PROTOCOL])
            .on_upgrade(move |socket| async move {
                service.serve_socket(socket).await;
            })
    }

    pub async fn serve_socket(self, socket: WebSocket) -> ConnectionState {
        let (sink, stream) = socket.split();

        let inbound = stream.scan((), |(), message| {
            future::ready(match message {
                Ok(message) => Some(Frame::from(message)),
                Err(error) => {
                    tracing::warn!(%error, "error receiving websocket message");
                    None
                }
            })
        });

        let outbound = sink.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(ws::Message::from(frame))));

        serve(self.schema, self.settings, inbound, outbound).await
    }
}

impl From<ws::Message> for Frame {
    fn from(message: ws::Message) -> Self {
        match message {
            ws::Message::Text(text) => Frame::Text(text),
            ws::Message::Binary(bytes) => Frame::Binary(bytes),
            ws::Message::Ping(bytes) => Frame::Ping(bytes),
            ws::Message::Pong(bytes) => Frame::Pong(bytes),
            ws::Message::Close(frame) => Frame::Close(frame.map(|frame| CloseFrame {
                code: frame.code,
                reason: frame.reason.into_owned(),
            })),
        }
    }
}

impl From<Frame> for ws::Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(text) => ws::Message::Text(text),
            Frame::Binary(bytes) => ws::Message::Binary(bytes),
            Frame::Ping(bytes) => ws::Message::Ping(bytes),
            Frame::Pong(bytes) => ws::Message::Pong(bytes),
            Frame::Close(frame) => ws::Message::Close(frame.map(|frame| ws::CloseFrame {
                code: frame.code,
                reason: frame.reason.into(),
            })),
        }
    }
}
