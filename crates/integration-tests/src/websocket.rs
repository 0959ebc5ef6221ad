//! A graphql-ws connection served over in-memory channels.

use std::time::Duration;

use engine::Schema;
use engine_websocket::{CloseFrame, ConnectionSettings, ConnectionState, Frame};
use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    StreamExt,
};
use serde_json::Value;
use tokio::{sync::watch, task::JoinHandle};

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestConnection {
    client: UnboundedSender<Frame>,
    server: UnboundedReceiver<Frame>,
    schema: watch::Sender<Option<Schema>>,
    handle: JoinHandle<ConnectionState>,
}

impl TestConnection {
    /// Serves a connection with keep-alive disabled.
    pub fn new(schema: Option<Schema>) -> Self {
        Self::with_settings(
            schema,
            ConnectionSettings {
                keep_alive_interval: None,
                ..ConnectionSettings::default()
            },
        )
    }

    pub fn with_settings(schema: Option<Schema>, settings: ConnectionSettings) -> Self {
        let (client, inbound) = mpsc::unbounded();
        let (outbound, server) = mpsc::unbounded();
        let (schema, watcher) = watch::channel(schema);

        let handle = tokio::spawn(engine_websocket::serve(watcher, settings, inbound, outbound));

        TestConnection {
            client,
            server,
            schema,
            handle,
        }
    }

    /// Serves a connection and acknowledges `connection_init`.
    pub async fn initialized(schema: Schema) -> Self {
        let mut connection = Self::new(Some(schema));
        connection.send(serde_json::json!({ "type": "connection_init" }));
        assert_eq!(connection.next_message().await["type"], "connection_ack");
        connection
    }

    pub fn set_schema(&self, schema: Option<Schema>) {
        self.schema.send_replace(schema);
    }

    pub fn send(&self, message: Value) {
        self.send_frame(Frame::Text(message.to_string()));
    }

    pub fn send_frame(&self, frame: Frame) {
        self.client.unbounded_send(frame).unwrap();
    }

    pub async fn next_frame(&mut self) -> Option<Frame> {
        tokio::time::timeout(RECEIVE_TIMEOUT, self.server.next())
            .await
            .expect("timed out waiting for a frame")
    }

    pub async fn next_message(&mut self) -> Value {
        match self.next_frame().await {
            Some(Frame::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    pub async fn next_close(&mut self) -> CloseFrame {
        match self.next_frame().await {
            Some(Frame::Close(Some(frame))) => frame,
            other => panic!("expected a close frame, got {other:?}"),
        }
    }

    /// Asserts the server sends nothing for a while.
    pub async fn assert_silent(&mut self, period: Duration) {
        if let Ok(frame) = tokio::time::timeout(period, self.server.next()).await {
            panic!("expected no frame, got {frame:?}");
        }
    }

    /// Ends the client side of the transport and waits for the connection to finish.
    pub async fn finished(self) -> ConnectionState {
        let TestConnection { client, handle, .. } = self;
        drop(client);

        tokio::time::timeout(RECEIVE_TIMEOUT, handle)
            .await
            .expect("timed out waiting for the connection to finish")
            .unwrap()
    }
}
