use std::{sync::Arc, time::Duration};

use engine::{Response, Schema, ServerError};
use futures_util::{pin_mut, Sink, SinkExt, Stream, StreamExt};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::Instrument;

use crate::{
    keep_alive::KeepAlive,
    messages::{CloseFrame, Event, Frame, Message},
    operations::{OperationManager, Observer},
    ProtocolError,
};

/// The schema connections bind to on `connection_init`. `None` until a schema is available.
pub type SchemaWatcher = watch::Receiver<Option<Schema>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for `connection_init`.
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Period of the `ka` messages. Disabled with `None`.
    pub keep_alive_interval: Option<Duration>,
    /// Messages queued for the socket before producers wait.
    pub outbound_buffer: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            keep_alive_interval: Some(Duration::from_secs(10)),
            outbound_buffer: 16,
        }
    }
}

/// What the outbound pump writes to the transport.
#[derive(Debug)]
pub(crate) enum Outgoing {
    Message(Message),
    Close(CloseFrame),
}

/// Serves one connection until the client terminates it, closes it or the transport ends.
///
/// Inbound frames are handled one at a time. Outbound frames go through a single task owning
/// the sink, fed by the operations, the keep-alive and the receive loop.
pub async fn serve<I, O>(
    schema: SchemaWatcher,
    settings: ConnectionSettings,
    inbound: I,
    outbound: O,
) -> ConnectionState
where
    I: Stream<Item = Frame> + Send,
    O: Sink<Frame> + Send + Unpin + 'static,
    O::Error: std::fmt::Display + Send,
{
    let session_id = ulid::Ulid::new().to_string();
    let span = tracing::info_span!("graphql-ws connection", %session_id);

    async move {
        let (sender, receiver) = mpsc::channel(settings.outbound_buffer.max(1));
        let pump = spawn_pump(outbound, receiver);

        let mut connection = Connection {
            state: ConnectionState::Connecting,
            session_id,
            schema,
            settings,
            sender,
            operations: None,
            keep_alive: None,
        };

        let closed_by_us = connection.receive_loop(inbound).await;
        let Connection { sender, .. } = connection;
        drop(sender);

        if closed_by_us {
            pump.await.ok();
        } else {
            pump.abort();
        }

        tracing::debug!("connection closed");
        ConnectionState::Closed
    }
    .instrument(span)
    .await
}

struct Connection {
    state: ConnectionState,
    session_id: String,
    schema: SchemaWatcher,
    settings: ConnectionSettings,
    sender: mpsc::Sender<Outgoing>,
    operations: Option<Arc<OperationManager<OperationObserver>>>,
    keep_alive: Option<KeepAlive>,
}

impl Connection {
    /// Returns whether a close frame was queued for the client.
    async fn receive_loop<I>(&mut self, inbound: I) -> bool
    where
        I: Stream<Item = Frame> + Send,
    {
        pin_mut!(inbound);

        while let Some(frame) = inbound.next().await {
            let event = match frame {
                Frame::Text(text) => serde_json::from_str::<Event>(&text),
                Frame::Binary(bytes) => serde_json::from_slice::<Event>(&bytes),
                Frame::Ping(_) | Frame::Pong(_) => continue,
                Frame::Close(frame) => {
                    let frame = frame.unwrap_or_else(CloseFrame::normal);
                    tracing::debug!(code = frame.code, reason = %frame.reason, "client closed the connection");
                    self.close(frame).await;
                    return true;
                }
            };

            let event = match event {
                Ok(event) => event,
                Err(error) => {
                    tracing::warn!(%error, "error decoding websocket message");
                    continue;
                }
            };

            if self.handle_event(event).await {
                return true;
            }
        }

        tracing::debug!("transport ended");
        self.shutdown();
        false
    }

    /// Returns `true` once the connection is closed.
    async fn handle_event(&mut self, event: Event) -> bool {
        match (self.state, event) {
            (ConnectionState::Connecting, Event::ConnectionInit { .. }) => {
                let schema = self.schema.borrow().clone();

                match schema {
                    Some(schema) => {
                        let observer = OperationObserver {
                            sender: self.sender.clone(),
                        };
                        self.operations = Some(Arc::new(OperationManager::new(
                            schema,
                            self.session_id.clone(),
                            observer,
                        )));
                        self.state = ConnectionState::Open;
                        self.send(Message::ConnectionAck).await;

                        if let Some(period) = self.settings.keep_alive_interval {
                            self.keep_alive = Some(KeepAlive::spawn(period, self.sender.clone()));
                        }
                    }
                    None => {
                        tracing::warn!("connection_init without a schema");
                        self.send(Message::connection_error(ProtocolError::SchemaUnavailable))
                            .await;
                    }
                }
            }
            (ConnectionState::Open, Event::ConnectionInit { .. }) => {
                tracing::debug!("ignoring repeated connection_init");
            }
            (ConnectionState::Open, Event::Start { id, payload }) => {
                if let Some(operations) = &self.operations {
                    tracing::debug!(operation_id = %id, "start");
                    operations.subscribe(&id, payload).await;
                }
            }
            (ConnectionState::Open, Event::Stop { id }) => {
                let stopped = self
                    .operations
                    .as_ref()
                    .is_some_and(|operations| operations.unsubscribe(&id));

                if stopped {
                    self.send(Message::Complete { id }).await;
                } else {
                    self.send(Message::error(id.clone(), ProtocolError::UnknownOperation(id)))
                        .await;
                }
            }
            (ConnectionState::Open, Event::ConnectionTerminate) => {
                tracing::debug!("connection_terminate");
                self.close(CloseFrame::normal()).await;
                return true;
            }
            (_, Event::Unknown) => {
                tracing::debug!("ignoring message of unknown type");
            }
            (state, event) => {
                tracing::debug!(?state, ?event, "ignoring message");
            }
        }

        false
    }

    async fn send(&self, message: Message) {
        if self.sender.send(Outgoing::Message(message)).await.is_err() {
            tracing::debug!("outbound pump is gone");
        }
    }

    async fn close(&mut self, frame: CloseFrame) {
        self.shutdown();
        self.sender.send(Outgoing::Close(frame)).await.ok();
    }

    /// Stops the keep-alive and every operation.
    fn shutdown(&mut self) {
        self.state = ConnectionState::Closing;

        if let Some(mut keep_alive) = self.keep_alive.take() {
            keep_alive.stop();
        }

        if let Some(operations) = self.operations.take() {
            operations.dispose_all();
        }

        self.state = ConnectionState::Closed;
    }
}

fn spawn_pump<O>(mut sink: O, mut receiver: mpsc::Receiver<Outgoing>) -> JoinHandle<()>
where
    O: Sink<Frame> + Send + Unpin + 'static,
    O::Error: std::fmt::Display + Send,
{
    tokio::spawn(
        async move {
            while let Some(outgoing) = receiver.recv().await {
                let (frame, last) = match outgoing {
                    Outgoing::Message(message) => match Frame::try_from(message) {
                        Ok(frame) => (frame, false),
                        Err(error) => {
                            tracing::warn!(%error, "couldn't encode websocket message");
                            continue;
                        }
                    },
                    Outgoing::Close(frame) => (Frame::Close(Some(frame)), true),
                };

                if let Err(error) = sink.send(frame).await {
                    tracing::debug!(%error, "couldn't write to the socket");
                    break;
                }

                if last {
                    break;
                }
            }

            sink.close().await.ok();
        }
        .in_current_span(),
    )
}

/// Frames the outcome of operations as protocol messages.
struct OperationObserver {
    sender: mpsc::Sender<Outgoing>,
}

#[async_trait::async_trait]
impl Observer for OperationObserver {
    async fn on_next(&self, id: &str, response: Response) {
        let message = Message::Data {
            id: id.to_string(),
            payload: response,
        };
        self.sender.send(Outgoing::Message(message)).await.ok();
    }

    async fn on_error(&self, id: &str, error: ServerError) {
        self.sender.send(Outgoing::Message(Message::error(id, error))).await.ok();
    }

    async fn on_completed(&self, id: &str) {
        let message = Message::Complete { id: id.to_string() };
        self.sender.send(Outgoing::Message(message)).await.ok();
    }
}
