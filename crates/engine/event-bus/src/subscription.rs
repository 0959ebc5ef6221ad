use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::Filter;

/// Identifies the owner of a subscription: the connection session and the operation id
/// the client chose for it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId {
    pub session_id: String,
    pub operation_id: String,
}

impl ClientId {
    pub fn new(session_id: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            operation_id: operation_id.into(),
        }
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.session_id, self.operation_id)
    }
}

/// Handle returned by a successful registration, used to remove exactly that registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

#[derive(Clone, Debug)]
pub enum ChannelSelector {
    All,
    Channel(String),
}

impl ChannelSelector {
    pub(crate) fn matches(&self, channel: &str) -> bool {
        match self {
            ChannelSelector::All => true,
            ChannelSelector::Channel(name) => name == channel,
        }
    }
}

/// A registered interest in a channel. `Op` is whatever the caller needs to re-run
/// when an event matches, typically a prepared operation and its variables.
pub struct EventSubscription<Op> {
    pub client_id: ClientId,
    pub channel: String,
    pub filter: Filter,
    pub operation: Arc<Op>,
    sender: mpsc::UnboundedSender<Notification<Op>>,
}

impl<Op> EventSubscription<Op> {
    pub fn new(
        client_id: ClientId,
        channel: impl Into<String>,
        filter: Filter,
        operation: Arc<Op>,
        sender: mpsc::UnboundedSender<Notification<Op>>,
    ) -> Self {
        Self {
            client_id,
            channel: channel.into(),
            filter,
            operation,
            sender,
        }
    }

    pub(crate) fn is_equivalent(&self, other: &Self) -> bool {
        self.client_id == other.client_id && self.channel == other.channel && self.filter == other.filter
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub(crate) fn notify(&self, payload: &Arc<Value>) -> bool {
        self.sender
            .send(Notification {
                client_id: self.client_id.clone(),
                channel: self.channel.clone(),
                payload: Arc::clone(payload),
                operation: Arc::clone(&self.operation),
            })
            .is_ok()
    }
}

impl<Op> std::fmt::Debug for EventSubscription<Op> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("client_id", &self.client_id)
            .field("channel", &self.channel)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

/// Emitted for every subscription whose filter matched a published payload.
pub struct Notification<Op> {
    pub client_id: ClientId,
    pub channel: String,
    pub payload: Arc<Value>,
    pub operation: Arc<Op>,
}

impl<Op> std::fmt::Debug for Notification<Op> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("client_id", &self.client_id)
            .field("channel", &self.channel)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}
