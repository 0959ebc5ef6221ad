//! Message definitions for the [graphql-ws protocol][1], the dialect of the
//! `subscriptions-transport-ws` library.
//!
//! [1]: https://github.com/apollographql/subscriptions-transport-ws/blob/master/PROTOCOL.md

use engine::{Request, Response, ServerError};

/// A message sent by the client.
#[derive(serde::Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ConnectionInit {
        #[serde(default)]
        payload: Option<serde_json::Value>,
    },
    Start {
        id: String,
        payload: Request,
    },
    Stop {
        id: String,
    },
    ConnectionTerminate,
    /// Any other message type, which is ignored.
    #[serde(other)]
    Unknown,
}

/// A message sent by the server.
#[derive(serde::Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    ConnectionAck,
    ConnectionError {
        payload: ErrorPayload,
    },
    Data {
        id: String,
        payload: Response,
    },
    Error {
        id: String,
        payload: ErrorPayload,
    },
    Complete {
        id: String,
    },
    #[serde(rename = "ka")]
    KeepAlive,
}

#[derive(serde::Serialize, Debug)]
pub struct ErrorPayload {
    pub error: ServerError,
}

impl Message {
    pub fn connection_error(error: impl Into<ServerError>) -> Self {
        Message::ConnectionError {
            payload: ErrorPayload { error: error.into() },
        }
    }

    pub fn error(id: impl Into<String>, error: impl Into<ServerError>) -> Self {
        Message::Error {
            id: id.into(),
            payload: ErrorPayload { error: error.into() },
        }
    }
}

/// A transport frame, independent of the websocket library carrying it.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<CloseFrame>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl CloseFrame {
    pub const NORMAL: u16 = 1000;

    pub fn normal() -> Self {
        Self {
            code: Self::NORMAL,
            reason: String::new(),
        }
    }
}

impl TryFrom<Message> for Frame {
    type Error = serde_json::Error;

    fn try_from(message: Message) -> Result<Self, Self::Error> {
        Ok(Frame::Text(serde_json::to_string(&message)?))
    }
}
