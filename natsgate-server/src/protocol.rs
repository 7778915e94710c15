//! Text-frame wire protocol
//!
//! Client commands are plain text, matched case-sensitively: `ping`,
//! `login>:<scheme> <token>` and `topic>:<name>`. Replies are fixed
//! strings; forwarded bus payloads go out verbatim with no prefix.

pub const PING: &str = "ping";
pub const LOGIN_PREFIX: &str = "login>:";
pub const TOPIC_PREFIX: &str = "topic>:";

pub const PONG: &str = "pong";
pub const OK: &str = "ok";
pub const NOT_AUTHORIZED: &str = "login>:Not Authorized";
pub const GO_AWAY: &str = "go away";
pub const INVALID_TOPIC: &str = "invalid topic";
pub const TOPIC_UNAVAILABLE: &str = "topic>:Unavailable";
pub const BINARY_NOT_SUPPORTED: &str = "binary message is not supported yet";

/// A parsed client text frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Ping,
    /// Raw credential following `login>:`
    Login(&'a str),
    /// Topic name following `topic>:`
    Subscribe(&'a str),
    /// Anything else; ignored without a reply
    Unknown,
}

impl<'a> Command<'a> {
    pub fn parse(text: &'a str) -> Self {
        if text == PING {
            Command::Ping
        } else if let Some(credential) = text.strip_prefix(LOGIN_PREFIX) {
            Command::Login(credential)
        } else if let Some(topic) = text.strip_prefix(TOPIC_PREFIX) {
            Command::Subscribe(topic)
        } else {
            Command::Unknown
        }
    }
}

/// A frame received from a client, independent of the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
    /// The client closed the connection or the transport failed
    Close,
}

impl InboundFrame {
    /// Payload size in bytes
    pub fn len(&self) -> usize {
        match self {
            InboundFrame::Text(text) => text.len(),
            InboundFrame::Binary(data) => data.len(),
            InboundFrame::Close => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
