//! Write half of an upgraded websocket

use async_trait::async_trait;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::SinkExt;
use futures::stream::SplitSink;
use natsgate_core::{FrameSink, OutboundFrame, SessionError};

/// [`FrameSink`] writing to an axum websocket
pub struct WsSink {
    sender: SplitSink<WebSocket, Message>,
}

impl WsSink {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self { sender }
    }
}

fn to_message(frame: OutboundFrame) -> Message {
    match frame {
        OutboundFrame::Text(text) => Message::Text(text.into()),
        OutboundFrame::Close(reason) => Message::Close(Some(CloseFrame {
            code: reason.code(),
            reason: reason.reason().into(),
        })),
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_frame(&mut self, frame: OutboundFrame) -> Result<(), SessionError> {
        self.sender
            .send(to_message(frame))
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.sender
            .close()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }
}
