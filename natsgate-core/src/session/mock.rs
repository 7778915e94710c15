//! In-memory frame sink for tests
//!
//! RecordingSink forwards every frame to a channel so tests can assert on
//! exactly what a session would have written to its socket.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::outbound::{CloseReason, FrameSink, OutboundFrame};
use crate::error::SessionError;

/// FrameSink that records frames instead of writing them
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<OutboundFrame>,
    closed: bool,
    fail_sends: bool,
}

impl RecordingSink {
    /// Create a sink and the receiver observing it
    pub fn new() -> (Self, SentFrames) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                closed: false,
                fail_sends: false,
            },
            SentFrames { rx },
        )
    }

    /// Create a sink whose sends always fail, simulating a dead socket
    pub fn failing() -> (Self, SentFrames) {
        let (mut sink, sent) = Self::new();
        sink.fail_sends = true;
        (sink, sent)
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send_frame(&mut self, frame: OutboundFrame) -> Result<(), SessionError> {
        if self.closed || self.fail_sends {
            return Err(SessionError::Transport("sink closed".to_string()));
        }
        self.tx
            .send(frame)
            .map_err(|_| SessionError::Transport("receiver dropped".to_string()))
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed = true;
        Ok(())
    }
}

/// Receiving side of a [`RecordingSink`]
pub struct SentFrames {
    rx: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl SentFrames {
    /// Wait up to one second for the next frame
    pub async fn next(&mut self) -> Option<OutboundFrame> {
        tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Wait for the next frame and return it if it is text
    pub async fn next_text(&mut self) -> Option<String> {
        match self.next().await {
            Some(OutboundFrame::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Wait for the next frame and return the close reason if it is a close
    pub async fn next_close(&mut self) -> Option<CloseReason> {
        match self.next().await {
            Some(OutboundFrame::Close(reason)) => Some(reason),
            _ => None,
        }
    }

    /// Return a frame only if one is already queued
    pub fn try_next(&mut self) -> Option<OutboundFrame> {
        self.rx.try_recv().ok()
    }
}
