//! Forwarding from a bus subscription to a session
//!
//! Each subscribe command gets its own task. Payloads are sent to the
//! client verbatim as text frames through the session's send gate. The task
//! ends when the session closes, when a send fails, or when the bus ends
//! the subscription; the subscription is dropped with it.

use std::sync::Arc;

use futures::StreamExt;
use natsgate_bus::BusSubscription;
use natsgate_core::Session;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub fn spawn_forward(
    session: Arc<Session>,
    topic: String,
    mut subscription: BusSubscription,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let shutdown = session.shutdown_token();
        loop {
            let payload = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = subscription.next() => match next {
                    Some(payload) => payload,
                    None => {
                        debug!(session_id = %session.id(), topic = %topic, "bus subscription ended");
                        break;
                    }
                },
            };

            if session.is_closed() {
                break;
            }
            let text = match String::from_utf8(payload.to_vec()) {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        session_id = %session.id(),
                        topic = %topic,
                        size = payload.len(),
                        error = %e,
                        "skipping non-UTF-8 payload"
                    );
                    continue;
                }
            };
            if let Err(e) = session.send_text(text).await {
                debug!(session_id = %session.id(), topic = %topic, error = %e, "forward failed");
                break;
            }
        }
        debug!(session_id = %session.id(), topic = %topic, "forwarding stopped");
    })
}
