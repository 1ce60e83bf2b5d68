//! WebSocket connection handling
//!
//! One hub session per socket. Responses and pushed events share a single
//! outgoing channel so the socket has exactly one writer.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use lutron_core::Event;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::AppState;

use super::dispatch::handle_message;
use super::types::{EventMessage, OutgoingMessage};

/// Outgoing queue depth per session
const OUTGOING_CAPACITY: usize = 256;

/// Per-session state
pub struct ActiveConnection {
    pub state: AppState,
    /// Cancels the event forwarding task while the session is subscribed
    subscription: Mutex<Option<broadcast::Sender<()>>>,
}

impl ActiveConnection {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            subscription: Mutex::new(None),
        }
    }

    /// Start forwarding hub events to this session
    ///
    /// Subscribing again while subscribed is a no-op.
    pub async fn subscribe(&self, tx: &mpsc::Sender<OutgoingMessage>) {
        let mut subscription = self.subscription.lock().await;
        if subscription.is_some() {
            debug!("Session already subscribed to events");
            return;
        }

        let (cancel_tx, mut cancel_rx) = broadcast::channel::<()>(1);
        let mut event_rx = self.state.event_bus.subscribe_all();
        let tx = tx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_rx.recv() => {
                        debug!("Event subscription cancelled");
                        break;
                    }
                    result = event_rx.recv() => {
                        match result {
                            Ok(event) => {
                                if tx.send(to_event_message(event)).await.is_err() {
                                    break;
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!(skipped, "Session fell behind on events");
                                continue;
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
        });

        *subscription = Some(cancel_tx);
        info!("Session subscribed to events");
    }

    /// Stop forwarding hub events to this session
    pub async fn unsubscribe(&self) {
        if let Some(cancel_tx) = self.subscription.lock().await.take() {
            let _ = cancel_tx.send(());
            info!("Session unsubscribed from events");
        }
    }

    pub async fn is_subscribed(&self) -> bool {
        self.subscription.lock().await.is_some()
    }
}

fn to_event_message(event: Event<serde_json::Value>) -> OutgoingMessage {
    OutgoingMessage::Event(EventMessage::new(event.event_type.as_str(), event.data))
}

/// Handle a hub WebSocket session
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let conn = ActiveConnection::new(state);

    let (tx, mut rx) = mpsc::channel::<OutgoingMessage>(OUTGOING_CAPACITY);

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if send_message(&mut sender, &msg).await.is_err() {
                break;
            }
        }
    });

    info!("Hub connected");

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                debug!(message = %text, "Received");
                if let Err(e) = handle_message(&conn, &text, &tx).await {
                    warn!(error = %e, "Error handling message");
                }
            }
            Ok(Message::Close(_)) => {
                info!("Hub disconnected");
                break;
            }
            Ok(_) => {
                // Ping/pong is answered by axum; binary frames are not part of the protocol
            }
            Err(e) => {
                error!(error = %e, "WebSocket error");
                break;
            }
        }
    }

    conn.unsubscribe().await;
    send_task.abort();
    info!("WebSocket connection closed");
}

/// Send a message to the WebSocket
async fn send_message(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &OutgoingMessage,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    debug!(message = %json, "Sending");
    sender
        .send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
