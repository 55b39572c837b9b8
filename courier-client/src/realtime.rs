//! Push-channel listener with reconnect backoff.
//!
//! The listener only ever *invalidates*: a relevant event triggers a
//! confirmed-thread refresh upstream, it never mutates messages directly.
//! Connection failures are silent to the user; polling and manual refresh
//! remain the fallback source of truth.

use crate::api_client::PushClient;
use crate::events::ClientEvent;
use crate::push::{PushEvent, PushScope};
use courier_core::PushError;
use futures_util::StreamExt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Connection lifecycle of the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Connecting,
    Open,
    Closed,
}

/// Handle to a running push subscription.
///
/// This is the single disposer for the subscription: `close()` and `Drop`
/// both abort the background task, so the handler is detached on every exit
/// path (conversation switch, engine teardown, error).
#[derive(Debug)]
pub struct PushSubscription {
    handle: JoinHandle<()>,
    scope: PushScope,
}

impl PushSubscription {
    pub fn scope(&self) -> PushScope {
        self.scope
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn close(self) {
        self.handle.abort();
    }
}

impl Drop for PushSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn the push manager for one subscription scope.
///
/// Decoded events are forwarded as [`ClientEvent::Push`]; events that are
/// relevant under `scope` additionally produce a
/// [`ClientEvent::ThreadInvalidated`]. Malformed frames are logged and
/// dropped at this boundary.
pub fn spawn_push_manager(
    push: PushClient,
    scope: PushScope,
    sender: mpsc::Sender<ClientEvent>,
) -> PushSubscription {
    let handle = tokio::spawn(async move {
        let mut state = ListenerState::Connecting;
        let mut backoff = push.reconnect_config().initial_ms;
        loop {
            match push.connect().await {
                Ok(mut stream) => {
                    state = ListenerState::Open;
                    tracing::debug!(state = ?state, "push channel open");
                    let _ = sender
                        .send(ClientEvent::Push(Box::new(PushEvent::Connected)))
                        .await;
                    backoff = push.reconnect_config().initial_ms;

                    while let Some(message) = stream.next().await {
                        match message {
                            Ok(Message::Text(text)) => {
                                match serde_json::from_str::<PushEvent>(&text) {
                                    Ok(event) => {
                                        let invalidated = event.invalidates(scope);
                                        let _ =
                                            sender.send(ClientEvent::Push(Box::new(event))).await;
                                        if let Some(conversation_id) = invalidated {
                                            let _ = sender
                                                .send(ClientEvent::ThreadInvalidated(
                                                    conversation_id,
                                                ))
                                                .await;
                                        }
                                    }
                                    Err(err) => {
                                        let err = PushError::MalformedPayload {
                                            reason: err.to_string(),
                                        };
                                        tracing::warn!(error = %err, "dropping malformed push frame");
                                    }
                                }
                            }
                            Ok(Message::Binary(_)) => {}
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {}
                            Err(err) => {
                                tracing::debug!(error = %err, "push stream error");
                                break;
                            }
                        }
                    }

                    state = ListenerState::Connecting;
                    let _ = sender
                        .send(ClientEvent::Push(Box::new(PushEvent::Disconnected {
                            reason: "connection closed".to_string(),
                        })))
                        .await;
                }
                Err(err) => {
                    tracing::debug!(error = %err, state = ?state, "push connect failed");
                }
            }

            // No consumer left means no one to invalidate for; stop instead
            // of reconnecting forever.
            if sender.is_closed() {
                state = ListenerState::Closed;
                tracing::debug!(
                    state = ?state,
                    error = %PushError::ChannelClosed,
                    "push listener stopping"
                );
                return;
            }

            let delay = jittered_backoff(backoff, push.reconnect_config().jitter_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let next = (backoff as f64 * push.reconnect_config().multiplier) as u64;
            backoff = next.min(push.reconnect_config().max_ms);
        }
    });

    PushSubscription { handle, scope }
}

fn jittered_backoff(base_ms: u64, jitter_ms: u64) -> u64 {
    if jitter_ms == 0 {
        return base_ms;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_nanos(0))
        .subsec_nanos() as u64;
    let jitter = nanos % jitter_ms;
    base_ms.saturating_add(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, ClientConfig, ReconnectConfig};

    fn unreachable_config() -> ClientConfig {
        ClientConfig {
            api_base_url: "http://127.0.0.1:1".to_string(),
            push_endpoint: "ws://127.0.0.1:1".to_string(),
            auth: AuthConfig {
                api_key: Some("test-key".to_string()),
                jwt: None,
            },
            request_timeout_ms: 100,
            refresh_interval_ms: 1_000,
            reconnect: ReconnectConfig {
                initial_ms: 10,
                max_ms: 20,
                multiplier: 1.0,
                jitter_ms: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_listener_stops_when_consumer_is_dropped() {
        let push = PushClient::new(&unreachable_config()).unwrap();
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);

        let subscription = spawn_push_manager(push, PushScope::All, sender);
        for _ in 0..100 {
            if subscription.is_closed() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("listener should stop once the consumer is gone");
    }

    #[test]
    fn test_jittered_backoff_without_jitter() {
        assert_eq!(jittered_backoff(500, 0), 500);
    }

    #[test]
    fn test_jittered_backoff_bounded() {
        for _ in 0..32 {
            let delay = jittered_backoff(500, 250);
            assert!((500..750).contains(&delay));
        }
    }
}
