//! Courier Test Utilities
//!
//! Centralized test infrastructure for the Courier workspace:
//! - Proptest generators for message and conversation types
//! - A scripted mock transport for engine tests
//! - Fixtures for common scenarios

pub use courier_core::{
    new_echo_id, reconcile, AccountId, Attachment, Channel, ChatRoute, ConversationId,
    ConversationSummary, CourierError, CourierResult, DeliveryState, EchoId, EntityIdType, Message,
    MessageId, PendingMessage, SendError, SyncError, ThreadEntry, Timestamp, MATCH_WINDOW_MS,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use courier_client::api_client::{ApiClientError, MessageTransport};
use courier_client::types::{
    ConversationResponse, ListConversationsRequest, ListConversationsResponse, MessageResponse,
    SendMessageRequest, SendMessageResponse, StatusResponse, ThreadResponse,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use uuid::Uuid;

// ============================================================================
// MOCK TRANSPORT
// ============================================================================

/// A recorded transport call, in invocation order.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    FetchThread(ConversationId),
    SendMessage { chat_id: String, body: String },
    UpdateConversation(ConversationId),
    ListConversations,
}

#[derive(Debug)]
enum ScriptedSend {
    Ok(SendMessageResponse),
    Reject { status: u16, message: String },
    Network(String),
}

#[derive(Default)]
struct MockState {
    threads: HashMap<ConversationId, Vec<MessageResponse>>,
    fetch_errors: VecDeque<String>,
    send_results: VecDeque<ScriptedSend>,
    update_errors: VecDeque<(u16, String)>,
    conversations: Vec<ConversationResponse>,
    calls: Vec<MockCall>,
    fetch_gate: Option<Arc<Semaphore>>,
    send_gate: Option<Arc<Semaphore>>,
}

/// Scripted in-memory transport.
///
/// Defaults to the happy path: fetches return whatever `set_thread` stored,
/// sends are accepted with a null message body, updates succeed. Failures
/// and acknowledgment payloads are queued per call; gates let a test hold a
/// call mid-flight to force an interleaving.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the confirmed thread the next fetches will return.
    pub fn set_thread(&self, conversation_id: ConversationId, messages: Vec<MessageResponse>) {
        self.state
            .lock()
            .unwrap()
            .threads
            .insert(conversation_id, messages);
    }

    /// Make the next `fetch_thread` call fail.
    pub fn fail_next_fetch(&self, reason: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .fetch_errors
            .push_back(reason.into());
    }

    /// Queue a successful send acknowledgment, optionally echoing a message.
    pub fn queue_send_success(&self, message: Option<MessageResponse>) {
        self.state
            .lock()
            .unwrap()
            .send_results
            .push_back(ScriptedSend::Ok(SendMessageResponse {
                status: "accepted".to_string(),
                message,
            }));
    }

    /// Queue a backend rejection for the next send.
    pub fn queue_send_reject(&self, status: u16, message: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .send_results
            .push_back(ScriptedSend::Reject {
                status,
                message: message.into(),
            });
    }

    /// Queue a connection failure for the next send.
    pub fn queue_send_network_error(&self, reason: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .send_results
            .push_back(ScriptedSend::Network(reason.into()));
    }

    /// Make the next `update_conversation` call fail.
    pub fn fail_next_update(&self, status: u16, message: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .update_errors
            .push_back((status, message.into()));
    }

    pub fn set_conversations(&self, conversations: Vec<ConversationResponse>) {
        self.state.lock().unwrap().conversations = conversations;
    }

    /// Hold every send until the returned semaphore gets a permit.
    pub fn gate_sends(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.state.lock().unwrap().send_gate = Some(gate.clone());
        gate
    }

    /// Hold every fetch until the returned semaphore gets a permit.
    pub fn gate_fetches(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.state.lock().unwrap().fetch_gate = Some(gate.clone());
        gate
    }

    /// The calls made so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    async fn wait_on(gate: Option<Arc<Semaphore>>) {
        if let Some(gate) = gate {
            // Permit is consumed so each release unblocks exactly one call.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }
}

#[async_trait]
impl MessageTransport for MockTransport {
    async fn fetch_thread(
        &self,
        conversation_id: ConversationId,
    ) -> Result<ThreadResponse, ApiClientError> {
        let (gate, result) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(MockCall::FetchThread(conversation_id));
            let result = match state.fetch_errors.pop_front() {
                Some(reason) => Err(ApiClientError::Connection(reason)),
                None => Ok(ThreadResponse {
                    conversation_id: conversation_id.as_uuid(),
                    messages: state
                        .threads
                        .get(&conversation_id)
                        .cloned()
                        .unwrap_or_default(),
                }),
            };
            (state.fetch_gate.clone(), result)
        };
        Self::wait_on(gate).await;
        result
    }

    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ApiClientError> {
        let (gate, result) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(MockCall::SendMessage {
                chat_id: request.chat_id.clone(),
                body: request.body.clone(),
            });
            let result = match state.send_results.pop_front() {
                Some(ScriptedSend::Ok(response)) => Ok(response),
                Some(ScriptedSend::Reject { status, message }) => {
                    Err(ApiClientError::Status { status, message })
                }
                Some(ScriptedSend::Network(reason)) => Err(ApiClientError::Connection(reason)),
                None => Ok(SendMessageResponse {
                    status: "accepted".to_string(),
                    message: None,
                }),
            };
            (state.send_gate.clone(), result)
        };
        Self::wait_on(gate).await;
        result
    }

    async fn update_conversation(
        &self,
        conversation_id: ConversationId,
        _request: &courier_client::types::UpdateConversationRequest,
    ) -> Result<StatusResponse, ApiClientError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(MockCall::UpdateConversation(conversation_id));
        match state.update_errors.pop_front() {
            Some((status, message)) => Err(ApiClientError::Status { status, message }),
            None => Ok(StatusResponse {
                status: "ok".to_string(),
            }),
        }
    }

    async fn list_conversations(
        &self,
        _request: &ListConversationsRequest,
    ) -> Result<ListConversationsResponse, ApiClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::ListConversations);
        Ok(ListConversationsResponse {
            conversations: state.conversations.clone(),
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Hand-built values for scenario tests.

    use super::*;

    /// A fixed base timestamp so offsets in tests read as plain numbers.
    pub fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    pub fn conversation_id() -> ConversationId {
        ConversationId::new(Uuid::now_v7())
    }

    pub fn route() -> ChatRoute {
        ChatRoute::new("chat-77", "acct-3")
    }

    pub fn confirmed_message(
        conversation_id: ConversationId,
        body: &str,
        created_at: Timestamp,
    ) -> Message {
        Message {
            message_id: MessageId::new(Uuid::now_v7()),
            conversation_id,
            body: body.to_string(),
            attachments: Vec::new(),
            outbound: true,
            created_at,
            local_echo: None,
        }
    }

    pub fn pending_message(
        conversation_id: ConversationId,
        body: &str,
        created_at: Timestamp,
    ) -> PendingMessage {
        PendingMessage {
            echo_id: new_echo_id(),
            conversation_id,
            route: route(),
            body: body.to_string(),
            attachments: Vec::new(),
            created_at,
            delivery_state: DeliveryState::Sending,
            server_id: None,
        }
    }

    pub fn message_response(
        conversation_id: ConversationId,
        body: &str,
        created_at: Timestamp,
    ) -> MessageResponse {
        MessageResponse {
            message_id: Uuid::now_v7(),
            conversation_id: conversation_id.as_uuid(),
            body: body.to_string(),
            attachments: Vec::new(),
            outbound: true,
            created_at,
        }
    }

    pub fn conversation_response(
        conversation_id: ConversationId,
        display_name: &str,
    ) -> ConversationResponse {
        ConversationResponse {
            conversation_id: conversation_id.as_uuid(),
            display_name: display_name.to_string(),
            channel: Channel::Email,
            unread: true,
            favorite: false,
            stage: "lead".to_string(),
            assignee: None,
            last_activity_at: t0(),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Courier message types.

    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_conversation_id() -> impl Strategy<Value = ConversationId> {
        arb_uuid().prop_map(ConversationId::new)
    }

    pub fn arb_message_id() -> impl Strategy<Value = MessageId> {
        arb_uuid().prop_map(MessageId::new)
    }

    pub fn arb_echo_id() -> impl Strategy<Value = EchoId> {
        arb_uuid().prop_map(EchoId::new)
    }

    /// Timestamps within a reasonable range (2020-2030).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64)
            .prop_map(|secs| chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now))
    }

    pub fn arb_body() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 .!?]{1,120}"
    }

    /// An offset that keeps a pending/confirmed pair inside the match window.
    pub fn arb_offset_within_window() -> impl Strategy<Value = i64> {
        -MATCH_WINDOW_MS..=MATCH_WINDOW_MS
    }

    /// An offset strictly outside the match window, either side.
    pub fn arb_offset_outside_window() -> impl Strategy<Value = i64> {
        prop_oneof![
            (MATCH_WINDOW_MS + 1..MATCH_WINDOW_MS * 20),
            (-MATCH_WINDOW_MS * 20..-MATCH_WINDOW_MS),
        ]
    }

    pub fn arb_confirmed(
        conversation_id: ConversationId,
    ) -> impl Strategy<Value = Message> {
        (arb_message_id(), arb_body(), arb_timestamp(), any::<bool>()).prop_map(
            move |(message_id, body, created_at, outbound)| Message {
                message_id,
                conversation_id,
                body,
                attachments: Vec::new(),
                outbound,
                created_at,
                local_echo: None,
            },
        )
    }

    pub fn arb_pending(
        conversation_id: ConversationId,
    ) -> impl Strategy<Value = PendingMessage> {
        (arb_echo_id(), arb_body(), arb_timestamp()).prop_map(
            move |(echo_id, body, created_at)| PendingMessage {
                echo_id,
                conversation_id,
                route: ChatRoute::new("chat-p", "acct-p"),
                body,
                attachments: Vec::new(),
                created_at,
                delivery_state: DeliveryState::Sending,
                server_id: None,
            },
        )
    }

    /// A pending entry plus a confirmed message that should match it by the
    /// content/time heuristic.
    pub fn arb_matching_pair(
        conversation_id: ConversationId,
    ) -> impl Strategy<Value = (PendingMessage, Message)> {
        (arb_pending(conversation_id), arb_offset_within_window(), arb_message_id()).prop_map(
            move |(pending, offset_ms, message_id)| {
                let confirmed = Message {
                    message_id,
                    conversation_id,
                    body: pending.body.clone(),
                    attachments: Vec::new(),
                    outbound: true,
                    created_at: pending.created_at + Duration::milliseconds(offset_ms),
                    local_echo: None,
                };
                (pending, confirmed)
            },
        )
    }
}
