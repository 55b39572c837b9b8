//! Sync engine: the orchestrator for sends, refreshes, push invalidation,
//! and optimistic conversation toggles.
//!
//! All remote I/O goes through the [`MessageTransport`] seam. Optimistic
//! conversation mutations are serialized by a per-engine lock so a rollback
//! always restores the exact state its snapshot captured.

use crate::api_client::{ApiClient, ApiClientError, MessageTransport, PushClient, RestClient};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::ClientEvent;
use crate::notifications::{Notification, NotificationAction, NotificationLevel};
use crate::push::{PushEvent, PushScope};
use crate::realtime::{spawn_push_manager, PushSubscription};
use crate::store::ThreadStore;
use crate::types::{
    AttachmentResponse, ListConversationsRequest, SendMessageRequest, UpdateConversationRequest,
};
use crate::view_cache::{ViewCache, ViewKey};
use chrono::Utc;
use courier_core::{
    new_echo_id, Attachment, ChatRoute, ConversationId, ConversationMutation, ConversationSummary,
    DeliveryState, EchoId, EntityIdType, Message, MessageId, PendingMessage, SendError, SyncError,
    ThreadEntry,
};
use tokio::sync::{mpsc, Mutex};

pub struct SyncEngine<T: MessageTransport> {
    transport: T,
    push: Option<PushClient>,
    store: Mutex<ThreadStore>,
    views: Mutex<ViewCache>,
    /// Serializes optimistic conversation mutations end to end, so snapshots
    /// and rollbacks cannot interleave.
    mutation_lock: Mutex<()>,
    subscription: Mutex<Option<PushSubscription>>,
    active: Mutex<Option<ConversationId>>,
    notifications: Mutex<Vec<Notification>>,
    events: mpsc::Sender<ClientEvent>,
}

impl<T: MessageTransport> SyncEngine<T> {
    pub fn new(transport: T, events: mpsc::Sender<ClientEvent>) -> Self {
        Self {
            transport,
            push: None,
            store: Mutex::new(ThreadStore::new()),
            views: Mutex::new(ViewCache::new()),
            mutation_lock: Mutex::new(()),
            subscription: Mutex::new(None),
            active: Mutex::new(None),
            notifications: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Attach a push client; without one the engine works in poll-only mode.
    pub fn with_push(mut self, push: PushClient) -> Self {
        self.push = Some(push);
        self
    }
}

impl SyncEngine<RestClient> {
    /// Build an engine wired to the real REST and push clients.
    pub fn connect(
        config: &ClientConfig,
        events: mpsc::Sender<ClientEvent>,
    ) -> Result<Self, ClientError> {
        let api = ApiClient::new(config)?;
        Ok(Self::new(api.rest().clone(), events).with_push(api.push().clone()))
    }
}

impl<T: MessageTransport> SyncEngine<T> {
    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Send a message, inserting an optimistic pending entry immediately.
    ///
    /// Fails up front with [`SendError::MissingRouting`] when the route is
    /// absent or incomplete; nothing is inserted in that case. On transport
    /// failure the pending entry is removed again and an error notification
    /// with a retry action is raised.
    pub async fn send_message(
        &self,
        conversation_id: ConversationId,
        route: Option<&ChatRoute>,
        body: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Result<EchoId, SendError> {
        let route = route.ok_or(SendError::MissingRouting { field: "chat_id" })?;
        if route.chat_id.trim().is_empty() {
            return Err(SendError::MissingRouting { field: "chat_id" });
        }
        if route.account_id.trim().is_empty() {
            return Err(SendError::MissingRouting { field: "account_id" });
        }

        let body = body.into();
        let pending = PendingMessage {
            echo_id: new_echo_id(),
            conversation_id,
            route: route.clone(),
            body: body.clone(),
            attachments: attachments.clone(),
            created_at: Utc::now(),
            delivery_state: DeliveryState::Sending,
            server_id: None,
        };
        let echo_id = pending.echo_id;
        self.store.lock().await.insert_pending(pending);

        let request = SendMessageRequest {
            chat_id: route.chat_id.clone(),
            account_id: route.account_id.clone(),
            body,
            attachments: attachments
                .into_iter()
                .map(AttachmentResponse::from)
                .collect(),
        };

        match self.transport.send_message(&request).await {
            Ok(response) => {
                let server_id = response
                    .message
                    .as_ref()
                    .map(|message| MessageId::new(message.message_id));
                self.store
                    .lock()
                    .await
                    .mark_sent(conversation_id, echo_id, server_id);
                Ok(echo_id)
            }
            Err(err) => {
                self.store
                    .lock()
                    .await
                    .remove_pending(conversation_id, echo_id);
                let send_err = send_error(err);
                tracing::warn!(
                    conversation_id = %conversation_id,
                    error = %send_err,
                    "send failed, pending entry removed"
                );
                self.notify(
                    Notification::new(
                        NotificationLevel::Error,
                        format!("Message not sent: {}", send_err),
                    )
                    .with_action(NotificationAction::Retry),
                )
                .await;
                Err(send_err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Refresh and projection
    // ------------------------------------------------------------------

    /// Fetch the confirmed thread and reconcile it into the store.
    ///
    /// A fetch failure leaves the store untouched; the last known-good
    /// thread keeps rendering. A result outranked by a newer refresh is
    /// discarded silently.
    pub async fn refresh_thread(&self, conversation_id: ConversationId) -> Result<(), SyncError> {
        let ticket = self.store.lock().await.begin_refresh(conversation_id);

        let response = self
            .transport
            .fetch_thread(conversation_id)
            .await
            .map_err(|err| SyncError::Network {
                reason: err.to_string(),
            })?;
        let confirmed: Vec<Message> = response
            .messages
            .into_iter()
            .map(|message| message.into_message())
            .collect();

        match self.store.lock().await.complete_refresh(ticket, confirmed) {
            Ok(()) => Ok(()),
            Err(SyncError::StaleRefresh { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// The merged, time-ordered view for one conversation.
    pub async fn merged_thread(&self, conversation_id: ConversationId) -> Vec<ThreadEntry> {
        self.store.lock().await.merged_view(conversation_id)
    }

    /// The surviving pending queue for one conversation.
    pub async fn pending(&self, conversation_id: ConversationId) -> Vec<PendingMessage> {
        self.store.lock().await.pending(conversation_id)
    }

    // ------------------------------------------------------------------
    // Push handling
    // ------------------------------------------------------------------

    /// React to a push event: a relevant `MessageReceived` triggers a
    /// confirmed-thread refresh, nothing else does. The event never mutates
    /// messages directly.
    pub async fn handle_push(&self, event: &PushEvent) {
        let scope = match *self.active.lock().await {
            Some(active) => PushScope::Conversation(active),
            None => PushScope::All,
        };
        if let Some(conversation_id) = event.invalidates(scope) {
            if let Err(err) = self.refresh_thread(conversation_id).await {
                tracing::debug!(
                    conversation_id = %conversation_id,
                    error = %err,
                    "push-triggered refresh failed"
                );
                let _ = self
                    .events
                    .send(ClientEvent::ApiError(err.to_string()))
                    .await;
            }
        }
    }

    /// Switch the active conversation: outstanding refreshes for the
    /// previous conversation are abandoned and its push subscription closed
    /// before the new one starts.
    pub async fn set_active_conversation(&self, conversation_id: ConversationId) {
        let previous = self.active.lock().await.replace(conversation_id);
        if let Some(previous) = previous {
            if previous != conversation_id {
                self.store.lock().await.abandon_refreshes(previous);
            }
        }

        let mut subscription = self.subscription.lock().await;
        if let Some(old) = subscription.take() {
            old.close();
        }
        if let Some(push) = &self.push {
            *subscription = Some(spawn_push_manager(
                push.clone(),
                PushScope::Conversation(conversation_id),
                self.events.clone(),
            ));
        }
    }

    /// Tear down the push subscription entirely.
    pub async fn close_subscription(&self) {
        if let Some(subscription) = self.subscription.lock().await.take() {
            subscription.close();
        }
    }

    // ------------------------------------------------------------------
    // Conversation lists and optimistic toggles
    // ------------------------------------------------------------------

    /// Fetch and cache one inbox list view.
    pub async fn load_conversations(
        &self,
        key: ViewKey,
        request: &ListConversationsRequest,
    ) -> Result<Vec<ConversationSummary>, ClientError> {
        let response = self.transport.list_conversations(request).await?;
        let summaries: Vec<ConversationSummary> = response
            .conversations
            .into_iter()
            .map(|conversation| conversation.into_summary())
            .collect();
        self.views
            .lock()
            .await
            .set_view(key, summaries.clone());
        Ok(summaries)
    }

    pub async fn conversations(&self, key: &ViewKey) -> Option<Vec<ConversationSummary>> {
        self.views.lock().await.view(key).map(<[_]>::to_vec)
    }

    pub async fn view_is_stale(&self, key: &ViewKey) -> bool {
        self.views.lock().await.is_stale(key)
    }

    /// Mark a conversation read or unread, optimistically.
    pub async fn set_read(
        &self,
        conversation_id: ConversationId,
        read: bool,
    ) -> Result<(), ClientError> {
        self.mutate_conversation(conversation_id, ConversationMutation::SetRead(read))
            .await
    }

    pub async fn set_favorite(
        &self,
        conversation_id: ConversationId,
        favorite: bool,
    ) -> Result<(), ClientError> {
        self.mutate_conversation(conversation_id, ConversationMutation::SetFavorite(favorite))
            .await
    }

    pub async fn set_stage(
        &self,
        conversation_id: ConversationId,
        stage: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.mutate_conversation(conversation_id, ConversationMutation::SetStage(stage.into()))
            .await
    }

    pub async fn set_assignee(
        &self,
        conversation_id: ConversationId,
        assignee: Option<courier_core::AccountId>,
    ) -> Result<(), ClientError> {
        self.mutate_conversation(conversation_id, ConversationMutation::SetAssignee(assignee))
            .await
    }

    /// Apply a conversation mutation optimistically: snapshot, mutate the
    /// cached views, then confirm with the backend. On failure the snapshot
    /// is restored verbatim; on success the affected views are marked stale
    /// so the next list fetch picks up server-side effects.
    async fn mutate_conversation(
        &self,
        conversation_id: ConversationId,
        mutation: ConversationMutation,
    ) -> Result<(), ClientError> {
        let _guard = self.mutation_lock.lock().await;

        let snapshot = self.views.lock().await.apply(conversation_id, &mutation);
        let request = UpdateConversationRequest::from(&mutation);

        match self
            .transport
            .update_conversation(conversation_id, &request)
            .await
        {
            Ok(_) => {
                self.views.lock().await.mark_stale(conversation_id);
                Ok(())
            }
            Err(err) => {
                self.views.lock().await.restore(snapshot);
                tracing::warn!(
                    conversation_id = %conversation_id,
                    error = %err,
                    "conversation update failed, rolled back"
                );
                self.notify(
                    Notification::new(
                        NotificationLevel::Error,
                        format!("Update failed: {}", err),
                    )
                    .with_action(NotificationAction::Retry),
                )
                .await;
                let _ = self
                    .events
                    .send(ClientEvent::ApiError(err.to_string()))
                    .await;
                Err(err.into())
            }
        }
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    async fn notify(&self, notification: Notification) {
        self.notifications.lock().await.push(notification);
    }

    /// Drain queued notifications for display.
    pub async fn take_notifications(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.notifications.lock().await)
    }
}

fn send_error(err: ApiClientError) -> SendError {
    match err {
        ApiClientError::Status { status, message } => SendError::Rejected { status, message },
        other => SendError::Network {
            reason: other.to_string(),
        },
    }
}
