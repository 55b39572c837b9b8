//! Courier Client
//!
//! Client-side sync layer for the Courier sales inbox: REST transport,
//! push-channel listener, optimistic send queue, and the merged thread
//! view. The [`engine::SyncEngine`] is the entry point; everything else is
//! plumbing it composes.

pub mod api_client;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod notifications;
pub mod push;
pub mod realtime;
pub mod store;
pub mod types;
pub mod view_cache;

pub use api_client::{ApiClient, ApiClientError, MessageTransport, PushClient, RestClient};
pub use config::ClientConfig;
pub use engine::SyncEngine;
pub use error::ClientError;
pub use events::ClientEvent;
pub use notifications::{Notification, NotificationAction, NotificationLevel};
pub use push::{PushEvent, PushScope};
pub use realtime::{spawn_push_manager, ListenerState, PushSubscription};
pub use store::{RefreshTicket, ThreadStore};
pub use view_cache::{CacheSnapshot, ViewCache, ViewKey};
