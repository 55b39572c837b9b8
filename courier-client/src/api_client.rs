//! API client layer for REST and push-channel connections.

use crate::config::{ClientConfig, ReconnectConfig};
use crate::types::{
    ListConversationsRequest, ListConversationsResponse, SendMessageRequest, SendMessageResponse,
    StatusResponse, ThreadResponse, UpdateConversationRequest,
};
use async_trait::async_trait;
use courier_core::{ConversationId, EntityIdType};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::WebSocketStream;

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Push channel error: {0}")]
    Push(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Config error: {0}")]
    Config(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for ApiClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Push(Box::new(err))
    }
}

/// Error body the backend returns alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    message: String,
}

/// The REST operations the sync engine needs, behind a seam so tests can
/// script outcomes without a network.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Fetch the ordered confirmed thread. Idempotent, side-effect free.
    async fn fetch_thread(
        &self,
        conversation_id: ConversationId,
    ) -> Result<ThreadResponse, ApiClientError>;

    /// Issue a send. The response's `message` may be null even on success.
    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ApiClientError>;

    /// Apply a read/favorite/stage/assignment mutation.
    async fn update_conversation(
        &self,
        conversation_id: ConversationId,
        request: &UpdateConversationRequest,
    ) -> Result<StatusResponse, ApiClientError>;

    /// List conversation summaries for an inbox view.
    async fn list_conversations(
        &self,
        request: &ListConversationsRequest,
    ) -> Result<ListConversationsResponse, ApiClientError>;
}

#[derive(Clone)]
pub struct ApiClient {
    rest: RestClient,
    push: PushClient,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiClientError> {
        let rest = RestClient::new(config)?;
        let push = PushClient::new(config)?;
        Ok(Self { rest, push })
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn push(&self) -> &PushClient {
        &self.push
    }
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiClientError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let auth_header = build_auth_headers(&config.auth)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    async fn get_json<T, Q>(&self, path: &str, query: Option<&Q>) -> Result<T, ApiClientError>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(url).headers(self.auth_header.clone());
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await?;
        self.parse_response(response).await
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiClientError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(url)
            .headers(self.auth_header.clone())
            .json(body)
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn patch_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiClientError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .patch(url)
            .headers(self.auth_header.clone())
            .json(body)
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let text = response.text().await?;
            let message = match serde_json::from_str::<ApiErrorBody>(&text) {
                Ok(api_error) => format!("{}: {}", api_error.code, api_error.message),
                Err(_) => text,
            };
            Err(ApiClientError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl MessageTransport for RestClient {
    async fn fetch_thread(
        &self,
        conversation_id: ConversationId,
    ) -> Result<ThreadResponse, ApiClientError> {
        let path = format!(
            "/api/v1/conversations/{}/messages",
            conversation_id.as_uuid()
        );
        self.get_json::<ThreadResponse, ()>(&path, None).await
    }

    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ApiClientError> {
        self.post_json("/api/v1/messages", request).await
    }

    async fn update_conversation(
        &self,
        conversation_id: ConversationId,
        request: &UpdateConversationRequest,
    ) -> Result<StatusResponse, ApiClientError> {
        let path = format!("/api/v1/conversations/{}", conversation_id.as_uuid());
        self.patch_json(&path, request).await
    }

    async fn list_conversations(
        &self,
        request: &ListConversationsRequest,
    ) -> Result<ListConversationsResponse, ApiClientError> {
        self.get_json("/api/v1/conversations", Some(request)).await
    }
}

#[derive(Clone)]
pub struct PushClient {
    endpoint: String,
    auth_header: HeaderMap,
    reconnect: ReconnectConfig,
}

impl PushClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiClientError> {
        Ok(Self {
            endpoint: config.push_endpoint.clone(),
            auth_header: build_auth_headers(&config.auth)?,
            reconnect: config.reconnect.clone(),
        })
    }

    pub async fn connect(
        &self,
    ) -> Result<
        WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        ApiClientError,
    > {
        let mut request = Request::builder()
            .uri(self.endpoint.clone())
            .body(())
            .map_err(|e| ApiClientError::Config(e.to_string()))?;
        let headers = request.headers_mut();
        for (name, value) in self.auth_header.iter() {
            headers.insert(name, value.clone());
        }
        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(stream)
    }

    pub fn reconnect_config(&self) -> &ReconnectConfig {
        &self.reconnect
    }
}

fn build_auth_headers(auth: &crate::config::AuthConfig) -> Result<HeaderMap, ApiClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    if let Some(jwt) = &auth.jwt {
        let value = format!("Bearer {}", jwt);
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&value).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    Ok(headers)
}
