//! Chat-API-backed implementation of the shared `session_transport` contract.
//!
//! This adapter translates `chat_api` request/response semantics into the
//! blocking three-operation transport the session engine drives, and
//! normalizes every protocol failure into a single `TransportError` kind.

use std::time::Duration;

use chat_api::{ChatApiClient, ChatApiConfig, ChatApiError, TurnPayload, TurnRole};
use session_transport::{CreatedSession, Role, SessionTransport, TransportError, Turn};
use tracing::warn;

/// Stable transport identifier used for explicit startup selection.
pub const CHAT_API_TRANSPORT_ID: &str = "chat-api";

/// Runtime configuration for the chat API transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatApiTransportConfig {
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
}

impl ChatApiTransportConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_chat_api_config(self) -> ChatApiConfig {
        let mut config = ChatApiConfig::new();

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(user_agent) = self.user_agent {
            config = config.with_user_agent(user_agent);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

/// `SessionTransport` adapter backed by `chat_api` transport primitives.
#[derive(Debug)]
pub struct ChatApiTransport {
    client: ChatApiClient,
}

impl ChatApiTransport {
    /// Creates a transport using real chat API endpoints.
    pub fn new(config: ChatApiTransportConfig) -> Result<Self, TransportError> {
        let client =
            ChatApiClient::new(config.into_chat_api_config()).map_err(map_transport_error)?;
        Ok(Self { client })
    }

    fn block_on<F>(&self, future: F) -> Result<F::Output, TransportError>
    where
        F: std::future::Future,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                TransportError::network(format!("failed to initialize tokio runtime: {error}"))
            })?;

        Ok(runtime.block_on(future))
    }
}

impl SessionTransport for ChatApiTransport {
    fn create_session(&self, first_message: &str) -> Result<CreatedSession, TransportError> {
        let response = self
            .block_on(self.client.create_session(first_message))?
            .map_err(map_transport_error)?;

        Ok(CreatedSession {
            identity: response.session_id,
            reply: turn_from_payload(response.reply),
        })
    }

    fn fetch_history(&self, identity: &str) -> Result<Vec<Turn>, TransportError> {
        let history = self
            .block_on(self.client.fetch_history(identity))?
            .map_err(map_transport_error)?;

        Ok(history.into_iter().map(turn_from_payload).collect())
    }

    fn send_turn(&self, identity: &str, content: &str) -> Result<Turn, TransportError> {
        let reply = self
            .block_on(self.client.send_turn(identity, content))?
            .map_err(map_transport_error)?;

        Ok(turn_from_payload(reply))
    }
}

fn turn_from_payload(payload: TurnPayload) -> Turn {
    let role = match payload.role {
        TurnRole::User => Role::User,
        TurnRole::Assistant => Role::Assistant,
    };

    Turn {
        role,
        content: payload.content,
    }
}

fn map_transport_error(error: ChatApiError) -> TransportError {
    match error {
        ChatApiError::Status(status, message) => {
            TransportError::status(status.as_u16(), Some(message))
        }
        ChatApiError::Request(error) => {
            warn!(%error, "chat API request failed below the HTTP layer");
            TransportError::network(error.to_string())
        }
        ChatApiError::Serde(error) => {
            warn!(%error, "chat API response body was malformed");
            TransportError::network(format!("malformed response body: {error}"))
        }
    }
}
