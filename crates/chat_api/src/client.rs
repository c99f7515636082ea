use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::payload::{
    CreateSessionResponse, HistoryResponse, SendTurnResponse, SessionRequest, TurnPayload,
};
use crate::url::{create_session_url, session_url};

#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = config.user_agent.as_deref() {
            let mut headers = HeaderMap::new();
            if let Ok(value) = HeaderValue::from_str(user_agent) {
                headers.insert(USER_AGENT, value);
            }
            builder = builder.default_headers(headers);
        }

        let http = builder.build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ChatApiConfig {
        &self.config
    }

    /// `POST {base}/session` — creates a session seeded with the first user
    /// message and returns the server-issued identity plus the first reply.
    pub async fn create_session(
        &self,
        text: &str,
    ) -> Result<CreateSessionResponse, ChatApiError> {
        let url = create_session_url(&self.config.base_url);
        debug!(%url, "creating chat session");

        let response = self
            .http
            .post(&url)
            .json(&SessionRequest::new(text))
            .send()
            .await?;

        read_json_response(response).await
    }

    /// `GET {base}/session/{id}` — fetches the authoritative history for an
    /// identity. Unknown identities surface as an HTTP 404 status error.
    pub async fn fetch_history(
        &self,
        session_id: &str,
    ) -> Result<Vec<TurnPayload>, ChatApiError> {
        let url = session_url(&self.config.base_url, session_id);
        debug!(%url, "fetching session history");

        let response = self.http.get(&url).send().await?;
        let parsed: HistoryResponse = read_json_response(response).await?;
        Ok(parsed.history)
    }

    /// `POST {base}/session/{id}` — sends one user turn and returns the
    /// assistant reply.
    pub async fn send_turn(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<TurnPayload, ChatApiError> {
        let url = session_url(&self.config.base_url, session_id);
        debug!(%url, "sending turn");

        let response = self
            .http
            .post(&url)
            .json(&SessionRequest::new(text))
            .send()
            .await?;

        let parsed: SendTurnResponse = read_json_response(response).await?;
        Ok(parsed.reply)
    }
}

async fn read_json_response<T: DeserializeOwned>(response: Response) -> Result<T, ChatApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = parse_error_message(status, &body);
        warn!(status = status.as_u16(), %message, "chat service returned non-success status");
        return Err(ChatApiError::Status(status, message));
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(ChatApiError::from)
}
