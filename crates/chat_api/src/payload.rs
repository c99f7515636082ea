use serde::{Deserialize, Serialize};

/// Author tag carried on every wire-level turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One transcript turn as exchanged with the chat service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPayload {
    pub role: TurnRole,
    pub content: String,
}

/// Request body for session creation and turn submission; both endpoints
/// accept the same single-field shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRequest {
    pub text: String,
}

impl SessionRequest {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Response body for `POST /session`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub reply: TurnPayload,
}

/// Response body for `POST /session/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendTurnResponse {
    pub reply: TurnPayload,
}

/// Response body for `GET /session/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<TurnPayload>,
}

#[cfg(test)]
mod tests {
    use super::{
        CreateSessionResponse, HistoryResponse, SendTurnResponse, SessionRequest, TurnRole,
    };

    #[test]
    fn session_request_serializes_single_text_field() {
        let json = serde_json::to_value(SessionRequest::new("hello"))
            .expect("request should serialize");
        assert_eq!(json, serde_json::json!({ "text": "hello" }));
    }

    #[test]
    fn create_session_response_parses_identity_and_reply() {
        let parsed: CreateSessionResponse = serde_json::from_str(
            r#"{"session_id": "123456", "reply": {"role": "assistant", "content": "hi"}}"#,
        )
        .expect("response should parse");

        assert_eq!(parsed.session_id, "123456");
        assert_eq!(parsed.reply.role, TurnRole::Assistant);
        assert_eq!(parsed.reply.content, "hi");
    }

    #[test]
    fn send_turn_response_parses_reply() {
        let parsed: SendTurnResponse =
            serde_json::from_str(r#"{"reply": {"role": "assistant", "content": "sure"}}"#)
                .expect("response should parse");

        assert_eq!(parsed.reply.content, "sure");
    }

    #[test]
    fn history_response_preserves_turn_order_and_roles() {
        let parsed: HistoryResponse = serde_json::from_str(
            r#"{"history": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "second"}
            ]}"#,
        )
        .expect("response should parse");

        assert_eq!(parsed.history.len(), 2);
        assert_eq!(parsed.history[0].role, TurnRole::User);
        assert_eq!(parsed.history[1].role, TurnRole::Assistant);
    }

    #[test]
    fn unknown_role_values_are_rejected() {
        let parsed = serde_json::from_str::<HistoryResponse>(
            r#"{"history": [{"role": "system", "content": "x"}]}"#,
        );
        assert!(parsed.is_err());
    }
}
