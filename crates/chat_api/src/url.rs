/// Default base URL for chat service requests.
pub const DEFAULT_CHAT_BASE_URL: &str = "http://localhost:8000";

/// Normalize a caller-supplied base URL.
///
/// Normalization rules:
/// 1) fall back to [`DEFAULT_CHAT_BASE_URL`] when blank
/// 2) trim surrounding whitespace
/// 3) strip trailing slashes
pub fn normalize_chat_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_CHAT_BASE_URL
    } else {
        input.trim()
    };

    base.trim_end_matches('/').to_string()
}

/// Endpoint for creating a new session.
pub fn create_session_url(base: &str) -> String {
    format!("{}/session", normalize_chat_base_url(base))
}

/// Endpoint for one existing session (history fetch and turn submission).
pub fn session_url(base: &str, session_id: &str) -> String {
    format!("{}/session/{session_id}", normalize_chat_base_url(base))
}

#[cfg(test)]
mod tests {
    use super::{create_session_url, normalize_chat_base_url, session_url, DEFAULT_CHAT_BASE_URL};

    #[test]
    fn blank_base_url_falls_back_to_default() {
        assert_eq!(normalize_chat_base_url(""), DEFAULT_CHAT_BASE_URL);
        assert_eq!(normalize_chat_base_url("   "), DEFAULT_CHAT_BASE_URL);
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        assert_eq!(
            normalize_chat_base_url("https://chat.example.com/"),
            "https://chat.example.com"
        );
        assert_eq!(
            normalize_chat_base_url(" https://chat.example.com// "),
            "https://chat.example.com"
        );
    }

    #[test]
    fn endpoint_builders_compose_normalized_paths() {
        assert_eq!(
            create_session_url("https://chat.example.com/"),
            "https://chat.example.com/session"
        );
        assert_eq!(
            session_url("https://chat.example.com", "123456"),
            "https://chat.example.com/session/123456"
        );
    }
}
