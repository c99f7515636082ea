use std::sync::Arc;

use session_transport::SessionTransport;
use session_transport_chat_api::{
    ChatApiTransport, ChatApiTransportConfig, CHAT_API_TRANSPORT_ID,
};
use session_transport_mock::{MockTransport, MOCK_TRANSPORT_ID};

use crate::config::ShellConfig;

pub const DEFAULT_TRANSPORT_ID: &str = CHAT_API_TRANSPORT_ID;

/// Builds the transport selected by `config`, falling back to the HTTP chat
/// API transport when none is named.
pub fn transport_for_config(config: &ShellConfig) -> Result<Arc<dyn SessionTransport>, String> {
    let transport_id = config
        .transport_id
        .as_deref()
        .unwrap_or(DEFAULT_TRANSPORT_ID);

    match transport_id {
        MOCK_TRANSPORT_ID => Ok(Arc::new(MockTransport::new())),
        CHAT_API_TRANSPORT_ID => {
            let mut transport_config = ChatApiTransportConfig::new();

            if let Some(base_url) = &config.base_url {
                transport_config = transport_config.with_base_url(base_url.clone());
            }

            if let Some(timeout) = config.timeout {
                transport_config = transport_config.with_timeout(timeout);
            }

            let transport = ChatApiTransport::new(transport_config).map_err(|error| {
                format!("Failed to initialize chat API transport: {error}")
            })?;

            Ok(Arc::new(transport))
        }
        unknown => Err(format!(
            "Unsupported transport '{unknown}'. Available transports: \
             {CHAT_API_TRANSPORT_ID}, {MOCK_TRANSPORT_ID}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::ShellConfig;

    use super::transport_for_config;

    #[test]
    fn mock_transport_resolves() {
        let config = ShellConfig {
            transport_id: Some("mock".to_string()),
            ..ShellConfig::default()
        };

        assert!(transport_for_config(&config).is_ok());
    }

    #[test]
    fn chat_api_is_the_default_and_accepts_overrides() {
        let default_config = ShellConfig::default();
        assert!(transport_for_config(&default_config).is_ok());

        let overridden = ShellConfig {
            transport_id: Some("chat-api".to_string()),
            base_url: Some("https://chat.example.com".to_string()),
            timeout: Some(Duration::from_secs(15)),
            startup_identity: None,
        };
        assert!(transport_for_config(&overridden).is_ok());
    }

    #[test]
    fn unknown_transport_is_rejected_with_available_ids() {
        let config = ShellConfig {
            transport_id: Some("carrier-pigeon".to_string()),
            ..ShellConfig::default()
        };

        let error = match transport_for_config(&config) {
            Ok(_) => panic!("unknown transports should fail"),
            Err(error) => error,
        };

        assert!(error.contains("Unsupported transport 'carrier-pigeon'"));
        assert!(error.contains("chat-api"));
        assert!(error.contains("mock"));
    }
}
