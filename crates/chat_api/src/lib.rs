//! Transport-only chat service client primitives.
//!
//! This crate owns request/response building and parsing for the chat
//! service endpoints only. It intentionally contains no session lifecycle
//! logic and no retry policy; every operation is a single request/response
//! exchange whose failure the caller normalizes.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod url;

pub use client::ChatApiClient;
pub use config::ChatApiConfig;
pub use error::ChatApiError;
pub use payload::{
    CreateSessionResponse, HistoryResponse, SendTurnResponse, SessionRequest, TurnPayload,
    TurnRole,
};
pub use url::normalize_chat_base_url;

pub use reqwest::StatusCode;
