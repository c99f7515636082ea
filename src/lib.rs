//! Client-side chat session engine.
//!
//! ## Transport bootstrap
//!
//! `chat_session` selects its transport at startup:
//!
//! - `CHAT_SESSION_TRANSPORT=chat-api` (default) for the HTTP chat service
//! - `CHAT_SESSION_TRANSPORT=mock` for deterministic local runs and tests
//!
//! With the `chat-api` transport, `CHAT_SESSION_BASE_URL` overrides the
//! service base URL (default `http://localhost:8000`) and
//! `CHAT_SESSION_TIMEOUT_SEC` bounds each request.
//!
//! Set `CHAT_SESSION_ID` to bind the shell to an existing session at startup;
//! without it the first submitted message creates a new session.
//!
//! Contract notes:
//! - The engine appends user turns optimistically and never rolls them back;
//!   a failed reply surfaces on the snapshot instead.
//! - At most one session-scoped call is in flight at a time; submits that
//!   would start a second one are discarded, not queued.
//! - Identity lookups run on a separate lane and never touch session state.

pub mod config;
pub mod engine;
pub mod runtime;
pub mod shell;
pub mod transports;
