//! Deterministic mock implementation of the shared `session_transport`
//! contract.
//!
//! This crate contains no network logic and is intended for local
//! development runs and contract-level integration testing. Outcomes can be
//! scripted per operation; unscripted calls fall back to deterministic
//! defaults (sequential six-digit identities, echo replies, empty history).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use session_transport::{CreatedSession, SessionTransport, TransportError, Turn};

/// Stable transport identifier used for explicit startup selection.
pub const MOCK_TRANSPORT_ID: &str = "mock";

const FIRST_MINTED_IDENTITY: u64 = 100_000;

/// One recorded transport invocation, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    CreateSession { first_message: String },
    FetchHistory { identity: String },
    SendTurn { identity: String, content: String },
}

/// Scripted transport double used by `chat_session` tests and local runs.
#[derive(Debug, Default)]
pub struct MockTransport {
    create_results: Mutex<VecDeque<Result<CreatedSession, TransportError>>>,
    history_results: Mutex<VecDeque<Result<Vec<Turn>, TransportError>>>,
    reply_results: Mutex<VecDeque<Result<Turn, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    next_identity: AtomicU64,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcome of the next unconsumed `create_session` call.
    pub fn push_create_result(&self, result: Result<CreatedSession, TransportError>) {
        lock_unpoisoned(&self.create_results).push_back(result);
    }

    /// Queues the outcome of the next unconsumed `fetch_history` call.
    pub fn push_history_result(&self, result: Result<Vec<Turn>, TransportError>) {
        lock_unpoisoned(&self.history_results).push_back(result);
    }

    /// Queues the outcome of the next unconsumed `send_turn` call.
    pub fn push_reply_result(&self, result: Result<Turn, TransportError>) {
        lock_unpoisoned(&self.reply_results).push_back(result);
    }

    /// Returns every transport invocation observed so far, in call order.
    #[must_use]
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        lock_unpoisoned(&self.calls).clone()
    }

    fn record(&self, call: RecordedCall) {
        lock_unpoisoned(&self.calls).push(call);
    }

    fn mint_identity(&self) -> String {
        let offset = self.next_identity.fetch_add(1, Ordering::SeqCst);
        format!("{}", FIRST_MINTED_IDENTITY + offset)
    }
}

impl SessionTransport for MockTransport {
    fn create_session(&self, first_message: &str) -> Result<CreatedSession, TransportError> {
        self.record(RecordedCall::CreateSession {
            first_message: first_message.to_string(),
        });

        if let Some(result) = lock_unpoisoned(&self.create_results).pop_front() {
            return result;
        }

        Ok(CreatedSession {
            identity: self.mint_identity(),
            reply: echo_reply(first_message),
        })
    }

    fn fetch_history(&self, identity: &str) -> Result<Vec<Turn>, TransportError> {
        self.record(RecordedCall::FetchHistory {
            identity: identity.to_string(),
        });

        if let Some(result) = lock_unpoisoned(&self.history_results).pop_front() {
            return result;
        }

        Ok(Vec::new())
    }

    fn send_turn(&self, identity: &str, content: &str) -> Result<Turn, TransportError> {
        self.record(RecordedCall::SendTurn {
            identity: identity.to_string(),
            content: content.to_string(),
        });

        if let Some(result) = lock_unpoisoned(&self.reply_results).pop_front() {
            return result;
        }

        Ok(echo_reply(content))
    }
}

fn echo_reply(content: &str) -> Turn {
    Turn::assistant(format!("You said: {content}"))
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
