use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use session_transport::{SessionId, SessionTransport, TransportError};
use tracing::debug;

use crate::engine::{CallId, CallOutcome, EngineHost, SessionEngine, Snapshot};

/// One-shot notification surfaced to the presentation shell, outside the
/// engine snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    /// The first submit minted a new session identity.
    IdentityAssigned(SessionId),
    /// A looked-up candidate identity exists; the shell may navigate to it.
    LookupSucceeded(SessionId),
    /// Non-fatal toast-style message.
    Notice(String),
}

struct ActiveCall {
    call_id: CallId,
    join_handle: Option<JoinHandle<()>>,
}

enum CallRequest {
    CreateSession {
        call_id: CallId,
        first_message: String,
    },
    FetchHistory {
        call_id: CallId,
        identity: String,
    },
    SendTurn {
        call_id: CallId,
        identity: String,
        content: String,
    },
    Lookup {
        call_id: CallId,
        candidate: String,
    },
}

impl CallRequest {
    fn thread_name(&self) -> String {
        match self {
            Self::CreateSession { call_id, .. } => format!("chat-session-create-{call_id}"),
            Self::FetchHistory { call_id, .. } => format!("chat-session-history-{call_id}"),
            Self::SendTurn { call_id, .. } => format!("chat-session-send-{call_id}"),
            Self::Lookup { call_id, .. } => format!("chat-session-lookup-{call_id}"),
        }
    }

    /// Outcome reported when the transport panics instead of returning.
    fn panicked_outcome(&self) -> CallOutcome {
        let error = TransportError::network("chat transport panicked");
        match self {
            Self::CreateSession { call_id, .. } => CallOutcome::SessionCreated {
                call_id: *call_id,
                result: Err(error),
            },
            Self::FetchHistory { call_id, .. } => CallOutcome::HistoryLoaded {
                call_id: *call_id,
                result: Err(error),
            },
            Self::SendTurn { call_id, .. } => CallOutcome::ReplyReceived {
                call_id: *call_id,
                result: Err(error),
            },
            Self::Lookup { call_id, candidate } => CallOutcome::LookupResolved {
                call_id: *call_id,
                candidate: candidate.clone(),
                result: Err(error),
            },
        }
    }

    fn execute(self, transport: &dyn SessionTransport) -> CallOutcome {
        match self {
            Self::CreateSession {
                call_id,
                first_message,
            } => CallOutcome::SessionCreated {
                call_id,
                result: transport.create_session(&first_message),
            },
            Self::FetchHistory { call_id, identity } => CallOutcome::HistoryLoaded {
                call_id,
                result: transport.fetch_history(&identity),
            },
            Self::SendTurn {
                call_id,
                identity,
                content,
            } => CallOutcome::ReplyReceived {
                call_id,
                result: transport.send_turn(&identity, &content),
            },
            // Existence check only; the fetched history is discarded.
            Self::Lookup { call_id, candidate } => CallOutcome::LookupResolved {
                call_id,
                result: transport.fetch_history(&candidate).map(|_| ()),
                candidate,
            },
        }
    }
}

/// Drives one [`SessionEngine`] against a [`SessionTransport`] on worker
/// threads.
///
/// Transport calls run off the caller's thread and complete by enqueuing a
/// [`CallOutcome`], which is applied to the engine when the queue is flushed.
/// Session calls and lookups occupy separate lanes, so a lookup can resolve
/// while a send is still in flight.
pub struct SessionRuntime {
    engine: Mutex<SessionEngine>,
    transport: Arc<dyn SessionTransport>,
    pending_outcomes: Mutex<VecDeque<CallOutcome>>,
    next_call_id: AtomicU64,
    active_call: Mutex<Option<ActiveCall>>,
    active_lookup: Mutex<Option<ActiveCall>>,
    shell_events: Mutex<VecDeque<ShellEvent>>,
    render_requested: AtomicBool,
}

impl SessionRuntime {
    #[must_use]
    pub fn new(transport: Arc<dyn SessionTransport>) -> Arc<Self> {
        Arc::new(Self {
            engine: Mutex::new(SessionEngine::new()),
            transport,
            pending_outcomes: Mutex::new(VecDeque::new()),
            next_call_id: AtomicU64::new(1),
            active_call: Mutex::new(None),
            active_lookup: Mutex::new(None),
            shell_events: Mutex::new(VecDeque::new()),
            render_requested: AtomicBool::new(false),
        })
    }

    /// Binds the engine to a caller-supplied identity. See
    /// [`SessionEngine::resolve`].
    pub fn resolve(self: &Arc<Self>, identity: Option<&str>) {
        let mut host = Arc::clone(self);
        let mut engine = lock_unpoisoned(&self.engine);
        engine.resolve(identity, &mut host);
    }

    /// Submits one user turn. See [`SessionEngine::submit`].
    pub fn submit(self: &Arc<Self>, text: &str) {
        let mut host = Arc::clone(self);
        let mut engine = lock_unpoisoned(&self.engine);
        engine.submit(text, &mut host);
    }

    /// Validates a candidate identity without touching session state. See
    /// [`SessionEngine::lookup`].
    pub fn lookup(self: &Arc<Self>, candidate: &str) {
        let mut host = Arc::clone(self);
        let mut engine = lock_unpoisoned(&self.engine);
        engine.lookup(candidate, &mut host);
    }

    /// Runs `read` against the engine's current read-only view.
    pub fn with_snapshot<T>(&self, read: impl FnOnce(Snapshot<'_>) -> T) -> T {
        let engine = lock_unpoisoned(&self.engine);
        read(engine.snapshot())
    }

    /// Applies every queued call outcome to the engine, returning how many
    /// were applied. Call this from the shell's event loop; worker threads
    /// never mutate the engine directly.
    pub fn flush_pending_outcomes(self: &Arc<Self>) -> usize {
        let mut applied = 0usize;

        loop {
            let outcome = {
                let mut pending_outcomes = lock_unpoisoned(&self.pending_outcomes);
                pending_outcomes.pop_front()
            };

            let Some(outcome) = outcome else {
                break;
            };

            let call_id = outcome.call_id();
            let is_lookup = outcome.is_lookup();
            debug!(call_id, "applying call outcome");

            {
                let mut host = Arc::clone(self);
                let mut engine = lock_unpoisoned(&self.engine);
                engine.on_call_outcome(outcome, &mut host);
            }

            if is_lookup {
                clear_if_matching(&self.active_lookup, call_id);
            } else {
                clear_if_matching(&self.active_call, call_id);
            }

            applied += 1;
        }

        applied
    }

    /// Blocks until every in-flight call has completed and been applied.
    /// Intended for non-interactive drivers; the interactive shell calls it
    /// after each operation to keep the conversation synchronous.
    pub fn drive_until_idle(self: &Arc<Self>) {
        loop {
            for join_handle in self.take_join_handles() {
                let _ = join_handle.join();
            }

            let applied = self.flush_pending_outcomes();
            if applied == 0 && self.is_idle() {
                return;
            }
        }
    }

    /// Drains queued one-shot shell notifications, in emission order.
    #[must_use]
    pub fn take_shell_events(&self) -> Vec<ShellEvent> {
        lock_unpoisoned(&self.shell_events).drain(..).collect()
    }

    /// Clears and returns the render-requested flag.
    #[must_use]
    pub fn take_render_requested(&self) -> bool {
        self.render_requested.swap(false, Ordering::SeqCst)
    }

    fn is_idle(&self) -> bool {
        lock_unpoisoned(&self.active_call).is_none()
            && lock_unpoisoned(&self.active_lookup).is_none()
            && lock_unpoisoned(&self.pending_outcomes).is_empty()
    }

    fn take_join_handles(&self) -> Vec<JoinHandle<()>> {
        let mut join_handles = Vec::new();

        for slot in [&self.active_call, &self.active_lookup] {
            let mut active = lock_unpoisoned(slot);
            if let Some(active) = active.as_mut() {
                if let Some(join_handle) = active.join_handle.take() {
                    join_handles.push(join_handle);
                }
            }
        }

        join_handles
    }

    fn begin_call(
        self: &Arc<Self>,
        slot: &Mutex<Option<ActiveCall>>,
        build: impl FnOnce(CallId) -> CallRequest,
    ) -> Result<CallId, String> {
        let mut active = lock_unpoisoned(slot);
        if active.is_some() {
            return Err("Call already active".to_string());
        }

        let call_id = self.next_call_id.fetch_add(1, Ordering::SeqCst);
        let request = build(call_id);
        let join_handle = self.spawn_worker(request)?;

        *active = Some(ActiveCall {
            call_id,
            join_handle: Some(join_handle),
        });

        Ok(call_id)
    }

    fn spawn_worker(self: &Arc<Self>, request: CallRequest) -> Result<JoinHandle<()>, String> {
        let runtime = Arc::clone(self);
        thread::Builder::new()
            .name(request.thread_name())
            .spawn(move || runtime.run_worker(request))
            .map_err(|error| format!("Failed to spawn transport worker: {error}"))
    }

    fn run_worker(self: Arc<Self>, request: CallRequest) {
        let fallback = request.panicked_outcome();
        let transport = Arc::clone(&self.transport);

        let outcome = catch_unwind(AssertUnwindSafe(|| request.execute(transport.as_ref())))
            .unwrap_or(fallback);

        lock_unpoisoned(&self.pending_outcomes).push_back(outcome);
    }
}

impl EngineHost for Arc<SessionRuntime> {
    fn begin_create_session(&mut self, first_message: String) -> Result<CallId, String> {
        self.begin_call(&self.active_call, |call_id| CallRequest::CreateSession {
            call_id,
            first_message,
        })
    }

    fn begin_fetch_history(&mut self, identity: String) -> Result<CallId, String> {
        self.begin_call(&self.active_call, |call_id| CallRequest::FetchHistory {
            call_id,
            identity,
        })
    }

    fn begin_send_turn(&mut self, identity: String, content: String) -> Result<CallId, String> {
        self.begin_call(&self.active_call, |call_id| CallRequest::SendTurn {
            call_id,
            identity,
            content,
        })
    }

    fn begin_lookup(&mut self, candidate: String) -> Result<CallId, String> {
        self.begin_call(&self.active_lookup, |call_id| CallRequest::Lookup {
            call_id,
            candidate,
        })
    }

    fn identity_assigned(&mut self, identity: &str) {
        lock_unpoisoned(&self.shell_events)
            .push_back(ShellEvent::IdentityAssigned(identity.to_string()));
    }

    fn lookup_succeeded(&mut self, candidate: &str) {
        lock_unpoisoned(&self.shell_events)
            .push_back(ShellEvent::LookupSucceeded(candidate.to_string()));
    }

    fn notice(&mut self, message: String) {
        lock_unpoisoned(&self.shell_events).push_back(ShellEvent::Notice(message));
    }

    fn request_render(&mut self) {
        self.render_requested.store(true, Ordering::SeqCst);
    }
}

fn clear_if_matching(slot: &Mutex<Option<ActiveCall>>, call_id: CallId) {
    let mut active = lock_unpoisoned(slot);
    let matches = active.as_ref().map(|active| active.call_id) == Some(call_id);
    if !matches {
        return;
    }

    let mut completed = match active.take() {
        Some(completed) => completed,
        None => return,
    };

    if let Some(join_handle) = completed.join_handle.take() {
        let is_current_thread = join_handle.thread().id() == thread::current().id();
        if !is_current_thread && join_handle.is_finished() {
            let _ = join_handle.join();
        }
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use session_transport::{
        CreatedSession, SessionTransport, TransportError, Turn,
    };
    use session_transport_mock::MockTransport;

    use super::{SessionRuntime, ShellEvent};
    use crate::engine::SessionState;

    struct PanickingTransport;

    impl SessionTransport for PanickingTransport {
        fn create_session(&self, _first_message: &str) -> Result<CreatedSession, TransportError> {
            panic!("transport exploded");
        }

        fn fetch_history(&self, _identity: &str) -> Result<Vec<Turn>, TransportError> {
            panic!("transport exploded");
        }

        fn send_turn(&self, _identity: &str, _content: &str) -> Result<Turn, TransportError> {
            panic!("transport exploded");
        }
    }

    #[test]
    fn submit_creates_session_and_emits_identity_event() {
        let runtime = SessionRuntime::new(Arc::new(MockTransport::new()));

        runtime.submit("hello");
        runtime.drive_until_idle();

        runtime.with_snapshot(|snapshot| {
            assert_eq!(snapshot.state, &SessionState::Bound);
            assert_eq!(snapshot.identity, Some("100000"));
            assert_eq!(snapshot.transcript.len(), 2);
        });
        assert_eq!(
            runtime.take_shell_events(),
            vec![ShellEvent::IdentityAssigned("100000".to_string())]
        );
        assert!(runtime.take_render_requested());
    }

    #[test]
    fn resolve_fetches_history_exactly_once() {
        let transport = Arc::new(MockTransport::new());
        transport.push_history_result(Ok(vec![Turn::user("earlier"), Turn::assistant("reply")]));
        let runtime = SessionRuntime::new(Arc::clone(&transport) as Arc<dyn SessionTransport>);

        runtime.resolve(Some("123456"));
        runtime.drive_until_idle();
        runtime.resolve(Some("123456"));
        runtime.drive_until_idle();

        runtime.with_snapshot(|snapshot| {
            assert_eq!(snapshot.transcript.len(), 2);
            assert_eq!(snapshot.identity, Some("123456"));
        });
        assert_eq!(transport.recorded_calls().len(), 1);
    }

    #[test]
    fn failed_send_surfaces_error_and_keeps_user_turn() {
        let transport = Arc::new(MockTransport::new());
        transport.push_reply_result(Err(TransportError::status(
            502,
            Some("upstream down".to_string()),
        )));
        let runtime = SessionRuntime::new(Arc::clone(&transport) as Arc<dyn SessionTransport>);

        runtime.resolve(Some("123456"));
        runtime.drive_until_idle();
        runtime.submit("hello");
        runtime.drive_until_idle();

        runtime.with_snapshot(|snapshot| {
            assert_eq!(snapshot.state, &SessionState::Bound);
            assert_eq!(snapshot.transcript, &[Turn::user("hello")]);
            assert_eq!(snapshot.error, Some("upstream down"));
        });
    }

    #[test]
    fn lookup_failure_produces_notice_event() {
        let transport = Arc::new(MockTransport::new());
        transport.push_history_result(Err(TransportError::status(404, None)));
        let runtime = SessionRuntime::new(Arc::clone(&transport) as Arc<dyn SessionTransport>);

        runtime.lookup("999999");
        runtime.drive_until_idle();

        assert_eq!(
            runtime.take_shell_events(),
            vec![ShellEvent::Notice("Session not found".to_string())]
        );
    }

    #[test]
    fn panicking_transport_surfaces_transport_error() {
        let runtime = SessionRuntime::new(Arc::new(PanickingTransport));

        runtime.submit("hello");
        runtime.drive_until_idle();

        runtime.with_snapshot(|snapshot| {
            assert_eq!(snapshot.state, &SessionState::Unbound);
            assert_eq!(snapshot.error, Some("chat transport panicked"));
        });
        assert!(runtime.take_shell_events().is_empty());
    }
}
