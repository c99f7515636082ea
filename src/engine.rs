use session_transport::{CreatedSession, SessionId, TransportError, Turn};

/// Identifier for one logical network call started through the host.
pub type CallId = u64;

/// Lifecycle state of one engine instance.
///
/// In-flight states carry the identifier of the call they are waiting on, so
/// stale completions for superseded calls are discarded structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No identity yet; the first submit will create a session.
    Unbound,
    /// History fetch in flight for a supplied identity.
    Binding { call_id: CallId },
    /// Session-creation request in flight, holding the first user message
    /// until the server confirms.
    Creating { call_id: CallId, first_message: String },
    /// Identity fixed, transcript loaded or empty. Steady state.
    Bound,
    /// Turn submission in flight on a bound session.
    Sending { call_id: CallId },
}

impl SessionState {
    /// True while a session-scoped network call is outstanding. Lookups are
    /// tracked separately and do not count.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Binding { .. } | Self::Creating { .. } | Self::Sending { .. }
        )
    }
}

/// Completion of one host-started call, fed back into the engine by the
/// runtime at its suspension points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    SessionCreated {
        call_id: CallId,
        result: Result<CreatedSession, TransportError>,
    },
    HistoryLoaded {
        call_id: CallId,
        result: Result<Vec<Turn>, TransportError>,
    },
    ReplyReceived {
        call_id: CallId,
        result: Result<Turn, TransportError>,
    },
    LookupResolved {
        call_id: CallId,
        candidate: String,
        result: Result<(), TransportError>,
    },
}

impl CallOutcome {
    #[must_use]
    pub fn call_id(&self) -> CallId {
        match self {
            Self::SessionCreated { call_id, .. }
            | Self::HistoryLoaded { call_id, .. }
            | Self::ReplyReceived { call_id, .. }
            | Self::LookupResolved { call_id, .. } => *call_id,
        }
    }

    #[must_use]
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::LookupResolved { .. })
    }
}

/// Read-only view of the engine handed to the presentation shell.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub state: &'a SessionState,
    pub transcript: &'a [Turn],
    pub identity: Option<&'a str>,
    pub error: Option<&'a str>,
}

/// Host seam through which the engine starts network calls and emits
/// shell-facing notifications. `begin_*` methods start exactly one transport
/// exchange and return the call identifier its completion will carry.
pub trait EngineHost {
    fn begin_create_session(&mut self, first_message: String) -> Result<CallId, String>;
    fn begin_fetch_history(&mut self, identity: String) -> Result<CallId, String>;
    fn begin_send_turn(&mut self, identity: String, content: String) -> Result<CallId, String>;
    fn begin_lookup(&mut self, candidate: String) -> Result<CallId, String>;

    /// Fired exactly once per engine lifetime, when a newly minted identity
    /// becomes known after the first successful submit.
    fn identity_assigned(&mut self, identity: &str);

    /// Candidate identity validated; the shell may navigate to it.
    fn lookup_succeeded(&mut self, candidate: &str);

    /// One-shot non-fatal notice for the shell's toast sink.
    fn notice(&mut self, message: String);

    fn request_render(&mut self);
}

const LOOKUP_FAILED_NOTICE: &str = "Session not found";

/// Client-side engine for one conversational session.
///
/// Owns the transcript and session identity exclusively; the shell only ever
/// reads [`Snapshot`]s and invokes the three operations. At most one
/// session-scoped network call is in flight at a time; operations that would
/// start a second one are rejected, not queued.
#[derive(Debug, Default)]
pub struct SessionEngine {
    state: SessionState,
    transcript: Vec<Turn>,
    identity: Option<SessionId>,
    error: Option<String>,
    pending_lookup: Option<CallId>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Unbound
    }
}

impl SessionEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current read-only view for rendering.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            state: &self.state,
            transcript: &self.transcript,
            identity: self.identity.as_deref(),
            error: self.error.as_deref(),
        }
    }

    /// Binds the engine to a caller-supplied identity, fetching history once.
    ///
    /// A missing or failing history is an expected case for a brand-new
    /// identity and is never surfaced as an error. Once the transcript holds
    /// locally known turns, `resolve` is a no-op: a stale fetch must not
    /// clobber turns the user already sent in this engine lifetime.
    pub fn resolve(&mut self, identity: Option<&str>, host: &mut dyn EngineHost) {
        if self.state.is_in_flight() {
            return;
        }

        let Some(identity) = identity.map(str::trim).filter(|value| !value.is_empty()) else {
            host.request_render();
            return;
        };

        if !self.transcript.is_empty() {
            return;
        }

        self.identity = Some(identity.to_string());
        self.state = match host.begin_fetch_history(identity.to_string()) {
            Ok(call_id) => SessionState::Binding { call_id },
            // Treated exactly like a failed fetch: no prior history.
            Err(_) => SessionState::Bound,
        };

        host.request_render();
    }

    /// Submits one user turn.
    ///
    /// With no bound identity this creates the session; otherwise the turn is
    /// appended optimistically and sent. A failed reply never removes the
    /// optimistic user turn — the user may resubmit or wait.
    pub fn submit(&mut self, text: &str, host: &mut dyn EngineHost) {
        let content = text.trim();
        if content.is_empty() || self.state.is_in_flight() {
            return;
        }

        match self.identity.clone() {
            None => self.begin_create(content, host),
            Some(identity) => self.begin_send(identity, content, host),
        }

        host.request_render();
    }

    /// Validates a user-entered candidate identity without disturbing the
    /// current session. Success is reported through
    /// [`EngineHost::lookup_succeeded`]; any failure surfaces uniformly as a
    /// "not found" notice.
    pub fn lookup(&mut self, candidate: &str, host: &mut dyn EngineHost) {
        let candidate = candidate.trim();
        if candidate.is_empty() || self.pending_lookup.is_some() {
            return;
        }

        match host.begin_lookup(candidate.to_string()) {
            Ok(call_id) => self.pending_lookup = Some(call_id),
            Err(_) => host.notice(LOOKUP_FAILED_NOTICE.to_string()),
        }
    }

    /// Reconciles one call completion. Outcomes that do not match the call
    /// the engine is currently waiting on are discarded: a superseded call is
    /// allowed to complete and its result thrown away.
    pub fn on_call_outcome(&mut self, outcome: CallOutcome, host: &mut dyn EngineHost) {
        match outcome {
            CallOutcome::HistoryLoaded { call_id, result } => {
                self.on_history_loaded(call_id, result, host);
            }
            CallOutcome::SessionCreated { call_id, result } => {
                self.on_session_created(call_id, result, host);
            }
            CallOutcome::ReplyReceived { call_id, result } => {
                self.on_reply_received(call_id, result, host);
            }
            CallOutcome::LookupResolved {
                call_id,
                candidate,
                result,
            } => {
                self.on_lookup_resolved(call_id, candidate, result, host);
            }
        }
    }

    fn begin_create(&mut self, content: &str, host: &mut dyn EngineHost) {
        match host.begin_create_session(content.to_string()) {
            Ok(call_id) => {
                self.state = SessionState::Creating {
                    call_id,
                    first_message: content.to_string(),
                };
            }
            Err(error) => {
                self.error = Some(error);
            }
        }
    }

    fn begin_send(&mut self, identity: SessionId, content: &str, host: &mut dyn EngineHost) {
        self.transcript.push(Turn::user(content));
        self.error = None;

        match host.begin_send_turn(identity, content.to_string()) {
            Ok(call_id) => self.state = SessionState::Sending { call_id },
            // The optimistic turn stays; only the reply failed to start.
            Err(error) => self.error = Some(error),
        }
    }

    fn on_history_loaded(
        &mut self,
        call_id: CallId,
        result: Result<Vec<Turn>, TransportError>,
        host: &mut dyn EngineHost,
    ) {
        if !matches!(self.state, SessionState::Binding { call_id: expected } if expected == call_id)
        {
            return;
        }

        if let Ok(history) = result {
            self.transcript = history;
        }

        self.state = SessionState::Bound;
        host.request_render();
    }

    fn on_session_created(
        &mut self,
        call_id: CallId,
        result: Result<CreatedSession, TransportError>,
        host: &mut dyn EngineHost,
    ) {
        let first_message = match &mut self.state {
            SessionState::Creating {
                call_id: expected,
                first_message,
            } if *expected == call_id => std::mem::take(first_message),
            _ => return,
        };

        match result {
            Ok(created) => {
                self.identity = Some(created.identity.clone());
                self.transcript.push(Turn::user(first_message));
                self.transcript.push(created.reply);
                self.error = None;
                self.state = SessionState::Bound;
                host.identity_assigned(&created.identity);
            }
            Err(error) => {
                self.state = SessionState::Unbound;
                self.error = Some(error.to_string());
            }
        }

        host.request_render();
    }

    fn on_reply_received(
        &mut self,
        call_id: CallId,
        result: Result<Turn, TransportError>,
        host: &mut dyn EngineHost,
    ) {
        if !matches!(self.state, SessionState::Sending { call_id: expected } if expected == call_id)
        {
            return;
        }

        match result {
            Ok(reply) => {
                self.transcript.push(reply);
                self.error = None;
            }
            // The optimistic user turn is kept deliberately.
            Err(error) => self.error = Some(error.to_string()),
        }

        self.state = SessionState::Bound;
        host.request_render();
    }

    fn on_lookup_resolved(
        &mut self,
        call_id: CallId,
        candidate: String,
        result: Result<(), TransportError>,
        host: &mut dyn EngineHost,
    ) {
        if self.pending_lookup != Some(call_id) {
            return;
        }

        self.pending_lookup = None;
        match result {
            Ok(()) => host.lookup_succeeded(&candidate),
            Err(_) => host.notice(LOOKUP_FAILED_NOTICE.to_string()),
        }
    }
}
