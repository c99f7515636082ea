use std::io::{self, BufRead, Write};
use std::sync::Arc;

use session_transport::{SessionTransport, Turn};

use crate::runtime::{SessionRuntime, ShellEvent};

const HELP_TEXT: &str = "Commands: /open <id>, /help, /quit";
const LOOKUP_FAILED_NOTICE: &str = "Session not found";

/// Line-oriented interactive front end over one [`SessionRuntime`].
///
/// Each input line is either a command or a message to submit. The shell
/// waits for the resulting calls to settle before prompting again, so the
/// conversation reads synchronously even though calls run on worker threads.
pub struct Shell {
    transport: Arc<dyn SessionTransport>,
    runtime: Arc<SessionRuntime>,
    startup_identity: Option<String>,
    printed_turns: usize,
    last_error: Option<String>,
}

impl Shell {
    #[must_use]
    pub fn new(transport: Arc<dyn SessionTransport>, startup_identity: Option<String>) -> Self {
        let runtime = SessionRuntime::new(Arc::clone(&transport));
        Self {
            transport,
            runtime,
            startup_identity,
            printed_turns: 0,
            last_error: None,
        }
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        let startup_identity = self.startup_identity.take();
        self.runtime.resolve(startup_identity.as_deref());
        self.settle(&mut output)?;

        let mut lines = input.lines();
        loop {
            write!(output, "{}", self.prompt())?;
            output.flush()?;

            let Some(line) = lines.next() else {
                break;
            };
            let line = line?;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            if line == "/quit" {
                break;
            }

            if line == "/help" {
                writeln!(output, "{HELP_TEXT}")?;
                continue;
            }

            if let Some(candidate) = line.strip_prefix("/open") {
                self.open(candidate.trim(), &mut output)?;
                continue;
            }

            if line.starts_with('/') {
                writeln!(output, "Unknown command. {HELP_TEXT}")?;
                continue;
            }

            self.runtime.submit(line);
            self.settle(&mut output)?;
        }

        Ok(())
    }

    fn open<W: Write>(&mut self, candidate: &str, output: &mut W) -> io::Result<()> {
        // Cheap local filter before any network round trip.
        if !is_candidate_identity(candidate) {
            writeln!(output, "! {LOOKUP_FAILED_NOTICE}")?;
            return Ok(());
        }

        self.runtime.lookup(candidate);
        self.settle(output)
    }

    /// Waits for in-flight calls to finish and reacts to everything they
    /// produced. Looping matters: a successful lookup remounts the runtime
    /// and starts a history fetch that must also settle.
    fn settle<W: Write>(&mut self, output: &mut W) -> io::Result<()> {
        loop {
            self.runtime.drive_until_idle();

            if self.runtime.take_render_requested() {
                self.render(output)?;
            }

            let events = self.runtime.take_shell_events();
            if events.is_empty() {
                return Ok(());
            }

            for event in events {
                match event {
                    ShellEvent::Notice(message) => writeln!(output, "! {message}")?,
                    ShellEvent::IdentityAssigned(identity) => {
                        writeln!(output, "session {identity} created")?;
                    }
                    ShellEvent::LookupSucceeded(identity) => self.remount(&identity, output)?,
                }
            }
        }
    }

    /// Switches to another session by replacing the runtime wholesale, the
    /// same as reloading the conversation view. The old transcript is
    /// dropped; the new engine binds to the validated identity.
    fn remount<W: Write>(&mut self, identity: &str, output: &mut W) -> io::Result<()> {
        writeln!(output, "joined session {identity}")?;

        self.runtime = SessionRuntime::new(Arc::clone(&self.transport));
        self.printed_turns = 0;
        self.last_error = None;
        self.runtime.resolve(Some(identity));

        Ok(())
    }

    fn render<W: Write>(&mut self, output: &mut W) -> io::Result<()> {
        let (new_turns, error) = self.runtime.with_snapshot(|snapshot| {
            let start = self.printed_turns.min(snapshot.transcript.len());
            let new_turns: Vec<Turn> = snapshot.transcript[start..].to_vec();
            (new_turns, snapshot.error.map(str::to_string))
        });

        for turn in &new_turns {
            writeln!(output, "{}> {}", turn.role, turn.content)?;
        }
        self.printed_turns += new_turns.len();

        if error != self.last_error {
            if let Some(message) = &error {
                writeln!(output, "! {message}")?;
            }
            self.last_error = error;
        }

        Ok(())
    }

    fn prompt(&self) -> String {
        let identity = self
            .runtime
            .with_snapshot(|snapshot| snapshot.identity.map(str::to_string));

        match identity {
            Some(identity) => format!("[{identity}] "),
            None => "[new] ".to_string(),
        }
    }
}

/// Candidate identities are exactly six ASCII digits; anything else is
/// rejected locally without a lookup.
fn is_candidate_identity(candidate: &str) -> bool {
    candidate.len() == 6 && candidate.bytes().all(|byte| byte.is_ascii_digit())
}
