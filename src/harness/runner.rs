//! Interaction runner
//!
//! Drives one program under test against one script: spawns the program on a
//! detached thread wired to a [`DuplexChannel`], replays the script's steps in
//! order under a single wall-clock deadline, and turns whatever happens —
//! mismatched output, silence, a hang, a panic — into a typed verdict.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use colored::Colorize;
use tokio::sync::oneshot;
use tokio::time::{timeout_at, Instant};

use crate::common::{Error, Result, TimeoutCause};
use crate::script::{Direction, Script};

use super::channel::{Console, DuplexChannel};

/// What the program thread reported when it stopped: clean return or the
/// payload of its first uncaught panic.
type ThreadOutcome = std::result::Result<(), Box<dyn Any + Send + 'static>>;

/// Describes which panics satisfy a run configured to expect one.
///
/// Two matching modes cover the common payload shapes: [`of_type`] downcasts
/// to a concrete payload type (for `panic_any` with a typed value), and
/// [`message_contains`] inspects the string payloads produced by `panic!`.
///
/// [`of_type`]: PanicExpectation::of_type
/// [`message_contains`]: PanicExpectation::message_contains
pub struct PanicExpectation {
    description: String,
    matcher: Box<dyn Fn(&(dyn Any + Send)) -> bool + Send + Sync>,
}

impl PanicExpectation {
    /// Expect a panic whose payload downcasts to `T`.
    pub fn of_type<T: Any>() -> Self {
        PanicExpectation {
            description: format!("panic with payload of type {}", std::any::type_name::<T>()),
            matcher: Box::new(|payload| payload.downcast_ref::<T>().is_some()),
        }
    }

    /// Expect a panic whose message contains `fragment`.
    pub fn message_contains(fragment: impl Into<String>) -> Self {
        let fragment = fragment.into();
        PanicExpectation {
            description: format!("panic with message containing {fragment:?}"),
            matcher: Box::new(move |payload| {
                panic_message(payload).is_some_and(|msg| msg.contains(&fragment))
            }),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    fn matches(&self, payload: &(dyn Any + Send)) -> bool {
        (self.matcher)(payload)
    }
}

impl std::fmt::Debug for PanicExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanicExpectation")
            .field("description", &self.description)
            .finish()
    }
}

/// Summary of one finished run, for rendering outside the `Result` flow.
#[derive(Debug)]
pub struct RunReport {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
}

impl RunReport {
    /// Print a colored pass/fail verdict.
    pub fn render(&self) {
        if self.passed {
            println!(
                "{} {} ({}/{} steps)",
                "✓".green().bold(),
                format!("{} passed", self.name).green().bold(),
                self.steps_run,
                self.steps_total
            );
        } else {
            println!(
                "{} {}",
                "✗".red().bold(),
                format!("{} failed", self.name).red().bold()
            );
            if let Some(error) = &self.error {
                println!("  {}", error.as_str().dimmed());
            }
            println!("  {} of {} steps completed", self.steps_run, self.steps_total);
        }
    }
}

/// A single-use scripted interaction with one program under test.
///
/// The program is any `FnOnce(Console) + Send` closure; it may return
/// normally, run forever, or panic. The harness only ever observes it through
/// the console it hands over and through the thread's outcome.
pub struct InteractionTest {
    program: Option<Box<dyn FnOnce(Console) + Send + 'static>>,
    script: Script,
    expected_panic: Option<PanicExpectation>,
    verbose: bool,
    steps_completed: usize,
}

impl InteractionTest {
    pub fn new<F>(program: F, script: Script) -> Self
    where
        F: FnOnce(Console) + Send + 'static,
    {
        InteractionTest {
            program: Some(Box::new(program)),
            script,
            expected_panic: None,
            verbose: false,
            steps_completed: 0,
        }
    }

    /// Change the success criterion from "no panic" to "a panic matching
    /// `expectation`".
    pub fn expecting_panic(mut self, expectation: PanicExpectation) -> Self {
        self.expected_panic = Some(expectation);
        self
    }

    /// Print a checkmark line per replayed step.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run the interaction under one wall-clock deadline covering every step
    /// plus the final wait for the program to stop.
    ///
    /// At-most-once: a second call returns [`Error::AlreadyRun`] before doing
    /// any other work. A program still running when the deadline expires is
    /// left on its detached thread; it cannot block process exit.
    pub async fn run(&mut self, timeout: Duration) -> Result<()> {
        let program = self.program.take().ok_or(Error::AlreadyRun)?;
        let deadline = Instant::now() + timeout;

        let (mut channel, console) = DuplexChannel::connect()?;

        let (outcome_tx, mut outcome_rx) = oneshot::channel();
        std::thread::Builder::new()
            .name("interactest-program".to_string())
            .spawn(move || {
                let outcome = catch_unwind(AssertUnwindSafe(move || program(console)));
                // The runner may have given up already; that is fine.
                let _ = outcome_tx.send(outcome);
            })
            .map_err(Error::ProgramSpawn)?;

        for (index, step) in self.script.steps().iter().enumerate() {
            match step.direction() {
                Direction::Input => {
                    tracing::debug!(step = index, text = step.text(), "sending input line");
                    channel.send_line(step.text());
                    if self.verbose {
                        println!(
                            "  {} step {}: send {:?}",
                            "✓".green(),
                            index + 1,
                            step.text()
                        );
                    }
                }
                Direction::Output => {
                    tracing::debug!(step = index, text = step.text(), "awaiting output line");
                    let line = match timeout_at(deadline, channel.next_line()).await {
                        Ok(Some(line)) => line,
                        Ok(None) => {
                            // Output closed before the line arrived; the exact
                            // verdict depends on how the program thread ended,
                            // so give it until the deadline to report.
                            let cause =
                                classify_silence(&mut outcome_rx, deadline, step.text()).await;
                            return Err(Error::Timeout { cause });
                        }
                        Err(_) => {
                            let cause = classify_expiry(&mut outcome_rx, step.text());
                            return Err(Error::Timeout { cause });
                        }
                    };
                    if line != step.text() {
                        return Err(Error::OutputMismatch {
                            index,
                            expected: step.text().to_string(),
                            actual: line,
                        });
                    }
                    if self.verbose {
                        println!(
                            "  {} step {}: expect {:?}",
                            "✓".green(),
                            index + 1,
                            step.text()
                        );
                    }
                }
            }
            self.steps_completed = index + 1;
        }

        let outcome = match timeout_at(deadline, &mut outcome_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => {
                return Err(Error::Internal(
                    "program thread stopped without reporting an outcome".to_string(),
                ))
            }
            Err(_) => return Err(Error::DidNotTerminate),
        };

        self.check_outcome(outcome)
    }

    /// Run and fold the result into a [`RunReport`] for rendering.
    pub async fn report(mut self, name: impl Into<String>, timeout: Duration) -> RunReport {
        let steps_total = self.script.len();
        let result = self.run(timeout).await;
        RunReport {
            name: name.into(),
            passed: result.is_ok(),
            steps_run: self.steps_completed,
            steps_total,
            error: result.err().map(|e| e.to_string()),
        }
    }

    /// Final verdict once the program thread has stopped within the deadline.
    fn check_outcome(&self, outcome: ThreadOutcome) -> Result<()> {
        match (outcome, &self.expected_panic) {
            (Ok(()), None) => Ok(()),
            (Ok(()), Some(expectation)) => Err(Error::PanicMismatch {
                expected: expectation.description().to_string(),
                actual: "program completed without panicking".to_string(),
            }),
            (Err(payload), None) => Err(Error::UnexpectedPanic(describe_panic(payload.as_ref()))),
            (Err(payload), Some(expectation)) => {
                if expectation.matches(payload.as_ref()) {
                    Ok(())
                } else {
                    Err(Error::PanicMismatch {
                        expected: expectation.description().to_string(),
                        actual: describe_panic(payload.as_ref()),
                    })
                }
            }
        }
    }
}

/// The program closed its output mid-script. Wait (bounded by the deadline)
/// for the thread outcome so the verdict can say how it ended.
async fn classify_silence(
    outcome_rx: &mut oneshot::Receiver<ThreadOutcome>,
    deadline: Instant,
    expected: &str,
) -> TimeoutCause {
    match timeout_at(deadline, outcome_rx).await {
        Ok(Ok(Ok(()))) => TimeoutCause::TerminatedSilently {
            expected: expected.to_string(),
        },
        Ok(Ok(Err(payload))) => TimeoutCause::PanickedEarly {
            expected: expected.to_string(),
            panic: describe_panic(payload.as_ref()),
        },
        // Closed its console but kept running past the deadline.
        Ok(Err(_)) | Err(_) => TimeoutCause::StillRunning {
            expected: expected.to_string(),
        },
    }
}

/// The deadline expired while waiting for a line. Snapshot the thread state
/// without waiting any further.
fn classify_expiry(
    outcome_rx: &mut oneshot::Receiver<ThreadOutcome>,
    expected: &str,
) -> TimeoutCause {
    match outcome_rx.try_recv() {
        Ok(Ok(())) => TimeoutCause::TerminatedSilently {
            expected: expected.to_string(),
        },
        Ok(Err(payload)) => TimeoutCause::PanickedEarly {
            expected: expected.to_string(),
            panic: describe_panic(payload.as_ref()),
        },
        Err(_) => TimeoutCause::StillRunning {
            expected: expected.to_string(),
        },
    }
}

/// Best-effort rendering of a panic payload for diagnostics.
fn describe_panic(payload: &(dyn Any + Send)) -> String {
    match panic_message(payload) {
        Some(msg) => format!("panic: {msg}"),
        None => "panic with non-string payload".to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        Some(msg)
    } else {
        payload.downcast_ref::<String>().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    #[test]
    fn of_type_matches_by_downcast() {
        let expectation = PanicExpectation::of_type::<Marker>();
        let payload: Box<dyn Any + Send> = Box::new(Marker);
        assert!(expectation.matches(payload.as_ref()));

        let other: Box<dyn Any + Send> = Box::new("something else");
        assert!(!expectation.matches(other.as_ref()));
    }

    #[test]
    fn message_contains_matches_str_and_string_payloads() {
        let expectation = PanicExpectation::message_contains("divide by zero");

        let as_str: Box<dyn Any + Send> = Box::new("cannot divide by zero");
        assert!(expectation.matches(as_str.as_ref()));

        let as_string: Box<dyn Any + Send> = Box::new("cannot divide by zero".to_string());
        assert!(expectation.matches(as_string.as_ref()));

        let typed: Box<dyn Any + Send> = Box::new(Marker);
        assert!(!expectation.matches(typed.as_ref()));
    }

    #[test]
    fn describe_panic_prefers_the_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom".to_string());
        assert_eq!(describe_panic(payload.as_ref()), "panic: boom");

        let opaque: Box<dyn Any + Send> = Box::new(Marker);
        assert_eq!(
            describe_panic(opaque.as_ref()),
            "panic with non-string payload"
        );
    }
}
