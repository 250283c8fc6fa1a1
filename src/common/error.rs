//! Error types for the interaction harness
//!
//! Every way a run can fail gets its own variant so that a failing test
//! prints a diagnostic naming the actual cause, not just "test failed".

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the interaction harness
#[derive(Error, Debug)]
pub enum Error {
    // === Script errors ===
    #[error("malformed script: line {index} ({line:?}) must start with '<' or '>'")]
    MalformedScript { index: usize, line: String },

    // === Channel errors ===
    #[error("failed to set up interaction pipes: {0}")]
    ChannelSetup(#[source] io::Error),

    #[error("failed to spawn program thread: {0}")]
    ProgramSpawn(#[source] io::Error),

    // === Run lifecycle errors ===
    #[error("interaction tests can only be run once")]
    AlreadyRun,

    #[error("deadline exceeded: {cause}")]
    Timeout { cause: TimeoutCause },

    #[error("output mismatch at step {index}: expected {expected:?}, got {actual:?}")]
    OutputMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("program did not terminate within the deadline")]
    DidNotTerminate,

    // === Panic verdict errors ===
    #[error("program panicked unexpectedly: {0}")]
    UnexpectedPanic(String),

    #[error("panic expectation not met: expected {expected}, got {actual}")]
    PanicMismatch { expected: String, actual: String },

    // === Internal errors ===
    #[error("internal error: {0}")]
    Internal(String),
}

/// Why an expected-output step missed its line.
///
/// At most one of these is the true cause; the variant records which state
/// the program was in when the wait gave up, so the message distinguishes
/// "exited early" from "hung" from "panicked early".
#[derive(Error, Debug)]
pub enum TimeoutCause {
    #[error("program terminated without producing expected output {expected:?}")]
    TerminatedSilently { expected: String },

    #[error("program did not produce expected output {expected:?} in time")]
    StillRunning { expected: String },

    #[error("program panicked before producing expected output {expected:?}: {panic}")]
    PanickedEarly { expected: String, panic: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_the_cause() {
        let err = Error::Timeout {
            cause: TimeoutCause::StillRunning {
                expected: "done".to_string(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("did not produce expected output"));
        assert!(msg.contains("\"done\""));
    }

    #[test]
    fn mismatch_message_carries_both_values() {
        let err = Error::OutputMismatch {
            index: 2,
            expected: "0,30".to_string(),
            actual: "0.30".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"0,30\""));
        assert!(msg.contains("\"0.30\""));
        assert!(msg.contains("step 2"));
    }
}
