//! Duplex channel between the harness and the program under test
//!
//! Two anonymous OS pipes, cross-wired: the harness writes into the
//! program's input, the program writes into the harness's output. The
//! program side is handed out as a [`Console`] so the program never touches
//! the real process stdin/stdout, which keeps concurrent runs in one process
//! safe.
//!
//! The output pipe is drained by a dedicated reader thread that forwards
//! whole lines into an in-memory channel; the runner waits on that channel
//! with a deadline instead of spinning on the pipe.

use std::fmt;
use std::io::{self, BufRead, BufReader, PipeReader, PipeWriter, Write};

use tokio::sync::mpsc;

use crate::common::{Error, Result};

/// The program-under-test's side of the channel.
///
/// Stands in for the terminal: line-oriented reads of what the harness sent,
/// line-oriented writes the harness will match against expected output.
pub struct Console {
    input: BufReader<PipeReader>,
    output: PipeWriter,
}

impl Console {
    /// Read the next input line, without its line terminator.
    ///
    /// Returns `Ok(None)` once the harness side has been closed.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    /// Write one output line, terminated with a newline.
    pub fn write_line(&mut self, line: impl fmt::Display) -> io::Result<()> {
        writeln!(self.output, "{line}")
    }
}

/// The harness's side of the channel.
pub(crate) struct DuplexChannel {
    input: PipeWriter,
    output: mpsc::UnboundedReceiver<String>,
}

impl DuplexChannel {
    /// Create the cross-wired pipe pair and start the output reader thread.
    pub(crate) fn connect() -> Result<(Self, Console)> {
        let (program_input, harness_input) = io::pipe().map_err(Error::ChannelSetup)?;
        let (harness_output, program_output) = io::pipe().map_err(Error::ChannelSetup)?;

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("interactest-output-reader".to_string())
            .spawn(move || drain_output(harness_output, line_tx))
            .map_err(Error::ChannelSetup)?;

        let channel = DuplexChannel {
            input: harness_input,
            output: line_rx,
        };
        let console = Console {
            input: BufReader::new(program_input),
            output: program_output,
        };
        Ok((channel, console))
    }

    /// Send one input line to the program. Fire-and-forget: if the program
    /// has already hung up its end, the write failure is traced and dropped;
    /// a later expected-output step will produce the real verdict.
    pub(crate) fn send_line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.input, "{text}") {
            tracing::debug!("input write after program hung up: {e}");
        }
    }

    /// Wait for the next output line. `None` means the program closed its
    /// output and no further line will ever arrive.
    pub(crate) async fn next_line(&mut self) -> Option<String> {
        self.output.recv().await
    }
}

/// Reader-thread body: forward whole lines until EOF or the runner goes away.
fn drain_output(pipe: PipeReader, line_tx: mpsc::UnboundedSender<String>) {
    for line in BufReader::new(pipe).lines() {
        match line {
            Ok(line) => {
                if line_tx.send(line).is_err() {
                    // Runner dropped its receiver; nothing left to report to.
                    break;
                }
            }
            Err(e) => {
                tracing::debug!("program output read failed: {e}");
                break;
            }
        }
    }
    tracing::trace!("program output reached EOF");
}
