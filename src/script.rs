//! Interaction scripts
//!
//! A script is an ordered list of typed steps parsed from a line-prefixed
//! textual form: `<text` sends `text` (plus a newline) to the program under
//! test, `>text` expects the program to print exactly `text` next. Parsing is
//! pure; the only failure is a line with neither marker.

use crate::common::{Error, Result};

/// Which way a scripted line travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Fed to the program's input.
    Input,
    /// Expected on the program's output.
    Output,
}

/// One scripted interaction: a line to send or a line to expect.
///
/// `text` never contains the leading marker or a trailing line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    direction: Direction,
    text: String,
}

impl Step {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn parse(line: &str, index: usize) -> Result<Self> {
        if let Some(text) = line.strip_prefix('<') {
            Ok(Step {
                direction: Direction::Input,
                text: text.to_string(),
            })
        } else if let Some(text) = line.strip_prefix('>') {
            Ok(Step {
                direction: Direction::Output,
                text: text.to_string(),
            })
        } else {
            Err(Error::MalformedScript {
                index,
                line: line.to_string(),
            })
        }
    }
}

/// An immutable, ordered sequence of interaction steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    steps: Vec<Step>,
}

impl Script {
    /// Parse raw interaction lines into a script.
    ///
    /// Each line must start with `<` or `>`; the remainder is kept literally,
    /// with no escaping and no trimming. An empty script is legal.
    pub fn parse<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let steps = lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| Step::parse(line.as_ref(), index))
            .collect::<Result<Vec<_>>>()?;

        Ok(Script { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
