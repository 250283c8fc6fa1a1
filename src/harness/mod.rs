//! The interaction harness: duplex channel plumbing and the runner that
//! replays a script against a program under test.

mod channel;
mod runner;

pub use channel::Console;
pub use runner::{InteractionTest, PanicExpectation, RunReport};
