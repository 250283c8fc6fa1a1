//! interactest - deterministic interaction testing for console programs
//!
//! Drives a program under test by feeding it scripted input lines and
//! asserting that scripted output lines appear, in order and verbatim,
//! within a single wall-clock deadline. Also captures whether the program
//! terminates, hangs, or panics when it should not (or fails to panic when
//! it should).
//!
//! ```no_run
//! use std::time::Duration;
//! use interactest::{InteractionTest, Script};
//!
//! # async fn demo() -> interactest::Result<()> {
//! let script = Script::parse(["<hello", ">hello"])?;
//! let mut test = InteractionTest::new(
//!     |mut console| {
//!         let line = console.read_line().unwrap().unwrap();
//!         console.write_line(line).unwrap();
//!     },
//!     script,
//! );
//! test.run(Duration::from_secs(1)).await
//! # }
//! ```

pub mod common;
pub mod harness;
pub mod script;

// Re-export commonly used types for tests
pub use common::{Error, Result, TimeoutCause};
pub use harness::{Console, InteractionTest, PanicExpectation, RunReport};
pub use script::{Direction, Script, Step};
