//! I/O abstraction for the REPL.
//!
//! The core talks to the user only through [`IoHost`], so the same loop runs
//! against a terminal or a scripted host in tests.

pub mod types;

pub use types::*;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(String),
}

/// Host interface for REPL I/O.
pub trait IoHost {
    /// Block until a line or a signal is available.
    fn wait_for_input(&mut self) -> Result<(), IoError>;

    /// The pending input line, if any.
    fn read_input(&mut self) -> Result<Option<InputLine>, IoError>;

    /// The pending signal, if any.
    fn read_signal(&mut self) -> Result<Option<Signal>, IoError>;

    fn write_output(&mut self, output: Output) -> Result<(), IoError>;

    /// Update what the host renders before the next input.
    fn write_prompt(&mut self, config: PromptConfig) -> Result<(), IoError>;

    fn flush(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}
