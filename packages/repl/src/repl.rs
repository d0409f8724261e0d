//! Platform-independent REPL core.
//!
//! This module contains the main REPL loop logic.

use pathbridge::Bridge;

use crate::commands::{self, CommandResult};
use crate::host::TerminalHost;
use crate::io::{ExitReason, IoError, IoHost, Output, PromptConfig, Signal};

/// The platform-independent REPL core.
pub struct ReplCore {
    bridge: Bridge,
}

impl ReplCore {
    pub fn new(bridge: Bridge) -> Self {
        Self { bridge }
    }

    /// Run the REPL loop, reading/writing through the provided I/O host.
    pub fn run(&mut self, io: &mut impl IoHost) -> Result<ExitReason, IoError> {
        self.write_banner(io)?;

        loop {
            self.update_prompt(io)?;
            io.wait_for_input()?;

            if let Some(signal) = io.read_signal()? {
                match signal {
                    Signal::Eof => {
                        self.shut_down(io)?;
                        return Ok(ExitReason::Eof);
                    }
                    Signal::Interrupt => {
                        io.write_output(Output::info("^C (use 'exit' to quit)"))?;
                        continue;
                    }
                }
            }

            let input = match io.read_input()? {
                Some(input) => input,
                None => continue,
            };

            match commands::execute(&input.line, &self.bridge) {
                CommandResult::Ok { display: None } => {}
                CommandResult::Ok {
                    display: Some(output),
                } => {
                    io.write_output(Output::normal(output))?;
                }
                CommandResult::Error(msg) => {
                    io.write_output(Output::error(msg))?;
                }
                CommandResult::Help => {
                    io.write_output(Output::normal(commands::format_help()))?;
                }
                CommandResult::Exit => {
                    self.shut_down(io)?;
                    return Ok(ExitReason::UserExit);
                }
            }

            io.flush()?;
        }
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    fn write_banner(&self, io: &mut impl IoHost) -> Result<(), IoError> {
        io.write_output(Output::banner(BANNER))
    }

    fn update_prompt(&self, io: &mut impl IoHost) -> Result<(), IoError> {
        let service = self.bridge.service();
        io.write_prompt(PromptConfig {
            state: service.state().to_string(),
            open_handles: service.open_handles(),
        })
    }

    /// Stop the bridge so engine handles are released before exiting.
    fn shut_down(&self, io: &mut impl IoHost) -> Result<(), IoError> {
        if let Err(e) = self.bridge.stop() {
            io.write_output(Output::error(format!("stop failed: {}", e)))?;
        }
        io.write_output(Output::info("Goodbye!"))?;
        io.flush()
    }
}

/// Run the REPL on the terminal.
pub fn run(bridge: Bridge) -> Result<ExitReason, IoError> {
    let mut host = TerminalHost::new().map_err(|e| IoError::Io(e.to_string()))?;
    ReplCore::new(bridge).run(&mut host)
}

const BANNER: &str = r#"
             _   _     _          _     _
 _ __   __ _| |_| |__ | |__  _ __(_) __| | __ _  ___
| '_ \ / _` | __| '_ \| '_ \| '__| |/ _` |/ _` |/ _ \
| |_) | (_| | |_| | | | |_) | |  | | (_| | (_| |  __/
| .__/ \__,_|\__|_| |_|_.__/|_|  |_|\__,_|\__, |\___|
|_|                                       |___/

Type 'start' to bring the bridge up, 'help' for commands, 'exit' to quit.
"#;
