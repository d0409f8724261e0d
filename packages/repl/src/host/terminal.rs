//! Terminal host implementation using Reedline.
//!
//! Readline-style line editing (Vi and Emacs modes), hints from history and
//! persistent history.

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::PathBuf;

use nu_ansi_term::{Color, Style};
use reedline::{
    default_emacs_keybindings, default_vi_insert_keybindings, default_vi_normal_keybindings,
    DefaultHinter, EditCommand, EditMode, Emacs, KeyCode, KeyModifiers, Prompt, PromptEditMode,
    PromptHistorySearch, PromptHistorySearchStatus, Reedline, ReedlineEvent,
    Signal as ReedlineSignal, Vi,
};

use crate::io::{InputLine, IoError, IoHost, Output, OutputStyle, PromptConfig, Signal};

/// Terminal host using Reedline for interactive I/O.
pub struct TerminalHost {
    line_editor: Reedline,
    pending_input: Option<InputLine>,
    pending_signal: Option<Signal>,
    current_prompt: PromptConfig,
}

impl TerminalHost {
    /// Create a new terminal host.
    pub fn new() -> io::Result<Self> {
        let hinter = Box::new(
            DefaultHinter::default().with_style(Style::new().fg(Color::LightGray).dimmed()),
        );

        let edit_mode: Box<dyn EditMode> = if should_use_vi_mode() {
            Box::new(Vi::new(
                default_vi_insert_keybindings(),
                default_vi_normal_keybindings(),
            ))
        } else {
            let mut keybindings = default_emacs_keybindings();
            keybindings.add_binding(
                KeyModifiers::CONTROL,
                KeyCode::Char('d'),
                ReedlineEvent::Edit(vec![EditCommand::Clear]),
            );

            Box::new(Emacs::new(keybindings))
        };

        let mut line_editor = Reedline::create()
            .with_hinter(hinter)
            .with_edit_mode(edit_mode);

        if let Some(history_path) = get_history_path() {
            if let Some(parent) = history_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(history) = reedline::FileBackedHistory::with_file(1000, history_path) {
                line_editor = line_editor.with_history(Box::new(history));
            }
        }

        Ok(Self {
            line_editor,
            pending_input: None,
            pending_signal: None,
            current_prompt: PromptConfig::default(),
        })
    }
}

impl IoHost for TerminalHost {
    fn wait_for_input(&mut self) -> Result<(), IoError> {
        let prompt = TerminalPrompt::from_config(&self.current_prompt);

        match self.line_editor.read_line(&prompt) {
            Ok(ReedlineSignal::Success(line)) => {
                self.pending_input = Some(InputLine { line });
            }
            Ok(ReedlineSignal::CtrlC) => {
                self.pending_signal = Some(Signal::Interrupt);
            }
            Ok(ReedlineSignal::CtrlD) => {
                self.pending_signal = Some(Signal::Eof);
            }
            Err(e) => {
                return Err(IoError::Io(format!("Reedline error: {}", e)));
            }
        }

        Ok(())
    }

    fn read_input(&mut self) -> Result<Option<InputLine>, IoError> {
        Ok(self.pending_input.take())
    }

    fn read_signal(&mut self) -> Result<Option<Signal>, IoError> {
        Ok(self.pending_signal.take())
    }

    fn write_output(&mut self, output: Output) -> Result<(), IoError> {
        let styled = match output.style {
            OutputStyle::Normal => output.text,
            OutputStyle::Error => {
                format!("{} {}", Color::Red.bold().paint("Error:"), output.text)
            }
            OutputStyle::Info => Color::Cyan.paint(&output.text).to_string(),
            OutputStyle::Banner => Color::Cyan.paint(&output.text).to_string(),
        };
        println!("{}", styled);
        Ok(())
    }

    fn write_prompt(&mut self, config: PromptConfig) -> Result<(), IoError> {
        self.current_prompt = config;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IoError> {
        io::stdout().flush().map_err(|e| IoError::Io(e.to_string()))
    }
}

/// Prompt showing the bridge state, e.g. `pathbridge running [2 open]`.
struct TerminalPrompt<'a> {
    config: &'a PromptConfig,
}

impl<'a> TerminalPrompt<'a> {
    fn from_config(config: &'a PromptConfig) -> Self {
        Self { config }
    }
}

impl Prompt for TerminalPrompt<'_> {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let state = &self.config.state;
        let state = if state == "running" {
            Color::Green.bold().paint(state)
        } else {
            Color::Yellow.paint(state)
        };
        Cow::Owned(format!(
            "pathbridge {} {}",
            state,
            Color::Blue.paint(format!("[{} open]", self.config.open_handles))
        ))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Default | PromptEditMode::Emacs => {
                Cow::Owned(format!("{} ", Color::Green.bold().paint(">")))
            }
            PromptEditMode::Vi(vi_mode) => {
                let indicator = match vi_mode {
                    reedline::PromptViMode::Normal => Color::Blue.bold().paint("[N]>"),
                    reedline::PromptViMode::Insert => Color::Green.bold().paint("[I]>"),
                };
                Cow::Owned(format!("{} ", indicator))
            }
            PromptEditMode::Custom(s) => Cow::Owned(format!("({})> ", s)),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let label = match history_search.status {
            PromptHistorySearchStatus::Passing => Color::Cyan.paint("history"),
            PromptHistorySearchStatus::Failing => Color::Red.paint("no match"),
        };
        Cow::Owned(format!("({}: {}) ", label, history_search.term))
    }
}

fn get_history_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("pathbridge").join("history.txt"))
}

/// Line editing mode, in order of precedence: `PATHBRIDGE_EDIT_MODE`
/// (set by `--vi`/`--emacs`), then `$VISUAL`/`$EDITOR`, then readline's
/// `editing-mode` in `.inputrc`.
fn should_use_vi_mode() -> bool {
    if let Ok(mode) = std::env::var("PATHBRIDGE_EDIT_MODE") {
        if let Some(vi) = parse_edit_mode(&mode) {
            return vi;
        }
    }

    let editor_is_vi = ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .any(|editor| is_vi_editor(&editor));

    editor_is_vi || inputrc_selects_vi()
}

/// `Some(true)` for vi, `Some(false)` for emacs.
fn parse_edit_mode(mode: &str) -> Option<bool> {
    match mode.trim().to_lowercase().as_str() {
        "vi" | "vim" => Some(true),
        "emacs" => Some(false),
        _ => None,
    }
}

fn is_vi_editor(editor: &str) -> bool {
    let program = editor
        .split_whitespace()
        .next()
        .and_then(|cmd| cmd.rsplit('/').next())
        .unwrap_or("")
        .to_lowercase();
    matches!(program.as_str(), "vi" | "vim" | "nvim" | "gvim")
}

fn inputrc_selects_vi() -> bool {
    let candidates = [
        std::env::var("INPUTRC").ok().map(PathBuf::from),
        dirs::home_dir().map(|p| p.join(".inputrc")),
        Some(PathBuf::from("/etc/inputrc")),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .any(|content| content.lines().any(is_vi_setting))
}

/// Matches `set editing-mode vi`.
fn is_vi_setting(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    words == ["set", "editing-mode", "vi"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit_mode() {
        assert_eq!(parse_edit_mode("vi"), Some(true));
        assert_eq!(parse_edit_mode(" Vim "), Some(true));
        assert_eq!(parse_edit_mode("emacs"), Some(false));
        assert_eq!(parse_edit_mode("nano"), None);
    }

    #[test]
    fn test_vi_editor_detection() {
        assert!(is_vi_editor("nvim"));
        assert!(is_vi_editor("/usr/bin/vim -u NONE"));
        assert!(!is_vi_editor("code --wait"));
        assert!(!is_vi_editor("evim-like"));
    }

    #[test]
    fn test_inputrc_setting() {
        assert!(is_vi_setting("set editing-mode vi"));
        assert!(is_vi_setting("  set   editing-mode   vi"));
        assert!(!is_vi_setting("set editing-mode emacs"));
        assert!(!is_vi_setting("# set editing-mode vi"));
    }

    #[test]
    fn test_prompt_shows_state_and_handles() {
        let config = PromptConfig {
            state: "running".to_string(),
            open_handles: 3,
        };
        let prompt = TerminalPrompt::from_config(&config);
        let rendered = prompt.render_prompt_left();
        assert!(rendered.contains("running"));
        assert!(rendered.contains("[3 open]"));
    }
}
