//! REPL command parsing and execution.
//!
//! Commands:
//! - `start` - Start the bridge
//! - `stop` - Stop the bridge, closing every open resource
//! - `status` - Show lifecycle state and open handles
//! - `<path> [command]` - Execute a command against a resource (default `read`)
//! - `exec <path> [command]` - Same, for paths that collide with a REPL command
//! - `raw <path> [command]` - Show the encoded result string instead
//! - `help` - Show help
//! - `exit` - Exit the REPL

use nu_ansi_term::{Color, Style};
use serde_json::Value as JsonValue;

use pathbridge::{decode_outcome, value_to_json, Bridge, BridgeError, Value};

/// Result of executing a command
pub enum CommandResult {
    /// Command succeeded, optionally with output to display
    Ok { display: Option<String> },
    /// Command failed with an error message
    Error(String),
    /// User requested to exit
    Exit,
    /// Show help
    Help,
}

impl CommandResult {
    fn ok_display(display: impl Into<String>) -> Self {
        CommandResult::Ok {
            display: Some(display.into()),
        }
    }

    fn ok_none() -> Self {
        CommandResult::Ok { display: None }
    }
}

/// Parse and execute a command
pub fn execute(input: &str, bridge: &Bridge) -> CommandResult {
    let input = input.trim();
    if input.is_empty() {
        return CommandResult::ok_none();
    }

    let (command, args) = split_word(input);
    match command {
        "help" | "?" => CommandResult::Help,
        "exit" | "quit" | "q" => CommandResult::Exit,
        "start" => cmd_start(bridge),
        "stop" => cmd_stop(bridge),
        "status" => cmd_status(bridge),
        "exec" => {
            let (path, command) = split_word(args);
            cmd_exec(path, command, bridge)
        }
        "raw" => {
            let (path, command) = split_word(args);
            cmd_raw(path, command, bridge)
        }
        path => cmd_exec(path, args, bridge),
    }
}

fn split_word(input: &str) -> (&str, &str) {
    let mut parts = input.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();
    (first, rest)
}

fn cmd_start(bridge: &Bridge) -> CommandResult {
    match bridge.start() {
        Ok(()) => CommandResult::ok_display(format!("{}", Color::Green.paint("bridge running"))),
        Err(e) => CommandResult::Error(describe_error(&e)),
    }
}

fn cmd_stop(bridge: &Bridge) -> CommandResult {
    match bridge.stop() {
        Ok(()) => CommandResult::ok_display(format!("{}", Color::Yellow.paint("bridge stopped"))),
        Err(e) => CommandResult::Error(describe_error(&e)),
    }
}

fn cmd_status(bridge: &Bridge) -> CommandResult {
    let service = bridge.service();
    CommandResult::ok_display(format!(
        "{} ({} open)",
        Style::new().bold().paint(service.state().to_string()),
        service.open_handles()
    ))
}

fn cmd_exec(path: &str, command: &str, bridge: &Bridge) -> CommandResult {
    if path.is_empty() {
        return CommandResult::Error("Usage: <path> [command]".to_string());
    }
    let command = if command.is_empty() { "read" } else { command };
    render(&bridge.execute(path, command))
}

fn cmd_raw(path: &str, command: &str, bridge: &Bridge) -> CommandResult {
    if path.is_empty() {
        return CommandResult::Error("Usage: raw <path> [command]".to_string());
    }
    let command = if command.is_empty() { "read" } else { command };
    CommandResult::ok_display(bridge.execute(path, command))
}

/// Render an encoded result for the terminal.
fn render(encoded: &str) -> CommandResult {
    match decode_outcome(encoded) {
        Ok(Ok(Value::String(text))) => CommandResult::ok_display(text),
        Ok(Ok(value)) => CommandResult::ok_display(format_json(&value_to_json(&value))),
        Ok(Err(error)) => CommandResult::Error(describe_error(&error)),
        Err(e) => CommandResult::Error(format!("{} ({})", e, encoded)),
    }
}

fn describe_error(error: &BridgeError) -> String {
    match error.detail() {
        Some(detail) if !detail.is_empty() => format!("{}: {}", error.kind(), detail),
        _ => error.kind().to_string(),
    }
}

/// Format help text
pub fn format_help() -> String {
    let cmd_style = Style::new().bold().fg(Color::Cyan);
    let arg_style = Style::new().fg(Color::Yellow);

    let mut help = String::new();
    help.push_str(&format!(
        "{}\n\n",
        Style::new().bold().paint("pathbridge REPL Commands")
    ));

    let commands = [
        ("start", "", "Start the bridge"),
        ("stop", "", "Stop the bridge and close open resources"),
        ("status", "", "Show bridge state and open handles"),
        ("", "", ""),
        ("<path>", "[command]", "Execute a command (default: read)"),
        ("exec", "<path> [command]", "Execute, for paths named like a REPL command"),
        ("raw", "<path> [command]", "Execute and show the encoded result"),
        ("", "", ""),
        ("help", "", "Show this help message"),
        ("exit", "", "Exit the REPL (alias: quit, q)"),
    ];

    for (cmd, args, desc) in commands {
        if cmd.is_empty() {
            help.push('\n');
        } else {
            help.push_str(&format!(
                "  {:<12} {:<20} {}\n",
                cmd_style.paint(cmd),
                arg_style.paint(args),
                desc
            ));
        }
    }

    help.push_str(&format!("\n{}\n", Style::new().bold().paint("Commands")));
    for (example, desc) in [
        ("read | read:name | read:a,b", "Whole record, one field, several fields"),
        ("write:name=alice,role=admin", "Set string fields"),
        ("put:{\"age\": 30}", "Merge a JSON object"),
        ("delete | delete:name", "Delete the resource, or some fields"),
        ("list | count", "Children of a database or collection"),
        ("query:role=admin", "Children of a collection matching every pair"),
    ] {
        help.push_str(&format!("  {:<32} {}\n", arg_style.paint(example), desc));
    }

    help.push_str(&format!(
        "\n{}",
        Style::new()
            .italic()
            .paint("Paths: database, database/collection or database/collection/object")
    ));

    help
}

/// Format JSON with syntax highlighting
fn format_json(value: &JsonValue) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());

    let mut result = String::new();
    let mut token = String::new();
    let mut in_string = false;
    let mut escape_next = false;

    for c in pretty.chars() {
        if in_string {
            token.push(c);
            if escape_next {
                escape_next = false;
            } else if c == '\\' {
                escape_next = true;
            } else if c == '"' {
                in_string = false;
                result.push_str(&Color::Green.paint(token.as_str()).to_string());
                token.clear();
            }
            continue;
        }

        match c {
            '"' => {
                flush_literal(&mut result, &mut token);
                in_string = true;
                token.push(c);
            }
            '{' | '}' | '[' | ']' | ':' | ',' | ' ' | '\n' => {
                flush_literal(&mut result, &mut token);
                result.push(c);
            }
            _ => token.push(c),
        }
    }
    flush_literal(&mut result, &mut token);

    result
}

fn flush_literal(result: &mut String, token: &mut String) {
    if token.is_empty() {
        return;
    }
    let color = match token.as_str() {
        "null" | "true" | "false" => Color::Yellow,
        _ => Color::Cyan,
    };
    result.push_str(&color.paint(token.as_str()).to_string());
    token.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathbridge::BridgeConfig;

    /// Strip ANSI escape codes from a string
    fn strip_ansi_codes(s: &str) -> String {
        let mut result = String::new();
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for next in chars.by_ref() {
                    if next == 'm' {
                        break;
                    }
                }
            } else {
                result.push(c);
            }
        }
        result
    }

    fn display(result: CommandResult) -> String {
        match result {
            CommandResult::Ok {
                display: Some(text),
            } => strip_ansi_codes(&text),
            CommandResult::Ok { display: None } => String::new(),
            CommandResult::Error(msg) => panic!("unexpected error: {}", msg),
            CommandResult::Exit => panic!("unexpected exit"),
            CommandResult::Help => panic!("unexpected help"),
        }
    }

    fn error(result: CommandResult) -> String {
        match result {
            CommandResult::Error(msg) => msg,
            _ => panic!("expected an error"),
        }
    }

    fn started() -> Bridge {
        let bridge = Bridge::new(BridgeConfig::default());
        bridge.start().unwrap();
        bridge
    }

    #[test]
    fn test_builtin_commands() {
        let bridge = Bridge::new(BridgeConfig::default());
        assert!(matches!(execute("help", &bridge), CommandResult::Help));
        assert!(matches!(execute("quit", &bridge), CommandResult::Exit));
        assert!(matches!(
            execute("   ", &bridge),
            CommandResult::Ok { display: None }
        ));
    }

    #[test]
    fn test_lifecycle_commands() {
        let bridge = Bridge::new(BridgeConfig::default());
        assert_eq!(display(execute("status", &bridge)), "stopped (0 open)");
        assert_eq!(
            error(execute("db read", &bridge)),
            "ServiceNotStarted"
        );

        assert_eq!(display(execute("start", &bridge)), "bridge running");
        execute("db/users write:name=alice", &bridge);
        assert_eq!(display(execute("status", &bridge)), "running (1 open)");

        assert_eq!(display(execute("stop", &bridge)), "bridge stopped");
        assert_eq!(display(execute("status", &bridge)), "stopped (0 open)");
    }

    #[test]
    fn test_exec_renders_decoded_results() {
        let bridge = started();
        assert_eq!(display(execute("db/users write:name=alice", &bridge)), "ok");
        assert_eq!(display(execute("db/users read:name", &bridge)), "alice");
        assert_eq!(
            display(execute("db/users", &bridge)),
            "{\n  \"name\": \"alice\"\n}"
        );
        assert_eq!(display(execute("db list", &bridge)), "[\n  \"users\"\n]");
        assert_eq!(display(execute("db/users read:age", &bridge)), "null");
    }

    #[test]
    fn test_exec_reports_errors_by_kind() {
        let bridge = started();
        assert_eq!(
            error(execute("db bogus", &bridge)),
            "UnsupportedCommand: unknown verb 'bogus'"
        );
        assert!(error(execute("db//x read", &bridge)).starts_with("InvalidPath: "));
    }

    #[test]
    fn test_exec_and_raw_prefixes() {
        let bridge = started();
        assert_eq!(display(execute("exec start write:x=1", &bridge)), "ok");
        assert_eq!(display(execute("exec start read:x", &bridge)), "1");
        assert_eq!(display(execute("raw start count", &bridge)), "!json:0");
        assert_eq!(display(execute("raw start", &bridge)), "!json:{\"x\":\"1\"}");
        assert!(error(execute("exec", &bridge)).starts_with("Usage"));
    }

    #[test]
    fn test_format_json_keeps_text() {
        let json = serde_json::json!({"a": [1, true, null], "b": "x\"y"});
        let plain = strip_ansi_codes(&format_json(&json));
        assert_eq!(
            plain,
            serde_json::to_string_pretty(&json).unwrap()
        );
    }
}
