//! Shell built-in commands
//!
//! Lines starting with `:` are commands; everything else is a query.

use colored::*;

/// One line of shell input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    /// Run a query
    Query(String),
    /// `:k N` - change top_k for later queries
    SetTopK(usize),
    /// `:help`
    Help,
    /// `:quit` / `:exit` / `:q`
    Quit,
    /// Blank line
    Empty,
    /// Unparseable `:` command, with a message
    Invalid(String),
}

/// Parse a line of shell input
pub fn parse(line: &str) -> ShellInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ShellInput::Empty;
    }

    let Some(command) = trimmed.strip_prefix(':') else {
        return ShellInput::Query(trimmed.to_string());
    };

    let parts: Vec<&str> = command.split_whitespace().collect();
    match parts.first().map(|p| p.to_lowercase()).as_deref() {
        Some("quit") | Some("exit") | Some("q") => ShellInput::Quit,
        Some("help") | Some("h") => ShellInput::Help,
        Some("k") => match parts.get(1).and_then(|n| n.parse::<usize>().ok()) {
            Some(n) => ShellInput::SetTopK(n),
            None => ShellInput::Invalid("usage: :k <N>".to_string()),
        },
        _ => ShellInput::Invalid(format!("unknown command: {}", trimmed)),
    }
}

/// Help text
pub fn help_text() -> String {
    format!(
        "{}\n  {}  change how many patents are retrieved\n  {}  show this help\n  {}  leave the shell\n\nAnything else is run as a query.",
        "Commands:".bold(),
        ":k <N> ".green(),
        ":help  ".green(),
        ":quit  ".green(),
    )
}
