//! Line input for the shell using rustyline
//!
//! Emacs-style editing with history persisted between sessions.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// Result of reading one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Text(String),
    /// Ctrl-C: abandon the current line
    Interrupted,
    /// Ctrl-D
    Eof,
}

/// Input handler managing readline interface and command history
pub struct InputHandler {
    editor: DefaultEditor,
    history_path: Option<PathBuf>,
    prompt: String,
}

impl InputHandler {
    /// Create input handler with persistent history
    pub fn with_history(history_file: Option<PathBuf>) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;

        if let Some(path) = &history_file {
            if path.exists() {
                let _ = editor.load_history(path);
            }
        }

        Ok(InputHandler {
            editor,
            history_path: history_file,
            prompt: "patents> ".to_string(),
        })
    }

    /// Read a line of input from user
    pub fn read_line(&mut self) -> Result<Line> {
        match self.editor.readline(&self.prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let _ = self.editor.add_history_entry(trimmed);
                }
                Ok(Line::Text(trimmed.to_string()))
            }
            Err(ReadlineError::Interrupted) => Ok(Line::Interrupted),
            Err(ReadlineError::Eof) => Ok(Line::Eof),
            Err(err) => Err(anyhow::anyhow!("Readline error: {}", err)),
        }
    }

    /// Save history to disk
    pub fn save_history(&mut self) -> Result<()> {
        if let Some(path) = &self.history_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.editor.save_history(path)?;
        }
        Ok(())
    }
}

/// ~/.patentwhisperer/history
pub fn default_history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".patentwhisperer").join("history"))
}
