//! Interactive query shell
//!
//! Every line is an independent query; nothing carries over between
//! queries except the `top_k` setting.

pub mod commands;
pub mod input;

use anyhow::Result;
use colored::*;
use std::time::Duration;

use crate::cli::display::{label_error, render_answer, render_error};
use crate::rag::RagPipeline;
use crate::repl::commands::{help_text, parse, ShellInput};
use crate::repl::input::{default_history_path, InputHandler, Line};
use crate::types::Query;

/// Shell session coordinator
pub struct ShellSession {
    pipeline: RagPipeline,
    input: InputHandler,
    top_k: usize,
    timeout: Duration,
}

impl ShellSession {
    pub fn new(pipeline: RagPipeline, top_k: usize, timeout: Duration) -> Result<Self> {
        Ok(Self {
            pipeline,
            input: InputHandler::with_history(default_history_path())?,
            top_k,
            timeout,
        })
    }

    fn show_banner(&self) {
        let rule = "=".repeat(64);
        println!("\n{}", rule.cyan());
        println!("{}", "  PatentWhisperer - Interactive Patent Search".bold().cyan());
        println!(
            "{}",
            format!(
                "  Index: {} | top_k: {}",
                self.pipeline.config().index_name,
                self.top_k
            )
            .dimmed()
        );
        println!("{}\n", rule.cyan());
        println!(
            "Type a question (or {} for commands, {} to quit)\n",
            ":help".green(),
            ":quit".green()
        );
    }

    /// Apply a new top_k if it is in range
    fn set_top_k(&mut self, top_k: usize) -> std::result::Result<(), String> {
        let max = self.pipeline.config().max_top_k;
        if top_k == 0 || top_k > max {
            return Err(format!("top_k must be between 1 and {}", max));
        }
        self.top_k = top_k;
        Ok(())
    }

    /// Run until `:quit` or Ctrl-D
    pub async fn run(&mut self) -> Result<()> {
        self.show_banner();

        loop {
            let line = match self.input.read_line()? {
                Line::Text(line) => line,
                Line::Interrupted => continue,
                Line::Eof => break,
            };

            match parse(&line) {
                ShellInput::Empty => {}
                ShellInput::Quit => break,
                ShellInput::Help => println!("{}\n", help_text()),
                ShellInput::Invalid(msg) => eprintln!("{}", render_error(&msg)),
                ShellInput::SetTopK(n) => match self.set_top_k(n) {
                    Ok(()) => println!("{}", format!("top_k = {}", n).dimmed()),
                    Err(msg) => eprintln!("{}", render_error(&msg)),
                },
                ShellInput::Query(text) => {
                    let query = Query::new(text, self.top_k);
                    match self.pipeline.run_with_timeout(&query, self.timeout).await {
                        Ok(answer) => println!("{}", render_answer(&answer)),
                        Err(e) => {
                            let message = label_error(Some(&e), e.to_string());
                            eprintln!("{}", render_error(&message));
                        }
                    }
                }
            }
        }

        self.input.save_history()?;
        println!("{}", "Goodbye.".dimmed());
        Ok(())
    }
}
