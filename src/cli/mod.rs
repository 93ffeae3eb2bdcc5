//! CLI module for PatentWhisperer
//!
//! Argument parsing and terminal rendering.

pub mod args;
pub mod display;

pub use args::{Args, Commands, Verbosity};
