//! # archive-cli
//!
//! Argument parsing and command handlers for the `tg-archive` binary.

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, Selection};
pub use commands::run;
