//! questctl library - exposes modules for testing.

pub mod cli;
pub mod commands;
pub mod output;

pub use cli::{Cli, Commands};
