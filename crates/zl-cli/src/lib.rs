//! Zoomable-timeline CLI library.
//!
//! This crate provides the `zl` command-line interface over the
//! `zl-core` derived-state engine.

mod cli;
pub mod commands;
mod config;
pub mod snapshot;

pub use cli::{Cli, Commands};
pub use config::Config;
