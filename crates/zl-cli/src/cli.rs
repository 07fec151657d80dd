//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Zoomable-timeline layout inspector.
///
/// Computes the derived layout of a timeline state snapshot — packed
/// rows, group stacking, paint order, calendar ticks — without
/// rendering anything.
#[derive(Debug, Parser)]
#[command(name = "zl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute event rows, group heights/offsets, and paint order for a
    /// state snapshot.
    Layout {
        /// Path to a JSON state snapshot.
        state: PathBuf,
    },

    /// Generate calendar tick intervals for a time range.
    Ticks {
        /// Bucket size: minute, quarter-hour, hour, four-hours, day,
        /// week, month, quarter, year, decade, or century.
        #[arg(long)]
        granularity: String,

        /// Range start (RFC 3339, or a naive timestamp read as UTC).
        #[arg(long)]
        from: String,

        /// Range end (RFC 3339, or a naive timestamp read as UTC).
        #[arg(long)]
        to: String,

        /// IANA timezone overriding the configured one.
        #[arg(long)]
        zone: Option<String>,

        /// Week start day overriding the configured one.
        #[arg(long)]
        week_start: Option<String>,
    },
}
