//! # CLI Argument Definitions

use clap::{Parser, Subcommand};
use moraine_logger::Verbosity;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "moraine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Glacier workflow parameters and task plumbing")]
pub struct Cli {
    /// Params file applied on top of the bundled defaults
    #[arg(long, global = true, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// CRITICAL, ERROR, WARNING, WORKFLOW, INFO or DEBUG
    #[arg(long, global = true, default_value = "WARNING", value_name = "LEVEL")]
    pub log_level: Verbosity,

    /// Also write daily-rotated log files to this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Write the log files as JSON lines
    #[arg(long, global = true, requires = "log_dir")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect and check parameters
    Params {
        #[command(subcommand)]
        action: ParamsAction,
    },
    /// Manage glacier directories
    Gdir {
        #[command(subcommand)]
        action: GdirAction,
    },
    /// Summarize task logs
    Tasks {
        #[command(subcommand)]
        action: TasksAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ParamsAction {
    /// Print the bundled defaults file
    Defaults {},
    /// Validate a params file against the schema
    Check {
        file: PathBuf,
        /// Reject keys that are not part of the schema
        #[arg(long)]
        strict: bool,
    },
    /// Print the effective value of one key
    Get { key: String },
    /// Print every effective parameter
    Dump {
        #[arg(long)]
        json: bool,
    },
    /// List keys whose value differs between the effective parameters and a file
    Diff { file: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum GdirAction {
    /// Create glacier directories under the working directory
    Init {
        #[arg(required = true, value_name = "RGI_ID")]
        ids: Vec<String>,
        /// Delete existing content first
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum TasksAction {
    /// Print the last status of tasks in every glacier directory
    Status {
        #[arg(required = true, value_name = "TASK")]
        tasks: Vec<String>,
        /// Suffix appended to each task name
        #[arg(long, default_value = "")]
        suffix: String,
    },
    /// Write the task status table as CSV
    CompileLog {
        #[arg(required = true, value_name = "TASK")]
        tasks: Vec<String>,
        /// Output file, `<working_dir>/task_log<suffix>.csv` by default
        #[arg(long, value_name = "FILE")]
        path: Option<PathBuf>,
        /// Join with an existing file instead of replacing it
        #[arg(long)]
        append: bool,
        #[arg(long, default_value = "")]
        suffix: String,
    },
}
