#![allow(clippy::print_stdout)]

mod args;
mod commands;

use crate::args::{Cli, Commands, GdirAction, ParamsAction, TasksAction};
use crate::commands::{gdir, params, tasks};
use anyhow::Result;
use clap::Parser;
use moraine_logger::Logger;
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let builder = Logger::builder().name("moraine").console(true).verbosity(cli.log_level);
    let _logger = match &cli.log_dir {
        Some(dir) if cli.log_json => builder.path(dir).json().init()?,
        Some(dir) => builder.path(dir).init()?,
        None => builder.init()?,
    };

    debug!(command = ?cli.command, params = ?cli.params, "Dispatching command");
    let params_file = cli.params.as_deref();

    match cli.command {
        Commands::Params { action } => match action {
            ParamsAction::Defaults {} => params::print_defaults(),
            ParamsAction::Check { file, strict } => params::check(&file, strict)?,
            ParamsAction::Get { key } => params::get(params_file, &key)?,
            ParamsAction::Dump { json } => params::dump(params_file, json)?,
            ParamsAction::Diff { file } => params::diff(params_file, &file)?,
        },
        Commands::Gdir { action } => match action {
            GdirAction::Init { ids, reset } => gdir::init(params_file, &ids, reset)?,
        },
        Commands::Tasks { action } => match action {
            TasksAction::Status { tasks, suffix } => tasks::status(params_file, &tasks, &suffix)?,
            TasksAction::CompileLog { tasks, path, append, suffix } => {
                tasks::compile_log(params_file, &tasks, path, append, &suffix)?;
            },
        },
    }

    Ok(())
}
