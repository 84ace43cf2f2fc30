use anyhow::Result;
use moraine::domain::constants::PER_GLACIER_DIR;
use moraine::workflow::{GlacierDirectory, TaskLogTable, compile_task_log, discover_glacier_ids};
use moraine::{Workspace, initialize};
use std::path::{Path, PathBuf};

fn existing_gdirs(workspace: &Workspace) -> Result<Vec<GlacierDirectory>> {
    let base = workspace.working_dir()?.join(PER_GLACIER_DIR);
    let ids = discover_glacier_ids(&base)?;
    Ok(workspace.init_glacier_directories(ids, false)?)
}

pub fn status(params_file: Option<&Path>, tasks: &[String], suffix: &str) -> Result<()> {
    let workspace = initialize(params_file)?;
    let gdirs = existing_gdirs(&workspace)?;
    if gdirs.is_empty() {
        println!("No glacier directories in {}", workspace.working_dir()?.display());
        return Ok(());
    }

    let tasks: Vec<&str> = tasks.iter().map(String::as_str).collect();
    let table = TaskLogTable::collect(&gdirs, &tasks, suffix)?;

    let width = |column: usize| {
        table
            .rows
            .iter()
            .map(|row| row.cells[column].len())
            .chain(std::iter::once(table.columns[column].len()))
            .max()
            .unwrap_or_default()
    };
    let widths: Vec<usize> = (0..table.columns.len()).map(width).collect();

    let mut header = format!("{:<16}", "rgi_id");
    for (column, w) in table.columns.iter().zip(widths.iter().copied()) {
        header.push_str(&format!("  {column:<w$}"));
    }
    println!("{}", header.trim_end());

    for row in &table.rows {
        let mut line = format!("{:<16}", row.rgi_id);
        for (cell, w) in row.cells.iter().zip(widths.iter().copied()) {
            let cell = if cell.is_empty() { "-" } else { cell.as_str() };
            line.push_str(&format!("  {cell:<w$}"));
        }
        println!("{}", line.trim_end());
    }
    Ok(())
}

pub fn compile_log(
    params_file: Option<&Path>,
    tasks: &[String],
    path: Option<PathBuf>,
    append: bool,
    suffix: &str,
) -> Result<()> {
    let workspace = initialize(params_file)?;
    let gdirs = existing_gdirs(&workspace)?;
    let path = match path {
        Some(path) => path,
        None => workspace.working_dir()?.join(format!("task_log{suffix}.csv")),
    };

    let tasks: Vec<&str> = tasks.iter().map(String::as_str).collect();
    let table = compile_task_log(&gdirs, &tasks, Some(&path), append, suffix)?;
    println!("Task log of {} glaciers written to {}", table.rows.len(), path.display());
    Ok(())
}
