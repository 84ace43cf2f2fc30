//! Summary table of task statuses across glacier directories.

use crate::error::{WorkflowError, WorkflowErrorExt};
use crate::fs::write_atomic;
use crate::gdir::GlacierDirectory;
use moraine_kernel::ParamsError;
use moraine_kernel::params::keys;
use std::path::{Path, PathBuf};
use tracing::info;

/// Index column of the task log table.
pub const INDEX_COLUMN: &str = "rgi_id";
/// Suffix given to appended columns that clash with existing ones.
pub const CLASH_SUFFIX: &str = "_n";

/// One glacier's row: its id and one cell per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLogRow {
    pub rgi_id: String,
    pub cells: Vec<String>,
}

/// Task statuses indexed by RGI id, one column per task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskLogTable {
    pub columns: Vec<String>,
    pub rows: Vec<TaskLogRow>,
}

impl TaskLogTable {
    /// Status strings of `task_names` in every directory. Tasks that never ran
    /// give an empty cell; commas become spaces so cells stay CSV-friendly.
    pub fn collect(
        gdirs: &[GlacierDirectory],
        task_names: &[&str],
        filesuffix: &str,
    ) -> Result<Self, WorkflowError> {
        let columns = task_names.iter().map(|t| format!("{t}{filesuffix}")).collect::<Vec<_>>();

        let rows = gdirs
            .iter()
            .map(|gdir| {
                let cells = columns
                    .iter()
                    .map(|task| {
                        Ok(gdir
                            .get_task_status(task)?
                            .map(|status| status.to_string().replace(',', " "))
                            .unwrap_or_default())
                    })
                    .collect::<Result<Vec<_>, WorkflowError>>()?;
                Ok(TaskLogRow { rgi_id: gdir.rgi_id().to_string(), cells })
            })
            .collect::<Result<Vec<_>, WorkflowError>>()?;

        Ok(Self { columns, rows })
    }

    /// The cell of `rgi_id` under `column`.
    #[must_use]
    pub fn get(&self, rgi_id: &str, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        let row = self.rows.iter().find(|r| r.rgi_id == rgi_id)?;
        row.cells.get(col).map(String::as_str)
    }

    /// Left-joins `other` onto this table by RGI id: every row of `self` is
    /// kept, ids only in `other` are dropped. Columns of `other` whose names
    /// are taken get [`CLASH_SUFFIX`].
    #[must_use]
    pub fn join(mut self, other: Self) -> Self {
        let width = self.columns.len();
        for column in other.columns {
            let mut name = column;
            while self.columns.contains(&name) {
                name.push_str(CLASH_SUFFIX);
            }
            self.columns.push(name);
        }

        for row in &mut self.rows {
            row.cells.resize(width, String::new());
            if let Some(new) = other.rows.iter().find(|r| r.rgi_id == row.rgi_id) {
                row.cells.extend(new.cells.iter().cloned());
            }
            row.cells.resize(self.columns.len(), String::new());
        }
        self
    }

    pub fn read_csv(path: &Path) -> Result<Self, WorkflowError> {
        let context = || path.display().to_string();
        let mut reader = csv::Reader::from_path(path).context(context())?;

        let headers = reader.headers().context(context())?.clone();
        let columns = headers.iter().skip(1).map(str::to_owned).collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.context(context())?;
            let mut fields = record.iter().map(str::to_owned);
            let rgi_id = fields.next().unwrap_or_default();
            let mut cells = fields.collect::<Vec<_>>();
            cells.resize(columns.len(), String::new());
            rows.push(TaskLogRow { rgi_id, cells });
        }

        Ok(Self { columns, rows })
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, WorkflowError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(
            std::iter::once(INDEX_COLUMN).chain(self.columns.iter().map(String::as_str)),
        )?;
        for row in &self.rows {
            writer.write_record(
                std::iter::once(row.rgi_id.as_str()).chain(row.cells.iter().map(String::as_str)),
            )?;
        }
        writer.into_inner().map_err(|e| WorkflowError::from(e.into_error()))
    }
}

/// Gathers the status of `task_names` in every directory and writes it as
/// CSV, returning the written table.
///
/// Without `path` the table goes to `<working_dir>/task_log<filesuffix>.csv`.
/// With `append` an existing file is joined with the new columns.
pub fn compile_task_log(
    gdirs: &[GlacierDirectory],
    task_names: &[&str],
    path: Option<&Path>,
    append: bool,
    filesuffix: &str,
) -> Result<TaskLogTable, WorkflowError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_path(gdirs, filesuffix)?,
    };

    let mut table = TaskLogTable::collect(gdirs, task_names, filesuffix)?;
    if append && path.exists() {
        table = TaskLogTable::read_csv(&path)?.join(table);
    }

    write_atomic(&path, &table.to_csv()?)?;
    info!("Task log of {} glaciers written to {}", table.rows.len(), path.display());
    Ok(table)
}

fn default_path(gdirs: &[GlacierDirectory], filesuffix: &str) -> Result<PathBuf, WorkflowError> {
    let working_dir = gdirs
        .iter()
        .find_map(GlacierDirectory::working_dir)
        .ok_or_else(|| ParamsError::Unset { key: keys::WORKING_DIR.to_owned() })
        .context("task log")?;
    Ok(working_dir.join(format!("task_log{filesuffix}.csv")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[(&str, &[&str])]) -> TaskLogTable {
        TaskLogTable {
            columns: columns.iter().map(ToString::to_string).collect(),
            rows: rows
                .iter()
                .map(|(id, cells)| TaskLogRow {
                    rgi_id: (*id).to_owned(),
                    cells: cells.iter().map(ToString::to_string).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn join_suffixes_clashing_columns() {
        let old = table(&["a", "b"], &[("RGI60-11.00001", &["SUCCESS", ""])]);
        let new = table(&["b", "c"], &[("RGI60-11.00001", &["SUCCESS", "Err: x"])]);

        let joined = old.join(new);
        assert_eq!(joined.columns, ["a", "b", "b_n", "c"]);
        assert_eq!(joined.get("RGI60-11.00001", "b_n"), Some("SUCCESS"));
        assert_eq!(joined.get("RGI60-11.00001", "c"), Some("Err: x"));
    }

    #[test]
    fn join_keeps_only_existing_rows() {
        let old = table(&["a"], &[("RGI60-11.00001", &["SUCCESS"])]);
        let new = table(
            &["b"],
            &[("RGI60-11.00002", &["SUCCESS"]), ("RGI60-11.00001", &["Err: x"])],
        );

        let joined = old.join(new);
        assert_eq!(joined.rows.len(), 1);
        assert_eq!(joined.get("RGI60-11.00001", "b"), Some("Err: x"));
        assert_eq!(joined.get("RGI60-11.00002", "b"), None);
    }

    #[test]
    fn join_leaves_unmatched_rows_empty() {
        let old = table(&["a"], &[("RGI60-11.00001", &["SUCCESS"])]);
        let new = table(&["b"], &[("RGI60-11.00002", &["SUCCESS"])]);

        let joined = old.join(new);
        assert_eq!(joined.columns, ["a", "b"]);
        assert_eq!(joined.get("RGI60-11.00001", "b"), Some(""));
    }

    #[test]
    fn csv_roundtrip_keeps_empty_cells() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("log.csv");
        let original = table(&["a", "b"], &[("RGI60-11.00001", &["", "Err: x y"])]);

        std::fs::write(&path, original.to_csv().unwrap()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("rgi_id,a,b\n"));
        assert_eq!(TaskLogTable::read_csv(&path).unwrap(), original);
    }
}
