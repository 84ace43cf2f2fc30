use moraine_logger::{Logger, Verbosity};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn workflow_verbosity_keeps_workflow_info_in_json_file() -> Result<(), Box<dyn std::error::Error>> {
    let tmp_dir = tempdir()?;
    let log_dir = tmp_dir.path().join("logs");

    let logger = Logger::builder()
        .name("integration-file-logging")
        .console(false)
        .verbosity(Verbosity::Workflow)
        .path(&log_dir)
        .json()
        .init()?;

    tracing::info!(target: "moraine_workflow::task", "(RGI60-11.00897) glacier_masks");
    tracing::info!(target: "some_dependency", "chatter");
    tracing::warn!(target: "some_dependency", "something odd");

    std::thread::sleep(Duration::from_millis(30));
    drop(logger);

    let log_file = fs::read_dir(&log_dir)?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.extension().and_then(|ext| ext.to_str()) == Some("log"))
        .expect("log file should be created");

    let content = fs::read_to_string(&log_file)?;
    assert!(content.contains("glacier_masks"));
    assert!(content.contains("something odd"));
    assert!(!content.contains("chatter"));
    for line in content.lines() {
        assert!(line.starts_with('{'), "expected JSON lines, got {line}");
    }

    Ok(())
}
