use moraine_kernel::config::load_params;
use moraine_kernel::params::{DEFAULT_PARAMS, SCHEMA};
use moraine_kernel::{ParamRegistry, ParamsBuilder};
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn defaults_and_schema_agree() {
    let params = ParamsBuilder::new().strict(true).build().unwrap();
    assert_eq!(params.undeclared().count(), 0);
    assert_eq!(params.len(), SCHEMA.len());
    for spec in SCHEMA {
        let entry = params.entry(spec.name).unwrap();
        assert_eq!(entry.kind, spec.kind, "{}", spec.name);
        assert!(spec.kind.admits(&entry.value), "{}", spec.name);
    }
    assert!(DEFAULT_PARAMS.contains("ys = 1990"));
}

#[test]
#[serial]
fn user_file_overrides_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "# my run\nborder = 80\ndem_file = /data/dem.tif\nmy_flag = True").unwrap();

    let params = load_params(Some(file.path())).unwrap();
    assert_eq!(params.get_int("border").unwrap(), 80);
    assert_eq!(params.get_path("dem_file").unwrap(), Some("/data/dem.tif".into()));
    assert!(params.get_bool("my_flag").unwrap());
    assert_eq!(params.doc("my_flag"), None);
    // Defaults keep their position and documentation.
    assert_eq!(params.iter().next().map(|e| e.key.as_str()), Some("working_dir"));
    assert!(params.doc("border").unwrap().starts_with("Grid border buffer"));
}

#[test]
#[serial]
fn registry_is_cheap_to_share() {
    let params = load_params(None::<&str>).unwrap();
    let clone = params.clone();
    let handle = std::thread::spawn(move || clone.get_float("glen_a").unwrap());
    assert_eq!(handle.join().unwrap(), params.get_float("glen_a").unwrap());
}

#[test]
fn parse_is_standalone() {
    let params = ParamRegistry::parse("border = 5\n").unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params.to_cfg_string().unwrap(), "border = 5\n");
}
