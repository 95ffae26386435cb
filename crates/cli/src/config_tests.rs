use super::*;
use tempfile::tempdir;

fn write_config(dir: &std::path::Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("config.yaml");
    std::fs::write(&path, contents).unwrap();
    path
}

const BASE: &str = r#"
run_records_dir: /data/run_records
scratch_root: /tmp/archiver-scratch
state_dir: /var/lib/archiver
lock_path: /var/lib/archiver/archiver.lock
artdaqdb:
  tool_path: /usr/bin/artdaqdb-tool
  database_uri: mongodb://localhost:27017/artdaq
ucondb:
  server_url: http://ucondb.example.org:8080
  folder_name: run_records
  object_name: run_config
  writer_user: writer
  writer_password: secret
fcl_conf_dir: /etc/archiver/fcl
"#;

#[test]
fn loads_minimal_config_with_defaults() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), BASE);

    let config = load(&path).unwrap();
    assert_eq!(config.pipeline.batch_size, 500);
    assert_eq!(config.pipeline.parallel_workers, 4);
    assert_eq!(config.pipeline.run_process_retries, 2);
    assert_eq!(config.artdaqdb.database_uri, "mongodb://localhost:27017/artdaq");
    assert_eq!(config.ucondb.folder_name, "run_records");
    assert!(config.carbon.is_none());
}

#[test]
fn expands_reference_to_sibling_config_value() {
    let dir = tempdir().unwrap();
    let yaml = format!(
        "{BASE}\nvalidator_params:\n  - [components, components]\ncarbon:\n  host: \"${{ucondb.server_url}}-carbon\"\n  port: 2003\n"
    );
    let path = write_config(dir.path(), &yaml);

    let config = load(&path).unwrap();
    assert_eq!(config.carbon.unwrap().host, "http://ucondb.example.org:8080-carbon");
}

#[test]
fn expands_environment_variable_reference() {
    std::env::set_var("RRA_TEST_DB_URI", "mongodb://prod-host/artdaq");
    let dir = tempdir().unwrap();
    let yaml = BASE.replace("mongodb://localhost:27017/artdaq", "${RRA_TEST_DB_URI}");
    let path = write_config(dir.path(), &yaml);

    let config = load(&path).unwrap();
    assert_eq!(config.artdaqdb.database_uri, "mongodb://prod-host/artdaq");
    std::env::remove_var("RRA_TEST_DB_URI");
}

#[test]
fn unresolved_reference_is_a_configuration_error() {
    let dir = tempdir().unwrap();
    let yaml = BASE.replace("mongodb://localhost:27017/artdaq", "${does_not_exist}");
    let path = write_config(dir.path(), &yaml);

    let err = load(&path).unwrap_err();
    assert!(matches!(err, ArchiverError::Configuration(_)));
}

#[test]
fn circular_reference_is_a_configuration_error() {
    let dir = tempdir().unwrap();
    let yaml = format!("{BASE}\nextra_a: \"${{extra_b}}\"\nextra_b: \"${{extra_a}}\"\n");
    let path = write_config(dir.path(), &yaml);

    // The cycle is only reachable if a real field references it; point
    // `fcl_conf_dir` at the cyclic pair to force expansion through it.
    let yaml = yaml.replace("/etc/archiver/fcl", "${extra_a}");
    std::fs::write(&path, yaml).unwrap();

    let err = load(&path).unwrap_err();
    assert!(matches!(err, ArchiverError::Configuration(_)));
}

#[test]
fn missing_required_field_is_a_configuration_error() {
    let dir = tempdir().unwrap();
    let yaml = BASE.replace("fcl_conf_dir: /etc/archiver/fcl\n", "");
    let path = write_config(dir.path(), &yaml);

    let err = load(&path).unwrap_err();
    assert!(matches!(err, ArchiverError::Configuration(_)));
}

#[test]
fn malformed_yaml_is_a_configuration_error() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), "not: [valid: yaml");

    let err = load(&path).unwrap_err();
    assert!(matches!(err, ArchiverError::Configuration(_)));
}
