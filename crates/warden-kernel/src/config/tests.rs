use super::*;
use serde::Deserialize;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Deserialize, PartialEq)]
struct Sample {
    name: String,
    capacity: usize,
    #[serde(default)]
    endpoint: Option<String>,
}

#[test]
fn detects_known_extensions() {
    assert_eq!(detect_format("a.yml").unwrap(), FileFormat::Yaml);
    assert_eq!(detect_format("a.TOML").unwrap(), FileFormat::Toml);
    assert_eq!(detect_format("dir/a.json5").unwrap(), FileFormat::Json5);
    assert!(matches!(
        detect_format("a.xml"),
        Err(ConfigError::UnsupportedFormat(ext)) if ext == "xml"
    ));
    assert!(detect_format("noext").is_err());
}

#[test]
fn substitutes_set_variables_and_keeps_unset() {
    // SAFETY: test-local variable name, not read concurrently by other tests.
    unsafe { std::env::set_var("WARDEN_TEST_ENDPOINT", "ipc://host") };
    let out = substitute_env_vars("a=${WARDEN_TEST_ENDPOINT} b=$WARDEN_TEST_ENDPOINT c=${WARDEN_UNSET_X}");
    assert_eq!(out, "a=ipc://host b=ipc://host c=${WARDEN_UNSET_X}");
}

#[test]
fn loads_each_format_from_disk() {
    let dir = TempDir::new().unwrap();
    let cases = [
        ("c.toml", "name = \"w\"\ncapacity = 3\n"),
        ("c.yaml", "name: w\ncapacity: 3\n"),
        ("c.json", r#"{"name": "w", "capacity": 3}"#),
    ];
    for (file, body) in cases {
        let path = dir.path().join(file);
        fs::write(&path, body).unwrap();
        let cfg: Sample = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(
            cfg,
            Sample {
                name: "w".into(),
                capacity: 3,
                endpoint: None
            }
        );
    }
}

#[test]
fn later_sources_override_earlier() {
    let cfg: Sample = merge_configs(&[
        (r#"{"name": "base", "capacity": 10}"#, FileFormat::Json),
        ("capacity = 20", FileFormat::Toml),
    ])
    .unwrap();
    assert_eq!(cfg.name, "base");
    assert_eq!(cfg.capacity, 20);
}

#[test]
fn type_mismatch_is_serialization_error() {
    let result: ConfigResult<Sample> = from_str("name = \"w\"\ncapacity = \"many\"", FileFormat::Toml);
    assert!(matches!(result, Err(ConfigError::Serialization(_))));
}
