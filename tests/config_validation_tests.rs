//! Config Validation Tests
//!
//! Exercises typo detection and range validation of `las_harmonizer.toml`
//! independently from the rest of the pipeline.

use las_harmonizer::config::{validate_unknown_keys, ConfigError, HarmonizerConfig};
use std::io::Write;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_paths_section_warns_with_suggestion() {
    let toml_str = r#"
[paths]
destination_dri = "out"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("destination_dri"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("paths.destination_dir")
    );
}

#[test]
fn unknown_section_without_close_match_has_no_suggestion() {
    let toml_str = r#"
[telemetry]
endpoint = "http://localhost"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(!warnings.is_empty());
    assert!(warnings.iter().all(|w| w.suggestion.is_none()));
}

#[test]
fn valid_config_has_no_warnings() {
    let config = HarmonizerConfig::default();
    let toml_str = config.to_toml().unwrap();
    assert!(validate_unknown_keys(&toml_str).is_empty());
}

#[test]
fn typo_does_not_break_loading() {
    let file = write_config(
        r#"
[processing]
concurrency = 8
log_extention = "las"
"#,
    );
    let config = HarmonizerConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.processing.concurrency, 8);
    assert_eq!(config.processing.log_extension, "las");
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn partial_file_keeps_defaults() {
    let file = write_config(
        r#"
[output]
curve_precision = 6
"#,
    );
    let config = HarmonizerConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.output.curve_precision, 6);
    assert_eq!(config.output.depth_precision, 2);
    assert_eq!(config.tables.wells_prefix, "Wells_");
    assert_eq!(config.output.default_null_value, -999.25);
}

#[test]
fn every_violation_is_collected() {
    let file = write_config(
        r#"
[processing]
concurrency = 100000
archive_extension = ".zip"

[tables]
logs_prefix = "Wells_"
"#,
    );
    match HarmonizerConfig::load_from_file(file.path()) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 3, "{:?}", errors);
            assert!(errors.iter().any(|e| e.contains("processing.concurrency")));
            assert!(errors.iter().any(|e| e.contains("archive_extension")));
            assert!(errors.iter().any(|e| e.contains("must differ")));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn source_and_destination_must_differ() {
    let mut config = HarmonizerConfig::default();
    config.paths.destination_dir = config.paths.source_dir.clone();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("paths.destination_dir"));
}

#[test]
fn zero_concurrency_resolves_to_cpu_count() {
    let mut config = HarmonizerConfig::default();
    config.processing.concurrency = 0;
    assert!(config.effective_concurrency() >= 1);
    config.processing.concurrency = 3;
    assert_eq!(config.effective_concurrency(), 3);
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_config("[paths\nsource_dir = ");
    assert!(matches!(
        HarmonizerConfig::load_from_file(file.path()),
        Err(ConfigError::Parse(..))
    ));
}
