//! Field and cross-field validation tests for mockstack-config.
// crates/mockstack-config/tests/config_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Defaults, limits, mock-name rules, and runtime conversions.
// Purpose: Ensure invalid configuration fails closed and valid config maps
//          onto orchestrator settings without loss.
// =============================================================================

use mockstack_config::AuditSinkKind;
use mockstack_config::ClockMode;
use mockstack_config::MockstackConfig;
use mockstack_core::MockName;
use mockstack_core::SemanticVersion;
use mockstack_core::Timestamp;

mod common;

use common::TestResult;
use common::assert_invalid;
use common::config_from_toml;
use common::minimal_config;

fn parsed(toml_str: &str) -> Result<MockstackConfig, String> {
    config_from_toml(toml_str).map_err(|err| err.to_string())
}

#[test]
fn empty_file_yields_defaults() -> TestResult {
    let config = minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    if config != MockstackConfig::default() {
        return Err("empty file did not match defaults".to_string());
    }
    if config.validation.cache_capacity != mockstack_core::runtime::DEFAULT_CACHE_CAPACITY {
        return Err("cache capacity default drifted".to_string());
    }
    if !config.stack.auto_cleanup || config.stack.enabled_mocks.is_some() {
        return Err("stack defaults drifted".to_string());
    }
    if config.audit.sink != AuditSinkKind::None || config.clock.mode != ClockMode::System {
        return Err("audit or clock defaults drifted".to_string());
    }
    Ok(())
}

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    if config_from_toml("[stack]\nauto_clean = true\n").is_ok() {
        return Err("typo in stack section was accepted".to_string());
    }
    if config_from_toml("[server]\nport = 1\n").is_ok() {
        return Err("unknown section was accepted".to_string());
    }
    Ok(())
}

#[test]
fn cache_capacity_is_bounded() -> TestResult {
    let zero = parsed("[validation]\ncache_capacity = 0\n")?;
    assert_invalid(zero.validate(), "validation.cache_capacity must be between 1 and 65536")?;
    let huge = parsed("[validation]\ncache_capacity = 65537\n")?;
    assert_invalid(huge.validate(), "validation.cache_capacity")?;
    let edge = parsed("[validation]\ncache_capacity = 65536\n")?;
    edge.validate().map_err(|err| err.to_string())
}

#[test]
fn mock_names_must_be_well_formed() -> TestResult {
    let blank = parsed("[stack]\nenabled_mocks = [\"\"]\n")?;
    assert_invalid(blank.validate(), "stack.enabled_mocks")?;
    let spaced = parsed("[stack]\nshared_mocks = [\"use toast\"]\n")?;
    assert_invalid(spaced.validate(), "whitespace")?;
    let long = MockstackConfig {
        stack: mockstack_config::StackDefaultsConfig {
            enabled_mocks: Some(vec!["m".repeat(129)]),
            ..mockstack_config::StackDefaultsConfig::default()
        },
        ..MockstackConfig::default()
    };
    assert_invalid(long.validate(), "exceeds 128 bytes")
}

#[test]
fn duplicate_mock_names_are_rejected() -> TestResult {
    let config = parsed("[stack]\nenabled_mocks = [\"core\", \"core\"]\n")?;
    assert_invalid(config.validate(), "lists `core` more than once")
}

#[test]
fn shared_mocks_must_be_enabled() -> TestResult {
    let config = parsed("[stack]\nenabled_mocks = [\"core\"]\nshared_mocks = [\"useToast\"]\n")?;
    assert_invalid(config.validate(), "`useToast` is not in stack.enabled_mocks")?;
    let open = parsed("[stack]\nshared_mocks = [\"useToast\"]\n")?;
    open.validate().map_err(|err| err.to_string())
}

#[test]
fn compatibility_ranges_must_parse() -> TestResult {
    let malformed = parsed("[compatibility]\ncore = \"^one\"\n")?;
    assert_invalid(malformed.validate(), "compatibility.core")?;
    let empty = parsed("[compatibility]\ncore = \">2.0.0, <1.0.0\"\n")?;
    assert_invalid(empty.validate(), "compatibility.core")?;
    let bad_name = parsed("[compatibility]\n\"use toast\" = \"^1\"\n")?;
    assert_invalid(bad_name.validate(), "compatibility")
}

#[test]
fn file_sink_requires_path() -> TestResult {
    let missing = parsed("[audit]\nsink = \"file\"\n")?;
    assert_invalid(missing.validate(), "audit.path is required")?;
    let blank = parsed("[audit]\nsink = \"file\"\npath = \"  \"\n")?;
    assert_invalid(blank.validate(), "audit.path must be non-empty")?;
    let stray = parsed("[audit]\nsink = \"stderr\"\npath = \"audit.jsonl\"\n")?;
    assert_invalid(stray.validate(), "audit.path is only valid")
}

#[test]
fn audit_path_component_is_bounded() -> TestResult {
    let component = "a".repeat(300);
    let config = parsed(&format!("[audit]\nsink = \"file\"\npath = \"{component}/audit.jsonl\"\n"))?;
    assert_invalid(config.validate(), "audit.path path component too long")
}

#[test]
fn stack_config_carries_defaults() -> TestResult {
    let config = MockstackConfig::from_toml_str(
        "[stack]\nenabled_mocks = [\"core\", \"useToast\"]\nshared_mocks = [\"core\"]\n\
         strict_validation = true\nauto_cleanup = false\n",
    )
    .map_err(|err| err.to_string())?;
    let stack = config.stack_config();
    if !stack.is_enabled(&MockName::new("useToast")) || stack.is_enabled(&MockName::new("other")) {
        return Err("enabled set not carried".to_string());
    }
    if !stack.is_shared(&MockName::new("core")) || stack.is_shared(&MockName::new("useToast")) {
        return Err("shared set not carried".to_string());
    }
    if !stack.strict_validation || stack.auto_cleanup {
        return Err("flags not carried".to_string());
    }
    Ok(())
}

#[test]
fn compatibility_matrix_pins_ranges() -> TestResult {
    let config = MockstackConfig::from_toml_str("[compatibility]\ncore = \"~1.7\"\n")
        .map_err(|err| err.to_string())?;
    let matrix = config.compatibility_matrix().map_err(|err| err.to_string())?;
    let range = matrix.get("core").ok_or("core range missing")?;
    let inside = SemanticVersion::parse("1.7.4").map_err(|err| err.to_string())?;
    let outside = SemanticVersion::parse("1.8.0").map_err(|err| err.to_string())?;
    if !range.contains(inside) || range.contains(outside) {
        return Err("pinned range has wrong bounds".to_string());
    }
    if matrix.len() != 1 {
        return Err("unexpected matrix entries".to_string());
    }
    Ok(())
}

#[test]
fn logical_clock_starts_at_one() -> TestResult {
    let config =
        MockstackConfig::from_toml_str("[clock]\nmode = \"logical\"\n").map_err(|err| err.to_string())?;
    let clock = config.clock();
    if clock.now() != Timestamp::Logical(1) || clock.now() != Timestamp::Logical(2) {
        return Err("logical clock is not a counter from one".to_string());
    }
    Ok(())
}

#[test]
fn orchestrator_settings_reflect_every_section() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let audit_path = dir.path().join("audit.jsonl");
    let toml_str = format!(
        "[validation]\nstrict = true\ncache_capacity = 8\n\n[compatibility]\ncore = \
         \"^2\"\n\n[audit]\nsink = \"file\"\npath = \"{}\"\n",
        audit_path.display()
    );
    let config = MockstackConfig::from_toml_str(&toml_str).map_err(|err| err.to_string())?;
    let settings = config.orchestrator_settings().map_err(|err| err.to_string())?;
    if !settings.strict_validation || settings.cache_capacity != 8 {
        return Err("validation settings not carried".to_string());
    }
    if settings.matrix.get("core").is_none() {
        return Err("matrix not carried".to_string());
    }
    if !audit_path.exists() {
        return Err("file sink was not opened".to_string());
    }
    Ok(())
}

#[test]
fn unopenable_audit_file_is_an_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let audit_path = dir.path().join("missing-dir").join("audit.jsonl");
    let toml_str = format!("[audit]\nsink = \"file\"\npath = \"{}\"\n", audit_path.display());
    let config = MockstackConfig::from_toml_str(&toml_str).map_err(|err| err.to_string())?;
    match config.audit_sink() {
        Err(err) if err.code() == "config_io" => Ok(()),
        Err(err) => Err(format!("unexpected error: {err}")),
        Ok(_) => Err("expected io error".to_string()),
    }
}
