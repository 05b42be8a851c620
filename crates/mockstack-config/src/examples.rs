// crates/mockstack-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payloads.
// Purpose: Deterministic examples for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for mockstack configuration. Kept in sync with the
//! schema; the test suite loads it and validates it against the schema.

/// Returns a canonical example `mockstack.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[validation]
strict = false
cache_capacity = 1024

[stack]
enabled_mocks = ["core", "useToast", "ToastProvider"]
shared_mocks = ["core"]
strict_validation = false
auto_cleanup = true

[compatibility]
useToast = "^1.0.0"
core = ">=1.4.0, <2.0.0"

[audit]
sink = "file"
path = "target/mockstack-audit.jsonl"

[clock]
mode = "logical"
"#,
    )
}
