// crates/mockstack-config/src/schema.rs
// ============================================================================
// Module: Config Schemas
// Description: JSON schema builders for mockstack.toml.
// Purpose: Provide canonical validation schema for config artifacts.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! This module defines the JSON Schema for mockstack configuration. The schema
//! mirrors the config model and its limits so editors and CI can reject bad
//! files before a test run loads them.

use mockstack_core::runtime::registry::MAX_MOCK_NAME_BYTES;
use serde_json::Value;
use serde_json::json;

use crate::config::MAX_CACHE_CAPACITY;
use crate::config::MAX_MATRIX_ENTRIES;
use crate::config::MAX_PATH_COMPONENT_LENGTH;
use crate::config::MAX_RANGE_EXPRESSION_LENGTH;
use crate::config::MAX_STACK_MOCKS;
use crate::config::MAX_TOTAL_PATH_LENGTH;
use crate::config::MIN_CACHE_CAPACITY;
use crate::config::default_auto_cleanup;
use crate::config::default_cache_capacity;

/// Returns the JSON schema for `mockstack.toml`.
#[must_use]
pub fn config_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "mockstack://contract/schemas/config.schema.json",
        "title": "Mockstack Configuration",
        "description": "Configuration for the mock orchestrator and its test stacks.",
        "type": "object",
        "properties": {
            "validation": validation_config_schema(),
            "stack": stack_config_schema(),
            "compatibility": compatibility_schema(),
            "audit": audit_config_schema(),
            "clock": clock_config_schema()
        },
        "additionalProperties": false
    })
}

/// Schema for a single mock name.
fn mock_name_schema() -> Value {
    json!({
        "type": "string",
        "minLength": 1,
        "maxLength": MAX_MOCK_NAME_BYTES,
        "pattern": "^\\S+$"
    })
}

/// Schema for a bounded, duplicate-free list of mock names.
fn mock_name_list_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "description": description,
        "items": mock_name_schema(),
        "maxItems": MAX_STACK_MOCKS,
        "uniqueItems": true
    })
}

/// Schema for structural validation settings.
fn validation_config_schema() -> Value {
    json!({
        "type": "object",
        "description": "Structural validation settings.",
        "properties": {
            "strict": {
                "type": "boolean",
                "default": false,
                "description": "Report members outside the contract as warnings."
            },
            "cache_capacity": {
                "type": "integer",
                "minimum": MIN_CACHE_CAPACITY,
                "maximum": MAX_CACHE_CAPACITY,
                "default": default_cache_capacity(),
                "description": "Maximum cached validation results before LRU eviction."
            }
        },
        "additionalProperties": false
    })
}

/// Schema for stack defaults.
fn stack_config_schema() -> Value {
    json!({
        "type": "object",
        "description": "Defaults applied to stacks created from this config.",
        "properties": {
            "enabled_mocks": mock_name_list_schema(
                "Mocks a stack may contain. Omit to allow every registered mock."
            ),
            "shared_mocks": mock_name_list_schema(
                "Mocks whose single instance is shared across stacks."
            ),
            "strict_validation": {
                "type": "boolean",
                "default": false,
                "description": "Report undeclared members during stack creation."
            },
            "auto_cleanup": {
                "type": "boolean",
                "default": default_auto_cleanup(),
                "description": "Dispose stacks automatically at test-case teardown."
            }
        },
        "additionalProperties": false
    })
}

/// Schema for pinned compatibility ranges.
fn compatibility_schema() -> Value {
    json!({
        "type": "object",
        "description": "Version ranges pinned per mock name, checked after declared ranges.",
        "propertyNames": mock_name_schema(),
        "additionalProperties": {
            "type": "string",
            "minLength": 1,
            "maxLength": MAX_RANGE_EXPRESSION_LENGTH
        },
        "maxProperties": MAX_MATRIX_ENTRIES
    })
}

/// Schema for audit sink settings.
fn audit_config_schema() -> Value {
    json!({
        "type": "object",
        "description": "Audit sink settings.",
        "properties": {
            "sink": {
                "type": "string",
                "enum": ["none", "stderr", "file"],
                "default": "none"
            },
            "path": {
                "type": "string",
                "minLength": 1,
                "maxLength": MAX_TOTAL_PATH_LENGTH,
                "description": format!(
                    "JSON-lines log path; components are limited to {MAX_PATH_COMPONENT_LENGTH} bytes."
                )
            }
        },
        "allOf": [
            {
                "if": {
                    "properties": { "sink": { "const": "file" } },
                    "required": ["sink"]
                },
                "then": { "required": ["path"] },
                "else": { "not": { "required": ["path"] } }
            }
        ],
        "additionalProperties": false
    })
}

/// Schema for clock settings.
fn clock_config_schema() -> Value {
    json!({
        "type": "object",
        "description": "Timestamp source for audit events and snapshots.",
        "properties": {
            "mode": {
                "type": "string",
                "enum": ["system", "logical"],
                "default": "system"
            }
        },
        "additionalProperties": false
    })
}
