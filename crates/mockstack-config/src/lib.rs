// crates/mockstack-config/src/lib.rs
// ============================================================================
// Module: Mockstack Config Library
// Description: Canonical config model, validation, and artifact generation.
// Purpose: Single source of truth for mockstack.toml semantics.
// Dependencies: mockstack-core, serde, toml
// ============================================================================

//! ## Overview
//! `mockstack-config` defines the configuration model for the mock
//! orchestrator. It provides strict, fail-closed validation and converts a
//! loaded file into [`mockstack_core::OrchestratorSettings`] and
//! [`mockstack_core::StackConfig`] defaults. A JSON schema and a canonical
//! example are generated from the same model.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
pub use schema::config_schema;
