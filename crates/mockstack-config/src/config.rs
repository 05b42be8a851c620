// crates/mockstack-config/src/config.rs
// ============================================================================
// Module: Mockstack Configuration
// Description: Configuration loading and validation for the mock orchestrator.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: mockstack-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and defaults to the orchestrator's built-in
//! behavior. Invalid configuration fails closed: a file that names an invalid
//! mock, an unparsable range, or a file sink without a path is rejected as a
//! whole rather than partially applied.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use mockstack_core::AuditSink;
use mockstack_core::Clock;
use mockstack_core::CompatibilityMatrix;
use mockstack_core::FileAuditSink;
use mockstack_core::LogicalClock;
use mockstack_core::MockName;
use mockstack_core::NoopAuditSink;
use mockstack_core::OrchestratorSettings;
use mockstack_core::StackConfig;
use mockstack_core::StderrAuditSink;
use mockstack_core::SystemClock;
use mockstack_core::VersionRange;
use mockstack_core::runtime::registry::validate_name;
use mockstack_core::runtime::validator::DEFAULT_CACHE_CAPACITY;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "mockstack.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "MOCKSTACK_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Smallest accepted validation cache capacity.
pub(crate) const MIN_CACHE_CAPACITY: usize = 1;
/// Largest accepted validation cache capacity.
pub(crate) const MAX_CACHE_CAPACITY: usize = 65_536;
/// Maximum number of mocks named in `enabled_mocks` or `shared_mocks`.
pub(crate) const MAX_STACK_MOCKS: usize = 1024;
/// Maximum number of pinned compatibility ranges.
pub(crate) const MAX_MATRIX_ENTRIES: usize = 1024;
/// Maximum length of a compatibility range expression.
pub(crate) const MAX_RANGE_EXPRESSION_LENGTH: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Mock orchestrator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockstackConfig {
    /// Structural validation settings.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Defaults applied to stacks created from this config.
    #[serde(default)]
    pub stack: StackDefaultsConfig,
    /// Pinned version ranges keyed by mock name.
    #[serde(default)]
    pub compatibility: BTreeMap<String, String>,
    /// Audit sink settings.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Timestamp source settings.
    #[serde(default)]
    pub clock: ClockConfig,
}

impl MockstackConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path argument wins, then `MOCKSTACK_CONFIG`, then `mockstack.toml`
    /// in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validation.validate()?;
        self.stack.validate()?;
        validate_compatibility(&self.compatibility)?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the stack defaults as a [`StackConfig`].
    #[must_use]
    pub fn stack_config(&self) -> StackConfig {
        self.stack.to_stack_config()
    }

    /// Builds the pinned compatibility matrix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a range expression does not parse.
    pub fn compatibility_matrix(&self) -> Result<CompatibilityMatrix, ConfigError> {
        self.compatibility
            .iter()
            .map(|(name, expression)| {
                VersionRange::parse(expression)
                    .map(|range| (MockName::new(name.as_str()), range))
                    .map_err(|err| ConfigError::Invalid(format!("compatibility.{name}: {err}")))
            })
            .collect()
    }

    /// Opens the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file sink cannot be opened.
    pub fn audit_sink(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        self.audit.open()
    }

    /// Returns the configured clock.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        match self.clock.mode {
            ClockMode::System => Arc::new(SystemClock),
            ClockMode::Logical => Arc::new(LogicalClock::new()),
        }
    }

    /// Builds orchestrator settings from every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the matrix or audit sink cannot be built.
    pub fn orchestrator_settings(&self) -> Result<OrchestratorSettings, ConfigError> {
        Ok(OrchestratorSettings::default()
            .with_clock(self.clock())
            .with_audit_sink(self.audit_sink()?)
            .with_cache_capacity(self.validation.cache_capacity)
            .with_strict_validation(self.validation.strict)
            .with_matrix(self.compatibility_matrix()?))
    }
}

// ============================================================================
// SECTION: Validation Config
// ============================================================================

/// Structural validation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Strictness for standalone validation and debug reports.
    #[serde(default)]
    pub strict: bool,
    /// Maximum cached validation results.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict: false,
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl ValidationConfig {
    /// Validates cache bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CACHE_CAPACITY ..= MAX_CACHE_CAPACITY).contains(&self.cache_capacity) {
            return Err(ConfigError::Invalid(format!(
                "validation.cache_capacity must be between {MIN_CACHE_CAPACITY} and \
                 {MAX_CACHE_CAPACITY}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Stack Defaults
// ============================================================================

/// Defaults for stacks created from this config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackDefaultsConfig {
    /// Mocks allowed in a stack; absent allows every registered mock.
    #[serde(default)]
    pub enabled_mocks: Option<Vec<String>>,
    /// Mocks shared across stacks.
    #[serde(default)]
    pub shared_mocks: Vec<String>,
    /// Report undeclared members as warnings during stack creation.
    #[serde(default)]
    pub strict_validation: bool,
    /// Dispose stacks automatically at test-case teardown.
    #[serde(default = "default_auto_cleanup")]
    pub auto_cleanup: bool,
}

impl Default for StackDefaultsConfig {
    fn default() -> Self {
        Self {
            enabled_mocks: None,
            shared_mocks: Vec::new(),
            strict_validation: false,
            auto_cleanup: default_auto_cleanup(),
        }
    }
}

impl StackDefaultsConfig {
    /// Validates mock name lists.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(enabled) = &self.enabled_mocks {
            validate_name_list("stack.enabled_mocks", enabled)?;
        }
        validate_name_list("stack.shared_mocks", &self.shared_mocks)?;
        if let Some(enabled) = &self.enabled_mocks
            && let Some(outside) = self.shared_mocks.iter().find(|name| !enabled.contains(name))
        {
            return Err(ConfigError::Invalid(format!(
                "stack.shared_mocks entry `{outside}` is not in stack.enabled_mocks"
            )));
        }
        Ok(())
    }

    /// Converts into a core [`StackConfig`].
    fn to_stack_config(&self) -> StackConfig {
        StackConfig {
            enabled_mocks: self
                .enabled_mocks
                .as_ref()
                .map(|names| names.iter().map(|name| MockName::new(name.as_str())).collect()),
            shared_mocks: self.shared_mocks.iter().map(|name| MockName::new(name.as_str())).collect(),
            strict_validation: self.strict_validation,
            auto_cleanup: self.auto_cleanup,
        }
    }
}

// ============================================================================
// SECTION: Audit Config
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard audit events.
    #[default]
    None,
    /// Write JSON lines to stderr.
    Stderr,
    /// Append JSON lines to a file.
    File,
}

/// Audit sink settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path (file sink only).
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates sink and path pairing.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required when audit.sink = \"file\"".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid when audit.sink = \"file\"".to_string()))
            }
            (_, None) => Ok(()),
        }
    }

    /// Opens the configured sink.
    fn open(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
            (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
            (AuditSinkKind::File, Some(path)) => {
                let sink = FileAuditSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required when audit.sink = \"file\"".to_string()))
            }
        }
    }
}

// ============================================================================
// SECTION: Clock Config
// ============================================================================

/// Timestamp source selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// Wall-clock milliseconds.
    #[default]
    System,
    /// Deterministic counter starting at one.
    Logical,
}

/// Timestamp source settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClockConfig {
    /// Clock mode.
    #[serde(default)]
    pub mode: ClockMode,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Returns a stable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "config_io",
            Self::Parse(_) => "config_parse",
            Self::Invalid(_) => "config_invalid",
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a list of mock names: bounded, well-formed, and unique.
fn validate_name_list(field: &str, names: &[String]) -> Result<(), ConfigError> {
    if names.len() > MAX_STACK_MOCKS {
        return Err(ConfigError::Invalid(format!("{field} exceeds {MAX_STACK_MOCKS} entries")));
    }
    let mut seen = BTreeSet::new();
    for name in names {
        validate_name(name).map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))?;
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::Invalid(format!("{field} lists `{name}` more than once")));
        }
    }
    Ok(())
}

/// Validates pinned compatibility ranges.
fn validate_compatibility(ranges: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    if ranges.len() > MAX_MATRIX_ENTRIES {
        return Err(ConfigError::Invalid(format!(
            "compatibility exceeds {MAX_MATRIX_ENTRIES} entries"
        )));
    }
    for (name, expression) in ranges {
        validate_name(name).map_err(|err| ConfigError::Invalid(format!("compatibility: {err}")))?;
        if expression.len() > MAX_RANGE_EXPRESSION_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "compatibility.{name} exceeds {MAX_RANGE_EXPRESSION_LENGTH} bytes"
            )));
        }
        VersionRange::parse(expression)
            .map_err(|err| ConfigError::Invalid(format!("compatibility.{name}: {err}")))?;
    }
    Ok(())
}

/// Default validation cache capacity.
pub(crate) const fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

/// Default auto-cleanup flag.
pub(crate) const fn default_auto_cleanup() -> bool {
    true
}
