//! Error types for the rule compiler.
//!
//! Two families live here:
//!
//! - [`ServiceError`] - user-facing errors collected during validation and
//!   dependency resolution. Every one carries a stable message id, a template
//!   with `%N` placeholders and the variables used to render it.
//! - Fatal errors raised with `?`:
//!   - [`PayloadError`] - malformed input documents
//!   - [`CatalogError`] - schema catalog loading
//!   - [`TranslationError`] - translator coverage bugs
//!   - [`CompileError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Collected Errors
// =============================================================================

/// Category of a collected error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Malformed payload or ruleset structure.
    Format,
    /// A single element failed its local structural check.
    FieldValidation,
    /// Non-resolvable cycle among the actions of one rule.
    ActionDependency,
    /// Non-resolvable cycle among the rules of one ruleset.
    RuleDependency,
    /// Translator coverage bug or phase naming conflict.
    Translation,
}

/// Message catalog entry: stable id plus template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidRuleFormat,
    MissingRuleDescription,
    MissingAction,
    MissingActionField,
    MissingConcatValue,
    InvalidGroupCondition,
    MissingConditionItem,
    MissingOperand,
    InvalidOperator,
    MissingEntry,
    MissingDefaultValue,
    DuplicateKey,
    ActionDependency,
    RuleDependency,
    TranslateFailed,
    UnknownEventSchema,
}

impl ErrorCode {
    pub fn message_id(&self) -> &'static str {
        match self {
            Self::InvalidRuleFormat => "SVC6035",
            Self::MissingRuleDescription => "SVC6101",
            Self::MissingAction => "SVC6102",
            Self::MissingActionField => "SVC6103",
            Self::MissingConcatValue => "SVC6104",
            Self::InvalidGroupCondition => "SVC6105",
            Self::MissingConditionItem => "SVC6106",
            Self::MissingOperand => "SVC6107",
            Self::InvalidOperator => "SVC6108",
            Self::MissingEntry => "SVC6109",
            Self::MissingDefaultValue => "SVC6110",
            Self::DuplicateKey => "SVC6111",
            Self::ActionDependency => "SVC6112",
            Self::RuleDependency => "SVC6113",
            Self::TranslateFailed => "SVC6116",
            Self::UnknownEventSchema => "SVC6117",
        }
    }

    pub fn template(&self) -> &'static str {
        match self {
            Self::InvalidRuleFormat => "Error - Rule format is invalid: %1.",
            Self::MissingRuleDescription => "Please enter a rule description",
            Self::MissingAction => "Please add at least one action",
            Self::MissingActionField => "Please fill the %1 field of %2 action to %3",
            Self::MissingConcatValue => {
                "Please select at least two values for the concat action to %1"
            }
            Self::InvalidGroupCondition => "Invalid group condition type: %1",
            Self::MissingConditionItem => {
                "Please add at least one condition to the condition group"
            }
            Self::MissingOperand => "Please fill the %1 operand of the condition",
            Self::InvalidOperator => "Invalid condition operator: %1",
            Self::MissingEntry => "Please fill all key/value pairs of the action to %1",
            Self::MissingDefaultValue => "Please fill the default value of the map action to %1",
            Self::DuplicateKey => {
                "Duplicate key detected in the key/value list of the action to %1"
            }
            Self::ActionDependency => {
                "A circular dependency was detected between actions. The following fields should be resolved: %1"
            }
            Self::RuleDependency => {
                "A circular dependency was detected between rules: %1 within fields: %2"
            }
            Self::TranslateFailed => "Translation failed. Reason: %1",
            Self::UnknownEventSchema => "Event schema version %1 with event type %2 is not supported",
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRuleFormat => ErrorKind::Format,
            Self::ActionDependency => ErrorKind::ActionDependency,
            Self::RuleDependency => ErrorKind::RuleDependency,
            Self::TranslateFailed => ErrorKind::Translation,
            _ => ErrorKind::FieldValidation,
        }
    }
}

/// A structured, user-facing error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{message_id}: {message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message_id: String,
    /// Template with `%1..%N` placeholders.
    pub text: String,
    pub variables: Vec<String>,
    /// `text` rendered with `variables`.
    pub message: String,
}

impl ServiceError {
    pub fn new<I, S>(code: ErrorCode, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let variables: Vec<String> = variables.into_iter().map(Into::into).collect();
        let text = code.template().to_string();
        let message = render_template(&text, &variables);
        Self {
            kind: code.kind(),
            message_id: code.message_id().to_string(),
            text,
            variables,
            message,
        }
    }

    /// Error without placeholders.
    pub fn bare(code: ErrorCode) -> Self {
        Self::new(code, Vec::<String>::new())
    }

    pub fn invalid_format(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRuleFormat, [reason.into()])
    }

    pub fn translate_failed(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::TranslateFailed, [reason.into()])
    }
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%(\d+)").expect("placeholder pattern compiles"));

/// Replace `%N` placeholders in one pass over `text`.
///
/// Substituted values are never rescanned; out-of-range placeholders are kept.
pub fn render_template(text: &str, variables: &[String]) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| variables.get(idx))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Accumulates errors; validators never fail fast.
#[derive(Debug, Default, Clone)]
pub struct ErrorCollector {
    errors: Vec<ServiceError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ServiceError) {
        self.errors.push(error);
    }

    pub fn report<I, S>(&mut self, code: ErrorCode, variables: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(ServiceError::new(code, variables));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ServiceError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ServiceError> {
        self.errors
    }

    /// `Ok(value)` when nothing was collected.
    pub fn finish<T>(self, value: T) -> Result<T, Vec<ServiceError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

// =============================================================================
// Payload Errors
// =============================================================================

/// Errors while reading an input document.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Bytes could not be decoded to text.
    #[error("Failed to decode payload: {0}")]
    EncodingError(String),

    /// Invalid JSON or wrong shape.
    #[error("Invalid payload: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Discriminator names no known element.
    #[error("Unsupported element type: {0}")]
    UnsupportedElement(String),

    /// Document is neither a rule nor a ruleset.
    #[error("Missing ruleset: {0}")]
    MissingRuleset(String),
}

impl PayloadError {
    /// Same failure as a collected format error.
    pub fn to_service_error(&self) -> ServiceError {
        ServiceError::invalid_format(self.to_string())
    }
}

// =============================================================================
// Catalog Errors
// =============================================================================

/// Errors from the schema catalog loader.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error.
    #[error("Catalog IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Catalog JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Document does not match the catalog schema.
    #[error("Invalid catalog document {source_name}: {}", .errors.join("; "))]
    SchemaViolation {
        source_name: String,
        errors: Vec<String>,
    },
}

// =============================================================================
// Translation Errors
// =============================================================================

/// Internal translation failures. These indicate a coverage bug, never user error.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// No translator registered for an element.
    #[error("No translator registered for {0}")]
    MissingTranslator(String),

    /// Output could not be serialized.
    #[error("Failed to serialize pipeline: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Output does not match the pipeline document schema.
    #[error("Pipeline document is invalid: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),
}

// =============================================================================
// Compile Errors (Top-Level)
// =============================================================================

/// Top-level errors for one compile run.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Payload error.
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// Catalog error.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Translation error.
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Validation or dependency errors, complete set.
    #[error("Rules rejected with {} error(s)", .0.len())]
    Rejected(Vec<ServiceError>),

    /// Worker task failed.
    #[error("Compile task failed: {0}")]
    Task(String),
}

impl From<Vec<ServiceError>> for CompileError {
    fn from(errors: Vec<ServiceError>) -> Self {
        CompileError::Rejected(errors)
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for payload operations.
pub type PayloadResult<T> = Result<T, PayloadError>;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type for translation.
pub type TranslationResult<T> = Result<T, TranslationError>;

/// Result type for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
