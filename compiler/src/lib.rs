//! # Rulemap - mapping rule compiler
//!
//! Rulemap compiles user-authored event mapping rules into an ordered,
//! phase-based processing pipeline document for an event normalization engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Rule JSON  │────▶│  Validate   │────▶│   Resolve   │────▶│  Pipeline   │
//! │  (ISO/UTF8) │     │  (collect)  │     │  (reorder)  │     │    JSON     │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rulemap::{compile, CompilerConfig};
//!
//! let json = compile(payload, &CompilerConfig::from_env(), None)?;
//! println!("{}", json);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error hierarchy and the message catalog
//! - [`models`] - Rules, actions, conditions and element types
//! - [`payload`] - Byte decoding and payload parsing
//! - [`validation`] - Element, ruleset and JSON schema validation
//! - [`catalog`] - Event schema catalog lookup
//! - [`resolve`] - Dependency detection and reordering
//! - [`translate`] - Pipeline document generation
//! - [`pipeline`] - End-to-end compile, single and batch
//! - [`config`] - Environment configuration
//! - [`logs`] - Log broadcasting

// Core modules
pub mod error;
pub mod models;

// Input
pub mod payload;

// Validation
pub mod catalog;
pub mod validation;

// Compilation
pub mod resolve;
pub mod translate;

// Orchestration
pub mod config;
pub mod logs;
pub mod pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CatalogError, CompileError, CompileResult, ErrorCode, ErrorCollector, ErrorKind,
    PayloadError, ServiceError, TranslationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Action, Condition, ConditionGroup, ElementType, GroupType, LeafCondition, MappingRules,
    OperatorType, Rule,
};

// =============================================================================
// Re-exports - Catalog & Config
// =============================================================================

pub use catalog::{EventTypeFields, JsonSchemaCatalog, SchemaCatalog};
pub use config::{CompilerConfig, PhaseNames};

// =============================================================================
// Re-exports - Resolution & Translation
// =============================================================================

pub use resolve::{resolve_actions, resolve_rules, DependencyGraph};
pub use translate::{translate, PipelineDocument};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use payload::{parse_file, parse_str, Payload};
pub use pipeline::{
    compile, compile_batch, BatchProgress, compile_file, load_catalog, validate_imported_rules,
    validate_rule, validate_rules_before_translate,
};
