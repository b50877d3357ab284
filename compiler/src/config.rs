//! Compiler configuration.
//!
//! Values come from the environment (a `.env` file is loaded first when
//! present) and can be overridden field by field, typically from CLI flags.
//!
//! | Variable | Default |
//! |---|---|
//! | `RULEMAP_ENTRY_PHASE` | `snmp_map` |
//! | `RULEMAP_RUN_PHASE` | `phase_1` |
//! | `RULEMAP_PUBLISH_PHASE` | `map_publish` |
//! | `RULEMAP_SCHEMA_CATALOG` | unset (no version check) |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const ENTRY_PHASE_VAR: &str = "RULEMAP_ENTRY_PHASE";
pub const RUN_PHASE_VAR: &str = "RULEMAP_RUN_PHASE";
pub const PUBLISH_PHASE_VAR: &str = "RULEMAP_PUBLISH_PHASE";
pub const SCHEMA_CATALOG_VAR: &str = "RULEMAP_SCHEMA_CATALOG";

pub const DEFAULT_ENTRY_PHASE: &str = "snmp_map";
pub const DEFAULT_RUN_PHASE: &str = "phase_1";
pub const DEFAULT_PUBLISH_PHASE: &str = "map_publish";

/// Names of the three pipeline phases surrounding the rule blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseNames {
    pub entry: String,
    pub run: String,
    pub publish: String,
}

impl PhaseNames {
    pub fn new(entry: impl Into<String>, run: impl Into<String>, publish: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            run: run.into(),
            publish: publish.into(),
        }
    }

    /// Replace entry/publish with ruleset-declared names, when present.
    pub fn with_overrides(&self, entry: Option<&str>, publish: Option<&str>) -> Self {
        Self {
            entry: entry.unwrap_or(&self.entry).to_string(),
            run: self.run.clone(),
            publish: publish.unwrap_or(&self.publish).to_string(),
        }
    }
}

impl Default for PhaseNames {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRY_PHASE, DEFAULT_RUN_PHASE, DEFAULT_PUBLISH_PHASE)
    }
}

/// Settings for one compiler process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerConfig {
    pub phases: PhaseNames,
    /// Catalog file or directory; `None` skips the version/event type check.
    pub catalog_path: Option<PathBuf>,
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `.env`, then read `RULEMAP_*` variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = PhaseNames::default();

        Self {
            phases: PhaseNames {
                entry: read(ENTRY_PHASE_VAR).unwrap_or(defaults.entry),
                run: read(RUN_PHASE_VAR).unwrap_or(defaults.run),
                publish: read(PUBLISH_PHASE_VAR).unwrap_or(defaults.publish),
            },
            catalog_path: read(SCHEMA_CATALOG_VAR).map(PathBuf::from),
        }
    }

    pub fn with_entry_phase(mut self, phase: impl Into<String>) -> Self {
        self.phases.entry = phase.into();
        self
    }

    pub fn with_run_phase(mut self, phase: impl Into<String>) -> Self {
        self.phases.run = phase.into();
        self
    }

    pub fn with_publish_phase(mut self, phase: impl Into<String>) -> Self {
        self.phases.publish = phase.into();
        self
    }

    pub fn with_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }
}
