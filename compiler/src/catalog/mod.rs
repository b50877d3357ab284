//! Event schema catalog lookup.
//!
//! The compiler only needs to know which `version -> eventType` pairs exist.
//! The catalog is loaded once at startup, then shared read-only between
//! concurrent compiles (`Arc<dyn SchemaCatalog>`).
//!
//! Two on-disk layouts are accepted:
//!
//! ```text
//! catalog.json            { "4.1": { "syslogFields": ["event.syslogFields.syslogMsg", ...] } }
//! catalog/4.1.json        { "syslogFields": ["event.syslogFields.syslogMsg", ...] }
//! ```

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::{CatalogError, CatalogResult};
use crate::validation::schema::{validate_catalog_document, validate_event_types_document};

/// Field paths per event type for one schema version.
pub type EventTypeFields = BTreeMap<String, BTreeSet<String>>;

/// Read-only `version -> {eventType -> fieldPaths}` lookup.
pub trait SchemaCatalog: Send + Sync {
    fn lookup(&self, version: &str) -> Option<&EventTypeFields>;

    /// Whether `event_type` is declared under `version`.
    fn contains(&self, version: &str, event_type: &str) -> bool {
        self.lookup(version)
            .is_some_and(|types| types.contains_key(event_type))
    }
}

/// Catalog backed by JSON documents.
#[derive(Debug, Clone, Default)]
pub struct JsonSchemaCatalog {
    versions: BTreeMap<String, EventTypeFields>,
}

impl JsonSchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one version.
    pub fn with_version(mut self, version: impl Into<String>, event_types: EventTypeFields) -> Self {
        self.versions.insert(version.into(), event_types);
        self
    }

    /// Load from a single document or a directory of `<version>.json` files.
    pub fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::from_dir(path)
        } else {
            Self::from_file(path)
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        Self::from_value(value, &path.display().to_string())
    }

    /// Parse a whole-catalog document.
    pub fn from_value(value: Value, source_name: &str) -> CatalogResult<Self> {
        validate_catalog_document(&value).map_err(|errors| CatalogError::SchemaViolation {
            source_name: source_name.to_string(),
            errors,
        })?;
        let versions: BTreeMap<String, EventTypeFields> = serde_json::from_value(value)?;
        Ok(Self { versions })
    }

    pub fn from_dir(dir: impl AsRef<Path>) -> CatalogResult<Self> {
        let mut catalog = Self::new();

        let mut paths: Vec<_> = fs::read_dir(dir.as_ref())?
            .flatten()
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|e| e == "json"))
            .collect();
        paths.sort();

        for path in paths {
            let Some(version) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let content = fs::read_to_string(&path)?;
            let value: Value = serde_json::from_str(&content)?;
            validate_event_types_document(&value).map_err(|errors| {
                CatalogError::SchemaViolation {
                    source_name: path.display().to_string(),
                    errors,
                }
            })?;
            let event_types: EventTypeFields = serde_json::from_value(value)?;
            catalog.versions.insert(version, event_types);
        }

        Ok(catalog)
    }

    pub fn versions(&self) -> Vec<&str> {
        self.versions.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl SchemaCatalog for JsonSchemaCatalog {
    fn lookup(&self, version: &str) -> Option<&EventTypeFields> {
        self.versions.get(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_from_value() {
        let catalog = JsonSchemaCatalog::from_value(
            json!({ "4.1": { "syslogFields": ["event.syslogFields.syslogMsg"] } }),
            "inline",
        )
        .unwrap();

        assert!(catalog.contains("4.1", "syslogFields"));
        assert!(!catalog.contains("4.1", "faultFields"));
        assert!(!catalog.contains("5.0", "syslogFields"));
        assert_eq!(
            catalog.lookup("4.1").map(|t| t["syslogFields"].len()),
            Some(1)
        );
    }

    #[test]
    fn test_rejects_bad_document() {
        let err = JsonSchemaCatalog::from_value(json!({ "4.1": ["not", "an", "object"] }), "inline")
            .unwrap_err();
        assert!(matches!(err, CatalogError::SchemaViolation { ref source_name, .. } if source_name == "inline"));
    }

    #[test]
    fn test_load_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("4.1.json"),
            r#"{ "syslogFields": ["event.syslogFields.syslogMsg"] }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("5.3.json"),
            r#"{ "faultFields": ["event.faultFields.alarmCondition"] }"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = JsonSchemaCatalog::load(dir.path()).unwrap();
        assert_eq!(catalog.versions(), vec!["4.1", "5.3"]);
        assert!(catalog.contains("5.3", "faultFields"));
    }

    #[test]
    fn test_load_single_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, r#"{ "4.1": { "syslogFields": [] } }"#).unwrap();

        let catalog = JsonSchemaCatalog::load(&path).unwrap();
        assert!(catalog.contains("4.1", "syslogFields"));
    }
}
