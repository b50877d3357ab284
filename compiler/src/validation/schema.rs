//! JSON Schema checks for catalog documents and compiled pipelines.
//!
//! Schemas are embedded at compile time from the `schemas/` directory:
//! - `schema-catalog.json` - `{version: {eventType: [fieldPath]}}`
//! - `event-type-fields.json` - `{eventType: [fieldPath]}` (one version per file)
//! - `processing-pipeline.json` - translator output

use once_cell::sync::Lazy;
use serde_json::Value;

const CATALOG_SCHEMA_SRC: &str = include_str!("../../schemas/schema-catalog.json");
const EVENT_TYPES_SCHEMA_SRC: &str = include_str!("../../schemas/event-type-fields.json");
const PIPELINE_SCHEMA_SRC: &str = include_str!("../../schemas/processing-pipeline.json");

static CATALOG_SCHEMA: Lazy<Result<Value, String>> = Lazy::new(|| parse_schema(CATALOG_SCHEMA_SRC));
static EVENT_TYPES_SCHEMA: Lazy<Result<Value, String>> =
    Lazy::new(|| parse_schema(EVENT_TYPES_SCHEMA_SRC));
static PIPELINE_SCHEMA: Lazy<Result<Value, String>> =
    Lazy::new(|| parse_schema(PIPELINE_SCHEMA_SRC));

fn parse_schema(src: &str) -> Result<Value, String> {
    serde_json::from_str(src).map_err(|e| format!("Invalid embedded schema: {}", e))
}

/// Validate `data` against a draft-7 schema.
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use rulemap::validation::schema::validate;
///
/// let schema = json!({ "type": "object", "required": ["processing"] });
/// assert!(validate(&schema, &json!({ "processing": [] })).is_ok());
/// assert!(validate(&schema, &json!({})).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_embedded(schema: &Lazy<Result<Value, String>>, data: &Value) -> Result<(), Vec<String>> {
    match Lazy::force(schema) {
        Ok(schema) => validate(schema, data),
        Err(e) => Err(vec![e.clone()]),
    }
}

/// Whole catalog in one document.
pub fn validate_catalog_document(data: &Value) -> Result<(), Vec<String>> {
    validate_embedded(&CATALOG_SCHEMA, data)
}

/// One version's event types.
pub fn validate_event_types_document(data: &Value) -> Result<(), Vec<String>> {
    validate_embedded(&EVENT_TYPES_SCHEMA, data)
}

/// Compiled pipeline output.
pub fn validate_pipeline_document(data: &Value) -> Result<(), Vec<String>> {
    validate_embedded(&PIPELINE_SCHEMA, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_catalog() {
        let doc = json!({
            "4.1": { "syslogFields": ["event.syslogFields.syslogMsg"] },
            "5.3": { "faultFields": ["event.faultFields.alarmCondition"] }
        });
        assert!(validate_catalog_document(&doc).is_ok());
    }

    #[test]
    fn test_invalid_catalog() {
        let doc = json!({ "4.1": { "syslogFields": "event.syslogFields.syslogMsg" } });
        assert!(validate_catalog_document(&doc).is_err());
        assert!(validate_catalog_document(&json!({})).is_err());
    }

    #[test]
    fn test_event_types_document() {
        assert!(validate_event_types_document(&json!({ "faultFields": [] })).is_ok());
        assert!(validate_event_types_document(&json!({ "faultFields": [""] })).is_err());
    }

    #[test]
    fn test_pipeline_document() {
        let ok = json!({ "processing": [
            { "phase": "snmp_map", "processors": [{ "phase": "phase_1", "class": "RunPhase" }] },
            { "phase": "phase_1", "processors": [{ "phase": "map_publish", "class": "RunPhase" }] }
        ]});
        assert!(validate_pipeline_document(&ok).is_ok());

        let bad = json!({ "processing": [
            { "phase": "snmp_map", "processors": [{ "class": "Teleport" }] },
            { "phase": "phase_1", "processors": [] }
        ]});
        let errors = validate_pipeline_document(&bad).unwrap_err();
        assert!(!errors.is_empty());
    }
}
