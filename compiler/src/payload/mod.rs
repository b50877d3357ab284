//! Input documents: byte decoding and JSON parsing.
//!
//! A payload is either a whole ruleset (an object with a `rules` map) or a
//! single rule. Element discriminators are checked before typed parsing so
//! an unknown `actionType` surfaces as [`PayloadError::UnsupportedElement`]
//! rather than a generic JSON error.

use serde_json::Value;
use std::path::Path;

use crate::error::{PayloadError, PayloadResult};
use crate::models::{ElementType, MappingRules, Rule};

/// A parsed input document.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Rule(Rule),
    Rules(MappingRules),
}

impl Payload {
    /// Ruleset view; a single rule becomes a one-rule ruleset.
    pub fn into_mapping_rules(self) -> MappingRules {
        match self {
            Payload::Rules(rules) => rules,
            Payload::Rule(rule) => {
                let mut rules = MappingRules::new();
                rules.version = rule.version.clone();
                rules.event_type = rule.event_type.clone();
                rules.add_or_replace_rule(rule);
                rules
            }
        }
    }
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    match result.0.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes with the given encoding label. Unknown labels fall back to lossy UTF-8.
pub fn decode_bytes(bytes: &[u8], encoding: &str) -> PayloadResult<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
            .map_err(|e| PayloadError::EncodingError(e.to_string())),
        "iso-8859-1" | "latin-1" | "latin1" => {
            Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned())
        }
        label => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(encoding) => Ok(encoding.decode(bytes).0.into_owned()),
            None => Ok(String::from_utf8_lossy(bytes).into_owned()),
        },
    }
}

/// Decode bytes, trusting valid UTF-8 and detecting anything else.
///
/// Only single-byte Western encodings are accepted besides UTF-8; any other
/// detection result is decoded as Windows-1252.
pub fn decode_auto(bytes: &[u8]) -> PayloadResult<String> {
    let unbommed = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(unbommed) {
        return Ok(text.to_string());
    }
    let encoding = match detect_encoding(unbommed).as_str() {
        "iso-8859-1" => "iso-8859-1",
        _ => "windows-1252",
    };
    decode_bytes(unbommed, encoding)
}

/// Reject unknown `actionType` values anywhere in the document.
fn check_element_types(value: &Value) -> PayloadResult<()> {
    let check_rule = |rule: &Value| -> PayloadResult<()> {
        let Some(actions) = rule.get("actions").and_then(Value::as_array) else {
            return Ok(());
        };
        for action in actions {
            let action_type = action
                .get("actionType")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if ElementType::from_action_type(action_type).is_none() {
                return Err(PayloadError::UnsupportedElement(action_type.to_string()));
            }
        }
        Ok(())
    };

    match value.get("rules") {
        Some(Value::Object(rules)) => rules.values().try_for_each(check_rule),
        _ => check_rule(value),
    }
}

/// Parse a JSON value into a rule or a ruleset.
///
/// Ruleset rules take their uid from their key; a lone rule without a uid
/// gets a generated one.
pub fn parse_value(value: Value) -> PayloadResult<Payload> {
    let Value::Object(object) = &value else {
        return Err(PayloadError::MissingRuleset(
            "expected a JSON object".to_string(),
        ));
    };

    match object.get("rules") {
        Some(Value::Object(_)) => {
            check_element_types(&value)?;
            let mut rules: MappingRules = serde_json::from_value(value)?;
            rules.sync_uids();
            Ok(Payload::Rules(rules))
        }
        Some(_) => Err(PayloadError::MissingRuleset(
            "`rules` must be an object keyed by rule id".to_string(),
        )),
        None if object.contains_key("actions") || object.contains_key("description") => {
            check_element_types(&value)?;
            let mut rule: Rule = serde_json::from_value(value)?;
            rule.ensure_uid();
            Ok(Payload::Rule(rule))
        }
        None => Err(PayloadError::MissingRuleset(
            "document has neither `rules` nor `actions`".to_string(),
        )),
    }
}

pub fn parse_str(text: &str) -> PayloadResult<Payload> {
    let value: Value = serde_json::from_str(text)?;
    parse_value(value)
}

pub fn parse_bytes(bytes: &[u8]) -> PayloadResult<Payload> {
    parse_str(&decode_auto(bytes)?)
}

pub fn parse_file(path: impl AsRef<Path>) -> PayloadResult<Payload> {
    let bytes = std::fs::read(path)?;
    parse_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ruleset_syncs_uids() {
        let payload = parse_value(json!({
            "version": "4.1",
            "eventType": "syslogFields",
            "rules": {
                "rule-a": { "uid": "stale", "description": "a", "actions": [
                    { "actionType": "copy", "target": "x", "from": { "value": "1" } }
                ]}
            }
        }))
        .unwrap();

        let Payload::Rules(rules) = payload else {
            panic!("expected ruleset");
        };
        assert_eq!(rules.get("rule-a").map(|r| r.uid.as_str()), Some("rule-a"));
    }

    #[test]
    fn test_parse_single_rule_generates_uid() {
        let payload = parse_value(json!({
            "description": "single",
            "version": "4.1",
            "actions": [{ "actionType": "copy", "target": "x", "from": { "value": "1" } }]
        }))
        .unwrap();

        let rules = payload.into_mapping_rules();
        assert_eq!(rules.len(), 1);
        assert!(!rules.rule_ids()[0].is_empty());
        assert_eq!(rules.version.as_deref(), Some("4.1"));
    }

    #[test]
    fn test_unknown_action_type_is_format_error() {
        let err = parse_value(json!({
            "rules": { "1": { "description": "d", "actions": [{ "actionType": "levitate", "target": "x" }] } }
        }))
        .unwrap_err();
        assert!(matches!(err, PayloadError::UnsupportedElement(ref t) if t == "levitate"));
        assert_eq!(
            err.to_service_error().message,
            "Error - Rule format is invalid: Unsupported element type: levitate."
        );
    }

    #[test]
    fn test_missing_ruleset() {
        assert!(matches!(parse_value(json!([1, 2])), Err(PayloadError::MissingRuleset(_))));
        assert!(matches!(parse_value(json!({ "rules": [] })), Err(PayloadError::MissingRuleset(_))));
        assert!(matches!(parse_value(json!({ "name": "x" })), Err(PayloadError::MissingRuleset(_))));
        assert!(matches!(parse_str("{ not json"), Err(PayloadError::JsonError(_))));
    }

    #[test]
    fn test_decode_latin1_payload() {
        // "Règle" in ISO-8859-1
        let bytes = b"{\"description\":\"R\xE8gle\",\"actions\":[]}";
        let payload = parse_bytes(bytes).unwrap();
        let Payload::Rule(rule) = payload else {
            panic!("expected rule");
        };
        assert_eq!(rule.description, "Règle");
    }

    #[test]
    fn test_decode_explicit_encodings() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        assert_eq!(decode_bytes(bytes, "iso-8859-1").unwrap(), "Société");
        assert_eq!(decode_bytes(&[0x80], "windows-1252").unwrap(), "€");
        assert!(matches!(decode_bytes(bytes, "utf-8"), Err(PayloadError::EncodingError(_))));
    }

    #[test]
    fn test_decode_strips_bom() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(br#"{"rules":{}}"#);
        assert!(matches!(parse_bytes(&bytes), Ok(Payload::Rules(r)) if r.is_empty()));
    }
}
