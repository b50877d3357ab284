//! Per-variant action validators.
//!
//! Each validator appends to the collector and returns whether the action is
//! locally well-formed. Nothing stops at the first problem.

use std::collections::HashSet;

use super::conditions::validate_condition_leaf;
use crate::error::{ErrorCode, ErrorCollector};
use crate::models::{
    Action, ActionCommon, FromValue, KeyValue, MapAction, TopoSearchAction,
    EMPTY_SENTINEL,
};

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Report a missing field of `action`.
fn missing_field(action: &Action, field: &str, collector: &mut ErrorCollector) {
    collector.report(
        ErrorCode::MissingActionField,
        [field, action.action_type_name(), action.stripped_target()],
    );
}

/// Check `value` is filled, reporting `field` otherwise.
fn require(action: &Action, value: &str, field: &str, collector: &mut ErrorCollector) -> bool {
    if is_blank(value) {
        missing_field(action, field, collector);
        false
    } else {
        true
    }
}

/// Non-blank and not the explicit empty sentinel.
pub fn validate_target_field(common: &ActionCommon) -> bool {
    !is_blank(&common.target) && common.target.trim() != EMPTY_SENTINEL
}

fn validate_target(action: &Action, collector: &mut ErrorCollector) -> bool {
    if action.element_type().allows_empty_target() || validate_target_field(action.common()) {
        true
    } else {
        missing_field(action, "target", collector);
        false
    }
}

fn validate_from(action: &Action, from: &FromValue, collector: &mut ErrorCollector) -> bool {
    require(action, &from.value, "from", collector)
}

fn validate_key_values(
    action: &Action,
    entries: &[KeyValue],
    collector: &mut ErrorCollector,
) -> bool {
    let mut valid = true;
    if entries.iter().any(|e| is_blank(&e.key) || is_blank(&e.value)) {
        collector.report(ErrorCode::MissingEntry, [action.stripped_target()]);
        valid = false;
    }
    let mut seen = HashSet::new();
    if !entries.iter().all(|e| seen.insert(e.key.as_str())) {
        collector.report(ErrorCode::DuplicateKey, [action.stripped_target()]);
        valid = false;
    }
    valid
}

fn validate_map(action: &Action, map: &MapAction, collector: &mut ErrorCollector) -> bool {
    let mut valid = validate_from(action, &map.from, collector);
    let table = &map.map;
    if table.values.is_empty() {
        if !table.have_default {
            collector.report(ErrorCode::MissingEntry, [action.stripped_target()]);
            valid = false;
        }
    } else {
        valid &= validate_key_values(action, &table.values, collector);
    }
    if table.have_default && is_blank(&table.default) {
        collector.report(ErrorCode::MissingDefaultValue, [action.stripped_target()]);
        valid = false;
    }
    valid
}

fn validate_topology_search(
    action: &Action,
    topo: &TopoSearchAction,
    collector: &mut ErrorCollector,
) -> bool {
    let search = &topo.search;
    let mut valid = require(action, &search.search_field, "search field", collector);
    valid &= require(action, &search.search_value, "search value", collector);

    if let Some(filter) = search.conditional_filter() {
        valid &= validate_condition_leaf(filter, collector);
    }

    if search.do_enrich() {
        let has_fields = search
            .enrich
            .as_ref()
            .is_some_and(|e| e.fields.iter().any(|f| !is_blank(&f.value)));
        if !has_fields {
            missing_field(action, "enrich fields", collector);
            valid = false;
        }
    } else if search.updates.is_empty() {
        collector.report(ErrorCode::MissingEntry, [action.stripped_target()]);
        valid = false;
    } else {
        valid &= validate_key_values(action, &search.updates, collector);
    }
    valid
}

/// Validate one action.
pub fn validate_action(action: &Action, collector: &mut ErrorCollector) -> bool {
    let mut valid = validate_target(action, collector);

    valid &= match action {
        Action::Copy(copy) => validate_from(action, &copy.from, collector),
        Action::Concat(concat) => {
            let filled = concat.from.values.iter().filter(|v| !is_blank(&v.value)).count();
            if filled < 2 {
                collector.report(ErrorCode::MissingConcatValue, [action.stripped_target()]);
                false
            } else {
                true
            }
        }
        Action::Map(map) => validate_map(action, map, collector),
        Action::DateFormatter(date) => {
            let settings = &date.date_formatter;
            let mut ok = validate_from(action, &date.from, collector);
            ok &= require(action, &settings.from_format, "from format", collector);
            ok &= require(action, &settings.from_timezone, "from timezone", collector);
            ok &= require(action, &settings.to_format, "to format", collector);
            ok &= require(action, &settings.to_timezone, "to timezone", collector);
            ok
        }
        Action::Clear(clear) | Action::ClearNsf(clear) => {
            if clear.from.values.iter().all(|v| is_blank(&v.value)) {
                missing_field(action, "from", collector);
                false
            } else {
                true
            }
        }
        Action::ReplaceText(replace) => {
            let mut ok = validate_from(action, &replace.from, collector);
            ok &= require(action, &replace.replace_text.find, "find", collector);
            ok &= require(action, &replace.replace_text.replace, "replace", collector);
            ok
        }
        Action::LogEvent(log) => require(action, &log.log_event.title, "title", collector),
        Action::LogText(log) => require(action, &log.log_text.text, "text", collector),
        Action::HpMetric(metric) => {
            require(action, &metric.hp_metric.selected_hp_metric, "HP Metric", collector)
        }
        Action::StringTransform(transform) => {
            let settings = &transform.string_transform;
            let mut ok = require(action, &settings.target_case, "target case", collector);
            ok &= require(action, &settings.start_value, "value", collector);
            ok
        }
        Action::TopologySearch(topo) => validate_topology_search(action, topo, collector),
    };

    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use serde_json::json;

    fn check(payload: serde_json::Value) -> (bool, Vec<ServiceError>) {
        let action = Action::from_value(payload).unwrap();
        let mut collector = ErrorCollector::new();
        let valid = validate_action(&action, &mut collector);
        (valid, collector.into_errors())
    }

    #[test]
    fn test_copy_requires_from_and_target() {
        let (valid, errors) = check(json!({ "actionType": "copy", "target": "", "from": { "value": "" } }));
        assert!(!valid);
        let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Please fill the target field of copy action to ",
                "Please fill the from field of copy action to ",
            ]
        );
    }

    #[test]
    fn test_sentinel_target_is_not_a_target() {
        let (valid, errors) = check(json!({ "actionType": "copy", "target": "\"\"", "from": { "value": "x" } }));
        assert!(!valid);
        assert_eq!(errors[0].variables, vec!["target", "copy", "\"\""]);
    }

    #[test]
    fn test_sentinel_source_is_allowed() {
        let (valid, errors) = check(json!({ "actionType": "copy", "target": "a", "from": { "value": "\"\"" } }));
        assert!(valid, "{:?}", errors);
    }

    #[test]
    fn test_concat_needs_two_values() {
        let (valid, errors) = check(json!({
            "actionType": "concat", "target": "${x}",
            "from": { "values": [{ "value": "${a}" }, { "value": " " }] }
        }));
        assert!(!valid);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Please select at least two values for the concat action to x");
    }

    #[test]
    fn test_map_rules() {
        let (valid, _) = check(json!({
            "actionType": "map", "target": "sev", "from": { "value": "${s}" },
            "map": { "values": [], "haveDefault": true, "default": "NORMAL" }
        }));
        assert!(valid);

        let (valid, errors) = check(json!({
            "actionType": "map", "target": "sev", "from": { "value": "${s}" },
            "map": { "values": [{ "key": "1", "value": "a" }, { "key": "1", "value": "b" }, { "key": "", "value": "c" }], "haveDefault": true, "default": "" }
        }));
        assert!(!valid);
        let ids: Vec<_> = errors.iter().map(|e| e.message_id.as_str()).collect();
        assert_eq!(ids, vec!["SVC6109", "SVC6111", "SVC6110"]);

        let (valid, errors) = check(json!({
            "actionType": "map", "target": "sev", "from": { "value": "${s}" }
        }));
        assert!(!valid);
        assert_eq!(errors[0].message_id, "SVC6109");
    }

    #[test]
    fn test_date_formatter_requires_formats_and_zones() {
        let (valid, errors) = check(json!({
            "actionType": "date formatter", "target": "t", "from": { "value": "${d}" },
            "dateFormatter": { "fromFormat": "yyyy", "toFormat": "", "fromTimezone": "UTC", "toTimezone": "" }
        }));
        assert!(!valid);
        let fields: Vec<_> = errors.iter().map(|e| e.variables[0].as_str()).collect();
        assert_eq!(fields, vec!["to format", "to timezone"]);
    }

    #[test]
    fn test_actions_without_target() {
        let (valid, _) = check(json!({ "actionType": "clear", "from": { "values": [{ "value": "${a}" }] } }));
        assert!(valid);
        let (valid, _) = check(json!({ "actionType": "log event", "logEvent": { "title": "t" } }));
        assert!(valid);
        let (valid, errors) = check(json!({ "actionType": "log text", "logText": { "name": "n", "level": "INFO", "text": "" } }));
        assert!(!valid);
        assert_eq!(errors[0].variables[0], "text");
        let (valid, _) = check(json!({ "actionType": "hp metric", "hpMetric": { "selectedHpMetric": "m" } }));
        assert!(valid);
    }

    #[test]
    fn test_string_transform() {
        let (valid, errors) = check(json!({
            "actionType": "string Transform", "target": "out",
            "stringTransform": { "targetCase": "", "isTrimString": true, "startValue": "${a}" }
        }));
        assert!(!valid);
        assert_eq!(errors[0].message, "Please fill the target case field of string Transform action to out");
    }

    #[test]
    fn test_topology_search() {
        let (valid, errors) = check(json!({
            "actionType": "Topology Search",
            "search": {
                "searchField": "sourceToSearch", "searchValue": "${x}", "radio": "",
                "searchFilter": { "left": "${a}", "operator": "between", "right": ["1"] },
                "enrich": { "fields": [{ "value": "e_field1" }], "prefix": "e_" }
            }
        }));
        assert!(!valid);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Invalid condition operator: between");

        let (valid, errors) = check(json!({
            "actionType": "Topology Search",
            "search": { "searchField": "f", "searchValue": "${x}", "radio": "updates", "updates": [] }
        }));
        assert!(!valid);
        assert_eq!(errors[0].message_id, "SVC6109");

        let (valid, _) = check(json!({
            "actionType": "Topology Search",
            "search": { "searchField": "f", "searchValue": "${x}", "radio": "updates", "updates": [{ "key": "k", "value": "v" }] }
        }));
        assert!(valid);
    }
}
