//! Condition trees to pipeline filters.

use serde::Serialize;

use crate::error::{TranslationError, TranslationResult};
use crate::models::{Condition, ConditionGroup, LeafCondition, OperatorType};

/// Filter object gating a phase block or a topology search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Filter {
    Group(FilterGroup),
    Text(TextFilter),
    Field(FieldFilter),
    Presence(PresenceFilter),
}

impl Filter {
    pub fn class(&self) -> &str {
        match self {
            Filter::Group(f) => f.class,
            Filter::Text(f) => f.class,
            Filter::Field(f) => f.class,
            Filter::Presence(f) => f.class,
        }
    }
}

/// `And` / `Or` over child filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterGroup {
    pub filters: Vec<Filter>,
    pub class: &'static str,
}

/// `Contains` / `StartsWith` / `EndsWith`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextFilter {
    pub string: String,
    pub value: String,
    pub class: &'static str,
}

/// `Equals` / `NotEqual` with `value`, `OneOf` / `NotOneOf` with `values`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFilter {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    pub class: &'static str,
}

/// `Assigned` / `Unassigned`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceFilter {
    pub field: String,
    pub empty_is_assigned: bool,
    pub class: &'static str,
}

/// The `${notify OID}` prefix filter of the entry block.
pub fn notify_filter(notify_id: &str) -> Filter {
    Filter::Text(TextFilter {
        string: "${notify OID}".to_string(),
        value: notify_id.to_string(),
        class: OperatorType::StartsWith.filter_class(),
    })
}

pub fn translate_condition(condition: &Condition) -> TranslationResult<Filter> {
    match condition {
        Condition::Group(group) => translate_group(group),
        Condition::Leaf(leaf) => translate_leaf(leaf),
    }
}

/// Children of the same class are flattened into their parent, after its other filters.
fn translate_group(group: &ConditionGroup) -> TranslationResult<Filter> {
    let group_type = group.group_type().ok_or_else(|| {
        TranslationError::MissingTranslator(format!("condition group type '{}'", group.group_type))
    })?;
    let class = group_type.filter_class();

    let mut kept = Vec::new();
    let mut flattened = Vec::new();
    for child in &group.children {
        match translate_condition(child)? {
            Filter::Group(nested) if nested.class == class => flattened.extend(nested.filters),
            other => kept.push(other),
        }
    }
    kept.extend(flattened);

    Ok(Filter::Group(FilterGroup { filters: kept, class }))
}

pub fn translate_leaf(leaf: &LeafCondition) -> TranslationResult<Filter> {
    let operator = leaf.operator_type().ok_or_else(|| {
        TranslationError::MissingTranslator(format!("condition operator '{}'", leaf.operator))
    })?;

    match operator {
        OperatorType::Contains | OperatorType::StartsWith | OperatorType::EndsWith => {
            let class = operator.filter_class();
            let mut filters: Vec<Filter> = leaf
                .right
                .iter()
                .map(|value| {
                    Filter::Text(TextFilter {
                        string: leaf.left.clone(),
                        value: value.clone(),
                        class,
                    })
                })
                .collect();
            if filters.len() == 1 {
                Ok(filters.remove(0))
            } else {
                Ok(Filter::Group(FilterGroup { filters, class: "Or" }))
            }
        }
        OperatorType::Assigned | OperatorType::Unassigned => Ok(Filter::Presence(PresenceFilter {
            field: leaf.left.clone(),
            empty_is_assigned: false,
            class: operator.filter_class(),
        })),
        _ => {
            let single = leaf.right.len() == 1 && !operator.always_multi_value();
            let filter = if single {
                FieldFilter {
                    field: leaf.left.clone(),
                    value: Some(leaf.right[0].clone()),
                    values: None,
                    class: operator.filter_class(),
                }
            } else {
                FieldFilter {
                    field: leaf.left.clone(),
                    value: None,
                    values: Some(leaf.right.clone()),
                    class: operator.multi_value_form().filter_class(),
                }
            };
            Ok(Filter::Field(filter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(condition: serde_json::Value) -> String {
        let condition: Condition = serde_json::from_value(condition).unwrap();
        serde_json::to_string(&translate_condition(&condition).unwrap()).unwrap()
    }

    #[test]
    fn test_not_equal_two_values() {
        assert_eq!(
            render(json!({ "left": "${event.commonEventHeader.domain}", "operator": "notEqual", "right": ["syslog", "fault"] })),
            r#"{"field":"${event.commonEventHeader.domain}","values":["syslog","fault"],"class":"NotOneOf"}"#
        );
    }

    #[test]
    fn test_equals_single_value() {
        assert_eq!(
            render(json!({ "left": "${a}", "operator": "equals", "right": ["1"] })),
            r#"{"field":"${a}","value":"1","class":"Equals"}"#
        );
        assert_eq!(
            render(json!({ "left": "${a}", "operator": "oneOf", "right": ["1"] })),
            r#"{"field":"${a}","values":["1"],"class":"OneOf"}"#
        );
    }

    #[test]
    fn test_presence() {
        assert_eq!(
            render(json!({ "left": "${a}", "operator": "unassigned", "right": [] })),
            r#"{"field":"${a}","emptyIsAssigned":false,"class":"Unassigned"}"#
        );
    }

    #[test]
    fn test_string_condition_with_many_values_becomes_or() {
        assert_eq!(
            render(json!({ "left": "${XXX}", "operator": "contains", "right": ["right1", "right2"] })),
            r#"{"filters":[{"string":"${XXX}","value":"right1","class":"Contains"},{"string":"${XXX}","value":"right2","class":"Contains"}],"class":"Or"}"#
        );
    }

    #[test]
    fn test_nested_same_class_is_flattened() {
        let rendered = render(json!({
            "type": "All",
            "children": [
                { "left": "${a}", "operator": "endsWith", "right": ["x"] },
                { "type": "Any", "children": [
                    { "left": "${XXX}", "operator": "contains", "right": ["right1", "right2"] },
                    { "left": "${b}", "operator": "notEqual", "right": ["y"] }
                ]},
                { "type": "All", "children": [
                    { "left": "${c}", "operator": "startsWith", "right": ["z"] }
                ]}
            ]
        }));
        assert_eq!(
            rendered,
            concat!(
                r#"{"filters":["#,
                r#"{"string":"${a}","value":"x","class":"EndsWith"},"#,
                r#"{"filters":["#,
                r#"{"field":"${b}","value":"y","class":"NotEqual"},"#,
                r#"{"string":"${XXX}","value":"right1","class":"Contains"},"#,
                r#"{"string":"${XXX}","value":"right2","class":"Contains"}"#,
                r#"],"class":"Or"},"#,
                r#"{"string":"${c}","value":"z","class":"StartsWith"}"#,
                r#"],"class":"And"}"#
            )
        );
    }

    #[test]
    fn test_unknown_operator_is_translation_error() {
        let leaf = LeafCondition::new("${a}", "resembles", ["x"]);
        let err = translate_leaf(&leaf).unwrap_err();
        assert!(matches!(err, TranslationError::MissingTranslator(_)));
    }
}
