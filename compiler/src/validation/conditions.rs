//! Condition tree validators.

use crate::error::{ErrorCode, ErrorCollector, ServiceError};
use crate::models::{Condition, ConditionGroup, LeafCondition};

/// Validate a leaf: left operand, known operator, filled right operands.
pub fn validate_condition_leaf(leaf: &LeafCondition, collector: &mut ErrorCollector) -> bool {
    let mut valid = true;

    if leaf.left.trim().is_empty() {
        collector.report(ErrorCode::MissingOperand, ["left"]);
        valid = false;
    }

    let operator = leaf.operator_type();
    if operator.is_none() {
        let shown = if leaf.operator.trim().is_empty() {
            "empty"
        } else {
            leaf.operator.as_str()
        };
        collector.report(ErrorCode::InvalidOperator, [shown]);
        valid = false;
    }

    let needs_right = operator.map_or(true, |op| op.requires_values());
    if needs_right && (leaf.right.is_empty() || leaf.right.iter().any(|r| r.trim().is_empty())) {
        collector.report(ErrorCode::MissingOperand, ["right"]);
        valid = false;
    }

    valid
}

/// Validate a group and, recursively, its children.
pub fn validate_condition_group(group: &ConditionGroup, collector: &mut ErrorCollector) -> bool {
    let mut valid = true;

    if group.group_type().is_none() {
        collector.report(ErrorCode::InvalidGroupCondition, [group.group_type.as_str()]);
        valid = false;
    }

    if group.children.is_empty() {
        collector.report(ErrorCode::MissingConditionItem, Vec::<String>::new());
        return false;
    }

    for child in &group.children {
        valid &= validate_condition(child, collector);
    }
    valid
}

pub fn validate_condition(condition: &Condition, collector: &mut ErrorCollector) -> bool {
    match condition {
        Condition::Group(group) => validate_condition_group(group, collector),
        Condition::Leaf(leaf) => validate_condition_leaf(leaf, collector),
    }
}

/// Standalone check of a filter tree.
pub fn validate_filter(condition: &Condition) -> Result<(), Vec<ServiceError>> {
    let mut collector = ErrorCollector::new();
    validate_condition(condition, &mut collector);
    collector.finish(())
}
