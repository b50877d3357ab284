//! Structural validation of rules and rulesets.
//!
//! Validators never fail fast: every problem in a submission is appended to
//! an [`ErrorCollector`] so the caller gets the complete error set.
//!
//! # Layers
//!
//! ```text
//! validate_mapping_rules
//!   ├── non-empty ruleset, unique entry/publish phases
//!   ├── version / event type known to the SchemaCatalog
//!   └── validate_rule (each)
//!         ├── description, group phase, at least one action
//!         ├── validate_action (each)      -> actions.rs
//!         └── validate_condition          -> conditions.rs
//! ```

pub mod actions;
pub mod conditions;
pub mod schema;

use std::collections::{BTreeMap, HashSet};

use crate::catalog::SchemaCatalog;
use crate::config::PhaseNames;
use crate::error::{ErrorCode, ErrorCollector, ServiceError};
use crate::models::rule::non_blank;
use crate::models::{MappingRules, Rule};

pub use actions::{validate_action, validate_target_field};
pub use conditions::{validate_condition, validate_condition_leaf, validate_filter};

/// Validate one rule and everything it contains.
pub fn validate_rule(rule: &Rule, collector: &mut ErrorCollector) -> bool {
    let mut valid = true;

    if rule.group_id().is_some() && rule.phase().is_none() {
        collector.push(ServiceError::invalid_format("please define group name"));
        valid = false;
    }

    if rule.description.trim().is_empty() {
        collector.report(ErrorCode::MissingRuleDescription, Vec::<String>::new());
        valid = false;
    }

    if rule.actions.is_empty() {
        collector.report(ErrorCode::MissingAction, Vec::<String>::new());
        valid = false;
    } else {
        for action in &rule.actions {
            valid &= validate_action(action, collector);
        }
    }

    if let Some(condition) = &rule.condition {
        valid &= validate_condition(condition, collector);
    }

    valid
}

/// Validate a whole ruleset.
///
/// `catalog` is consulted for every distinct declared version/event type;
/// without one the check is skipped.
pub fn validate_mapping_rules(
    rules: &MappingRules,
    catalog: Option<&dyn SchemaCatalog>,
    collector: &mut ErrorCollector,
) -> bool {
    if rules.is_empty() {
        collector.push(ServiceError::invalid_format("no rules found"));
        return false;
    }

    let mut valid = true;
    for rule in rules.rules.values() {
        valid &= validate_rule(rule, collector);
    }

    if let Some(catalog) = catalog {
        valid &= validate_version_and_type(rules, catalog, collector);
    }

    valid &= validate_unique_phase_declarations(rules, collector);
    valid
}

/// Each declared `(version, eventType)` must exist in the catalog.
pub fn validate_version_and_type(
    rules: &MappingRules,
    catalog: &dyn SchemaCatalog,
    collector: &mut ErrorCollector,
) -> bool {
    let mut seen = HashSet::new();
    let mut valid = true;

    for rule in rules.rules.values() {
        let version = non_blank(&rule.version).or_else(|| non_blank(&rules.version));
        let event_type = non_blank(&rule.event_type).or_else(|| non_blank(&rules.event_type));
        if version.is_none() && event_type.is_none() {
            continue;
        }
        let version = version.unwrap_or_default();
        let event_type = event_type.unwrap_or_default();
        if !seen.insert((version, event_type)) {
            continue;
        }
        if !catalog.contains(version, event_type) {
            collector.report(ErrorCode::UnknownEventSchema, [version, event_type]);
            valid = false;
        }
    }
    valid
}

/// No two rules may declare the same entry or publish phase.
fn validate_unique_phase_declarations(rules: &MappingRules, collector: &mut ErrorCollector) -> bool {
    let mut valid = true;
    let checks: [(&str, fn(&Rule) -> Option<&str>); 2] =
        [("entry", Rule::entry_phase), ("publish", Rule::publish_phase)];

    for (label, declared) in checks {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for name in rules.rules.values().filter_map(declared) {
            if !seen.insert(name) && reported.insert(name) {
                collector.push(ServiceError::invalid_format(format!(
                    "{} phase name {} is declared by more than one rule",
                    label, name
                )));
                valid = false;
            }
        }
    }
    valid
}

/// Entry and publish phases must not collide with any rule phase.
pub fn validate_translation_phase_names(
    rules: &MappingRules,
    phases: &PhaseNames,
    collector: &mut ErrorCollector,
) -> bool {
    let rule_phases: HashSet<&str> = rules.rules.values().filter_map(Rule::phase).collect();
    let mut valid = true;

    if rule_phases.contains(phases.entry.as_str()) {
        collector.push(ServiceError::translate_failed("entry phase name already exists"));
        valid = false;
    }
    if rule_phases.contains(phases.publish.as_str()) {
        collector.push(ServiceError::translate_failed("publish phase name already exists"));
        valid = false;
    }
    valid
}

/// Group bookkeeping: all-or-nothing grouping, one phase per group.
pub fn validate_group_definitions(rules: &MappingRules) -> Result<(), Vec<ServiceError>> {
    let mut collector = ErrorCollector::new();
    let grouped = rules.rules.values().filter(|r| r.group_id().is_some()).count();

    if grouped > 0 && grouped < rules.len() {
        collector.push(ServiceError::invalid_format("all rules must belong to a group"));
    }

    let mut group_phases: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
    for rule in rules.rules.values() {
        if let Some(group) = rule.group_id() {
            let phases = group_phases.entry(group).or_default();
            if let Some(phase) = rule.phase() {
                phases.insert(phase);
            }
        }
    }
    for (group, phases) in group_phases {
        if phases.len() > 1 {
            collector.push(ServiceError::invalid_format(format!(
                "group {} is assigned to more than one phase",
                group
            )));
        }
    }

    collector.finish(())
}
