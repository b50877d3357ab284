//! The two resolution scopes: actions within a rule, rules within a ruleset.

use indexmap::IndexMap;

use super::interpolation::references_field;
use super::DependencyGraph;
use crate::error::{ErrorCode, ServiceError};
use crate::models::{Action, MappingRules, Rule};

/// `action` reads the field `other` writes.
pub fn action_depends_on(action: &Action, other: &Action) -> bool {
    references_field(action.source_expressions(), other.stripped_target())
}

/// An action or the condition of `rule` reads a field some action of `other` writes.
///
/// Rules of two different groups never depend on each other.
pub fn rule_depends_on(rule: &Rule, other: &Rule) -> bool {
    if let (Some(a), Some(b)) = (rule.group_id(), other.group_id()) {
        if a != b {
            return false;
        }
    }
    let sources = rule.source_expressions();
    other
        .actions
        .iter()
        .any(|action| references_field(sources.iter().copied(), action.stripped_target()))
}

/// Order-preserving dedup, blanks dropped.
fn distinct<'a>(fields: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for field in fields {
        if !field.is_empty() && !out.contains(&field) {
            out.push(field);
        }
    }
    out
}

/// Reorder the actions of `rule`, or report the fields of an action cycle.
pub fn resolve_actions(rule: &Rule) -> Result<Rule, ServiceError> {
    let graph = DependencyGraph::new(&rule.actions, action_depends_on);

    let circular = graph.unresolvable();
    if !circular.is_empty() {
        let fields = distinct(circular.iter().map(|&i| rule.actions[i].stripped_target()));
        return Err(ServiceError::new(ErrorCode::ActionDependency, [fields.join(", ")]));
    }

    let actions = graph
        .reorder()
        .into_iter()
        .map(|i| rule.actions[i].clone())
        .collect();
    Ok(Rule {
        actions,
        ..rule.clone()
    })
}

/// Fields to name when `rules` depend on each other circularly.
///
/// A pure action-level cycle across the union of their actions wins;
/// otherwise every field one of these rules reads from another is named.
pub fn rule_dependency_fields<'a>(rules: &[&'a Rule]) -> Vec<&'a str> {
    let actions: Vec<&Action> = rules.iter().flat_map(|r| r.actions.iter()).collect();
    let graph = DependencyGraph::new(&actions, |a, b| action_depends_on(a, b));
    let cycle = graph.unresolvable();
    if !cycle.is_empty() {
        return distinct(cycle.iter().map(|&i| actions[i].stripped_target()));
    }

    let mut fields = Vec::new();
    for (i, rule) in rules.iter().enumerate() {
        let sources = rule.source_expressions();
        for (j, other) in rules.iter().enumerate() {
            if i == j {
                continue;
            }
            for action in &other.actions {
                if references_field(sources.iter().copied(), action.stripped_target()) {
                    fields.push(action.stripped_target());
                }
            }
        }
    }
    distinct(fields)
}

/// Reorder the rules of a ruleset, or report a rule cycle.
pub fn resolve_rules(rules: &MappingRules) -> Result<MappingRules, ServiceError> {
    let entries: Vec<(&String, &Rule)> = rules.rules.iter().collect();
    let graph = DependencyGraph::new(&entries, |a, b| rule_depends_on(a.1, b.1));

    let circular = graph.unresolvable();
    if !circular.is_empty() {
        let uids: Vec<&str> = circular.iter().map(|&i| entries[i].0.as_str()).collect();
        let cyclic: Vec<&Rule> = circular.iter().map(|&i| entries[i].1).collect();
        let fields = rule_dependency_fields(&cyclic);
        return Err(ServiceError::new(
            ErrorCode::RuleDependency,
            [uids.join(", "), fields.join(", ")],
        ));
    }

    let ordered: IndexMap<String, Rule> = graph
        .reorder()
        .into_iter()
        .map(|i| (entries[i].0.clone(), entries[i].1.clone()))
        .collect();
    Ok(rules.with_rules(ordered))
}
