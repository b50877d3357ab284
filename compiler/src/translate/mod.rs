//! Pipeline translator: resolved rules to processing-pipeline JSON.
//!
//! # Output layout
//!
//! ```text
//! {"processing":[
//!     {"phase":<entry>,  "filter"?, "processors":[<header>?, RunPhase(<run>)]},
//!     {"phase":<rule phase or run>, "filter"?, "processors":[...]},   one per rule
//!     ...
//!     {"phase":<run>, "processors":[RunPhase(<publish>)]}
//! ]}
//! ```
//!
//! Grouped rulesets replace the direct jump to `<run>` with a chain: the
//! entry block jumps to the first group's phase, the last block of each group
//! jumps to the next unseen group phase, and the final group jumps to `<run>`.
//!
//! Key and array order always follow input order. Serialization writes
//! `class` last in every processor and filter, and rewrites the explicit
//! empty sentinel (`""` as two characters) to a real empty string.
//!
//! # Example
//!
//! ```rust,ignore
//! use rulemap::{translate, Action, MappingRules, PhaseNames, Rule};
//!
//! let rules = MappingRules::from_rules([
//!     Rule::new("set version").with_action(Action::copy("event.commonEventHeader.version", "2.0")),
//! ]);
//! let json = translate(&rules, &PhaseNames::default())?.to_json_string()?;
//! ```

pub mod filters;
pub mod processors;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

pub use filters::{translate_condition, Filter};
pub use processors::{translate_action, translate_actions, Processor};

use crate::config::PhaseNames;
use crate::error::TranslationResult;
use crate::models::{MappingRules, Rule, EMPTY_SENTINEL};

/// Name of the entry phase that carries the SNMP varbind header.
pub const SNMP_ENTRY_PHASE: &str = "snmp_map";

/// One named phase with its processors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseBlock {
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    pub processors: Vec<Processor>,
}

/// Complete translator output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineDocument {
    pub processing: Vec<PhaseBlock>,
}

impl PipelineDocument {
    /// JSON value with the empty sentinel rewritten.
    pub fn to_value(&self) -> TranslationResult<Value> {
        let value = serde_json::to_value(self)?;
        Ok(replace_empty_sentinel(value))
    }

    /// Compact UTF-8 JSON, byte-stable for identical input.
    pub fn to_json_string(&self) -> TranslationResult<String> {
        Ok(serde_json::to_string(&self.to_value()?)?)
    }

    pub fn to_json_string_pretty(&self) -> TranslationResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }
}

/// Rewrite `""` (two quote characters) to the empty string, keys included.
pub fn replace_empty_sentinel(value: Value) -> Value {
    fn fix(s: String) -> String {
        if s == EMPTY_SENTINEL {
            String::new()
        } else {
            s
        }
    }

    match value {
        Value::String(s) => Value::String(fix(s)),
        Value::Array(items) => Value::Array(items.into_iter().map(replace_empty_sentinel).collect()),
        Value::Object(entries) => {
            let mut out = Map::new();
            for (key, item) in entries {
                out.insert(fix(key), replace_empty_sentinel(item));
            }
            Value::Object(out)
        }
        other => other,
    }
}

fn entry_block(rules: &MappingRules, phases: &PhaseNames, first_phase: &str) -> PhaseBlock {
    let mut processors = Vec::new();
    if phases.entry == SNMP_ENTRY_PHASE {
        processors.push(Processor::snmp_convertor());
    }
    processors.push(Processor::run_phase(first_phase));

    PhaseBlock {
        phase: phases.entry.clone(),
        filter: rules.notify_id().map(filters::notify_filter),
        processors,
    }
}

fn rule_block(rule: &Rule, phases: &PhaseNames) -> TranslationResult<PhaseBlock> {
    let filter = rule.condition.as_ref().map(translate_condition).transpose()?;
    Ok(PhaseBlock {
        phase: rule.effective_phase(&phases.run).to_string(),
        filter,
        processors: translate_actions(&rule.actions)?,
    })
}

/// Rules bucketed by group id, buckets in order of first appearance.
fn group_rules(rules: &MappingRules) -> Vec<Vec<&Rule>> {
    let mut groups: IndexMap<Option<&str>, Vec<&Rule>> = IndexMap::new();
    for rule in rules.rules.values() {
        groups.entry(rule.group_id()).or_default().push(rule);
    }
    groups.into_values().collect()
}

/// Grouped rulesets: one phase per group, each new phase entered by a
/// `RunPhase` appended to the last block of the previous group.
fn grouped_blocks(
    rules: &MappingRules,
    phases: &PhaseNames,
) -> TranslationResult<(String, Vec<PhaseBlock>)> {
    let mut blocks: Vec<PhaseBlock> = Vec::with_capacity(rules.len());
    let mut entered: Vec<String> = Vec::new();

    for group in group_rules(rules) {
        let phase = group[0].effective_phase(&phases.run).to_string();
        if !entered.contains(&phase) {
            if let Some(last) = blocks.last_mut() {
                last.processors.push(Processor::run_phase(&phase));
            }
            entered.push(phase);
        }
        for rule in group {
            blocks.push(rule_block(rule, phases)?);
        }
    }

    // the trailing publish block lives in the run phase
    if !entered.contains(&phases.run) {
        if let Some(last) = blocks.last_mut() {
            last.processors.push(Processor::run_phase(&phases.run));
        }
    }

    let first = entered.into_iter().next().unwrap_or_else(|| phases.run.clone());
    Ok((first, blocks))
}

/// Translate resolved rules, in their current order.
///
/// When any rule carries a group id, rules are emitted group by group and
/// the entry block jumps to the first group's phase instead of the run phase.
pub fn translate(rules: &MappingRules, phases: &PhaseNames) -> TranslationResult<PipelineDocument> {
    let (first_phase, blocks) = if rules.rules.values().any(|r| r.group_id().is_some()) {
        grouped_blocks(rules, phases)?
    } else {
        let blocks = rules
            .rules
            .values()
            .map(|rule| rule_block(rule, phases))
            .collect::<TranslationResult<Vec<_>>>()?;
        (phases.run.clone(), blocks)
    };

    let mut processing = Vec::with_capacity(blocks.len() + 2);
    processing.push(entry_block(rules, phases, &first_phase));
    processing.extend(blocks);
    processing.push(PhaseBlock {
        phase: phases.run.clone(),
        filter: None,
        processors: vec![Processor::run_phase(&phases.publish)],
    });
    Ok(PipelineDocument { processing })
}
