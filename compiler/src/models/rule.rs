//! Rules and rulesets.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::action::Action;
use super::condition::Condition;

/// Treat blank strings as absent.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Rule
// =============================================================================

/// A condition plus ordered actions, executed in one phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rule {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,
    pub description: String,
    pub actions: Vec<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl Rule {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Assign a random uid when none is set.
    pub fn ensure_uid(&mut self) {
        if self.uid.trim().is_empty() {
            self.uid = uuid::Uuid::new_v4().to_string();
        }
    }

    pub fn phase(&self) -> Option<&str> {
        non_blank(&self.phase)
    }

    pub fn group_id(&self) -> Option<&str> {
        non_blank(&self.group_id)
    }

    pub fn entry_phase(&self) -> Option<&str> {
        non_blank(&self.entry_phase)
    }

    pub fn publish_phase(&self) -> Option<&str> {
        non_blank(&self.publish_phase)
    }

    /// Phase this rule runs in, defaulting to the run phase.
    pub fn effective_phase<'a>(&'a self, run_phase: &'a str) -> &'a str {
        self.phase().unwrap_or(run_phase)
    }

    /// Expressions read by actions and by the condition.
    pub fn source_expressions(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self
            .actions
            .iter()
            .flat_map(Action::source_expressions)
            .collect();
        if let Some(condition) = &self.condition {
            sources.extend(condition.source_expressions());
        }
        sources
    }
}

// =============================================================================
// Mapping Rules
// =============================================================================

/// Ordered ruleset keyed by rule uid. Insertion order is execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MappingRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_phase: Option<String>,
    pub rules: IndexMap<String, Rule>,
}

impl MappingRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ruleset from rules in order, keyed by their uids.
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut mapping = Self::new();
        for rule in rules {
            mapping.add_or_replace_rule(rule);
        }
        mapping
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    pub fn get(&self, uid: &str) -> Option<&Rule> {
        self.rules.get(uid)
    }

    /// Insert a rule, replacing one with the same uid in place.
    ///
    /// Returns the uid used, generating one when the rule has none.
    pub fn add_or_replace_rule(&mut self, mut rule: Rule) -> String {
        rule.ensure_uid();
        let uid = rule.uid.clone();
        self.rules.insert(uid.clone(), rule);
        uid
    }

    pub fn remove_rule(&mut self, uid: &str) -> Option<Rule> {
        self.rules.shift_remove(uid)
    }

    /// Remove every rule of a group, returning how many were removed.
    pub fn remove_group(&mut self, group_id: &str) -> usize {
        let before = self.rules.len();
        self.rules.retain(|_, rule| rule.group_id() != Some(group_id));
        before - self.rules.len()
    }

    /// Set every rule uid from its map key.
    pub fn sync_uids(&mut self) {
        for (key, rule) in self.rules.iter_mut() {
            rule.uid = key.clone();
        }
    }

    pub fn notify_id(&self) -> Option<&str> {
        non_blank(&self.notify_id)
            .or_else(|| self.rules.values().find_map(|r| non_blank(&r.notify_id)))
    }

    /// Ruleset override, else the first rule declaring one.
    pub fn entry_phase(&self) -> Option<&str> {
        non_blank(&self.entry_phase).or_else(|| self.rules.values().find_map(Rule::entry_phase))
    }

    /// Ruleset override, else the first rule declaring one.
    pub fn publish_phase(&self) -> Option<&str> {
        non_blank(&self.publish_phase)
            .or_else(|| self.rules.values().find_map(Rule::publish_phase))
    }

    /// Same ruleset metadata, different rules.
    pub fn with_rules(&self, rules: IndexMap<String, Rule>) -> Self {
        Self {
            version: self.version.clone(),
            event_type: self.event_type.clone(),
            notify_id: self.notify_id.clone(),
            entry_phase: self.entry_phase.clone(),
            publish_phase: self.publish_phase.clone(),
            rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_ruleset_keeps_order() {
        let rules: MappingRules = serde_json::from_value(json!({
            "version": "4.1",
            "eventType": "syslogFields",
            "rules": {
                "zeta": { "description": "first", "actions": [] },
                "alpha": { "description": "second", "actions": [] }
            }
        }))
        .unwrap();

        assert_eq!(rules.rule_ids(), vec!["zeta", "alpha"]);
        assert_eq!(rules.version.as_deref(), Some("4.1"));
    }

    #[test]
    fn test_add_replace_remove() {
        let mut rules = MappingRules::new();
        let generated = rules.add_or_replace_rule(Rule::new("no uid"));
        assert!(!generated.is_empty());

        rules.add_or_replace_rule(Rule::new("a").with_uid("a").with_group("g1").with_phase("p1"));
        rules.add_or_replace_rule(Rule::new("b").with_uid("b").with_group("g1").with_phase("p1"));
        rules.add_or_replace_rule(Rule::new("a2").with_uid("a"));

        assert_eq!(rules.rule_ids(), vec![generated.as_str(), "a", "b"]);
        assert_eq!(rules.get("a").map(|r| r.description.as_str()), Some("a2"));

        assert_eq!(rules.remove_group("g1"), 1);
        assert!(rules.remove_rule(&generated).is_some());
        assert_eq!(rules.rule_ids(), vec!["a"]);
    }

    #[test]
    fn test_phase_overrides_fall_back_to_rules() {
        let mut first = Rule::new("first").with_uid("1");
        first.entry_phase = Some("  ".to_string());
        let mut second = Rule::new("second").with_uid("2");
        second.entry_phase = Some("custom_entry".to_string());
        second.notify_id = Some(".1.3.6.1.4.1".to_string());

        let rules = MappingRules::from_rules([first, second]);
        assert_eq!(rules.entry_phase(), Some("custom_entry"));
        assert_eq!(rules.publish_phase(), None);
        assert_eq!(rules.notify_id(), Some(".1.3.6.1.4.1"));
    }

    #[test]
    fn test_rule_sources_include_condition() {
        let rule = Rule::new("r")
            .with_action(Action::copy("b", "${a}"))
            .with_condition(Condition::leaf("${c}", "equals", ["${d}"]));
        assert_eq!(rule.source_expressions(), vec!["${a}", "${c}", "${d}"]);
        assert_eq!(rule.effective_phase("phase_1"), "phase_1");
    }
}
