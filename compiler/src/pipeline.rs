//! High-level compile API: payload to pipeline JSON.
//!
//! Combines every step: parsing, validation, action and rule resolution,
//! translation and the output schema check.
//!
//! # Example
//!
//! ```rust,ignore
//! use rulemap::pipeline::{compile_batch, load_catalog};
//! use rulemap::CompilerConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CompilerConfig::from_env();
//!     let catalog = load_catalog(&config)?;
//!     let results = compile_batch(vec!["rules.json".into()], config, catalog).await;
//!     println!("Compiled {} files", results.len());
//!     Ok(())
//! }
//! ```

use futures::future::join_all;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::catalog::{JsonSchemaCatalog, SchemaCatalog};
use crate::config::{CompilerConfig, PhaseNames};
use crate::error::{CompileError, CompileResult, ErrorCollector, ServiceError, TranslationError};
use crate::logs::{
    log_entry, log_error, log_error_indent, log_info, log_success, log_warning, subscribe,
    LogEntry,
};
use crate::models::{MappingRules, Rule};
use crate::payload::{self, Payload};
use crate::resolve::{resolve_actions, resolve_rules};
use crate::translate::translate;
use crate::validation::{self, schema::validate_pipeline_document};

/// Validate one rule, then reorder its actions.
///
/// Actions are only resolved once the rule is valid. Returns a new rule;
/// the input is left untouched.
pub fn validate_rule(rule: &Rule) -> Result<Rule, Vec<ServiceError>> {
    let mut collector = ErrorCollector::new();
    if !validation::validate_rule(rule, &mut collector) {
        return Err(collector.into_errors());
    }
    resolve_actions(rule).map_err(|err| vec![err])
}

/// Validate a whole ruleset and reorder the actions of every rule.
///
/// Validation errors of all rules are returned together. Action cycles are
/// only looked for once the whole ruleset is valid, and are then collected
/// across every rule. Each rule's uid is taken from its key.
pub fn validate_imported_rules(
    rules: &MappingRules,
    catalog: Option<&dyn SchemaCatalog>,
) -> Result<MappingRules, Vec<ServiceError>> {
    let mut collector = ErrorCollector::new();
    if !validation::validate_mapping_rules(rules, catalog, &mut collector) {
        return Err(collector.into_errors());
    }

    let mut resolved = IndexMap::with_capacity(rules.len());
    for (uid, rule) in &rules.rules {
        match resolve_actions(rule) {
            Ok(mut rule) => {
                rule.uid = uid.clone();
                resolved.insert(uid.clone(), rule);
            }
            Err(err) => collector.push(err),
        }
    }

    collector.finish(rules.with_rules(resolved))
}

/// Phase-name conflicts, then rule reordering.
pub fn validate_rules_before_translate(
    rules: &MappingRules,
    phases: &PhaseNames,
) -> Result<MappingRules, Vec<ServiceError>> {
    let mut collector = ErrorCollector::new();
    validation::validate_translation_phase_names(rules, phases, &mut collector);
    if !collector.is_empty() {
        return Err(collector.into_errors());
    }
    resolve_rules(rules).map_err(|err| vec![err])
}

/// Phase names for one ruleset: configured names, overridden by declared ones.
pub fn effective_phases(rules: &MappingRules, configured: &PhaseNames) -> PhaseNames {
    configured.with_overrides(rules.entry_phase(), rules.publish_phase())
}

/// Translate resolved rules and check the output document.
pub fn translate_rules(rules: &MappingRules, phases: &PhaseNames) -> CompileResult<String> {
    let document = translate(rules, phases)?;
    let value = document.to_value()?;
    validate_pipeline_document(&value).map_err(TranslationError::SchemaViolation)?;
    Ok(serde_json::to_string(&value).map_err(TranslationError::from)?)
}

/// Compile an already-parsed payload.
pub fn compile_payload(
    payload: Payload,
    config: &CompilerConfig,
    catalog: Option<&dyn SchemaCatalog>,
) -> CompileResult<String> {
    let rules = payload.into_mapping_rules();
    log_info(format!("Compiling {} rule(s)", rules.len()));

    let rules = validate_imported_rules(&rules, catalog).map_err(rejected)?;
    validation::validate_group_definitions(&rules).map_err(rejected)?;
    log_success("Rules validated");

    let phases = effective_phases(&rules, &config.phases);
    let rules = validate_rules_before_translate(&rules, &phases).map_err(rejected)?;
    log_success(format!(
        "Phases: {} -> {} -> {}",
        phases.entry, phases.run, phases.publish
    ));

    let json = translate_rules(&rules, &phases)?;
    log_success(format!("Translated {} phase block(s)", rules.len() + 2));
    Ok(json)
}

fn rejected(errors: Vec<ServiceError>) -> CompileError {
    log_error(format!("{} error(s) found", errors.len()));
    for err in &errors {
        log_error_indent(err.to_string(), 1);
    }
    CompileError::Rejected(errors)
}

/// Compile a JSON payload string.
pub fn compile(
    payload: &str,
    config: &CompilerConfig,
    catalog: Option<&dyn SchemaCatalog>,
) -> CompileResult<String> {
    compile_payload(payload::parse_str(payload)?, config, catalog)
}

/// Compile a payload file of any supported encoding.
pub fn compile_file(
    path: &Path,
    config: &CompilerConfig,
    catalog: Option<&dyn SchemaCatalog>,
) -> CompileResult<String> {
    log_info(format!("Reading {}", path.display()));
    compile_payload(payload::parse_file(path)?, config, catalog)
}

/// Load the configured catalog, if any.
pub fn load_catalog(config: &CompilerConfig) -> CompileResult<Option<Arc<dyn SchemaCatalog>>> {
    let Some(path) = &config.catalog_path else {
        log_warning("No schema catalog configured, skipping version checks");
        return Ok(None);
    };
    let catalog = JsonSchemaCatalog::load(path)?;
    log_success(format!(
        "Loaded schema catalog with {} version(s)",
        catalog.versions().len()
    ));
    Ok(Some(Arc::new(catalog)))
}

/// Compile many files concurrently, one blocking task per file.
///
/// Results are returned in input order. Each finished file logs one entry
/// tagged with its path, which [`BatchProgress`] counts.
pub async fn compile_batch(
    paths: Vec<PathBuf>,
    config: CompilerConfig,
    catalog: Option<Arc<dyn SchemaCatalog>>,
) -> Vec<CompileResult<String>> {
    let tasks = paths.into_iter().map(|path| {
        let config = config.clone();
        let catalog = catalog.clone();
        tokio::task::spawn_blocking(move || {
            let result = compile_file(&path, &config, catalog.as_deref());
            let name = path.display().to_string();
            let entry = match &result {
                Ok(_) => LogEntry::success(format!("Compiled {}", name)),
                Err(e) => LogEntry::error(format!("{}: {}", name, e)),
            };
            log_entry(entry.with_file(name));
            result
        })
    });

    join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap_or_else(|e| Err(CompileError::Task(e.to_string()))))
        .collect()
}

/// Batch progress read from the log stream.
///
/// Subscribe before starting [`compile_batch`]; entries logged earlier are
/// not seen.
pub struct BatchProgress {
    receiver: broadcast::Receiver<LogEntry>,
    pending: HashSet<String>,
    total: usize,
}

impl BatchProgress {
    pub fn new(paths: &[PathBuf]) -> Self {
        let pending: HashSet<String> = paths.iter().map(|p| p.display().to_string()).collect();
        Self {
            receiver: subscribe(),
            total: pending.len(),
            pending,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Wait for the next file of this batch to finish.
    ///
    /// Yields the number of finished files and the file's outcome entry;
    /// `None` once every file is done.
    pub async fn next(&mut self) -> Option<(usize, LogEntry)> {
        while !self.pending.is_empty() {
            match self.receiver.recv().await {
                Ok(entry) => {
                    let finished = entry.file.as_ref().is_some_and(|f| self.pending.remove(f));
                    if finished {
                        return Some((self.total - self.pending.len(), entry));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log_warning(format!("Progress lagged, {} log entries skipped", skipped));
                }
                Err(RecvError::Closed) => return None,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EventTypeFields;
    use crate::error::{ErrorCode, ErrorKind};
    use crate::logs::set_quiet;
    use crate::models::Action;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn compile_value(value: serde_json::Value) -> CompileResult<String> {
        set_quiet(true);
        compile(&value.to_string(), &CompilerConfig::new(), None)
    }

    fn rejected_errors(result: CompileResult<String>) -> Vec<ServiceError> {
        match result {
            Err(CompileError::Rejected(errors)) => errors,
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_single_copy_rule_round_trip() {
        let json = compile_value(json!({
            "description": "set version",
            "actions": [{ "actionType": "copy", "target": "event.commonEventHeader.version", "from": { "value": "2.0" } }]
        }))
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["processing"].as_array().unwrap().len(), 3);
        assert_eq!(
            value["processing"][1]["processors"],
            json!([{ "updates": { "event.commonEventHeader.version": "2.0" }, "class": "Set" }])
        );
        assert_eq!(value["processing"][0]["phase"], "snmp_map");
        assert_eq!(value["processing"][2]["processors"][0]["phase"], "map_publish");
    }

    #[test]
    fn test_merge_then_extract() {
        let json = compile_value(json!({
            "rules": { "1": {
                "description": "merge",
                "actions": [
                    { "actionType": "copy", "target": "a", "from": { "value": "1" } },
                    { "actionType": "concat", "target": "b", "from": { "values": [{ "value": "${a}" }, { "value": "-x" }] } },
                    { "actionType": "copy", "target": "c", "from": { "value": "${b}", "regex": "(.*)-x" } }
                ]
            }}
        }))
        .unwrap();

        assert!(json.contains(concat!(
            r#""processors":[{"updates":{"a":"1","b":"${a}-x"},"class":"Set"},"#,
            r#"{"regex":"(.*)-x","field":"c","value":"${b}","class":"ExtractText"}]"#
        )));
    }

    #[test]
    fn test_action_cycle_blocks_translation() {
        let errors = rejected_errors(compile_value(json!({
            "description": "cycle",
            "actions": [
                { "actionType": "copy", "target": "F", "from": { "value": "${G}" } },
                { "actionType": "copy", "target": "G", "from": { "value": "${F}" } }
            ]
        })));

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::ActionDependency);
        assert_eq!(errors[0].variables, vec!["F, G"]);
    }

    #[test]
    fn test_rule_order_does_not_change_output() {
        let writer = json!({ "description": "writer", "actions": [
            { "actionType": "copy", "target": "shared", "from": { "value": "1" } }
        ]});
        let reader = json!({ "description": "reader", "actions": [
            { "actionType": "copy", "target": "out", "from": { "value": "${shared}" } }
        ]});

        let forward = compile_value(json!({ "rules": { "w": writer.clone(), "r": reader.clone() } })).unwrap();
        let swapped = compile_value(json!({ "rules": { "r": reader, "w": writer } })).unwrap();
        assert_eq!(forward, swapped);

        let value: serde_json::Value = serde_json::from_str(&forward).unwrap();
        assert_eq!(value["processing"][1]["processors"][0]["updates"], json!({ "shared": "1" }));
        assert_eq!(value["processing"][2]["processors"][0]["updates"], json!({ "out": "${shared}" }));
    }

    #[test]
    fn test_not_equal_condition() {
        let json = compile_value(json!({
            "description": "domain filter",
            "actions": [{ "actionType": "copy", "target": "a", "from": { "value": "1" } }],
            "condition": { "left": "${event.commonEventHeader.domain}", "operator": "notEqual", "right": ["syslog", "fault"] }
        }))
        .unwrap();

        assert!(json.contains(
            r#""filter":{"field":"${event.commonEventHeader.domain}","values":["syslog","fault"],"class":"NotOneOf"}"#
        ));
    }

    #[test]
    fn test_all_errors_are_collected() {
        let errors = rejected_errors(compile_value(json!({
            "rules": {
                "1": { "description": "", "actions": [] },
                "2": { "description": "concat", "actions": [
                    { "actionType": "concat", "target": "x", "from": { "values": [{ "value": "only" }] } }
                ]},
                "3": { "description": "cycle", "actions": [
                    { "actionType": "copy", "target": "F", "from": { "value": "${G}" } },
                    { "actionType": "copy", "target": "G", "from": { "value": "${F}" } }
                ]}
            }
        })));

        let ids: Vec<&str> = errors.iter().map(|e| e.message_id.as_str()).collect();
        assert_eq!(ids, vec!["SVC6101", "SVC6102", "SVC6104"]);
    }

    #[test]
    fn test_action_cycles_of_valid_ruleset_are_collected() {
        let errors = rejected_errors(compile_value(json!({
            "rules": {
                "1": { "description": "first cycle", "actions": [
                    { "actionType": "copy", "target": "F", "from": { "value": "${G}" } },
                    { "actionType": "copy", "target": "G", "from": { "value": "${F}" } }
                ]},
                "2": { "description": "second cycle", "actions": [
                    { "actionType": "copy", "target": "H", "from": { "value": "${I}" } },
                    { "actionType": "copy", "target": "I", "from": { "value": "${H}" } }
                ]}
            }
        })));

        let ids: Vec<&str> = errors.iter().map(|e| e.message_id.as_str()).collect();
        assert_eq!(ids, vec!["SVC6112", "SVC6112"]);
        assert_eq!(errors[1].variables, vec!["H, I"]);
    }

    #[test]
    fn test_unsupported_element_is_payload_error() {
        set_quiet(true);
        let err = compile(
            r#"{"description":"d","actions":[{"actionType":"teleport","target":"x"}]}"#,
            &CompilerConfig::new(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Payload(_)));
    }

    #[test]
    fn test_phase_conflict_is_reported() {
        let errors = rejected_errors(compile_value(json!({
            "description": "r",
            "phase": "snmp_map",
            "actions": [{ "actionType": "copy", "target": "a", "from": { "value": "1" } }]
        })));
        assert_eq!(errors[0].kind, ErrorKind::Translation);
        assert_eq!(
            errors[0].message,
            "Translation failed. Reason: entry phase name already exists"
        );
    }

    #[test]
    fn test_declared_publish_phase_overrides_config() {
        let json = compile_value(json!({
            "rules": { "1": {
                "description": "r",
                "publishPhase": "custom_publish",
                "actions": [{ "actionType": "copy", "target": "a", "from": { "value": "1" } }]
            }}
        }))
        .unwrap();
        assert!(json.ends_with(r#"{"phase":"phase_1","processors":[{"phase":"custom_publish","class":"RunPhase"}]}]}"#));
    }

    #[test]
    fn test_unknown_event_schema_with_catalog() {
        set_quiet(true);
        let mut fields = EventTypeFields::new();
        fields.insert("syslogFields".to_string(), Default::default());
        let catalog = JsonSchemaCatalog::new().with_version("4.1", fields);

        let payload = json!({
            "version": "5.0", "eventType": "syslogFields",
            "rules": { "1": { "description": "r", "actions": [
                { "actionType": "copy", "target": "a", "from": { "value": "1" } }
            ]}}
        })
        .to_string();

        let errors = rejected_errors(compile(&payload, &CompilerConfig::new(), Some(&catalog)));
        assert_eq!(
            errors[0].message,
            "Event schema version 5.0 with event type syslogFields is not supported"
        );
    }

    #[test]
    fn test_validate_rule_returns_reordered_copy() {
        let rule = Rule::new("r")
            .with_action(Action::copy("out", "${mid}"))
            .with_action(Action::copy("mid", "1"));

        let resolved = validate_rule(&rule).unwrap();
        assert_eq!(resolved.actions[0].target(), "mid");
        assert_eq!(rule.actions[0].target(), "out");
    }

    #[test]
    fn test_validate_rule_collects_missing_description() {
        let errors = validate_rule(&Rule::new(" ").with_action(Action::copy("a", "1"))).unwrap_err();
        assert_eq!(errors, vec![ServiceError::bare(ErrorCode::MissingRuleDescription)]);
    }

    #[test]
    fn test_invalid_rule_is_not_resolved() {
        let rule = Rule::new("cycle")
            .with_action(Action::copy("", "1"))
            .with_action(Action::copy("F", "${G}"))
            .with_action(Action::copy("G", "${F}"));

        let errors = validate_rule(&rule).unwrap_err();
        let ids: Vec<&str> = errors.iter().map(|e| e.message_id.as_str()).collect();
        assert_eq!(ids, vec!["SVC6103"]);
    }

    #[test]
    fn test_compile_file_latin1() {
        set_quiet(true);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        fs::write(
            &path,
            b"{\"description\":\"R\xE8gle\",\"actions\":[{\"actionType\":\"copy\",\"target\":\"a\",\"from\":{\"value\":\"\xE9t\xE9\"}}]}",
        )
        .unwrap();

        let json = compile_file(&path, &CompilerConfig::new(), None).unwrap();
        assert!(json.contains(r#"{"updates":{"a":"été"},"class":"Set"}"#));
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order() {
        set_quiet(true);
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        let missing = dir.path().join("missing.json");
        fs::write(
            &good,
            json!({ "description": "ok", "actions": [{ "actionType": "copy", "target": "a", "from": { "value": "1" } }] }).to_string(),
        )
        .unwrap();
        fs::write(&bad, json!({ "description": "", "actions": [] }).to_string()).unwrap();

        let results = compile_batch(vec![good, bad, missing], CompilerConfig::new(), None).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(CompileError::Rejected(_))));
        assert!(matches!(results[2], Err(CompileError::Payload(_))));
    }

    #[tokio::test]
    async fn test_batch_progress_counts_finished_files() {
        set_quiet(true);
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        fs::write(
            &good,
            json!({ "description": "ok", "actions": [{ "actionType": "copy", "target": "a", "from": { "value": "1" } }] }).to_string(),
        )
        .unwrap();
        fs::write(&bad, json!({ "description": "", "actions": [] }).to_string()).unwrap();

        let paths = vec![good.clone(), bad.clone()];
        let mut progress = BatchProgress::new(&paths);
        assert_eq!(progress.total(), 2);

        let watch = async {
            let mut seen = Vec::new();
            while let Some((done, entry)) = progress.next().await {
                seen.push((done, entry));
            }
            seen
        };
        let (results, seen) = tokio::join!(compile_batch(paths, CompilerConfig::new(), None), watch);

        assert_eq!(results.len(), 2);
        let counts: Vec<usize> = seen.iter().map(|(done, _)| *done).collect();
        assert_eq!(counts, vec![1, 2]);

        let bad_entry = seen
            .iter()
            .map(|(_, entry)| entry)
            .find(|entry| entry.file.as_deref() == Some(bad.display().to_string().as_str()))
            .unwrap();
        assert_eq!(bad_entry.level, crate::logs::LogLevel::Error);
    }
}
