//! Actions to pipeline processors.
//!
//! Every processor serializes with `class` as its last key and omits absent
//! optionals. Consecutive assignment actions share one `Set` processor.

use indexmap::IndexMap;
use serde::Serialize;

use super::filters::{translate_leaf, Filter};
use crate::error::TranslationResult;
use crate::models::{Action, KeyValue};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Processor {
    Set(SetProcessor),
    ExtractText(ExtractTextProcessor),
    MapAlarmValues(MapProcessor),
    DateFormatter(DateFormatterProcessor),
    Clear(ClearProcessor),
    ClearNoneStandardFields(ClearNsfProcessor),
    ReplaceText(ReplaceTextProcessor),
    LogEvent(LogEventProcessor),
    LogText(LogTextProcessor),
    StringTransform(StringTransformProcessor),
    TopoSearch(TopoSearchProcessor),
    RunPhase(RunPhaseProcessor),
    SnmpConvertor(SnmpConvertorProcessor),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetProcessor {
    pub updates: IndexMap<String, String>,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractTextProcessor {
    pub regex: String,
    pub field: String,
    pub value: String,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapProcessor {
    pub map: IndexMap<String, String>,
    pub field: String,
    pub to_field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFormatterProcessor {
    pub from_format: String,
    pub from_tz: String,
    pub to_field: String,
    pub to_format: String,
    pub to_tz: String,
    pub value: String,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClearProcessor {
    pub fields: Vec<String>,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearNsfProcessor {
    pub reserved_fields: Vec<String>,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplaceTextProcessor {
    pub field: String,
    pub find: String,
    pub replace: String,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEventProcessor {
    pub title: String,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogTextProcessor {
    pub log_level: String,
    pub log_name: String,
    pub log_text: String,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StringTransformProcessor {
    pub target_case: String,
    /// `"true"` / `"false"`.
    pub trim: String,
    pub to_field: String,
    pub value: String,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopoSearchProcessor {
    pub search_field: String,
    pub search_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates: Option<IndexMap<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrich_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrich_prefix: Option<String>,
    pub class: &'static str,
}

/// Jump to another phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunPhaseProcessor {
    pub phase: String,
    pub class: &'static str,
}

/// SNMP varbind header for the `snmp_map` entry phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnmpConvertorProcessor {
    pub array: &'static str,
    pub datacolumn: &'static str,
    pub keycolumn: &'static str,
    pub class: &'static str,
}

impl Processor {
    pub fn run_phase(phase: impl Into<String>) -> Self {
        Processor::RunPhase(RunPhaseProcessor {
            phase: phase.into(),
            class: "RunPhase",
        })
    }

    pub fn snmp_convertor() -> Self {
        Processor::SnmpConvertor(SnmpConvertorProcessor {
            array: "varbinds",
            datacolumn: "varbind_value",
            keycolumn: "varbind_oid",
            class: "SnmpConvertor",
        })
    }

    fn set(target: &str, value: String) -> Self {
        let mut updates = IndexMap::new();
        updates.insert(target.to_string(), value);
        Processor::Set(SetProcessor { updates, class: "Set" })
    }
}

fn key_values(entries: &[KeyValue]) -> IndexMap<String, String> {
    entries
        .iter()
        .map(|kv| (kv.key.clone(), kv.value.clone()))
        .collect()
}

/// `(target, expression)` of an assignment action.
fn assignment(action: &Action) -> Option<(&str, String)> {
    match action {
        Action::Copy(copy) if copy.from.regex().is_none() => {
            Some((action.target(), copy.from.value.clone()))
        }
        Action::Concat(concat) => Some((action.target(), concat.from.joined())),
        _ => None,
    }
}

/// Translate one action on its own.
pub fn translate_action(action: &Action) -> TranslationResult<Processor> {
    if let Some((target, value)) = assignment(action) {
        return Ok(Processor::set(target, value));
    }

    let processor = match action {
        Action::Copy(copy) => Processor::ExtractText(ExtractTextProcessor {
            regex: copy.from.regex().unwrap_or_default().to_string(),
            field: action.target().to_string(),
            value: copy.from.value.clone(),
            class: "ExtractText",
        }),
        Action::Concat(concat) => Processor::set(action.target(), concat.from.joined()),
        Action::Map(map) => Processor::MapAlarmValues(MapProcessor {
            map: key_values(&map.map.values),
            field: map.from.value.clone(),
            to_field: action.target().to_string(),
            default: map.map.have_default.then(|| map.map.default.clone()),
            class: "MapAlarmValues",
        }),
        Action::DateFormatter(date) => {
            let settings = &date.date_formatter;
            Processor::DateFormatter(DateFormatterProcessor {
                from_format: settings.from_format.clone(),
                from_tz: settings.from_timezone.clone(),
                to_field: action.target().to_string(),
                to_format: settings.to_format.clone(),
                to_tz: settings.to_timezone.clone(),
                value: date.from.value.clone(),
                class: "DateFormatter",
            })
        }
        Action::Clear(clear) => Processor::Clear(ClearProcessor {
            fields: clear.from.list_values().into_iter().map(str::to_string).collect(),
            class: "Clear",
        }),
        Action::ClearNsf(clear) => Processor::ClearNoneStandardFields(ClearNsfProcessor {
            reserved_fields: clear.from.list_values().into_iter().map(str::to_string).collect(),
            class: "ClearNoneStandardFields",
        }),
        Action::ReplaceText(replace) => Processor::ReplaceText(ReplaceTextProcessor {
            field: replace.from.value.clone(),
            find: replace.replace_text.find.clone(),
            replace: replace.replace_text.replace.clone(),
            class: "ReplaceText",
        }),
        Action::LogEvent(log) => Processor::LogEvent(LogEventProcessor {
            title: log.log_event.title.clone(),
            class: "LogEvent",
        }),
        Action::LogText(log) => Processor::LogText(LogTextProcessor {
            log_level: log.log_text.level.clone(),
            log_name: log.log_text.name.clone(),
            log_text: log.log_text.text.clone(),
            class: "LogText",
        }),
        Action::HpMetric(metric) => {
            Processor::set("parserType", metric.hp_metric.selected_hp_metric.clone())
        }
        Action::StringTransform(transform) => {
            let settings = &transform.string_transform;
            Processor::StringTransform(StringTransformProcessor {
                target_case: settings.target_case.clone(),
                trim: settings.is_trim_string.to_string(),
                to_field: action.target().to_string(),
                value: settings.start_value.clone(),
                class: "StringTransform",
            })
        }
        Action::TopologySearch(topo) => {
            let search = &topo.search;
            let search_filter = search.conditional_filter().map(translate_leaf).transpose()?;
            let (updates, enrich_fields, enrich_prefix) = if search.do_enrich() {
                let enrich = search.enrich.clone().unwrap_or_default();
                (
                    None,
                    Some(enrich.fields.into_iter().map(|f| f.value).collect()),
                    Some(enrich.prefix),
                )
            } else {
                let mut updates: IndexMap<String, serde_json::Value> = search
                    .updates
                    .iter()
                    .map(|kv| (kv.key.clone(), serde_json::Value::String(kv.value.clone())))
                    .collect();
                updates.insert("isEnriched".to_string(), serde_json::Value::Bool(true));
                (Some(updates), None, None)
            };
            Processor::TopoSearch(TopoSearchProcessor {
                search_field: search.search_field.clone(),
                search_value: search.search_value.clone(),
                search_filter,
                updates,
                enrich_fields,
                enrich_prefix,
                class: "TopoSearch",
            })
        }
    };
    Ok(processor)
}

/// Translate a rule's actions in order, merging assignment runs into one `Set`.
pub fn translate_actions(actions: &[Action]) -> TranslationResult<Vec<Processor>> {
    let mut processors: Vec<Processor> = Vec::new();
    let mut merge_open = false;

    for action in actions {
        if action.merges_into_set() {
            if let (true, Some(Processor::Set(set))) = (merge_open, processors.last_mut()) {
                if let Some((target, value)) = assignment(action) {
                    set.updates.insert(target.to_string(), value);
                    continue;
                }
            }
            processors.push(translate_action(action)?);
            merge_open = true;
        } else {
            processors.push(translate_action(action)?);
            merge_open = false;
        }
    }
    Ok(processors)
}
