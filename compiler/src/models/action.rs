//! Action variants.
//!
//! Every action shares `{id, actionType, target}`; the remaining payload
//! depends on the variant. Deserialization dispatches on `actionType`
//! through [`ElementType::from_action_type`], and serialization writes the
//! variant back in the same camelCase shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::condition::LeafCondition;
use super::element::ElementType;
use crate::error::{PayloadError, PayloadResult};

/// The explicit empty-string sentinel: two quote characters.
pub const EMPTY_SENTINEL: &str = "\"\"";

/// Remove `${` `}` decoration from a field path.
pub fn strip_field(field: &str) -> &str {
    let trimmed = field.trim();
    trimmed
        .strip_prefix("${")
        .and_then(|s| s.strip_suffix('}'))
        .map(str::trim)
        .unwrap_or(trimmed)
}

// =============================================================================
// Shared Payload Pieces
// =============================================================================

/// Fields common to every action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActionCommon {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub action_type: String,
    pub target: String,
}

/// A `{value}` wrapper as used in value lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueEntry {
    pub value: String,
}

impl From<&str> for ValueEntry {
    fn from(value: &str) -> Self {
        Self { value: value.to_string() }
    }
}

/// A `{key, value}` pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Source of an action: a single expression or an ordered list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FromValue {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<ValueEntry>,
}

impl FromValue {
    pub fn single(value: impl Into<String>) -> Self {
        Self { value: value.into(), ..Default::default() }
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            values: values.into_iter().map(|v| ValueEntry::from(v.as_ref())).collect(),
            ..Default::default()
        }
    }

    /// Non-blank extraction pattern, if any.
    pub fn regex(&self) -> Option<&str> {
        self.regex.as_deref().filter(|r| !r.trim().is_empty())
    }

    /// The list values concatenated in order.
    pub fn joined(&self) -> String {
        self.values.iter().map(|v| v.value.as_str()).collect()
    }

    pub fn list_values(&self) -> Vec<&str> {
        self.values.iter().map(|v| v.value.as_str()).collect()
    }
}

// =============================================================================
// Variant Payloads
// =============================================================================

/// `copy`: single source, optional extraction pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopyAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub from: FromValue,
}

/// `concat`: ordered list of sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcatAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub from: FromValue,
}

/// Lookup table of a `map` action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapTable {
    pub values: Vec<KeyValue>,
    pub have_default: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default: String,
}

/// `map`: translate source values through a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub from: FromValue,
    pub map: MapTable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateFormat {
    pub from_format: String,
    pub from_timezone: String,
    pub to_format: String,
    pub to_timezone: String,
}

/// `date formatter`: reformat a date between format/timezone pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateFormatterAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub from: FromValue,
    pub date_formatter: DateFormat,
}

/// `clear` and `clear NSF`: list of fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub from: FromValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindReplace {
    pub find: String,
    pub replace: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplaceTextAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub from: FromValue,
    pub replace_text: FindReplace,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogEventSpec {
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogEventAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub log_event: LogEventSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogTextSpec {
    pub name: String,
    pub level: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogTextAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub log_text: LogTextSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HpMetricSpec {
    pub selected_hp_metric: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HpMetricAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub hp_metric: HpMetricSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StringTransformSpec {
    pub target_case: String,
    pub is_trim_string: bool,
    pub start_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StringTransformAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub string_transform: StringTransformSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Enrichment {
    pub fields: Vec<ValueEntry>,
    pub prefix: String,
}

/// Parameters of a topology lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TopoSearch {
    pub search_field: String,
    pub search_value: String,
    /// `"enrich"` selects enrichment, anything else key/value updates.
    pub radio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_filter: Option<LeafCondition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrich: Option<Enrichment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<KeyValue>,
}

impl TopoSearch {
    /// Enrichment mode: explicit radio choice, or enrich fields with no updates.
    pub fn do_enrich(&self) -> bool {
        if self.radio.trim().eq_ignore_ascii_case("enrich") {
            return true;
        }
        self.radio.trim().is_empty() && self.updates.is_empty() && self.enrich.is_some()
    }

    /// Filter with at least one filled operand.
    pub fn conditional_filter(&self) -> Option<&LeafCondition> {
        self.search_filter.as_ref().filter(|f| !f.is_blank())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopoSearchAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    pub search: TopoSearch,
}

// =============================================================================
// Action
// =============================================================================

/// One step of a rule, discriminated by `actionType`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Action {
    Copy(CopyAction),
    Concat(ConcatAction),
    Map(MapAction),
    DateFormatter(DateFormatterAction),
    Clear(ClearAction),
    ClearNsf(ClearAction),
    ReplaceText(ReplaceTextAction),
    LogEvent(LogEventAction),
    LogText(LogTextAction),
    HpMetric(HpMetricAction),
    StringTransform(StringTransformAction),
    TopologySearch(TopoSearchAction),
}

impl Action {
    /// Build an action from its JSON payload.
    pub fn from_value(value: Value) -> PayloadResult<Self> {
        let action_type = value
            .get("actionType")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let element = ElementType::from_action_type(&action_type)
            .ok_or_else(|| PayloadError::UnsupportedElement(action_type.clone()))?;

        let action = match element {
            ElementType::Copy => Action::Copy(serde_json::from_value(value)?),
            ElementType::Concat => Action::Concat(serde_json::from_value(value)?),
            ElementType::Map => Action::Map(serde_json::from_value(value)?),
            ElementType::DateFormatter => Action::DateFormatter(serde_json::from_value(value)?),
            ElementType::Clear => Action::Clear(serde_json::from_value(value)?),
            ElementType::ClearNsf => Action::ClearNsf(serde_json::from_value(value)?),
            ElementType::ReplaceText => Action::ReplaceText(serde_json::from_value(value)?),
            ElementType::LogEvent => Action::LogEvent(serde_json::from_value(value)?),
            ElementType::LogText => Action::LogText(serde_json::from_value(value)?),
            ElementType::HpMetric => Action::HpMetric(serde_json::from_value(value)?),
            ElementType::StringTransform => {
                Action::StringTransform(serde_json::from_value(value)?)
            }
            ElementType::TopologySearch => Action::TopologySearch(serde_json::from_value(value)?),
            ElementType::ConditionGroup | ElementType::Condition | ElementType::FieldCondition => {
                return Err(PayloadError::UnsupportedElement(action_type));
            }
        };
        Ok(action)
    }

    /// `copy` action with a single source.
    pub fn copy(target: impl Into<String>, from: impl Into<String>) -> Self {
        Action::Copy(CopyAction {
            common: ActionCommon::for_type(ElementType::Copy, target),
            from: FromValue::single(from),
        })
    }

    /// `copy` action extracting `regex` from the source.
    pub fn extract(
        target: impl Into<String>,
        from: impl Into<String>,
        regex: impl Into<String>,
    ) -> Self {
        let mut from = FromValue::single(from);
        from.regex = Some(regex.into());
        Action::Copy(CopyAction {
            common: ActionCommon::for_type(ElementType::Copy, target),
            from,
        })
    }

    /// `concat` action over ordered sources.
    pub fn concat<I, S>(target: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Action::Concat(ConcatAction {
            common: ActionCommon::for_type(ElementType::Concat, target),
            from: FromValue::list(values),
        })
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.common_mut().id = Some(id.into());
        self
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Action::Copy(_) => ElementType::Copy,
            Action::Concat(_) => ElementType::Concat,
            Action::Map(_) => ElementType::Map,
            Action::DateFormatter(_) => ElementType::DateFormatter,
            Action::Clear(_) => ElementType::Clear,
            Action::ClearNsf(_) => ElementType::ClearNsf,
            Action::ReplaceText(_) => ElementType::ReplaceText,
            Action::LogEvent(_) => ElementType::LogEvent,
            Action::LogText(_) => ElementType::LogText,
            Action::HpMetric(_) => ElementType::HpMetric,
            Action::StringTransform(_) => ElementType::StringTransform,
            Action::TopologySearch(_) => ElementType::TopologySearch,
        }
    }

    pub fn common(&self) -> &ActionCommon {
        match self {
            Action::Copy(a) => &a.common,
            Action::Concat(a) => &a.common,
            Action::Map(a) => &a.common,
            Action::DateFormatter(a) => &a.common,
            Action::Clear(a) | Action::ClearNsf(a) => &a.common,
            Action::ReplaceText(a) => &a.common,
            Action::LogEvent(a) => &a.common,
            Action::LogText(a) => &a.common,
            Action::HpMetric(a) => &a.common,
            Action::StringTransform(a) => &a.common,
            Action::TopologySearch(a) => &a.common,
        }
    }

    fn common_mut(&mut self) -> &mut ActionCommon {
        match self {
            Action::Copy(a) => &mut a.common,
            Action::Concat(a) => &mut a.common,
            Action::Map(a) => &mut a.common,
            Action::DateFormatter(a) => &mut a.common,
            Action::Clear(a) | Action::ClearNsf(a) => &mut a.common,
            Action::ReplaceText(a) => &mut a.common,
            Action::LogEvent(a) => &mut a.common,
            Action::LogText(a) => &mut a.common,
            Action::HpMetric(a) => &mut a.common,
            Action::StringTransform(a) => &mut a.common,
            Action::TopologySearch(a) => &mut a.common,
        }
    }

    pub fn target(&self) -> &str {
        &self.common().target
    }

    pub fn stripped_target(&self) -> &str {
        strip_field(self.target())
    }

    /// `actionType` as submitted, falling back to the canonical name.
    pub fn action_type_name(&self) -> &str {
        let raw = self.common().action_type.as_str();
        if raw.trim().is_empty() {
            self.element_type().display_name()
        } else {
            raw
        }
    }

    /// Every expression this action reads.
    pub fn source_expressions(&self) -> Vec<&str> {
        match self {
            Action::Copy(a) => vec![a.from.value.as_str()],
            Action::Concat(a) => a.from.list_values(),
            Action::Map(a) => vec![a.from.value.as_str()],
            Action::DateFormatter(a) => vec![a.from.value.as_str()],
            Action::Clear(a) | Action::ClearNsf(a) => a.from.list_values(),
            Action::ReplaceText(a) => vec![a.from.value.as_str()],
            Action::LogEvent(a) => vec![a.log_event.title.as_str()],
            Action::LogText(a) => vec![a.log_text.text.as_str()],
            Action::HpMetric(_) => Vec::new(),
            Action::StringTransform(a) => vec![a.string_transform.start_value.as_str()],
            Action::TopologySearch(a) => {
                let mut sources = vec![a.search.search_value.as_str()];
                if let Some(filter) = &a.search.search_filter {
                    sources.extend(filter.source_expressions());
                }
                sources
            }
        }
    }

    /// Joins a running `Set` processor when translated.
    pub fn merges_into_set(&self) -> bool {
        match self {
            Action::Copy(a) => a.from.regex().is_none(),
            other => other.element_type().merges_into_set(),
        }
    }
}

impl ActionCommon {
    fn for_type(element: ElementType, target: impl Into<String>) -> Self {
        Self {
            id: None,
            action_type: element.display_name().to_string(),
            target: target.into(),
        }
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Action::from_value(value).map_err(serde::de::Error::custom)
    }
}
