//! Element registry: the closed set of action and condition kinds.
//!
//! Payload discriminators (`actionType`, condition `operator`, group `type`)
//! are matched case-insensitively with spaces ignored, so `"Date Formatter"`,
//! `"date formatter"` and `"dateformatter"` all name the same element.

use serde::Serialize;

/// Lowercase, spaces removed.
pub(crate) fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

// =============================================================================
// Element Types
// =============================================================================

/// Every element kind a rule can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementType {
    Copy,
    Concat,
    Map,
    DateFormatter,
    Clear,
    ClearNsf,
    ReplaceText,
    LogEvent,
    LogText,
    HpMetric,
    StringTransform,
    TopologySearch,
    ConditionGroup,
    Condition,
    FieldCondition,
}

impl ElementType {
    /// Action kinds in display order.
    pub const ACTIONS: [ElementType; 12] = [
        ElementType::Copy,
        ElementType::Concat,
        ElementType::Map,
        ElementType::DateFormatter,
        ElementType::Clear,
        ElementType::ClearNsf,
        ElementType::ReplaceText,
        ElementType::LogEvent,
        ElementType::LogText,
        ElementType::HpMetric,
        ElementType::StringTransform,
        ElementType::TopologySearch,
    ];

    /// Name as written in payloads.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Concat => "concat",
            Self::Map => "map",
            Self::DateFormatter => "date formatter",
            Self::Clear => "clear",
            Self::ClearNsf => "clear NSF",
            Self::ReplaceText => "replace text",
            Self::LogEvent => "log event",
            Self::LogText => "log text",
            Self::HpMetric => "hp metric",
            Self::StringTransform => "string transform",
            Self::TopologySearch => "topology search",
            Self::ConditionGroup => "condition group",
            Self::Condition => "condition",
            Self::FieldCondition => "field condition",
        }
    }

    /// Resolve an `actionType` discriminator.
    pub fn from_action_type(name: &str) -> Option<Self> {
        let normalized = normalize_name(name);
        Self::ACTIONS
            .iter()
            .copied()
            .find(|t| normalize_name(t.display_name()) == normalized)
    }

    pub fn is_action(&self) -> bool {
        !matches!(
            self,
            Self::ConditionGroup | Self::Condition | Self::FieldCondition
        )
    }

    /// Translator output is a plain field assignment that can join a `Set` run.
    pub fn merges_into_set(&self) -> bool {
        matches!(self, Self::Copy | Self::Concat)
    }

    /// Actions whose target may be left empty.
    pub fn allows_empty_target(&self) -> bool {
        matches!(
            self,
            Self::Clear
                | Self::ClearNsf
                | Self::ReplaceText
                | Self::LogEvent
                | Self::LogText
                | Self::HpMetric
                | Self::TopologySearch
        )
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// =============================================================================
// Condition Operators
// =============================================================================

/// Operator of a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperatorType {
    Equals,
    NotEqual,
    Contains,
    EndsWith,
    StartsWith,
    OneOf,
    NotOneOf,
    Assigned,
    Unassigned,
}

impl OperatorType {
    pub const ALL: [OperatorType; 9] = [
        OperatorType::Equals,
        OperatorType::NotEqual,
        OperatorType::Contains,
        OperatorType::EndsWith,
        OperatorType::StartsWith,
        OperatorType::OneOf,
        OperatorType::NotOneOf,
        OperatorType::Assigned,
        OperatorType::Unassigned,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = normalize_name(name);
        Self::ALL
            .iter()
            .copied()
            .find(|op| normalize_name(op.filter_class()) == normalized)
    }

    /// Output `class` for this operator.
    pub fn filter_class(&self) -> &'static str {
        match self {
            Self::Equals => "Equals",
            Self::NotEqual => "NotEqual",
            Self::Contains => "Contains",
            Self::EndsWith => "EndsWith",
            Self::StartsWith => "StartsWith",
            Self::OneOf => "OneOf",
            Self::NotOneOf => "NotOneOf",
            Self::Assigned => "Assigned",
            Self::Unassigned => "Unassigned",
        }
    }

    /// `Condition` for string operators, `FieldCondition` otherwise.
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Contains | Self::EndsWith | Self::StartsWith => ElementType::Condition,
            _ => ElementType::FieldCondition,
        }
    }

    pub fn requires_values(&self) -> bool {
        !matches!(self, Self::Assigned | Self::Unassigned)
    }

    /// Operator used when more than one value is given.
    pub fn multi_value_form(&self) -> Self {
        match self {
            Self::Equals => Self::OneOf,
            Self::NotEqual => Self::NotOneOf,
            other => *other,
        }
    }

    pub fn always_multi_value(&self) -> bool {
        matches!(self, Self::OneOf | Self::NotOneOf)
    }
}

// =============================================================================
// Group Types
// =============================================================================

/// Logical operator of a condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GroupType {
    /// Every child must hold.
    All,
    /// At least one child must hold.
    Any,
}

impl GroupType {
    pub fn from_name(name: &str) -> Option<Self> {
        match normalize_name(name).as_str() {
            "all" => Some(Self::All),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    pub fn filter_class(&self) -> &'static str {
        match self {
            Self::All => "And",
            Self::Any => "Or",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_lookup_ignores_case_and_spaces() {
        assert_eq!(ElementType::from_action_type("copy"), Some(ElementType::Copy));
        assert_eq!(
            ElementType::from_action_type("Date Formatter"),
            Some(ElementType::DateFormatter)
        );
        assert_eq!(
            ElementType::from_action_type("string Transform"),
            Some(ElementType::StringTransform)
        );
        assert_eq!(
            ElementType::from_action_type("Topology Search"),
            Some(ElementType::TopologySearch)
        );
        assert_eq!(ElementType::from_action_type("clearNSF"), Some(ElementType::ClearNsf));
        assert_eq!(ElementType::from_action_type("explode"), None);
        assert_eq!(ElementType::from_action_type("condition"), None);
    }

    #[test]
    fn test_merge_capability() {
        let mergeable: Vec<_> = ElementType::ACTIONS
            .iter()
            .filter(|t| t.merges_into_set())
            .collect();
        assert_eq!(mergeable, vec![&ElementType::Copy, &ElementType::Concat]);
    }

    #[test]
    fn test_operator_lookup() {
        assert_eq!(OperatorType::from_name("notEqual"), Some(OperatorType::NotEqual));
        assert_eq!(OperatorType::from_name("not equal"), Some(OperatorType::NotEqual));
        assert_eq!(OperatorType::from_name("ENDSWITH"), Some(OperatorType::EndsWith));
        assert_eq!(OperatorType::from_name("between"), None);
        assert_eq!(OperatorType::from_name(""), None);
    }

    #[test]
    fn test_operator_kinds() {
        assert_eq!(OperatorType::Contains.element_type(), ElementType::Condition);
        assert_eq!(OperatorType::Equals.element_type(), ElementType::FieldCondition);
        assert_eq!(OperatorType::NotEqual.multi_value_form(), OperatorType::NotOneOf);
        assert!(!OperatorType::Unassigned.requires_values());
    }

    #[test]
    fn test_group_type() {
        assert_eq!(GroupType::from_name("All"), Some(GroupType::All));
        assert_eq!(GroupType::from_name("any").map(|g| g.filter_class()), Some("Or"));
        assert_eq!(GroupType::from_name("none"), None);
    }
}
