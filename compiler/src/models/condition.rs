//! Condition trees gating a rule's processors.
//!
//! A node is either a group (`type` + `children`) or a leaf
//! (`left` + `operator` + `right`). The leaf keeps its operator as written;
//! whether it is a string `Condition` or a `FieldCondition` follows from the
//! operator, so an unknown operator surfaces as a validation error instead
//! of a parse failure.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::element::{ElementType, GroupType, OperatorType};

/// Leaf comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeafCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub left: String,
    pub operator: String,
    pub right: Vec<String>,
}

impl LeafCondition {
    pub fn new<I, S>(left: impl Into<String>, operator: impl Into<String>, right: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            left: left.into(),
            operator: operator.into(),
            right: right.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn operator_type(&self) -> Option<OperatorType> {
        OperatorType::from_name(&self.operator)
    }

    /// `None` when the operator is unknown.
    pub fn element_type(&self) -> Option<ElementType> {
        self.operator_type().map(|op| op.element_type())
    }

    pub fn source_expressions(&self) -> Vec<&str> {
        std::iter::once(self.left.as_str())
            .chain(self.right.iter().map(String::as_str))
            .collect()
    }

    /// No operand and no operator filled in.
    pub fn is_blank(&self) -> bool {
        self.left.trim().is_empty()
            && self.operator.trim().is_empty()
            && self.right.iter().all(|r| r.trim().is_empty())
    }
}

/// Logical combination of child conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub group_type: String,
    pub children: Vec<Condition>,
}

impl ConditionGroup {
    pub fn new(group_type: impl Into<String>, children: Vec<Condition>) -> Self {
        Self {
            group_type: group_type.into(),
            children,
            ..Default::default()
        }
    }

    pub fn group_type(&self) -> Option<GroupType> {
        GroupType::from_name(&self.group_type)
    }
}

/// A node of a condition tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Condition {
    Group(ConditionGroup),
    Leaf(LeafCondition),
}

impl Condition {
    pub fn leaf<I, S>(left: impl Into<String>, operator: impl Into<String>, right: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::Leaf(LeafCondition::new(left, operator, right))
    }

    pub fn all(children: Vec<Condition>) -> Self {
        Condition::Group(ConditionGroup::new("All", children))
    }

    pub fn any(children: Vec<Condition>) -> Self {
        Condition::Group(ConditionGroup::new("Any", children))
    }

    /// `None` for a leaf with an unknown operator.
    pub fn element_type(&self) -> Option<ElementType> {
        match self {
            Condition::Group(_) => Some(ElementType::ConditionGroup),
            Condition::Leaf(leaf) => leaf.element_type(),
        }
    }

    /// Operands of every leaf, depth first.
    pub fn source_expressions(&self) -> Vec<&str> {
        match self {
            Condition::Group(group) => group
                .children
                .iter()
                .flat_map(Condition::source_expressions)
                .collect(),
            Condition::Leaf(leaf) => leaf.source_expressions(),
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let is_group = value.get("children").is_some() || value.get("type").is_some();
        if is_group {
            serde_json::from_value(value)
                .map(Condition::Group)
                .map_err(serde::de::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(Condition::Leaf)
                .map_err(serde::de::Error::custom)
        }
    }
}
