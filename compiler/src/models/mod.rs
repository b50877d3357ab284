//! Domain models for mapping rules.
//!
//! - [`MappingRules`] - ordered ruleset keyed by rule uid
//! - [`Rule`] - optional condition plus ordered actions for one phase
//! - [`Action`] - one step, discriminated by `actionType`
//! - [`Condition`] - group or leaf condition tree
//! - [`ElementType`] - the closed registry of element kinds
//!
//! # Example payload
//!
//! ```json
//! {
//!   "version": "4.1",
//!   "eventType": "syslogFields",
//!   "rules": {
//!     "rule-1": {
//!       "description": "set version",
//!       "actions": [
//!         { "actionType": "copy", "target": "event.commonEventHeader.version", "from": { "value": "2.0" } }
//!       ],
//!       "condition": { "left": "${event.commonEventHeader.domain}", "operator": "equals", "right": ["syslog"] }
//!     }
//!   }
//! }
//! ```

pub mod action;
pub mod condition;
pub mod element;
pub mod rule;

pub use action::{
    strip_field, Action, ActionCommon, ClearAction, ConcatAction, CopyAction, DateFormat,
    DateFormatterAction, Enrichment, FindReplace, FromValue, HpMetricAction, HpMetricSpec,
    KeyValue, LogEventAction, LogEventSpec, LogTextAction, LogTextSpec, MapAction, MapTable,
    ReplaceTextAction, StringTransformAction, StringTransformSpec, TopoSearch, TopoSearchAction,
    ValueEntry, EMPTY_SENTINEL,
};
pub use condition::{Condition, ConditionGroup, LeafCondition};
pub use element::{ElementType, GroupType, OperatorType};
pub use rule::{MappingRules, Rule};
