use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{runtime::value::Value, scene::TrackedProperty};

/// External signal raised when a die is rolled. Payload keys: `die`, `value`.
pub const DICE_ROLL_SIGNAL: &str = "diceRoll";
/// Payload keys: `name`, `value`.
pub const PHASE_CHANGED_SIGNAL: &str = "phaseChanged";
/// Payload key: `state` (`"open"` or `"closed"`).
pub const DOOR_SIGNAL: &str = "door";

/// How a trigger compares the value carried by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "match", content = "value", rename_all = "camelCase")]
pub enum ValueMatch {
    Any,
    Defined,
    /// Strict equality.
    Exactly(Value),
}

impl ValueMatch {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueMatch::Any => true,
            ValueMatch::Defined => !value.is_nothing(),
            ValueMatch::Exactly(expected) => expected == value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollisionPhase {
    Start,
    End,
}

/// What a hat block reacts to, with its matching criteria captured at compile
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TriggerKind {
    Immediately,
    StartAsClone,
    Broadcast {
        name: String,
    },
    PropertyChanged {
        property: TrackedProperty,
        #[serde(rename = "when")]
        matcher: ValueMatch,
    },
    SelectionChanged {
        selected: bool,
    },
    Collision {
        phase: CollisionPhase,
    },
    /// Application-defined signals such as dice rolls or door state; each
    /// criterion is checked against the matching payload key.
    External {
        signal: String,
        criteria: IndexMap<String, ValueMatch>,
    },
}

impl TriggerKind {
    pub fn label(&self) -> &'static str {
        match self {
            TriggerKind::Immediately => "immediately",
            TriggerKind::StartAsClone => "startAsClone",
            TriggerKind::Broadcast { .. } => "broadcast",
            TriggerKind::PropertyChanged { .. } => "propertyChanged",
            TriggerKind::SelectionChanged { .. } => "selectionChanged",
            TriggerKind::Collision { .. } => "collision",
            TriggerKind::External { .. } => "external",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Broadcast { name } => write!(f, "broadcast({})", name),
            TriggerKind::PropertyChanged { property, .. } => {
                write!(f, "propertyChanged({})", property)
            }
            TriggerKind::SelectionChanged { selected } => {
                write!(f, "selectionChanged({})", selected)
            }
            TriggerKind::Collision { phase } => write!(f, "collision({:?})", phase),
            TriggerKind::External { signal, .. } => write!(f, "external({})", signal),
            other => f.write_str(other.label()),
        }
    }
}

/// The static, serializable half of a trigger handler. The executable body
/// lives beside it in the compiled procedure and is looked up by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerDescriptor {
    pub hat_id: String,
    #[serde(flatten)]
    pub kind: TriggerKind,
}
