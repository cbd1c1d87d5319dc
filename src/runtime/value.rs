use std::{cmp::Ordering, fmt, rc::Rc};

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Dynamic value flowing through behavior bodies, variables and trigger
/// payloads.
///
/// Equality (`==`) is strict: `Number(1.0)` is not equal to `Text("1")`.
/// Block-level comparisons go through [`Value::compare`] instead, which
/// applies the numeric-if-both-parse rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absence of a value (`null` on the wire).
    #[default]
    Nothing,
    Bool(bool),
    Number(f64),
    Text(Rc<str>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{}", n)
    }
}

impl Value {
    pub fn text(s: impl AsRef<str>) -> Self {
        Value::Text(Rc::from(s.as_ref()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nothing => "Nothing",
            Value::Bool(_) => "Bool",
            Value::Number(_) => "Number",
            Value::Text(_) => "Text",
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    /// The single numeric coercion: anything that is not a finite number
    /// becomes 0.
    pub fn to_number(&self) -> f64 {
        let n = match self {
            Value::Nothing => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        };
        if n.is_finite() { n } else { 0.0 }
    }

    /// Numeric reading used by comparisons. `None` when the value does not
    /// look like a number at all.
    fn as_comparable_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
            }
            _ => None,
        }
    }

    pub fn to_bool(&self) -> bool {
        match self {
            Value::Nothing => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) => {
                let lowered = s.trim().to_ascii_lowercase();
                !(lowered.is_empty() || lowered == "false" || lowered == "0")
            }
        }
    }

    /// Compares numerically when both sides parse as numbers, lexically
    /// (case-insensitive) otherwise.
    pub fn compare(&self, other: &Value) -> Ordering {
        if let (Some(a), Some(b)) = (self.as_comparable_number(), other.as_comparable_number()) {
            return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        }
        let a = self.to_string().to_lowercase();
        let b = other.to_string().to_lowercase();
        a.cmp(&b)
    }

    pub fn loose_eq(&self, other: &Value) -> bool {
        self.compare(other) == Ordering::Equal
    }

    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Value::Nothing,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            Json::String(s) => Value::text(s),
            other => Value::text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Nothing => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Text(s) => Json::String(s.to_string()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s.into())
    }
}
