use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::runtime::value::Value;

pub type ObjectId = String;

/// Layers whose objects take part in collision tracking.
const COLLIDABLE_LAYERS: &[&str] = &["CHARACTER", "MOUNT", "PROP", "ATTACHMENT"];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };
    pub const ONE: Vector2 = Vector2 { x: 1.0, y: 1.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vector2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    #[default]
    Image,
    Shape,
    Text,
    Label,
}

/// One movable object in the shared scene, as reported by the host.
///
/// `last_modified` is a monotonic per-object counter bumped by the host on
/// every write; the diff engine relies on it to detect updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneObject {
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: ObjectKind,
    #[serde(default = "default_layer")]
    pub layer: String,
    #[serde(default)]
    pub position: Vector2,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_scale")]
    pub scale: Vector2,
    /// Unscaled width and height.
    #[serde(default = "default_size")]
    pub size: Vector2,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_to: Option<ObjectId>,
    #[serde(default)]
    pub z_index: f64,
    #[serde(default)]
    pub last_modified: u64,
    #[serde(default)]
    pub metadata: Map<String, Json>,
}

fn default_layer() -> String {
    "CHARACTER".to_string()
}

fn default_scale() -> Vector2 {
    Vector2::ONE
}

fn default_size() -> Vector2 {
    Vector2::new(150.0, 150.0)
}

fn default_visible() -> bool {
    true
}

impl SceneObject {
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind: ObjectKind::Image,
            layer: default_layer(),
            position: Vector2::ZERO,
            rotation: 0.0,
            scale: Vector2::ONE,
            size: default_size(),
            visible: true,
            locked: false,
            text: String::new(),
            attached_to: None,
            z_index: 0.0,
            last_modified: 0,
            metadata: Map::new(),
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Vector2::new(x, y);
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Vector2::new(width, height);
        self
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Json) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_collidable(&self) -> bool {
        matches!(self.kind, ObjectKind::Image | ObjectKind::Shape)
            && COLLIDABLE_LAYERS.contains(&self.layer.as_str())
    }

    /// Tags live in metadata under `tags` as a list of strings.
    pub fn tags(&self) -> Vec<String> {
        match self.metadata.get("tags") {
            Some(Json::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags().iter().any(|t| t == tag)
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.metadata.insert(
            "tags".to_string(),
            Json::Array(tags.into_iter().map(Json::String).collect()),
        );
    }

    /// Reads one of the tracked scalar properties.
    pub fn property(&self, property: TrackedProperty) -> Value {
        match property {
            TrackedProperty::X => Value::Number(self.position.x),
            TrackedProperty::Y => Value::Number(self.position.y),
            TrackedProperty::Rotation => Value::Number(self.rotation),
            TrackedProperty::Visible => Value::Bool(self.visible),
            TrackedProperty::Locked => Value::Bool(self.locked),
            TrackedProperty::Layer => Value::text(&self.layer),
            TrackedProperty::Text => Value::text(&self.text),
            TrackedProperty::Name => Value::text(&self.name),
            TrackedProperty::Scale => Value::Number(self.scale.x * 100.0),
            TrackedProperty::AttachedTo => match &self.attached_to {
                Some(id) => Value::text(id),
                None => Value::Nothing,
            },
        }
    }
}

/// Object properties whose changes can fire property-changed triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackedProperty {
    X,
    Y,
    Rotation,
    Visible,
    Locked,
    Layer,
    Text,
    Name,
    Scale,
    AttachedTo,
}

impl TrackedProperty {
    pub const ALL: [TrackedProperty; 10] = [
        TrackedProperty::X,
        TrackedProperty::Y,
        TrackedProperty::Rotation,
        TrackedProperty::Visible,
        TrackedProperty::Locked,
        TrackedProperty::Layer,
        TrackedProperty::Text,
        TrackedProperty::Name,
        TrackedProperty::Scale,
        TrackedProperty::AttachedTo,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        let property = match name {
            "x" | "X" => TrackedProperty::X,
            "y" | "Y" => TrackedProperty::Y,
            "rotation" | "ROTATION" => TrackedProperty::Rotation,
            "visible" | "VISIBLE" => TrackedProperty::Visible,
            "locked" | "LOCKED" => TrackedProperty::Locked,
            "layer" | "LAYER" => TrackedProperty::Layer,
            "text" | "TEXT" => TrackedProperty::Text,
            "name" | "NAME" => TrackedProperty::Name,
            "scale" | "SCALE" => TrackedProperty::Scale,
            "attachedTo" | "ATTACHED_TO" => TrackedProperty::AttachedTo,
            _ => return None,
        };
        Some(property)
    }

    pub fn name(self) -> &'static str {
        match self {
            TrackedProperty::X => "x",
            TrackedProperty::Y => "y",
            TrackedProperty::Rotation => "rotation",
            TrackedProperty::Visible => "visible",
            TrackedProperty::Locked => "locked",
            TrackedProperty::Layer => "layer",
            TrackedProperty::Text => "text",
            TrackedProperty::Name => "name",
            TrackedProperty::Scale => "scale",
            TrackedProperty::AttachedTo => "attachedTo",
        }
    }

    /// Converts an authored literal into the value type this property holds,
    /// so strict equality matching works against live values.
    pub fn typed_literal(self, literal: &str) -> Option<Value> {
        match self {
            TrackedProperty::X
            | TrackedProperty::Y
            | TrackedProperty::Rotation
            | TrackedProperty::Scale => {
                let n: f64 = literal.trim().parse().ok()?;
                n.is_finite().then_some(Value::Number(n))
            }
            TrackedProperty::Visible | TrackedProperty::Locked => {
                match literal.trim().to_ascii_lowercase().as_str() {
                    "true" => Some(Value::Bool(true)),
                    "false" => Some(Value::Bool(false)),
                    _ => None,
                }
            }
            TrackedProperty::AttachedTo if literal.is_empty() => Some(Value::Nothing),
            TrackedProperty::Layer
            | TrackedProperty::Text
            | TrackedProperty::Name
            | TrackedProperty::AttachedTo => Some(Value::text(literal)),
        }
    }
}

impl fmt::Display for TrackedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
