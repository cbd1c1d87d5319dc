use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

use crate::runtime::value::Value;

/// Scene-wide resources shared by every object's behaviors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneResources {
    #[serde(default)]
    pub tags: Vec<String>,
    /// Broadcast names offered by the editor.
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub sounds: Vec<SoundDefinition>,
    #[serde(default)]
    pub variables: Vec<VariableDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundDefinition {
    pub name: String,
    pub url: String,
}

/// A scene-shared ("global") variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub initial: Json,
}

impl VariableDeclaration {
    pub fn initial_value(&self) -> Value {
        Value::from_json(&self.initial)
    }
}

impl SceneResources {
    /// Reads resources stored under `key` in the scene metadata. Missing or
    /// malformed entries yield empty resources.
    pub fn from_metadata(metadata: &Map<String, Json>, key: &str) -> Self {
        match metadata.get(key) {
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(resources) => resources,
                Err(err) => {
                    tracing::warn!(key, %err, "ignoring malformed scene resources");
                    Self::default()
                }
            },
            None => Self::default(),
        }
    }

    pub fn sound(&self, name: &str) -> Option<&SoundDefinition> {
        self.sounds.iter().find(|sound| sound.name == name)
    }

    pub fn global_variable_ids(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.id.clone()).collect()
    }
}
