use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::*;

/// Attribute bag attached to a graph node or edge.
pub type AttrMap = Map<String, Value>;

/// One layer of a style cascade.
///
/// A definition is either a literal JSON fragment, a function of the
/// element's attributes, or a partial tree whose leaves are themselves
/// definitions. Resolution happens against a single element's attributes and
/// produces plain JSON, so layers written in any of the three forms merge
/// uniformly.
#[derive(Clone)]
pub enum StyleDefinition {
    Literal(Value),
    Computed(Arc<dyn Fn(&AttrMap) -> Value>),
    Partial(BTreeMap<String, StyleDefinition>),
}

impl fmt::Debug for StyleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleDefinition::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            StyleDefinition::Computed(_) => f.write_str("Computed(..)"),
            StyleDefinition::Partial(tree) => f.debug_tuple("Partial").field(tree).finish(),
        }
    }
}

impl From<Value> for StyleDefinition {
    fn from(value: Value) -> Self {
        StyleDefinition::Literal(value)
    }
}

impl StyleDefinition {
    pub fn computed(f: impl Fn(&AttrMap) -> Value + 'static) -> Self {
        StyleDefinition::Computed(Arc::new(f))
    }

    pub fn partial<K: Into<String>>(entries: impl IntoIterator<Item = (K, StyleDefinition)>) -> Self {
        StyleDefinition::Partial(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Evaluate this definition against one element's attributes.
    pub fn resolve(&self, attributes: &AttrMap) -> Value {
        match self {
            StyleDefinition::Literal(value) => value.clone(),
            StyleDefinition::Computed(f) => f(attributes),
            StyleDefinition::Partial(tree) => Value::Object(
                tree.iter()
                    .map(|(key, def)| (key.clone(), def.resolve(attributes)))
                    .collect(),
            ),
        }
    }
}

/// Resolve a cascade of definitions, later layers overriding earlier ones per
/// leaf key. `None` entries are skipped so callers can pass optional layers
/// straight through.
pub fn resolve_style_definitions(
    definitions: &[Option<&StyleDefinition>],
    attributes: &AttrMap,
) -> Value {
    let mut merged = Value::Object(Map::new());
    for definition in definitions.iter().flatten() {
        deep_merge(&mut merged, definition.resolve(attributes));
    }
    merged
}

fn deep_merge(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            for (key, value) in incoming_map {
                match base_map.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Node and edge style layers of one cascade level.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    pub node: Option<StyleDefinition>,
    pub edge: Option<StyleDefinition>,
}

/// How a label texture is produced by the texture factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextKind {
    #[serde(rename = "TEXT")]
    Text,
    #[serde(rename = "BITMAP_TEXT")]
    BitmapText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelStyle {
    #[serde(rename = "type")]
    pub kind: TextKind,
    pub font_family: String,
    pub font_size: f32,
    pub content: String,
    pub color: String,
    pub padding: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderStyle {
    pub width: f32,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IconStyle {
    pub url: Option<String>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

/// Fully resolved visual parameters of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub size: f32,
    pub color: String,
    pub border: BorderStyle,
    #[serde(default)]
    pub icon: IconStyle,
    pub label: LabelStyle,
}

impl NodeStyle {
    /// Radius out to the border's outer rim, the node's interactive extent.
    pub fn outer_size(&self) -> f32 {
        self.size + self.border.width
    }

    pub fn from_value(value: Value) -> Result<Self, SceneError> {
        serde_json::from_value(value).map_err(|source| SceneError::StyleShape { kind: "node", source })
    }
}

/// Fully resolved visual parameters of an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub width: f32,
    pub color: String,
    pub label: LabelStyle,
}

impl EdgeStyle {
    pub fn from_value(value: Value) -> Result<Self, SceneError> {
        serde_json::from_value(value).map_err(|source| SceneError::StyleShape { kind: "edge", source })
    }
}

/// The always-present bottom layer of the cascade. Every field a resolved
/// style needs is covered here, so sparser user sheets stay valid.
pub fn default_style_sheet() -> StyleSheet {
    StyleSheet {
        node: Some(StyleDefinition::Literal(json!({
            "size": 15,
            "color": "#000000",
            "border": { "width": 2, "color": "#ffffff" },
            "icon": {},
            "label": {
                "type": "TEXT",
                "fontFamily": "Arial",
                "fontSize": 12,
                "content": "",
                "color": "#333333",
                "padding": 4,
            },
        }))),
        edge: Some(StyleDefinition::Literal(json!({
            "width": 1,
            "color": "#cccccc",
            "label": {
                "type": "TEXT",
                "fontFamily": "Arial",
                "fontSize": 12,
                "content": "",
                "color": "#333333",
                "padding": 4,
            },
        }))),
    }
}
