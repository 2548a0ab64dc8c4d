use serde_json::Value;
use std::collections::HashMap;

use crate::*;

pub const ATTR_X: &str = "x";
pub const ATTR_Y: &str = "y";
/// 1-based rank of an edge among the parallel edges sharing its endpoint
/// pair, written back by the scene whenever topology changes.
pub const ATTR_PARALLEL_SEQ: &str = "parallelSeq";

/// Topology and attribute changes a scene consumes to stay in sync.
///
/// Payloads are keys only; the scene reads current state back through
/// [`GraphSource`], so replaying a stale event cannot resurrect old data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphEvent {
    NodeAdded { key: String },
    EdgeAdded { key: String },
    NodeDropped { key: String },
    EdgeDropped { key: String },
    Cleared,
    EdgesCleared,
    NodeAttributesUpdated { key: String },
    EdgeAttributesUpdated { key: String },
    EachNodeAttributesUpdated,
    EachEdgeAttributesUpdated,
}

/// Read/write access to the graph a scene mirrors.
///
/// The scene never stores this; every operation borrows it for the duration
/// of the call, so any graph store with stable insertion order can back a
/// scene.
pub trait GraphSource {
    fn each_node(&self, visit: &mut dyn FnMut(&str, &AttrMap));
    fn each_edge(&self, visit: &mut dyn FnMut(&str, &AttrMap, &str, &str));
    fn node_attributes(&self, key: &str) -> Option<&AttrMap>;
    fn edge_attributes(&self, key: &str) -> Option<&AttrMap>;
    fn set_node_attribute(&mut self, key: &str, name: &str, value: Value);
    fn set_edge_attribute(&mut self, key: &str, name: &str, value: Value);
    fn edge_source(&self, key: &str) -> Option<&str>;
    fn edge_target(&self, key: &str) -> Option<&str>;
    fn is_directed(&self, key: &str) -> bool;
    /// Keys of all edges incident to `node_key`, in insertion order.
    fn node_edges(&self, node_key: &str) -> Vec<String>;
}

pub(crate) fn attr_f32(attributes: &AttrMap, name: &str) -> Option<f32> {
    attributes.get(name)?.as_f64().map(|v| v as f32)
}

/// World position of a node from its `x`/`y` attributes.
pub fn node_position(attributes: &AttrMap, key: &str) -> Result<Point, SceneError> {
    let x = attr_f32(attributes, ATTR_X)
        .ok_or_else(|| SceneError::MissingCoordinate(key.to_string(), ATTR_X))?;
    let y = attr_f32(attributes, ATTR_Y)
        .ok_or_else(|| SceneError::MissingCoordinate(key.to_string(), ATTR_Y))?;
    Ok(Point::new(x, y))
}

struct EdgeRecord {
    source: String,
    target: String,
    directed: bool,
    attributes: AttrMap,
}

/// Insertion-ordered in-memory graph.
///
/// The mutators return the [`GraphEvent`]s a caller should feed to its
/// scenes, in the order the changes took effect.
#[derive(Default)]
pub struct MemoryGraph {
    node_order: Vec<String>,
    nodes: HashMap<String, AttrMap>,
    edge_order: Vec<String>,
    edges: HashMap<String, EdgeRecord>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_order.len()
    }

    pub fn add_node(&mut self, key: impl Into<String>, attributes: AttrMap) -> GraphEvent {
        let key = key.into();
        if !self.nodes.contains_key(&key) {
            self.node_order.push(key.clone());
        }
        self.nodes.insert(key.clone(), attributes);
        GraphEvent::NodeAdded { key }
    }

    pub fn add_edge(
        &mut self,
        key: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        directed: bool,
        attributes: AttrMap,
    ) -> GraphEvent {
        let key = key.into();
        if !self.edges.contains_key(&key) {
            self.edge_order.push(key.clone());
        }
        self.edges.insert(
            key.clone(),
            EdgeRecord { source: source.into(), target: target.into(), directed, attributes },
        );
        GraphEvent::EdgeAdded { key }
    }

    /// Drop a node and every edge touching it. Incident edges go first, the
    /// node last, mirroring the order scenes need for teardown.
    pub fn drop_node(&mut self, key: &str) -> Vec<GraphEvent> {
        let mut events = Vec::new();
        if !self.nodes.contains_key(key) {
            return events;
        }
        for edge_key in self.node_edges(key) {
            if let Some(event) = self.drop_edge(&edge_key) {
                events.push(event);
            }
        }
        self.nodes.remove(key);
        self.node_order.retain(|k| k != key);
        events.push(GraphEvent::NodeDropped { key: key.to_string() });
        events
    }

    pub fn drop_edge(&mut self, key: &str) -> Option<GraphEvent> {
        self.edges.remove(key)?;
        self.edge_order.retain(|k| k != key);
        Some(GraphEvent::EdgeDropped { key: key.to_string() })
    }

    pub fn clear(&mut self) -> GraphEvent {
        self.nodes.clear();
        self.node_order.clear();
        self.edges.clear();
        self.edge_order.clear();
        GraphEvent::Cleared
    }

    pub fn clear_edges(&mut self) -> GraphEvent {
        self.edges.clear();
        self.edge_order.clear();
        GraphEvent::EdgesCleared
    }

    pub fn update_node_attribute(&mut self, key: &str, name: &str, value: Value) -> Option<GraphEvent> {
        let attributes = self.nodes.get_mut(key)?;
        attributes.insert(name.to_string(), value);
        Some(GraphEvent::NodeAttributesUpdated { key: key.to_string() })
    }

    pub fn update_edge_attribute(&mut self, key: &str, name: &str, value: Value) -> Option<GraphEvent> {
        let record = self.edges.get_mut(key)?;
        record.attributes.insert(name.to_string(), value);
        Some(GraphEvent::EdgeAttributesUpdated { key: key.to_string() })
    }
}

impl GraphSource for MemoryGraph {
    fn each_node(&self, visit: &mut dyn FnMut(&str, &AttrMap)) {
        for key in &self.node_order {
            if let Some(attributes) = self.nodes.get(key) {
                visit(key, attributes);
            }
        }
    }

    fn each_edge(&self, visit: &mut dyn FnMut(&str, &AttrMap, &str, &str)) {
        for key in &self.edge_order {
            if let Some(record) = self.edges.get(key) {
                visit(key, &record.attributes, &record.source, &record.target);
            }
        }
    }

    fn node_attributes(&self, key: &str) -> Option<&AttrMap> {
        self.nodes.get(key)
    }

    fn edge_attributes(&self, key: &str) -> Option<&AttrMap> {
        self.edges.get(key).map(|record| &record.attributes)
    }

    fn set_node_attribute(&mut self, key: &str, name: &str, value: Value) {
        if let Some(attributes) = self.nodes.get_mut(key) {
            attributes.insert(name.to_string(), value);
        }
    }

    fn set_edge_attribute(&mut self, key: &str, name: &str, value: Value) {
        if let Some(record) = self.edges.get_mut(key) {
            record.attributes.insert(name.to_string(), value);
        }
    }

    fn edge_source(&self, key: &str) -> Option<&str> {
        self.edges.get(key).map(|record| record.source.as_str())
    }

    fn edge_target(&self, key: &str) -> Option<&str> {
        self.edges.get(key).map(|record| record.target.as_str())
    }

    fn is_directed(&self, key: &str) -> bool {
        self.edges.get(key).map(|record| record.directed).unwrap_or(false)
    }

    fn node_edges(&self, node_key: &str) -> Vec<String> {
        self.edge_order
            .iter()
            .filter(|key| {
                self.edges
                    .get(*key)
                    .map(|record| record.source == node_key || record.target == node_key)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}
