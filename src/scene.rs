use log::{debug, trace};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

use crate::*;

/// Margin added around the graph bounding box when fitting the view.
pub const WORLD_PADDING: f32 = 100.0;
pub const DEFAULT_MAX_ZOOM: f32 = 5.0;

const DOUBLE_CLICK_DELAY_MS: f64 = 350.0;
const CLICK_DRAG_TOLERANCE: f32 = 2.0;
/// Upper scale bound of each zoom step; the index of the first bucket the
/// current scale fits in is the step.
const ZOOM_STEPS: [f32; 4] = [0.1, 0.2, 0.4, f32::INFINITY];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
}

/// One pointer sample in screen coordinates, with the modifier state and
/// timestamp of the originating input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub position: Point,
    pub button: PointerButton,
    pub meta: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub time_ms: f64,
}

impl Default for PointerInput {
    fn default() -> Self {
        Self {
            position: Point::default(),
            button: PointerButton::Left,
            meta: false,
            ctrl: false,
            shift: false,
            time_ms: 0.0,
        }
    }
}

impl PointerInput {
    fn has_modifier(&self) -> bool {
        self.meta || self.ctrl || self.shift
    }
}

/// Interaction events the scene synthesizes from raw pointer input, drained
/// by the embedder after each batch of input.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    RightClick { pointer: PointerInput },
    NodeClick { key: String, pointer: PointerInput },
    NodeDoubleClick { key: String, pointer: PointerInput },
    NodeRightClick { key: String, pointer: PointerInput },
    NodeMousemove { key: String, pointer: PointerInput },
    NodeMouseover { key: String, pointer: PointerInput, bounds: Rect },
    NodeMouseout { key: String, pointer: PointerInput },
    NodeMousedown { key: String, pointer: PointerInput },
    NodeMouseup { key: String, pointer: PointerInput },
    EdgeClick { key: String, pointer: PointerInput },
    EdgeMousemove { key: String, pointer: PointerInput },
    EdgeMouseover { key: String, pointer: PointerInput },
    EdgeMouseout { key: String, pointer: PointerInput },
    EdgeMousedown { key: String, pointer: PointerInput },
    EdgeMouseup { key: String, pointer: PointerInput },
}

pub struct SceneOptions {
    pub width: f32,
    pub height: f32,
    pub style: StyleSheet,
    pub hover_style: StyleSheet,
    pub select_style: StyleSheet,
    pub texture_factory: Box<dyn TextureFactory>,
    pub max_zoom: f32,
}

impl SceneOptions {
    pub fn new(width: f32, height: f32, texture_factory: Box<dyn TextureFactory>) -> Self {
        Self {
            width,
            height,
            style: StyleSheet::default(),
            hover_style: StyleSheet::default(),
            select_style: StyleSheet::default(),
            texture_factory,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

/// The eight paint layers, back to front. Real node and edge containers live
/// in the back layers; the front layers carry their placeholders until a
/// hover or selection swaps the pair.
pub struct SceneLayers {
    pub edge: DisplayId,
    pub edge_label: DisplayId,
    pub front_edge: DisplayId,
    pub front_edge_label: DisplayId,
    pub node: DisplayId,
    pub node_label: DisplayId,
    pub front_node: DisplayId,
    pub front_node_label: DisplayId,
}

impl SceneLayers {
    /// All eight layers in paint order.
    pub fn all(&self) -> [DisplayId; 8] {
        [
            self.edge,
            self.edge_label,
            self.front_edge,
            self.front_edge_label,
            self.node,
            self.node_label,
            self.front_node,
            self.front_node_label,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Pick {
    Node(String),
    Edge(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Highlight {
    Hovered,
    Selected,
}

/// Scene controller: mirrors a [`GraphSource`] into a display tree and runs
/// styling, level-of-detail, culling and pointer interaction over it.
///
/// The scene never holds the graph; every operation borrows it for the call.
/// After mutating the graph, feed the resulting [`GraphEvent`]s through
/// [`apply_event`](Self::apply_event) in emission order to keep the mirror
/// exact. All methods expect to run on one thread; the scene is a plain
/// state machine with no interior synchronization.
pub struct GraphScene {
    style: StyleSheet,
    hover_style: StyleSheet,
    select_style: StyleSheet,
    default_style: StyleSheet,
    stage: Stage,
    texture_cache: TextureCache,
    viewport: Viewport,
    layers: SceneLayers,
    node_visuals: HashMap<String, NodeVisual>,
    edge_visuals: HashMap<String, EdgeVisual>,
    display_index: HashMap<DisplayId, Pick>,
    parallel_edge_counts: HashMap<(String, String), u32>,
    select_node_keys: Vec<String>,
    hovered_node_key: Option<String>,
    hovered_edge_key: Option<String>,
    mousedown_node_key: Option<String>,
    mousedown_edge_key: Option<String>,
    mouse_down_position: Option<Point>,
    events: VecDeque<SceneEvent>,
}

impl GraphScene {
    pub fn new(options: SceneOptions) -> Result<Self, SceneError> {
        let SceneOptions { width, height, style, hover_style, select_style, texture_factory, max_zoom } =
            options;
        if !(width > 0.0) || !(height > 0.0) {
            return Err(SceneError::InvalidCanvasSize { width, height });
        }

        let viewport = Viewport::new(width, height)
            .drag()
            .pinch()
            .wheel()
            .decelerate()
            .clamp_zoom(None, Some(max_zoom));

        let mut stage = Stage::new();
        let layers = SceneLayers {
            edge: stage.new_group(),
            edge_label: stage.new_group(),
            front_edge: stage.new_group(),
            front_edge_label: stage.new_group(),
            node: stage.new_group(),
            node_label: stage.new_group(),
            front_node: stage.new_group(),
            front_node_label: stage.new_group(),
        };
        for layer in layers.all() {
            stage.add_to_root(layer);
        }

        Ok(Self {
            style,
            hover_style,
            select_style,
            default_style: default_style_sheet(),
            stage,
            texture_cache: TextureCache::new(texture_factory),
            viewport,
            layers,
            node_visuals: HashMap::new(),
            edge_visuals: HashMap::new(),
            display_index: HashMap::new(),
            parallel_edge_counts: HashMap::new(),
            select_node_keys: Vec::new(),
            hovered_node_key: None,
            hovered_edge_key: None,
            mousedown_node_key: None,
            mousedown_edge_key: None,
            mouse_down_position: None,
            events: VecDeque::new(),
        })
    }

    /// Mirror the graph's full current state: parallel-edge index first, then
    /// node visuals, then edge visuals, then a view reset over the result.
    pub fn build(&mut self, graph: &mut dyn GraphSource) -> Result<(), SceneError> {
        self.calculate_parallel_edges(graph);

        let mut nodes: Vec<(String, AttrMap)> = Vec::new();
        graph.each_node(&mut |key, attributes| nodes.push((key.to_string(), attributes.clone())));
        for (key, attributes) in &nodes {
            self.create_node(key, attributes)?;
        }

        let mut edges: Vec<String> = Vec::new();
        graph.each_edge(&mut |key, _, _, _| edges.push(key.to_string()));
        for key in &edges {
            self.create_edge(graph, key)?;
        }

        self.reset_view(graph);
        debug!(
            "scene built with {} nodes and {} edges",
            self.node_visuals.len(),
            self.edge_visuals.len()
        );
        Ok(())
    }

    /// Apply one graph mutation. Events must arrive in the order the graph
    /// emitted them; replay against a graph that has since changed further is
    /// safe because all state is read back from the graph here.
    pub fn apply_event(
        &mut self,
        graph: &mut dyn GraphSource,
        event: &GraphEvent,
    ) -> Result<(), SceneError> {
        match event {
            GraphEvent::NodeAdded { key } => {
                self.calculate_parallel_edges(graph);
                let attributes = graph
                    .node_attributes(key)
                    .ok_or_else(|| SceneError::UnknownNode(key.clone()))?;
                self.create_node(key, attributes)?;
                self.refresh_all_edges(graph)
            }
            GraphEvent::EdgeAdded { key } => {
                self.calculate_parallel_edges(graph);
                // siblings first: their ranks may have shifted
                self.refresh_all_edges(graph)?;
                self.create_edge(graph, key)
            }
            GraphEvent::NodeDropped { key } => {
                self.drop_node_visual(key)?;
                self.calculate_parallel_edges(graph);
                self.refresh_all_edges(graph)
            }
            GraphEvent::EdgeDropped { key } => {
                self.drop_edge_visual(key)?;
                self.calculate_parallel_edges(graph);
                self.refresh_all_edges(graph)
            }
            GraphEvent::Cleared => {
                let edge_keys: Vec<String> = self.edge_visuals.keys().cloned().collect();
                for key in edge_keys {
                    self.drop_edge_visual(&key)?;
                }
                let node_keys: Vec<String> = self.node_visuals.keys().cloned().collect();
                for key in node_keys {
                    self.drop_node_visual(&key)?;
                }
                self.parallel_edge_counts.clear();
                Ok(())
            }
            GraphEvent::EdgesCleared => {
                let edge_keys: Vec<String> = self.edge_visuals.keys().cloned().collect();
                for key in edge_keys {
                    self.drop_edge_visual(&key)?;
                }
                self.calculate_parallel_edges(graph);
                Ok(())
            }
            GraphEvent::NodeAttributesUpdated { key } => self.refresh_node(graph, key),
            GraphEvent::EdgeAttributesUpdated { key } => self.update_edge_style_by_key(graph, key),
            GraphEvent::EachNodeAttributesUpdated => {
                let keys: Vec<String> = self.node_visuals.keys().cloned().collect();
                for key in keys {
                    self.refresh_node_visual(graph, &key)?;
                }
                self.refresh_all_edges(graph)
            }
            GraphEvent::EachEdgeAttributesUpdated => self.refresh_all_edges(graph),
        }
    }

    /// Rebuild the parallel-edge index and write each edge's 1-based rank
    /// back as its `parallelSeq` attribute, in graph iteration order.
    fn calculate_parallel_edges(&mut self, graph: &mut dyn GraphSource) {
        let mut counts: HashMap<(String, String), u32> = HashMap::new();
        let mut ranks: Vec<(String, u32)> = Vec::new();
        graph.each_edge(&mut |key, _, source, target| {
            let count = counts.entry((source.to_string(), target.to_string())).or_insert(0);
            *count += 1;
            ranks.push((key.to_string(), *count));
        });
        for (key, rank) in ranks {
            graph.set_edge_attribute(&key, ATTR_PARALLEL_SEQ, Value::from(rank));
        }
        self.parallel_edge_counts = counts;
    }

    fn create_node(&mut self, key: &str, attributes: &AttrMap) -> Result<(), SceneError> {
        let node = NodeVisual::new(&mut self.stage);
        self.stage.add_child(self.layers.node, node.gfx);
        self.stage.add_child(self.layers.node_label, node.label_gfx);
        self.stage.add_child(self.layers.front_node, node.placeholder_gfx);
        self.stage.add_child(self.layers.front_node_label, node.label_placeholder_gfx);
        self.display_index.insert(node.gfx, Pick::Node(key.to_string()));

        let position = node_position(attributes, key)?;
        node.update_position(&mut self.stage, position);
        self.node_visuals.insert(key.to_string(), node);
        self.update_node_style(key, attributes)
    }

    fn create_edge(&mut self, graph: &dyn GraphSource, key: &str) -> Result<(), SceneError> {
        let edge = EdgeVisual::new(&mut self.stage);
        self.stage.add_child(self.layers.edge, edge.gfx);
        self.stage.add_child(self.layers.edge_label, edge.label_gfx);
        self.stage.add_child(self.layers.front_edge, edge.placeholder_gfx);
        self.stage.add_child(self.layers.front_edge_label, edge.label_placeholder_gfx);
        self.display_index.insert(edge.gfx, Pick::Edge(key.to_string()));
        self.edge_visuals.insert(key.to_string(), edge);
        self.update_edge_style_by_key(graph, key)
    }

    fn drop_node_visual(&mut self, key: &str) -> Result<(), SceneError> {
        let node = self
            .node_visuals
            .remove(key)
            .ok_or_else(|| SceneError::NodeOutOfSync(key.to_string()))?;
        self.display_index.remove(&node.gfx);
        // free wherever the containers currently live, promoted or not
        self.stage.free(node.gfx);
        self.stage.free(node.label_gfx);
        self.stage.free(node.placeholder_gfx);
        self.stage.free(node.label_placeholder_gfx);

        self.select_node_keys.retain(|k| k != key);
        if self.hovered_node_key.as_deref() == Some(key) {
            self.hovered_node_key = None;
        }
        if self.mousedown_node_key.as_deref() == Some(key) {
            self.mousedown_node_key = None;
            self.viewport.pause = false;
        }
        Ok(())
    }

    fn drop_edge_visual(&mut self, key: &str) -> Result<(), SceneError> {
        let edge = self
            .edge_visuals
            .remove(key)
            .ok_or_else(|| SceneError::EdgeOutOfSync(key.to_string()))?;
        self.display_index.remove(&edge.gfx);
        self.stage.free(edge.gfx);
        self.stage.free(edge.label_gfx);
        self.stage.free(edge.placeholder_gfx);
        self.stage.free(edge.label_placeholder_gfx);

        if self.hovered_edge_key.as_deref() == Some(key) {
            self.hovered_edge_key = None;
        }
        if self.mousedown_edge_key.as_deref() == Some(key) {
            self.mousedown_edge_key = None;
        }
        Ok(())
    }

    /// Resolve and apply a node's style. The cascade is defaults, then the
    /// scene sheet, then the state sheet; selection outranks hover.
    fn update_node_style(&mut self, key: &str, attributes: &AttrMap) -> Result<(), SceneError> {
        let node = self
            .node_visuals
            .get(key)
            .ok_or_else(|| SceneError::NodeOutOfSync(key.to_string()))?;
        let state = if node.selected {
            self.select_style.node.as_ref()
        } else if node.hovered {
            self.hover_style.node.as_ref()
        } else {
            None
        };
        let value = resolve_style_definitions(
            &[self.default_style.node.as_ref(), self.style.node.as_ref(), state],
            attributes,
        );
        let node_style = NodeStyle::from_value(value)?;
        node.update_style(&mut self.stage, &mut self.texture_cache, &node_style)
    }

    fn update_node_style_by_key(&mut self, graph: &dyn GraphSource, key: &str) -> Result<(), SceneError> {
        let attributes = graph
            .node_attributes(key)
            .ok_or_else(|| SceneError::UnknownNode(key.to_string()))?;
        self.update_node_style(key, attributes)
    }

    /// Re-read a node's attributes into position and style, without touching
    /// its incident edges.
    fn refresh_node_visual(&mut self, graph: &dyn GraphSource, key: &str) -> Result<(), SceneError> {
        let attributes = graph
            .node_attributes(key)
            .ok_or_else(|| SceneError::UnknownNode(key.to_string()))?;
        let position = node_position(attributes, key)?;
        let node = self
            .node_visuals
            .get(key)
            .ok_or_else(|| SceneError::NodeOutOfSync(key.to_string()))?;
        node.update_position(&mut self.stage, position);
        self.update_node_style(key, attributes)
    }

    fn refresh_node(&mut self, graph: &dyn GraphSource, key: &str) -> Result<(), SceneError> {
        self.refresh_node_visual(graph, key)?;
        // the node may have moved; its edges' geometry depends on it
        for edge_key in graph.node_edges(key) {
            self.update_edge_style_by_key(graph, &edge_key)?;
        }
        Ok(())
    }

    /// Recompute one edge's geometry and style from current graph state.
    /// Endpoint positions come from the node visuals so edge geometry always
    /// trails node movement, never graph attributes mid-update.
    fn update_edge_style_by_key(&mut self, graph: &dyn GraphSource, key: &str) -> Result<(), SceneError> {
        let attributes = graph
            .edge_attributes(key)
            .ok_or_else(|| SceneError::UnknownEdge(key.to_string()))?;
        let source_key = graph
            .edge_source(key)
            .ok_or_else(|| SceneError::UnknownEdge(key.to_string()))?;
        let target_key = graph
            .edge_target(key)
            .ok_or_else(|| SceneError::UnknownEdge(key.to_string()))?;
        let target_attributes = graph
            .node_attributes(target_key)
            .ok_or_else(|| SceneError::UnknownNode(target_key.to_string()))?;

        let topology = EdgeTopology {
            directed: graph.is_directed(key),
            self_loop: source_key == target_key,
            parallel_count: self
                .parallel_edge_counts
                .get(&(source_key.to_string(), target_key.to_string()))
                .copied()
                .unwrap_or(1),
            parallel_seq: attributes.get(ATTR_PARALLEL_SEQ).and_then(Value::as_u64).unwrap_or(1)
                as u32,
        };

        let source_position = {
            let source = self
                .node_visuals
                .get(source_key)
                .ok_or_else(|| SceneError::NodeOutOfSync(source_key.to_string()))?;
            self.stage.position(source.gfx)
        };
        let target_position = {
            let target = self
                .node_visuals
                .get(target_key)
                .ok_or_else(|| SceneError::NodeOutOfSync(target_key.to_string()))?;
            self.stage.position(target.gfx)
        };

        // rim clearance comes from the target node's resolved base style
        let node_value = resolve_style_definitions(
            &[self.default_style.node.as_ref(), self.style.node.as_ref()],
            target_attributes,
        );
        let node_style = NodeStyle::from_value(node_value)?;

        let hovered = self.edge_visuals.get(key).map(|e| e.hovered).unwrap_or(false);
        let state = if hovered { self.hover_style.edge.as_ref() } else { None };
        let edge_value = resolve_style_definitions(
            &[self.default_style.edge.as_ref(), self.style.edge.as_ref(), state],
            attributes,
        );
        let edge_style = EdgeStyle::from_value(edge_value)?;

        let edge = self
            .edge_visuals
            .get_mut(key)
            .ok_or_else(|| SceneError::EdgeOutOfSync(key.to_string()))?;
        edge.update_position(
            &mut self.stage,
            source_position,
            target_position,
            &node_style,
            &edge_style,
            topology,
        );
        edge.update_style(&mut self.stage, &mut self.texture_cache, &edge_style, topology)
    }

    fn refresh_all_edges(&mut self, graph: &dyn GraphSource) -> Result<(), SceneError> {
        let keys: Vec<String> = self.edge_visuals.keys().cloned().collect();
        for key in keys {
            self.update_edge_style_by_key(graph, &key)?;
        }
        Ok(())
    }

    fn set_node_status(
        &mut self,
        graph: &dyn GraphSource,
        key: &str,
        status: Highlight,
    ) -> Result<(), SceneError> {
        let node = self
            .node_visuals
            .get_mut(key)
            .ok_or_else(|| SceneError::NodeOutOfSync(key.to_string()))?;
        let (already, other_active) = match status {
            Highlight::Hovered => (node.hovered, node.selected),
            Highlight::Selected => (node.selected, node.hovered),
        };
        if already {
            return Ok(());
        }
        match status {
            Highlight::Hovered => node.hovered = true,
            Highlight::Selected => node.selected = true,
        }
        self.update_node_style_by_key(graph, key)?;
        if !other_active {
            self.promote_node(key);
        }
        Ok(())
    }

    fn unset_node_status(
        &mut self,
        graph: &dyn GraphSource,
        key: &str,
        status: Highlight,
    ) -> Result<(), SceneError> {
        let node = self
            .node_visuals
            .get_mut(key)
            .ok_or_else(|| SceneError::NodeOutOfSync(key.to_string()))?;
        let demote = match status {
            Highlight::Hovered => {
                if !node.hovered {
                    return Ok(());
                }
                node.hovered = false;
                !node.selected
            }
            Highlight::Selected => {
                if !node.selected {
                    return Ok(());
                }
                // dropping selection also drops any lingering hover highlight
                node.selected = false;
                node.hovered = false;
                true
            }
        };
        self.update_node_style_by_key(graph, key)?;
        if demote {
            self.demote_node(key);
        }
        Ok(())
    }

    /// Swap the node's real containers into the front layers, leaving the
    /// placeholders at its index in the back layers. All four layers hold a
    /// node's entries at one shared index, which the swap preserves.
    fn promote_node(&mut self, key: &str) {
        let Some(node) = self.node_visuals.get(key) else {
            return;
        };
        let Some(index) = self.stage.child_index(self.layers.node, node.gfx) else {
            return;
        };
        let (gfx, label_gfx) = (node.gfx, node.label_gfx);
        let (placeholder, label_placeholder) = (node.placeholder_gfx, node.label_placeholder_gfx);
        self.stage.remove_child_at(self.layers.node, index);
        self.stage.remove_child_at(self.layers.node_label, index);
        self.stage.remove_child_at(self.layers.front_node, index);
        self.stage.remove_child_at(self.layers.front_node_label, index);
        self.stage.add_child_at(self.layers.node, placeholder, index);
        self.stage.add_child_at(self.layers.node_label, label_placeholder, index);
        self.stage.add_child_at(self.layers.front_node, gfx, index);
        self.stage.add_child_at(self.layers.front_node_label, label_gfx, index);
    }

    fn demote_node(&mut self, key: &str) {
        let Some(node) = self.node_visuals.get(key) else {
            return;
        };
        let Some(index) = self.stage.child_index(self.layers.front_node, node.gfx) else {
            return;
        };
        let (gfx, label_gfx) = (node.gfx, node.label_gfx);
        let (placeholder, label_placeholder) = (node.placeholder_gfx, node.label_placeholder_gfx);
        self.stage.remove_child_at(self.layers.node, index);
        self.stage.remove_child_at(self.layers.node_label, index);
        self.stage.remove_child_at(self.layers.front_node, index);
        self.stage.remove_child_at(self.layers.front_node_label, index);
        self.stage.add_child_at(self.layers.node, gfx, index);
        self.stage.add_child_at(self.layers.node_label, label_gfx, index);
        self.stage.add_child_at(self.layers.front_node, placeholder, index);
        self.stage.add_child_at(self.layers.front_node_label, label_placeholder, index);
    }

    fn hover_edge(&mut self, graph: &dyn GraphSource, key: &str) -> Result<(), SceneError> {
        let edge = self
            .edge_visuals
            .get_mut(key)
            .ok_or_else(|| SceneError::EdgeOutOfSync(key.to_string()))?;
        if edge.hovered {
            return Ok(());
        }
        edge.hovered = true;
        self.update_edge_style_by_key(graph, key)?;
        self.promote_edge(key);
        Ok(())
    }

    fn unhover_edge(&mut self, graph: &dyn GraphSource, key: &str) -> Result<(), SceneError> {
        let edge = self
            .edge_visuals
            .get_mut(key)
            .ok_or_else(|| SceneError::EdgeOutOfSync(key.to_string()))?;
        if !edge.hovered {
            return Ok(());
        }
        edge.hovered = false;
        self.update_edge_style_by_key(graph, key)?;
        self.demote_edge(key);
        Ok(())
    }

    fn promote_edge(&mut self, key: &str) {
        let Some(edge) = self.edge_visuals.get(key) else {
            return;
        };
        let Some(index) = self.stage.child_index(self.layers.edge, edge.gfx) else {
            return;
        };
        let (gfx, label_gfx) = (edge.gfx, edge.label_gfx);
        let (placeholder, label_placeholder) = (edge.placeholder_gfx, edge.label_placeholder_gfx);
        self.stage.remove_child_at(self.layers.edge, index);
        self.stage.remove_child_at(self.layers.edge_label, index);
        self.stage.remove_child_at(self.layers.front_edge, index);
        self.stage.remove_child_at(self.layers.front_edge_label, index);
        self.stage.add_child_at(self.layers.edge, placeholder, index);
        self.stage.add_child_at(self.layers.edge_label, label_placeholder, index);
        self.stage.add_child_at(self.layers.front_edge, gfx, index);
        self.stage.add_child_at(self.layers.front_edge_label, label_gfx, index);
    }

    fn demote_edge(&mut self, key: &str) {
        let Some(edge) = self.edge_visuals.get(key) else {
            return;
        };
        let Some(index) = self.stage.child_index(self.layers.front_edge, edge.gfx) else {
            return;
        };
        let (gfx, label_gfx) = (edge.gfx, edge.label_gfx);
        let (placeholder, label_placeholder) = (edge.placeholder_gfx, edge.label_placeholder_gfx);
        self.stage.remove_child_at(self.layers.edge, index);
        self.stage.remove_child_at(self.layers.edge_label, index);
        self.stage.remove_child_at(self.layers.front_edge, index);
        self.stage.remove_child_at(self.layers.front_edge_label, index);
        self.stage.add_child_at(self.layers.edge, gfx, index);
        self.stage.add_child_at(self.layers.edge_label, label_gfx, index);
        self.stage.add_child_at(self.layers.front_edge, placeholder, index);
        self.stage.add_child_at(self.layers.front_edge_label, label_placeholder, index);
    }

    /// Topmost interactive element under a screen point, scanning layers
    /// front to back. Labels are not interactive and never picked.
    fn pick(&self, screen: Point) -> Option<Pick> {
        let world = self.viewport.to_world(screen);
        for layer in [self.layers.front_node, self.layers.node, self.layers.front_edge, self.layers.edge]
        {
            if let Some(hit) = self.stage.hit_test_child(layer, world) {
                if let Some(pick) = self.display_index.get(&hit) {
                    return Some(pick.clone());
                }
            }
        }
        None
    }

    pub fn pointer_down(&mut self, input: PointerInput) {
        let pick = self.pick(input.position);
        match input.button {
            PointerButton::Left => match pick {
                Some(Pick::Node(key)) => {
                    self.emit(SceneEvent::NodeMousedown { key: key.clone(), pointer: input });
                    self.mousedown_node_key = Some(key);
                    self.mouse_down_position = Some(input.position);
                    // the node owns the pointer now, not the camera
                    self.viewport.pause = true;
                }
                Some(Pick::Edge(key)) => {
                    self.emit(SceneEvent::EdgeMousedown { key: key.clone(), pointer: input });
                    self.mousedown_edge_key = Some(key);
                }
                None => {
                    self.mouse_down_position = Some(input.position);
                }
            },
            PointerButton::Right => {
                if let Some(Pick::Node(key)) = pick {
                    self.mousedown_node_key = Some(key);
                }
            }
        }
    }

    pub fn pointer_move(
        &mut self,
        graph: &mut dyn GraphSource,
        input: PointerInput,
    ) -> Result<(), SceneError> {
        if let Some(drag_key) = self.mousedown_node_key.clone() {
            let world = self.viewport.to_world(input.position);
            if self.select_node_keys.iter().any(|k| k == &drag_key) {
                // drag the whole selection by the captured node's delta
                let attributes = graph
                    .node_attributes(&drag_key)
                    .ok_or_else(|| SceneError::UnknownNode(drag_key.clone()))?;
                let current = node_position(attributes, &drag_key)?;
                let delta = Point::new(world.x - current.x, world.y - current.y);
                for key in self.select_node_keys.clone() {
                    self.move_node_by(graph, &key, delta)?;
                }
            } else {
                self.move_node_to(graph, &drag_key, world)?;
            }
        }

        let pick = self.pick(input.position);
        let next_node = match &pick {
            Some(Pick::Node(key)) => Some(key.clone()),
            _ => None,
        };
        let next_edge = match &pick {
            Some(Pick::Edge(key)) => Some(key.clone()),
            _ => None,
        };

        if self.hovered_node_key != next_node {
            if let Some(previous) = self.hovered_node_key.take() {
                if self.mousedown_node_key.is_none() {
                    self.unset_node_status(graph, &previous, Highlight::Hovered)?;
                }
                self.emit(SceneEvent::NodeMouseout { key: previous, pointer: input });
            }
            if let Some(next) = &next_node {
                if self.mousedown_node_key.is_none() {
                    self.set_node_status(graph, next, Highlight::Hovered)?;
                }
                let bounds = self.node_screen_bounds(next);
                self.emit(SceneEvent::NodeMouseover { key: next.clone(), pointer: input, bounds });
            }
            self.hovered_node_key = next_node;
        }

        if self.hovered_edge_key != next_edge {
            if let Some(previous) = self.hovered_edge_key.take() {
                self.unhover_edge(graph, &previous)?;
                self.emit(SceneEvent::EdgeMouseout { key: previous, pointer: input });
            }
            if let Some(next) = &next_edge {
                self.hover_edge(graph, next)?;
                self.emit(SceneEvent::EdgeMouseover { key: next.clone(), pointer: input });
            }
            self.hovered_edge_key = next_edge;
        }

        match &pick {
            Some(Pick::Node(key)) => {
                self.emit(SceneEvent::NodeMousemove { key: key.clone(), pointer: input });
            }
            Some(Pick::Edge(key)) => {
                self.emit(SceneEvent::EdgeMousemove { key: key.clone(), pointer: input });
            }
            None => {}
        }
        Ok(())
    }

    pub fn pointer_up(
        &mut self,
        graph: &mut dyn GraphSource,
        input: PointerInput,
    ) -> Result<(), SceneError> {
        let pick = self.pick(input.position);
        match input.button {
            PointerButton::Right => {
                match &pick {
                    Some(Pick::Node(key)) => {
                        if self.mousedown_node_key.as_deref() == Some(key.as_str()) {
                            self.emit(SceneEvent::NodeRightClick { key: key.clone(), pointer: input });
                        }
                    }
                    Some(Pick::Edge(_)) => {}
                    None => self.emit(SceneEvent::RightClick { pointer: input }),
                }
                self.mousedown_node_key = None;
            }
            PointerButton::Left => {
                match &pick {
                    Some(Pick::Node(key)) => {
                        self.emit(SceneEvent::NodeMouseup { key: key.clone(), pointer: input });
                        let captured = self.mousedown_node_key.as_deref() == Some(key.as_str());
                        let small_move = self
                            .mouse_down_position
                            .map(|down| click_distance(down, input.position) <= CLICK_DRAG_TOLERANCE)
                            .unwrap_or(false);
                        if captured && small_move {
                            if input.has_modifier() {
                                if !self.select_node_keys.iter().any(|k| k == key) {
                                    self.select_node_keys.push(key.clone());
                                    self.set_node_status(graph, key, Highlight::Selected)?;
                                }
                            } else {
                                for selected in std::mem::take(&mut self.select_node_keys) {
                                    self.unset_node_status(graph, &selected, Highlight::Selected)?;
                                }
                                self.select_node_keys.push(key.clone());
                                self.set_node_status(graph, key, Highlight::Selected)?;
                            }
                            self.emit(SceneEvent::NodeClick { key: key.clone(), pointer: input });

                            let mut double_click = false;
                            if let Some(node) = self.node_visuals.get_mut(key.as_str()) {
                                let previous = node.previous_tap_ms;
                                node.previous_tap_ms = input.time_ms;
                                double_click = !input.has_modifier()
                                    && input.time_ms - previous < DOUBLE_CLICK_DELAY_MS;
                            }
                            if double_click {
                                self.emit(SceneEvent::NodeDoubleClick {
                                    key: key.clone(),
                                    pointer: input,
                                });
                            }
                        }
                    }
                    Some(Pick::Edge(key)) => {
                        self.emit(SceneEvent::EdgeMouseup { key: key.clone(), pointer: input });
                        if self.mousedown_edge_key.as_deref() == Some(key.as_str()) {
                            self.emit(SceneEvent::EdgeClick { key: key.clone(), pointer: input });
                        }
                    }
                    None => {
                        let small_move = self
                            .mouse_down_position
                            .map(|down| click_distance(down, input.position) <= CLICK_DRAG_TOLERANCE)
                            .unwrap_or(false);
                        if small_move {
                            for selected in std::mem::take(&mut self.select_node_keys) {
                                self.unset_node_status(graph, &selected, Highlight::Selected)?;
                            }
                        }
                    }
                }
                self.viewport.pause = false;
                self.mousedown_node_key = None;
                self.mousedown_edge_key = None;
                self.mouse_down_position = None;
            }
        }
        Ok(())
    }

    fn move_node_to(&mut self, graph: &mut dyn GraphSource, key: &str, point: Point) -> Result<(), SceneError> {
        graph.set_node_attribute(key, ATTR_X, Value::from(point.x));
        graph.set_node_attribute(key, ATTR_Y, Value::from(point.y));
        let node = self
            .node_visuals
            .get(key)
            .ok_or_else(|| SceneError::NodeOutOfSync(key.to_string()))?;
        node.update_position(&mut self.stage, point);
        // edges read endpoint positions from the visuals, so they go second
        for edge_key in graph.node_edges(key) {
            self.update_edge_style_by_key(graph, &edge_key)?;
        }
        Ok(())
    }

    fn move_node_by(&mut self, graph: &mut dyn GraphSource, key: &str, delta: Point) -> Result<(), SceneError> {
        let attributes = graph
            .node_attributes(key)
            .ok_or_else(|| SceneError::UnknownNode(key.to_string()))?;
        let current = node_position(attributes, key)?;
        self.move_node_to(graph, key, Point::new(current.x + delta.x, current.y + delta.y))
    }

    fn node_screen_bounds(&self, key: &str) -> Rect {
        let Some(node) = self.node_visuals.get(key) else {
            return Rect::default();
        };
        let Some(world_rect) = self.stage.bounds_in_parent(node.gfx) else {
            return Rect::default();
        };
        let a = self.viewport.to_screen(Point::new(world_rect.x, world_rect.y));
        let b = self.viewport.to_screen(Point::new(world_rect.right(), world_rect.bottom()));
        Rect::from_corners(a, b)
    }

    /// Run the culling and level-of-detail pass if the camera changed since
    /// the last frame. Call once per rendered frame.
    pub fn frame_end(&mut self) {
        if !self.viewport.dirty {
            return;
        }
        self.update_visibility();
        self.viewport.dirty = false;
    }

    fn update_visibility(&mut self) {
        let screen = self.viewport.screen_rect();
        for layer in self.layers.all() {
            let children: Vec<DisplayId> = self.stage.children(layer).to_vec();
            for child in children {
                let culled = match self.stage.bounds_in_parent(child) {
                    Some(world_rect) => {
                        let a = self.viewport.to_screen(Point::new(world_rect.x, world_rect.y));
                        let b = self
                            .viewport
                            .to_screen(Point::new(world_rect.right(), world_rect.bottom()));
                        !screen.intersects(&Rect::from_corners(a, b))
                    }
                    None => true,
                };
                self.stage.set_culled(child, culled);
            }
        }

        let step = self.zoom_step();
        trace!("visibility pass at zoom step {step}");
        for node in self.node_visuals.values() {
            node.update_visibility(&mut self.stage, step);
        }
        for edge in self.edge_visuals.values() {
            edge.update_visibility(&mut self.stage, step);
        }
    }

    /// Current level-of-detail step, 0 (furthest out) to 3.
    pub fn zoom_step(&self) -> u8 {
        let zoom = self.viewport.scale();
        ZOOM_STEPS
            .iter()
            .position(|max| zoom <= *max)
            .unwrap_or(ZOOM_STEPS.len() - 1) as u8
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport.resize(width, height, None, None);
        self.update_visibility();
        self.viewport.dirty = false;
    }

    /// Zoom in by a tenth of the smaller world dimension.
    pub fn zoom_in(&mut self) {
        let step = self.viewport.world_width().min(self.viewport.world_height()) / 10.0;
        self.viewport.zoom(-step);
    }

    pub fn zoom_out(&mut self) {
        let step = self.viewport.world_width().min(self.viewport.world_height()) / 10.0;
        self.viewport.zoom(step);
    }

    /// Size the world to the graph's bounding box plus padding, then fit and
    /// center the camera on it. Does nothing for a positionless graph.
    pub fn reset_view(&mut self, graph: &dyn GraphSource) {
        let mut bounds: Option<(f32, f32, f32, f32)> = None;
        graph.each_node(&mut |_, attributes| {
            let (Some(x), Some(y)) = (attr_f32(attributes, ATTR_X), attr_f32(attributes, ATTR_Y))
            else {
                return;
            };
            bounds = Some(match bounds {
                Some((min_x, min_y, max_x, max_y)) => {
                    (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
                }
                None => (x, y, x, y),
            });
        });
        let Some((min_x, min_y, max_x, max_y)) = bounds else {
            return;
        };

        let graph_width = max_x - min_x;
        let graph_height = max_y - min_y;
        let world_width = graph_width + WORLD_PADDING * 2.0;
        let world_height = graph_height + WORLD_PADDING * 2.0;

        self.viewport.resize(
            self.viewport.screen_width(),
            self.viewport.screen_height(),
            Some(world_width),
            Some(world_height),
        );
        self.viewport.set_zoom(1.0);
        self.viewport.set_center(Point::new(min_x + graph_width / 2.0, min_y + graph_height / 2.0));
        self.viewport.fit();
    }

    /// Tear the scene down: visuals dropped, every cached texture destroyed
    /// exactly once, display tree released. The scene must not be used
    /// afterwards. Callers stop feeding graph events before calling this.
    pub fn destroy(&mut self) {
        self.node_visuals.clear();
        self.edge_visuals.clear();
        self.display_index.clear();
        self.parallel_edge_counts.clear();
        self.select_node_keys.clear();
        self.hovered_node_key = None;
        self.hovered_edge_key = None;
        self.mousedown_node_key = None;
        self.mousedown_edge_key = None;
        self.mouse_down_position = None;
        self.events.clear();
        self.texture_cache.destroy();
        self.stage.clear();
        debug!("scene destroyed");
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.events.drain(..).collect()
    }

    fn emit(&mut self, event: SceneEvent) {
        self.events.push_back(event);
    }

    pub fn node_visual(&self, key: &str) -> Option<&NodeVisual> {
        self.node_visuals.get(key)
    }

    pub fn edge_visual(&self, key: &str) -> Option<&EdgeVisual> {
        self.edge_visuals.get(key)
    }

    pub fn node_count(&self) -> usize {
        self.node_visuals.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_visuals.len()
    }

    pub fn selected_node_keys(&self) -> &[String] {
        &self.select_node_keys
    }

    pub fn parallel_edge_count(&self, source: &str, target: &str) -> u32 {
        self.parallel_edge_counts
            .get(&(source.to_string(), target.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn layers(&self) -> &SceneLayers {
        &self.layers
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn texture_cache(&self) -> &TextureCache {
        &self.texture_cache
    }
}

/// Square-root taxicab distance used for the click-vs-drag decision, in
/// screen pixels.
fn click_distance(a: Point, b: Point) -> f32 {
    (b.x - a.x).abs().sqrt() + (b.y - a.y).abs().sqrt()
}
