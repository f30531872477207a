// In-memory node collection for the editor canvas.
//
// What this does:
// - Keeps nodes in an indexed vector; NodeId is the index
// - Enforces unique string ids
// - Resolves edge endpoints from id -> NodeId
// - Exposes node rectangles to the resolver through Mapping

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::NodeCollection;
use crate::error::LayoutError;
use crate::layout::{LayoutConfig, Mapping, RectI, SizeI};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Serialize)]
pub struct CanvasNode {
    pub nid: NodeId,
    /// Unique identifier
    pub id: String,
    pub bounds: RectI,
}

/// Directed edge, `from` -> `to`.
#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

#[derive(Debug, Clone)]
pub struct Canvas {
    pub area: SizeI,
    pub nodes: Vec<CanvasNode>,
    pub edges: Vec<Edge>,
    index: HashMap<String, NodeId>,
}

/// Canvas snapshot as sent by the front end.
#[derive(Debug, Clone, Deserialize)]
pub struct CanvasInput {
    pub area: SizeI,
    #[serde(default)]
    pub nodes: Vec<NodeInput>,
    #[serde(default)]
    pub edges: Vec<EdgeInput>,
    #[serde(default)]
    pub config: LayoutConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeInput {
    pub id: String,
    pub bounds: RectI,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeInput {
    pub from: String,
    pub to: String,
}

impl Canvas {
    pub fn new(area: SizeI) -> Self {
        Self {
            area,
            nodes: Vec::new(),
            edges: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn from_input(input: &CanvasInput) -> Result<Self, LayoutError> {
        input.area.validate()?;

        let mut canvas = Canvas::new(input.area);
        for node in &input.nodes {
            canvas.add_node(&node.id, node.bounds)?;
        }
        for edge in &input.edges {
            let from = canvas.find(&edge.from).ok_or_else(|| LayoutError::UnknownNode(edge.from.clone()))?;
            let to = canvas.find(&edge.to).ok_or_else(|| LayoutError::UnknownNode(edge.to.clone()))?;
            canvas.add_edge(from, to);
        }
        Ok(canvas)
    }

    pub fn add_node(&mut self, id: &str, bounds: RectI) -> Result<NodeId, LayoutError> {
        bounds.validate()?;
        if self.index.contains_key(id) {
            return Err(LayoutError::DuplicateNode(id.to_string()));
        }
        let nid = NodeId(self.nodes.len());
        self.nodes.push(CanvasNode { nid, id: id.to_string(), bounds });
        self.index.insert(id.to_string(), nid);
        Ok(nid)
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.edges.push(Edge { from, to });
    }

    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.index.get(id).copied()
    }
}

impl Mapping for Canvas {
    type Node = NodeId;

    fn fetch(&self, node: &NodeId) -> RectI {
        self.nodes[node.0].bounds
    }

    fn assign(&mut self, node: &NodeId, rect: RectI) {
        self.nodes[node.0].bounds = rect;
    }
}

impl NodeCollection for Canvas {
    fn all_nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.nid).collect()
    }

    fn area_size(&self) -> SizeI {
        self.area
    }

    fn income_nodes(&self, node: &NodeId) -> Vec<NodeId> {
        self.edges.iter().filter(|e| e.to == *node).map(|e| e.from).collect()
    }

    fn outcome_nodes(&self, node: &NodeId) -> Vec<NodeId> {
        self.edges.iter().filter(|e| e.from == *node).map(|e| e.to).collect()
    }
}
