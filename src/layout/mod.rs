//! Position state for a flowchart and the traversal that turns it into a
//! display list.
//!
//! The [`Layout`] is the only owner of coordinates: nodes and pads never
//! store where they are. Node positions are set explicitly, pad positions
//! are always derived from the parent node's position and size.

mod display_list;

pub use display_list::{DisplayList, DrawCommand, DrawObject};

use crate::error::{Error, Result};
use crate::graph::{Edge, Node, Pad, Positioning, Side, node_edges};
use crate::hit::Point;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use tracing::debug;

/// Position of a node's centre in flowchart coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeLayout {
    pub x: f64,
    pub y: f64,
}

impl NodeLayout {
    pub fn pos(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Position of a pad's centre in flowchart coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PadLayout {
    pub x: f64,
    pub y: f64,
}

impl PadLayout {
    pub fn pos(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Where a pad with `positioning` sits on a parent centred at `parent`
/// with footprint `(w, h)`.
pub fn pad_position(parent: Point, (w, h): (f64, f64), positioning: Positioning) -> PadLayout {
    let o = positioning.offset;
    let (x, y) = match positioning.side {
        Side::Right => (parent.x + w / 2.0, parent.y + h * o / 2.0),
        Side::Left => (parent.x - w / 2.0, parent.y + h * o / 2.0),
        Side::Bottom => (parent.x + w * o / 2.0, parent.y + h / 2.0),
        Side::Top => (parent.x + w * o / 2.0, parent.y - h / 2.0),
    };
    PadLayout { x, y }
}

/// Keeps track of how the elements of a flowchart are positioned, and
/// which node seeds the draw-order traversal.
#[derive(Default)]
pub struct Layout {
    root: Option<Rc<dyn Node>>,
    nodes: HashMap<String, NodeLayout>,
    pads: HashMap<String, PadLayout>,
    // Every node ever handed to a mutating operation, connected or not.
    all_nodes: BTreeMap<String, Rc<dyn Node>>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: Rc<dyn Node>) -> Self {
        let mut layout = Self::new();
        layout.set_root(root);
        layout
    }

    pub fn root(&self) -> Option<&Rc<dyn Node>> {
        self.root.as_ref()
    }

    pub fn set_root(&mut self, root: Rc<dyn Node>) {
        self.register(&root);
        self.root = Some(root);
    }

    /// Makes the already known node `node_id` the root.
    pub fn set_root_id(&mut self, node_id: &str) -> Result<()> {
        let node = self
            .all_nodes
            .get(node_id)
            .cloned()
            .ok_or_else(|| Error::UnknownNode {
                node: node_id.to_string(),
            })?;
        self.root = Some(node);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.all_nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_nodes.is_empty()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.all_nodes.contains_key(node_id)
    }

    /// Looks up a known node by id.
    pub fn get(&self, node_id: &str) -> Option<&Rc<dyn Node>> {
        self.all_nodes.get(node_id)
    }

    /// Every known node, ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = &Rc<dyn Node>> {
        self.all_nodes.values()
    }

    /// Every distinct edge touching a known node.
    pub fn edges(&self) -> Vec<Rc<dyn Edge>> {
        let mut out: Vec<Rc<dyn Edge>> = Vec::new();
        for node in self.all_nodes.values() {
            for edge in node_edges(node.as_ref()) {
                if !out.iter().any(|e| e.id() == edge.id()) {
                    out.push(edge);
                }
            }
        }
        out
    }

    fn register(&mut self, node: &Rc<dyn Node>) {
        self.all_nodes
            .entry(node.id().to_string())
            .or_insert_with(|| Rc::clone(node));
    }

    /// Places `node` and recomputes the position of every pad it owns.
    pub fn move_node(&mut self, node: &Rc<dyn Node>, x: f64, y: f64) {
        self.register(node);
        let layout = NodeLayout { x, y };
        self.nodes.insert(node.id().to_string(), layout);

        let size = node.size();
        for pad in node.pads() {
            self.pads.insert(
                pad.id().to_string(),
                pad_position(layout.pos(), size, pad.positioning()),
            );
        }
    }

    /// Places `node`, making it the root if the layout had none.
    pub fn add_node(&mut self, node: &Rc<dyn Node>, x: f64, y: f64) {
        self.move_node(node, x, y);
        if self.root.is_none() {
            self.root = Some(Rc::clone(node));
        }
    }

    /// The node's position, created at the origin if it was never placed.
    pub fn node(&mut self, node: &Rc<dyn Node>) -> NodeLayout {
        self.register(node);
        *self.nodes.entry(node.id().to_string()).or_default()
    }

    /// The node's position without registering anything.
    pub fn node_position(&self, node_id: &str) -> Option<NodeLayout> {
        self.nodes.get(node_id).copied()
    }

    /// The pad's position, derived from its parent on first use.
    pub fn pad(&mut self, pad: &Rc<dyn Pad>) -> Result<PadLayout> {
        if let Some(layout) = self.pads.get(pad.id()) {
            return Ok(*layout);
        }
        let parent = pad.parent().ok_or_else(|| Error::DetachedPad {
            pad: pad.id().to_string(),
        })?;
        let parent_layout = self.node(&parent);
        let layout = pad_position(parent_layout.pos(), parent.size(), pad.positioning());
        self.pads.insert(pad.id().to_string(), layout);
        Ok(layout)
    }

    /// Links `from` to `to` using the link policy of `from`'s node.
    pub fn link_pads(&mut self, from: &Rc<dyn Pad>, to: &Rc<dyn Pad>) -> Result<Rc<dyn Edge>> {
        let from_node = from.parent().ok_or_else(|| Error::DetachedPad {
            pad: from.id().to_string(),
        })?;
        let to_node = to.parent().ok_or_else(|| Error::DetachedPad {
            pad: to.id().to_string(),
        })?;
        let linkable = from_node.as_linkable().ok_or_else(|| Error::NotLinkable {
            node: from_node.id().to_string(),
        })?;
        let edge = linkable.link_pads(&to_node, from, to)?;

        self.register(&from_node);
        self.register(&to_node);
        Ok(edge)
    }

    /// Removes `node` and every edge touching its pads.
    ///
    /// Deleting the root elects a new one, preferring the old root's
    /// neighbours.
    pub fn delete_node(&mut self, node: &Rc<dyn Node>) {
        let id = node.id();
        self.all_nodes.remove(id);
        if self.root.as_ref().is_some_and(|root| root.id() == id) {
            self.root = None;
            self.elect_root(Some(node));
        }

        self.nodes.remove(id);
        for pad in node.pads() {
            self.pads.remove(pad.id());
            pad.disconnect_all();
        }
        debug!(node = id, root = ?self.root.as_ref().map(|r| r.id().to_string()), "deleted node");
    }

    /// Picks a new root. Neighbours of `old` reached through its outgoing
    /// edges win, then those reached through incoming edges, then any known
    /// node.
    fn elect_root(&mut self, old: Option<&Rc<dyn Node>>) {
        let neighbour = old.and_then(|old| {
            let pads = old.pads();
            let outgoing = pads
                .iter()
                .flat_map(|pad| pad.start_edges())
                .filter_map(|edge| edge.to());
            let incoming = pads
                .iter()
                .flat_map(|pad| pad.end_edges())
                .filter_map(|edge| edge.from());
            outgoing
                .chain(incoming)
                .filter_map(|pad| pad.parent())
                .find(|parent| parent.id() != old.id())
        });

        match neighbour {
            Some(node) => self.set_root(node),
            None => self.root = self.all_nodes.values().next().cloned(),
        }
        debug!(root = ?self.root.as_ref().map(|r| r.id().to_string()), "elected root");
    }

    /// Snapshot of every known node and its position.
    pub fn dump(&self) -> Vec<(Rc<dyn Node>, NodeLayout)> {
        self.all_nodes
            .values()
            .map(|node| {
                let layout = self.nodes.get(node.id()).copied().unwrap_or_default();
                (Rc::clone(node), layout)
            })
            .collect()
    }
}
