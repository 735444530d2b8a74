//! Flowchart graph model: nodes, the pads they own, and the edges linking
//! pads together.
//!
//! Entities are shared as `Rc<dyn ...>` trait objects. Ownership runs one way
//! so that no reference cycles form: a node owns its pads, a pad owns the
//! edges registered on it, and everything pointing back (pad to parent,
//! edge to pads) is weak.

mod simple;

pub use simple::{SEdge, SNode, SPad};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// The side of its parent node a pad sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Right,
    Left,
    Top,
    Bottom,
}

/// Where a pad sits on its parent: a side plus a signed ratio in `[-1, 1]`
/// along that side, `0` being the middle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Positioning {
    pub side: Side,
    pub offset: f64,
}

impl Positioning {
    pub fn new(side: Side, offset: f64) -> Self {
        Self {
            side,
            offset: offset.clamp(-1.0, 1.0),
        }
    }
}

/// RGB colour with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const GREY: Rgb = Rgb {
        r: 0.5,
        g: 0.5,
        b: 0.5,
    };
}

/// A symbol in a flowchart.
pub trait Node {
    fn id(&self) -> &str;
    fn pads(&self) -> Vec<Rc<dyn Pad>>;
    /// Footprint as `(width, height)`, centred on the node's position.
    fn size(&self) -> (f64, f64);

    /// Text drawn in the node's header, if it has one.
    fn headline(&self) -> Option<String> {
        None
    }

    /// Name of an icon to draw alongside the node.
    fn icon(&self) -> Option<String> {
        None
    }

    /// The node's link policy, for nodes the user can link by dragging
    /// between pads.
    fn as_linkable(&self) -> Option<&dyn UserLinkable> {
        None
    }
}

/// A connection point on a node.
pub trait Pad {
    fn id(&self) -> &str;
    fn size(&self) -> (f64, f64);
    /// The owning node, or `None` once that node has been dropped.
    fn parent(&self) -> Option<Rc<dyn Node>>;
    fn positioning(&self) -> Positioning;

    /// Edges leaving this pad.
    fn start_edges(&self) -> Vec<Rc<dyn Edge>>;
    /// Edges arriving at this pad.
    fn end_edges(&self) -> Vec<Rc<dyn Edge>>;

    /// Registers `edge` as leaving this pad.
    fn connect_to(&self, edge: Rc<dyn Edge>) -> Result<()>;
    /// Registers `edge` as arriving at this pad.
    fn connect_from(&self, edge: Rc<dyn Edge>) -> Result<()>;
    /// Forgets every occurrence of `edge`, matched by id.
    fn disconnect(&self, edge: &dyn Edge);
    /// Disconnects every edge touching this pad, at both of its ends.
    fn disconnect_all(&self);

    fn color(&self) -> Option<Rgb> {
        None
    }
}

/// A directed link between two pads.
pub trait Edge {
    fn id(&self) -> &str;
    fn from(&self) -> Option<Rc<dyn Pad>>;
    fn to(&self) -> Option<Rc<dyn Pad>>;
    /// Removes this edge from both endpoint pads.
    fn disconnect(&self);
}

/// Nodes which the user may link to other nodes by dragging from one pad to
/// another.
pub trait UserLinkable {
    fn link_pads(
        &self,
        to_node: &Rc<dyn Node>,
        from_pad: &Rc<dyn Pad>,
        to_pad: &Rc<dyn Pad>,
    ) -> Result<Rc<dyn Edge>>;
}

impl fmt::Debug for dyn Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("id", &self.id()).finish()
    }
}

impl fmt::Debug for dyn Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pad").field("id", &self.id()).finish()
    }
}

impl fmt::Debug for dyn Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("id", &self.id())
            .field("from", &self.from().map(|p| p.id().to_string()))
            .field("to", &self.to().map(|p| p.id().to_string()))
            .finish()
    }
}

fn joins(edge: &dyn Edge, a: &str, b: &str) -> bool {
    let (Some(from), Some(to)) = (edge.from(), edge.to()) else {
        return false;
    };
    (from.id() == a && to.id() == b) || (from.id() == b && to.id() == a)
}

/// Finds an existing edge between `a` and `b`, in either direction.
pub fn find_link(a: &dyn Pad, b: &dyn Pad) -> Option<Rc<dyn Edge>> {
    a.start_edges()
        .into_iter()
        .chain(a.end_edges())
        .find(|edge| joins(edge.as_ref(), a.id(), b.id()))
}

/// Registers `edge` on both of its endpoints.
///
/// If the arriving side refuses the edge, the leaving side is rolled back so
/// a failed link never leaves a half-connected edge behind.
pub fn connect_edge(edge: &Rc<dyn Edge>) -> Result<()> {
    let from = edge.from().ok_or_else(|| Error::DanglingEdge {
        edge: edge.id().to_string(),
    })?;
    let to = edge.to().ok_or_else(|| Error::DanglingEdge {
        edge: edge.id().to_string(),
    })?;
    from.connect_to(Rc::clone(edge))?;
    if let Err(err) = to.connect_from(Rc::clone(edge)) {
        from.disconnect(edge.as_ref());
        return Err(err);
    }
    Ok(())
}

/// All distinct edges touching any pad of `node`, in pad order.
pub fn node_edges(node: &dyn Node) -> Vec<Rc<dyn Edge>> {
    let mut out: Vec<Rc<dyn Edge>> = Vec::new();
    for pad in node.pads() {
        for edge in pad.start_edges().into_iter().chain(pad.end_edges()) {
            if !out.iter().any(|e| e.id() == edge.id()) {
                out.push(edge);
            }
        }
    }
    out
}
