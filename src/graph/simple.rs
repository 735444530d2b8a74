use super::{Edge, Node, Pad, Positioning, Rgb, Side, UserLinkable, connect_edge, find_link};
use crate::error::{Error, Result};
use crate::ids::IdAllocator;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

pub const DEFAULT_NODE_SIZE: (f64, f64) = (200.0, 120.0);
pub const DEFAULT_PAD_SIZE: (f64, f64) = (25.0, 25.0);

/// A rectangular node with a headline, linkable by the user.
pub struct SNode {
    id: String,
    headline: RefCell<String>,
    icon: RefCell<Option<String>>,
    size: (f64, f64),
    pad_size: Cell<(f64, f64)>,
    pads: RefCell<Vec<Rc<SPad>>>,
    ids: Arc<IdAllocator>,
    this: Weak<SNode>,
}

impl SNode {
    pub fn new(ids: &Arc<IdAllocator>, headline: &str, tag: &str) -> Rc<Self> {
        let id = ids.alloc_node_id(tag);
        Self::build(ids, id, headline, DEFAULT_NODE_SIZE)
    }

    pub fn with_size(ids: &Arc<IdAllocator>, headline: &str, tag: &str, size: (f64, f64)) -> Rc<Self> {
        let id = ids.alloc_node_id(tag);
        Self::build(ids, id, headline, size)
    }

    /// Recreates a node under a known identifier, reserving it in `ids`.
    pub fn with_id(ids: &Arc<IdAllocator>, id: &str, headline: &str, size: (f64, f64)) -> Result<Rc<Self>> {
        ids.reserve(id)?;
        Ok(Self::build(ids, id.to_string(), headline, size))
    }

    fn build(ids: &Arc<IdAllocator>, id: String, headline: &str, size: (f64, f64)) -> Rc<Self> {
        Rc::new_cyclic(|this| SNode {
            id,
            headline: RefCell::new(headline.to_string()),
            icon: RefCell::new(None),
            size,
            pad_size: Cell::new(DEFAULT_PAD_SIZE),
            pads: RefCell::new(Vec::new()),
            ids: Arc::clone(ids),
            this: this.clone(),
        })
    }

    pub fn set_headline(&self, headline: &str) {
        *self.headline.borrow_mut() = headline.to_string();
    }

    pub fn set_icon(&self, icon: Option<String>) {
        *self.icon.borrow_mut() = icon;
    }

    /// Sets the footprint of pads appended from now on.
    pub fn set_pad_size(&self, size: (f64, f64)) {
        self.pad_size.set(size);
    }

    /// Adds a pad and returns it.
    pub fn append_pad(&self, tag: &str, side: Side, offset: f64) -> Rc<SPad> {
        let id = self.ids.alloc_pad_id(tag);
        self.push_pad(id, side, offset)
    }

    /// Adds a pad under a known identifier, reserving it in the allocator.
    pub fn append_pad_with_id(&self, id: &str, side: Side, offset: f64) -> Result<Rc<SPad>> {
        self.ids.reserve(id)?;
        Ok(self.push_pad(id.to_string(), side, offset))
    }

    fn push_pad(&self, id: String, side: Side, offset: f64) -> Rc<SPad> {
        let pad = SPad::build(id, self.this.clone(), Positioning::new(side, offset), self.pad_size.get());
        self.pads.borrow_mut().push(Rc::clone(&pad));
        pad
    }

    pub fn pad(&self, index: usize) -> Option<Rc<SPad>> {
        self.pads.borrow().get(index).cloned()
    }
}

impl Node for SNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn pads(&self) -> Vec<Rc<dyn Pad>> {
        self.pads
            .borrow()
            .iter()
            .map(|pad| Rc::clone(pad) as Rc<dyn Pad>)
            .collect()
    }

    fn size(&self) -> (f64, f64) {
        self.size
    }

    fn headline(&self) -> Option<String> {
        Some(self.headline.borrow().clone())
    }

    fn icon(&self) -> Option<String> {
        self.icon.borrow().clone()
    }

    fn as_linkable(&self) -> Option<&dyn UserLinkable> {
        Some(self)
    }
}

impl UserLinkable for SNode {
    fn link_pads(
        &self,
        _to_node: &Rc<dyn Node>,
        from_pad: &Rc<dyn Pad>,
        to_pad: &Rc<dyn Pad>,
    ) -> Result<Rc<dyn Edge>> {
        if find_link(from_pad.as_ref(), to_pad.as_ref()).is_some() {
            return Err(Error::AlreadyLinked {
                from: from_pad.id().to_string(),
                to: to_pad.id().to_string(),
            });
        }
        let edge: Rc<dyn Edge> = SEdge::new(&self.ids, "", from_pad, to_pad);
        connect_edge(&edge)?;
        Ok(edge)
    }
}

/// A circular pad.
pub struct SPad {
    id: String,
    positioning: Positioning,
    size: (f64, f64),
    parent: Weak<dyn Node>,
    start_edges: RefCell<Vec<Rc<dyn Edge>>>,
    end_edges: RefCell<Vec<Rc<dyn Edge>>>,
    color: RefCell<Rgb>,
}

impl SPad {
    /// Creates a pad for a custom node variant. `parent` is usually obtained
    /// through `Rc::new_cyclic` while the node itself is being built.
    pub fn new(
        ids: &IdAllocator,
        tag: &str,
        parent: Weak<dyn Node>,
        side: Side,
        offset: f64,
    ) -> Rc<Self> {
        Self::build(
            ids.alloc_pad_id(tag),
            parent,
            Positioning::new(side, offset),
            DEFAULT_PAD_SIZE,
        )
    }

    fn build(id: String, parent: Weak<dyn Node>, positioning: Positioning, size: (f64, f64)) -> Rc<Self> {
        Rc::new(SPad {
            id,
            positioning,
            size,
            parent,
            start_edges: RefCell::new(Vec::new()),
            end_edges: RefCell::new(Vec::new()),
            color: RefCell::new(Rgb::GREY),
        })
    }

    pub fn set_color(&self, color: Rgb) {
        *self.color.borrow_mut() = color;
    }

    fn is_self(&self, pad: Option<Rc<dyn Pad>>) -> bool {
        pad.is_some_and(|pad| pad.id() == self.id)
    }
}

impl Pad for SPad {
    fn id(&self) -> &str {
        &self.id
    }

    fn size(&self) -> (f64, f64) {
        self.size
    }

    fn parent(&self) -> Option<Rc<dyn Node>> {
        self.parent.upgrade()
    }

    fn positioning(&self) -> Positioning {
        self.positioning
    }

    fn start_edges(&self) -> Vec<Rc<dyn Edge>> {
        self.start_edges.borrow().clone()
    }

    fn end_edges(&self) -> Vec<Rc<dyn Edge>> {
        self.end_edges.borrow().clone()
    }

    fn connect_to(&self, edge: Rc<dyn Edge>) -> Result<()> {
        if self.is_self(edge.to()) {
            return Err(Error::SelfLink {
                pad: self.id.clone(),
            });
        }
        self.start_edges.borrow_mut().push(edge);
        Ok(())
    }

    fn connect_from(&self, edge: Rc<dyn Edge>) -> Result<()> {
        if self.is_self(edge.from()) {
            return Err(Error::SelfLink {
                pad: self.id.clone(),
            });
        }
        self.end_edges.borrow_mut().push(edge);
        Ok(())
    }

    fn disconnect(&self, edge: &dyn Edge) {
        let id = edge.id();
        self.start_edges.borrow_mut().retain(|e| e.id() != id);
        self.end_edges.borrow_mut().retain(|e| e.id() != id);
    }

    fn disconnect_all(&self) {
        // Edge::disconnect calls back into this pad, so no borrow may be held.
        let edges: Vec<Rc<dyn Edge>> = self
            .start_edges
            .borrow()
            .iter()
            .chain(self.end_edges.borrow().iter())
            .cloned()
            .collect();
        for edge in edges {
            edge.disconnect();
        }
        self.start_edges.borrow_mut().clear();
        self.end_edges.borrow_mut().clear();
    }

    fn color(&self) -> Option<Rgb> {
        Some(*self.color.borrow())
    }
}

/// A straight edge between two pads.
pub struct SEdge {
    id: String,
    from: RefCell<Option<Weak<dyn Pad>>>,
    to: RefCell<Option<Weak<dyn Pad>>>,
}

impl SEdge {
    pub fn new(ids: &IdAllocator, tag: &str, from: &Rc<dyn Pad>, to: &Rc<dyn Pad>) -> Rc<Self> {
        Self::build(ids.alloc_edge_id(tag), from, to)
    }

    /// Recreates an edge under a known identifier, reserving it in `ids`.
    pub fn with_id(ids: &IdAllocator, id: &str, from: &Rc<dyn Pad>, to: &Rc<dyn Pad>) -> Result<Rc<Self>> {
        ids.reserve(id)?;
        Ok(Self::build(id.to_string(), from, to))
    }

    fn build(id: String, from: &Rc<dyn Pad>, to: &Rc<dyn Pad>) -> Rc<Self> {
        Rc::new(SEdge {
            id,
            from: RefCell::new(Some(Rc::downgrade(from))),
            to: RefCell::new(Some(Rc::downgrade(to))),
        })
    }
}

impl Edge for SEdge {
    fn id(&self) -> &str {
        &self.id
    }

    fn from(&self) -> Option<Rc<dyn Pad>> {
        self.from.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn to(&self) -> Option<Rc<dyn Pad>> {
        self.to.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn disconnect(&self) {
        if let Some(to) = self.to() {
            to.disconnect(self);
        }
        if let Some(from) = self.from() {
            from.disconnect(self);
        }
        self.to.borrow_mut().take();
        self.from.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node_edges;

    fn dyn_pad(pad: &Rc<SPad>) -> Rc<dyn Pad> {
        Rc::clone(pad) as Rc<dyn Pad>
    }

    fn dyn_node(node: &Rc<SNode>) -> Rc<dyn Node> {
        Rc::clone(node) as Rc<dyn Node>
    }

    #[test]
    fn pads_know_their_parent() {
        let ids = Arc::new(IdAllocator::new());
        let node = SNode::new(&ids, "Start", "");
        let pad = node.append_pad("out", Side::Right, 0.0);
        assert_eq!(node.id(), "node-0");
        assert_eq!(pad.id(), "pad-out-0");
        assert_eq!(pad.parent().map(|p| p.id().to_string()), Some("node-0".to_string()));
        assert_eq!(node.pads().len(), 1);
        assert_eq!(node.headline().as_deref(), Some("Start"));
    }

    #[test]
    fn offsets_are_clamped() {
        let ids = Arc::new(IdAllocator::new());
        let node = SNode::new(&ids, "", "");
        let pad = node.append_pad("", Side::Top, 3.0);
        assert_eq!(pad.positioning().offset, 1.0);
    }

    #[test]
    fn connect_to_rejects_self_link_without_mutation() {
        let ids = Arc::new(IdAllocator::new());
        let node = SNode::new(&ids, "", "");
        let pad = dyn_pad(&node.append_pad("", Side::Right, 0.0));
        let edge: Rc<dyn Edge> = SEdge::new(&ids, "", &pad, &pad);

        assert_eq!(
            pad.connect_to(Rc::clone(&edge)),
            Err(Error::SelfLink {
                pad: pad.id().to_string()
            })
        );
        assert_eq!(
            pad.connect_from(edge),
            Err(Error::SelfLink {
                pad: pad.id().to_string()
            })
        );
        assert!(pad.start_edges().is_empty());
        assert!(pad.end_edges().is_empty());
    }

    #[test]
    fn link_pads_connects_both_sides() {
        let ids = Arc::new(IdAllocator::new());
        let a = SNode::new(&ids, "A", "");
        let b = SNode::new(&ids, "B", "");
        let out = dyn_pad(&a.append_pad("", Side::Right, 0.0));
        let inp = dyn_pad(&b.append_pad("", Side::Left, 0.0));

        let edge = a
            .link_pads(&dyn_node(&b), &out, &inp)
            .expect("link should succeed");
        assert_eq!(edge.from().map(|p| p.id().to_string()), Some(out.id().to_string()));
        assert_eq!(edge.to().map(|p| p.id().to_string()), Some(inp.id().to_string()));
        assert_eq!(out.start_edges().len(), 1);
        assert_eq!(inp.end_edges().len(), 1);
        assert!(out.end_edges().is_empty());
    }

    #[test]
    fn duplicate_links_are_rejected_in_both_directions() {
        let ids = Arc::new(IdAllocator::new());
        let a = SNode::new(&ids, "A", "");
        let b = SNode::new(&ids, "B", "");
        let pa = dyn_pad(&a.append_pad("", Side::Right, 0.0));
        let pb = dyn_pad(&b.append_pad("", Side::Left, 0.0));

        a.link_pads(&dyn_node(&b), &pa, &pb).expect("first link");
        let again = a.link_pads(&dyn_node(&b), &pa, &pb);
        assert!(matches!(again, Err(Error::AlreadyLinked { .. })));
        let reversed = b.link_pads(&dyn_node(&a), &pb, &pa);
        assert!(matches!(reversed, Err(Error::AlreadyLinked { .. })));
        assert_eq!(pa.start_edges().len(), 1);
        assert!(pa.end_edges().is_empty());
    }

    #[test]
    fn self_link_through_link_pads_leaves_no_half_edge() {
        let ids = Arc::new(IdAllocator::new());
        let a = SNode::new(&ids, "A", "");
        let pad = dyn_pad(&a.append_pad("", Side::Right, 0.0));
        let result = a.link_pads(&dyn_node(&a), &pad, &pad);
        assert!(matches!(result, Err(Error::SelfLink { .. })));
        assert!(pad.start_edges().is_empty());
        assert!(pad.end_edges().is_empty());
    }

    #[test]
    fn edge_disconnect_clears_both_endpoints() {
        let ids = Arc::new(IdAllocator::new());
        let a = SNode::new(&ids, "A", "");
        let b = SNode::new(&ids, "B", "");
        let pa = dyn_pad(&a.append_pad("", Side::Right, 0.0));
        let pb = dyn_pad(&b.append_pad("", Side::Left, 0.0));
        let edge = a.link_pads(&dyn_node(&b), &pa, &pb).expect("link");

        edge.disconnect();
        assert!(pa.start_edges().is_empty());
        assert!(pb.end_edges().is_empty());
        assert!(edge.from().is_none());
        assert!(edge.to().is_none());
    }

    #[test]
    fn disconnect_all_tears_down_every_edge() {
        let ids = Arc::new(IdAllocator::new());
        let hub = SNode::new(&ids, "hub", "");
        let hub_pad = dyn_pad(&hub.append_pad("", Side::Bottom, 0.0));
        let mut spokes = Vec::new();
        for i in 0..3 {
            let spoke = SNode::new(&ids, &format!("spoke {i}"), "");
            let pad = dyn_pad(&spoke.append_pad("", Side::Top, 0.0));
            if i % 2 == 0 {
                hub.link_pads(&dyn_node(&spoke), &hub_pad, &pad).expect("out link");
            } else {
                spoke.link_pads(&dyn_node(&hub), &pad, &hub_pad).expect("in link");
            }
            spokes.push((spoke, pad));
        }
        assert_eq!(node_edges(hub.as_ref()).len(), 3);

        hub_pad.disconnect_all();
        assert!(hub_pad.start_edges().is_empty());
        assert!(hub_pad.end_edges().is_empty());
        for (_, pad) in &spokes {
            assert!(pad.start_edges().is_empty());
            assert!(pad.end_edges().is_empty());
        }
    }

    #[test]
    fn pads_outlive_dropped_parent_as_detached() {
        let ids = Arc::new(IdAllocator::new());
        let pad = {
            let node = SNode::new(&ids, "", "");
            node.append_pad("", Side::Left, 0.0)
        };
        assert!(pad.parent().is_none());
    }
}
