use super::{Layout, NodeLayout, PadLayout};
use crate::error::{Error, Result};
use crate::graph::{Edge, Node, Pad};
use crate::hit::Point;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::debug;

/// The kind of entity a [`DrawCommand`] paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawObject {
    Node,
    Pad,
    Edge,
}

/// One entry of a display list, carrying the entity and its position at the
/// time the list was built.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    Node {
        node: Rc<dyn Node>,
        layout: NodeLayout,
    },
    Pad {
        pad: Rc<dyn Pad>,
        layout: PadLayout,
    },
    Edge {
        from: Rc<dyn Pad>,
        to: Rc<dyn Pad>,
        from_layout: PadLayout,
        to_layout: PadLayout,
        edge: Rc<dyn Edge>,
    },
}

impl DrawCommand {
    pub fn object(&self) -> DrawObject {
        match self {
            Self::Node { .. } => DrawObject::Node,
            Self::Pad { .. } => DrawObject::Pad,
            Self::Edge { .. } => DrawObject::Edge,
        }
    }

    /// Identifier of the entity this command draws.
    pub fn id(&self) -> &str {
        match self {
            Self::Node { node, .. } => node.id(),
            Self::Pad { pad, .. } => pad.id(),
            Self::Edge { edge, .. } => edge.id(),
        }
    }
}

/// Draw commands in paint order plus the bounding box of the geometry they
/// cover. Edges always come after both of their endpoint nodes.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    pub min: Point,
    pub max: Point,
    pub commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn count(&self, object: DrawObject) -> usize {
        self.commands.iter().filter(|c| c.object() == object).count()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[derive(Default)]
struct Bounds(Option<(Point, Point)>);

impl Bounds {
    fn update(&mut self, centre: Point, (w, h): (f64, f64)) {
        let lo = Point::new(centre.x - w / 2.0, centre.y - h / 2.0);
        let hi = Point::new(centre.x + w / 2.0, centre.y + h / 2.0);
        self.0 = Some(match self.0 {
            None => (lo, hi),
            Some((min, max)) => (
                Point::new(min.x.min(lo.x), min.y.min(lo.y)),
                Point::new(max.x.max(hi.x), max.y.max(hi.y)),
            ),
        });
    }

    fn finish(self) -> (Point, Point) {
        self.0.unwrap_or_default()
    }
}

/// Visit state for a single traversal. Built fresh on every call so that
/// mutations between calls are always seen.
#[derive(Default)]
struct Visit {
    nodes: HashSet<String>,
    pads: HashSet<String>,
    edges: HashSet<String>,
    bounds: Bounds,
    out: Vec<DrawCommand>,
}

impl Layout {
    /// Walks the graph from the root and returns what to draw, in order.
    ///
    /// Every known node is included, even ones the root cannot reach. An
    /// empty layout yields an empty list.
    pub fn display_list(&mut self) -> Result<DisplayList> {
        if self.root.is_none() {
            self.elect_root(None);
        }
        let Some(root) = self.root.clone() else {
            return Ok(DisplayList::default());
        };

        let mut visit = Visit::default();
        self.visit_node(&root, &mut visit)?;

        let known: Vec<Rc<dyn Node>> = self.all_nodes.values().cloned().collect();
        for node in &known {
            self.visit_node(node, &mut visit)?;
        }

        let (min, max) = visit.bounds.finish();
        debug!(
            commands = visit.out.len(),
            nodes = visit.nodes.len(),
            edges = visit.edges.len(),
            "built display list"
        );
        Ok(DisplayList {
            min,
            max,
            commands: visit.out,
        })
    }

    fn visit_node(&mut self, node: &Rc<dyn Node>, visit: &mut Visit) -> Result<()> {
        if !visit.nodes.insert(node.id().to_string()) {
            return Ok(());
        }
        let layout = self.node(node);
        visit.bounds.update(layout.pos(), node.size());
        visit.out.push(DrawCommand::Node {
            node: Rc::clone(node),
            layout,
        });

        for pad in node.pads() {
            self.visit_pad(&pad, visit)?;
        }
        Ok(())
    }

    fn visit_pad(&mut self, pad: &Rc<dyn Pad>, visit: &mut Visit) -> Result<()> {
        if !visit.pads.insert(pad.id().to_string()) {
            return Ok(());
        }
        let layout = self.pad(pad)?;
        visit.bounds.update(layout.pos(), pad.size());
        visit.out.push(DrawCommand::Pad {
            pad: Rc::clone(pad),
            layout,
        });

        for edge in pad.start_edges().into_iter().chain(pad.end_edges()) {
            self.visit_edge(&edge, visit)?;
        }
        Ok(())
    }

    fn visit_edge(&mut self, edge: &Rc<dyn Edge>, visit: &mut Visit) -> Result<()> {
        if !visit.edges.insert(edge.id().to_string()) {
            return Ok(());
        }
        let dangling = || Error::DanglingEdge {
            edge: edge.id().to_string(),
        };
        let to = edge.to().ok_or_else(dangling)?;
        let from = edge.from().ok_or_else(dangling)?;
        let to_layout = self.pad(&to)?;
        let from_layout = self.pad(&from)?;

        // Both endpoints go out before the edge so it paints on top.
        for pad in [&to, &from] {
            let parent = pad.parent().ok_or_else(|| Error::DetachedPad {
                pad: pad.id().to_string(),
            })?;
            self.visit_node(&parent, visit)?;
        }

        visit.out.push(DrawCommand::Edge {
            from,
            to,
            from_layout,
            to_layout,
            edge: Rc::clone(edge),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{SNode, Side};
    use crate::ids::IdAllocator;
    use std::sync::Arc;

    fn as_node(node: &Rc<SNode>) -> Rc<dyn Node> {
        Rc::clone(node) as Rc<dyn Node>
    }

    fn as_pad(pad: &Rc<crate::graph::SPad>) -> Rc<dyn Pad> {
        Rc::clone(pad) as Rc<dyn Pad>
    }

    fn kinds(list: &DisplayList) -> Vec<DrawObject> {
        list.commands.iter().map(DrawCommand::object).collect()
    }

    #[test]
    fn empty_layout_gives_empty_list() {
        let mut layout = Layout::new();
        let list = layout.display_list().expect("empty layout");
        assert!(list.is_empty());
        assert_eq!(list.min, Point::default());
        assert_eq!(list.max, Point::default());
    }

    #[test]
    fn single_node_with_pad() {
        let ids = Arc::new(IdAllocator::new());
        let node = SNode::new(&ids, "start", "");
        node.append_pad("out", Side::Right, 0.0);
        let mut layout = Layout::with_root(as_node(&node));

        let list = layout.display_list().expect("display list");
        assert_eq!(kinds(&list), vec![DrawObject::Node, DrawObject::Pad]);
        assert_eq!(list.min, Point::new(-100.0, -60.0));
        // Bounds cover every node and pad by half its size. The pad sits on
        // the right edge and sticks out by 12.5, so max.x is not 100.
        assert_eq!(list.max, Point::new(112.5, 60.0));
        match &list.commands[1] {
            DrawCommand::Pad { layout, .. } => {
                assert_eq!(*layout, PadLayout { x: 100.0, y: 0.0 });
            }
            other => panic!("expected a pad command, got {other:?}"),
        }
    }

    #[test]
    fn cycles_are_visited_once() {
        let ids = Arc::new(IdAllocator::new());
        let a = SNode::new(&ids, "A", "");
        let b = SNode::new(&ids, "B", "");
        let a_out = as_pad(&a.append_pad("", Side::Right, 0.0));
        let a_in = as_pad(&a.append_pad("", Side::Left, 0.0));
        let b_out = as_pad(&b.append_pad("", Side::Right, 0.0));
        let b_in = as_pad(&b.append_pad("", Side::Left, 0.0));

        let mut layout = Layout::with_root(as_node(&a));
        layout.move_node(&as_node(&b), 400.0, 0.0);
        layout.link_pads(&a_out, &b_in).expect("A to B");
        layout.link_pads(&b_out, &a_in).expect("B to A");

        let list = layout.display_list().expect("display list");
        assert_eq!(list.count(DrawObject::Node), 2);
        assert_eq!(list.count(DrawObject::Pad), 4);
        assert_eq!(list.count(DrawObject::Edge), 2);

        let mut ids_seen: Vec<&str> = list.commands.iter().map(DrawCommand::id).collect();
        ids_seen.sort_unstable();
        ids_seen.dedup();
        assert_eq!(ids_seen.len(), list.commands.len());
    }

    #[test]
    fn edges_follow_both_endpoint_nodes() {
        let ids = Arc::new(IdAllocator::new());
        let a = SNode::new(&ids, "A", "");
        let b = SNode::new(&ids, "B", "");
        let c = SNode::new(&ids, "C", "");
        let a_out = as_pad(&a.append_pad("", Side::Right, 0.0));
        let b_in = as_pad(&b.append_pad("", Side::Left, 0.0));
        let b_out = as_pad(&b.append_pad("", Side::Right, 0.0));
        let c_in = as_pad(&c.append_pad("", Side::Left, 0.0));

        let mut layout = Layout::with_root(as_node(&a));
        layout.link_pads(&a_out, &b_in).expect("A to B");
        layout.link_pads(&b_out, &c_in).expect("B to C");

        let list = layout.display_list().expect("display list");
        let position = |id: &str| {
            list.commands
                .iter()
                .position(|c| c.id() == id)
                .expect("command present")
        };
        for cmd in &list.commands {
            if let DrawCommand::Edge { from, to, .. } = cmd {
                let edge_at = position(cmd.id());
                for pad in [from, to] {
                    let parent = pad.parent().expect("attached");
                    assert!(position(parent.id()) < edge_at);
                }
            }
        }
        assert_eq!(list.commands[0].id(), a.id());
    }

    #[test]
    fn orphans_are_included_once() {
        let ids = Arc::new(IdAllocator::new());
        let root = SNode::new(&ids, "root", "");
        let orphan = SNode::new(&ids, "orphan", "");
        orphan.append_pad("", Side::Top, 0.0);

        let mut layout = Layout::with_root(as_node(&root));
        layout.node(&as_node(&orphan));

        let list = layout.display_list().expect("display list");
        assert_eq!(list.count(DrawObject::Node), 2);
        assert_eq!(
            list.commands.iter().filter(|c| c.id() == orphan.id()).count(),
            1
        );
    }

    #[test]
    fn deleting_root_keeps_the_rest_drawable() {
        let ids = Arc::new(IdAllocator::new());
        let r = SNode::new(&ids, "R", "");
        let a = SNode::new(&ids, "A", "");
        let lone = SNode::new(&ids, "lone", "");
        let r_out = as_pad(&r.append_pad("", Side::Right, 0.0));
        let a_in = as_pad(&a.append_pad("", Side::Left, 0.0));

        let mut layout = Layout::with_root(as_node(&r));
        layout.link_pads(&r_out, &a_in).expect("R to A");
        layout.node(&as_node(&lone));
        layout.delete_node(&as_node(&r));

        let list = layout.display_list().expect("display list");
        assert_eq!(list.count(DrawObject::Node), 2);
        assert_eq!(list.count(DrawObject::Edge), 0);
        assert_eq!(list.commands[0].id(), a.id());
        assert!(list.commands.iter().all(|c| c.id() != r.id()));
    }

    #[test]
    fn missing_root_is_elected_on_demand() {
        let ids = Arc::new(IdAllocator::new());
        let node = SNode::new(&ids, "only", "");
        let mut layout = Layout::new();
        layout.node(&as_node(&node));
        assert!(layout.root().is_none());

        let list = layout.display_list().expect("display list");
        assert_eq!(list.count(DrawObject::Node), 1);
        assert_eq!(layout.root().map(|r| r.id().to_string()), Some(node.id().to_string()));
    }

    #[test]
    fn each_call_sees_fresh_state() {
        let ids = Arc::new(IdAllocator::new());
        let a = SNode::new(&ids, "A", "");
        let b = SNode::new(&ids, "B", "");
        let a_out = as_pad(&a.append_pad("", Side::Right, 0.0));
        let b_in = as_pad(&b.append_pad("", Side::Left, 0.0));

        let mut layout = Layout::with_root(as_node(&a));
        let first = layout.display_list().expect("first");
        assert_eq!(first.count(DrawObject::Node), 1);

        layout.link_pads(&a_out, &b_in).expect("A to B");
        layout.move_node(&as_node(&b), 300.0, 0.0);
        let second = layout.display_list().expect("second");
        assert_eq!(second.count(DrawObject::Node), 2);
        assert_eq!(second.count(DrawObject::Edge), 1);
        assert_eq!(second.max.x, 400.0);

        let third = layout.display_list().expect("third");
        assert_eq!(third.commands.len(), second.commands.len());
    }

    #[test]
    fn edge_commands_carry_pad_positions() {
        let ids = Arc::new(IdAllocator::new());
        let a = SNode::new(&ids, "A", "");
        let b = SNode::new(&ids, "B", "");
        let a_out = as_pad(&a.append_pad("", Side::Right, 0.0));
        let b_in = as_pad(&b.append_pad("", Side::Left, 0.5));

        let mut layout = Layout::with_root(as_node(&a));
        layout.move_node(&as_node(&b), 300.0, 100.0);
        layout.link_pads(&a_out, &b_in).expect("A to B");

        let list = layout.display_list().expect("display list");
        let edge = list
            .commands
            .iter()
            .find(|c| c.object() == DrawObject::Edge)
            .expect("edge command");
        match edge {
            DrawCommand::Edge {
                from,
                to,
                from_layout,
                to_layout,
                ..
            } => {
                assert_eq!(from.id(), a_out.id());
                assert_eq!(to.id(), b_in.id());
                assert_eq!(*from_layout, PadLayout { x: 100.0, y: 0.0 });
                assert_eq!(*to_layout, PadLayout { x: 200.0, y: 130.0 });
            }
            other => panic!("expected an edge command, got {other:?}"),
        }
    }
}
