//! View model over a [`Layout`]: the current display list plus a hit-test
//! area built from it, kept in sync across every mutation.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::graph::{Edge, Node, Pad};
use crate::hit::{Area, HitTest, Point};
use crate::layout::{DisplayList, DrawCommand, Layout};
use std::rc::Rc;
use std::time::Instant;
use tracing::debug;

/// Something the pointer can land on.
#[derive(Debug, Clone)]
pub enum Target {
    Node(Rc<dyn Node>),
    Pad(Rc<dyn Pad>),
}

impl Target {
    pub fn id(&self) -> &str {
        match self {
            Self::Node(node) => node.id(),
            Self::Pad(pad) => pad.id(),
        }
    }

    pub fn as_node(&self) -> Option<&Rc<dyn Node>> {
        match self {
            Self::Node(node) => Some(node),
            Self::Pad(_) => None,
        }
    }

    pub fn as_pad(&self) -> Option<&Rc<dyn Pad>> {
        match self {
            Self::Pad(pad) => Some(pad),
            Self::Node(_) => None,
        }
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Node(a), Self::Node(b)) => a.id() == b.id(),
            (Self::Pad(a), Self::Pad(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitShape {
    /// Hits anywhere inside the bounding box.
    Rect,
    Circle { centre: Point, radius: f64 },
}

/// A target as stored in the hit-test area.
#[derive(Debug, Clone)]
pub struct HitTarget {
    pub target: Target,
    pub shape: HitShape,
}

impl HitTest for HitTarget {
    fn hit_test(&self, p: Point) -> bool {
        match self.shape {
            HitShape::Rect => true,
            HitShape::Circle { centre, radius } => centre.distance_sq(p) < radius * radius,
        }
    }
}

pub struct FlowModel {
    layout: Layout,
    display_list: DisplayList,
    area: Area<HitTarget>,
    columns: usize,
    rows: usize,
    active: Option<Target>,
}

impl FlowModel {
    pub fn new(layout: Layout, config: &Config) -> Result<Self> {
        let (columns, rows) = (config.area.columns, config.area.rows);
        let mut model = Self {
            layout,
            display_list: DisplayList::default(),
            area: Area::with_cells(Point::default(), Point::default(), columns, rows),
            columns,
            rows,
            active: None,
        };
        model.rebuild()?;
        Ok(model)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.display_list
    }

    pub fn area(&self) -> &Area<HitTarget> {
        &self.area
    }

    /// Bounding box of everything drawn, in flowchart coordinates.
    pub fn bounds(&self) -> (Point, Point) {
        (self.display_list.min, self.display_list.max)
    }

    /// Recomputes the display list and replaces the hit-test area.
    pub fn rebuild(&mut self) -> Result<()> {
        let started = Instant::now();
        self.display_list = self.layout.display_list()?;

        let mut area = Area::with_cells(
            self.display_list.min,
            self.display_list.max,
            self.columns,
            self.rows,
        );
        for cmd in &self.display_list.commands {
            match cmd {
                DrawCommand::Node { node, layout } => {
                    let (w, h) = node.size();
                    let centre = layout.pos();
                    area.add(
                        Point::new(centre.x - w / 2.0, centre.y - h / 2.0),
                        Point::new(centre.x + w / 2.0, centre.y + h / 2.0),
                        HitTarget {
                            target: Target::Node(Rc::clone(node)),
                            shape: HitShape::Rect,
                        },
                    );
                }
                DrawCommand::Pad { pad, layout } => {
                    let (dia, _) = pad.size();
                    let centre = layout.pos();
                    let radius = dia / 2.0;
                    area.add(
                        Point::new(centre.x - radius, centre.y - radius),
                        Point::new(centre.x + radius, centre.y + radius),
                        HitTarget {
                            target: Target::Pad(Rc::clone(pad)),
                            shape: HitShape::Circle { centre, radius },
                        },
                    );
                }
                // Edges are drawn but never picked.
                DrawCommand::Edge { .. } => {}
            }
        }
        self.area = area;

        debug!(
            targets = self.area.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "rebuilt hit area"
        );
        Ok(())
    }

    /// The topmost node or pad at `p`.
    pub fn hit_test(&self, p: Point) -> Option<Target> {
        self.area.test(p).map(|hit| hit.target.clone())
    }

    pub fn target_pos(&mut self, target: &Target) -> Result<Point> {
        match target {
            Target::Node(node) => Ok(self.layout.node(node).pos()),
            Target::Pad(pad) => Ok(self.layout.pad(pad)?.pos()),
        }
    }

    /// Moves a node target. Pads follow their node and cannot be moved on
    /// their own, so for them this returns `false`. Nodes must already be
    /// in the layout; use [`FlowModel::add_node`] for new ones.
    pub fn move_target(&mut self, target: &Target, x: f64, y: f64) -> Result<bool> {
        match target {
            Target::Node(node) => {
                self.ensure_known(node)?;
                self.layout.move_node(node, x, y);
                self.rebuild()?;
                Ok(true)
            }
            Target::Pad(_) => Ok(false),
        }
    }

    pub fn add_node(&mut self, node: &Rc<dyn Node>, x: f64, y: f64) -> Result<()> {
        self.layout.add_node(node, x, y);
        self.rebuild()
    }

    pub fn delete_node(&mut self, node: &Rc<dyn Node>) -> Result<()> {
        self.ensure_known(node)?;
        let pads = node.pads();
        let drops_active = self.active.as_ref().is_some_and(|active| match active {
            Target::Node(n) => n.id() == node.id(),
            Target::Pad(p) => pads.iter().any(|pad| pad.id() == p.id()),
        });
        if drops_active {
            self.active = None;
        }
        self.layout.delete_node(node);
        self.rebuild()
    }

    fn ensure_known(&self, node: &Rc<dyn Node>) -> Result<()> {
        if self.layout.contains(node.id()) {
            Ok(())
        } else {
            Err(Error::UnknownNode {
                node: node.id().to_string(),
            })
        }
    }

    pub fn link_pads(&mut self, from: &Rc<dyn Pad>, to: &Rc<dyn Pad>) -> Result<Rc<dyn Edge>> {
        let edge = self.layout.link_pads(from, to)?;
        self.rebuild()?;
        Ok(edge)
    }

    /// Makes `target` the single active target, or clears the selection.
    pub fn set_active(&mut self, target: Option<Target>) {
        self.active = target;
    }

    pub fn active(&self) -> Option<&Target> {
        self.active.as_ref()
    }

    pub fn is_active(&self, target: &Target) -> bool {
        self.active.as_ref() == Some(target)
    }
}
