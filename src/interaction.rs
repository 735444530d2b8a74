//! Pointer handling on top of a [`FlowModel`]: mapping screen coordinates to
//! flowchart coordinates, and the press/drag/release gestures that select,
//! move and link.

use crate::config::InteractionConfig;
use crate::error::Result;
use crate::graph::{Edge, Pad};
use crate::hit::Point;
use crate::model::{FlowModel, Target};
use std::rc::Rc;
use tracing::{debug, warn};

pub const MIN_ZOOM: f64 = 0.05;

/// Screen-space transform of the flowchart canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset: Point,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Point::default(),
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn to_flow(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.offset.x) / self.zoom,
            (screen.y - self.offset.y) / self.zoom,
        )
    }

    pub fn pan_by(&mut self, delta: Point) {
        self.offset = self.offset + delta;
    }

    pub fn zoom_by(&mut self, amount: f64) {
        self.zoom += amount;
        if self.zoom < MIN_ZOOM {
            self.zoom = MIN_ZOOM;
        }
    }
}

/// Snaps `v` onto the centre of its `q`-sized grid cell.
pub fn quantize(v: f64, q: f64) -> f64 {
    (v / q).trunc() * q + q / 2.0
}

#[derive(Debug)]
struct Drag {
    target: Target,
    press: Point,
    origin: Point,
    current: Point,
}

/// Tracks one pointer gesture at a time. All points are in flowchart
/// coordinates.
#[derive(Debug)]
pub struct Gesture {
    quantum: f64,
    link_on_release: bool,
    drag: Option<Drag>,
    hover: Option<Rc<dyn Pad>>,
}

impl Gesture {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            quantum: config.quantum(),
            link_on_release: config.link_on_release,
            drag: None,
            hover: None,
        }
    }

    /// Selects whatever is under `p` and starts dragging it.
    pub fn press(&mut self, model: &mut FlowModel, p: Point) -> Result<Option<Target>> {
        self.hover = None;
        self.drag = None;
        let target = model.hit_test(p);
        model.set_active(target.clone());

        if let Some(target) = &target {
            let origin = model.target_pos(target)?;
            self.drag = Some(Drag {
                target: target.clone(),
                press: p,
                origin,
                current: origin,
            });
        }
        Ok(target)
    }

    /// Follows the pointer. Returns whether the model changed.
    pub fn motion(&mut self, model: &mut FlowModel, p: Point) -> Result<bool> {
        let Some(drag) = self.drag.as_mut() else {
            return Ok(false);
        };
        drag.current = drag.origin - (drag.press - p);

        match &drag.target {
            Target::Node(_) => {
                if drag.press.distance_sq(p) <= self.quantum * self.quantum {
                    return Ok(false);
                }
                let x = quantize(drag.current.x, self.quantum);
                let y = quantize(drag.current.y, self.quantum);
                model.move_target(&drag.target, x, y)
            }
            Target::Pad(start) => {
                self.hover = model
                    .hit_test(p)
                    .and_then(|hit| hit.as_pad().cloned())
                    .filter(|pad| pad.id() != start.id());
                Ok(false)
            }
        }
    }

    /// Ends the gesture. Releasing a pad drag over another pad links them.
    pub fn release(&mut self, model: &mut FlowModel, p: Point) -> Result<Option<Rc<dyn Edge>>> {
        self.hover = None;
        let Some(drag) = self.drag.take() else {
            return Ok(None);
        };
        let Target::Pad(start) = drag.target else {
            return Ok(None);
        };
        if !self.link_on_release {
            return Ok(None);
        }

        let Some(end) = model.hit_test(p).and_then(|hit| hit.as_pad().cloned()) else {
            return Ok(None);
        };
        if end.id() == start.id() {
            return Ok(None);
        }

        match model.link_pads(&start, &end) {
            Ok(edge) => {
                debug!(edge = edge.id(), from = start.id(), to = end.id(), "linked pads");
                Ok(Some(edge))
            }
            Err(err) => {
                warn!(from = start.id(), to = end.id(), "failed to link pads: {err}");
                Err(err)
            }
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The pad currently hovered while dragging from another pad.
    pub fn hover(&self) -> Option<&Rc<dyn Pad>> {
        self.hover.as_ref()
    }

    /// Start and end of the link being dragged out of a pad.
    pub fn link_preview(&self) -> Option<(Point, Point)> {
        self.drag
            .as_ref()
            .filter(|drag| matches!(drag.target, Target::Pad(_)))
            .map(|drag| (drag.origin, drag.current))
    }
}
