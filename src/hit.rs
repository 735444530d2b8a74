//! Uniform-grid spatial index for pointer hit testing.
//!
//! The covered area is split into a fixed number of cells ("buckets"). An
//! object is referenced from every cell its bounding box overlaps, so a
//! point query only has to scan the one cell the point falls in.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

pub const DEFAULT_COLUMNS: usize = 32;
pub const DEFAULT_ROWS: usize = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(self, other: Point) -> f64 {
        let d = self - other;
        d.x * d.x + d.y * d.y
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

/// Fine-grained hit predicate, consulted once a point falls inside an
/// object's bounding box.
pub trait HitTest {
    fn hit_test(&self, p: Point) -> bool;
}

impl<T: HitTest + ?Sized> HitTest for std::rc::Rc<T> {
    fn hit_test(&self, p: Point) -> bool {
        (**self).hit_test(p)
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    min: Point,
    max: Point,
    obj: T,
}

impl<T> Entry<T> {
    fn contains(&self, p: Point) -> bool {
        self.min.x <= p.x && self.min.y <= p.y && self.max.x >= p.x && self.max.y >= p.y
    }
}

/// A hit testing region.
///
/// Objects are stored once; cells hold indices into that storage in
/// insertion order, so later insertions sit "on top" of earlier ones.
#[derive(Debug, Clone)]
pub struct Area<T> {
    min: Point,
    max: Point,
    columns: usize,
    rows: usize,
    entries: Vec<Entry<T>>,
    // Column-major: cell (x, y) lives at x * rows + y.
    cells: Vec<Vec<usize>>,
}

impl<T: HitTest> Area<T> {
    pub fn new(min: Point, max: Point) -> Self {
        Self::with_cells(min, max, DEFAULT_COLUMNS, DEFAULT_ROWS)
    }

    pub fn with_cells(min: Point, max: Point, columns: usize, rows: usize) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        Self {
            min,
            max,
            columns,
            rows,
            entries: Vec::new(),
            cells: vec![Vec::new(); columns * rows],
        }
    }

    pub fn bounds(&self) -> (Point, Point) {
        (self.min, self.max)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `obj` with the bounding box `[min, max]`.
    ///
    /// Boxes reaching outside the area are clamped onto the edge cells.
    pub fn add(&mut self, min: Point, max: Point, obj: T) {
        let idx = self.entries.len();
        self.entries.push(Entry { min, max, obj });

        let (min_x, min_y) = self.cell_of(min);
        let (max_x, max_y) = self.cell_of(max);
        for x in min_x.min(max_x)..=max_x.max(min_x) {
            for y in min_y.min(max_y)..=max_y.max(min_y) {
                self.cells[x * self.rows + y].push(idx);
            }
        }
    }

    /// Returns the topmost object at `p`.
    pub fn test(&self, p: Point) -> Option<&T> {
        let (x, y) = self.cell_of(p);
        self.cells[x * self.rows + y]
            .iter()
            .rev()
            .map(|&idx| &self.entries[idx])
            .find(|entry| entry.contains(p) && entry.obj.hit_test(p))
            .map(|entry| &entry.obj)
    }

    /// Every object stored in the area, in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|entry| &entry.obj)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    fn cell_of(&self, p: Point) -> (usize, usize) {
        (
            axis_cell(p.x, self.min.x, self.max.x, self.columns),
            axis_cell(p.y, self.min.y, self.max.y, self.rows),
        )
    }
}

fn axis_cell(v: f64, min: f64, max: f64, count: usize) -> usize {
    let span = max - min;
    if span == 0.0 || !span.is_finite() {
        return 0;
    }
    let idx = ((v - min) * count as f64 / span).floor();
    if idx.is_nan() || idx <= 0.0 {
        return 0;
    }
    (idx as usize).min(count - 1)
}
