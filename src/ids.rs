//! Identifier allocation for nodes, pads and edges.
//!
//! Every category has its own monotonic counter. Identifiers look like
//! `node-3` or, when the caller supplies a tag, `node-start-3`.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::fmt;

/// Largest sequence number [`IdAllocator::reserve`] accepts. Restored
/// documents cannot push a counter anywhere near `u64::MAX`.
pub const MAX_RESERVED_SEQ: u64 = (1 << 53) - 1;

static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(node|pad|edge)-(?:(.+)-)?(\d+)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdCategory {
    Node,
    Pad,
    Edge,
}

impl IdCategory {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Pad => "pad",
            Self::Edge => "edge",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "node" => Some(Self::Node),
            "pad" => Some(Self::Pad),
            "edge" => Some(Self::Edge),
            _ => None,
        }
    }
}

impl fmt::Display for IdCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// The components of an identifier produced by [`IdAllocator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedId {
    pub category: IdCategory,
    pub tag: Option<String>,
    pub seq: u64,
}

/// Splits an allocator-formatted identifier into its parts.
///
/// Returns `None` for identifiers the allocator could not have produced.
pub fn parse_id(id: &str) -> Option<ParsedId> {
    let caps = ID_RE.captures(id)?;
    let category = IdCategory::from_prefix(caps.get(1)?.as_str())?;
    let seq = caps.get(3)?.as_str().parse::<u64>().ok()?;
    Some(ParsedId {
        category,
        tag: caps.get(2).map(|m| m.as_str().to_string()),
        seq,
    })
}

#[derive(Debug, Default)]
struct Counters {
    node: u64,
    pad: u64,
    edge: u64,
}

impl Counters {
    fn slot(&mut self, category: IdCategory) -> &mut u64 {
        match category {
            IdCategory::Node => &mut self.node,
            IdCategory::Pad => &mut self.pad,
            IdCategory::Edge => &mut self.edge,
        }
    }
}

/// Thread-safe allocator of unique identifiers.
///
/// Share one instance per process (usually behind an `Arc`) between every
/// constructor that creates graph entities. Uniqueness only holds within
/// the allocator's lifetime; nothing is persisted.
#[derive(Debug, Default)]
pub struct IdAllocator {
    counters: Mutex<Counters>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&self, category: IdCategory, tag: &str) -> String {
        let seq = {
            let mut counters = self.counters.lock();
            let slot = counters.slot(category);
            let seq = *slot;
            // reserve keeps counters at most MAX_RESERVED_SEQ + 1, so only
            // ~2^64 allocations reach the ceiling. Never wrap to 0.
            *slot = seq.saturating_add(1);
            seq
        };
        if tag.is_empty() {
            format!("{}-{}", category.prefix(), seq)
        } else {
            format!("{}-{}-{}", category.prefix(), tag, seq)
        }
    }

    pub fn alloc_node_id(&self, tag: &str) -> String {
        self.alloc(IdCategory::Node, tag)
    }

    pub fn alloc_pad_id(&self, tag: &str) -> String {
        self.alloc(IdCategory::Pad, tag)
    }

    pub fn alloc_edge_id(&self, tag: &str) -> String {
        self.alloc(IdCategory::Edge, tag)
    }

    /// Makes sure `id` is never handed out again.
    ///
    /// Used when entities are restored with their previous identifiers.
    /// Identifiers that are not in allocator format are ignored. Sequence
    /// numbers above [`MAX_RESERVED_SEQ`] are refused and leave the counter
    /// untouched.
    pub fn reserve(&self, id: &str) -> Result<()> {
        let Some(parsed) = parse_id(id) else {
            return Ok(());
        };
        let next = parsed
            .seq
            .checked_add(1)
            .filter(|_| parsed.seq <= MAX_RESERVED_SEQ)
            .ok_or_else(|| Error::IdOutOfRange { id: id.to_string() })?;
        let mut counters = self.counters.lock();
        let slot = counters.slot(parsed.category);
        if *slot < next {
            *slot = next;
        }
        Ok(())
    }

    /// The sequence number the next allocation in `category` will use.
    pub fn peek(&self, category: IdCategory) -> u64 {
        *self.counters.lock().slot(category)
    }
}
