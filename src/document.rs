//! Serializable description of a flowchart: nodes with their pads and
//! positions, plus the links between pads.

use crate::config::Config;
use crate::error::Error;
use crate::graph::{Edge, Node, Pad, SEdge, SNode, Side, connect_edge, find_link};
use crate::ids::IdAllocator;
use crate::layout::Layout;
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub id: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub pads: Vec<PadSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PadSpec {
    pub id: String,
    pub side: Side,
    #[serde(default)]
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSpec {
    /// Edge identifier to restore. Links without one get a fresh id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub from: String,
    pub to: String,
}

/// Parses a document written as JSON or JSON5.
pub fn parse_document(input: &str) -> anyhow::Result<GraphDocument> {
    let doc = json5::from_str(input).context("invalid graph document")?;
    Ok(doc)
}

/// The entities created from a [`GraphDocument`].
pub struct BuiltGraph {
    pub layout: Layout,
    pub nodes: BTreeMap<String, Rc<SNode>>,
    pub pads: HashMap<String, Rc<dyn Pad>>,
    pub edges: Vec<Rc<dyn Edge>>,
}

impl BuiltGraph {
    pub fn node(&self, id: &str) -> Option<Rc<dyn Node>> {
        self.nodes.get(id).map(|node| Rc::clone(node) as Rc<dyn Node>)
    }

    pub fn pad(&self, id: &str) -> Option<&Rc<dyn Pad>> {
        self.pads.get(id)
    }
}

/// Creates stock nodes, pads and edges for `doc` under the identifiers it
/// names, and lays them out.
///
/// Identifiers are reserved in `ids` so later allocations never collide with
/// restored entities. The root is the document's `root`, or else its first
/// node.
pub fn build_document(
    doc: &GraphDocument,
    ids: &Arc<IdAllocator>,
    config: &Config,
) -> anyhow::Result<BuiltGraph> {
    let mut layout = Layout::new();
    let mut nodes = BTreeMap::new();
    let mut pads: HashMap<String, Rc<dyn Pad>> = HashMap::new();

    for spec in &doc.nodes {
        if nodes.contains_key(&spec.id) {
            bail!("duplicate node id {}", spec.id);
        }
        let size = (
            spec.width.unwrap_or(config.node.width),
            spec.height.unwrap_or(config.node.height),
        );
        let node = SNode::with_id(ids, &spec.id, &spec.headline, size)
            .with_context(|| format!("cannot restore node {}", spec.id))?;
        node.set_pad_size(config.node.pad_size());
        for pad_spec in &spec.pads {
            if pads.contains_key(&pad_spec.id) {
                bail!("duplicate pad id {}", pad_spec.id);
            }
            let pad = node
                .append_pad_with_id(&pad_spec.id, pad_spec.side, pad_spec.offset)
                .with_context(|| format!("cannot restore pad {}", pad_spec.id))?;
            pads.insert(pad_spec.id.clone(), pad);
        }

        let dyn_node: Rc<dyn Node> = Rc::clone(&node) as Rc<dyn Node>;
        layout.add_node(&dyn_node, spec.x, spec.y);
        nodes.insert(spec.id.clone(), node);
    }

    if let Some(root) = &doc.root {
        layout
            .set_root_id(root)
            .with_context(|| format!("cannot use {root} as root"))?;
    }

    let mut edges = Vec::with_capacity(doc.links.len());
    for link in &doc.links {
        let from = pads
            .get(&link.from)
            .with_context(|| format!("link refers to unknown pad {}", link.from))?;
        let to = pads
            .get(&link.to)
            .with_context(|| format!("link refers to unknown pad {}", link.to))?;

        let edge = match &link.id {
            Some(id) => restore_link(ids, id, from, to),
            None => layout.link_pads(from, to),
        }
        .with_context(|| format!("cannot link {} to {}", link.from, link.to))?;
        edges.push(edge);
    }

    debug!(
        nodes = nodes.len(),
        pads = pads.len(),
        edges = edges.len(),
        "built graph document"
    );
    Ok(BuiltGraph {
        layout,
        nodes,
        pads,
        edges,
    })
}

fn restore_link(
    ids: &IdAllocator,
    id: &str,
    from: &Rc<dyn Pad>,
    to: &Rc<dyn Pad>,
) -> crate::error::Result<Rc<dyn Edge>> {
    if find_link(from.as_ref(), to.as_ref()).is_some() {
        return Err(Error::AlreadyLinked {
            from: from.id().to_string(),
            to: to.id().to_string(),
        });
    }
    let edge: Rc<dyn Edge> = SEdge::with_id(ids, id, from, to)?;
    connect_edge(&edge)?;
    Ok(edge)
}
