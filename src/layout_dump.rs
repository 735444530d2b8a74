use crate::document::{GraphDocument, LinkSpec, NodeSpec, PadSpec};
use crate::hit::Point;
use crate::layout::{DisplayList, DrawCommand, Layout};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Snapshot of a layout as a document that [`crate::document::build_document`]
/// can load again.
pub fn dump_document(layout: &Layout) -> GraphDocument {
    let nodes = layout
        .dump()
        .into_iter()
        .map(|(node, pos)| {
            let (width, height) = node.size();
            NodeSpec {
                id: node.id().to_string(),
                headline: node.headline().unwrap_or_default(),
                x: pos.x,
                y: pos.y,
                width: Some(width),
                height: Some(height),
                pads: node
                    .pads()
                    .iter()
                    .map(|pad| {
                        let positioning = pad.positioning();
                        PadSpec {
                            id: pad.id().to_string(),
                            side: positioning.side,
                            offset: positioning.offset,
                        }
                    })
                    .collect(),
            }
        })
        .collect();

    let mut links: Vec<LinkSpec> = layout
        .edges()
        .iter()
        .filter_map(|edge| {
            Some(LinkSpec {
                id: Some(edge.id().to_string()),
                from: edge.from()?.id().to_string(),
                to: edge.to()?.id().to_string(),
            })
        })
        .collect();
    links.sort_by(|a, b| a.id.cmp(&b.id));

    GraphDocument {
        root: layout.root().map(|root| root.id().to_string()),
        nodes,
        links,
    }
}

/// Display list in a form external renderers can consume.
#[derive(Debug, Serialize)]
pub struct DisplayListDump {
    pub min: Point,
    pub max: Point,
    pub commands: Vec<CommandDump>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CommandDump {
    Node {
        id: String,
        headline: Option<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Pad {
        id: String,
        x: f64,
        y: f64,
        diameter: f64,
        color: Option<[f64; 3]>,
    },
    Edge {
        id: String,
        from: String,
        to: String,
        points: [[f64; 2]; 2],
    },
}

impl DisplayListDump {
    pub fn from_display_list(list: &DisplayList) -> Self {
        let commands = list
            .commands
            .iter()
            .map(|cmd| match cmd {
                DrawCommand::Node { node, layout } => {
                    let (width, height) = node.size();
                    CommandDump::Node {
                        id: node.id().to_string(),
                        headline: node.headline(),
                        x: layout.x,
                        y: layout.y,
                        width,
                        height,
                    }
                }
                DrawCommand::Pad { pad, layout } => CommandDump::Pad {
                    id: pad.id().to_string(),
                    x: layout.x,
                    y: layout.y,
                    diameter: pad.size().0,
                    color: pad.color().map(|c| [c.r, c.g, c.b]),
                },
                DrawCommand::Edge {
                    from,
                    to,
                    from_layout,
                    to_layout,
                    edge,
                } => CommandDump::Edge {
                    id: edge.id().to_string(),
                    from: from.id().to_string(),
                    to: to.id().to_string(),
                    points: [[from_layout.x, from_layout.y], [to_layout.x, to_layout.y]],
                },
            })
            .collect();

        Self {
            min: list.min,
            max: list.max,
            commands,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = dump_document(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
