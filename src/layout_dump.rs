use crate::ir::{ConnectionStyle, NodeKind, Side};
use crate::layout::{ConnectorTopology, Layout};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Flat, render-ready view of a [`Layout`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub orientation: String,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodeDump>,
    pub connections: Vec<ConnectionDump>,
    pub dropped_connections: Vec<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub kind: NodeKind,
    pub parent: Option<String>,
    pub depth: usize,
    /// Layer of the node's top-level ancestor.
    pub layer: Option<usize>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: Option<String>,
    pub sublabel: Option<String>,
    pub icons: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDump {
    pub index: usize,
    pub from: String,
    pub to: String,
    pub exit_side: Side,
    pub entry_side: Side,
    pub topology: ConnectorTopology,
    pub style: ConnectionStyle,
    pub bidirectional: bool,
    pub collisions: usize,
    pub points: Vec<[f32; 2]>,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let mut nodes = Vec::new();
        for root in &layout.nodes {
            let layer = layout.layers.get(&root.id).copied();
            let mut depths: Vec<(String, usize)> = Vec::new();
            root.walk(None, &mut |node, parent| {
                let depth = parent
                    .and_then(|parent| {
                        depths
                            .iter()
                            .find(|(id, _)| id == parent)
                            .map(|(_, depth)| depth + 1)
                    })
                    .unwrap_or(0);
                depths.push((node.id.clone(), depth));
                nodes.push(NodeDump {
                    id: node.id.clone(),
                    kind: node.kind,
                    parent: parent.map(str::to_string),
                    depth,
                    layer,
                    x: node.x,
                    y: node.y,
                    width: node.width,
                    height: node.height,
                    label: node.label.clone(),
                    sublabel: node.sublabel.clone(),
                    icons: node.icons.clone(),
                });
            });
        }

        let connections = layout
            .connections
            .iter()
            .map(|conn| ConnectionDump {
                index: conn.index,
                from: conn.from.clone(),
                to: conn.to.clone(),
                exit_side: conn.anchor.exit_side,
                entry_side: conn.anchor.entry_side,
                topology: conn.topology,
                style: conn.style,
                bidirectional: conn.bidirectional,
                collisions: conn.collisions,
                points: conn.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        LayoutDump {
            orientation: format!("{:?}", layout.orientation).to_lowercase(),
            width: layout.width,
            height: layout.height,
            nodes,
            connections,
            dropped_connections: layout.dropped_connections.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(&mut writer, &dump)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
