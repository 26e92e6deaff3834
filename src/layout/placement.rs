use std::collections::HashMap;

use crate::config::AutoLayoutConfig;
use crate::ir::Orientation;

use super::ranking::{LayerGraph, layer_buckets, sequence_layer};
use super::sizing::SizedNode;
use super::types::{ComputedNode, Point};

fn is_horizontal(orientation: Orientation) -> bool {
    matches!(orientation, Orientation::Landscape)
}

/// Absolute top-left corner for every top-level node.
///
/// Nodes with an explicit position keep it. The rest are laid out by layer:
/// landscape maps layer to X and sequence index to Y, portrait the reverse.
/// Each layer is centred on a shared cross-axis midpoint, which in portrait
/// mode is half the viewport width when one is supplied.
pub(super) fn assign_positions(
    sized: &[SizedNode<'_>],
    graph: &LayerGraph,
    layers: &HashMap<String, usize>,
    orientation: Orientation,
    viewport_width: Option<f32>,
    config: &AutoLayoutConfig,
) -> HashMap<String, Point> {
    let horizontal = is_horizontal(orientation);
    let mut positions: HashMap<String, Point> = HashMap::with_capacity(sized.len());
    let mut centers: HashMap<String, Point> = HashMap::with_capacity(sized.len());
    let mut sizes: HashMap<&str, (f32, f32)> = HashMap::with_capacity(sized.len());
    let mut auto_order: Vec<String> = Vec::new();

    for node in sized {
        let id = node.node.id.as_str();
        sizes.insert(id, (node.width, node.height));
        match node.node.position {
            Some([x, y]) => {
                positions.insert(id.to_string(), (x, y));
                centers.insert(id.to_string(), (x + node.width / 2.0, y + node.height / 2.0));
            }
            None => auto_order.push(id.to_string()),
        }
    }
    if auto_order.is_empty() {
        return positions;
    }

    let auto_layers: HashMap<String, usize> = auto_order
        .iter()
        .map(|id| (id.clone(), layers.get(id).copied().unwrap_or(0)))
        .collect();
    let mut buckets = layer_buckets(&auto_order, &auto_layers);

    let main_of = |id: &str| {
        let (w, h) = sizes.get(id).copied().unwrap_or((0.0, 0.0));
        if horizontal { w } else { h }
    };
    let cross_of = |id: &str| {
        let (w, h) = sizes.get(id).copied().unwrap_or((0.0, 0.0));
        if horizontal { h } else { w }
    };

    let mut main_starts: Vec<f32> = vec![config.start_offset; buckets.len()];
    let mut main_extents: Vec<f32> = vec![0.0; buckets.len()];
    let mut cross_totals: Vec<f32> = vec![0.0; buckets.len()];
    let mut cursor = config.start_offset;
    for (layer, bucket) in buckets.iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        let extent = bucket.iter().map(|id| main_of(id)).fold(0.0f32, f32::max);
        let total = bucket.iter().map(|id| cross_of(id)).sum::<f32>()
            + config.node_gap * (bucket.len() - 1) as f32;
        main_starts[layer] = cursor;
        main_extents[layer] = extent;
        cross_totals[layer] = total;
        cursor += extent + config.layer_gap;
    }

    let widest = cross_totals.iter().copied().fold(0.0f32, f32::max);
    let midpoint = match (orientation, viewport_width) {
        (Orientation::Portrait, Some(width)) if width > 0.0 => width / 2.0,
        _ => config.start_offset + widest / 2.0,
    };

    for (layer, bucket) in buckets.iter_mut().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        sequence_layer(bucket, layer, graph, layers, &centers);
        let mut cross_cursor = (midpoint - cross_totals[layer] / 2.0).max(config.start_offset);
        for id in bucket.iter() {
            let (w, h) = sizes.get(id.as_str()).copied().unwrap_or((0.0, 0.0));
            let main = main_starts[layer] + (main_extents[layer] - main_of(id)) / 2.0;
            let (x, y) = if horizontal {
                (main, cross_cursor)
            } else {
                (cross_cursor, main)
            };
            cross_cursor += cross_of(id) + config.node_gap;
            positions.insert(id.clone(), (x, y));
            centers.insert(id.clone(), (x + w / 2.0, y + h / 2.0));
        }
    }

    tracing::debug!(
        auto = auto_order.len(),
        layers = buckets.len(),
        "assigned auto-layout coordinates"
    );
    positions
}

/// Emit the absolute-space tree for one sized node placed at `(x, y)`.
pub(super) fn to_computed(sized: &SizedNode<'_>, x: f32, y: f32) -> ComputedNode {
    let node = sized.node;
    let children = sized
        .children
        .iter()
        .map(|child| to_computed(child, x + child.offset.0, y + child.offset.1))
        .collect();
    ComputedNode {
        id: node.id.clone(),
        kind: node.kind,
        x,
        y,
        width: sized.width,
        height: sized.height,
        label: node.label.clone(),
        sublabel: node.sublabel.clone(),
        layout: node.layout,
        icons: node.icons.clone(),
        children,
    }
}
