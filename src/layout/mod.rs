mod anchors;
mod placement;
mod ports;
mod ranking;
mod routing;
mod sizing;
mod types;

pub use routing::LaneRegistry;
pub use types::*;

use anchors::{SidePair, choose_escape, choose_sides};
use placement::{assign_positions, to_computed};
use ports::{PortRequest, anchor_point, distribute_ports};
use ranking::{LayerGraph, assign_layers};
use routing::{Obstacle, RouteRequest, route_connection};
use sizing::{SizedNode, size_node};

use crate::config::LayoutConfig;
use crate::ir::{Connection, Diagram, Orientation, Side};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Per-call layout inputs that are not part of the diagram itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
    pub orientation: Orientation,
    /// Portrait layouts centre each layer on half of this width.
    pub viewport_width: Option<f32>,
}

impl LayoutOptions {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            viewport_width: None,
        }
    }

    pub fn with_viewport_width(mut self, width: f32) -> Self {
        self.viewport_width = Some(width);
        self
    }
}

/// Lookup over the computed node tree: absolute bounds plus parent links.
struct NodeIndex<'a> {
    order: Vec<&'a ComputedNode>,
    parents: HashMap<&'a str, Option<&'a str>>,
    by_id: HashMap<&'a str, &'a ComputedNode>,
}

impl<'a> NodeIndex<'a> {
    fn build(nodes: &'a [ComputedNode]) -> Self {
        let mut index = NodeIndex {
            order: Vec::new(),
            parents: HashMap::new(),
            by_id: HashMap::new(),
        };
        for root in nodes {
            root.walk(None, &mut |node, parent| {
                index.order.push(node);
                index.parents.insert(node.id.as_str(), parent);
                index.by_id.insert(node.id.as_str(), node);
            });
        }
        index
    }

    fn get(&self, id: &str) -> Option<&'a ComputedNode> {
        self.by_id.get(id).copied()
    }

    fn parent(&self, id: &str) -> Option<&'a ComputedNode> {
        self.parents
            .get(id)
            .copied()
            .flatten()
            .and_then(|parent| self.get(parent))
    }

    /// Whether `ancestor` sits strictly above `id` in the tree.
    fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut current = self.parents.get(id).copied().flatten();
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parents.get(parent).copied().flatten();
        }
        false
    }

    fn related(&self, a: &str, b: &str) -> bool {
        a == b || self.is_ancestor(a, b) || self.is_ancestor(b, a)
    }

    /// Every node except the endpoints and their ancestors or descendants.
    fn obstacles_for(&self, from: &str, to: &str) -> Vec<Obstacle> {
        self.order
            .iter()
            .filter(|node| !self.related(&node.id, from) && !self.related(&node.id, to))
            .map(|node| Obstacle {
                id: node.id.clone(),
                bounds: node.bounds(),
            })
            .collect()
    }
}

/// A connection whose endpoints both exist, with its sides resolved.
struct Resolved<'a> {
    index: usize,
    connection: &'a Connection,
    sides: SidePair,
    escape: Option<Bounds>,
}

/// Lay out a diagram: size, rank, position, then route every connection.
///
/// Pure with respect to its inputs; all scratch state (the lane registry and
/// the two-pass anchor table) lives only for this call. Never fails:
/// connections with unknown endpoints are dropped and listed in
/// `Layout::dropped_connections`.
pub fn compute_layout(diagram: &Diagram, options: &LayoutOptions, config: &LayoutConfig) -> Layout {
    let sized: Vec<SizedNode<'_>> = diagram
        .nodes
        .iter()
        .map(|node| size_node(node, &config.sizing))
        .collect();

    // Nested endpoints rank with their top-level ancestor.
    let mut top_level: HashMap<&str, &str> = HashMap::new();
    for root in &diagram.nodes {
        root.walk(&mut |node| {
            top_level.insert(node.id.as_str(), root.id.as_str());
        });
    }
    let top_ids: Vec<String> = diagram.nodes.iter().map(|node| node.id.clone()).collect();
    let lifted = diagram.connections.iter().filter_map(|conn| {
        let from = top_level.get(conn.from.as_str())?;
        let to = top_level.get(conn.to.as_str())?;
        Some((*from, *to))
    });
    let graph = LayerGraph::build(&top_ids, lifted);
    let layers = assign_layers(&graph);
    tracing::debug!(
        nodes = top_ids.len(),
        layers = layers.values().copied().max().map_or(0, |max| max + 1),
        "assigned layers"
    );

    let positions = assign_positions(
        &sized,
        &graph,
        &layers,
        options.orientation,
        options.viewport_width,
        &config.auto_layout,
    );
    let fallback = (config.auto_layout.start_offset, config.auto_layout.start_offset);
    let nodes: Vec<ComputedNode> = sized
        .iter()
        .map(|node| {
            let (x, y) = positions.get(&node.node.id).copied().unwrap_or(fallback);
            to_computed(node, x, y)
        })
        .collect();

    let (connections, dropped_connections) = route_all(diagram, &nodes, config);

    let margin = config.auto_layout.start_offset.max(0.0);
    let mut max_x = 0.0f32;
    let mut max_y = 0.0f32;
    for root in &nodes {
        root.walk(None, &mut |node, _| {
            max_x = max_x.max(node.x + node.width);
            max_y = max_y.max(node.y + node.height);
        });
    }
    for conn in &connections {
        for &(x, y) in &conn.points {
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    Layout {
        orientation: options.orientation,
        nodes,
        connections,
        layers: layers.into_iter().collect::<BTreeMap<_, _>>(),
        dropped_connections,
        width: (max_x + margin).max(1.0),
        height: (max_y + margin).max(1.0),
    }
}

fn route_all(
    diagram: &Diagram,
    nodes: &[ComputedNode],
    config: &LayoutConfig,
) -> (Vec<ConnectionLayout>, Vec<usize>) {
    let index = NodeIndex::build(nodes);
    let mut dropped = Vec::new();
    let mut resolved: Vec<Resolved<'_>> = Vec::with_capacity(diagram.connections.len());

    // Pass 1: sides.
    for (conn_idx, connection) in diagram.connections.iter().enumerate() {
        let (Some(from), Some(to)) = (index.get(&connection.from), index.get(&connection.to)) else {
            tracing::debug!(
                index = conn_idx,
                from = %connection.from,
                to = %connection.to,
                "dropping connection with unknown endpoint"
            );
            dropped.push(conn_idx);
            continue;
        };
        let (sides, escape) = resolve_sides(&index, connection, from, to, config);
        tracing::trace!(index = conn_idx, exit = ?sides.exit, entry = ?sides.entry, "sides chosen");
        resolved.push(Resolved {
            index: conn_idx,
            connection,
            sides,
            escape,
        });
    }

    // Pass 2: slots on shared sides.
    let requests: Vec<PortRequest<'_>> = resolved
        .iter()
        .map(|item| PortRequest {
            from: item.connection.from.as_str(),
            to: item.connection.to.as_str(),
            exit: item.sides.exit,
            entry: item.sides.entry,
        })
        .collect();
    let centers: HashMap<&str, Point> = index
        .order
        .iter()
        .map(|node| (node.id.as_str(), node.center()))
        .collect();
    let anchors = distribute_ports(&requests, &centers);

    // Routing in declaration order; lanes claimed earlier push later ones aside.
    let mut lanes = LaneRegistry::new();
    let mut out = Vec::with_capacity(resolved.len());
    for (item, anchor) in resolved.iter().zip(anchors) {
        let conn = item.connection;
        let (Some(from), Some(to)) = (index.get(&conn.from), index.get(&conn.to)) else {
            continue;
        };
        let from_bounds = from.bounds();
        let to_bounds = to.bounds();
        let start = anchor_point(
            &from_bounds,
            anchor.exit_side,
            anchor.exit_index,
            anchor.exit_total,
            &config.anchors,
        );
        let end = anchor_point(
            &to_bounds,
            anchor.entry_side,
            anchor.entry_index,
            anchor.entry_total,
            &config.anchors,
        );
        let obstacles = index.obstacles_for(&conn.from, &conn.to);
        let request = RouteRequest {
            start,
            exit: anchor.exit_side,
            end,
            entry: anchor.entry_side,
            from: from_bounds,
            to: to_bounds,
            obstacles: &obstacles,
            self_loop: conn.from == conn.to,
            escape: item.escape,
        };
        let routed = route_connection(&request, &mut lanes, &config.routing);
        out.push(ConnectionLayout {
            index: item.index,
            from: conn.from.clone(),
            to: conn.to.clone(),
            anchor,
            topology: routed.topology,
            points: routed.points,
            style: conn.style,
            bidirectional: conn.bidirectional,
            collisions: routed.collisions,
        });
    }
    if !dropped.is_empty() {
        tracing::debug!(count = dropped.len(), "connections dropped");
    }
    tracing::trace!(lanes = lanes.len(), "lanes reserved");
    (out, dropped)
}

fn resolve_sides(
    index: &NodeIndex<'_>,
    connection: &Connection,
    from: &ComputedNode,
    to: &ComputedNode,
    config: &LayoutConfig,
) -> (SidePair, Option<Bounds>) {
    if from.id == to.id {
        return (
            SidePair {
                exit: Side::Right,
                entry: Side::Top,
            },
            None,
        );
    }
    let to_bounds = to.bounds();
    if connection.exit_side.is_none() {
        if let Some(container) = index.parent(&from.id) {
            let group = container.bounds();
            let target_outside = !group.contains_point(to_bounds.center());
            if target_outside && !index.is_ancestor(&to.id, &from.id) {
                let siblings: Vec<Bounds> = container
                    .children
                    .iter()
                    .filter(|child| child.id != from.id)
                    .map(ComputedNode::bounds)
                    .collect();
                let sides = choose_escape(
                    &from.bounds(),
                    &group,
                    &siblings,
                    &to_bounds,
                    connection.entry_side,
                    config,
                );
                return (sides, Some(group));
            }
        }
    }
    let sides = choose_sides(
        &from.bounds(),
        &to_bounds,
        connection.exit_side,
        connection.entry_side,
        config,
    );
    (sides, None)
}
