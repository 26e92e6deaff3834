use std::collections::BTreeMap;

use serde::Serialize;

use crate::ir::{ConnectionStyle, LayoutDirection, NodeKind, Orientation, Side};

pub type Point = (f32, f32);

/// Axis-aligned rectangle in absolute diagram space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn inflate(&self, pad: f32) -> Self {
        Self::new(
            self.x - pad,
            self.y - pad,
            self.width + pad * 2.0,
            self.height + pad * 2.0,
        )
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.0 >= self.x && point.0 <= self.right() && point.1 >= self.y && point.1 <= self.bottom()
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        const EPS: f32 = 1e-3;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.right() <= self.right() + EPS
            && other.bottom() <= self.bottom() + EPS
    }

    /// Point on `side` at `ratio` (0..=1) along that side.
    pub fn side_point(&self, side: Side, ratio: f32) -> Point {
        let ratio = ratio.clamp(0.0, 1.0);
        match side {
            Side::Top => (self.x + self.width * ratio, self.y),
            Side::Bottom => (self.x + self.width * ratio, self.bottom()),
            Side::Left => (self.x, self.y + self.height * ratio),
            Side::Right => (self.right(), self.y + self.height * ratio),
        }
    }
}

/// A node with resolved absolute geometry. Children are already in absolute
/// space.
#[derive(Debug, Clone, Serialize)]
pub struct ComputedNode {
    pub id: String,
    pub kind: NodeKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: Option<String>,
    pub sublabel: Option<String>,
    pub layout: LayoutDirection,
    pub icons: Vec<String>,
    pub children: Vec<ComputedNode>,
}

impl ComputedNode {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Depth-first walk yielding each node with its parent id.
    pub fn walk<'a>(&'a self, parent: Option<&'a str>, visit: &mut impl FnMut(&'a ComputedNode, Option<&'a str>)) {
        visit(self, parent);
        for child in &self.children {
            child.walk(Some(self.id.as_str()), visit);
        }
    }
}

/// Resolved attachment data for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnchorInfo {
    pub exit_side: Side,
    pub entry_side: Side,
    pub exit_index: usize,
    pub exit_total: usize,
    pub entry_index: usize,
    pub entry_total: usize,
}

/// Shape of an orthogonal connector implied by its sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectorTopology {
    Straight,
    LShape,
    ZShape,
    UShape,
    /// Stub-and-channel path produced by obstacle avoidance or by sides that
    /// face away from each other.
    Detour,
    SelfLoop,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionLayout {
    /// Index of the connection in the input list.
    pub index: usize,
    pub from: String,
    pub to: String,
    pub anchor: AnchorInfo,
    pub topology: ConnectorTopology,
    pub points: Vec<Point>,
    pub style: ConnectionStyle,
    pub bidirectional: bool,
    /// Number of obstacle boxes the final path still crosses.
    pub collisions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub orientation: Orientation,
    pub nodes: Vec<ComputedNode>,
    pub connections: Vec<ConnectionLayout>,
    /// Layer of every top-level node.
    pub layers: BTreeMap<String, usize>,
    /// Input indices of connections whose endpoints do not exist.
    pub dropped_connections: Vec<usize>,
    pub width: f32,
    pub height: f32,
}

impl Layout {
    pub fn node(&self, id: &str) -> Option<&ComputedNode> {
        fn find<'a>(nodes: &'a [ComputedNode], id: &str) -> Option<&'a ComputedNode> {
            for node in nodes {
                if node.id == id {
                    return Some(node);
                }
                if let Some(found) = find(&node.children, id) {
                    return Some(found);
                }
            }
            None
        }
        find(&self.nodes, id)
    }

    /// Every node in depth-first order.
    pub fn flat_nodes(&self) -> Vec<&ComputedNode> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.walk(None, &mut |node, _| out.push(node));
        }
        out
    }

    pub fn connection(&self, from: &str, to: &str) -> Option<&ConnectionLayout> {
        self.connections
            .iter()
            .find(|conn| conn.from == from && conn.to == to)
    }
}
