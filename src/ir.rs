use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::DiagramError;

/// Overall flow of auto-laid-out nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Layers advance along X.
    #[default]
    Landscape,
    /// Layers advance along Y.
    Portrait,
}

impl Orientation {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "landscape" | "lr" | "horizontal" => Some(Self::Landscape),
            "portrait" | "tb" | "td" | "vertical" => Some(Self::Portrait),
            _ => None,
        }
    }
}

/// How a container places children that carry no explicit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDirection {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    #[serde(rename = "icon")]
    Icon,
    #[serde(rename = "group")]
    Group,
    #[serde(rename = "composite")]
    Composite,
    #[serde(rename = "text-box", alias = "textBox", alias = "text")]
    TextBox,
    /// Unknown node types are sized like icons.
    #[serde(other)]
    Other,
}

/// One side of a node's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    /// Enumeration order used wherever side choices must be deterministic.
    pub const ALL: [Side; 4] = [Side::Right, Side::Left, Side::Bottom, Side::Top];

    pub fn opposite(self) -> Self {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// True for sides whose outward normal runs along the X axis.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }

    /// Unit outward normal.
    pub fn normal(self) -> (f32, f32) {
        match self {
            Side::Top => (0.0, -1.0),
            Side::Right => (1.0, 0.0),
            Side::Bottom => (0.0, 1.0),
            Side::Left => (-1.0, 0.0),
        }
    }

    /// The side facing along the dominant axis of `(dx, dy)`.
    pub fn toward(dx: f32, dy: f32) -> Self {
        if dx.abs() >= dy.abs() {
            if dx >= 0.0 { Side::Right } else { Side::Left }
        } else if dy >= 0.0 {
            Side::Bottom
        } else {
            Side::Top
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "top" | "t" | "n" => Some(Side::Top),
            "right" | "r" | "e" => Some(Side::Right),
            "bottom" | "b" | "s" => Some(Side::Bottom),
            "left" | "l" | "w" => Some(Side::Left),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub position: Option<[f32; 2]>,
    #[serde(default)]
    pub size: Option<[f32; 2]>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub sublabel: Option<String>,
    #[serde(default)]
    pub children: Vec<Node>,
    #[serde(default)]
    pub icons: Vec<String>,
    #[serde(default)]
    pub layout: LayoutDirection,
}

impl Node {
    pub fn new(id: &str, kind: NodeKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            ..Default::default()
        }
    }

    pub fn icon(id: &str) -> Self {
        Self::new(id, NodeKind::Icon)
    }

    pub fn group(id: &str, children: Vec<Node>) -> Self {
        Self {
            children,
            ..Self::new(id, NodeKind::Group)
        }
    }

    pub fn composite(id: &str, icons: &[&str]) -> Self {
        Self {
            icons: icons.iter().map(|icon| icon.to_string()).collect(),
            ..Self::new(id, NodeKind::Composite)
        }
    }

    pub fn text_box(id: &str, label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..Self::new(id, NodeKind::TextBox)
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Some([x, y]);
        self
    }

    pub fn sized(mut self, width: f32, height: f32) -> Self {
        self.size = Some([width, height]);
        self
    }

    pub fn with_layout(mut self, layout: LayoutDirection) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_sublabel(mut self, sublabel: &str) -> Self {
        self.sublabel = Some(sublabel.to_string());
        self
    }

    /// Depth-first walk over this node and every descendant.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub exit_side: Option<Side>,
    #[serde(default)]
    pub entry_side: Option<Side>,
    #[serde(default)]
    pub style: ConnectionStyle,
    #[serde(default)]
    pub bidirectional: bool,
}

impl Connection {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            ..Default::default()
        }
    }

    pub fn exit(mut self, side: Side) -> Self {
        self.exit_side = Some(side);
        self
    }

    pub fn entry(mut self, side: Side) -> Self {
        self.entry_side = Some(side);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Diagram {
    pub fn new(nodes: Vec<Node>, connections: Vec<Connection>) -> Self {
        Self { nodes, connections }
    }

    /// Parse a diagram and enforce id uniqueness across the whole node tree.
    pub fn from_json_str(input: &str) -> Result<Self, DiagramError> {
        let diagram: Diagram = serde_json::from_str(input)?;
        diagram.validate_ids()?;
        Ok(diagram)
    }

    pub fn validate_ids(&self) -> Result<(), DiagramError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut duplicate: Option<&str> = None;
        let mut empty = false;
        for root in &self.nodes {
            root.walk(&mut |node| {
                if node.id.trim().is_empty() {
                    empty = true;
                } else if !seen.insert(node.id.as_str()) && duplicate.is_none() {
                    duplicate = Some(node.id.as_str());
                }
            });
        }
        if empty {
            return Err(DiagramError::EmptyNodeId);
        }
        if let Some(id) = duplicate {
            return Err(DiagramError::DuplicateNodeId(id.to_string()));
        }
        Ok(())
    }
}
