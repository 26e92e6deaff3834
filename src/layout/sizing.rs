use crate::config::SizingConfig;
use crate::ir::{LayoutDirection, Node, NodeKind};

/// Size and parent-relative offset of one node, built bottom-up.
///
/// Offsets are relative to the parent's top-left corner. Top-level nodes keep
/// `(0, 0)` until placement assigns them absolute coordinates.
#[derive(Debug, Clone)]
pub(super) struct SizedNode<'a> {
    pub(super) node: &'a Node,
    pub(super) width: f32,
    pub(super) height: f32,
    pub(super) offset: (f32, f32),
    pub(super) children: Vec<SizedNode<'a>>,
}

impl SizedNode<'_> {
    fn shifted(mut self, dx: f32, dy: f32) -> Self {
        self.offset = (self.offset.0 + dx, self.offset.1 + dy);
        self
    }
}

pub(super) fn size_node<'a>(node: &'a Node, config: &SizingConfig) -> SizedNode<'a> {
    let explicit = node
        .size
        .map(|[width, height]| (width.max(1.0), height.max(1.0)));

    if node.kind == NodeKind::Group {
        return size_group(node, explicit, config);
    }
    if !node.children.is_empty() {
        tracing::trace!(id = %node.id, "ignoring children of a non-group node");
    }

    let (width, height) = explicit.unwrap_or_else(|| intrinsic_size(node, config));
    SizedNode {
        node,
        width: width.max(1.0),
        height: height.max(1.0),
        offset: (0.0, 0.0),
        children: Vec::new(),
    }
}

fn intrinsic_size(node: &Node, config: &SizingConfig) -> (f32, f32) {
    match node.kind {
        NodeKind::Icon | NodeKind::Other | NodeKind::Group => (
            config.icon_size,
            config.icon_size + config.icon_label_height,
        ),
        NodeKind::Composite => composite_size(node, config),
        NodeKind::TextBox => text_box_size(node, config),
    }
}

fn composite_size(node: &Node, config: &SizingConfig) -> (f32, f32) {
    let count = node.icons.len().max(1) as f32;
    let stride = config.composite_icon_size + config.composite_spacing;
    let along = count * stride + config.composite_padding;
    let across = config.composite_icon_size + config.composite_padding;
    match node.layout {
        LayoutDirection::Horizontal => (along, across + config.composite_label_height),
        LayoutDirection::Vertical => (across, along + config.composite_label_height),
    }
}

fn text_box_size(node: &Node, config: &SizingConfig) -> (f32, f32) {
    let chars = |text: &Option<String>| text.as_deref().map(|t| t.chars().count()).unwrap_or(0);
    let longest = chars(&node.label).max(chars(&node.sublabel));
    let width = (longest as f32 * config.text_char_width + config.text_padding_x)
        .max(config.text_min_width);
    let has_sublabel = node
        .sublabel
        .as_deref()
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false);
    let height = if has_sublabel {
        config.text_height_with_sublabel
    } else {
        config.text_height
    };
    (width, height)
}

fn size_group<'a>(
    node: &'a Node,
    explicit: Option<(f32, f32)>,
    config: &SizingConfig,
) -> SizedNode<'a> {
    let sized: Vec<SizedNode<'a>> = node
        .children
        .iter()
        .map(|child| size_node(child, config))
        .collect();
    let children = place_children(sized, node.layout, config);

    if let Some((width, height)) = explicit {
        return SizedNode {
            node,
            width,
            height,
            offset: (0.0, 0.0),
            children,
        };
    }

    if children.is_empty() {
        return SizedNode {
            node,
            width: config.empty_group_width.max(1.0),
            height: config.empty_group_height.max(1.0),
            offset: (0.0, 0.0),
            children,
        };
    }

    let pad = config.group_padding.max(0.0);
    let min_x = children
        .iter()
        .map(|child| child.offset.0)
        .fold(f32::INFINITY, f32::min);
    let min_y = children
        .iter()
        .map(|child| child.offset.1)
        .fold(f32::INFINITY, f32::min);
    let (dx, dy) = (pad - min_x, pad - min_y);
    let children: Vec<SizedNode<'a>> = children
        .into_iter()
        .map(|child| child.shifted(dx, dy))
        .collect();

    let max_x = children
        .iter()
        .map(|child| child.offset.0 + child.width)
        .fold(0.0f32, f32::max);
    let max_y = children
        .iter()
        .map(|child| child.offset.1 + child.height)
        .fold(0.0f32, f32::max);

    SizedNode {
        node,
        width: (max_x + pad).max(1.0),
        height: (max_y + pad).max(1.0),
        offset: (0.0, 0.0),
        children,
    }
}

/// Give every child a parent-relative offset. Explicit positions are kept as
/// offsets; the rest follow the parent's layout direction.
fn place_children<'a>(
    children: Vec<SizedNode<'a>>,
    direction: LayoutDirection,
    config: &SizingConfig,
) -> Vec<SizedNode<'a>> {
    let pad = config.group_padding.max(0.0);
    let spacing = config.child_spacing.max(0.0);

    let auto: Vec<&SizedNode<'a>> = children
        .iter()
        .filter(|child| child.node.position.is_none())
        .collect();
    let column_width = auto.iter().map(|child| child.width).fold(0.0f32, f32::max);
    // The second zig-zag column starts half a step lower.
    let stagger = auto
        .first()
        .map(|child| (child.height + spacing) / 2.0)
        .unwrap_or(0.0);

    let mut cursor_x = pad;
    let mut column_y = [pad, pad + stagger];
    let mut auto_index = 0usize;

    children
        .into_iter()
        .map(|child| {
            if let Some([x, y]) = child.node.position {
                return SizedNode {
                    offset: (x, y),
                    ..child
                };
            }
            let offset = match direction {
                LayoutDirection::Horizontal => {
                    let offset = (cursor_x, pad);
                    cursor_x += child.width + spacing;
                    offset
                }
                LayoutDirection::Vertical => {
                    let column = auto_index % 2;
                    let x = pad + column as f32 * (column_width + spacing);
                    let offset = (x, column_y[column]);
                    column_y[column] += child.height + spacing;
                    offset
                }
            };
            auto_index += 1;
            SizedNode { offset, ..child }
        })
        .collect()
}
