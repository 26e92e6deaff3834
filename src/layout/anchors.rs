use crate::config::LayoutConfig;
use crate::ir::Side;

use super::routing::{path_length, shape_path};
use super::types::{Bounds, ConnectorTopology};

/// Side pair a connection leaves and enters through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct SidePair {
    pub(super) exit: Side,
    pub(super) entry: Side,
}

/// Cost of connecting `from` to `to` through the given sides: length of the
/// path the topology implies, plus penalties and minus bonuses.
pub(super) fn score_pair(
    from: &Bounds,
    to: &Bounds,
    exit: Side,
    entry: Side,
    config: &LayoutConfig,
) -> f32 {
    let anchors = &config.anchors;
    let start = from.side_point(exit, 0.5);
    let end = to.side_point(entry, 0.5);
    let (topology, points) = shape_path(start, exit, end, entry, from, to, &config.routing);
    let mut score = path_length(&points);

    let (fx, fy) = from.center();
    let (tx, ty) = to.center();
    let (dx, dy) = (tx - fx, ty - fy);
    if exit == Side::toward(dx, dy).opposite() {
        score += anchors.opposing_penalty;
    }
    if entry == Side::toward(-dx, -dy).opposite() {
        score += anchors.opposing_penalty;
    }

    if entry == exit.opposite() && topology == ConnectorTopology::Straight {
        let dominant_horizontal = dx.abs() >= dy.abs();
        score -= if exit.is_horizontal() == dominant_horizontal {
            anchors.straight_bonus_dominant
        } else {
            anchors.straight_bonus_minor
        };
    }

    if topology == ConnectorTopology::LShape
        && dx.abs() <= anchors.l_shape_max_distance
        && dy.abs() <= anchors.l_shape_max_distance
    {
        score -= anchors.l_shape_bonus;
    }
    score
}

/// Lowest-scoring side pair. Pinned sides are kept; the rest are searched in
/// `Side::ALL` order and the first minimum wins.
pub(super) fn choose_sides(
    from: &Bounds,
    to: &Bounds,
    exit_pin: Option<Side>,
    entry_pin: Option<Side>,
    config: &LayoutConfig,
) -> SidePair {
    if let (Some(exit), Some(entry)) = (exit_pin, entry_pin) {
        return SidePair { exit, entry };
    }
    let exits: Vec<Side> = exit_pin.map_or_else(|| Side::ALL.to_vec(), |side| vec![side]);
    let entries: Vec<Side> = entry_pin.map_or_else(|| Side::ALL.to_vec(), |side| vec![side]);

    let mut best: Option<(f32, SidePair)> = None;
    for &exit in &exits {
        for &entry in &entries {
            let score = score_pair(from, to, exit, entry, config);
            if best.is_none_or(|(current, _)| score < current) {
                best = Some((score, SidePair { exit, entry }));
            }
        }
    }
    // Both lists are non-empty, so a pair was always scored.
    best.map(|(_, pair)| pair).unwrap_or(SidePair {
        exit: Side::Right,
        entry: Side::Left,
    })
}

/// Strip between `child` and the `container` boundary on `side`, as wide as
/// the child.
fn corridor(child: &Bounds, container: &Bounds, side: Side) -> Bounds {
    match side {
        Side::Right => Bounds::new(
            child.right(),
            child.y,
            (container.right() - child.right()).max(0.0),
            child.height,
        ),
        Side::Left => Bounds::new(
            container.x,
            child.y,
            (child.x - container.x).max(0.0),
            child.height,
        ),
        Side::Bottom => Bounds::new(
            child.x,
            child.bottom(),
            child.width,
            (container.bottom() - child.bottom()).max(0.0),
        ),
        Side::Top => Bounds::new(
            child.x,
            container.y,
            child.width,
            (child.y - container.y).max(0.0),
        ),
    }
}

fn overlaps(a: &Bounds, b: &Bounds) -> bool {
    a.x < b.right() && b.x < a.right() && a.y < b.bottom() && b.y < a.bottom()
}

/// Side through which a nested source leaves its container on the way to a
/// target outside it.
///
/// Each container side costs the corridor penalty when a sibling sits between
/// the child and that boundary, plus the distance to the boundary, plus the
/// Manhattan distance from the boundary exit point to the target centre. The
/// entry side faces the exit point unless pinned.
pub(super) fn choose_escape(
    child: &Bounds,
    container: &Bounds,
    siblings: &[Bounds],
    target: &Bounds,
    entry_pin: Option<Side>,
    config: &LayoutConfig,
) -> SidePair {
    let (cx, cy) = child.center();
    let (tx, ty) = target.center();
    let mut best: Option<(f32, Side, (f32, f32))> = None;
    for side in Side::ALL {
        let lane = corridor(child, container, side);
        let blocked = siblings.iter().any(|sibling| overlaps(&lane, sibling));
        let (reach, boundary_point) = match side {
            Side::Right => (lane.width, (container.right(), cy)),
            Side::Left => (lane.width, (container.x, cy)),
            Side::Bottom => (lane.height, (cx, container.bottom())),
            Side::Top => (lane.height, (cx, container.y)),
        };
        let mut score = reach + (tx - boundary_point.0).abs() + (ty - boundary_point.1).abs();
        if blocked {
            score += config.anchors.corridor_penalty;
        }
        if best.is_none_or(|(current, _, _)| score < current) {
            best = Some((score, side, boundary_point));
        }
    }
    let (exit, point) = best
        .map(|(_, side, point)| (side, point))
        .unwrap_or((Side::Right, (container.right(), cy)));
    let entry = entry_pin.unwrap_or_else(|| Side::toward(point.0 - tx, point.1 - ty));
    tracing::trace!(?exit, ?entry, "container escape chosen");
    SidePair { exit, entry }
}
