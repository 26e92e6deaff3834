use std::collections::{BTreeMap, HashMap};

use crate::config::AnchorConfig;
use crate::ir::Side;

use super::types::{AnchorInfo, Bounds, Point};

/// A connection whose sides are already chosen, waiting for slot indices.
#[derive(Debug, Clone)]
pub(super) struct PortRequest<'a> {
    pub(super) from: &'a str,
    pub(super) to: &'a str,
    pub(super) exit: Side,
    pub(super) entry: Side,
}

#[derive(Debug, Clone, Copy)]
struct PortCandidate {
    request_idx: usize,
    is_exit: bool,
    /// Far-end centre projected onto the side's running axis.
    other_pos: f32,
}

/// Assign each connection a slot on its exit side and its entry side.
///
/// Connections sharing a `(node, side)` are ordered by where their far end
/// sits along that side (X for top/bottom, Y for left/right), so anchors
/// follow the targets and connectors do not cross on the way out. Ties fall
/// back to input order.
pub(super) fn distribute_ports(
    requests: &[PortRequest<'_>],
    centers: &HashMap<&str, Point>,
) -> Vec<AnchorInfo> {
    let mut port_candidates: BTreeMap<(&str, Side), Vec<PortCandidate>> = BTreeMap::new();
    let project = |id: &str, side: Side| -> f32 {
        let (x, y) = centers.get(id).copied().unwrap_or((0.0, 0.0));
        if side.is_horizontal() { y } else { x }
    };
    for (request_idx, request) in requests.iter().enumerate() {
        port_candidates
            .entry((request.from, request.exit))
            .or_default()
            .push(PortCandidate {
                request_idx,
                is_exit: true,
                other_pos: project(request.to, request.exit),
            });
        port_candidates
            .entry((request.to, request.entry))
            .or_default()
            .push(PortCandidate {
                request_idx,
                is_exit: false,
                other_pos: project(request.from, request.entry),
            });
    }

    let mut anchors: Vec<AnchorInfo> = requests
        .iter()
        .map(|request| AnchorInfo {
            exit_side: request.exit,
            entry_side: request.entry,
            exit_index: 0,
            exit_total: 1,
            entry_index: 0,
            entry_total: 1,
        })
        .collect();

    for ((node, side), mut candidates) in port_candidates {
        candidates.sort_by(|a, b| {
            a.other_pos
                .partial_cmp(&b.other_pos)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.request_idx.cmp(&b.request_idx))
                .then(b.is_exit.cmp(&a.is_exit))
        });
        let total = candidates.len();
        if total > 1 {
            tracing::trace!(node, ?side, total, "sharing side between connections");
        }
        for (index, candidate) in candidates.iter().enumerate() {
            let anchor = &mut anchors[candidate.request_idx];
            if candidate.is_exit {
                anchor.exit_index = index;
                anchor.exit_total = total;
            } else {
                anchor.entry_index = index;
                anchor.entry_total = total;
            }
        }
    }
    anchors
}

/// Position along a side for slot `index` of `total`: the midpoint for a lone
/// connection, otherwise evenly spread inside a window centred on the
/// midpoint whose half-width grows by `spread_step / 2` per extra connection
/// and stops at `spread_max`.
pub(super) fn spread_ratio(index: usize, total: usize, config: &AnchorConfig) -> f32 {
    if total <= 1 {
        return 0.5;
    }
    let span = (total - 1) as f32;
    let half = (config.spread_step * span / 2.0).min(config.spread_max).max(0.0);
    0.5 - half + 2.0 * half * (index.min(total - 1) as f32) / span
}

pub(super) fn anchor_point(
    bounds: &Bounds,
    side: Side,
    index: usize,
    total: usize,
    config: &AnchorConfig,
) -> Point {
    bounds.side_point(side, spread_ratio(index, total, config))
}
