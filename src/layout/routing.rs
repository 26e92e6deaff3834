use std::collections::HashSet;

use crate::config::RoutingConfig;
use crate::ir::Side;

use super::types::{Bounds, ConnectorTopology, Point};

/// Coordinate comparisons below this are treated as equal.
const COORD_EPS: f32 = 1e-3;
/// Endpoint boxes are shrunk by this much before interior-segment tests so
/// that segments running along their border do not count as hits.
const ENDPOINT_SHRINK: f32 = 0.5;

#[derive(Debug, Clone)]
pub(super) struct Obstacle {
    pub(super) id: String,
    pub(super) bounds: Bounds,
}

/// Coordinates already used by routed segments during one render.
///
/// Vertical lanes are keyed by X, horizontal lanes by Y, both rounded to whole
/// units. Connections reserve in processing order, so later connections shift
/// away from earlier ones.
#[derive(Debug, Clone, Default)]
pub struct LaneRegistry {
    vertical: HashSet<i64>,
    horizontal: HashSet<i64>,
}

impl LaneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve_vertical(
        &mut self,
        x: f32,
        step: f32,
        max_shifts: usize,
        fits: impl Fn(f32) -> bool,
    ) -> f32 {
        reserve_lane(&mut self.vertical, x, step, max_shifts, fits)
    }

    pub fn reserve_horizontal(
        &mut self,
        y: f32,
        step: f32,
        max_shifts: usize,
        fits: impl Fn(f32) -> bool,
    ) -> f32 {
        reserve_lane(&mut self.horizontal, y, step, max_shifts, fits)
    }

    /// Number of claimed lanes across both axes.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.vertical.len() + self.horizontal.len()
    }
}

/// Round `coord` and reserve the nearest free lane that `fits` accepts,
/// trying `+step`, `-step`, `+2*step`, ... in turn. Gives up after
/// `max_shifts` attempts and returns the rounded coordinate unreserved.
fn reserve_lane(
    set: &mut HashSet<i64>,
    coord: f32,
    step: f32,
    max_shifts: usize,
    fits: impl Fn(f32) -> bool,
) -> f32 {
    let base = coord.round();
    let mut claim = |candidate: f32| {
        let key = candidate as i64;
        if set.contains(&key) || !fits(candidate) {
            return false;
        }
        set.insert(key)
    };
    if claim(base) {
        return base;
    }
    let step = step.abs().max(1.0);
    for attempt in 1..=max_shifts {
        let magnitude = attempt.div_ceil(2) as f32 * step;
        let candidate = if attempt % 2 == 1 {
            base + magnitude
        } else {
            base - magnitude
        };
        let candidate = candidate.round();
        if claim(candidate) {
            return candidate;
        }
    }
    tracing::trace!(coord = base, "no free lane found");
    base
}

/// One connection to route. Obstacles are pre-filtered to exclude both
/// endpoints and their ancestors/descendants.
#[derive(Debug, Clone)]
pub(super) struct RouteRequest<'a> {
    pub(super) start: Point,
    pub(super) exit: Side,
    pub(super) end: Point,
    pub(super) entry: Side,
    pub(super) from: Bounds,
    pub(super) to: Bounds,
    pub(super) obstacles: &'a [Obstacle],
    pub(super) self_loop: bool,
    /// Container the source must leave before travelling to the target.
    pub(super) escape: Option<Bounds>,
}

#[derive(Debug, Clone)]
pub(super) struct RoutedPath {
    pub(super) topology: ConnectorTopology,
    pub(super) points: Vec<Point>,
    pub(super) collisions: usize,
}

fn offset(point: Point, side: Side, distance: f32) -> Point {
    let (nx, ny) = side.normal();
    (point.0 + nx * distance, point.1 + ny * distance)
}

/// Signed progress from `from` to `to` along `side`'s outward normal.
fn along(side: Side, from: Point, to: Point) -> f32 {
    let (nx, ny) = side.normal();
    (to.0 - from.0) * nx + (to.1 - from.1) * ny
}

/// Topology implied by the sides and endpoint geometry, before obstacles.
pub(super) fn classify(
    start: Point,
    exit: Side,
    end: Point,
    entry: Side,
    config: &RoutingConfig,
) -> ConnectorTopology {
    if exit == entry {
        return ConnectorTopology::UShape;
    }
    if entry == exit.opposite() {
        if along(exit, start, end) <= COORD_EPS {
            return ConnectorTopology::Detour;
        }
        let perpendicular = if exit.is_horizontal() {
            (end.1 - start.1).abs()
        } else {
            (end.0 - start.0).abs()
        };
        if perpendicular < config.straight_tolerance {
            return ConnectorTopology::Straight;
        }
        return ConnectorTopology::ZShape;
    }
    let corner = l_corner(start, exit, end);
    if along(exit, start, corner) > COORD_EPS && along(entry, end, corner) > COORD_EPS {
        ConnectorTopology::LShape
    } else {
        ConnectorTopology::Detour
    }
}

fn l_corner(start: Point, exit: Side, end: Point) -> Point {
    if exit.is_horizontal() {
        (end.0, start.1)
    } else {
        (start.0, end.1)
    }
}

/// Waypoints for a connector of the classified topology, ignoring obstacles.
pub(super) fn shape_path(
    start: Point,
    exit: Side,
    end: Point,
    entry: Side,
    from: &Bounds,
    to: &Bounds,
    config: &RoutingConfig,
) -> (ConnectorTopology, Vec<Point>) {
    let topology = classify(start, exit, end, entry, config);
    let points = match topology {
        ConnectorTopology::Straight => {
            // Within tolerance but not aligned: jog halfway instead of a diagonal.
            if exit.is_horizontal() && (end.1 - start.1).abs() > COORD_EPS {
                z_path(start, end, (start.0 + end.0) / 2.0, true)
            } else if !exit.is_horizontal() && (end.0 - start.0).abs() > COORD_EPS {
                z_path(start, end, (start.1 + end.1) / 2.0, false)
            } else {
                vec![start, end]
            }
        }
        ConnectorTopology::LShape => vec![start, l_corner(start, exit, end), end],
        ConnectorTopology::ZShape => {
            if exit.is_horizontal() {
                let mid = (start.0 + end.0) / 2.0;
                z_path(start, end, mid, true)
            } else {
                let mid = (start.1 + end.1) / 2.0;
                z_path(start, end, mid, false)
            }
        }
        ConnectorTopology::UShape => {
            let lane = u_lane(start, end, exit, from, to, config.u_detour);
            u_path(start, end, exit, lane)
        }
        ConnectorTopology::Detour | ConnectorTopology::SelfLoop => {
            stub_detour(start, exit, end, entry, from, to, config)
        }
    };
    (topology, points)
}

fn z_path(start: Point, end: Point, mid: f32, vertical_middle: bool) -> Vec<Point> {
    if vertical_middle {
        vec![start, (mid, start.1), (mid, end.1), end]
    } else {
        vec![start, (start.0, mid), (end.0, mid), end]
    }
}

/// Lane for a same-side connector: past both endpoints and both boxes.
fn u_lane(start: Point, end: Point, side: Side, from: &Bounds, to: &Bounds, detour: f32) -> f32 {
    match side {
        Side::Right => start.0.max(end.0).max(from.right()).max(to.right()) + detour,
        Side::Left => start.0.min(end.0).min(from.x).min(to.x) - detour,
        Side::Bottom => start.1.max(end.1).max(from.bottom()).max(to.bottom()) + detour,
        Side::Top => start.1.min(end.1).min(from.y).min(to.y) - detour,
    }
}

fn u_path(start: Point, end: Point, side: Side, lane: f32) -> Vec<Point> {
    if side.is_horizontal() {
        vec![start, (lane, start.1), (lane, end.1), end]
    } else {
        vec![start, (start.0, lane), (end.0, lane), end]
    }
}

/// Stub out of both anchors, then join the stubs through a channel that runs
/// between the two boxes when they are separated, or around them otherwise.
fn stub_detour(
    start: Point,
    exit: Side,
    end: Point,
    entry: Side,
    from: &Bounds,
    to: &Bounds,
    config: &RoutingConfig,
) -> Vec<Point> {
    let stub = config.stub_length.max(1.0);
    let s = offset(start, exit, stub);
    let e = offset(end, entry, stub);
    let channel_horizontal = exit.is_horizontal();
    let channel = if channel_horizontal {
        if from.bottom() < to.y {
            (from.bottom() + to.y) / 2.0
        } else if to.bottom() < from.y {
            (to.bottom() + from.y) / 2.0
        } else {
            from.bottom().max(to.bottom()) + stub
        }
    } else if from.right() < to.x {
        (from.right() + to.x) / 2.0
    } else if to.right() < from.x {
        (to.right() + from.x) / 2.0
    } else {
        from.right().max(to.right()) + stub
    };
    channel_path(start, s, e, end, channel, channel_horizontal)
}

fn channel_path(
    start: Point,
    s: Point,
    e: Point,
    end: Point,
    channel: f32,
    horizontal: bool,
) -> Vec<Point> {
    if horizontal {
        vec![start, s, (s.0, channel), (e.0, channel), e, end]
    } else {
        vec![start, s, (channel, s.1), (channel, e.1), e, end]
    }
}

fn self_loop_path(start: Point, end: Point, node: &Bounds, config: &RoutingConfig) -> Vec<Point> {
    let pad = config.u_detour.max(1.0);
    let lane_x = node.right() + pad;
    let lane_y = node.y - pad;
    vec![start, (lane_x, start.1), (lane_x, lane_y), (end.0, lane_y), end]
}

/// Route one connection: shape, avoid obstacles, then claim lanes.
pub(super) fn route_connection(
    request: &RouteRequest<'_>,
    lanes: &mut LaneRegistry,
    config: &RoutingConfig,
) -> RoutedPath {
    if request.self_loop {
        let hits_of = |points: &[Point]| count_hits(points, request.obstacles, None, None);
        let mut points = compress_path(&self_loop_path(request.start, request.end, &request.from, config));
        reserve_interior_lanes(&mut points, lanes, config, &hits_of);
        let collisions = hits_of(points.as_slice());
        return RoutedPath {
            topology: ConnectorTopology::SelfLoop,
            points,
            collisions,
        };
    }

    let mut prefix: Vec<Point> = Vec::new();
    let mut route_start = request.start;
    let mut source_box = request.from;
    if let Some(container) = request.escape {
        let margin = config.obstacle_margin.max(1.0);
        let escape_point = match request.exit {
            Side::Right => (container.right() + margin, request.start.1),
            Side::Left => (container.x - margin, request.start.1),
            Side::Bottom => (request.start.0, container.bottom() + margin),
            Side::Top => (request.start.0, container.y - margin),
        };
        prefix.push(request.start);
        route_start = escape_point;
        source_box = container;
    }

    let (topology, base) = shape_path(
        route_start,
        request.exit,
        request.end,
        request.entry,
        &source_box,
        &request.to,
        config,
    );
    let (topology, path) = avoid_obstacles(
        topology,
        base,
        route_start,
        request,
        &source_box,
        config,
    );

    let mut points = prefix;
    points.extend(path);
    let mut points = compress_path(&points);
    let hits_of = |points: &[Point]| {
        count_hits(points, request.obstacles, Some(&source_box), Some(&request.to))
    };
    reserve_interior_lanes(&mut points, lanes, config, &hits_of);
    let collisions = hits_of(points.as_slice());
    if collisions > 0 {
        tracing::debug!(collisions, ?topology, "route still crosses obstacles");
    }
    tracing::trace!(?topology, length = path_length(&points), "routed connection");
    RoutedPath {
        topology,
        points,
        collisions,
    }
}

fn avoid_obstacles(
    topology: ConnectorTopology,
    base: Vec<Point>,
    start: Point,
    request: &RouteRequest<'_>,
    source_box: &Bounds,
    config: &RoutingConfig,
) -> (ConnectorTopology, Vec<Point>) {
    let hits_of = |points: &[Point]| {
        count_hits(points, request.obstacles, Some(source_box), Some(&request.to))
    };
    let base_hits = hits_of(base.as_slice());
    if base_hits == 0 {
        return (topology, base);
    }

    let end = request.end;
    let margin = config.obstacle_margin.max(0.0);

    // Single free coordinate: the middle of a Z or the lane of a U.
    let probe = match topology {
        // A jogged straight line has the same free middle as a Z.
        ConnectorTopology::ZShape | ConnectorTopology::Straight if base.len() == 4 => {
            let vertical_middle = request.exit.is_horizontal();
            let original = if vertical_middle { base[1].0 } else { base[1].1 };
            let (lo, hi) = if vertical_middle {
                (start.0.min(end.0), start.0.max(end.0))
            } else {
                (start.1.min(end.1), start.1.max(end.1))
            };
            let candidates = obstacle_edges(request.obstacles, vertical_middle, margin)
                .into_iter()
                .filter(|value| *value > lo + COORD_EPS && *value < hi - COORD_EPS);
            best_probe(original, candidates, |value| z_path(start, end, value, vertical_middle), &hits_of)
        }
        ConnectorTopology::UShape => {
            let side = request.exit;
            let original = if side.is_horizontal() { base[1].0 } else { base[1].1 };
            let outward = |value: f32| match side {
                Side::Right | Side::Bottom => value > original,
                Side::Left | Side::Top => value < original,
            };
            let candidates = obstacle_edges(request.obstacles, side.is_horizontal(), margin)
                .into_iter()
                .filter(|value| outward(*value));
            best_probe(original, candidates, |value| u_path(start, end, side, value), &hits_of)
        }
        _ => None,
    };
    if let Some(points) = probe {
        return (topology, points);
    }

    // Longer stub-and-channel detour around the obstacles.
    let stub = config.stub_length.max(1.0);
    let s = offset(start, request.exit, stub);
    let e = offset(end, request.entry, stub);
    let mut best: Option<(usize, f32, Vec<Point>)> = None;
    for horizontal in [true, false] {
        let mut channels = obstacle_edges(request.obstacles, !horizontal, margin);
        for bounds in [source_box, &request.to] {
            if horizontal {
                channels.push(bounds.y - margin);
                channels.push(bounds.bottom() + margin);
            } else {
                channels.push(bounds.x - margin);
                channels.push(bounds.right() + margin);
            }
        }
        for channel in channels {
            let candidate = compress_path(&channel_path(start, s, e, end, channel, horizontal));
            let hits = hits_of(candidate.as_slice());
            let length = path_length(&candidate);
            let better = match &best {
                None => true,
                Some((best_hits, best_len, _)) => {
                    hits < *best_hits || (hits == *best_hits && length < *best_len - COORD_EPS)
                }
            };
            if better {
                best = Some((hits, length, candidate));
            }
        }
    }

    match best {
        Some((hits, _, points)) if hits < base_hits => (ConnectorTopology::Detour, points),
        _ => {
            tracing::trace!(hits = base_hits, "no detour clears obstacles; keeping shape");
            (topology, base)
        }
    }
}

/// Coordinates just outside every obstacle on one axis: X values when
/// `x_axis`, Y values otherwise.
fn obstacle_edges(obstacles: &[Obstacle], x_axis: bool, margin: f32) -> Vec<f32> {
    let mut values = Vec::with_capacity(obstacles.len() * 2);
    for obstacle in obstacles {
        let b = &obstacle.bounds;
        if x_axis {
            values.push(b.x - margin);
            values.push(b.right() + margin);
        } else {
            values.push(b.y - margin);
            values.push(b.bottom() + margin);
        }
    }
    values
}

/// Collision-free candidate closest to `original`, if any.
fn best_probe(
    original: f32,
    candidates: impl Iterator<Item = f32>,
    build: impl Fn(f32) -> Vec<Point>,
    hits_of: &impl Fn(&[Point]) -> usize,
) -> Option<Vec<Point>> {
    let mut ordered: Vec<f32> = candidates.collect();
    ordered.sort_by(|a, b| {
        (a - original)
            .abs()
            .partial_cmp(&(b - original).abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ordered
        .into_iter()
        .map(build)
        .find(|points| hits_of(points.as_slice()) == 0)
}

/// Reserve a lane for every segment that touches neither endpoint, shifting
/// the segment when its coordinate is taken. A shift is only accepted when it
/// adds no hits and leaves both neighbouring segments running the same way.
fn reserve_interior_lanes(
    points: &mut [Point],
    lanes: &mut LaneRegistry,
    config: &RoutingConfig,
    hits_of: &impl Fn(&[Point]) -> usize,
) {
    if points.len() < 4 {
        return;
    }
    for idx in 1..points.len() - 2 {
        let (a, b) = (points[idx], points[idx + 1]);
        let vertical = (a.0 - b.0).abs() <= COORD_EPS;
        if !vertical && (a.1 - b.1).abs() > COORD_EPS {
            continue;
        }
        let current = points.to_vec();
        let baseline = hits_of(current.as_slice());
        let fits = |lane: f32| {
            let mut trial = current.clone();
            move_segment(&mut trial, idx, vertical, lane);
            keeps_direction(&current, &trial, idx, vertical) && hits_of(trial.as_slice()) <= baseline
        };
        let lane = if vertical {
            lanes.reserve_vertical(a.0, config.lane_step, config.max_lane_shifts, fits)
        } else {
            lanes.reserve_horizontal(a.1, config.lane_step, config.max_lane_shifts, fits)
        };
        move_segment(points, idx, vertical, lane);
    }
}

fn move_segment(points: &mut [Point], idx: usize, vertical: bool, lane: f32) {
    for point in &mut points[idx..=idx + 1] {
        if vertical {
            point.0 = lane;
        } else {
            point.1 = lane;
        }
    }
}

/// Segments on either side of `idx` must keep their sign and a non-zero length.
fn keeps_direction(before: &[Point], after: &[Point], idx: usize, vertical: bool) -> bool {
    let coord = |p: Point| if vertical { p.0 } else { p.1 };
    [(idx - 1, idx), (idx + 1, idx + 2)].into_iter().all(|(i, j)| {
        let was = coord(before[j]) - coord(before[i]);
        let now = coord(after[j]) - coord(after[i]);
        was.abs() <= COORD_EPS || (now.abs() > COORD_EPS && now.signum() == was.signum())
    })
}

/// Obstacle hits along a path. Endpoint boxes, when given, only count against
/// interior segments.
pub(super) fn count_hits(
    points: &[Point],
    obstacles: &[Obstacle],
    from: Option<&Bounds>,
    to: Option<&Bounds>,
) -> usize {
    if points.len() < 2 {
        return 0;
    }
    let last_segment = points.len() - 2;
    let endpoint_boxes: Vec<Bounds> = [from, to]
        .into_iter()
        .flatten()
        .map(|b| b.inflate(-ENDPOINT_SHRINK))
        .filter(|b| b.width > 0.0 && b.height > 0.0)
        .collect();
    let mut count = 0usize;
    for (idx, segment) in points.windows(2).enumerate() {
        let (a, b) = (segment[0], segment[1]);
        for obstacle in obstacles {
            if segment_intersects_rect(a, b, &obstacle.bounds) {
                tracing::trace!(obstacle = %obstacle.id, "segment crosses obstacle");
                count += 1;
            }
        }
        if idx > 0 && idx < last_segment {
            for bounds in &endpoint_boxes {
                if segment_intersects_rect(a, b, bounds) {
                    count += 1;
                }
            }
        }
    }
    count
}

pub(super) fn path_length(points: &[Point]) -> f32 {
    let mut length = 0.0;
    for segment in points.windows(2) {
        let dx = segment[1].0 - segment[0].0;
        let dy = segment[1].1 - segment[0].1;
        length += (dx * dx + dy * dy).sqrt();
    }
    length
}

/// Drop duplicate and collinear interior points. The first and last points
/// are always kept.
pub(super) fn compress_path(points: &[Point]) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    out.push(points[0]);
    let last = points[points.len() - 1];
    for &curr in &points[1..points.len() - 1] {
        let prev = out[out.len() - 1];
        if (curr.0 - prev.0).abs() <= 1e-4 && (curr.1 - prev.1).abs() <= 1e-4 {
            continue;
        }
        out.push(curr);
    }
    out.push(last);

    // Collapse runs of collinear points; repeat until stable.
    loop {
        let mut changed = false;
        let mut idx = 1;
        while idx + 1 < out.len() {
            let (p0, p1, p2) = (out[idx - 1], out[idx], out[idx + 1]);
            let same_x = (p0.0 - p1.0).abs() <= 1e-4 && (p1.0 - p2.0).abs() <= 1e-4;
            let same_y = (p0.1 - p1.1).abs() <= 1e-4 && (p1.1 - p2.1).abs() <= 1e-4;
            let duplicate = (p1.0 - p2.0).abs() <= 1e-4 && (p1.1 - p2.1).abs() <= 1e-4;
            if same_x || same_y || duplicate {
                out.remove(idx);
                changed = true;
            } else {
                idx += 1;
            }
        }
        if !changed {
            break;
        }
    }
    out
}

/// Closed-rectangle test: clip the segment's parameter range against each slab.
pub(super) fn segment_intersects_rect(a: Point, b: Point, rect: &Bounds) -> bool {
    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    let slabs = [
        (a.0, b.0 - a.0, rect.x, rect.right()),
        (a.1, b.1 - a.1, rect.y, rect.bottom()),
    ];
    for (origin, delta, lo, hi) in slabs {
        if delta.abs() <= f32::EPSILON {
            if origin < lo || origin > hi {
                return false;
            }
            continue;
        }
        let (near, far) = {
            let t_lo = (lo - origin) / delta;
            let t_hi = (hi - origin) / delta;
            (t_lo.min(t_hi), t_lo.max(t_hi))
        };
        t0 = t0.max(near);
        t1 = t1.min(far);
        if t0 > t1 {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RoutingConfig {
        RoutingConfig::default()
    }

    fn obstacle(id: &str, x: f32, y: f32, w: f32, h: f32) -> Obstacle {
        Obstacle {
            id: id.to_string(),
            bounds: Bounds::new(x, y, w, h),
        }
    }

    fn is_orthogonal(points: &[Point]) -> bool {
        points.windows(2).all(|seg| {
            (seg[0].0 - seg[1].0).abs() <= 1e-3 || (seg[0].1 - seg[1].1).abs() <= 1e-3
        })
    }

    fn request<'a>(
        from: Bounds,
        exit: Side,
        to: Bounds,
        entry: Side,
        obstacles: &'a [Obstacle],
    ) -> RouteRequest<'a> {
        RouteRequest {
            start: from.side_point(exit, 0.5),
            exit,
            end: to.side_point(entry, 0.5),
            entry,
            from,
            to,
            obstacles,
            self_loop: false,
            escape: None,
        }
    }

    #[test]
    fn classifies_by_side_pair() {
        let cfg = config();
        assert_eq!(
            classify((0.0, 0.0), Side::Right, (100.0, 4.0), Side::Left, &cfg),
            ConnectorTopology::Straight
        );
        assert_eq!(
            classify((0.0, 0.0), Side::Right, (100.0, 40.0), Side::Left, &cfg),
            ConnectorTopology::ZShape
        );
        assert_eq!(
            classify((0.0, 0.0), Side::Right, (100.0, 100.0), Side::Top, &cfg),
            ConnectorTopology::LShape
        );
        assert_eq!(
            classify((0.0, 0.0), Side::Top, (100.0, 0.0), Side::Top, &cfg),
            ConnectorTopology::UShape
        );
        assert_eq!(
            classify((100.0, 0.0), Side::Right, (0.0, 0.0), Side::Left, &cfg),
            ConnectorTopology::Detour
        );
    }

    #[test]
    fn z_shape_bends_at_midpoint() {
        let from = Bounds::new(0.0, 0.0, 40.0, 40.0);
        let to = Bounds::new(200.0, 100.0, 40.0, 40.0);
        let (topology, points) = shape_path(
            from.side_point(Side::Right, 0.5),
            Side::Right,
            to.side_point(Side::Left, 0.5),
            Side::Left,
            &from,
            &to,
            &config(),
        );
        assert_eq!(topology, ConnectorTopology::ZShape);
        assert_eq!(points, vec![(40.0, 20.0), (120.0, 20.0), (120.0, 120.0), (200.0, 120.0)]);
    }

    #[test]
    fn u_shape_clears_both_boxes() {
        let from = Bounds::new(0.0, 50.0, 40.0, 40.0);
        let to = Bounds::new(100.0, 0.0, 40.0, 40.0);
        let (topology, points) = shape_path(
            from.side_point(Side::Top, 0.5),
            Side::Top,
            to.side_point(Side::Top, 0.5),
            Side::Top,
            &from,
            &to,
            &config(),
        );
        assert_eq!(topology, ConnectorTopology::UShape);
        assert_eq!(points[1].1, -40.0);
        assert_eq!(points[2].1, -40.0);
    }

    #[test]
    fn straight_route_detours_around_blocker() {
        let from = Bounds::new(0.0, 0.0, 40.0, 40.0);
        let to = Bounds::new(300.0, 0.0, 40.0, 40.0);
        let obstacles = vec![obstacle("mid", 140.0, -10.0, 40.0, 60.0)];
        let req = request(from, Side::Right, to, Side::Left, &obstacles);
        let mut lanes = LaneRegistry::new();
        let routed = route_connection(&req, &mut lanes, &config());
        assert_eq!(routed.collisions, 0);
        assert_eq!(routed.topology, ConnectorTopology::Detour);
        assert_eq!(routed.points.first(), Some(&(40.0, 20.0)));
        assert_eq!(routed.points.last(), Some(&(300.0, 20.0)));
        assert!(is_orthogonal(&routed.points));
        assert_eq!(count_hits(&routed.points, &obstacles, None, None), 0);
    }

    #[test]
    fn z_route_probes_middle_lane_past_obstacle() {
        let from = Bounds::new(0.0, 0.0, 40.0, 40.0);
        let to = Bounds::new(300.0, 200.0, 40.0, 40.0);
        // Sits on the default midpoint x = 170.
        let obstacles = vec![obstacle("mid", 150.0, 60.0, 40.0, 80.0)];
        let req = request(from, Side::Right, to, Side::Left, &obstacles);
        let mut lanes = LaneRegistry::new();
        let routed = route_connection(&req, &mut lanes, &config());
        assert_eq!(routed.topology, ConnectorTopology::ZShape);
        assert_eq!(routed.collisions, 0);
        assert_eq!(routed.points.len(), 4);
        let mid = routed.points[1].0;
        assert!(mid <= 135.0 || mid >= 205.0);
    }

    #[test]
    fn lanes_shift_parallel_segments() {
        let cfg = config();
        let mut lanes = LaneRegistry::new();
        let from = Bounds::new(0.0, 0.0, 40.0, 40.0);
        let to = Bounds::new(200.0, 100.0, 40.0, 40.0);
        let req = request(from, Side::Right, to, Side::Left, &[]);
        let first = route_connection(&req, &mut lanes, &cfg);
        let second = route_connection(&req, &mut lanes, &cfg);
        assert_eq!(first.points[1].0, 120.0);
        assert_eq!(second.points[1].0, 135.0);
        assert_eq!(lanes.len(), 2);
        assert_eq!(second.points.first(), first.points.first());
        assert_eq!(second.points.last(), first.points.last());
    }

    #[test]
    fn reserve_lane_alternates_around_taken_value() {
        let mut lanes = LaneRegistry::new();
        assert_eq!(lanes.reserve_horizontal(99.6, 15.0, 8, |_| true), 100.0);
        assert_eq!(lanes.reserve_horizontal(100.2, 15.0, 8, |_| true), 115.0);
        assert_eq!(lanes.reserve_horizontal(100.0, 15.0, 8, |_| true), 85.0);
        assert_eq!(lanes.len(), 3);
    }

    #[test]
    fn reserve_lane_skips_rejected_candidates() {
        let mut lanes = LaneRegistry::new();
        assert_eq!(lanes.reserve_vertical(100.0, 15.0, 8, |_| true), 100.0);
        // +15 is refused, so the next free lane is -15.
        assert_eq!(lanes.reserve_vertical(100.0, 15.0, 8, |x| x != 115.0), 85.0);
        // Nothing acceptable: fall back to the rounded base without claiming it.
        assert_eq!(lanes.reserve_vertical(100.4, 15.0, 8, |_| false), 100.0);
        assert_eq!(lanes.len(), 2);
    }

    #[test]
    fn lane_shift_does_not_undo_obstacle_probe() {
        let cfg = config();
        let mut lanes = LaneRegistry::new();
        let from = Bounds::new(0.0, 0.0, 40.0, 40.0);
        let to = Bounds::new(300.0, 200.0, 40.0, 40.0);
        let obstacles = vec![obstacle("mid", 150.0, 60.0, 40.0, 80.0)];
        let req = request(from, Side::Right, to, Side::Left, &obstacles);
        let first = route_connection(&req, &mut lanes, &cfg);
        let second = route_connection(&req, &mut lanes, &cfg);
        assert_eq!(first.points[1].0, 135.0);
        assert_eq!(first.collisions, 0);
        // 150 would sit on the obstacle's left edge; 120 is clear.
        assert_eq!(second.points[1].0, 120.0);
        assert_eq!(second.collisions, 0);
        assert!(is_orthogonal(&second.points));
    }

    #[test]
    fn crowded_lanes_stay_between_endpoints() {
        let cfg = config();
        let mut lanes = LaneRegistry::new();
        let from = Bounds::new(0.0, 40.0, 48.0, 48.0);
        let to = Bounds::new(168.0, 340.0, 48.0, 48.0);
        let req = request(from, Side::Right, to, Side::Left, &[]);
        for _ in 0..10 {
            let routed = route_connection(&req, &mut lanes, &cfg);
            assert_eq!(routed.points.first(), Some(&(48.0, 64.0)));
            assert_eq!(routed.points.last(), Some(&(168.0, 364.0)));
            assert_eq!(routed.points.len(), 4);
            let mid = routed.points[1].0;
            assert!(mid > 48.0 && mid < 168.0, "lane {mid} left the gap");
            assert_eq!(routed.collisions, 0);
            assert_eq!(count_hits(&routed.points, &[], Some(&from), Some(&to)), 0);
        }
    }

    #[test]
    fn near_aligned_straight_jogs_instead_of_going_diagonal() {
        let from = Bounds::new(0.0, 0.0, 40.0, 40.0);
        let to = Bounds::new(200.0, 4.0, 40.0, 40.0);
        let req = request(from, Side::Right, to, Side::Left, &[]);
        let routed = route_connection(&req, &mut LaneRegistry::new(), &config());
        assert_eq!(routed.topology, ConnectorTopology::Straight);
        assert_eq!(
            routed.points,
            vec![(40.0, 20.0), (120.0, 20.0), (120.0, 24.0), (200.0, 24.0)]
        );

        let below = Bounds::new(4.0, 200.0, 40.0, 40.0);
        let req = request(from, Side::Bottom, below, Side::Top, &[]);
        let routed = route_connection(&req, &mut LaneRegistry::new(), &config());
        assert_eq!(routed.topology, ConnectorTopology::Straight);
        assert_eq!(routed.points.first(), Some(&(20.0, 40.0)));
        assert_eq!(routed.points.last(), Some(&(24.0, 200.0)));
        assert!(is_orthogonal(&routed.points));
    }

    #[test]
    fn self_loop_wraps_top_right_corner() {
        let node = Bounds::new(0.0, 0.0, 40.0, 40.0);
        let req = RouteRequest {
            start: node.side_point(Side::Right, 0.5),
            exit: Side::Right,
            end: node.side_point(Side::Top, 0.5),
            entry: Side::Top,
            from: node,
            to: node,
            obstacles: &[],
            self_loop: true,
            escape: None,
        };
        let routed = route_connection(&req, &mut LaneRegistry::new(), &config());
        assert_eq!(routed.topology, ConnectorTopology::SelfLoop);
        assert_eq!(routed.points.first(), Some(&(40.0, 20.0)));
        assert_eq!(routed.points.last(), Some(&(20.0, 0.0)));
        assert!(routed.points.iter().all(|p| !(p.0 > 0.5 && p.0 < 39.5 && p.1 > 0.5 && p.1 < 39.5)));
    }

    #[test]
    fn escape_leaves_container_first() {
        let child = Bounds::new(50.0, 50.0, 40.0, 40.0);
        let container = Bounds::new(10.0, 10.0, 200.0, 200.0);
        let target = Bounds::new(400.0, 50.0, 40.0, 40.0);
        let mut req = request(child, Side::Right, target, Side::Left, &[]);
        req.escape = Some(container);
        let routed = route_connection(&req, &mut LaneRegistry::new(), &config());
        assert_eq!(routed.points.first(), Some(&(90.0, 70.0)));
        assert_eq!(routed.points.last(), Some(&(400.0, 70.0)));
        assert!(is_orthogonal(&routed.points));
    }

    #[test]
    fn backward_connection_routes_around_both_nodes() {
        let from = Bounds::new(300.0, 0.0, 40.0, 40.0);
        let to = Bounds::new(0.0, 0.0, 40.0, 40.0);
        let req = request(from, Side::Right, to, Side::Left, &[]);
        let routed = route_connection(&req, &mut LaneRegistry::new(), &config());
        assert!(is_orthogonal(&routed.points));
        assert_eq!(
            count_hits(&routed.points, &[], Some(&from), Some(&to)),
            0,
            "detour must not cut through its own endpoints"
        );
    }

    #[test]
    fn compress_drops_collinear_points() {
        let points = vec![(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (20.0, 10.0), (20.0, 10.0), (30.0, 10.0)];
        assert_eq!(
            compress_path(&points),
            vec![(0.0, 0.0), (20.0, 0.0), (20.0, 10.0), (30.0, 10.0)]
        );
    }

    #[test]
    fn path_length_sums_segments() {
        let orth = vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (20.0, 10.0)];
        assert_eq!(path_length(&orth), 30.0);
    }

    #[test]
    fn segment_rect_intersection() {
        let rect = Bounds::new(10.0, 10.0, 10.0, 10.0);
        assert!(segment_intersects_rect((0.0, 15.0), (30.0, 15.0), &rect));
        assert!(!segment_intersects_rect((0.0, 25.0), (30.0, 25.0), &rect));
        // Touching an edge counts; stopping short does not.
        assert!(segment_intersects_rect((20.0, 0.0), (20.0, 30.0), &rect));
        assert!(!segment_intersects_rect((0.0, 15.0), (9.0, 15.0), &rect));
        assert!(segment_intersects_rect((0.0, 0.0), (30.0, 30.0), &rect));
        assert!(!segment_intersects_rect((0.0, 30.0), (8.0, 22.0), &rect));
    }
}
