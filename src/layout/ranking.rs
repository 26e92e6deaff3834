use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

use super::types::Point;

/// Adjacency over a fixed node-id set. Edges touching unknown ids and
/// self-loops never enter the graph.
#[derive(Debug, Clone, Default)]
pub(super) struct LayerGraph {
    /// Node ids in declared order.
    pub(super) order: Vec<String>,
    pub(super) in_degree: HashMap<String, usize>,
    pub(super) outgoing: HashMap<String, Vec<String>>,
    pub(super) incoming: HashMap<String, Vec<String>>,
}

impl LayerGraph {
    pub(super) fn build<'a>(
        node_ids: &[String],
        edges: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let known: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
        let mut graph = LayerGraph {
            order: node_ids.to_vec(),
            in_degree: node_ids.iter().map(|id| (id.clone(), 0)).collect(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        };
        for (from, to) in edges {
            if !known.contains(from) || !known.contains(to) {
                tracing::trace!(from, to, "skipping edge with unknown endpoint");
                continue;
            }
            if from == to {
                continue;
            }
            graph
                .outgoing
                .entry(from.to_string())
                .or_default()
                .push(to.to_string());
            graph
                .incoming
                .entry(to.to_string())
                .or_default()
                .push(from.to_string());
            if let Some(deg) = graph.in_degree.get_mut(to) {
                *deg += 1;
            }
        }
        graph
    }

    pub(super) fn successors(&self, id: &str) -> &[String] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(super) fn predecessors(&self, id: &str) -> &[String] {
        self.incoming.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Longest-path layering by BFS relaxation from zero-in-degree roots.
///
/// A fully cyclic graph seeds the first declared node as a synthetic root.
/// Nodes still unreached afterwards (cyclic components with no root of their
/// own) are seeded one layer past the current maximum, in declared order.
/// Seeds keep their layer, and relaxation never pushes a node to or beyond
/// `seed + node_count`, so cycles terminate.
pub(super) fn assign_layers(graph: &LayerGraph) -> HashMap<String, usize> {
    let count = graph.order.len();
    let mut layers: HashMap<String, usize> = HashMap::with_capacity(count);
    if count == 0 {
        return layers;
    }

    let mut seeds: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    for id in &graph.order {
        if graph.in_degree.get(id).copied().unwrap_or(0) == 0 {
            layers.insert(id.clone(), 0);
            queue.push_back(id.clone());
        }
    }
    if queue.is_empty() {
        let root = &graph.order[0];
        tracing::debug!(root = %root, "no zero in-degree node; using synthetic root");
        layers.insert(root.clone(), 0);
        seeds.insert(root.clone());
        queue.push_back(root.clone());
    }
    relax_layers(graph, &mut layers, &mut queue, &seeds, count);

    while let Some(seed) = graph.order.iter().find(|id| !layers.contains_key(*id)) {
        let next_layer = layers.values().copied().max().map_or(0, |max| max + 1);
        tracing::debug!(seed = %seed, layer = next_layer, "seeding unreached component");
        layers.insert(seed.clone(), next_layer);
        seeds.insert(seed.clone());
        queue.push_back(seed.clone());
        relax_layers(graph, &mut layers, &mut queue, &seeds, next_layer + count);
    }

    layers
}

fn relax_layers(
    graph: &LayerGraph,
    layers: &mut HashMap<String, usize>,
    queue: &mut VecDeque<String>,
    seeds: &HashSet<String>,
    bound: usize,
) {
    while let Some(id) = queue.pop_front() {
        let Some(&layer) = layers.get(&id) else {
            continue;
        };
        for next in graph.successors(&id) {
            let candidate = layer + 1;
            if candidate >= bound || seeds.contains(next) {
                continue;
            }
            if layers.get(next).is_some_and(|existing| *existing >= candidate) {
                continue;
            }
            layers.insert(next.clone(), candidate);
            queue.push_back(next.clone());
        }
    }
}

/// Group ids by layer, keeping declared order inside each bucket.
pub(super) fn layer_buckets(order: &[String], layers: &HashMap<String, usize>) -> Vec<Vec<String>> {
    let max_layer = layers.values().copied().max().unwrap_or(0);
    let mut buckets: Vec<Vec<String>> = vec![Vec::new(); max_layer + 1];
    for id in order {
        if let Some(&layer) = layers.get(id) {
            buckets[layer].push(id.clone());
        }
    }
    buckets
}

/// Crossing-reduction order for one layer: ascending mean `x + y` of the
/// node's already-positioned predecessors in earlier layers. Nodes without
/// such predecessors sort last; ties keep the incoming order.
pub(super) fn sequence_layer(
    bucket: &mut [String],
    layer: usize,
    graph: &LayerGraph,
    layers: &HashMap<String, usize>,
    positions: &HashMap<String, Point>,
) {
    if bucket.len() <= 1 {
        return;
    }
    let score = |id: &str| -> f32 {
        let mut total = 0.0f32;
        let mut count = 0usize;
        for pred in graph.predecessors(id) {
            let earlier = layers.get(pred).is_some_and(|pred_layer| *pred_layer < layer);
            if !earlier {
                continue;
            }
            if let Some((x, y)) = positions.get(pred) {
                total += x + y;
                count += 1;
            }
        }
        if count == 0 {
            f32::INFINITY
        } else {
            total / count as f32
        }
    };
    let scores: HashMap<String, f32> = bucket.iter().map(|id| (id.clone(), score(id))).collect();
    bucket.sort_by(|a, b| {
        let a_score = scores.get(a).copied().unwrap_or(f32::INFINITY);
        let b_score = scores.get(b).copied().unwrap_or(f32::INFINITY);
        a_score.partial_cmp(&b_score).unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn graph(names: &[&str], edges: &[(&'static str, &'static str)]) -> LayerGraph {
        LayerGraph::build(&ids(names), edges.iter().copied())
    }

    #[test]
    fn drops_unknown_and_self_edges() {
        let g = graph(&["a", "b"], &[("a", "b"), ("a", "ghost"), ("b", "b")]);
        assert_eq!(g.successors("a"), &["b".to_string()]);
        assert_eq!(g.in_degree["b"], 1);
        assert_eq!(g.in_degree["a"], 0);
        assert!(g.successors("b").is_empty());
    }

    #[test]
    fn chain_layers_follow_longest_path() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("a", "c"), ("c", "d")]);
        let layers = assign_layers(&g);
        assert_eq!(layers["a"], 0);
        assert_eq!(layers["b"], 1);
        assert_eq!(layers["c"], 2);
        assert_eq!(layers["d"], 3);
    }

    #[test]
    fn isolated_nodes_are_roots() {
        let g = graph(&["a", "b", "lonely"], &[("a", "b")]);
        let layers = assign_layers(&g);
        assert_eq!(layers["lonely"], 0);
    }

    #[test]
    fn fully_cyclic_graph_uses_first_declared_root() {
        let g = graph(&["x", "y", "z"], &[("x", "y"), ("y", "z"), ("z", "x")]);
        let layers = assign_layers(&g);
        assert_eq!(layers.len(), 3);
        assert_eq!(layers["x"], 0);
        assert_eq!(layers["y"], 1);
        assert_eq!(layers["z"], 2);
    }

    #[test]
    fn unreached_cycle_is_placed_past_the_maximum() {
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("c", "d"), ("d", "c")],
        );
        let layers = assign_layers(&g);
        assert_eq!(layers["a"], 0);
        assert_eq!(layers["b"], 1);
        assert_eq!(layers["c"], 2);
        assert_eq!(layers["d"], 3);
    }

    #[test]
    fn layering_is_deterministic() {
        let g = graph(&["p", "q", "r"], &[("p", "q"), ("q", "r"), ("r", "p"), ("q", "p")]);
        assert_eq!(assign_layers(&g), assign_layers(&g));
    }

    #[test]
    fn sequencing_orders_by_predecessor_position() {
        let g = graph(
            &["top", "bottom", "x", "y", "orphan"],
            &[("top", "y"), ("bottom", "x")],
        );
        let layers = assign_layers(&g);
        let mut positions = HashMap::new();
        positions.insert("top".to_string(), (0.0, 0.0));
        positions.insert("bottom".to_string(), (0.0, 300.0));
        let mut bucket = ids(&["x", "orphan", "y"]);
        sequence_layer(&mut bucket, 1, &g, &layers, &positions);
        assert_eq!(bucket, ids(&["y", "x", "orphan"]));
    }

    #[test]
    fn buckets_keep_declared_order() {
        let order = ids(&["c", "a", "b"]);
        let layers: HashMap<String, usize> =
            [("c", 1), ("a", 0), ("b", 1)].iter().map(|(k, v)| (k.to_string(), *v)).collect();
        let buckets = layer_buckets(&order, &layers);
        assert_eq!(buckets, vec![ids(&["a"]), ids(&["c", "b"])]);
    }
}
