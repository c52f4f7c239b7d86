use std::collections::VecDeque;

use tracing::{debug, warn};

use super::Engine;

const MAX_ORDERING_PASSES: usize = 24;

/// Rank and in-rank order of every node, indexed like the node array.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layering {
    pub ranks: Vec<usize>,
    pub orders: Vec<usize>,
    pub broken_cycles: usize,
    pub crossings: usize,
}

/// Layered layout with ranks running left to right: longest-path ranking
/// followed by barycenter crossing reduction over a graph where long edges
/// are split by dummy vertices.
pub fn layered(outgoing: &[Vec<usize>], incoming: &[Vec<usize>]) -> Layering {
    let (ranks, broken_cycles) = assign_ranks(outgoing, incoming);
    let (orders, crossings) = assign_orders(&ranks, outgoing);
    Layering {
        ranks,
        orders,
        broken_cycles,
        crossings,
    }
}

/// Longest distance from a source along directed edges. When only cycles
/// remain the lowest-index pending node is forced in and its back edges are
/// ignored.
fn assign_ranks(outgoing: &[Vec<usize>], incoming: &[Vec<usize>]) -> (Vec<usize>, usize) {
    let node_count = outgoing.len();
    let mut ranks = vec![0usize; node_count];
    let mut pending = incoming.iter().map(Vec::len).collect::<Vec<_>>();
    let mut processed = vec![false; node_count];
    let mut queued = vec![false; node_count];
    let mut queue = VecDeque::new();
    let mut broken = 0usize;

    for index in 0..node_count {
        if pending[index] == 0 {
            queued[index] = true;
            queue.push_back(index);
        }
    }

    let mut done = 0usize;
    while done < node_count {
        let Some(node) = queue.pop_front() else {
            let Some(forced) = (0..node_count).find(|&index| !queued[index]) else {
                break;
            };
            broken += 1;
            queued[forced] = true;
            queue.push_back(forced);
            continue;
        };

        processed[node] = true;
        done += 1;
        for &next in &outgoing[node] {
            if processed[next] {
                continue;
            }
            ranks[next] = ranks[next].max(ranks[node] + 1);
            pending[next] = pending[next].saturating_sub(1);
            if pending[next] == 0 && !queued[next] {
                queued[next] = true;
                queue.push_back(next);
            }
        }
    }

    (ranks, broken)
}

/// Vertex graph between adjacent ranks only. Real nodes keep their indices;
/// dummy vertices are appended after them.
struct Proper {
    layers: Vec<Vec<usize>>,
    down: Vec<Vec<usize>>,
    up: Vec<Vec<usize>>,
}

impl Proper {
    fn build(ranks: &[usize], outgoing: &[Vec<usize>]) -> Self {
        let node_count = ranks.len();
        let layer_count = ranks.iter().max().map_or(0, |max| max + 1);
        let mut layers = vec![Vec::new(); layer_count];
        let mut vertex_rank = ranks.to_vec();
        let mut down = vec![Vec::new(); node_count];
        let mut up = vec![Vec::new(); node_count];

        for (tail, heads) in outgoing.iter().enumerate() {
            for &head in heads {
                if ranks[head] <= ranks[tail] {
                    continue;
                }

                let mut previous = tail;
                for rank in ranks[tail] + 1..ranks[head] {
                    let dummy = vertex_rank.len();
                    vertex_rank.push(rank);
                    down.push(Vec::new());
                    up.push(Vec::new());
                    down[previous].push(dummy);
                    up[dummy].push(previous);
                    previous = dummy;
                }
                down[previous].push(head);
                up[head].push(previous);
            }
        }

        for (vertex, &rank) in vertex_rank.iter().enumerate() {
            layers[rank].push(vertex);
        }

        Self { layers, down, up }
    }

    fn crossings(&self) -> usize {
        let mut position = vec![0usize; self.down.len()];
        for layer in &self.layers {
            for (index, &vertex) in layer.iter().enumerate() {
                position[vertex] = index;
            }
        }

        let mut total = 0usize;
        let mut segments = Vec::new();
        for layer in &self.layers {
            segments.clear();
            for &vertex in layer {
                for &next in &self.down[vertex] {
                    segments.push((position[vertex], position[next]));
                }
            }
            for (i, &(a_top, a_bottom)) in segments.iter().enumerate() {
                for &(b_top, b_bottom) in &segments[i + 1..] {
                    if (a_top < b_top && a_bottom > b_bottom) || (a_top > b_top && a_bottom < b_bottom)
                    {
                        total += 1;
                    }
                }
            }
        }
        total
    }

    fn sweep(&mut self) {
        for layer in 1..self.layers.len() {
            let (before, after) = self.layers.split_at_mut(layer);
            reorder(&mut after[0], &before[layer - 1], &self.up);
        }
        for layer in (0..self.layers.len().saturating_sub(1)).rev() {
            let (before, after) = self.layers.split_at_mut(layer + 1);
            reorder(&mut before[layer], &after[0], &self.down);
        }
    }
}

/// Sorts `layer` by the mean position of each vertex's neighbours in `fixed`.
/// Vertices without neighbours there keep their current slot as key; the
/// sort is stable so ties keep their current relative order.
fn reorder(layer: &mut [usize], fixed: &[usize], neighbours: &[Vec<usize>]) {
    let mut slot = vec![None; neighbours.len()];
    for (index, &vertex) in fixed.iter().enumerate() {
        slot[vertex] = Some(index as f32);
    }

    let mut keyed = layer
        .iter()
        .enumerate()
        .map(|(current, &vertex)| {
            let (sum, count) = neighbours[vertex]
                .iter()
                .filter_map(|&other| slot[other])
                .fold((0.0_f32, 0usize), |(sum, count), value| (sum + value, count + 1));
            let key = if count == 0 {
                current as f32
            } else {
                sum / count as f32
            };
            (key, vertex)
        })
        .collect::<Vec<_>>();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (target, (_, vertex)) in layer.iter_mut().zip(keyed) {
        *target = vertex;
    }
}

fn assign_orders(ranks: &[usize], outgoing: &[Vec<usize>]) -> (Vec<usize>, usize) {
    let node_count = ranks.len();
    let mut proper = Proper::build(ranks, outgoing);
    let mut best = proper.layers.clone();
    let mut best_crossings = proper.crossings();

    for _ in 0..MAX_ORDERING_PASSES {
        if best_crossings == 0 {
            break;
        }
        proper.sweep();
        let crossings = proper.crossings();
        if crossings >= best_crossings {
            break;
        }
        best_crossings = crossings;
        best.clone_from(&proper.layers);
    }

    let mut orders = vec![0usize; node_count];
    for layer in &best {
        for (order, &vertex) in layer.iter().filter(|&&vertex| vertex < node_count).enumerate() {
            orders[vertex] = order;
        }
    }
    (orders, best_crossings)
}

impl Engine {
    pub(super) fn assign_layout(&mut self) {
        let (outgoing, incoming) = self.store.adjacency();
        let layering = layered(&outgoing, &incoming);
        if layering.broken_cycles > 0 {
            warn!(
                broken = layering.broken_cycles,
                "graph contains cycles; ranks ignore back edges"
            );
        }
        debug!(
            ranks = layering.ranks.iter().max().map_or(0, |max| max + 1),
            crossings = layering.crossings,
            "layout assigned"
        );

        for (node, (rank, order)) in self
            .store
            .nodes_mut()
            .iter_mut()
            .zip(layering.ranks.into_iter().zip(layering.orders))
        {
            node.rank = rank;
            node.order = order;
        }
    }
}
