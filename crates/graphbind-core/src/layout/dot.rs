//! `dot`: places nodes on ranks by breadth-first distance from the sources.

use std::collections::{HashMap, VecDeque};

use petgraph::Direction;

use super::{BoundingBox, LayoutConfig, LayoutEngine, Placement, Point, NODE_HEIGHT, NODE_WIDTH};
use crate::error::CoreError;
use crate::graph::{AttrTarget, GraphHierarchy};
use crate::id::{GraphId, NodeId};

const NODESEP: f64 = 18.0;
const RANKSEP: f64 = 36.0;

/// Ranked placement. Rank 0 is drawn on top; `rankdir=LR` puts it on the
/// left instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotLayout;

impl LayoutEngine for DotLayout {
    fn name(&self) -> &str {
        "dot"
    }

    fn layout(
        &self,
        graph: &GraphHierarchy,
        _config: &LayoutConfig,
    ) -> Result<Placement, CoreError> {
        let order = graph.member_nodes(GraphId::ROOT)?;
        let ranks = assign_ranks(graph, &order);
        let max_rank = ranks.values().copied().max().unwrap_or(0);
        let left_to_right = graph
            .get_attr(AttrTarget::Graph(GraphId::ROOT), "rankdir")?
            .is_some_and(|dir| dir.eq_ignore_ascii_case("LR"));

        let mut used: HashMap<usize, usize> = HashMap::new();
        let mut positions = HashMap::new();
        for node in order {
            let rank = ranks[&node];
            let slot = used.entry(rank).or_default();
            let across = *slot as f64 * (NODE_WIDTH + NODESEP) + NODE_WIDTH / 2.0;
            *slot += 1;
            let point = if left_to_right {
                Point::new(
                    rank as f64 * (NODE_WIDTH + RANKSEP) + NODE_WIDTH / 2.0,
                    across - NODE_WIDTH / 2.0 + NODE_HEIGHT / 2.0,
                )
            } else {
                Point::new(
                    across,
                    (max_rank - rank) as f64 * (NODE_HEIGHT + RANKSEP) + NODE_HEIGHT / 2.0,
                )
            };
            positions.insert(node, point);
        }

        let bb = BoundingBox::around(positions.values());
        Ok(Placement { positions, bb })
    }
}

/// Breadth-first ranks. Each pass starts from the unranked nodes without
/// predecessors (or, failing that, the first unranked node), so cycles and
/// disconnected parts still get ranks.
fn assign_ranks(graph: &GraphHierarchy, order: &[NodeId]) -> HashMap<NodeId, usize> {
    let topo = graph.topology();
    let directed = graph.is_directed();
    let neighbors = |n: NodeId, dir: Direction| -> Vec<NodeId> {
        topo.neighbors_directed(n.into(), dir).map(NodeId::from).collect()
    };

    let mut ranks: HashMap<NodeId, usize> = HashMap::new();
    while ranks.len() < order.len() {
        let unranked: Vec<NodeId> = order
            .iter()
            .copied()
            .filter(|n| !ranks.contains_key(n))
            .collect();
        let mut sources: Vec<NodeId> = if directed {
            unranked
                .iter()
                .copied()
                .filter(|&n| {
                    neighbors(n, Direction::Incoming)
                        .iter()
                        .all(|p| *p == n || ranks.contains_key(p))
                })
                .collect()
        } else {
            Vec::new()
        };
        if sources.is_empty() {
            sources.push(unranked[0]);
        }

        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for s in sources {
            ranks.insert(s, 0);
            queue.push_back(s);
        }
        while let Some(n) = queue.pop_front() {
            let next = ranks[&n] + 1;
            let mut succ = neighbors(n, Direction::Outgoing);
            if !directed {
                succ.extend(neighbors(n, Direction::Incoming));
            }
            for m in succ {
                if !ranks.contains_key(&m) {
                    ranks.insert(m, next);
                    queue.push_back(m);
                }
            }
        }
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphKind;

    fn chain(kind: GraphKind) -> (GraphHierarchy, Vec<NodeId>) {
        let mut g = GraphHierarchy::new("G", kind, false);
        let nodes: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|n| g.add_node(GraphId::ROOT, n).unwrap())
            .collect();
        g.add_edge(GraphId::ROOT, nodes[0], nodes[1], None).unwrap();
        g.add_edge(GraphId::ROOT, nodes[1], nodes[2], None).unwrap();
        (g, nodes)
    }

    #[test]
    fn chain_is_ranked_top_down() {
        let (g, n) = chain(GraphKind::Directed);
        let placement = DotLayout.layout(&g, &LayoutConfig::default()).unwrap();
        let y = |i: usize| placement.positions[&n[i]].y;
        assert!(y(0) > y(1));
        assert!(y(1) > y(2));
        assert_eq!(placement.bb.ll, Point::new(0.0, 0.0));
        assert_eq!(placement.bb.ur, Point::new(NODE_WIDTH, 3.0 * NODE_HEIGHT + 2.0 * RANKSEP));
    }

    #[test]
    fn cycle_still_gets_ranks() {
        let (mut g, n) = chain(GraphKind::Directed);
        g.add_edge(GraphId::ROOT, n[2], n[0], None).unwrap();
        let ranks = assign_ranks(&g, &n);
        assert_eq!(ranks.len(), 3);
        assert_eq!(ranks[&n[0]], 0);
    }

    #[test]
    fn rankdir_lr_grows_rightwards() {
        let (mut g, n) = chain(GraphKind::Directed);
        g.set_attr(AttrTarget::Graph(GraphId::ROOT), "rankdir", "LR")
            .unwrap();
        let placement = DotLayout.layout(&g, &LayoutConfig::default()).unwrap();
        let x = |i: usize| placement.positions[&n[i]].x;
        assert!(x(0) < x(1));
        assert!(x(1) < x(2));
    }

    #[test]
    fn empty_graph_has_zero_box() {
        let g = GraphHierarchy::new("G", GraphKind::Directed, false);
        let placement = DotLayout.layout(&g, &LayoutConfig::default()).unwrap();
        assert!(placement.positions.is_empty());
        assert_eq!(placement.bb, BoundingBox::default());
    }
}
