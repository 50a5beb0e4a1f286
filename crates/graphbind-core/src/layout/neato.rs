//! `neato`: places nodes evenly on a circle, or at their `pos` attribute in
//! no-op mode.

use std::collections::HashMap;
use std::f64::consts::TAU;

use super::{
    BoundingBox, LayoutConfig, LayoutEngine, NopMode, Placement, Point, NODE_HEIGHT, NODE_WIDTH,
    POINTS_PER_INCH,
};
use crate::error::CoreError;
use crate::graph::{AttrTarget, GraphHierarchy};
use crate::id::GraphId;

const NODESEP: f64 = 18.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct NeatoLayout;

impl LayoutEngine for NeatoLayout {
    fn name(&self) -> &str {
        "neato"
    }

    fn layout(
        &self,
        graph: &GraphHierarchy,
        config: &LayoutConfig,
    ) -> Result<Placement, CoreError> {
        let order = graph.member_nodes(GraphId::ROOT)?;
        let count = order.len();
        let radius = if count <= 1 {
            0.0
        } else {
            (count as f64 * (NODE_WIDTH + NODESEP) / TAU).max(NODE_WIDTH)
        };
        let center = Point::new(radius + NODE_WIDTH / 2.0, radius + NODE_HEIGHT / 2.0);

        let mut positions = HashMap::new();
        for (i, node) in order.into_iter().enumerate() {
            let fixed = match config.nop {
                NopMode::UsePositions => graph
                    .get_attr(AttrTarget::Node(node), "pos")?
                    .and_then(|pos| parse_pos(&pos, config.input_scale)),
                NopMode::Off => None,
            };
            let point = fixed.unwrap_or_else(|| {
                let angle = TAU * i as f64 / count as f64;
                Point::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                )
            });
            positions.insert(node, point);
        }

        let bb = BoundingBox::around(positions.values());
        Ok(Placement { positions, bb })
    }
}

/// Parses `"x,y"` (optionally ending in `!`) and converts it to points.
fn parse_pos(pos: &str, input_scale: Option<f64>) -> Option<Point> {
    let (x, y) = pos.trim().trim_end_matches('!').split_once(',')?;
    let x: f64 = x.trim().parse().ok()?;
    let y: f64 = y.trim().parse().ok()?;
    let factor = input_scale
        .filter(|s| *s > 0.0)
        .map_or(1.0, |s| POINTS_PER_INCH / s);
    Some(Point::new(x * factor, y * factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphKind;

    #[test]
    fn circle_places_every_node() {
        let mut g = GraphHierarchy::new("U", GraphKind::Undirected, false);
        let nodes: Vec<_> = (0..5)
            .map(|i| g.add_node(GraphId::ROOT, &format!("n{i}")).unwrap())
            .collect();
        let placement = NeatoLayout.layout(&g, &LayoutConfig::default()).unwrap();
        assert_eq!(placement.positions.len(), nodes.len());
        assert!(placement.bb.ll.x >= -1e-9);
        assert!(placement.bb.ll.y >= -1e-9);
    }

    #[test]
    fn single_node_sits_at_origin_corner() {
        let mut g = GraphHierarchy::new("U", GraphKind::Undirected, false);
        let n = g.add_node(GraphId::ROOT, "only").unwrap();
        let placement = NeatoLayout.layout(&g, &LayoutConfig::default()).unwrap();
        assert_eq!(placement.positions[&n], Point::new(27.0, 18.0));
        assert_eq!(placement.bb, BoundingBox::new(0.0, 0.0, 54.0, 36.0));
    }

    #[test]
    fn nop_mode_uses_pos_attribute() {
        let mut g = GraphHierarchy::new("U", GraphKind::Undirected, false);
        let a = g.add_node(GraphId::ROOT, "a").unwrap();
        let b = g.add_node(GraphId::ROOT, "b").unwrap();
        g.set_attr(AttrTarget::Node(a), "pos", "100,200!").unwrap();

        let placement = NeatoLayout.layout(&g, &LayoutConfig::nop()).unwrap();
        assert_eq!(placement.positions[&a], Point::new(100.0, 200.0));
        assert!(placement.positions.contains_key(&b));

        // Without no-op mode the attribute is ignored.
        let placement = NeatoLayout.layout(&g, &LayoutConfig::default()).unwrap();
        assert_ne!(placement.positions[&a], Point::new(100.0, 200.0));
    }

    #[test]
    fn parse_pos_scales_input() {
        assert_eq!(parse_pos("1,2", Some(1.0)), Some(Point::new(72.0, 144.0)));
        assert_eq!(parse_pos(" 3 , 4 ", None), Some(Point::new(3.0, 4.0)));
        assert_eq!(parse_pos("nonsense", None), None);
    }
}
