//! Layout trigger: engine selection, layout execution and the `bb` attribute.
//!
//! Engines are looked up by name in a [`LayoutRegistry`]. The legacy `nop`
//! alias does not flip any process-wide state; it produces a
//! [`LayoutConfig`] that travels with the single invocation.

mod dot;
mod neato;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::CoreError;
use crate::graph::{AttrTarget, GraphHierarchy};
use crate::id::{GraphId, NodeId};

pub use dot::DotLayout;
pub use neato::NeatoLayout;

/// Output units per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Default node extent, in points.
pub const NODE_WIDTH: f64 = 54.0;
pub const NODE_HEIGHT: f64 = 36.0;

/// Graph attribute receiving the bounding box.
pub const BB_ATTR: &str = "bb";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// Lower-left and upper-right corners of a drawing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub ll: Point,
    pub ur: Point,
}

impl BoundingBox {
    pub fn new(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        BoundingBox {
            ll: Point::new(llx, lly),
            ur: Point::new(urx, ury),
        }
    }

    /// Smallest box holding a default-sized node at every position.
    /// An empty drawing has an all-zero box.
    pub fn around<'a>(positions: impl IntoIterator<Item = &'a Point>) -> Self {
        let mut iter = positions.into_iter().peekable();
        if iter.peek().is_none() {
            return BoundingBox::default();
        }
        let (hw, hh) = (NODE_WIDTH / 2.0, NODE_HEIGHT / 2.0);
        let mut bb = BoundingBox::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for p in iter {
            bb.ll.x = bb.ll.x.min(p.x - hw);
            bb.ll.y = bb.ll.y.min(p.y - hh);
            bb.ur.x = bb.ur.x.max(p.x + hw);
            bb.ur.y = bb.ur.y.max(p.y + hh);
        }
        bb
    }
}

/// How the no-op layout mode treats node positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NopMode {
    #[default]
    Off,
    /// Nodes carrying a `pos` attribute are placed there instead of being
    /// laid out.
    UsePositions,
}

/// Per-invocation layout settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub nop: NopMode,
    /// Units per inch of input `pos` coordinates; `None` means points.
    pub input_scale: Option<f64>,
}

impl LayoutConfig {
    /// Settings implied by the legacy `nop` engine name.
    pub fn nop() -> Self {
        LayoutConfig {
            nop: NopMode::UsePositions,
            input_scale: Some(POINTS_PER_INCH),
        }
    }
}

/// Node positions and extent produced by an engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub positions: HashMap<NodeId, Point>,
    pub bb: BoundingBox,
}

/// A completed layout, kept on the hierarchy until the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub engine: String,
    pub positions: HashMap<NodeId, Point>,
    pub bb: BoundingBox,
    pub landscape: bool,
}

/// A layout engine the trigger can select by name.
pub trait LayoutEngine: Send + Sync {
    fn name(&self) -> &str;

    fn layout(&self, graph: &GraphHierarchy, config: &LayoutConfig) -> Result<Placement, CoreError>;
}

/// Engines available to the layout trigger, in registration order.
#[derive(Default)]
pub struct LayoutRegistry {
    engines: Vec<Box<dyn LayoutEngine>>,
}

impl std::fmt::Debug for LayoutRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutRegistry")
            .field("engines", &self.available())
            .finish()
    }
}

impl LayoutRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the `dot` and `neato` engines.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(DotLayout));
        registry.register(Box::new(NeatoLayout));
        registry
    }

    /// Adds an engine. Lookup returns the first engine registered under a
    /// name.
    pub fn register(&mut self, engine: Box<dyn LayoutEngine>) {
        self.engines.push(engine);
    }

    /// Case-insensitive lookup.
    pub fn select(&self, name: &str) -> Option<&dyn LayoutEngine> {
        self.engines
            .iter()
            .find(|e| e.name().eq_ignore_ascii_case(name))
            .map(|e| e.as_ref())
    }

    pub fn available(&self) -> Vec<String> {
        self.engines.iter().map(|e| e.name().to_string()).collect()
    }
}

/// Result of a successful [`run_layout`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOutcome {
    pub engine: String,
    pub config: LayoutConfig,
    /// The value written to the `bb` attribute.
    pub bb: String,
}

/// Chooses the engine for `requested` and the configuration to run it with.
///
/// An empty name selects `dot` for directed graphs and `neato` otherwise.
/// `nop` (any case) selects `neato` in no-op mode. Any other name that is not
/// registered falls back to `dot`.
pub fn select_engine<'r>(
    registry: &'r LayoutRegistry,
    directed: bool,
    requested: &str,
) -> Result<(&'r dyn LayoutEngine, LayoutConfig), CoreError> {
    let mut config = LayoutConfig::default();
    let selected = if requested.is_empty() {
        registry.select(if directed { "dot" } else { "neato" })
    } else {
        let named = if requested.eq_ignore_ascii_case("nop") {
            config = LayoutConfig::nop();
            registry.select("neato")
        } else {
            registry.select(requested)
        };
        named.or_else(|| registry.select("dot"))
    };

    match selected {
        Some(engine) => Ok((engine, config)),
        None => {
            let err = CoreError::UnsupportedLayoutEngine {
                requested: requested.to_string(),
                available: registry.available(),
            };
            error!("{err}");
            Err(err)
        }
    }
}

/// Whether the root graph asks for a rotated drawing.
pub fn is_landscape(graph: &GraphHierarchy) -> bool {
    let attr = |name: &str| {
        graph
            .get_attr(AttrTarget::Graph(GraphId::ROOT), name)
            .ok()
            .flatten()
            .unwrap_or_default()
    };
    if attr("rotate").trim() == "90" {
        return true;
    }
    if parse_bool(&attr("landscape")) {
        return true;
    }
    attr("orientation")
        .trim_start()
        .starts_with(['l', 'L'])
}

/// Graphviz boolean: `true`/`yes` in any case, or any non-zero integer.
fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") {
        return true;
    }
    value.parse::<i64>().is_ok_and(|n| n != 0)
}

/// Formats a bounding box as `"llx lly urx ury"`, rounding half away from
/// zero, with x and y swapped for landscape drawings.
///
/// Margins, scaling and page size are left to the renderer.
pub fn format_bb(bb: &BoundingBox, landscape: bool) -> String {
    let r = |v: f64| v.round() as i64;
    if landscape {
        format!("{} {} {} {}", r(bb.ll.y), r(bb.ll.x), r(bb.ur.y), r(bb.ur.x))
    } else {
        format!("{} {} {} {}", r(bb.ll.x), r(bb.ll.y), r(bb.ur.x), r(bb.ur.y))
    }
}

/// Lays out the hierarchy's root graph and records the bounding box as its
/// `bb` attribute.
///
/// Engine selection happens first; if it fails nothing on the graph changes.
/// Otherwise the previous drawing is discarded before the engine runs.
pub fn run_layout(
    graph: &mut GraphHierarchy,
    registry: &LayoutRegistry,
    requested: &str,
) -> Result<LayoutOutcome, CoreError> {
    let (engine, config) = select_engine(registry, graph.is_directed(), requested)?;

    graph.reset_layout();
    let placement = engine.layout(graph, &config)?;
    let landscape = is_landscape(graph);
    let bb = format_bb(&placement.bb, landscape);

    graph.set_attr(AttrTarget::Graph(GraphId::ROOT), BB_ATTR, &bb)?;
    graph.set_drawing(Drawing {
        engine: engine.name().to_string(),
        positions: placement.positions,
        bb: placement.bb,
        landscape,
    });
    info!(graph = graph.name(), engine = engine.name(), bb = %bb, "layout complete");

    Ok(LayoutOutcome {
        engine: engine.name().to_string(),
        config,
        bb,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphKind;

    /// Places nothing and reports a fixed box.
    struct FixedBox(BoundingBox);

    impl LayoutEngine for FixedBox {
        fn name(&self) -> &str {
            "dot"
        }

        fn layout(&self, _: &GraphHierarchy, _: &LayoutConfig) -> Result<Placement, CoreError> {
            Ok(Placement {
                positions: HashMap::new(),
                bb: self.0,
            })
        }
    }

    fn fixed_registry() -> LayoutRegistry {
        let mut registry = LayoutRegistry::new();
        registry.register(Box::new(FixedBox(BoundingBox::new(0.0, 0.0, 100.0, 50.0))));
        registry
    }

    fn digraph() -> GraphHierarchy {
        let mut g = GraphHierarchy::new("G", GraphKind::Directed, false);
        let a = g.add_node(GraphId::ROOT, "a").unwrap();
        let b = g.add_node(GraphId::ROOT, "b").unwrap();
        g.add_edge(GraphId::ROOT, a, b, None).unwrap();
        g
    }

    fn bb_attr(g: &GraphHierarchy) -> Option<String> {
        g.get_attr(AttrTarget::Graph(GraphId::ROOT), BB_ATTR).unwrap()
    }

    #[test]
    fn format_portrait_and_landscape() {
        let bb = BoundingBox::new(0.0, 0.0, 100.0, 50.0);
        insta::assert_snapshot!(format_bb(&bb, false), @"0 0 100 50");
        insta::assert_snapshot!(format_bb(&bb, true), @"0 0 50 100");
    }

    #[test]
    fn format_rounds_half_away_from_zero() {
        let bb = BoundingBox::new(-0.5, 0.4, 10.5, 20.49);
        assert_eq!(format_bb(&bb, false), "-1 0 11 20");
    }

    #[test]
    fn bb_written_through_namespace() {
        let mut g = digraph();
        let outcome = run_layout(&mut g, &fixed_registry(), "").unwrap();
        assert_eq!(outcome.bb, "0 0 100 50");
        assert_eq!(bb_attr(&g).as_deref(), Some("0 0 100 50"));
        assert!(g.drawing().is_some());
    }

    #[test]
    fn landscape_swaps_axes() {
        let mut g = digraph();
        g.set_attr(AttrTarget::Graph(GraphId::ROOT), "rotate", "90")
            .unwrap();
        run_layout(&mut g, &fixed_registry(), "dot").unwrap();
        assert_eq!(bb_attr(&g).as_deref(), Some("0 0 50 100"));
        assert!(g.drawing().unwrap().landscape);
    }

    #[test]
    fn landscape_detection() {
        let mut g = digraph();
        assert!(!is_landscape(&g));
        g.set_attr(AttrTarget::Graph(GraphId::ROOT), "orientation", "Landscape")
            .unwrap();
        assert!(is_landscape(&g));

        let mut g = digraph();
        g.set_attr(AttrTarget::Graph(GraphId::ROOT), "landscape", "true")
            .unwrap();
        assert!(is_landscape(&g));
    }

    #[test]
    fn landscape_accepts_any_nonzero_integer() {
        let cases = [
            ("2", true),
            ("-1", true),
            ("0", false),
            ("YES", true),
            ("no", false),
        ];
        for (value, expected) in cases {
            let mut g = digraph();
            g.set_attr(AttrTarget::Graph(GraphId::ROOT), "landscape", value)
                .unwrap();
            assert_eq!(is_landscape(&g), expected, "landscape={value}");
        }
    }

    #[test]
    fn default_engine_follows_direction() {
        let registry = LayoutRegistry::with_builtin();
        let (engine, _) = select_engine(&registry, true, "").unwrap();
        assert_eq!(engine.name(), "dot");
        let (engine, _) = select_engine(&registry, false, "").unwrap();
        assert_eq!(engine.name(), "neato");
    }

    #[test]
    fn unknown_engine_falls_back_to_dot() {
        let registry = LayoutRegistry::with_builtin();
        let (engine, config) = select_engine(&registry, true, "bogus").unwrap();
        assert_eq!(engine.name(), "dot");
        assert_eq!(config, LayoutConfig::default());

        let mut g = digraph();
        let outcome = run_layout(&mut g, &registry, "bogus").unwrap();
        assert_eq!(outcome.engine, "dot");
    }

    #[test]
    fn nop_selects_neato_with_flags() {
        let registry = LayoutRegistry::with_builtin();
        for name in ["nop", "NOP", "Nop"] {
            let (engine, config) = select_engine(&registry, true, name).unwrap();
            assert_eq!(engine.name(), "neato");
            assert_eq!(config.nop, NopMode::UsePositions);
            assert_eq!(config.input_scale, Some(POINTS_PER_INCH));
        }
    }

    #[test]
    fn named_lookup_is_case_insensitive() {
        let registry = LayoutRegistry::with_builtin();
        let (engine, _) = select_engine(&registry, true, "NEATO").unwrap();
        assert_eq!(engine.name(), "neato");
    }

    #[test]
    fn selection_failure_leaves_graph_untouched() {
        let mut g = digraph();
        run_layout(&mut g, &fixed_registry(), "").unwrap();
        let before = g.drawing().cloned();

        let empty = LayoutRegistry::new();
        match run_layout(&mut g, &empty, "bogus") {
            Err(CoreError::UnsupportedLayoutEngine { requested, available }) => {
                assert_eq!(requested, "bogus");
                assert!(available.is_empty());
            }
            other => panic!("expected UnsupportedLayoutEngine, got {other:?}"),
        }
        assert_eq!(g.drawing().cloned(), before);
        assert_eq!(bb_attr(&g).as_deref(), Some("0 0 100 50"));
    }

    #[test]
    fn undirected_default_has_no_dot_fallback() {
        // Only "dot" is registered: an empty name on an undirected graph asks
        // for neato and does not fall back.
        let mut g = GraphHierarchy::new("U", GraphKind::Undirected, false);
        let err = run_layout(&mut g, &fixed_registry(), "").unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedLayoutEngine { .. }));
    }

    #[test]
    fn relayout_replaces_previous_drawing() {
        let registry = LayoutRegistry::with_builtin();
        let mut g = digraph();
        run_layout(&mut g, &registry, "dot").unwrap();
        run_layout(&mut g, &registry, "neato").unwrap();
        assert_eq!(g.drawing().unwrap().engine, "neato");
        assert!(g.reset_layout());
        assert!(!g.reset_layout());
    }

    #[test]
    fn bounding_box_around_positions() {
        assert_eq!(BoundingBox::around(std::iter::empty()), BoundingBox::default());
        let bb = BoundingBox::around(&[Point::new(27.0, 18.0), Point::new(127.0, 90.0)]);
        assert_eq!(bb, BoundingBox::new(0.0, 0.0, 154.0, 108.0));
    }
}
