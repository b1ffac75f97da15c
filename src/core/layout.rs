//! Pure placement math: abstract graph structure in, pixel coordinates and
//! edge geometry out. Nothing here knows how the result is drawn.

use std::f64::consts::PI;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{Graph, StateId};

/// Pixel footprint of one node. Usable viewport is shrunk by this so nodes
/// centered on the outermost coordinates are never clipped.
pub const BLOCK_SIZE: f64 = 100.0;

pub type Point = [f64; 2];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("expected {expected} coordinates (one per state), found {found}")]
    CoordinateCount { expected: usize, found: usize },
    #[error("state {state} has no coordinate slot (only {count} coordinates)")]
    StateOutOfRange { state: StateId, count: usize },
    #[error("coordinate of state {0} is not finite")]
    NonFiniteCoordinate(StateId),
    #[error("all coordinates coincide; layout has a zero-size bounding box")]
    DegenerateBoundingBox,
    #[error("scale_edge_factor must be within [0, 1], got {0}")]
    EdgeFactorOutOfRange(f64),
    #[error("viewport {width}x{height} leaves no room for the node footprint")]
    ViewportTooSmall { width: f64, height: f64 },
    #[error("state {state} has {children} children but the tree layout has {slots} slots")]
    TooManyChildren {
        state: StateId,
        children: usize,
        slots: usize,
    },
    #[error("state {0} is reached twice; tree layout needs an acyclic tree")]
    NotATree(StateId),
    #[error("state {0} is not reachable from the tree root")]
    Unreachable(StateId),
}

/// Edge geometry from one scaled point to another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormRot {
    /// Euclidean length.
    pub norm: f64,
    /// Angle in radians, `atan2(dy, dx)`.
    pub rot: f64,
}

pub fn normrot(p1: Point, p2: Point) -> NormRot {
    let dx = p2[0] - p1[0];
    let dy = p2[1] - p1[1];
    NormRot {
        norm: (dx * dx + dy * dy).sqrt(),
        rot: dy.atan2(dx),
    }
}

/// `n` points evenly spaced on a circle, first one at the top (angle 3pi/2),
/// normalized into the unit square.
pub fn circle_xy(n: usize) -> Vec<Point> {
    (0..n)
        .map(|idx| {
            let angle = 3.0 * PI / 2.0 + (idx as f64) * 2.0 * PI / (n as f64);
            [(angle.cos() + 1.0) / 2.0, (angle.sin() + 1.0) / 2.0]
        })
        .collect()
}

/// Parameters of the layered tree layout.
///
/// The horizontal spread at depth `d` is
/// `base^(reference_depth - d) / divisor`; children occupy fixed slots out of
/// `branching`, so a lone child keeps the slot it would have in a full tree.
/// The defaults reproduce the binary layout used for shallow decision trees
/// and are not meant for deep or wide graphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSpread {
    pub branching: usize,
    pub level_height: f64,
    pub base: f64,
    pub reference_depth: i32,
    pub divisor: f64,
}

impl Default for TreeSpread {
    fn default() -> Self {
        Self {
            branching: 2,
            level_height: 0.2,
            base: 2.1,
            reference_depth: 4,
            divisor: 70.0,
        }
    }
}

impl TreeSpread {
    pub fn spread(&self, depth: usize) -> f64 {
        self.base.powi(self.reference_depth - depth as i32) / self.divisor
    }

    fn slot_offset(&self, slot: usize) -> f64 {
        if self.branching <= 1 {
            return 0.0;
        }
        let b = (self.branching - 1) as f64;
        (2.0 * slot as f64 - b) / b
    }
}

/// Layered layout of the tree rooted at `start`. States must be dense
/// (`0..graph.len()`); the result is indexed by state id.
pub fn tree_xy(start: StateId, graph: &Graph, spread: &TreeSpread) -> Result<Vec<Point>, LayoutError> {
    let count = graph.len();
    if let Some(&state) = graph.states().iter().find(|&&s| s >= count) {
        return Err(LayoutError::StateOutOfRange { state, count });
    }

    let mut xy: Vec<Option<Point>> = vec![None; count];
    // Explicit stack instead of recursion; (state, x, depth).
    let mut stack = vec![(start, 0.5, 0usize)];
    while let Some((state, x, depth)) = stack.pop() {
        let slot = xy
            .get_mut(state)
            .ok_or(LayoutError::StateOutOfRange { state, count })?;
        if slot.is_some() {
            return Err(LayoutError::NotATree(state));
        }
        *slot = Some([x, depth as f64 * spread.level_height]);

        let children = graph.successors(state);
        if children.len() > spread.branching.max(1) {
            return Err(LayoutError::TooManyChildren {
                state,
                children: children.len(),
                slots: spread.branching.max(1),
            });
        }
        let s = spread.spread(depth);
        for (i, &child) in children.iter().enumerate() {
            stack.push((child, x + s * spread.slot_offset(i), depth + 1));
        }
    }

    xy.into_iter()
        .enumerate()
        .map(|(state, p)| p.ok_or(LayoutError::Unreachable(state)))
        .collect()
}

/// How normalized coordinates are chosen before fitting to the viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutStrategy {
    #[default]
    Circle,
    Tree(TreeSpread),
    Fixed { xy: Vec<Point> },
}

impl LayoutStrategy {
    pub fn normalized_positions(&self, graph: &Graph, start: StateId) -> Result<Vec<Point>, LayoutError> {
        match self {
            LayoutStrategy::Circle => Ok(circle_xy(graph.len())),
            LayoutStrategy::Tree(spread) => tree_xy(start, graph, spread),
            LayoutStrategy::Fixed { xy } => Ok(xy.clone()),
        }
    }
}

fn default_width() -> f64 {
    800.0
}

fn default_height() -> f64 {
    600.0
}

fn default_one() -> f64 {
    1.0
}

/// Viewport and strategy; the `layout` section of a trial config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutOptions {
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    /// Display zoom. The layout is computed at `width / scale` by `height / scale`.
    #[serde(default = "default_one")]
    pub scale: f64,
    #[serde(default = "default_one")]
    pub scale_edge_factor: f64,
    #[serde(default)]
    pub strategy: LayoutStrategy,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            scale: 1.0,
            scale_edge_factor: 1.0,
            strategy: LayoutStrategy::Circle,
        }
    }
}

impl LayoutOptions {
    /// Unscaled viewport the coordinates live in.
    pub fn viewport(&self) -> (f64, f64) {
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        (self.width / scale, self.height / scale)
    }

    pub fn compute(&self, graph: &Graph, start: StateId) -> Result<Layout, LayoutError> {
        let xy = self.strategy.normalized_positions(graph, start)?;
        let (width, height) = self.viewport();
        graph_xy(graph, width, height, self.scale_edge_factor, &xy)
    }
}

/// Fitted coordinates for every state.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub width: f64,
    pub height: f64,
    coordinate: HashMap<StateId, Point>,
    scaled: HashMap<StateId, Point>,
}

impl Layout {
    /// Node center in viewport pixels.
    pub fn coordinate(&self, state: StateId) -> Option<Point> {
        self.coordinate.get(&state).copied()
    }

    /// Coordinate pulled toward the viewport center; only used for edges.
    pub fn scaled(&self, state: StateId) -> Option<Point> {
        self.scaled.get(&state).copied()
    }

    pub fn edge(&self, state: StateId, successor: StateId) -> Option<NormRot> {
        Some(normrot(self.scaled(state)?, self.scaled(successor)?))
    }
}

/// Fits normalized `fixed_xy` (indexed by state id) into a `width` by
/// `height` viewport: aspect-preserving uniform scale, centered, with
/// `BLOCK_SIZE` reserved so nodes stay inside. `scale_edge_factor` shrinks
/// the separate edge coordinates toward the center.
pub fn graph_xy(
    graph: &Graph,
    width: f64,
    height: f64,
    scale_edge_factor: f64,
    fixed_xy: &[Point],
) -> Result<Layout, LayoutError> {
    if !(0.0..=1.0).contains(&scale_edge_factor) {
        return Err(LayoutError::EdgeFactorOutOfRange(scale_edge_factor));
    }
    if fixed_xy.len() != graph.len() {
        return Err(LayoutError::CoordinateCount {
            expected: graph.len(),
            found: fixed_xy.len(),
        });
    }
    for &state in graph.states() {
        let p = fixed_xy.get(state).ok_or(LayoutError::StateOutOfRange {
            state,
            count: fixed_xy.len(),
        })?;
        if !p[0].is_finite() || !p[1].is_finite() {
            return Err(LayoutError::NonFiniteCoordinate(state));
        }
    }

    let width_no_margin = width - BLOCK_SIZE;
    let height_no_margin = height - BLOCK_SIZE;
    if !(width_no_margin > 0.0 && height_no_margin > 0.0) {
        return Err(LayoutError::ViewportTooSmall { width, height });
    }

    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in fixed_xy {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }
    let range_x = max_x - min_x;
    let range_y = max_y - min_y;

    // A collinear layout still has one usable axis; only a single point has none.
    let scale = if range_x == 0.0 && range_y == 0.0 {
        return Err(LayoutError::DegenerateBoundingBox);
    } else if range_y == 0.0 {
        width_no_margin / range_x
    } else if range_x == 0.0 {
        height_no_margin / range_y
    } else if range_x / range_y > width_no_margin / height_no_margin {
        width_no_margin / range_x
    } else {
        height_no_margin / range_y
    };

    let margin_x = (width - range_x * scale) / 2.0;
    let margin_y = (height - range_y * scale) / 2.0;

    let mut coordinate = HashMap::with_capacity(graph.len());
    let mut scaled = HashMap::with_capacity(graph.len());
    for &state in graph.states() {
        let [x, y] = fixed_xy[state];
        let x = (x - min_x) * scale + margin_x;
        let y = (y - min_y) * scale + margin_y;
        coordinate.insert(state, [x, y]);
        scaled.insert(
            state,
            [
                (x - width / 2.0) * scale_edge_factor + width / 2.0,
                (y - height / 2.0) * scale_edge_factor + height / 2.0,
            ],
        );
    }

    Ok(Layout {
        width,
        height,
        coordinate,
        scaled,
    })
}
