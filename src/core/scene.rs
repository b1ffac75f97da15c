//! Render-ready description of a laid-out graph.
//!
//! A [`Scene`] carries everything a renderer needs to place nodes, edges and
//! arrowheads; it is plain data so any drawing backend can consume it.

use serde::Serialize;
use thiserror::Error;

use crate::graph::{Graph, StateId};
use crate::layout::{Layout, NormRot, Point, BLOCK_SIZE};

/// Reward values are colored on this symmetric range.
pub const REWARD_COLOR_MIN: f64 = -8.0;
pub const REWARD_COLOR_MAX: f64 = 8.0;

// Viridis key colors, dark purple dropped.
const VIRIDIS_KEYS: [[f64; 3]; 4] = [
    [59.0, 82.0, 139.0],
    [33.0, 145.0, 140.0],
    [94.0, 201.0, 98.0],
    [253.0, 231.0, 37.0],
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("render fragment must have exactly one root, found {0}")]
    MalformedFragment(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Piecewise-linear viridis color for a reward. Zero rewards are transparent (`None`).
pub fn reward_color(value: f64, min: f64, max: f64) -> Option<Rgb> {
    if value == 0.0 {
        return None;
    }
    let normalized = ((value - min) / (max - min)).clamp(0.0, 1.0);
    let segments = (VIRIDIS_KEYS.len() - 1) as f64;
    let segment = ((normalized * segments).floor() as usize).min(VIRIDIS_KEYS.len() - 2);
    let local = normalized * segments - segment as f64;

    let (a, b) = (VIRIDIS_KEYS[segment], VIRIDIS_KEYS[segment + 1]);
    let lerp = |i: usize| (a[i] + local * (b[i] - a[i])).round() as u8;
    Some(Rgb(lerp(0), lerp(1), lerp(2)))
}

/// "+3", "-2", or empty for zero.
pub fn reward_label(value: f64) -> String {
    if value == 0.0 {
        String::new()
    } else if value > 0.0 {
        format!("+{value}")
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatePlacement {
    pub state: StateId,
    pub center: Point,
    /// Top-left corner of the node's `BLOCK_SIZE` box.
    pub origin: Point,
    pub goal: bool,
    /// Reward fill; `None` for a zero reward.
    pub fill: Option<Rgb>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgePlacement {
    pub from: StateId,
    pub to: StateId,
    /// Slot of `to` in `from`'s successor list.
    pub index: usize,
    /// Line start (scaled coordinate of `from`).
    pub start: Point,
    /// Arrowhead anchor (scaled coordinate of `to`).
    pub tip: Point,
    #[serde(flatten)]
    pub geometry: NormRot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    pub states: Vec<StatePlacement>,
    pub edges: Vec<EdgePlacement>,
}

impl Scene {
    /// Placements for every state and every edge. `rewards` is indexed by
    /// state id; missing entries count as zero.
    pub fn build(graph: &Graph, layout: &Layout, goal: Option<StateId>, rewards: &[f64], scale: f64) -> Self {
        let mut states = Vec::with_capacity(graph.len());
        let mut edges = Vec::new();
        for &state in graph.states() {
            let Some(center) = layout.coordinate(state) else {
                continue;
            };
            states.push(StatePlacement {
                state,
                center,
                origin: [center[0] - BLOCK_SIZE / 2.0, center[1] - BLOCK_SIZE / 2.0],
                goal: goal == Some(state),
                fill: reward_color(
                    rewards.get(state).copied().unwrap_or(0.0),
                    REWARD_COLOR_MIN,
                    REWARD_COLOR_MAX,
                ),
            });

            for (index, &to) in graph.successors(state).iter().enumerate() {
                let (Some(start), Some(tip), Some(geometry)) =
                    (layout.scaled(state), layout.scaled(to), layout.edge(state, to))
                else {
                    continue;
                };
                edges.push(EdgePlacement {
                    from: state,
                    to,
                    index,
                    start,
                    tip,
                    geometry,
                });
            }
        }

        Self {
            width: layout.width,
            height: layout.height,
            scale,
            states,
            edges,
        }
    }

    pub fn state(&self, state: StateId) -> Option<&StatePlacement> {
        self.states.iter().find(|p| p.state == state)
    }
}

/// Opaque handle a renderer hands back for something it drew.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RenderHandle(pub u64);

/// What a renderer produced when mounting a scene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderFragment {
    pub roots: Vec<RenderHandle>,
}

impl RenderFragment {
    pub fn single(root: RenderHandle) -> Self {
        Self { roots: vec![root] }
    }

    /// The one root the graph is mounted under.
    pub fn root(&self) -> Result<RenderHandle, RenderError> {
        match self.roots.as_slice() {
            [root] => Ok(*root),
            roots => Err(RenderError::MalformedFragment(roots.len())),
        }
    }
}
