//! Render/input collaborator seam.
//!
//! The controller never draws. It mounts a [`Scene`] once and afterwards only
//! reports view changes, rewards and counters.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::graph::StateId;
use crate::scene::{RenderFragment, RenderHandle, Rgb, Scene};
use crate::trial::view::{EdgeViews, StateViews};

pub trait Renderer {
    /// Draw the graph; the fragment must have exactly one root.
    fn mount(&mut self, scene: &Scene) -> RenderFragment;

    fn set_state_view(&mut self, _state: StateId, _views: StateViews) {}
    fn set_edge_view(&mut self, _from: StateId, _to: StateId, _views: EdgeViews) {}
    fn set_reward(&mut self, _state: StateId, _reward: f64) {}
    /// Start the collected-reward animation on `state`.
    fn collect_reward(&mut self, _state: StateId) {}
    /// Signed label shown next to a visited state; empty for zero rewards.
    fn show_reward_marker(&mut self, _state: StateId, _label: &str, _color: Option<Rgb>) {}
    fn set_score(&mut self, _score: f64) {}
    fn set_steps(&mut self, _steps: Option<u32>) {}
    fn set_counters_visible(&mut self, _steps: bool, _points: bool) {}
    fn set_graph_visible(&mut self, _visible: bool) {}
    /// Opacity transition used for reveal-on-hover; `None` resets it.
    fn set_reveal_transition(&mut self, _transition: Option<Duration>) {}
    /// Fade one state, or the whole graph when `state` is `None`.
    fn fade_out(&mut self, _state: Option<StateId>, _duration: Duration) {}
    fn show_message(&mut self, _message: Option<&str>) {}
}

/// Renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn mount(&mut self, _scene: &Scene) -> RenderFragment {
        RenderFragment::single(RenderHandle(0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Mount { states: usize, edges: usize },
    StateView(StateId, StateViews),
    EdgeView(StateId, StateId, EdgeViews),
    Reward(StateId, f64),
    CollectReward(StateId),
    RewardMarker {
        state: StateId,
        label: String,
        color: Option<Rgb>,
    },
    Score(f64),
    Steps(Option<u32>),
    Counters { steps: bool, points: bool },
    GraphVisible(bool),
    RevealTransition(Option<Duration>),
    FadeOut(Option<StateId>, Duration),
    Message(Option<String>),
}

/// Records every call; clones share the log. Useful for hosts that want to
/// replay the visual history and for tests.
#[derive(Debug, Clone)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
    roots: usize,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            calls: Arc::default(),
            roots: 1,
        }
    }

    /// Pretend the mounted scene produced `roots` root nodes.
    pub fn with_roots(roots: usize) -> Self {
        Self {
            calls: Arc::default(),
            roots,
        }
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn push(&self, call: RenderCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for RecordingRenderer {
    fn mount(&mut self, scene: &Scene) -> RenderFragment {
        self.push(RenderCall::Mount {
            states: scene.states.len(),
            edges: scene.edges.len(),
        });
        RenderFragment {
            roots: (0..self.roots as u64).map(RenderHandle).collect(),
        }
    }

    fn set_state_view(&mut self, state: StateId, views: StateViews) {
        self.push(RenderCall::StateView(state, views));
    }

    fn set_edge_view(&mut self, from: StateId, to: StateId, views: EdgeViews) {
        self.push(RenderCall::EdgeView(from, to, views));
    }

    fn set_reward(&mut self, state: StateId, reward: f64) {
        self.push(RenderCall::Reward(state, reward));
    }

    fn collect_reward(&mut self, state: StateId) {
        self.push(RenderCall::CollectReward(state));
    }

    fn show_reward_marker(&mut self, state: StateId, label: &str, color: Option<Rgb>) {
        self.push(RenderCall::RewardMarker {
            state,
            label: label.to_string(),
            color,
        });
    }

    fn set_score(&mut self, score: f64) {
        self.push(RenderCall::Score(score));
    }

    fn set_steps(&mut self, steps: Option<u32>) {
        self.push(RenderCall::Steps(steps));
    }

    fn set_counters_visible(&mut self, steps: bool, points: bool) {
        self.push(RenderCall::Counters { steps, points });
    }

    fn set_graph_visible(&mut self, visible: bool) {
        self.push(RenderCall::GraphVisible(visible));
    }

    fn set_reveal_transition(&mut self, transition: Option<Duration>) {
        self.push(RenderCall::RevealTransition(transition));
    }

    fn fade_out(&mut self, state: Option<StateId>, duration: Duration) {
        self.push(RenderCall::FadeOut(state, duration));
    }

    fn show_message(&mut self, message: Option<&str>) {
        self.push(RenderCall::Message(message.map(str::to_string)));
    }
}
