//! Trial options as they arrive from the host experiment (JSON).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::{Adjacency, Graph, GraphError, StateId};
use crate::layout::LayoutOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("state ids must be dense (0..{count}), found {state}")]
    SparseStates { state: StateId, count: usize },
    #[error("rewards has {found} entries but the graph has {expected} states")]
    RewardCount { expected: usize, found: usize },
    #[error("{role} state {state} is not in the graph")]
    UnknownState { role: &'static str, state: StateId },
    #[error("forced_hovers is set but there are no expansions")]
    NoExpansions,
    #[error("invalid trial JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// How planning-phase imagination is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealBy {
    #[default]
    Hover,
    Click,
}

/// One entry of a recorded participant log replayed in demo mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DemoAction {
    /// Looked at a state; highlighted only.
    Fixate { state: StateId },
    /// Moved to a state; replayed as a real visit.
    Move { state: StateId },
}

impl DemoAction {
    pub fn state(self) -> StateId {
        match self {
            DemoAction::Fixate { state } | DemoAction::Move { state } => state,
        }
    }

    pub fn is_fixate(self) -> bool {
        matches!(self, DemoAction::Fixate { .. })
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    pub graph: Adjacency,
    pub start: StateId,
    #[serde(default)]
    pub goal: Option<StateId>,
    /// One value per state; empty means every reward is zero.
    #[serde(default)]
    pub rewards: Vec<f64>,
    /// Step budget. Missing or zero means unlimited.
    #[serde(default)]
    pub n_steps: Option<u32>,
    #[serde(default = "default_true")]
    pub consume: bool,

    /// Defaults to `n_steps > 0`.
    #[serde(default)]
    pub show_steps: Option<bool>,
    #[serde(default = "default_true")]
    pub show_points: bool,
    #[serde(default)]
    pub show_successor_rewards: bool,
    #[serde(default)]
    pub show_predecessors: bool,
    #[serde(default)]
    pub show_hovered_reward: bool,
    /// Last hover wins: hovering a state clears every other hover.
    #[serde(default = "default_true")]
    pub keep_hover: bool,
    /// Skip planning; the graph starts fully shown.
    #[serde(default)]
    pub revealed: bool,
    #[serde(default)]
    pub hover_edges: bool,
    /// Only the current state's outgoing edges are visible; hovering never
    /// reveals others.
    #[serde(default)]
    pub only_show_current_edges: bool,
    #[serde(default)]
    pub hover_rewards: bool,
    #[serde(default)]
    pub reveal_by: RevealBy,

    #[serde(default)]
    pub forced_hovers: bool,
    #[serde(default)]
    pub expansions: Vec<(StateId, StateId)>,
    /// Demo mode: replay these instead of taking input.
    #[serde(default)]
    pub actions: Option<Vec<DemoAction>>,

    /// Random walk to a terminal state after every manual move.
    #[serde(default)]
    pub rollout: bool,
    /// Shuffle successor order once before layout.
    #[serde(default)]
    pub shuffle: bool,
    /// Skip the start screen.
    #[serde(default)]
    pub fast: bool,
    #[serde(default)]
    pub start_message: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub layout: LayoutOptions,
}

impl TrialConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn build_graph(&self) -> Result<Graph, GraphError> {
        Graph::from_adjacency(self.graph.clone())
    }

    pub fn show_steps(&self) -> bool {
        self.show_steps
            .unwrap_or_else(|| self.n_steps.is_some_and(|n| n > 0))
    }

    /// `None` is unlimited.
    pub fn step_budget(&self) -> Option<u32> {
        self.n_steps.filter(|&n| n > 0)
    }

    pub fn is_demo(&self) -> bool {
        self.actions.is_some()
    }

    /// Rewards padded to one per state (zeros when none were given).
    pub fn initial_rewards(&self, graph: &Graph) -> Vec<f64> {
        if self.rewards.is_empty() {
            vec![0.0; graph.len()]
        } else {
            self.rewards.clone()
        }
    }

    /// Everything a trial needs that the graph alone cannot check.
    pub fn validate(&self, graph: &Graph) -> Result<(), ConfigError> {
        let count = graph.len();
        if let Some(&state) = graph.states().iter().find(|&&s| s >= count) {
            return Err(ConfigError::SparseStates { state, count });
        }
        if !self.rewards.is_empty() && self.rewards.len() != count {
            return Err(ConfigError::RewardCount {
                expected: count,
                found: self.rewards.len(),
            });
        }

        let known = |role: &'static str, state: StateId| {
            if graph.contains(state) {
                Ok(())
            } else {
                Err(ConfigError::UnknownState { role, state })
            }
        };
        known("start", self.start)?;
        if let Some(goal) = self.goal {
            known("goal", goal)?;
        }
        for &(from, to) in &self.expansions {
            known("expansion", from)?;
            known("expansion", to)?;
        }
        for action in self.actions.iter().flatten() {
            known("action", action.state())?;
        }
        if self.forced_hovers && self.expansions.is_empty() {
            return Err(ConfigError::NoExpansions);
        }
        Ok(())
    }
}

/// Per-trial overrides applied to a live controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialUpdate {
    #[serde(default)]
    pub start: Option<StateId>,
    #[serde(default)]
    pub rewards: Option<Vec<f64>>,
    #[serde(default)]
    pub n_steps: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"{
        "graph": [[0, [1, 2]], [1, []], [2, []]],
        "start": 0,
        "goal": 2,
        "rewards": [0, 5, -3],
        "n_steps": 1
    }"#;

    #[test]
    fn parses_with_defaults() {
        let cfg = TrialConfig::from_json(SMALL).unwrap();
        assert!(cfg.consume);
        assert!(cfg.keep_hover);
        assert!(cfg.show_points);
        assert!(cfg.show_steps());
        assert!(!cfg.revealed);
        assert!(!cfg.rollout);
        assert!(!cfg.only_show_current_edges);
        assert_eq!(cfg.reveal_by, RevealBy::Hover);
        assert_eq!(cfg.step_budget(), Some(1));
        let graph = cfg.build_graph().unwrap();
        cfg.validate(&graph).unwrap();
    }

    #[test]
    fn zero_steps_is_unlimited() {
        let mut cfg = TrialConfig::from_json(SMALL).unwrap();
        cfg.n_steps = Some(0);
        assert_eq!(cfg.step_budget(), None);
        assert!(!cfg.show_steps());
    }

    #[test]
    fn demo_actions_parse() {
        let cfg = TrialConfig::from_json(
            r#"{"graph": [[1], []], "start": 0,
                "actions": [{"type": "fixate", "state": 1}, {"type": "move", "state": 1}]}"#,
        )
        .unwrap();
        let actions = cfg.actions.unwrap();
        assert!(actions[0].is_fixate());
        assert_eq!(actions[1], DemoAction::Move { state: 1 });
    }

    #[test]
    fn validation_fails_fast() {
        let mut cfg = TrialConfig::from_json(SMALL).unwrap();
        let graph = cfg.build_graph().unwrap();

        cfg.rewards = vec![1.0];
        assert!(matches!(
            cfg.validate(&graph),
            Err(ConfigError::RewardCount { expected: 3, found: 1 })
        ));

        cfg.rewards.clear();
        cfg.goal = Some(9);
        assert!(matches!(
            cfg.validate(&graph),
            Err(ConfigError::UnknownState { role: "goal", state: 9 })
        ));

        cfg.goal = None;
        cfg.forced_hovers = true;
        assert!(matches!(cfg.validate(&graph), Err(ConfigError::NoExpansions)));

        let sparse = Graph::new(vec![(0, vec![5]), (5, vec![])]).unwrap();
        cfg.forced_hovers = false;
        assert!(matches!(
            cfg.validate(&sparse),
            Err(ConfigError::SparseStates { state: 5, count: 2 })
        ));
    }

    #[test]
    fn bad_json_is_a_config_error() {
        assert!(matches!(
            TrialConfig::from_json("{\"start\": 0}"),
            Err(ConfigError::Json(_))
        ));
    }
}
