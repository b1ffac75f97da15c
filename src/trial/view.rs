//! Per-state and per-edge view sets.
//!
//! The controller keeps what each node and edge should look like as plain
//! flags and only tells the renderer about changes.

use hashbrown::HashMap;
use serde::Serialize;

use crate::graph::{Graph, StateId};

pub trait ViewFlag: Copy + 'static {
    const ALL: &'static [Self];
    fn bit(self) -> u8;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateView {
    /// Reward content concealed until revealed by hover.
    Hidden,
    /// Reward content explicitly revealed.
    Visible,
    Hovered,
    Current,
    /// Valid click target.
    Selectable,
    /// Cue for a forced hover.
    Highlighted,
    /// Upcoming fixation during demo playback.
    Upcoming,
}

impl ViewFlag for StateView {
    const ALL: &'static [Self] = &[
        StateView::Hidden,
        StateView::Visible,
        StateView::Hovered,
        StateView::Current,
        StateView::Selectable,
        StateView::Highlighted,
        StateView::Upcoming,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeView {
    Hidden,
    Visible,
    /// Outgoing edge of the current state.
    Current,
    Highlighted,
}

impl ViewFlag for EdgeView {
    const ALL: &'static [Self] = &[
        EdgeView::Hidden,
        EdgeView::Visible,
        EdgeView::Current,
        EdgeView::Highlighted,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Small bit set of view flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewSet<V: ViewFlag> {
    bits: u8,
    _flag: std::marker::PhantomData<V>,
}

impl<V: ViewFlag> ViewSet<V> {
    pub fn empty() -> Self {
        Self {
            bits: 0,
            _flag: std::marker::PhantomData,
        }
    }

    pub fn of(flag: V) -> Self {
        let mut set = Self::empty();
        set.insert(flag);
        set
    }

    pub fn contains(&self, flag: V) -> bool {
        self.bits & flag.bit() != 0
    }

    pub fn insert(&mut self, flag: V) {
        self.bits |= flag.bit();
    }

    pub fn remove(&mut self, flag: V) {
        self.bits &= !flag.bit();
    }

    pub fn iter(&self) -> impl Iterator<Item = V> + '_ {
        V::ALL.iter().copied().filter(move |f| self.contains(*f))
    }
}

impl<V: ViewFlag + std::fmt::Debug> std::fmt::Debug for ViewSet<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<V: ViewFlag + Serialize> Serialize for ViewSet<V> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

pub type StateViews = ViewSet<StateView>;
pub type EdgeViews = ViewSet<EdgeView>;

/// View flags for one trial's graph.
#[derive(Debug, Clone)]
pub struct ViewModel {
    states: HashMap<StateId, StateViews>,
    edges: HashMap<(StateId, StateId), EdgeViews>,
    hide_states: bool,
    hide_edges: bool,
}

impl ViewModel {
    /// In hover-reveal mode (`hide_states` / `hide_edges`) state rewards or
    /// edges start hidden and are only shown while revealed.
    pub fn new(graph: &Graph, hide_states: bool, hide_edges: bool) -> Self {
        let state_default = if hide_states {
            StateViews::of(StateView::Hidden)
        } else {
            StateViews::of(StateView::Visible)
        };
        let edge_default = if hide_edges {
            EdgeViews::of(EdgeView::Hidden)
        } else {
            EdgeViews::of(EdgeView::Visible)
        };
        Self {
            states: graph.states().iter().map(|&s| (s, state_default)).collect(),
            edges: graph.edges().map(|e| (e, edge_default)).collect(),
            hide_states,
            hide_edges,
        }
    }

    pub fn state(&self, state: StateId) -> StateViews {
        self.states.get(&state).copied().unwrap_or_else(StateViews::empty)
    }

    pub fn edge(&self, from: StateId, to: StateId) -> EdgeViews {
        self.edges.get(&(from, to)).copied().unwrap_or_else(EdgeViews::empty)
    }

    pub fn states_with(&self, flag: StateView) -> Vec<StateId> {
        let mut out: Vec<StateId> = self
            .states
            .iter()
            .filter(|(_, v)| v.contains(flag))
            .map(|(&s, _)| s)
            .collect();
        out.sort_unstable();
        out
    }

    pub fn edges_with(&self, flag: EdgeView) -> Vec<(StateId, StateId)> {
        let mut out: Vec<(StateId, StateId)> = self
            .edges
            .iter()
            .filter(|(_, v)| v.contains(flag))
            .map(|(&e, _)| e)
            .collect();
        out.sort_unstable();
        out
    }

    /// Set or clear one flag; `Some(new)` only if the set changed.
    pub fn mark_state(&mut self, state: StateId, flag: StateView, on: bool) -> Option<StateViews> {
        let views = self.states.get_mut(&state)?;
        let before = *views;
        if on {
            views.insert(flag);
        } else {
            views.remove(flag);
        }
        (*views != before).then_some(*views)
    }

    pub fn mark_edge(&mut self, from: StateId, to: StateId, flag: EdgeView, on: bool) -> Option<EdgeViews> {
        let views = self.edges.get_mut(&(from, to))?;
        let before = *views;
        if on {
            views.insert(flag);
        } else {
            views.remove(flag);
        }
        (*views != before).then_some(*views)
    }

    pub fn show_state(&mut self, state: StateId) -> Option<StateViews> {
        let views = self.states.get_mut(&state)?;
        let before = *views;
        views.remove(StateView::Hidden);
        views.insert(StateView::Visible);
        (*views != before).then_some(*views)
    }

    /// No-op unless states are in hover-reveal mode.
    pub fn hide_state(&mut self, state: StateId) -> Option<StateViews> {
        if !self.hide_states {
            return None;
        }
        let views = self.states.get_mut(&state)?;
        let before = *views;
        views.remove(StateView::Visible);
        views.insert(StateView::Hidden);
        (*views != before).then_some(*views)
    }

    pub fn show_edge(&mut self, from: StateId, to: StateId) -> Option<EdgeViews> {
        let views = self.edges.get_mut(&(from, to))?;
        let before = *views;
        views.remove(EdgeView::Hidden);
        views.insert(EdgeView::Visible);
        (*views != before).then_some(*views)
    }

    pub fn hide_edge(&mut self, from: StateId, to: StateId) -> Option<EdgeViews> {
        if !self.hide_edges {
            return None;
        }
        let views = self.edges.get_mut(&(from, to))?;
        let before = *views;
        views.remove(EdgeView::Visible);
        views.insert(EdgeView::Hidden);
        (*views != before).then_some(*views)
    }

    pub fn state_ids(&self) -> Vec<StateId> {
        let mut ids: Vec<StateId> = self.states.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn edge_ids(&self) -> Vec<(StateId, StateId)> {
        let mut ids: Vec<(StateId, StateId)> = self.edges.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
