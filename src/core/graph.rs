//! Directed graph over small integer states.
//!
//! Successor order is significant: the index of a successor is the slot it is
//! drawn in (e.g. left/right child in a tree layout), so it is stored exactly
//! as given and only ever reordered by [`Graph::shuffle_successors`].

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prng::Randomizer;

pub type StateId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("state {0} is declared more than once")]
    DuplicateState(StateId),
    #[error("state {state} lists successor {successor}, which is not a state of the graph")]
    DanglingSuccessor { state: StateId, successor: StateId },
}

/// Adjacency as it appears in trial configs.
///
/// Either `[[state, [successors...]], ...]` pairs, or a plain list where the
/// position is the state id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Adjacency {
    Pairs(Vec<(StateId, Vec<StateId>)>),
    Indexed(Vec<Vec<StateId>>),
}

impl Adjacency {
    pub fn into_pairs(self) -> Vec<(StateId, Vec<StateId>)> {
        match self {
            Adjacency::Pairs(pairs) => pairs,
            Adjacency::Indexed(lists) => lists.into_iter().enumerate().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    states: Vec<StateId>,
    adjacency: HashMap<StateId, Vec<StateId>>,
}

impl Graph {
    pub fn new<I>(adjacency: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (StateId, Vec<StateId>)>,
    {
        let mut states = Vec::new();
        let mut map: HashMap<StateId, Vec<StateId>> = HashMap::new();
        for (state, successors) in adjacency {
            if map.insert(state, successors).is_some() {
                return Err(GraphError::DuplicateState(state));
            }
            states.push(state);
        }
        // Numeric order; ids are compared as integers, never as strings.
        states.sort_unstable();

        for &state in &states {
            for &successor in &map[&state] {
                if !map.contains_key(&successor) {
                    return Err(GraphError::DanglingSuccessor { state, successor });
                }
            }
        }

        Ok(Self {
            states,
            adjacency: map,
        })
    }

    pub fn from_adjacency(adjacency: Adjacency) -> Result<Self, GraphError> {
        Self::new(adjacency.into_pairs())
    }

    pub fn states(&self) -> &[StateId] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn contains(&self, state: StateId) -> bool {
        self.adjacency.contains_key(&state)
    }

    /// Stored successor order. Unknown states have no successors.
    pub fn successors(&self, state: StateId) -> &[StateId] {
        self.adjacency
            .get(&state)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_terminal(&self, state: StateId) -> bool {
        self.successors(state).is_empty()
    }

    /// All states with an edge into `state`, ascending.
    pub fn predecessors(&self, state: StateId) -> Vec<StateId> {
        self.states
            .iter()
            .copied()
            .filter(|&s| self.successors(s).contains(&state))
            .collect()
    }

    pub fn edges(&self) -> impl Iterator<Item = (StateId, StateId)> + '_ {
        self.states
            .iter()
            .flat_map(move |&s| self.successors(s).iter().map(move |&t| (s, t)))
    }

    /// Reorders every successor list independently. Topology is unchanged.
    pub fn shuffle_successors<R: Randomizer + ?Sized>(&mut self, rng: &mut R) {
        for state in &self.states {
            if let Some(successors) = self.adjacency.get_mut(state) {
                rng.permute(successors);
            }
        }
    }
}
