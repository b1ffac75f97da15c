//! Graph navigation trials.
//!
//! A directed [`graph::Graph`] of numbered states with per-state rewards is
//! laid out in a viewport ([`layout`]), drawn by a host renderer from a
//! [`scene::Scene`], and navigated by a participant through an async
//! [`trial::TrialController`].

#[path = "core/graph.rs"]
pub mod graph;

#[path = "core/layout.rs"]
pub mod layout;

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/scene.rs"]
pub mod scene;

pub mod trial;

pub use graph::{Graph, GraphError, StateId};
pub use layout::{graph_xy, Layout, LayoutError, LayoutOptions};
pub use trial::{InputEvent, TrialBuilder, TrialConfig, TrialController, TrialError, TrialEvent};
