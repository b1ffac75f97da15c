use thiserror::Error;

use crate::graph::{GraphError, StateId};
use crate::layout::LayoutError;
use crate::scene::RenderError;
use crate::trial::config::ConfigError;

#[derive(Debug, Error)]
pub enum TrialError {
    #[error("invalid graph: {0}")]
    InvalidGraph(#[from] GraphError),
    #[error("invalid layout: {0}")]
    InvalidLayout(#[from] LayoutError),
    #[error("invalid trial config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error(transparent)]
    MalformedRenderFragment(#[from] RenderError),
    #[error("state {to} is not a successor of {from}")]
    InvalidTransition { from: StateId, to: StateId },
    #[error("input closed before the trial finished")]
    InputClosed,
}
