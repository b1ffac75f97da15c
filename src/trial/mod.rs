//! One participant run: configuration, view state, input and logging seams,
//! and the controller that drives them.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod render;
pub mod view;

pub use config::{ConfigError, DemoAction, RevealBy, TrialConfig, TrialUpdate};
pub use controller::{LeaveMode, NavigateOptions, Phase, TrialBuilder, TrialController, TrialSnapshot};
pub use error::TrialError;
pub use events::{EventSink, InputEvent, MemorySink, TrialEvent};
pub use render::{NullRenderer, RecordingRenderer, RenderCall, Renderer};
pub use view::{EdgeView, EdgeViews, StateView, StateViews, ViewModel};
