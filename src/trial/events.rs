//! Input coming in, log events going out.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::StateId;

/// Participant input as delivered by the host page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// The start button was pressed.
    Start,
    Click { state: StateId },
    Hover { state: StateId },
    Unhover { state: StateId },
    Key { key: String },
}

impl InputEvent {
    pub fn click(state: StateId) -> Self {
        InputEvent::Click { state }
    }

    pub fn hover(state: StateId) -> Self {
        InputEvent::Hover { state }
    }

    pub fn key(key: impl Into<String>) -> Self {
        InputEvent::Key { key: key.into() }
    }

    /// The state a pointer event refers to.
    pub fn state(&self) -> Option<StateId> {
        match self {
            InputEvent::Click { state } | InputEvent::Hover { state } | InputEvent::Unhover { state } => {
                Some(*state)
            }
            InputEvent::Start | InputEvent::Key { .. } => None,
        }
    }
}

/// One logged event. `info` always carries `trial_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialEvent {
    pub event: String,
    pub info: Map<String, Value>,
}

impl TrialEvent {
    pub fn trial_id(&self) -> Option<&str> {
        self.info.get("trial_id").and_then(Value::as_str)
    }

    pub fn state(&self) -> Option<StateId> {
        self.info
            .get("state")
            .and_then(Value::as_u64)
            .map(|s| s as StateId)
    }
}

/// Logging collaborator. Fire-and-forget: sinks cannot fail the trial.
pub trait EventSink {
    fn log_event(&mut self, event: &TrialEvent);
}

impl<F: FnMut(&TrialEvent)> EventSink for F {
    fn log_event(&mut self, event: &TrialEvent) {
        self(event)
    }
}

/// Keeps every event in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<TrialEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TrialEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.event).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.event == name).count()
    }
}

impl EventSink for MemorySink {
    fn log_event(&mut self, event: &TrialEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_events_use_tagged_json() {
        let e: InputEvent = serde_json::from_str(r#"{"type": "click", "state": 3}"#).unwrap();
        assert_eq!(e, InputEvent::click(3));
        let k: InputEvent = serde_json::from_str(r#"{"type": "key", "key": "space"}"#).unwrap();
        assert_eq!(k, InputEvent::key("space"));
        let s: InputEvent = serde_json::from_str(r#"{"type": "start"}"#).unwrap();
        assert_eq!(s, InputEvent::Start);
    }

    #[test]
    fn memory_sink_clones_share_events() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        let mut info = Map::new();
        info.insert("trial_id".into(), Value::from("t"));
        info.insert("state".into(), Value::from(2));
        writer.log_event(&TrialEvent {
            event: "graph.visit".into(),
            info,
        });
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trial_id(), Some("t"));
        assert_eq!(events[0].state(), Some(2));
        assert_eq!(sink.count("graph.visit"), 1);
    }
}
