//! Trial controller: one participant run through a graph.
//!
//! Phases run in order `Constructed -> AwaitingStart -> [Planning] ->
//! Navigating -> Terminated`. Input arrives on an unbounded channel and is
//! only read at explicit suspension points; each point names the [`Gate`] it
//! accepts. Events that queue up during timed delays are re-checked against
//! the gate that eventually reads them, so a stale click can never resolve a
//! wait it was not valid for.

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::graph::{Graph, StateId};
use crate::layout::Layout;
use crate::prng::{Prng, Randomizer};
use crate::scene::{reward_color, reward_label, RenderHandle, Scene, REWARD_COLOR_MAX, REWARD_COLOR_MIN};
use crate::trial::config::{ConfigError, DemoAction, RevealBy, TrialConfig, TrialUpdate};
use crate::trial::error::TrialError;
use crate::trial::events::{EventSink, InputEvent, TrialEvent};
use crate::trial::render::{NullRenderer, Renderer};
use crate::trial::view::{EdgeView, StateView, ViewModel};

/// Delay before the collected-reward animation starts.
pub const COLLECT_DELAY: Duration = Duration::from_millis(200);
pub const ROLLOUT_STEP_DELAY: Duration = Duration::from_millis(800);
pub const FORCED_HOVER_DELAY: Duration = Duration::from_millis(1000);

const FORCED_MOVE_DELAY: Duration = Duration::from_millis(500);
const STEP_DELAY: Duration = Duration::from_millis(200);
const DONE_DELAY: Duration = Duration::from_millis(500);
const START_DELAY: Duration = Duration::from_millis(200);
const REMOVE_DELAY: Duration = Duration::from_millis(300);
const HOVER_TRANSITION: Duration = Duration::from_millis(300);
const CLICK_TRANSITION: Duration = Duration::from_millis(500);

// Walks on cyclic graphs may never reach a terminal state.
const MAX_ROLLOUT_LEN: usize = 10_000;

const DEMO_KEYS: &[&str] = &["t", "space"];
const DEMO_BEGIN_KEYS: &[&str] = &["enter"];
const PLAYBACK_HELP: &str = "Participant playback: step through actions with space. \
The next fixated state is highlighted. Press enter to begin.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Constructed,
    AwaitingStart,
    Planning,
    Navigating,
    ForcedHovers,
    Demo,
    Rollout,
    Terminated,
}

/// How the graph is left once navigation ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeaveMode {
    /// Fade the whole graph out.
    #[default]
    Fade,
    /// Leave everything on screen.
    KeepState,
    /// Fade only the final state and rewards.
    Open,
}

pub type Termination = Box<dyn Fn(&Graph, StateId) -> bool>;

/// Per-call overrides for [`TrialController::navigate`].
#[derive(Default)]
pub struct NavigateOptions {
    pub goal: Option<StateId>,
    pub n_steps: Option<u32>,
    /// Replaces the default "terminal state or goal" check. The step budget
    /// still applies.
    pub termination: Option<Termination>,
    pub leave: LeaveMode,
}

impl std::fmt::Debug for NavigateOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigateOptions")
            .field("goal", &self.goal)
            .field("n_steps", &self.n_steps)
            .field("termination", &self.termination.is_some())
            .field("leave", &self.leave)
            .finish()
    }
}

/// Point-in-time copy of the mutable trial state, handed to debug hooks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialSnapshot {
    pub trial_id: String,
    pub phase: Phase,
    pub current_state: Option<StateId>,
    pub score: f64,
    pub rewards: Vec<f64>,
    pub steps_left: Option<u32>,
    pub planning_active: bool,
}

/// What a suspension point is willing to accept.
#[derive(Debug, Clone, Copy)]
enum Gate<'a> {
    Start,
    Keys(&'a [&'a str]),
    Click(&'a [StateId]),
    HoverOn(StateId),
    /// Click on this state ends planning.
    Confirm(StateId),
}

impl Gate<'_> {
    fn admits(&self, event: &InputEvent) -> bool {
        match (self, event) {
            (Gate::Start, InputEvent::Start) => true,
            (Gate::Keys(keys), InputEvent::Key { key }) => keys.contains(&key.as_str()),
            (Gate::Click(eligible), InputEvent::Click { state }) => eligible.contains(state),
            (Gate::HoverOn(target), InputEvent::Hover { state }) => state == target,
            (Gate::Confirm(target), InputEvent::Click { state }) => state == target,
            _ => false,
        }
    }
}

pub struct TrialBuilder {
    config: TrialConfig,
    renderer: Box<dyn Renderer>,
    sinks: Vec<Box<dyn EventSink>>,
    rng: Option<Box<dyn Randomizer>>,
    edge_show: Option<Box<dyn Fn(StateId, StateId) -> bool>>,
    on_state_visit: Option<Box<dyn FnMut(StateId)>>,
    debug_hook: Option<Box<dyn FnMut(&TrialSnapshot)>>,
}

impl TrialBuilder {
    pub fn new(config: TrialConfig) -> Self {
        Self {
            config,
            renderer: Box::new(NullRenderer),
            sinks: Vec::new(),
            rng: None,
            edge_show: None,
            on_state_visit: None,
            debug_hook: None,
        }
    }

    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Add a logging collaborator; every sink sees every event.
    pub fn sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Defaults to a [`Prng`] seeded from `config.seed`.
    pub fn randomizer(mut self, rng: impl Randomizer + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Which outgoing edges of the current state are marked current.
    pub fn edge_show(mut self, f: impl Fn(StateId, StateId) -> bool + 'static) -> Self {
        self.edge_show = Some(Box::new(f));
        self
    }

    pub fn on_state_visit(mut self, f: impl FnMut(StateId) + 'static) -> Self {
        self.on_state_visit = Some(Box::new(f));
        self
    }

    /// Called with a snapshot after every visit and phase change.
    pub fn debug_hook(mut self, f: impl FnMut(&TrialSnapshot) + 'static) -> Self {
        self.debug_hook = Some(Box::new(f));
        self
    }

    /// Validates the config, lays out and mounts the graph.
    pub fn build(self, input: UnboundedReceiver<InputEvent>) -> Result<TrialController, TrialError> {
        let TrialBuilder {
            config,
            mut renderer,
            sinks,
            rng,
            edge_show,
            on_state_visit,
            debug_hook,
        } = self;

        let mut graph = config.build_graph()?;
        config.validate(&graph)?;

        let mut seeded = config.seed.map(Prng::new).unwrap_or_else(Prng::from_entropy);
        let trial_id = seeded.trial_id();
        let mut rng: Box<dyn Randomizer> = rng.unwrap_or_else(|| Box::new(seeded));

        if config.shuffle {
            graph.shuffle_successors(rng.as_mut());
        }
        let layout = config.layout.compute(&graph, config.start)?;

        let edge_show: Box<dyn Fn(StateId, StateId) -> bool> =
            edge_show.unwrap_or_else(|| Box::new(|_, _| true));

        let mut rewards = config.initial_rewards(&graph);
        if config.consume {
            rewards[config.start] = 0.0;
        }

        let scene = Scene::build(&graph, &layout, config.goal, &rewards, config.layout.scale);
        let root = renderer.mount(&scene).root()?;

        let hide_states = !config.revealed && config.hover_rewards;
        let hide_edges = (!config.revealed && config.hover_edges) || config.only_show_current_edges;
        let views = ViewModel::new(&graph, hide_states, hide_edges);

        let mut controller = TrialController {
            steps_left: config.step_budget(),
            n_steps: config.step_budget(),
            score: config.score,
            config,
            graph,
            layout,
            trial_id,
            root,
            phase: Phase::Constructed,
            current_state: None,
            rewards,
            planning_active: false,
            views,
            input,
            renderer,
            sinks,
            rng,
            edge_show,
            on_state_visit,
            debug_hook,
        };
        controller.mount_views();
        Ok(controller)
    }
}

pub struct TrialController {
    config: TrialConfig,
    graph: Graph,
    layout: Layout,
    trial_id: String,
    root: RenderHandle,

    phase: Phase,
    current_state: Option<StateId>,
    rewards: Vec<f64>,
    score: f64,
    planning_active: bool,
    n_steps: Option<u32>,
    steps_left: Option<u32>,
    views: ViewModel,

    input: UnboundedReceiver<InputEvent>,
    renderer: Box<dyn Renderer>,
    sinks: Vec<Box<dyn EventSink>>,
    rng: Box<dyn Randomizer>,
    edge_show: Box<dyn Fn(StateId, StateId) -> bool>,
    on_state_visit: Option<Box<dyn FnMut(StateId)>>,
    debug_hook: Option<Box<dyn FnMut(&TrialSnapshot)>>,
}

impl TrialController {
    pub fn builder(config: TrialConfig) -> TrialBuilder {
        TrialBuilder::new(config)
    }

    pub fn trial_id(&self) -> &str {
        &self.trial_id
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    pub fn root(&self) -> RenderHandle {
        self.root
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_state(&self) -> Option<StateId> {
        self.current_state
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn rewards(&self) -> &[f64] {
        &self.rewards
    }

    pub fn steps_left(&self) -> Option<u32> {
        self.steps_left
    }

    pub fn planning_active(&self) -> bool {
        self.planning_active
    }

    pub fn views(&self) -> &ViewModel {
        &self.views
    }

    pub fn snapshot(&self) -> TrialSnapshot {
        TrialSnapshot {
            trial_id: self.trial_id.clone(),
            phase: self.phase,
            current_state: self.current_state,
            score: self.score,
            rewards: self.rewards.clone(),
            steps_left: self.steps_left,
            planning_active: self.planning_active,
        }
    }

    // ---------------------------------------------------------------------
    // Phases
    // ---------------------------------------------------------------------

    /// Whole trial: start screen, planning unless revealed, navigation.
    pub async fn run(&mut self) -> Result<Vec<StateId>, TrialError> {
        info!(trial_id = %self.trial_id, start = self.config.start, "trial starting");
        self.set_current_state(self.config.start);
        self.show_start_screen().await?;
        if !self.config.revealed {
            self.plan().await?;
        }
        let path = self.navigate(NavigateOptions::default()).await?;
        info!(trial_id = %self.trial_id, score = self.score, steps = path.len(), "trial finished");
        Ok(path)
    }

    pub async fn show_start_screen(&mut self) -> Result<(), TrialError> {
        if self.config.fast {
            self.show_graph();
            return Ok(());
        }
        self.log_event("graph.showStartScreen", Value::Null);
        self.set_phase(Phase::AwaitingStart);

        if self.config.is_demo() {
            self.renderer.show_message(Some(PLAYBACK_HELP));
            self.wait(Gate::Keys(DEMO_BEGIN_KEYS)).await?;
            self.renderer.show_message(None);
            self.show_graph();
            return Ok(());
        }

        if let Some(message) = &self.config.start_message {
            self.renderer.show_message(Some(message));
        }
        self.wait(Gate::Start).await?;
        if self.config.start_message.is_some() {
            self.renderer.show_message(None);
        }
        sleep(START_DELAY).await;
        self.show_graph();
        Ok(())
    }

    pub fn show_graph(&mut self) {
        self.log_event("graph.showGraph", Value::Null);
        self.renderer
            .set_counters_visible(self.config.show_steps(), self.config.show_points);
        self.renderer.set_graph_visible(true);
    }

    pub async fn remove_graph(&mut self) {
        self.renderer.fade_out(None, REMOVE_DELAY);
        sleep(REMOVE_DELAY).await;
        self.renderer.set_graph_visible(false);
    }

    /// Starts imagination without waiting for it to end. Returns `false`
    /// (and does nothing) in demo mode or when planning is already active.
    pub fn begin_planning(&mut self) -> bool {
        if self.config.is_demo() || self.planning_active {
            return false;
        }
        self.planning_active = true;
        self.set_phase(Phase::Planning);
        self.log_event("graph.imagination.start", Value::Null);

        let transition = match self.config.reveal_by {
            RevealBy::Hover => HOVER_TRANSITION,
            RevealBy::Click => CLICK_TRANSITION,
        };
        self.renderer.set_reveal_transition(Some(transition));
        for state in self.views.state_ids() {
            self.mark_state(state, StateView::Selectable, true);
        }
        true
    }

    /// Planning phase: imagination until the participant clicks the current
    /// state. A no-op if planning is already running.
    pub async fn plan(&mut self) -> Result<(), TrialError> {
        if !self.begin_planning() {
            return Ok(());
        }
        self.await_planning_exit().await
    }

    pub async fn await_planning_exit(&mut self) -> Result<(), TrialError> {
        let ready = self.current_state.unwrap_or(self.config.start);
        self.wait(Gate::Confirm(ready)).await?;
        self.end_planning();
        Ok(())
    }

    fn end_planning(&mut self) {
        self.log_event("graph.imagination.end", Value::Null);
        self.planning_active = false;
        self.clear_state_flag(StateView::Selectable);
        self.renderer.set_reveal_transition(None);
    }

    /// Main navigation loop. Returns the states clicked into, in order.
    pub async fn navigate(&mut self, options: NavigateOptions) -> Result<Vec<StateId>, TrialError> {
        let mut path = Vec::new();
        self.log_event(
            "graph.navigate",
            json!({ "goal": options.goal, "n_steps": options.n_steps }),
        );
        if self.current_state.is_none() {
            self.set_current_state(self.config.start);
        }
        let goal = options.goal.or(self.config.goal);
        self.steps_left = options.n_steps.filter(|&n| n > 0).or(self.n_steps);
        self.renderer.set_steps(self.steps_left);
        self.set_phase(Phase::Navigating);

        let here = self.current_state.unwrap_or(self.config.start);
        self.visit_state(here, true).await;

        if self.config.is_demo() {
            self.show_demo().await?;
            self.set_phase(Phase::Terminated);
            return Ok(path);
        }

        if self.config.forced_hovers {
            self.show_forced_hovers(0, None).await?;
            self.show_outgoing_edges(here);
        }

        loop {
            let from = self.current_state.unwrap_or(self.config.start);
            let mut eligible: Vec<StateId> = self
                .graph
                .successors(from)
                .iter()
                .copied()
                .filter(|&s| s != from && Some(s) != goal)
                .collect();
            eligible.dedup();
            if eligible.is_empty() {
                warn!(trial_id = %self.trial_id, state = from, "no clickable successors; ending navigation");
                self.finish(from, "no_moves", options.leave).await;
                break;
            }

            let invalid: Vec<StateId> = self
                .graph
                .states()
                .iter()
                .copied()
                .filter(|s| !eligible.contains(s))
                .collect();
            let to = self.click_transition(Some(&invalid)).await?;

            if self.config.forced_hovers {
                self.hide_all_edges();
                self.show_edge(from, to);
                self.show_state(to);
            }
            path.push(to);
            self.visit_state(to, false).await;
            if self.config.forced_hovers {
                sleep(FORCED_MOVE_DELAY).await;
                self.show_outgoing_edges(to);
            }

            if self.config.rollout {
                self.execute_rollout().await;
            }

            if let Some(steps) = self.steps_left.as_mut() {
                *steps = steps.saturating_sub(1);
            }
            self.renderer.set_steps(self.steps_left);

            let at = self.current_state.unwrap_or(to);
            let reached = match &options.termination {
                Some(done) => done(&self.graph, at),
                None => self.graph.is_terminal(at) || Some(at) == goal,
            };
            if reached || self.steps_left == Some(0) {
                self.finish(at, "done", options.leave).await;
                break;
            }
            sleep(STEP_DELAY).await;
        }
        Ok(path)
    }

    async fn finish(&mut self, state: StateId, reason: &str, leave: LeaveMode) {
        self.log_event("graph.done", json!({ "state": state, "reason": reason }));
        sleep(DONE_DELAY).await;
        self.clear_edge_flag(EdgeView::Current);
        match leave {
            LeaveMode::KeepState => {}
            LeaveMode::Open => {
                self.renderer.fade_out(Some(state), DONE_DELAY);
                sleep(DONE_DELAY * 2).await;
            }
            LeaveMode::Fade => {
                sleep(START_DELAY).await;
                self.renderer.fade_out(None, START_DELAY);
                sleep(DONE_DELAY).await;
            }
        }
        self.clear_state_flag(StateView::Current);
        self.clear_state_flag(StateView::Selectable);
        self.set_phase(Phase::Terminated);
    }

    /// Marks every state outside `invalid_states` (default: current and
    /// goal) selectable and resolves with the first click on one of them.
    pub async fn click_transition(&mut self, invalid_states: Option<&[StateId]>) -> Result<StateId, TrialError> {
        let invalid: Vec<StateId> = match invalid_states {
            Some(states) => states.to_vec(),
            None => self.current_state.into_iter().chain(self.config.goal).collect(),
        };
        let eligible: Vec<StateId> = self
            .graph
            .states()
            .iter()
            .copied()
            .filter(|s| !invalid.contains(s))
            .collect();
        for &state in self.graph.states().to_vec().iter() {
            self.mark_state(state, StateView::Selectable, eligible.contains(&state));
        }
        self.wait_state(Gate::Click(&eligible)).await
    }

    /// The single place a state is arrived at.
    pub async fn visit_state(&mut self, state: StateId, initial: bool) {
        self.log_event("graph.visit", json!({ "state": state, "initial": initial }));
        if let Some(callback) = self.on_state_visit.as_mut() {
            callback(state);
        }
        self.set_current_state(state);
        self.show_reward_marker(state);

        if !initial {
            let points = self.rewards.get(state).copied().unwrap_or(0.0);
            self.add_points(points, state);
            if self.config.consume && state < self.rewards.len() {
                self.rewards[state] = 0.0;
                sleep(COLLECT_DELAY).await;
                self.renderer.collect_reward(state);
            }
        }
        self.notify_debug();
    }

    /// Uniform random walk from the current state to a terminal state, then
    /// replayed as visits. Returns the walk including its origin.
    pub async fn execute_rollout(&mut self) -> Vec<StateId> {
        let origin = self.current_state.unwrap_or(self.config.start);
        let mut walk = vec![origin];
        let mut state = origin;
        while let Some(next) = self.rng.sample(self.graph.successors(state)) {
            walk.push(next);
            state = next;
            if walk.len() > MAX_ROLLOUT_LEN {
                warn!(trial_id = %self.trial_id, origin, "rollout did not reach a terminal state; truncated");
                break;
            }
        }

        let resume = self.phase;
        self.set_phase(Phase::Rollout);
        self.log_event("graph.rollout", json!({ "path": walk }));
        for &step in &walk[1..] {
            self.visit_state(step, false).await;
            sleep(ROLLOUT_STEP_DELAY).await;
        }
        self.set_phase(resume);
        walk
    }

    /// Guided onboarding: for each expansion, cue the target and wait until
    /// it is actually hovered.
    pub async fn show_forced_hovers(&mut self, start: usize, stop: Option<usize>) -> Result<(), TrialError> {
        let expansions = self.config.expansions.clone();
        let stop = stop.unwrap_or(expansions.len()).min(expansions.len());
        let resume = self.phase;
        self.set_phase(Phase::ForcedHovers);
        self.log_event("graph.forced.start", Value::Null);

        if let Some(&(first, _)) = expansions.first() {
            self.hover(first);
        }
        for &(s1, s2) in expansions.get(start..stop).unwrap_or(&[]) {
            sleep(FORCED_HOVER_DELAY).await;
            self.highlight(s2);
            self.wait_state(Gate::HoverOn(s2)).await?;
            self.unhighlight(s2);
            let duration = FORCED_HOVER_DELAY.as_millis() as u64;
            self.log_event("graph.forced.hover", json!({ "s1": s1, "s2": s2, "duration": duration }));
            self.hover(s2);
        }
        sleep(FORCED_HOVER_DELAY).await;
        self.log_event("graph.forced.end", Value::Null);
        self.set_phase(resume);
        Ok(())
    }

    /// Replays the recorded actions, one per key press.
    pub async fn show_demo(&mut self) -> Result<(), TrialError> {
        let actions = self.config.actions.clone().unwrap_or_default();
        self.set_phase(Phase::Demo);

        let first = actions.first().copied().filter(|a| a.is_fixate());
        if let Some(a) = first {
            self.cue_upcoming(a.state(), true);
        }
        self.wait(Gate::Keys(DEMO_KEYS)).await?;
        if let Some(a) = first {
            self.cue_upcoming(a.state(), false);
        }

        for (i, &action) in actions.iter().enumerate() {
            let next = actions.get(i + 1).copied().filter(|a| a.is_fixate());
            if let Some(n) = next {
                self.cue_upcoming(n.state(), true);
            }
            self.hover(action.state());
            if let DemoAction::Move { state } = action {
                self.visit_state(state, false).await;
            }
            self.wait(Gate::Keys(DEMO_KEYS)).await?;
            if let Some(n) = next {
                self.cue_upcoming(n.state(), false);
            }
        }
        Ok(())
    }

    /// Applies per-trial overrides to a live controller.
    pub fn load_trial(&mut self, update: TrialUpdate) -> Result<(), TrialError> {
        if let Some(start) = update.start {
            if !self.graph.contains(start) {
                return Err(ConfigError::UnknownState { role: "start", state: start }.into());
            }
            self.set_current_state(start);
        }
        if let Some(rewards) = update.rewards {
            self.set_rewards(&rewards)?;
        }
        if let Some(n) = update.n_steps {
            self.n_steps = Some(n).filter(|&n| n > 0);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Input
    // ---------------------------------------------------------------------

    async fn wait(&mut self, gate: Gate<'_>) -> Result<InputEvent, TrialError> {
        loop {
            let event = self.input.recv().await.ok_or(TrialError::InputClosed)?;
            self.imagine(&event);
            if gate.admits(&event) {
                return Ok(event);
            }
            if let (Gate::Click(_), InputEvent::Click { state }) = (gate, &event) {
                self.report_invalid_click(*state);
            }
            debug!(trial_id = %self.trial_id, ?event, ?gate, "input not accepted here");
        }
    }

    /// Clicks on a state that is not a successor of the current one are
    /// logged; the wait that saw them keeps going.
    fn report_invalid_click(&mut self, to: StateId) {
        let Some(from) = self.current_state else {
            return;
        };
        if !self.graph.contains(to) || self.graph.successors(from).contains(&to) {
            return;
        }
        let err = TrialError::InvalidTransition { from, to };
        warn!(trial_id = %self.trial_id, "{err}");
        self.log_event(
            "graph.invalid_transition",
            json!({ "from": from, "to": to, "error": err.to_string() }),
        );
    }

    async fn wait_state(&mut self, gate: Gate<'_>) -> Result<StateId, TrialError> {
        loop {
            if let Some(state) = self.wait(gate).await?.state() {
                return Ok(state);
            }
        }
    }

    /// Planning-phase imagination; the only input handled outside a gate.
    fn imagine(&mut self, event: &InputEvent) {
        if !self.planning_active {
            return;
        }
        match (self.config.reveal_by, event) {
            (RevealBy::Hover, InputEvent::Hover { state }) | (RevealBy::Click, InputEvent::Click { state }) => {
                if self.graph.contains(*state) {
                    self.log_event("graph.imagine", json!({ "state": state }));
                    self.hover(*state);
                }
            }
            (RevealBy::Hover, InputEvent::Unhover { state }) => self.unhover(*state),
            _ => {}
        }
    }

    // ---------------------------------------------------------------------
    // Visuals
    // ---------------------------------------------------------------------

    pub fn set_current_state(&mut self, state: StateId) {
        self.current_state = Some(state);
        self.clear_state_flag(StateView::Current);
        self.clear_edge_flag(EdgeView::Current);
        self.mark_state(state, StateView::Current, true);

        let shown: Vec<StateId> = self
            .graph
            .successors(state)
            .iter()
            .copied()
            .filter(|&to| (self.edge_show)(state, to))
            .collect();
        for to in shown {
            self.mark_edge(state, to, EdgeView::Current, true);
        }
        if self.config.only_show_current_edges {
            for (from, to) in self.views.edge_ids() {
                let views = if self.views.edge(from, to).contains(EdgeView::Current) {
                    self.views.show_edge(from, to)
                } else {
                    self.views.hide_edge(from, to)
                };
                if let Some(views) = views {
                    self.renderer.set_edge_view(from, to, views);
                }
            }
        }
        self.hover(state);
    }

    pub fn hover(&mut self, state: StateId) {
        if self.config.keep_hover {
            self.unhover_all();
        }
        if self.config.show_hovered_reward {
            self.show_state(state);
        }
        self.mark_state(state, StateView::Hovered, true);
        for to in self.graph.successors(state).to_vec() {
            self.show_edge(state, to);
            if self.config.show_successor_rewards {
                self.show_state(to);
            }
        }
        if self.config.show_predecessors {
            for from in self.graph.predecessors(state) {
                self.show_edge(from, state);
            }
        }
    }

    pub fn unhover(&mut self, state: StateId) {
        if self.config.forced_hovers || self.config.keep_hover {
            return;
        }
        self.mark_state(state, StateView::Hovered, false);
        if self.config.show_hovered_reward {
            self.hide_state(state);
        }
        for to in self.graph.successors(state).to_vec() {
            self.hide_edge(state, to);
            if self.config.show_successor_rewards {
                self.hide_state(to);
            }
        }
        if self.config.show_predecessors {
            for from in self.graph.predecessors(state) {
                self.hide_edge(from, state);
            }
        }
    }

    pub fn unhover_all(&mut self) {
        for state in self.views.state_ids() {
            if let Some(views) = self.views.hide_state(state) {
                self.renderer.set_state_view(state, views);
            }
        }
        self.clear_state_flag(StateView::Hovered);
        self.hide_all_edges();
    }

    pub fn highlight(&mut self, state: StateId) {
        self.log_event("graph.highlight", json!({ "state": state }));
        self.mark_state(state, StateView::Highlighted, true);
    }

    pub fn unhighlight(&mut self, state: StateId) {
        self.log_event("graph.unhighlight", json!({ "state": state }));
        self.mark_state(state, StateView::Highlighted, false);
    }

    fn cue_upcoming(&mut self, state: StateId, on: bool) {
        let event = if on { "graph.highlight" } else { "graph.unhighlight" };
        self.log_event(event, json!({ "state": state, "cue": "upcoming" }));
        self.mark_state(state, StateView::Upcoming, on);
    }

    /// Only edge `s1 -> s2` keeps the highlight.
    pub fn highlight_edge(&mut self, s1: StateId, s2: StateId) {
        self.clear_edge_flag(EdgeView::Highlighted);
        self.mark_edge(s1, s2, EdgeView::Highlighted, true);
    }

    pub fn show_state(&mut self, state: StateId) {
        if let Some(views) = self.views.show_state(state) {
            self.renderer.set_state_view(state, views);
        }
    }

    pub fn hide_state(&mut self, state: StateId) {
        self.log_event("graph.hide_state", json!({ "state": state }));
        if let Some(views) = self.views.hide_state(state) {
            self.renderer.set_state_view(state, views);
        }
    }

    /// No-op under `only_show_current_edges`, where only the current
    /// state's edges are ever visible.
    pub fn show_edge(&mut self, from: StateId, to: StateId) {
        if self.config.only_show_current_edges {
            return;
        }
        if let Some(views) = self.views.show_edge(from, to) {
            self.renderer.set_edge_view(from, to, views);
        }
    }

    pub fn hide_edge(&mut self, from: StateId, to: StateId) {
        if self.config.only_show_current_edges {
            return;
        }
        if let Some(views) = self.views.hide_edge(from, to) {
            self.renderer.set_edge_view(from, to, views);
        }
    }

    pub fn hide_all_edges(&mut self) {
        for (from, to) in self.views.edge_ids() {
            self.hide_edge(from, to);
        }
    }

    pub fn show_outgoing_edges(&mut self, state: StateId) {
        self.hide_all_edges();
        for to in self.graph.successors(state).to_vec() {
            self.show_edge(state, to);
        }
    }

    // ---------------------------------------------------------------------
    // Score and rewards
    // ---------------------------------------------------------------------

    pub fn add_points(&mut self, points: f64, state: StateId) {
        self.log_event("graph.addPoints", json!({ "points": points, "state": state }));
        if points == 0.0 {
            return;
        }
        self.set_score(self.score + points);
    }

    /// Signed reward label next to `state`, colored like its fill.
    pub fn show_reward_marker(&mut self, state: StateId) {
        let reward = self.rewards.get(state).copied().unwrap_or(0.0);
        let label = reward_label(reward);
        let color = reward_color(reward, REWARD_COLOR_MIN, REWARD_COLOR_MAX);
        self.renderer.show_reward_marker(state, &label, color);
    }

    pub fn set_score(&mut self, score: f64) {
        self.score = score;
        self.renderer.set_score(score);
    }

    pub fn set_reward(&mut self, state: StateId, reward: f64) {
        if let Some(slot) = self.rewards.get_mut(state) {
            *slot = reward;
            self.renderer.set_reward(state, reward);
        }
    }

    /// Replaces all rewards; the current state always shows zero.
    pub fn set_rewards(&mut self, rewards: &[f64]) -> Result<(), TrialError> {
        if rewards.len() != self.rewards.len() {
            return Err(ConfigError::RewardCount {
                expected: self.rewards.len(),
                found: rewards.len(),
            }
            .into());
        }
        for (state, &reward) in rewards.iter().enumerate() {
            let value = if self.current_state == Some(state) { 0.0 } else { reward };
            self.set_reward(state, value);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Plumbing
    // ---------------------------------------------------------------------

    fn mount_views(&mut self) {
        self.log_event(
            "graph.construct",
            json!({
                "graph": self.graph.states().iter().map(|&s| json!([s, self.graph.successors(s)])).collect::<Vec<_>>(),
                "n_steps": self.config.n_steps,
                "rewards": self.config.rewards,
                "start": self.config.start,
                "hover_edges": self.config.hover_edges,
                "hover_rewards": self.config.hover_rewards,
                "expansions": self.config.expansions,
            }),
        );
        for state in self.views.state_ids() {
            self.renderer.set_state_view(state, self.views.state(state));
            let reward = self.rewards.get(state).copied().unwrap_or(0.0);
            self.renderer.set_reward(state, reward);
        }
        for (from, to) in self.views.edge_ids() {
            self.renderer.set_edge_view(from, to, self.views.edge(from, to));
        }
        self.renderer.set_score(self.score);
    }

    fn mark_state(&mut self, state: StateId, flag: StateView, on: bool) {
        if let Some(views) = self.views.mark_state(state, flag, on) {
            self.renderer.set_state_view(state, views);
        }
    }

    fn mark_edge(&mut self, from: StateId, to: StateId, flag: EdgeView, on: bool) {
        if let Some(views) = self.views.mark_edge(from, to, flag, on) {
            self.renderer.set_edge_view(from, to, views);
        }
    }

    fn clear_state_flag(&mut self, flag: StateView) {
        for state in self.views.states_with(flag) {
            self.mark_state(state, flag, false);
        }
    }

    fn clear_edge_flag(&mut self, flag: EdgeView) {
        for (from, to) in self.views.edges_with(flag) {
            self.mark_edge(from, to, flag, false);
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(trial_id = %self.trial_id, from = ?self.phase, to = ?phase, "phase");
            self.phase = phase;
            self.notify_debug();
        }
    }

    fn notify_debug(&mut self) {
        if self.debug_hook.is_none() {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(hook) = self.debug_hook.as_mut() {
            hook(&snapshot);
        }
    }

    fn log_event(&mut self, event: &str, info: Value) {
        let mut info = match info {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        info.insert("trial_id".to_string(), Value::from(self.trial_id.as_str()));
        let event = TrialEvent {
            event: event.to_string(),
            info,
        };
        let details = Value::Object(event.info.clone());
        debug!(trial_id = %self.trial_id, event = %event.event, info = %details, "event");
        for sink in &mut self.sinks {
            sink.log_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

    use super::*;
    use crate::prng::ScriptedRandomizer;
    use crate::scene::RenderError;
    use crate::trial::events::MemorySink;
    use crate::trial::render::{RecordingRenderer, RenderCall};

    fn config(value: Value) -> TrialConfig {
        serde_json::from_value(value).unwrap()
    }

    /// Queues `events` up front and closes the channel behind them.
    fn controller(builder: TrialBuilder, events: Vec<InputEvent>) -> (TrialController, MemorySink) {
        let (tx, rx) = unbounded_channel();
        send_all(&tx, events);
        drop(tx);
        let sink = MemorySink::new();
        let trial = builder.sink(sink.clone()).build(rx).unwrap();
        (trial, sink)
    }

    fn send_all(tx: &UnboundedSender<InputEvent>, events: Vec<InputEvent>) {
        for event in events {
            tx.send(event).unwrap();
        }
    }

    fn fork() -> Value {
        json!({
            "graph": [[1, 2], [], []],
            "start": 0,
            "rewards": [0.0, 5.0, -3.0],
            "revealed": true,
            "fast": true,
            "seed": 7
        })
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_click_ends_the_trial() {
        let (mut trial, sink) = controller(TrialBuilder::new(config(fork())), vec![InputEvent::click(1)]);
        let path = trial.run().await.unwrap();

        assert_eq!(path, vec![1]);
        assert_eq!(trial.score(), 5.0);
        assert_eq!(trial.rewards()[1], 0.0);
        assert_eq!(trial.phase(), Phase::Terminated);
        assert_eq!(sink.count("graph.done"), 1);

        let id = trial.trial_id().to_string();
        assert!(sink.events().iter().all(|e| e.trial_id() == Some(id.as_str())));
        assert_eq!(sink.names().first().map(String::as_str), Some("graph.construct"));
    }

    #[tokio::test(start_paused = true)]
    async fn goal_is_never_clickable() {
        let mut cfg = fork();
        cfg["goal"] = json!(2);
        let (mut trial, _) = controller(TrialBuilder::new(config(cfg.clone())), vec![InputEvent::click(2)]);
        let err = trial.navigate(NavigateOptions::default()).await.unwrap_err();
        assert!(matches!(err, TrialError::InputClosed));
        assert_eq!(trial.score(), 0.0);

        let events = vec![InputEvent::click(2), InputEvent::click(0), InputEvent::click(1)];
        let (mut trial, _) = controller(TrialBuilder::new(config(cfg)), events);
        trial.set_current_state(0);
        assert_eq!(trial.click_transition(None).await.unwrap(), 1);
        assert!(trial.views().state(1).contains(StateView::Selectable));
        assert!(!trial.views().state(2).contains(StateView::Selectable));
    }

    #[tokio::test(start_paused = true)]
    async fn rollout_walks_to_a_terminal_state() {
        let cfg = config(json!({
            "graph": [[1], [2, 3], [], [4], []],
            "start": 0,
            "rewards": [0.0, 1.0, 2.0, 3.0, 4.0],
            "revealed": true,
            "fast": true,
            "rollout": true
        }));
        let builder = TrialBuilder::new(cfg).randomizer(ScriptedRandomizer::new(vec![1, 0]));
        let (mut trial, sink) = controller(builder, vec![InputEvent::click(1)]);
        let path = trial.run().await.unwrap();

        assert_eq!(path, vec![1]);
        assert_eq!(trial.current_state(), Some(4));
        assert_eq!(trial.score(), 8.0);
        let rollout = sink.events().into_iter().find(|e| e.event == "graph.rollout").unwrap();
        assert_eq!(rollout.info["path"], json!([1, 3, 4]));
        assert_eq!(sink.count("graph.visit"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn planning_starts_once() {
        let mut cfg = fork();
        cfg["revealed"] = json!(false);
        let events = vec![
            InputEvent::hover(1),
            InputEvent::hover(2),
            InputEvent::click(1),
            InputEvent::click(0),
        ];
        let (mut trial, sink) = controller(TrialBuilder::new(config(cfg)), events);
        trial.set_current_state(0);

        assert!(trial.begin_planning());
        assert!(!trial.begin_planning());
        let plan = tokio::time::timeout(Duration::from_secs(1), trial.plan()).await;
        assert!(matches!(plan, Ok(Ok(()))));
        assert!(trial.planning_active());

        trial.await_planning_exit().await.unwrap();
        assert!(!trial.planning_active());
        assert_eq!(sink.count("graph.imagination.start"), 1);
        assert_eq!(sink.count("graph.imagine"), 2);
        assert_eq!(sink.count("graph.imagination.end"), 1);
        assert!(trial.views().states_with(StateView::Selectable).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn full_trial_with_start_screen_and_planning() {
        let mut cfg = fork();
        cfg["revealed"] = json!(false);
        cfg["fast"] = json!(false);
        cfg["start_message"] = json!("Ready?");
        let events = vec![
            InputEvent::Start,
            InputEvent::hover(1),
            InputEvent::click(1),
            InputEvent::click(0),
            InputEvent::click(2),
        ];
        let renderer = RecordingRenderer::new();
        let builder = TrialBuilder::new(config(cfg)).renderer(renderer.clone());
        let (mut trial, sink) = controller(builder, events);
        let path = trial.run().await.unwrap();

        // The click on 1 arrived while planning and never reached navigation.
        assert_eq!(path, vec![2]);
        assert_eq!(trial.score(), -3.0);

        let names = sink.names();
        let at = |name: &str| names.iter().position(|n| n == name).unwrap();
        assert!(at("graph.showStartScreen") < at("graph.showGraph"));
        assert!(at("graph.imagination.start") < at("graph.imagine"));
        assert!(at("graph.imagination.end") < at("graph.navigate"));
        assert_eq!(names.last().map(String::as_str), Some("graph.done"));

        let calls = renderer.calls();
        assert!(calls.contains(&RenderCall::Message(Some("Ready?".into()))));
        assert!(calls.contains(&RenderCall::GraphVisible(true)));
        assert!(calls.contains(&RenderCall::FadeOut(None, START_DELAY)));
    }

    #[tokio::test(start_paused = true)]
    async fn demo_replays_actions_on_key_presses() {
        let mut cfg = fork();
        cfg["revealed"] = json!(false);
        cfg["fast"] = json!(false);
        cfg["rewards"] = json!([0.0, 3.0, 1.0]);
        cfg["actions"] = json!([{"type": "fixate", "state": 1}, {"type": "move", "state": 1}]);
        let events = vec![
            InputEvent::key("space"),
            InputEvent::key("enter"),
            InputEvent::click(2),
            InputEvent::key("space"),
            InputEvent::key("t"),
            InputEvent::key("space"),
        ];
        let (mut trial, sink) = controller(TrialBuilder::new(config(cfg)), events);
        let path = trial.run().await.unwrap();

        assert!(path.is_empty());
        assert_eq!(trial.score(), 3.0);
        assert_eq!(trial.current_state(), Some(1));
        assert_eq!(trial.phase(), Phase::Terminated);
        assert_eq!(sink.count("graph.imagination.start"), 0);
        assert_eq!(sink.count("graph.done"), 0);
        assert_eq!(sink.count("graph.highlight"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn forced_hovers_wait_for_the_cued_state() {
        let cfg = config(json!({
            "graph": [[1, 2], [3], [], []],
            "start": 0,
            "revealed": true,
            "fast": true,
            "n_steps": 1,
            "forced_hovers": true,
            "expansions": [[0, 1], [1, 3]]
        }));
        let events = vec![
            InputEvent::hover(3),
            InputEvent::hover(1),
            InputEvent::hover(3),
            InputEvent::click(1),
        ];
        let (mut trial, sink) = controller(TrialBuilder::new(cfg), events);
        let path = trial.run().await.unwrap();

        assert_eq!(path, vec![1]);
        assert_eq!(trial.steps_left(), Some(0));
        assert_eq!(sink.count("graph.forced.start"), 1);
        assert_eq!(sink.count("graph.forced.hover"), 2);
        assert_eq!(sink.count("graph.forced.end"), 1);
        assert_eq!(sink.count("graph.highlight"), 2);
        assert_eq!(sink.count("graph.unhighlight"), 2);
    }

    #[test]
    fn build_rejects_bad_inputs() {
        let (_tx, rx) = unbounded_channel();
        let err = TrialBuilder::new(config(fork()))
            .renderer(RecordingRenderer::with_roots(2))
            .build(rx)
            .err()
            .unwrap();
        assert!(matches!(err, TrialError::MalformedRenderFragment(RenderError::MalformedFragment(2))));

        let mut cfg = fork();
        cfg["rewards"] = json!([1.0]);
        let (_tx, rx) = unbounded_channel();
        let err = TrialBuilder::new(config(cfg)).build(rx).err().unwrap();
        assert!(matches!(err, TrialError::InvalidConfig(ConfigError::RewardCount { expected: 3, found: 1 })));

        let mut cfg = fork();
        cfg["graph"] = json!([[5], [], []]);
        let (_tx, rx) = unbounded_channel();
        let err = TrialBuilder::new(config(cfg)).build(rx).err().unwrap();
        assert!(matches!(err, TrialError::InvalidGraph(_)));

        let mut cfg = fork();
        cfg["layout"] = json!({"strategy": {"kind": "fixed", "xy": [[0.0, 0.0]]}});
        let (_tx, rx) = unbounded_channel();
        let err = TrialBuilder::new(config(cfg)).build(rx).err().unwrap();
        assert!(matches!(err, TrialError::InvalidLayout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn hooks_see_every_visit() {
        let visits = Rc::new(RefCell::new(Vec::new()));
        let snapshots = Rc::new(RefCell::new(Vec::new()));
        let v = visits.clone();
        let s = snapshots.clone();
        let builder = TrialBuilder::new(config(fork()))
            .on_state_visit(move |state| v.borrow_mut().push(state))
            .debug_hook(move |snap: &TrialSnapshot| s.borrow_mut().push(snap.clone()));
        let (mut trial, _) = controller(builder, vec![InputEvent::click(2)]);
        trial.run().await.unwrap();

        assert_eq!(*visits.borrow(), vec![0, 2]);
        let snaps = snapshots.borrow();
        let last = snaps.last().unwrap();
        assert_eq!(last.phase, Phase::Terminated);
        assert_eq!(last.score, -3.0);
        assert!(snaps.iter().any(|s| s.current_state == Some(2) && s.phase == Phase::Navigating));
    }

    #[test]
    fn load_trial_replaces_rewards_and_start() {
        let (_tx, rx) = unbounded_channel();
        let mut trial = TrialBuilder::new(config(fork())).build(rx).unwrap();
        trial
            .load_trial(TrialUpdate {
                start: Some(1),
                rewards: Some(vec![1.0, 2.0, 3.0]),
                n_steps: Some(0),
            })
            .unwrap();
        assert_eq!(trial.current_state(), Some(1));
        assert_eq!(trial.rewards(), &[1.0, 0.0, 3.0]);

        let err = trial
            .load_trial(TrialUpdate {
                start: Some(9),
                ..TrialUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, TrialError::InvalidConfig(ConfigError::UnknownState { state: 9, .. })));
        assert!(trial.set_rewards(&[1.0]).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn edge_highlight_and_removal() {
        let renderer = RecordingRenderer::new();
        let (_tx, rx) = unbounded_channel();
        let mut trial = TrialBuilder::new(config(fork()))
            .renderer(renderer.clone())
            .build(rx)
            .unwrap();

        trial.highlight_edge(0, 1);
        trial.highlight_edge(0, 2);
        assert_eq!(trial.views().edges_with(EdgeView::Highlighted), vec![(0, 2)]);

        trial.remove_graph().await;
        let calls = renderer.calls();
        assert!(calls.contains(&RenderCall::FadeOut(None, REMOVE_DELAY)));
        assert_eq!(calls.last(), Some(&RenderCall::GraphVisible(false)));
    }

    #[tokio::test(start_paused = true)]
    async fn pair_encoded_trial_with_goal_and_one_step() {
        let cfg = config(json!({
            "graph": [[0, [1, 2]], [1, []], [2, []]],
            "start": 0,
            "goal": 2,
            "rewards": [0.0, 5.0, -3.0],
            "consume": true,
            "n_steps": 1,
            "revealed": true,
            "fast": true
        }));
        let (mut trial, sink) = controller(TrialBuilder::new(cfg), vec![InputEvent::click(1)]);
        let path = trial.run().await.unwrap();

        assert_eq!(path, vec![1]);
        assert_eq!(trial.score(), 5.0);
        assert_eq!(trial.rewards()[1], 0.0);
        assert_eq!(trial.steps_left(), Some(0));
        assert_eq!(sink.count("graph.done"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn non_successor_click_is_logged_and_ignored() {
        let cfg = config(json!({
            "graph": [[1], [2], []],
            "start": 0,
            "revealed": true,
            "fast": true
        }));
        let events = vec![InputEvent::click(2), InputEvent::click(1), InputEvent::click(2)];
        let (mut trial, sink) = controller(TrialBuilder::new(cfg), events);
        let path = trial.run().await.unwrap();

        assert_eq!(path, vec![1, 2]);
        let invalid: Vec<TrialEvent> = sink
            .events()
            .into_iter()
            .filter(|e| e.event == "graph.invalid_transition")
            .collect();
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].info["from"], json!(0));
        assert_eq!(invalid[0].info["to"], json!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn visits_show_a_colored_reward_marker() {
        let renderer = RecordingRenderer::new();
        let builder = TrialBuilder::new(config(fork())).renderer(renderer.clone());
        let (mut trial, _) = controller(builder, vec![InputEvent::click(1)]);
        trial.run().await.unwrap();

        let markers: Vec<RenderCall> = renderer
            .calls()
            .into_iter()
            .filter(|c| matches!(c, RenderCall::RewardMarker { .. }))
            .collect();
        assert_eq!(
            markers,
            vec![
                RenderCall::RewardMarker {
                    state: 0,
                    label: String::new(),
                    color: None,
                },
                RenderCall::RewardMarker {
                    state: 1,
                    label: "+5".into(),
                    color: reward_color(5.0, REWARD_COLOR_MIN, REWARD_COLOR_MAX),
                },
            ]
        );
    }

    #[test]
    fn edge_show_only_limits_current_edges() {
        let mut cfg = fork();
        cfg["revealed"] = json!(false);
        cfg["hover_edges"] = json!(true);
        let renderer = RecordingRenderer::new();
        let (_tx, rx) = unbounded_channel();
        let mut trial = TrialBuilder::new(config(cfg))
            .renderer(renderer.clone())
            .edge_show(|_, to| to != 1)
            .build(rx)
            .unwrap();

        assert_eq!(renderer.calls()[0], RenderCall::Mount { states: 3, edges: 2 });
        trial.set_current_state(0);
        assert_eq!(trial.views().edges_with(EdgeView::Current), vec![(0, 2)]);
        assert_eq!(trial.views().edges_with(EdgeView::Visible), vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn only_current_edges_stay_visible() {
        let cfg = config(json!({
            "graph": [[1, 2], [2], []],
            "start": 0,
            "revealed": true,
            "fast": true,
            "only_show_current_edges": true
        }));
        let (_tx, rx) = unbounded_channel();
        let mut trial = TrialBuilder::new(cfg).build(rx).unwrap();
        assert!(trial.views().edges_with(EdgeView::Visible).is_empty());

        trial.set_current_state(0);
        assert_eq!(trial.views().edges_with(EdgeView::Visible), vec![(0, 1), (0, 2)]);
        trial.set_current_state(1);
        assert_eq!(trial.views().edges_with(EdgeView::Visible), vec![(1, 2)]);

        trial.hover(0);
        trial.show_outgoing_edges(0);
        assert_eq!(trial.views().edges_with(EdgeView::Visible), vec![(1, 2)]);
    }

    #[test]
    fn hover_is_sticky_unless_disabled() {
        let mut cfg = fork();
        cfg["revealed"] = json!(false);
        cfg["hover_edges"] = json!(true);

        let (_tx, rx) = unbounded_channel();
        let mut trial = TrialBuilder::new(config(cfg.clone())).build(rx).unwrap();
        assert!(trial.views().edge(0, 1).contains(EdgeView::Hidden));
        trial.hover(0);
        trial.hover(1);
        assert_eq!(trial.views().states_with(StateView::Hovered), vec![1]);
        assert!(trial.views().edge(0, 1).contains(EdgeView::Hidden));
        trial.unhover(1);
        assert_eq!(trial.views().states_with(StateView::Hovered), vec![1]);

        cfg["keep_hover"] = json!(false);
        let (_tx, rx) = unbounded_channel();
        let mut trial = TrialBuilder::new(config(cfg)).build(rx).unwrap();
        trial.hover(0);
        assert!(trial.views().edge(0, 2).contains(EdgeView::Visible));
        trial.unhover(0);
        assert!(trial.views().edge(0, 2).contains(EdgeView::Hidden));
        assert!(trial.views().states_with(StateView::Hovered).is_empty());
    }
}
