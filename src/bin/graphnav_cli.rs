//! Command-line trial runner.
//!
//! Examples:
//!   graphnav-cli run trial.json < input.jsonl
//!   graphnav-cli layout trial.json
//!
//! `run` reads participant input as JSON lines on stdin
//! (`{"type": "click", "state": 3}`) and writes every logged trial event as a
//! JSON line on stdout, followed by a summary line. Diagnostics go to
//! stderr; set `RUST_LOG=graphnav=debug` to see view changes.

use std::io::{BufRead, Write};
use std::process;
use std::thread;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use graphnav::graph::StateId;
use graphnav::scene::{RenderFragment, RenderHandle, Scene};
use graphnav::trial::{EdgeViews, InputEvent, Renderer, StateViews, TrialBuilder, TrialConfig, TrialEvent};

/// Reports every view change through `tracing` instead of drawing.
struct TraceRenderer;

impl Renderer for TraceRenderer {
    fn mount(&mut self, scene: &Scene) -> RenderFragment {
        info!(states = scene.states.len(), edges = scene.edges.len(), "mounted scene");
        RenderFragment::single(RenderHandle(1))
    }

    fn set_state_view(&mut self, state: StateId, views: StateViews) {
        debug!(state, ?views, "state view");
    }

    fn set_edge_view(&mut self, from: StateId, to: StateId, views: EdgeViews) {
        debug!(from, to, ?views, "edge view");
    }

    fn set_reward(&mut self, state: StateId, reward: f64) {
        debug!(state, reward, "reward");
    }

    fn collect_reward(&mut self, state: StateId) {
        debug!(state, "collect reward");
    }

    fn set_score(&mut self, score: f64) {
        debug!(score, "score");
    }

    fn set_steps(&mut self, steps: Option<u32>) {
        debug!(?steps, "steps");
    }

    fn set_graph_visible(&mut self, visible: bool) {
        debug!(visible, "graph visible");
    }

    fn fade_out(&mut self, state: Option<StateId>, duration: Duration) {
        debug!(?state, ?duration, "fade out");
    }

    fn show_message(&mut self, message: Option<&str>) {
        if let Some(message) = message {
            info!("{message}");
        }
    }
}

fn usage() -> ! {
    eprintln!("Usage: graphnav-cli <command> <trial.json>\n");
    eprintln!("Commands:");
    eprintln!("  run <trial.json>      Run a trial; input events on stdin, log events on stdout");
    eprintln!("  layout <trial.json>   Print the laid-out scene as JSON");
    process::exit(1);
}

fn print_event(event: &TrialEvent) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, event).is_ok() {
        let _ = writeln!(out);
    }
}

async fn load_config(path: &str) -> Result<TrialConfig, Box<dyn std::error::Error>> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(TrialConfig::from_json(&text)?)
}

fn layout(config: TrialConfig) -> Result<(), Box<dyn std::error::Error>> {
    let graph = config.build_graph()?;
    config.validate(&graph)?;
    let layout = config.layout.compute(&graph, config.start)?;
    let rewards = config.initial_rewards(&graph);
    let scene = Scene::build(&graph, &layout, config.goal, &rewards, config.layout.scale);
    println!("{}", serde_json::to_string_pretty(&scene)?);
    Ok(())
}

/// `None` for blank lines.
fn parse_input_line(line: &str) -> Option<Result<InputEvent, serde_json::Error>> {
    let line = line.trim();
    (!line.is_empty()).then(|| serde_json::from_str(line))
}

/// Blocking stdin reads stay off the runtime so shutdown never waits on them.
fn read_stdin(tx: UnboundedSender<InputEvent>) {
    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("stdin closed: {e}");
                break;
            }
        };
        match parse_input_line(&line) {
            Some(Ok(event)) => {
                if tx.send(event).is_err() {
                    break;
                }
            }
            Some(Err(e)) => warn!("skipping input line: {e}"),
            None => {}
        }
    }
}

async fn run(config: TrialConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, rx) = unbounded_channel();
    thread::spawn(move || read_stdin(tx));

    let mut trial = TrialBuilder::new(config)
        .renderer(TraceRenderer)
        .sink(print_event)
        .build(rx)?;
    let path = trial.run().await?;
    let result = json!({
        "trial_id": trial.trial_id(),
        "path": path,
        "score": trial.score(),
    });
    println!("{result}");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("graphnav=info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        usage();
    }
    let config = match load_config(&args[1]).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load {}: {e}", args[1]);
            process::exit(1);
        }
    };

    let outcome = match args[0].as_str() {
        "run" => run(config).await,
        "layout" => layout(config),
        _ => usage(),
    };
    if let Err(e) = outcome {
        eprintln!("error: {e}");
        process::exit(1);
    }
    // The stdin thread may still be blocked on a read.
    process::exit(0);
}
