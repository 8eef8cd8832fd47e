#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Balloon Analogue Risk Task session.
//!
//! Settings the experimenter does not pass as flags are asked for on the
//! console before the window opens. The session then runs inside the
//! macroquad backend until the participant finishes, declines or closes the
//! window.

mod prompt;
mod provider;
mod settings;
mod trial_log;
mod trigger;

use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use bart_core::{ParticipantId, RngSource, RoundCount, SessionConfig, TaskEvent};
use bart_rendering::{Color, Presentation, RenderingBackend, Scene, Viewport};
use bart_rendering_macroquad::MacroquadBackend;
use bart_task::{apply, query, tick, TaskController};
use clap::Parser;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use self::{
    prompt::{PresetSession, SessionPrompt},
    provider::FileResourceProvider,
    settings::{Settings, SettingsLayer},
};

const WINDOW_TITLE: &str = "Balloon Analogue Risk Task (multi-risk)";

#[derive(Debug, Parser)]
#[command(name = "bart")]
#[command(version)]
#[command(about = "Balloon Analogue Risk Task with per-round risk tiers")]
struct Cli {
    /// Participant identifier (4 digits)
    #[arg(long, value_parser = ParticipantId::parse)]
    participant: Option<ParticipantId>,

    /// Number of rounds to play (1 to 240)
    #[arg(long, value_parser = parse_rounds)]
    rounds: Option<RoundCount>,

    /// Background image: police, trees, gambling or none
    #[arg(long)]
    background: Option<String>,

    /// Show win/loss feedback at the end of each round
    #[arg(long, value_name = "BOOL")]
    active_responses: Option<bool>,

    /// Probability file with one line per risk tier (high, medium, low)
    #[arg(long)]
    probabilities: Option<PathBuf>,

    /// Directory receiving the trial log
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Address of the trigger receiver
    #[arg(long)]
    trigger_addr: Option<String>,

    /// Discard trigger markers instead of connecting to the receiver
    #[arg(long)]
    no_trigger: bool,

    /// Directory holding balloon, burst and background images
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Random seed; a fresh one is drawn and logged when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// TOML file providing defaults for the non-participant settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Synchronise presentation with the display refresh rate
    #[arg(long, value_name = "BOOL")]
    vsync: Option<bool>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn settings_layer(&self) -> SettingsLayer {
        SettingsLayer {
            probabilities: self.probabilities.clone(),
            output_dir: self.output_dir.clone(),
            images_dir: self.images_dir.clone(),
            trigger_addr: self.trigger_addr.clone(),
            trigger_enabled: self.no_trigger.then_some(false),
            window_width: None,
            window_height: None,
            vsync: self.vsync,
        }
    }

    fn preset(&self) -> Result<PresetSession> {
        let background = self
            .background
            .as_deref()
            .map(bart_core::Background::parse_selection)
            .transpose()
            .context("invalid --background")?;

        Ok(PresetSession {
            participant: self.participant.clone(),
            rounds: self.rounds,
            background,
            active_response: self.active_responses,
        })
    }
}

fn parse_rounds(value: &str) -> Result<RoundCount> {
    let rounds = value
        .trim()
        .parse::<u32>()
        .with_context(|| format!("{value:?} is not a whole number"))?;
    Ok(RoundCount::new(rounds)?)
}

/// Entry point for the Balloon Analogue Risk Task command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let file_layer = match &cli.config {
        Some(path) => SettingsLayer::load(path)?,
        None => SettingsLayer::default(),
    };
    let settings = Settings::from(file_layer.overlay(cli.settings_layer()));

    let config = {
        let stdin = io::stdin();
        let mut prompt = SessionPrompt::new(stdin.lock(), io::stdout());
        prompt.complete(cli.preset()?)?
    };

    run_session(config, settings, cli.seed)
}

fn run_session(config: SessionConfig, settings: Settings, seed: Option<u64>) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    info!(
        seed,
        participant = %config.participant,
        rounds = config.rounds.get(),
        "starting session"
    );

    let Settings {
        probabilities,
        output_dir,
        images_dir,
        trigger,
        window,
        vsync,
    } = settings;

    let background = config.background;
    let provider = FileResourceProvider::new(probabilities, output_dir, trigger);
    let rng = RngSource::new(ChaCha8Rng::seed_from_u64(seed));
    let mut events = Vec::new();
    let mut controller = TaskController::new(config, provider, rng, &mut events)
        .context("failed to start task controller")?;
    drain_events(&mut events);

    let viewport = Viewport::new(window.0, window.1).context("invalid window size")?;
    let presentation = Presentation::new(WINDOW_TITLE, Color::WHITE, viewport, images_dir);

    MacroquadBackend::new()
        .with_vsync(vsync)
        .run(presentation, move |frame| {
            for input in frame.inputs {
                apply(&mut controller, input, &mut events)?;
            }
            tick(&mut controller, &mut events)?;
            drain_events(&mut events);

            if let Some(reason) = query::termination(&controller) {
                info!(?reason, "closing window");
                return Ok(None);
            }
            Ok(query::view(&controller)
                .map(|view| Scene::compose(&view, frame.viewport, background)))
        })
}

fn drain_events(events: &mut Vec<TaskEvent>) {
    for event in events.drain(..) {
        debug!(?event, "task event");
    }
}
