//! Brickfall headless runner
//!
//! Loads a level set, lets the autopilot play one game at the fixed frame
//! rate and logs what a presentation layer would have been told.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use brickfall::platform::{FramePacer, Host, RunOptions, run, stop};
use brickfall::sim::{AnimationState, EntityId, EntityKind, GameSession, Presenter, Rect};
use brickfall::{ControlMode, Difficulty, HighScores, LevelSet, LevelSource, Settings};

#[derive(Parser)]
#[command(name = "brickfall")]
#[command(about = "Run a headless Brickfall game under autopilot control")]
struct Args {
    /// RNG seed (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Settings JSON file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Level files to play (JSON); adds to the ones named in the settings
    #[arg(long = "levels")]
    level_files: Vec<PathBuf>,

    /// Difficulty: easy, medium or hard
    #[arg(long)]
    difficulty: Option<String>,

    /// Steer with the keyboard step instead of the pointer
    #[arg(long)]
    keyboard: bool,

    /// Give up after this many frames
    #[arg(long, default_value_t = 50 * 60 * 10)]
    max_frames: u64,

    /// Run as fast as possible instead of at 50 frames per second
    #[arg(long)]
    no_sleep: bool,

    /// High score table (JSON), read before the game and written after it
    #[arg(long)]
    scores: Option<PathBuf>,
}

/// Logs every render event instead of drawing it
#[derive(Default)]
struct LogPresenter {
    shown: usize,
}

impl Presenter for LogPresenter {
    fn render_add(&mut self, id: EntityId, kind: EntityKind, rect: &Rect, anim: &AnimationState) {
        self.shown += 1;
        log::trace!(
            "add {} {:?} at ({}, {}) using {}",
            id,
            kind,
            rect.x1,
            rect.y1,
            anim.id.asset_name()
        );
    }

    fn render_remove(&mut self, id: EntityId) {
        self.shown = self.shown.saturating_sub(1);
        log::trace!("remove {}", id);
    }

    fn render_reposition(&mut self, id: EntityId, rect: &Rect) {
        log::trace!("move {} to ({}, {})", id, rect.x1, rect.y1);
    }

    fn render_update_frame(&mut self, id: EntityId, anim: &AnimationState) {
        log::trace!("frame {} -> {}/{}", id, anim.frame, anim.frame_count);
    }
}

/// No window, no devices: the autopilot does the playing
struct HeadlessHost {
    presenter: LogPresenter,
    frame: u64,
}

impl Host for HeadlessHost {
    fn autopilot(&self) -> bool {
        true
    }

    fn process_events(&mut self, session: &mut GameSession) {
        self.frame += 1;
        if self.frame % (50 * 10) == 0 {
            log::info!(
                "frame {}: score {}, lives {}, level {}, {} blocks left, {} entities shown",
                self.frame,
                session.score,
                session.lives,
                session.level_index + 1,
                session.level.blocks_left,
                self.presenter.shown
            );
        }
    }

    fn presenter(&mut self) -> &mut dyn Presenter {
        &mut self.presenter
    }
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.settings {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            Settings::from_json(&json)
                .with_context(|| format!("Invalid settings in {}", path.display()))?
        }
        None => Settings::default(),
    };

    if let Some(name) = &args.difficulty {
        let difficulty =
            Difficulty::from_str(name).ok_or_else(|| anyhow!("unknown difficulty '{name}'"))?;
        settings.next_game_difficulty = difficulty;
    }
    if args.keyboard {
        settings.control = ControlMode::Keyboard;
    }
    settings.level_files.extend(args.level_files.iter().cloned());
    Ok(settings)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    log::info!("Brickfall (headless) starting...");

    let settings = load_settings(&args)?;

    let mut levels = LevelSet::load_files(settings.level_files.as_slice());
    if levels.level_count() == 0 {
        if !settings.level_files.is_empty() {
            log::warn!("None of the configured level files loaded, using the built-in levels");
        }
        levels = LevelSet::builtin();
    }
    log::info!("{} levels from {}", levels.level_count(), levels.titles().join(", "));

    let seed = args.seed.unwrap_or_else(rand::random);
    log::info!("Game initialized with seed: {}", seed);

    let table = match &args.scores {
        Some(path) if path.exists() => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read scores from {}", path.display()))?;
            HighScores::from_json(&json)
                .with_context(|| format!("Invalid score table in {}", path.display()))?
        }
        _ => HighScores::new(),
    };
    let scores = Rc::new(RefCell::new(table));
    let mut session = GameSession::new(settings, Box::new(levels), Box::new(scores.clone()), seed);
    session.start_game().context("Failed to start a game")?;

    let mut host = HeadlessHost {
        presenter: LogPresenter::default(),
        frame: 0,
    };
    let mut pacer = if args.no_sleep {
        FramePacer::unthrottled()
    } else {
        FramePacer::new()
    };
    let frames = run(
        &mut session,
        &mut host,
        &mut pacer,
        RunOptions {
            max_frames: Some(args.max_frames),
        },
    );

    stop(&mut session, &mut host);
    match session.last_outcome {
        Some(outcome) => log::info!(
            "{:?} after {} frames: score {} on level {} ({})",
            outcome.status,
            frames,
            outcome.score,
            outcome.level + 1,
            outcome.difficulty.as_str()
        ),
        None => log::warn!("Game ended without an outcome"),
    }

    for (rank, entry) in scores.borrow().entries.iter().enumerate() {
        log::info!(
            "#{} {} (level {}, {})",
            rank + 1,
            entry.score,
            entry.level + 1,
            entry.difficulty.as_str()
        );
    }
    if let Some(path) = &args.scores {
        let json = scores.borrow().to_json().context("Failed to serialize scores")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write scores to {}", path.display()))?;
        log::info!("Scores saved to {}", path.display());
    }
    Ok(())
}
