//! Game session state
//!
//! Everything a running game needs lives in [`GameSession`], which is passed
//! by `&mut` through every simulation step.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::anim::AnimationCatalog;
use super::ball::{Ball, spawn_stuck_ball};
use super::bat::{Bat, reset_bat_mode};
use super::level::{Level, announce_blocks};
use super::powerup::Powerup;
use super::render::{EntityKind, IdAllocator, RenderEvent};
use crate::consts::*;
use crate::highscores::ScoreSink;
use crate::levels::{LevelError, LevelSource};
use crate::settings::{Difficulty, Settings, Tunables};

/// Whether frames are being simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

/// Set of reasons the game is paused. The game only runs with none set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PauseReason(u8);

impl PauseReason {
    pub const NONE: PauseReason = PauseReason(0);
    pub const MENU: PauseReason = PauseReason(0x1);
    pub const FOCUS: PauseReason = PauseReason(0x2);
    pub const POINTER: PauseReason = PauseReason(0x4);
    pub const PREFERENCES: PauseReason = PauseReason(0x8);
    /// Every bit at once
    pub const FORCE: PauseReason = PauseReason(0xff);

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: PauseReason) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: PauseReason) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: PauseReason) {
        self.0 &= !other.0;
    }
}

/// How a game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndGameStatus {
    /// Last level cleared
    Win,
    /// Out of lives
    Lose,
    /// Abandoned from the menu
    Menu,
}

/// Summary of the last finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub status: EndGameStatus,
    pub score: u64,
    /// Level reached (0-based)
    pub level: usize,
    pub difficulty: Difficulty,
}

/// Player input as sampled by the frame loop
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InputState {
    /// Keyboard bat step for this frame
    pub keyboard_move: i32,
    pub left_held: bool,
    pub right_held: bool,
    /// Last known pointer x in field coordinates
    pub pointer_x: i32,
    /// Fire buttons, cleared at the end of every frame
    pub fire1: bool,
    pub fire2: bool,
}

/// A game in progress (or between games)
pub struct GameSession {
    pub state: RunState,
    pub pause_mask: PauseReason,

    pub score: u64,
    /// Score at the time the last bonus life was awarded
    pub last_new_life_score: u64,
    pub lives: i32,
    /// Index of the level in play (0-based)
    pub level_index: usize,

    pub settings: Settings,
    /// Fixed for the whole game
    pub tunables: Tunables,
    pub catalog: AnimationCatalog,

    pub bat: Bat,
    pub balls: Vec<Ball>,
    pub powerups: Vec<Powerup>,
    pub level: Level,

    pub input: InputState,
    /// Set by the next-level powerup, handled at the end of the frame
    pub next_level_requested: bool,

    /// Deterministic RNG
    pub rng: Pcg32,
    pub last_outcome: Option<GameOutcome>,

    pub(crate) ids: IdAllocator,
    pub(crate) render_events: Vec<RenderEvent>,
    levels: Box<dyn LevelSource>,
    scores: Box<dyn ScoreSink>,
}

impl GameSession {
    /// Create a stopped session
    pub fn new(
        settings: Settings,
        levels: Box<dyn LevelSource>,
        scores: Box<dyn ScoreSink>,
        seed: u64,
    ) -> Self {
        Self::with_catalog(settings, levels, scores, AnimationCatalog::default(), seed)
    }

    pub fn with_catalog(
        mut settings: Settings,
        levels: Box<dyn LevelSource>,
        scores: Box<dyn ScoreSink>,
        catalog: AnimationCatalog,
        seed: u64,
    ) -> Self {
        settings.sanitize();
        let mut ids = IdAllocator::default();
        let bat = Bat::new(ids.alloc(), &catalog);
        Self {
            state: RunState::Stopped,
            pause_mask: PauseReason::NONE,
            score: 0,
            last_new_life_score: 0,
            lives: 0,
            level_index: 0,
            tunables: settings.difficulty.tunables(),
            settings,
            catalog,
            bat,
            balls: Vec::new(),
            powerups: Vec::new(),
            level: Level::empty(),
            input: InputState::default(),
            next_level_requested: false,
            rng: Pcg32::seed_from_u64(seed),
            last_outcome: None,
            ids,
            render_events: Vec::new(),
            levels,
            scores,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn level_count(&self) -> usize {
        self.levels.level_count()
    }

    /// Replace the preferences. The difficulty only changes when the next
    /// game starts.
    pub fn update_settings(&mut self, mut settings: Settings) {
        settings.sanitize();
        settings.difficulty = self.settings.difficulty;
        self.settings = settings;
    }

    /// Start a new game on the first level
    pub fn start_game(&mut self) -> Result<(), LevelError> {
        if self.state != RunState::Stopped {
            log::warn!("start_game called while a game is in progress");
            return Ok(());
        }
        if self.levels.level_count() == 0 {
            log::warn!("No levels configured");
            return Err(LevelError::NoLevels);
        }

        let (index, level) = self.load_level_from(0)?;
        self.level = level;
        self.level_index = index;
        announce_blocks(self);

        self.tunables = self.settings.apply_next_game_difficulty();
        self.state = RunState::Running;
        self.pause_mask = PauseReason::NONE;
        self.score = 0;
        self.last_new_life_score = 0;
        self.lives = NUM_LIVES;
        self.next_level_requested = false;
        self.input = InputState::default();
        self.last_outcome = None;

        self.bat = Bat::new(self.ids.alloc(), &self.catalog);
        self.emit(RenderEvent::Add {
            id: self.bat.id,
            kind: EntityKind::Bat,
            rect: self.bat.rect,
            anim: self.bat.anim,
        });
        spawn_stuck_ball(self);

        log::info!(
            "Game started on {} difficulty, level {:?}",
            self.settings.difficulty.as_str(),
            self.level.name
        );
        Ok(())
    }

    /// Add a pause reason. Pausing a stopped game does nothing.
    pub fn pause(&mut self, reason: PauseReason) {
        if self.state == RunState::Stopped {
            return;
        }
        self.pause_mask.insert(reason);
        if self.state == RunState::Running {
            log::debug!("Paused (reasons {:#04x})", self.pause_mask.bits());
            self.state = RunState::Paused;
        }
    }

    /// Clear a pause reason; the game runs again once none are left
    pub fn resume(&mut self, reason: PauseReason) {
        if self.state != RunState::Paused {
            return;
        }
        self.pause_mask.remove(reason);
        if self.pause_mask.is_empty() {
            log::debug!("Resumed");
            self.state = RunState::Running;
        }
    }

    /// Finish the game: submit the score and clear every entity
    pub fn end_game(&mut self, status: EndGameStatus) {
        if self.state == RunState::Stopped {
            log::warn!("end_game({:?}) called with no game in progress", status);
            return;
        }

        let outcome = GameOutcome {
            status,
            score: self.score,
            level: self.level_index,
            difficulty: self.settings.difficulty,
        };
        log::info!(
            "Game over ({:?}): score {} on level {}",
            status,
            outcome.score,
            outcome.level + 1
        );
        self.scores
            .submit(outcome.score, outcome.level, outcome.difficulty);
        self.last_outcome = Some(outcome);

        self.clear_balls();
        self.clear_powerups();
        reset_bat_mode(self);
        self.emit(RenderEvent::Remove { id: self.bat.id });
        self.clear_level();

        self.state = RunState::Stopped;
        self.pause_mask = PauseReason::NONE;
        self.score = 0;
        self.lives = 0;
        self.level_index = 0;
        self.next_level_requested = false;
        self.input = InputState::default();
    }

    /// Move on to the next loadable level. Returns false when none is left.
    pub fn next_level(&mut self) -> bool {
        self.add_score(NEXT_LEVEL_SCORE);
        self.clear_balls();
        self.clear_powerups();
        self.clear_level();

        let loaded = match self.load_level_from(self.level_index + 1) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::warn!("No further level to load: {}", e);
                return false;
            }
        };
        let (index, level) = loaded;
        self.level_index = index;
        self.level = level;
        announce_blocks(self);

        reset_bat_mode(self);
        spawn_stuck_ball(self);
        log::info!("Advanced to level {} ({:?})", index + 1, self.level.name);
        true
    }

    /// Called once no balls are left in play
    pub fn lose_life(&mut self) {
        reset_bat_mode(self);
        self.lives -= 1;
        self.clear_powerups();
        log::debug!("Lost a life, {} left", self.lives);
    }

    pub fn new_life(&mut self) {
        self.lives += 1;
    }

    /// Award `points`, scaled by the difficulty's score modifier
    pub fn add_score(&mut self, points: u32) {
        self.score += (points as f64 * self.tunables.score_modifier) as u64;
    }

    // === Input ===

    pub fn key_left_pressed(&mut self) {
        self.input.keyboard_move = -self.settings.bat_speed;
        self.input.left_held = true;
    }

    pub fn key_left_released(&mut self) {
        if !self.input.right_held {
            self.input.keyboard_move = 0;
        }
        self.input.left_held = false;
    }

    pub fn key_right_pressed(&mut self) {
        self.input.keyboard_move = self.settings.bat_speed;
        self.input.right_held = true;
    }

    pub fn key_right_released(&mut self) {
        if !self.input.left_held {
            self.input.keyboard_move = 0;
        }
        self.input.right_held = false;
    }

    pub fn fire1_pressed(&mut self) {
        if self.is_running() {
            self.input.fire1 = true;
        }
    }

    pub fn fire2_pressed(&mut self) {
        if self.is_running() {
            self.input.fire2 = true;
        }
    }

    pub fn pointer_moved(&mut self, x: i32) {
        self.input.pointer_x = x;
    }

    /// Window focus changes only pause when the player asked for it
    pub fn focus_changed(&mut self, focused: bool) {
        if !self.settings.pause_on_focus {
            return;
        }
        if focused {
            self.resume(PauseReason::FOCUS);
        } else {
            self.pause(PauseReason::FOCUS);
        }
    }

    pub fn pointer_in_field(&mut self, inside: bool) {
        if !self.settings.pause_on_pointer {
            return;
        }
        if inside {
            self.resume(PauseReason::POINTER);
        } else {
            self.pause(PauseReason::POINTER);
        }
    }

    pub fn preferences_open(&mut self, open: bool) {
        if !self.settings.pause_on_pref {
            return;
        }
        if open {
            self.pause(PauseReason::PREFERENCES);
        } else {
            self.resume(PauseReason::PREFERENCES);
        }
    }

    pub fn menu_open(&mut self, open: bool) {
        if open {
            self.pause(PauseReason::MENU);
        } else {
            self.resume(PauseReason::MENU);
        }
    }

    // === Render events ===

    pub fn emit(&mut self, event: RenderEvent) {
        self.render_events.push(event);
    }

    /// Take every render event queued since the last drain
    pub fn drain_render_events(&mut self) -> Vec<RenderEvent> {
        std::mem::take(&mut self.render_events)
    }

    // === Helpers ===

    /// First level at or after `start` that loads and generates cleanly
    fn load_level_from(&mut self, start: usize) -> Result<(usize, Level), LevelError> {
        let count = self.levels.level_count();
        let mut last_error = LevelError::NotFound {
            index: start,
            count,
        };
        for index in start..count {
            let generated = self
                .levels
                .load_level(index)
                .and_then(|data| Level::generate(&data, index, &self.catalog, &mut self.ids));
            match generated {
                Ok(level) => return Ok((index, level)),
                Err(e) => {
                    log::error!("Skipping level {}: {}", index + 1, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    pub(crate) fn clear_balls(&mut self) {
        for ball in std::mem::take(&mut self.balls) {
            self.emit(RenderEvent::Remove { id: ball.id });
        }
    }

    pub(crate) fn clear_powerups(&mut self) {
        for powerup in std::mem::take(&mut self.powerups) {
            self.emit(RenderEvent::Remove { id: powerup.id });
        }
    }

    fn clear_level(&mut self) {
        for block in self.level.take_blocks() {
            self.emit(RenderEvent::Remove { id: block.id });
        }
        self.level = Level::empty();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::highscores::HighScores;
    use crate::levels::{LevelData, LevelFile, LevelSet};
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    /// Running session whose level sequence is built from digit rows
    pub(crate) fn session_with_levels(levels: &[&[&str]]) -> GameSession {
        let mut set = LevelSet::new();
        set.add_level_file(LevelFile {
            title: "Test".to_string(),
            filename: PathBuf::new(),
            levels: levels
                .iter()
                .enumerate()
                // Difficulty keeps the given order after sorting
                .map(|(i, rows)| LevelData::from_rows(&format!("L{i}"), "test", i as u32, rows))
                .collect(),
        })
        .expect("valid test levels");
        let mut session = GameSession::new(
            Settings::default(),
            Box::new(set),
            Box::new(HighScores::new()),
            7,
        );
        session.start_game().expect("game starts");
        session
    }

    pub(crate) fn session_with_rows(rows: &[&str]) -> GameSession {
        session_with_levels(&[rows])
    }

    #[test]
    fn test_start_game_sets_up_entities() {
        let session = session_with_rows(&["111"]);
        assert_eq!(session.state, RunState::Running);
        assert_eq!(session.lives, NUM_LIVES);
        assert_eq!(session.score, 0);
        assert_eq!(session.balls.len(), 1);
        assert_eq!(session.level.blocks_left, 3);
    }

    #[test]
    fn test_start_game_without_levels() {
        let mut session = GameSession::new(
            Settings::default(),
            Box::new(LevelSet::new()),
            Box::new(HighScores::new()),
            1,
        );
        assert_eq!(session.start_game(), Err(LevelError::NoLevels));
        assert_eq!(session.state, RunState::Stopped);
    }

    #[test]
    fn test_pause_mask_semantics() {
        let mut session = session_with_rows(&["1"]);
        session.pause(PauseReason::MENU);
        session.pause(PauseReason::FOCUS);
        assert_eq!(session.state, RunState::Paused);

        session.resume(PauseReason::MENU);
        assert_eq!(session.state, RunState::Paused);
        session.resume(PauseReason::FOCUS);
        assert_eq!(session.state, RunState::Running);

        session.pause(PauseReason::FORCE);
        session.resume(PauseReason::POINTER);
        assert_eq!(session.state, RunState::Paused);
        session.resume(PauseReason::FORCE);
        assert_eq!(session.state, RunState::Running);
    }

    #[test]
    fn test_pause_when_stopped_is_noop() {
        let mut session = session_with_rows(&["1"]);
        session.end_game(EndGameStatus::Menu);
        session.pause(PauseReason::MENU);
        assert_eq!(session.state, RunState::Stopped);
        assert!(session.pause_mask.is_empty());
    }

    #[test]
    fn test_pause_flags_gate_focus_and_pointer() {
        let mut session = session_with_rows(&["1"]);
        // pause_on_focus is off by default
        session.focus_changed(false);
        assert_eq!(session.state, RunState::Running);
        session.pointer_in_field(false);
        assert_eq!(session.state, RunState::Paused);
        session.pointer_in_field(true);
        assert_eq!(session.state, RunState::Running);
    }

    #[test]
    fn test_fire_only_while_running() {
        let mut session = session_with_rows(&["1"]);
        session.pause(PauseReason::MENU);
        session.fire1_pressed();
        assert!(!session.input.fire1);
        session.resume(PauseReason::MENU);
        session.fire2_pressed();
        assert!(session.input.fire2);
    }

    #[test]
    fn test_key_release_keeps_other_direction() {
        let mut session = session_with_rows(&["1"]);
        session.key_left_pressed();
        session.key_right_pressed();
        assert_eq!(session.input.keyboard_move, session.settings.bat_speed);
        session.key_left_released();
        assert_eq!(session.input.keyboard_move, session.settings.bat_speed);
        session.key_right_released();
        assert_eq!(session.input.keyboard_move, 0);
    }

    #[test]
    fn test_score_modifier_applies() {
        let mut session = session_with_rows(&["1"]);
        session.tunables = Difficulty::Hard.tunables();
        session.add_score(50);
        assert_eq!(session.score, 75);
        session.tunables = Difficulty::Easy.tunables();
        session.add_score(20);
        assert_eq!(session.score, 85);
    }

    #[test]
    fn test_end_game_submits_score_for_every_status() {
        for status in [EndGameStatus::Win, EndGameStatus::Lose, EndGameStatus::Menu] {
            let table = Rc::new(RefCell::new(HighScores::new()));
            let mut session = GameSession::new(
                Settings::default(),
                Box::new(LevelSet::builtin()),
                Box::new(table.clone()),
                3,
            );
            session.start_game().expect("builtin levels load");
            session.add_score(1234);
            session.end_game(status);

            assert_eq!(table.borrow().top_score(), Some(1234));
            assert_eq!(session.state, RunState::Stopped);
            assert!(session.balls.is_empty());
            assert_eq!(session.level.blocks().count(), 0);
            assert_eq!(session.last_outcome.map(|o| o.status), Some(status));
        }
    }

    #[test]
    fn test_next_level_clears_and_reloads() {
        let mut session = session_with_levels(&[&["1"], &["11"]]);
        session.add_score(10);
        assert!(session.next_level());
        assert_eq!(session.level_index, 1);
        assert_eq!(session.level.blocks_left, 2);
        assert_eq!(session.score, 10 + NEXT_LEVEL_SCORE as u64);
        assert_eq!(session.balls.len(), 1);
        assert!(!session.next_level());
    }

    #[test]
    fn test_difficulty_only_changes_on_new_game() {
        let mut session = session_with_rows(&["1"]);
        let mut settings = session.settings.clone();
        settings.next_game_difficulty = Difficulty::Hard;
        settings.bat_speed = 20;
        session.update_settings(settings);
        assert_eq!(session.tunables, Difficulty::Medium.tunables());
        assert_eq!(session.settings.bat_speed, 20);

        session.end_game(EndGameStatus::Menu);
        session.start_game().expect("restart");
        assert_eq!(session.tunables, Difficulty::Hard.tunables());
    }
}
