//! Game settings and preferences
//!
//! Persisted by the host as JSON; the core only reads them when a game starts.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Allowed bat speed range (pixels per frame under keyboard control)
pub const MIN_BAT_SPEED: i32 = 5;
pub const MAX_BAT_SPEED: i32 = 25;

/// Allowed bounce entropy range (percent of a half turn)
pub const MIN_BOUNCE_ENTROPY: u32 = 0;
pub const MAX_BOUNCE_ENTROPY: u32 = 40;

/// Difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Ball and score tunables for this difficulty
    pub fn tunables(&self) -> Tunables {
        match self {
            Difficulty::Easy => Tunables {
                score_modifier: 0.5,
                ball_initial_speed: 4.0,
                ball_speed_increment: 0.10,
                ball_max_speed: 8.0,
            },
            Difficulty::Medium => Tunables {
                score_modifier: 1.0,
                ball_initial_speed: 7.0,
                ball_speed_increment: 0.25,
                ball_max_speed: 12.0,
            },
            Difficulty::Hard => Tunables {
                score_modifier: 1.5,
                ball_initial_speed: 9.0,
                ball_speed_increment: 0.25,
                ball_max_speed: 17.0,
            },
        }
    }
}

/// Values derived from the difficulty, fixed for the duration of a game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tunables {
    /// Multiplier applied to every score award
    pub score_modifier: f64,
    /// Speed a ball is launched at (pixels per frame)
    pub ball_initial_speed: f64,
    /// Speed added on every block hit
    pub ball_speed_increment: f64,
    /// Speed increments stop once a ball reaches this
    pub ball_max_speed: f64,
}

impl Default for Tunables {
    fn default() -> Self {
        Difficulty::default().tunables()
    }
}

/// How the bat is steered. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ControlMode {
    #[default]
    Mouse,
    Keyboard,
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Difficulty of the game in progress
    pub difficulty: Difficulty,
    /// Difficulty the next game will start with
    pub next_game_difficulty: Difficulty,

    // === Control ===
    pub control: ControlMode,
    /// Keyboard bat step per frame
    pub bat_speed: i32,

    // === Gameplay ===
    /// Random jitter added to every non-bat bounce, in percent of a half turn
    pub bounce_entropy: u32,

    // === Pausing ===
    /// Pause when the window loses focus
    pub pause_on_focus: bool,
    /// Pause when the pointer leaves the playing field
    pub pause_on_pointer: bool,
    /// Pause while the preferences are open
    pub pause_on_pref: bool,

    /// Level files the host loads into the level repository
    pub level_files: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            next_game_difficulty: Difficulty::Medium,

            control: ControlMode::Mouse,
            bat_speed: 15,

            bounce_entropy: 0,

            pause_on_focus: false,
            pause_on_pointer: true,
            pause_on_pref: true,

            level_files: Vec::new(),
        }
    }
}

impl Settings {
    /// Clamp out-of-range values back into their allowed ranges
    pub fn sanitize(&mut self) {
        if self.bat_speed < MIN_BAT_SPEED {
            log::warn!(
                "Bat speed {} is below the allowed range, using {}",
                self.bat_speed,
                MIN_BAT_SPEED
            );
            self.bat_speed = MIN_BAT_SPEED;
        } else if self.bat_speed > MAX_BAT_SPEED {
            log::warn!(
                "Bat speed {} is above the allowed range, using {}",
                self.bat_speed,
                MAX_BAT_SPEED
            );
            self.bat_speed = MAX_BAT_SPEED;
        }

        if self.bounce_entropy > MAX_BOUNCE_ENTROPY {
            log::warn!(
                "Bounce entropy {} is above the allowed range, using {}",
                self.bounce_entropy,
                MAX_BOUNCE_ENTROPY
            );
            self.bounce_entropy = MAX_BOUNCE_ENTROPY;
        }
    }

    /// Copy the pending difficulty into the active one (called when a game starts)
    pub fn apply_next_game_difficulty(&mut self) -> Tunables {
        self.difficulty = self.next_game_difficulty;
        self.difficulty.tunables()
    }

    /// Bounce entropy as a fraction (0.0 - 0.4)
    pub fn entropy_fraction(&self) -> f64 {
        self.bounce_entropy as f64 / 100.0
    }

    /// Parse settings from JSON, clamping anything out of range
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Settings = serde_json::from_str(json)?;
        settings.sanitize();
        log::info!(
            "Loaded settings (difficulty {}, {:?} control)",
            settings.next_game_difficulty.as_str(),
            settings.control
        );
        Ok(settings)
    }

    /// Serialize settings to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
