//! Brickfall - simulation core of a grid-based Breakout game
//!
//! Core modules:
//! - `sim`: Frame-stepped simulation (blocks, bat, balls, powerups, collisions)
//! - `levels`: Level repository the simulation pulls raw block grids from
//! - `settings`: Player preferences and difficulty tunables
//! - `highscores`: Score table fed at the end of every game
//! - `platform`: Fixed frame-rate loop and host abstraction

pub mod highscores;
pub mod levels;
pub mod platform;
pub mod settings;
pub mod sim;

pub use highscores::{HighScores, ScoreSink};
pub use levels::{LevelData, LevelError, LevelSet, LevelSource};
pub use settings::{ControlMode, Difficulty, Settings, Tunables};

/// Game configuration constants
pub mod consts {
    /// Target frame rate of the simulation loop
    pub const FRAMES_PER_SECOND: u32 = 50;

    /// Block grid dimensions
    pub const BLOCKS_X: usize = 10;
    pub const BLOCKS_Y: usize = 15;
    pub const BLOCKS_TOTAL: usize = BLOCKS_X * BLOCKS_Y;

    /// Block size and the gap between the walls and the grid
    pub const BLOCK_WIDTH: i32 = 40;
    pub const BLOCK_HEIGHT: i32 = 20;
    pub const BLOCK_WALL_PADDING: i32 = 20;
    /// Space between the lowest block row and the bottom wall
    pub const BAT_SPACE: i32 = 100;

    /// Playing field dimensions
    pub const GAME_WIDTH: i32 = BLOCKS_X as i32 * BLOCK_WIDTH + BLOCK_WALL_PADDING * 2;
    pub const GAME_HEIGHT: i32 =
        BLOCKS_Y as i32 * BLOCK_HEIGHT + BLOCK_WALL_PADDING * 2 + BAT_SPACE;

    /// Bat defaults
    pub const BAT_WIDTH: i32 = 75;
    pub const BAT_WIDE_WIDTH: i32 = 100;
    pub const BAT_HEIGHT: i32 = 10;

    /// Ball defaults
    pub const BALL_WIDTH: i32 = 10;
    pub const BALL_HEIGHT: i32 = 10;
    /// Frames a ball may fly without touching the bat before its direction is randomised
    pub const MAX_AIRTIME: u32 = 1000;

    /// Powerups fall this many pixels per frame
    pub const POWERUP_WIDTH: i32 = 20;
    pub const POWERUP_HEIGHT: i32 = 20;
    pub const POWERUP_SPEED: i32 = 2;

    /// Laser bolts rise this many pixels per frame
    pub const LASER_WIDTH: i32 = 15;
    pub const LASER_HEIGHT: i32 = 15;
    pub const LASER_SPEED: i32 = 19;

    /// Lives at the start of a game
    pub const NUM_LIVES: i32 = 5;
    /// Score needed (before the difficulty modifier) for a bonus life
    pub const NEW_LIFE_SCORE: u32 = 20_000;
    /// Bonus for clearing a level
    pub const NEXT_LEVEL_SCORE: u32 = 5_000;
}

/// Normalize a direction to [0, 2π)
#[inline]
pub fn normalize_direction(angle: f64) -> f64 {
    use std::f64::consts::TAU;
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped + 0.0 }
}
