//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed frame step only (one call to [`tick`] per frame)
//! - Seeded RNG only
//! - Stable iteration order (grid order for blocks, spawn order otherwise)
//! - No drawing or platform dependencies; visual changes leave as [`RenderEvent`]s

pub mod anim;
pub mod ball;
pub mod bat;
pub mod collision;
pub mod geometry;
pub mod level;
pub mod powerup;
pub mod render;
pub mod state;
pub mod tick;

pub use anim::{AnimId, AnimKind, AnimationCatalog, AnimationState};
pub use ball::{Ball, BallState, spawn_stuck_ball, update_balls};
pub use bat::{Bat, BatMode, Laser, change_bat_mode, reset_bat_mode, update_bat};
pub use geometry::{Rect, Side};
pub use level::{Block, BlockKind, Level, destroy_block, hit_block, update_blocks};
pub use powerup::{Powerup, PowerupKind, activate_powerup, spawn_powerup, update_powerups};
pub use render::{EntityId, EntityKind, NullPresenter, Presenter, RenderEvent};
pub use state::{
    EndGameStatus, GameOutcome, GameSession, InputState, PauseReason, RunState,
};
pub use tick::{TickInput, process_events, tick};
