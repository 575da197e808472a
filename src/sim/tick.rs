//! One simulation frame
//!
//! Advances a running session by a single fixed step and then settles the
//! end-of-frame conditions (level clear, bonus life, lost ball).

use super::ball::update_balls;
use super::bat::{BatMode, update_bat};
use super::level::update_blocks;
use super::powerup::update_powerups;
use super::state::{EndGameStatus, GameSession, RunState};
use crate::consts::*;
use crate::settings::ControlMode;

/// Strike this far off the bat centre so the autopilot doesn't send the ball
/// straight up the same column forever
const AUTOPILOT_STRIKE_OFFSET: i32 = 15;

/// Per-frame input from the host
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Pointer x in field coordinates, when the host has one
    pub pointer_x: Option<i32>,
    /// Let the computer steer the bat and fire
    pub autopilot: bool,
}

/// Advance the session by one frame. Does nothing unless the game is running.
pub fn tick(session: &mut GameSession, input: &TickInput) {
    if session.state != RunState::Running {
        return;
    }

    if let Some(x) = input.pointer_x {
        session.input.pointer_x = x;
    }
    if input.autopilot {
        autopilot(session);
    }

    update_bat(session);
    update_balls(session);
    update_powerups(session);
    update_blocks(session);

    if process_events(session) {
        return;
    }

    session.input.fire1 = false;
    session.input.fire2 = false;
}

/// Settle the end-of-frame conditions, in order. Returns true if the game
/// ended.
pub fn process_events(session: &mut GameSession) -> bool {
    // Level cleared or skipped
    if session.level.is_cleared() || session.next_level_requested {
        session.next_level_requested = false;
        let has_next = session.level_index + 1 < session.level_count();
        if !has_next || !session.next_level() {
            session.end_game(EndGameStatus::Win);
            return true;
        }
    }

    // Bonus life
    let threshold = NEW_LIFE_SCORE as f64 * session.tunables.score_modifier;
    if session.score as f64 > session.last_new_life_score as f64 + threshold {
        session.new_life();
        session.last_new_life_score = session.score;
        log::info!("Bonus life at {} points ({} lives)", session.score, session.lives);
    }

    // Out of balls
    if session.balls.is_empty() {
        session.lose_life();
        if session.lives < 0 {
            session.end_game(EndGameStatus::Lose);
            return true;
        }
        super::ball::spawn_stuck_ball(session);
    }

    false
}

/// Steer towards the most urgent falling ball (or a powerup when no ball is
/// coming down) and fire whenever there's something to fire.
fn autopilot(session: &mut GameSession) {
    let bat_y = session.bat.rect.y1;
    let target = session
        .balls
        .iter()
        .filter(|b| !b.is_stuck() && b.velocity().y > 0.0 && b.rect.y2 <= bat_y + BAT_HEIGHT)
        .max_by_key(|b| b.rect.y2)
        .map(|b| {
            let x = b.rect.center_x();
            let offset = if x < GAME_WIDTH / 2 {
                AUTOPILOT_STRIKE_OFFSET
            } else {
                -AUTOPILOT_STRIKE_OFFSET
            };
            x - offset
        })
        .or_else(|| {
            session
                .powerups
                .iter()
                .max_by_key(|p| p.rect.y2)
                .map(|p| p.rect.center_x())
        });

    if let Some(x) = target {
        match session.settings.control {
            ControlMode::Mouse => session.input.pointer_x = x,
            ControlMode::Keyboard => {
                let speed = session.settings.bat_speed;
                session.input.keyboard_move =
                    (x - session.bat.rect.center_x()).clamp(-speed, speed);
            }
        }
    }

    if session.balls.iter().any(|b| b.is_stuck()) || session.bat.mode == BatMode::Laser {
        session.input.fire1 = true;
    }
}
