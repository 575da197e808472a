//! Powerups: dropped by hit blocks, caught by the bat

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use super::anim::{AnimId, AnimationState};
use super::ball::{slow_balls, spawn_stuck_ball};
use super::bat::{BatMode, change_bat_mode};
use super::collision::bat_powerup_collision;
use super::geometry::Rect;
use super::render::{EntityId, EntityKind, RenderEvent};
use super::state::GameSession;
use crate::consts::*;

/// One in this many block hits drops a powerup
const POWERUP_CHANCE: f64 = 20.0;
/// Sides of the d20 rolled to pick a tier
const TIER_DIE: f64 = 20.0;
/// Rolls at or above these pick the rarer tiers
const LOW_PROBABILITY_ROLL: u32 = 16;
const MEDIUM_PROBABILITY_ROLL: u32 = 9;

const SCORE_POWERUP_POINTS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerupKind {
    Score500,
    Laser,
    NewLife,
    NewBall,
    NextLevel,
    Slow,
    WideBat,
}

/// Rarest tier
const LOW_PROBABILITY: [PowerupKind; 2] = [PowerupKind::NextLevel, PowerupKind::NewLife];
const MEDIUM_PROBABILITY: [PowerupKind; 3] =
    [PowerupKind::Slow, PowerupKind::WideBat, PowerupKind::NewBall];
/// Most common tier
const HIGH_PROBABILITY: [PowerupKind; 2] = [PowerupKind::Score500, PowerupKind::Laser];

impl PowerupKind {
    pub const ALL: [PowerupKind; 7] = [
        PowerupKind::Score500,
        PowerupKind::Laser,
        PowerupKind::NewLife,
        PowerupKind::NewBall,
        PowerupKind::NextLevel,
        PowerupKind::Slow,
        PowerupKind::WideBat,
    ];

    fn anim(&self) -> AnimId {
        match self {
            PowerupKind::Score500 => AnimId::PowerupScore500,
            PowerupKind::Laser => AnimId::PowerupLaser,
            PowerupKind::NewLife => AnimId::PowerupNewLife,
            PowerupKind::NewBall => AnimId::PowerupNewBall,
            PowerupKind::NextLevel => AnimId::PowerupNextLevel,
            PowerupKind::Slow => AnimId::PowerupSlow,
            PowerupKind::WideBat => AnimId::PowerupWideBat,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Powerup {
    pub id: EntityId,
    pub rect: Rect,
    pub anim: AnimationState,
    pub kind: PowerupKind,
}

/// Roll for a drop: the chance gate first, then the tier, then the kind
pub fn roll_powerup<R: Rng>(rng: &mut R) -> Option<PowerupKind> {
    if POWERUP_CHANCE * rng.random::<f64>() > 1.0 {
        return None;
    }

    let roll = (TIER_DIE * rng.random::<f64>()) as u32;
    let tier: &[PowerupKind] = if roll >= LOW_PROBABILITY_ROLL {
        &LOW_PROBABILITY
    } else if roll >= MEDIUM_PROBABILITY_ROLL {
        &MEDIUM_PROBABILITY
    } else {
        &HIGH_PROBABILITY
    };
    tier.choose(rng).copied()
}

/// Maybe drop a powerup with its top-left corner at (x, y)
pub fn maybe_spawn_powerup(session: &mut GameSession, x: i32, y: i32) {
    if let Some(kind) = roll_powerup(&mut session.rng) {
        spawn_powerup(session, kind, x, y);
    }
}

pub fn spawn_powerup(session: &mut GameSession, kind: PowerupKind, x: i32, y: i32) {
    let powerup = Powerup {
        id: session.ids.alloc(),
        rect: Rect::from_size(x, y, POWERUP_WIDTH, POWERUP_HEIGHT),
        anim: session.catalog.static_animation(kind.anim()),
        kind,
    };
    log::debug!("Dropped {:?} powerup at ({}, {})", kind, x, y);
    session.emit(RenderEvent::Add {
        id: powerup.id,
        kind: EntityKind::Powerup,
        rect: powerup.rect,
        anim: powerup.anim,
    });
    session.powerups.push(powerup);
}

/// Apply a caught powerup's effect
pub fn activate_powerup(session: &mut GameSession, kind: PowerupKind) {
    log::debug!("Caught {:?} powerup", kind);
    match kind {
        PowerupKind::Score500 => session.add_score(SCORE_POWERUP_POINTS),
        PowerupKind::Laser => change_bat_mode(session, BatMode::Laser),
        PowerupKind::NewLife => session.new_life(),
        PowerupKind::NewBall => spawn_stuck_ball(session),
        PowerupKind::NextLevel => session.next_level_requested = true,
        PowerupKind::Slow => slow_balls(session),
        PowerupKind::WideBat => change_bat_mode(session, BatMode::Wide),
    }
}

/// Drop every powerup one step; catch or expire them
pub fn update_powerups(session: &mut GameSession) {
    let mut powerups = std::mem::take(&mut session.powerups);
    powerups.retain_mut(|powerup| {
        powerup.rect.translate(0, POWERUP_SPEED);

        if bat_powerup_collision(&session.bat, powerup) {
            activate_powerup(session, powerup.kind);
            session.emit(RenderEvent::Remove { id: powerup.id });
            return false;
        }
        if powerup.rect.y2 > GAME_HEIGHT {
            session.emit(RenderEvent::Remove { id: powerup.id });
            return false;
        }

        session.emit(RenderEvent::Reposition {
            id: powerup.id,
            rect: powerup.rect,
        });
        true
    });
    powerups.append(&mut session.powerups);
    session.powerups = powerups;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::tests::session_with_rows;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::HashMap;

    #[test]
    fn test_roll_distribution() {
        let mut rng = Pcg32::seed_from_u64(42);
        let mut counts: HashMap<PowerupKind, u32> = HashMap::new();
        let rolls = 200_000;
        let mut drops = 0;
        for _ in 0..rolls {
            if let Some(kind) = roll_powerup(&mut rng) {
                drops += 1;
                *counts.entry(kind).or_default() += 1;
            }
        }
        // About one in twenty
        let rate = drops as f64 / rolls as f64;
        assert!((0.04..0.06).contains(&rate), "drop rate {rate}");
        // Every kind shows up, the common tier more than the rare one
        assert_eq!(counts.len(), PowerupKind::ALL.len());
        assert!(counts[&PowerupKind::Score500] > counts[&PowerupKind::NextLevel]);
    }

    #[test]
    fn test_powerup_falls_and_expires() {
        let mut session = session_with_rows(&["1"]);
        spawn_powerup(&mut session, PowerupKind::Score500, 5, GAME_HEIGHT - 22);
        update_powerups(&mut session);
        // Bottom edge resting on the field edge is still in play
        assert_eq!(session.powerups.len(), 1);
        assert_eq!(session.powerups[0].rect.y2, GAME_HEIGHT);
        update_powerups(&mut session);
        assert!(session.powerups.is_empty());
        assert_eq!(session.score, 0);
    }

    #[test]
    fn test_bat_catches_powerup() {
        let mut session = session_with_rows(&["1"]);
        let bat = session.bat.rect;
        spawn_powerup(&mut session, PowerupKind::Score500, bat.x1, bat.y1 - 21);
        update_powerups(&mut session);
        assert!(session.powerups.is_empty());
        assert_eq!(session.score, 500);
    }

    #[test]
    fn test_every_kind_has_an_effect() {
        for kind in PowerupKind::ALL {
            let mut session = session_with_rows(&["1"]);
            session.balls[0].state = crate::sim::ball::BallState::Free;
            session.balls[0].speed = 10.0;
            let bat = session.bat.rect;
            spawn_powerup(&mut session, kind, bat.x1, bat.y1 - 21);
            update_powerups(&mut session);
            assert!(session.powerups.is_empty(), "{kind:?} was not consumed");

            match kind {
                PowerupKind::Score500 => assert_eq!(session.score, 500),
                PowerupKind::Laser => assert_eq!(session.bat.mode, BatMode::Laser),
                PowerupKind::NewLife => assert_eq!(session.lives, NUM_LIVES + 1),
                PowerupKind::NewBall => assert_eq!(session.balls.len(), 2),
                PowerupKind::NextLevel => assert!(session.next_level_requested),
                PowerupKind::Slow => {
                    assert_eq!(session.balls[0].speed, session.tunables.ball_initial_speed / 2.0)
                }
                PowerupKind::WideBat => assert_eq!(session.bat.width, BAT_WIDE_WIDTH),
            }
        }
    }
}
