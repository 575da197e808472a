//! The bat and its laser bolts

use serde::{Deserialize, Serialize};

use super::anim::{AnimId, AnimationCatalog, AnimationState};
use super::geometry::Rect;
use super::level::hit_block;
use super::render::{EntityId, EntityKind, RenderEvent};
use super::state::GameSession;
use crate::consts::*;
use crate::settings::ControlMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BatMode {
    #[default]
    Default,
    Wide,
    Laser,
}

/// A laser bolt fired from the bat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Laser {
    pub id: EntityId,
    pub rect: Rect,
    pub anim: AnimationState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bat {
    pub id: EntityId,
    pub rect: Rect,
    pub anim: AnimationState,
    pub width: i32,
    pub mode: BatMode,
    /// Bolts in flight
    pub lasers: Vec<Laser>,
    /// How many bolts may be in flight at once
    pub lasers_allowed: usize,
}

impl Bat {
    /// A default bat centred at the bottom of the field
    pub fn new(id: EntityId, catalog: &AnimationCatalog) -> Self {
        let y2 = GAME_HEIGHT - BLOCK_WALL_PADDING;
        let x1 = GAME_WIDTH / 2 - BAT_WIDTH / 2;
        Self {
            id,
            rect: Rect::new(x1, y2 - BAT_HEIGHT, x1 + BAT_WIDTH, y2),
            anim: catalog.static_animation(AnimId::BatDefault),
            width: BAT_WIDTH,
            mode: BatMode::Default,
            lasers: Vec::new(),
            lasers_allowed: 0,
        }
    }

    pub fn lasers_in_flight(&self) -> usize {
        self.lasers.len()
    }

    /// Keyboard step, stopping flush against either wall
    fn step(&mut self, delta: i32) {
        if self.rect.x1 + delta > 0 && self.rect.x2 + delta < GAME_WIDTH {
            self.rect.translate(delta, 0);
        } else if self.rect.x2 + delta >= GAME_WIDTH {
            self.rect.x1 = GAME_WIDTH - self.width;
            self.rect.x2 = GAME_WIDTH;
        } else {
            self.rect.x1 = 0;
            self.rect.x2 = self.width;
        }
    }

    /// Centre on `x`, clamped so the bat stays inside the field
    fn center_on(&mut self, x: i32) {
        self.rect.x1 = (x - self.width / 2).clamp(0, GAME_WIDTH - self.width);
        self.rect.x2 = self.rect.x1 + self.width;
    }
}

/// Move the bat, fly its lasers and fire a new one if asked to
pub fn update_bat(session: &mut GameSession) {
    let before = session.bat.rect;
    match session.settings.control {
        ControlMode::Keyboard => session.bat.step(session.input.keyboard_move),
        ControlMode::Mouse => session.bat.center_on(session.input.pointer_x),
    }
    if session.bat.rect != before {
        session.emit(RenderEvent::Reposition {
            id: session.bat.id,
            rect: session.bat.rect,
        });
    }

    if session.bat.anim.advance() {
        session.emit(RenderEvent::UpdateFrame {
            id: session.bat.id,
            anim: session.bat.anim,
        });
    }

    match session.bat.mode {
        BatMode::Default | BatMode::Wide => {}
        BatMode::Laser => update_lasers(session),
    }
}

fn update_lasers(session: &mut GameSession) {
    let mut lasers = std::mem::take(&mut session.bat.lasers);
    lasers.retain_mut(|laser| {
        laser.rect.translate(0, -LASER_SPEED);

        let struck = if laser.rect.y1 < 0 {
            None
        } else {
            session.level.find_block_at(&laser.rect)
        };
        if laser.rect.y1 < 0 || struck.is_some() {
            if let Some(index) = struck {
                hit_block(session, index);
            }
            session.emit(RenderEvent::Remove { id: laser.id });
            return false;
        }

        session.emit(RenderEvent::Reposition {
            id: laser.id,
            rect: laser.rect,
        });
        if laser.anim.advance() {
            session.emit(RenderEvent::UpdateFrame {
                id: laser.id,
                anim: laser.anim,
            });
        }
        true
    });
    session.bat.lasers = lasers;

    if session.input.fire1 && session.bat.lasers_in_flight() < session.bat.lasers_allowed {
        let x1 = session.bat.rect.center_x() - LASER_WIDTH / 2;
        let y2 = session.bat.rect.y1;
        let laser = Laser {
            id: session.ids.alloc(),
            rect: Rect::new(x1, y2 - LASER_HEIGHT, x1 + LASER_WIDTH, y2),
            anim: session.catalog.animation(AnimId::Laser),
        };
        session.emit(RenderEvent::Add {
            id: laser.id,
            kind: EntityKind::Laser,
            rect: laser.rect,
            anim: laser.anim,
        });
        session.bat.lasers.push(laser);
    }
}

/// Switch the bat into Wide or Laser mode. Use [`reset_bat_mode`] to go back
/// to Default.
pub fn change_bat_mode(session: &mut GameSession, mode: BatMode) {
    if session.bat.mode == BatMode::Laser && mode == BatMode::Laser {
        session.bat.lasers_allowed += 1;
        log::debug!("Laser bat now fires {} bolts", session.bat.lasers_allowed);
        return;
    }

    if session.bat.mode != BatMode::Default {
        reset_bat_mode(session);
    }

    let bat = &mut session.bat;
    match mode {
        BatMode::Default => {
            log::warn!("change_bat_mode(Default) requested, resetting instead");
            return;
        }
        BatMode::Wide => {
            bat.width = BAT_WIDE_WIDTH;
            bat.rect.x1 = (bat.rect.x1 - (BAT_WIDE_WIDTH - BAT_WIDTH) / 2).max(0);
            bat.rect.x2 = bat.rect.x1 + bat.width;
            if bat.rect.x2 > GAME_WIDTH {
                bat.rect.x2 = GAME_WIDTH;
                bat.rect.x1 = GAME_WIDTH - bat.width;
            }
            bat.anim = session.catalog.animation(AnimId::BatWide);
        }
        BatMode::Laser => {
            bat.lasers.clear();
            bat.lasers_allowed = 1;
            bat.anim = session.catalog.animation(AnimId::BatLaser);
        }
    }
    bat.mode = mode;

    let (id, rect, anim) = (bat.id, bat.rect, bat.anim);
    session.emit(RenderEvent::Reposition { id, rect });
    session.emit(RenderEvent::UpdateFrame { id, anim });
}

/// Put the bat back into Default mode, removing any lasers in flight
pub fn reset_bat_mode(session: &mut GameSession) {
    match session.bat.mode {
        BatMode::Default => return,
        BatMode::Laser => {
            for laser in std::mem::take(&mut session.bat.lasers) {
                session.emit(RenderEvent::Remove { id: laser.id });
            }
            session.bat.lasers_allowed = 0;
        }
        BatMode::Wide => {
            let bat = &mut session.bat;
            bat.width = BAT_WIDTH;
            bat.rect.x1 += (BAT_WIDE_WIDTH - BAT_WIDTH) / 2;
            bat.rect.x2 = bat.rect.x1 + bat.width;
        }
    }

    let bat = &mut session.bat;
    bat.mode = BatMode::Default;
    bat.anim = session.catalog.animation(AnimId::BatDefault);
    let (id, rect, anim) = (bat.id, bat.rect, bat.anim);
    session.emit(RenderEvent::Reposition { id, rect });
    session.emit(RenderEvent::UpdateFrame { id, anim });
}
