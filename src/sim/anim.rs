//! Animation state carried by every visible entity
//!
//! The core never touches frame images. It only needs to know how many
//! frames each animation has so it can step, loop and finish them; the
//! presentation layer maps `(AnimId, frame)` to an image.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Every animation the game uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnimId {
    BlockDefault,
    BlockStrong1,
    BlockStrong1Die,
    BlockStrong2,
    BlockStrong2Die,
    BlockStrong3,
    BlockStrong3Die,
    BlockInvincible,
    BlockDefaultDie,
    BallDefault,
    BatDefault,
    PowerupScore500,
    BatLaser,
    Laser,
    PowerupLaser,
    PowerupNewLife,
    PowerupNewBall,
    PowerupNextLevel,
    PowerupSlow,
    PowerupWideBat,
    BatWide,
    BlockExplode,
    BlockExplodeDie,
}

impl AnimId {
    pub const ALL: [AnimId; 23] = [
        AnimId::BlockDefault,
        AnimId::BlockStrong1,
        AnimId::BlockStrong1Die,
        AnimId::BlockStrong2,
        AnimId::BlockStrong2Die,
        AnimId::BlockStrong3,
        AnimId::BlockStrong3Die,
        AnimId::BlockInvincible,
        AnimId::BlockDefaultDie,
        AnimId::BallDefault,
        AnimId::BatDefault,
        AnimId::PowerupScore500,
        AnimId::BatLaser,
        AnimId::Laser,
        AnimId::PowerupLaser,
        AnimId::PowerupNewLife,
        AnimId::PowerupNewBall,
        AnimId::PowerupNextLevel,
        AnimId::PowerupSlow,
        AnimId::PowerupWideBat,
        AnimId::BatWide,
        AnimId::BlockExplode,
        AnimId::BlockExplodeDie,
    ];

    /// Base name of the frame images (`<name>.<frame>.png`)
    pub fn asset_name(&self) -> &'static str {
        match self {
            AnimId::BlockDefault => "block.default",
            AnimId::BlockStrong1 => "block.strong.1",
            AnimId::BlockStrong1Die => "block.strong.1.die",
            AnimId::BlockStrong2 => "block.strong.2",
            AnimId::BlockStrong2Die => "block.strong.2.die",
            AnimId::BlockStrong3 => "block.strong.3",
            AnimId::BlockStrong3Die => "block.strong.3.die",
            AnimId::BlockInvincible => "block.invincible",
            AnimId::BlockDefaultDie => "block.default.die",
            AnimId::BallDefault => "ball.default",
            AnimId::BatDefault => "bat.default",
            AnimId::PowerupScore500 => "powerup.score500",
            AnimId::BatLaser => "bat.laser",
            AnimId::Laser => "laser",
            AnimId::PowerupLaser => "powerup.laser",
            AnimId::PowerupNewLife => "powerup.newlife",
            AnimId::PowerupNewBall => "powerup.newball",
            AnimId::PowerupNextLevel => "powerup.nextlevel",
            AnimId::PowerupSlow => "powerup.slow",
            AnimId::PowerupWideBat => "powerup.widebat",
            AnimId::BatWide => "bat.wide",
            AnimId::BlockExplode => "block.explode",
            AnimId::BlockExplodeDie => "block.explode.die",
        }
    }

    /// Frame count used when the catalog has no entry
    fn default_frame_count(&self) -> usize {
        match self {
            AnimId::BlockDefaultDie | AnimId::BlockExplodeDie => 6,
            AnimId::BlockStrong1Die | AnimId::BlockStrong2Die | AnimId::BlockStrong3Die => 4,
            AnimId::Laser => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimKind {
    /// Never advances
    Static,
    /// Wraps back to frame 0
    Loop,
    /// Stops on the last frame, then turns Static
    PlayOnce,
}

/// Current frame of one entity's animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationState {
    pub id: AnimId,
    pub frame: usize,
    pub frame_count: usize,
    pub kind: AnimKind,
}

impl AnimationState {
    /// Step one frame. Returns true if the displayed frame changed.
    pub fn advance(&mut self) -> bool {
        let before = self.frame;
        match self.kind {
            AnimKind::Static => return false,
            AnimKind::Loop => {
                self.frame += 1;
                if self.frame >= self.frame_count {
                    self.frame = 0;
                }
            }
            AnimKind::PlayOnce => {
                self.frame += 1;
                if self.frame >= self.frame_count {
                    self.kind = AnimKind::Static;
                    self.frame = self.frame_count - 1;
                }
            }
        }
        self.frame != before
    }

    /// A one-shot animation that has played out
    pub fn is_finished(&self) -> bool {
        self.kind == AnimKind::Static
    }
}

/// Frame counts per animation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimationCatalog {
    frame_counts: BTreeMap<AnimId, usize>,
}

impl Default for AnimationCatalog {
    fn default() -> Self {
        Self {
            frame_counts: AnimId::ALL
                .iter()
                .map(|id| (*id, id.default_frame_count()))
                .collect(),
        }
    }
}

impl AnimationCatalog {
    /// Override the frame count of one animation. Zero is treated as one.
    pub fn set_frame_count(&mut self, id: AnimId, frames: usize) {
        self.frame_counts.insert(id, frames.max(1));
    }

    pub fn frame_count(&self, id: AnimId) -> usize {
        self.frame_counts
            .get(&id)
            .copied()
            .unwrap_or_else(|| id.default_frame_count())
            .max(1)
    }

    /// The animation with its natural kind: looping when it has several frames
    pub fn animation(&self, id: AnimId) -> AnimationState {
        let kind = if self.frame_count(id) == 1 {
            AnimKind::Static
        } else {
            AnimKind::Loop
        };
        self.with_kind(id, kind)
    }

    pub fn static_animation(&self, id: AnimId) -> AnimationState {
        self.with_kind(id, AnimKind::Static)
    }

    pub fn once_animation(&self, id: AnimId) -> AnimationState {
        self.with_kind(id, AnimKind::PlayOnce)
    }

    fn with_kind(&self, id: AnimId, kind: AnimKind) -> AnimationState {
        AnimationState {
            id,
            frame: 0,
            frame_count: self.frame_count(id),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_once_animation_finishes_on_last_frame() {
        let catalog = AnimationCatalog::default();
        let mut anim = catalog.once_animation(AnimId::BlockDefaultDie);
        let frames = anim.frame_count;
        for _ in 0..frames - 1 {
            assert!(anim.advance());
            assert!(!anim.is_finished());
        }
        assert!(!anim.advance());
        assert!(anim.is_finished());
        assert_eq!(anim.frame, frames - 1);
        assert!(!anim.advance());
    }

    #[test]
    fn test_single_frame_once_finishes_after_one_step() {
        let mut catalog = AnimationCatalog::default();
        catalog.set_frame_count(AnimId::BlockDefaultDie, 1);
        let mut anim = catalog.once_animation(AnimId::BlockDefaultDie);
        assert!(!anim.is_finished());
        anim.advance();
        assert!(anim.is_finished());
        assert_eq!(anim.frame, 0);
    }

    #[test]
    fn test_loop_wraps() {
        let catalog = AnimationCatalog::default();
        let mut anim = catalog.animation(AnimId::Laser);
        assert_eq!(anim.kind, AnimKind::Loop);
        anim.advance();
        anim.advance();
        assert_eq!(anim.frame, 0);
        assert!(anim.frame < anim.frame_count);
    }

    #[test]
    fn test_catalog_from_json() {
        let catalog: AnimationCatalog =
            serde_json::from_str(r#"{"BallDefault": 3}"#).expect("valid catalog");
        assert_eq!(catalog.frame_count(AnimId::BallDefault), 3);
        // Missing entries fall back to the built-in counts
        assert_eq!(catalog.frame_count(AnimId::Laser), 2);
        assert_eq!(catalog.animation(AnimId::BatDefault).kind, AnimKind::Static);
    }
}
