//! Render events
//!
//! The simulation never draws. Whenever an entity appears, disappears, moves
//! or changes frame it queues a [`RenderEvent`]; the host drains the queue
//! into a [`Presenter`] once per frame.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::anim::AnimationState;
use super::geometry::Rect;

/// Stable handle for a visible entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out entity ids in increasing order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn alloc(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Block,
    Ball,
    Bat,
    Laser,
    Powerup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderEvent {
    Add {
        id: EntityId,
        kind: EntityKind,
        rect: Rect,
        anim: AnimationState,
    },
    Remove {
        id: EntityId,
    },
    Reposition {
        id: EntityId,
        rect: Rect,
    },
    UpdateFrame {
        id: EntityId,
        anim: AnimationState,
    },
}

impl RenderEvent {
    pub fn id(&self) -> EntityId {
        match self {
            RenderEvent::Add { id, .. }
            | RenderEvent::Remove { id }
            | RenderEvent::Reposition { id, .. }
            | RenderEvent::UpdateFrame { id, .. } => *id,
        }
    }

    /// Forward this event to the matching presenter hook
    pub fn dispatch(&self, presenter: &mut dyn Presenter) {
        match self {
            RenderEvent::Add {
                id,
                kind,
                rect,
                anim,
            } => presenter.render_add(*id, *kind, rect, anim),
            RenderEvent::Remove { id } => presenter.render_remove(*id),
            RenderEvent::Reposition { id, rect } => presenter.render_reposition(*id, rect),
            RenderEvent::UpdateFrame { id, anim } => presenter.render_update_frame(*id, anim),
        }
    }
}

/// Presentation layer hooks
pub trait Presenter {
    fn render_add(&mut self, id: EntityId, kind: EntityKind, rect: &Rect, anim: &AnimationState);
    fn render_remove(&mut self, id: EntityId);
    fn render_reposition(&mut self, id: EntityId, rect: &Rect);
    fn render_update_frame(&mut self, id: EntityId, anim: &AnimationState);
}

/// Presenter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn render_add(&mut self, _: EntityId, _: EntityKind, _: &Rect, _: &AnimationState) {}
    fn render_remove(&mut self, _: EntityId) {}
    fn render_reposition(&mut self, _: EntityId, _: &Rect) {}
    fn render_update_frame(&mut self, _: EntityId, _: &AnimationState) {}
}
