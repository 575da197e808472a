//! Block grid and the block state machine

use serde::{Deserialize, Serialize};

use super::anim::{AnimId, AnimationCatalog, AnimationState};
use super::geometry::{Rect, Side};
use super::powerup::maybe_spawn_powerup;
use super::render::{EntityId, EntityKind, IdAllocator, RenderEvent};
use super::state::GameSession;
use crate::consts::*;
use crate::levels::{
    BLOCK_DEFAULT_CODE, BLOCK_EXPLODE_CODE, BLOCK_INVINCIBLE_CODE, BLOCK_NONE_CODE,
    BLOCK_STRONG_1_CODE, BLOCK_STRONG_2_CODE, BLOCK_STRONG_3_CODE, LevelData, LevelError,
};

/// Points for knocking a strong block down a tier
const STRONG_HIT_SCORE: u32 = 20;
/// Points for destroying a default block
const DEFAULT_HIT_SCORE: u32 = 50;
/// Points for setting off an exploding block
const EXPLODE_HIT_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Default,
    Strong1,
    Strong2,
    Strong3,
    /// Fading from Strong1 towards Default
    Strong1Dying,
    /// Fading from Strong2 towards Strong1
    Strong2Dying,
    /// Fading from Strong3 towards Strong2
    Strong3Dying,
    Invincible,
    Exploding,
    /// Playing its death animation; leaves the grid when that finishes
    Dead,
}

impl BlockKind {
    /// Kind for a raw level code. `None` is an empty cell.
    pub fn from_code(code: u8) -> Option<Option<BlockKind>> {
        match code {
            BLOCK_NONE_CODE => Some(None),
            BLOCK_DEFAULT_CODE => Some(Some(BlockKind::Default)),
            BLOCK_INVINCIBLE_CODE => Some(Some(BlockKind::Invincible)),
            BLOCK_STRONG_1_CODE => Some(Some(BlockKind::Strong1)),
            BLOCK_STRONG_2_CODE => Some(Some(BlockKind::Strong2)),
            BLOCK_STRONG_3_CODE => Some(Some(BlockKind::Strong3)),
            BLOCK_EXPLODE_CODE => Some(Some(BlockKind::Exploding)),
            _ => None,
        }
    }

    /// Whether the block still has to be destroyed to clear the level
    pub fn counts_for_clear(&self) -> bool {
        !matches!(self, BlockKind::Dead | BlockKind::Invincible)
    }

    /// Resting animation for a freshly generated block
    fn static_anim(&self) -> AnimId {
        match self {
            BlockKind::Default => AnimId::BlockDefault,
            BlockKind::Strong1 => AnimId::BlockStrong1,
            BlockKind::Strong2 => AnimId::BlockStrong2,
            BlockKind::Strong3 => AnimId::BlockStrong3,
            BlockKind::Invincible => AnimId::BlockInvincible,
            BlockKind::Exploding => AnimId::BlockExplode,
            BlockKind::Strong1Dying => AnimId::BlockStrong1Die,
            BlockKind::Strong2Dying => AnimId::BlockStrong2Die,
            BlockKind::Strong3Dying => AnimId::BlockStrong3Die,
            BlockKind::Dead => AnimId::BlockDefaultDie,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: EntityId,
    /// Row-major grid index
    pub index: usize,
    pub rect: Rect,
    pub anim: AnimationState,
    pub kind: BlockKind,
}

/// A level in play
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Level {
    cells: Vec<Option<Block>>,
    /// Blocks that still have to be destroyed
    pub blocks_left: usize,
    /// Position of the level in the level sequence (0-based)
    pub number: usize,
    pub name: String,
    pub author: String,
    pub levelfile_title: String,
    pub difficulty: u32,
}

impl Level {
    /// Level with no blocks at all (between games)
    pub fn empty() -> Self {
        Self {
            cells: vec![None; BLOCKS_TOTAL],
            ..Default::default()
        }
    }

    /// Build the live grid from raw level data
    pub fn generate(
        data: &LevelData,
        number: usize,
        catalog: &AnimationCatalog,
        ids: &mut IdAllocator,
    ) -> Result<Self, LevelError> {
        data.validate()?;

        let mut level = Self {
            number,
            name: data.name.clone(),
            author: data.author.clone(),
            levelfile_title: data.levelfile_title.clone(),
            difficulty: data.difficulty,
            ..Self::empty()
        };

        for (index, &code) in data.blocks.iter().enumerate() {
            let kind = BlockKind::from_code(code)
                .ok_or(LevelError::InvalidBlockCode { cell: index, code })?;
            let Some(kind) = kind else { continue };
            if kind.counts_for_clear() {
                level.blocks_left += 1;
            }
            level.cells[index] = Some(Block {
                id: ids.alloc(),
                index,
                rect: Self::cell_rect(index),
                anim: catalog.static_animation(kind.static_anim()),
                kind,
            });
        }

        log::debug!(
            "Generated level {} ({:?}) with {} destructible blocks",
            number + 1,
            level.name,
            level.blocks_left
        );
        Ok(level)
    }

    /// Pixel rect of a grid cell
    pub fn cell_rect(index: usize) -> Rect {
        let x = (index % BLOCKS_X) as i32;
        let y = (index / BLOCKS_X) as i32;
        Rect::from_size(
            BLOCK_WALL_PADDING + BLOCK_WIDTH * x,
            BLOCK_WALL_PADDING + BLOCK_HEIGHT * y,
            BLOCK_WIDTH,
            BLOCK_HEIGHT,
        )
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.cells.get(index).and_then(|c| c.as_ref())
    }

    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.cells.get_mut(index).and_then(|c| c.as_mut())
    }

    /// Iterate over the occupied cells
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.cells.iter().flatten()
    }

    /// Empty every cell, returning the blocks that were in the grid
    pub fn take_blocks(&mut self) -> Vec<Block> {
        self.blocks_left = 0;
        self.cells.iter_mut().filter_map(Option::take).collect()
    }

    /// Live blocks that count towards clearing the level
    pub fn live_count(&self) -> usize {
        self.blocks().filter(|b| b.kind.counts_for_clear()).count()
    }

    pub fn is_cleared(&self) -> bool {
        self.blocks_left == 0
    }

    fn is_live(&self, index: usize) -> bool {
        self.block(index).is_some_and(|b| b.kind != BlockKind::Dead)
    }

    /// Grid index of the live block under `rect`, if any.
    ///
    /// The rect must be smaller than a block in both directions. Its four
    /// corners are checked in the order top-left, top-right, bottom-left,
    /// bottom-right.
    pub fn find_block_at(&self, rect: &Rect) -> Option<usize> {
        let block_area_bottom = BLOCK_WALL_PADDING + BLOCKS_Y as i32 * BLOCK_HEIGHT;
        if rect.x2 <= BLOCK_WALL_PADDING
            || rect.x1 >= GAME_WIDTH - BLOCK_WALL_PADDING
            || rect.y2 <= BLOCK_WALL_PADDING
            || rect.y1 >= block_area_bottom
        {
            return None;
        }

        let column = |x: i32| {
            (((x - BLOCK_WALL_PADDING).max(0) / BLOCK_WIDTH) as usize).min(BLOCKS_X - 1)
        };
        let row = |y: i32| {
            (((y - BLOCK_WALL_PADDING).max(0) / BLOCK_HEIGHT) as usize).min(BLOCKS_Y - 1)
        };
        let (x1, x2) = (column(rect.x1), column(rect.x2));
        let (y1, y2) = (row(rect.y1), row(rect.y2));

        [(x1, y1), (x2, y1), (x1, y2), (x2, y2)]
            .into_iter()
            .map(|(x, y)| x + y * BLOCKS_X)
            .find(|&index| self.is_live(index))
    }

    /// Whether the cell next to `index` on `side` holds a live block
    pub fn has_neighbour(&self, index: usize, side: Side) -> bool {
        let column = index % BLOCKS_X;
        let neighbour = match side {
            Side::Top => index.checked_sub(BLOCKS_X),
            Side::Bottom => Some(index + BLOCKS_X).filter(|&i| i < BLOCKS_TOTAL),
            Side::Left => (column != 0).then(|| index - 1),
            Side::Right => (column != BLOCKS_X - 1).then(|| index + 1),
            Side::Diagonal | Side::None => {
                unreachable!("neighbour lookup needs an edge, got {:?}", side)
            }
        };
        neighbour.is_some_and(|i| self.is_live(i))
    }

    /// Indices of the up to eight surrounding cells, clockwise from north
    pub fn neighbours(index: usize) -> [Option<usize>; 8] {
        let column = index % BLOCKS_X;
        let has_north = index >= BLOCKS_X;
        let has_south = index + BLOCKS_X < BLOCKS_TOTAL;
        let has_east = column != BLOCKS_X - 1;
        let has_west = column != 0;

        [
            has_north.then(|| index - BLOCKS_X),
            (has_north && has_east).then(|| index - BLOCKS_X + 1),
            has_east.then(|| index + 1),
            (has_south && has_east).then(|| index + BLOCKS_X + 1),
            has_south.then(|| index + BLOCKS_X),
            (has_south && has_west).then(|| index + BLOCKS_X - 1),
            has_west.then(|| index - 1),
            (has_north && has_west).then(|| index - BLOCKS_X - 1),
        ]
    }
}

/// Apply one hit to the block at `index`. Empty cells, Invincible and Dead
/// blocks are unaffected.
pub fn hit_block(session: &mut GameSession, index: usize) {
    let Some(block) = session.level.block_mut(index) else {
        return;
    };
    let (x, y) = (block.rect.x1, block.rect.y2);
    let kind = block.kind;

    match kind {
        BlockKind::Invincible | BlockKind::Dead => {}
        BlockKind::Strong1
        | BlockKind::Strong2
        | BlockKind::Strong3
        | BlockKind::Strong2Dying
        | BlockKind::Strong3Dying => {
            let (kind, anim) = match kind {
                BlockKind::Strong3 => (BlockKind::Strong3Dying, AnimId::BlockStrong3Die),
                BlockKind::Strong2 | BlockKind::Strong3Dying => {
                    (BlockKind::Strong2Dying, AnimId::BlockStrong2Die)
                }
                _ => (BlockKind::Strong1Dying, AnimId::BlockStrong1Die),
            };
            block.kind = kind;
            block.anim = session.catalog.once_animation(anim);
            session.render_events.push(RenderEvent::UpdateFrame {
                id: block.id,
                anim: block.anim,
            });

            maybe_spawn_powerup(session, x, y);
            session.add_score(STRONG_HIT_SCORE);
        }
        BlockKind::Default | BlockKind::Strong1Dying => {
            block.kind = BlockKind::Dead;
            block.anim = session.catalog.once_animation(AnimId::BlockDefaultDie);
            session.render_events.push(RenderEvent::UpdateFrame {
                id: block.id,
                anim: block.anim,
            });

            maybe_spawn_powerup(session, x, y);
            session.add_score(DEFAULT_HIT_SCORE);
            session.level.blocks_left -= 1;
        }
        BlockKind::Exploding => {
            block.kind = BlockKind::Dead;
            block.anim = session.catalog.once_animation(AnimId::BlockExplodeDie);
            session.render_events.push(RenderEvent::UpdateFrame {
                id: block.id,
                anim: block.anim,
            });

            maybe_spawn_powerup(session, x, y);
            // Chain reaction: every hit consumes a live block, so this ends
            for neighbour in Level::neighbours(index).into_iter().flatten() {
                hit_block(session, neighbour);
            }
            session.add_score(EXPLODE_HIT_SCORE);
            session.level.blocks_left -= 1;
        }
    }
}

/// Remove the block at `index` outright: no score, no powerup
pub fn destroy_block(session: &mut GameSession, index: usize) {
    let Some(block) = session.level.cells.get_mut(index).and_then(Option::take) else {
        return;
    };
    if block.kind.counts_for_clear() {
        session.level.blocks_left -= 1;
    }
    log::debug!("Force-destroyed block {} ({:?})", index, block.kind);
    session.render_events.push(RenderEvent::Remove { id: block.id });
}

/// Advance block animations, settle finished dying blocks and drop dead ones
pub fn update_blocks(session: &mut GameSession) {
    for index in 0..session.level.cells.len() {
        let Some(block) = session.level.cells[index].as_mut() else {
            continue;
        };
        if block.anim.advance() {
            session.render_events.push(RenderEvent::UpdateFrame {
                id: block.id,
                anim: block.anim,
            });
        }
        if !block.anim.is_finished() {
            continue;
        }

        let kind = block.kind;
        let settled = match kind {
            BlockKind::Strong3Dying => Some((BlockKind::Strong2, AnimId::BlockStrong2)),
            BlockKind::Strong2Dying => Some((BlockKind::Strong1, AnimId::BlockStrong1)),
            BlockKind::Strong1Dying => Some((BlockKind::Default, AnimId::BlockDefault)),
            BlockKind::Dead => {
                let id = block.id;
                session.level.cells[index] = None;
                session.render_events.push(RenderEvent::Remove { id });
                None
            }
            _ => None,
        };
        if let Some((kind, anim)) = settled
            && let Some(block) = session.level.cells[index].as_mut()
        {
            block.kind = kind;
            block.anim = session.catalog.static_animation(anim);
            session.render_events.push(RenderEvent::UpdateFrame {
                id: block.id,
                anim: block.anim,
            });
        }
    }
}

/// Queue an Add event for every block in the grid
pub(crate) fn announce_blocks(session: &mut GameSession) {
    let events: Vec<_> = session
        .level
        .blocks()
        .map(|b| RenderEvent::Add {
            id: b.id,
            kind: EntityKind::Block,
            rect: b.rect,
            anim: b.anim,
        })
        .collect();
    session.render_events.extend(events);
}
