//! Integer bounding boxes and collision sides

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in field pixels. Both edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Rect with its top-left corner at (x, y)
    pub const fn from_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x + width,
            y2: y + height,
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Horizontal centre, rounded towards the left edge
    #[inline]
    pub fn center_x(&self) -> i32 {
        self.x1 + self.width() / 2
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.x1 += dx;
        self.x2 += dx;
        self.y1 += dy;
        self.y2 += dy;
    }

    /// Move so the top-left corner sits at (x, y), keeping the size
    pub fn move_to(&mut self, x: i32, y: i32) {
        let (w, h) = (self.width(), self.height());
        *self = Self::from_size(x, y, w, h);
    }

    /// Overlap test. Touching edges count as overlapping.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x1 <= other.x2 && self.x2 >= other.x1 && self.y1 <= other.y2 && self.y2 >= other.y1
    }
}

/// Which edge of a target a mover struck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    None,
    Top,
    Bottom,
    Left,
    Right,
    /// A corner, or an approach that can't be attributed to one edge
    Diagonal,
}
