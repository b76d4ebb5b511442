//! Board geometry.
//!
//! Positions are integer cells on a rectangular board. Distances use the
//! Chebyshev metric (king moves), which is what movement, engagement and
//! objective ranges are measured in.

use serde::{Deserialize, Serialize};

/// A board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub const fn new(x: u16, y: u16) -> Self {
        Position { x, y }
    }

    /// Chebyshev distance in cells.
    #[inline]
    pub fn distance(self, other: Position) -> u16 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx.max(dy)
    }
}

/// Board dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardSize {
    pub width: u16,
    pub height: u16,
}

impl BoardSize {
    pub const fn new(width: u16, height: u16) -> Self {
        BoardSize { width, height }
    }

    /// Returns true if the position lies on the board.
    #[inline]
    pub fn contains(self, p: Position) -> bool {
        p.x < self.width && p.y < self.height
    }

    /// Iterates every on-board cell within `range` of `center`, row-major
    /// (ascending y, then ascending x). The center itself is included.
    pub fn cells_within(self, center: Position, range: u16) -> impl Iterator<Item = Position> {
        let x0 = center.x.saturating_sub(range);
        let y0 = center.y.saturating_sub(range);
        let x1 = center.x.saturating_add(range).min(self.width.saturating_sub(1));
        let y1 = center.y.saturating_add(range).min(self.height.saturating_sub(1));
        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| Position::new(x, y)))
    }
}
