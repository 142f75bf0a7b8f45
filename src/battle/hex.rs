//! Hex coordinate system for battle maps (offset coordinates)
//!
//! `y` is the row, `x` the column. Odd rows sit half a cell to the right of
//! even rows, so the neighbor offsets depend on row parity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Neighbor offsets for cells on even rows
pub const EVEN_ROW_DIRECTIONS: [(i32, i32); 6] = [
    (1, 0),   // right
    (0, -1),  // upper right
    (-1, -1), // upper left
    (-1, 0),  // left
    (-1, 1),  // lower left
    (0, 1),   // lower right
];

/// Neighbor offsets for cells on odd rows
pub const ODD_ROW_DIRECTIONS: [(i32, i32); 6] = [
    (1, 0),  // right
    (1, -1), // upper right
    (0, -1), // upper left
    (-1, 0), // left
    (0, 1),  // lower left
    (1, 1),  // lower right
];

/// Offset hex coordinate for battle map
///
/// Ordering is lexicographic on `(x, y)` and serves as the deterministic
/// tie-break wherever two cells compare equal otherwise.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct HexCoord {
    pub x: i32,
    pub y: i32,
}

impl HexCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Direction set for this cell's row
    pub fn directions(&self) -> &'static [(i32, i32); 6] {
        if self.y.rem_euclid(2) == 0 {
            &EVEN_ROW_DIRECTIONS
        } else {
            &ODD_ROW_DIRECTIONS
        }
    }

    /// All 6 neighboring coordinates, unbounded
    pub fn neighbors(&self) -> [HexCoord; 6] {
        let dirs = self.directions();
        let mut out = [*self; 6];
        for (slot, (dx, dy)) in out.iter_mut().zip(dirs.iter()) {
            *slot = HexCoord::new(self.x + dx, self.y + dy);
        }
        out
    }

    /// Cube coordinates (q, r, s) for this offset cell
    pub fn to_cube(&self) -> (i32, i32, i32) {
        let q = self.x - self.y.div_euclid(2);
        let r = self.y;
        (q, r, -q - r)
    }

    /// Exact step distance between two cells on an unobstructed grid
    pub fn distance(&self, other: &Self) -> u32 {
        let (q1, r1, s1) = self.to_cube();
        let (q2, r2, s2) = other.to_cube();
        let dq = (q1 - q2).abs();
        let dr = (r1 - r2).abs();
        let ds = (s1 - s2).abs();
        dq.max(dr).max(ds) as u32
    }

    /// `max(dx, dy) + floor(min(dx, dy) / 2)` over raw offset deltas
    ///
    /// Cheap to compute, but overshoots the true distance on some long
    /// diagonals, e.g. (0,0) -> (2,4) estimates 5 for a 4-step path.
    pub fn offset_estimate(&self, other: &Self) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy) + dx.min(dy) / 2
    }

    /// Straight chebyshev distance on raw offsets
    pub fn chebyshev(&self, other: &Self) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    /// Is `other` one step away?
    pub fn is_adjacent(&self, other: &Self) -> bool {
        self.neighbors().contains(other)
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_coord_creation() {
        let coord = HexCoord::new(5, 10);
        assert_eq!(coord.x, 5);
        assert_eq!(coord.y, 10);
    }

    #[test]
    fn test_even_row_neighbors() {
        let n = HexCoord::new(2, 2).neighbors();
        assert!(n.contains(&HexCoord::new(1, 1)));
        assert!(n.contains(&HexCoord::new(2, 1)));
        assert!(n.contains(&HexCoord::new(1, 3)));
        assert!(!n.contains(&HexCoord::new(3, 1)));
    }

    #[test]
    fn test_odd_row_neighbors() {
        let n = HexCoord::new(2, 1).neighbors();
        assert!(n.contains(&HexCoord::new(3, 0)));
        assert!(n.contains(&HexCoord::new(2, 0)));
        assert!(n.contains(&HexCoord::new(3, 2)));
        assert!(!n.contains(&HexCoord::new(1, 0)));
    }

    #[test]
    fn test_neighbors_are_mutual() {
        for y in -3..4 {
            for x in -3..4 {
                let c = HexCoord::new(x, y);
                for n in c.neighbors() {
                    assert!(n.neighbors().contains(&c), "{} <-> {}", c, n);
                }
            }
        }
    }

    #[test]
    fn test_hex_distance_same() {
        let a = HexCoord::new(3, 3);
        assert_eq!(a.distance(&a), 0);
    }

    #[test]
    fn test_hex_distance_neighbors() {
        let a = HexCoord::new(4, 3);
        for n in a.neighbors() {
            assert_eq!(a.distance(&n), 1);
        }
    }

    #[test]
    fn test_hex_distance_diagonal() {
        assert_eq!(HexCoord::new(0, 0).distance(&HexCoord::new(2, 4)), 4);
        assert_eq!(HexCoord::new(1, 1).distance(&HexCoord::new(0, 0)), 2);
    }

    #[test]
    fn test_offset_estimate_overshoots_diagonal() {
        let a = HexCoord::new(0, 0);
        let b = HexCoord::new(2, 4);
        assert_eq!(a.offset_estimate(&b), 5);
        assert!(a.offset_estimate(&b) > a.distance(&b));
    }

    #[test]
    fn test_chebyshev() {
        assert_eq!(HexCoord::new(0, 0).chebyshev(&HexCoord::new(3, -5)), 5);
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        assert!(HexCoord::new(0, 9) < HexCoord::new(1, 0));
        assert!(HexCoord::new(1, 0) < HexCoord::new(1, 1));
    }
}
