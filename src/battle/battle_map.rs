//! Battle map: static hex grid cells and the map model it is built from
//!
//! Cells are stored row-major and never change shape during a match.
//! Unit occupancy is not part of the grid; range queries layer it on top.

use serde::{Deserialize, Serialize};

use crate::battle::hex::HexCoord;
use crate::core::error::NotFoundError;

/// Static terrain class of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    #[default]
    Field,
    Obstacle,
    Unavailable,
}

impl CellType {
    pub fn is_walkable(&self) -> bool {
        matches!(self, CellType::Field)
    }
}

/// A single cell on the battle map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    pub coord: HexCoord,
    pub walkable: bool,
    pub cell_type: CellType,
}

impl GridCell {
    pub fn new(coord: HexCoord, cell_type: CellType) -> Self {
        Self {
            coord,
            walkable: cell_type.is_walkable(),
            cell_type,
        }
    }
}

/// Column addressing used by the rendering side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum MapDirection {
    #[default]
    Normal,
    Mirrored,
}

impl From<u8> for MapDirection {
    fn from(value: u8) -> Self {
        if value == 1 {
            MapDirection::Mirrored
        } else {
            MapDirection::Normal
        }
    }
}

impl From<MapDirection> for u8 {
    fn from(value: MapDirection) -> Self {
        match value {
            MapDirection::Normal => 0,
            MapDirection::Mirrored => 1,
        }
    }
}

/// Map description handed over by the match-setup collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapModel {
    pub rows: u32,
    pub cols: u32,
    #[serde(default)]
    pub direction: MapDirection,
    #[serde(default)]
    pub obstacles: Vec<HexCoord>,
    #[serde(default)]
    pub disables: Vec<HexCoord>,
}

impl MapModel {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            ..Self::default()
        }
    }
}

/// The static hex grid of one match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexGrid {
    rows: u32,
    cols: u32,
    direction: MapDirection,
    cells: Vec<GridCell>,
}

impl HexGrid {
    /// Create an obstacle-free grid
    pub fn new(rows: u32, cols: u32) -> Self {
        let mut cells = Vec::with_capacity((rows * cols) as usize);
        for y in 0..rows as i32 {
            for x in 0..cols as i32 {
                cells.push(GridCell::new(HexCoord::new(x, y), CellType::Field));
            }
        }

        Self {
            rows,
            cols,
            direction: MapDirection::Normal,
            cells,
        }
    }

    /// Build the grid from a map model, marking obstacles and disabled cells
    pub fn from_model(model: &MapModel) -> Result<Self, NotFoundError> {
        let mut grid = Self::new(model.rows, model.cols);
        grid.direction = model.direction;

        for coord in &model.obstacles {
            grid.set_cell_type(*coord, CellType::Obstacle)?;
        }
        // Disabled wins over obstacle when both list the same cell
        for coord in &model.disables {
            grid.set_cell_type(*coord, CellType::Unavailable)?;
        }

        Ok(grid)
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn direction(&self) -> MapDirection {
        self.direction
    }

    /// Check if coordinate is within map bounds
    pub fn in_bounds(&self, coord: HexCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && coord.x < self.cols as i32 && coord.y < self.rows as i32
    }

    fn index(&self, coord: HexCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            Some(coord.y as usize * self.cols as usize + coord.x as usize)
        } else {
            None
        }
    }

    /// Get the cell at the given coordinate
    pub fn cell(&self, coord: HexCoord) -> Option<&GridCell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    /// Static walkability; occupancy is not considered
    pub fn is_walkable(&self, coord: HexCoord) -> bool {
        self.cell(coord).map(|c| c.walkable).unwrap_or(false)
    }

    /// Set terrain class at a coordinate (map setup only)
    pub fn set_cell_type(
        &mut self,
        coord: HexCoord,
        cell_type: CellType,
    ) -> Result<(), NotFoundError> {
        let index = self.index(coord).ok_or(NotFoundError::Coordinate(coord))?;
        self.cells[index] = GridCell::new(coord, cell_type);
        Ok(())
    }

    /// In-bounds neighbors, in direction-set order
    pub fn neighbors(&self, coord: HexCoord) -> impl Iterator<Item = HexCoord> + '_ {
        coord
            .neighbors()
            .into_iter()
            .filter(move |n| self.in_bounds(*n))
    }

    /// All cells, row-major
    pub fn cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter()
    }

    /// Convert a logical coordinate to the renderer's column addressing
    pub fn to_mirrored(&self, coord: HexCoord) -> HexCoord {
        match self.direction {
            MapDirection::Normal => coord,
            MapDirection::Mirrored => HexCoord::new(self.cols as i32 - coord.x - 1, coord.y),
        }
    }

    /// Convert a renderer coordinate back to logical addressing
    pub fn from_mirrored(&self, coord: HexCoord) -> HexCoord {
        // Mirroring is its own inverse
        self.to_mirrored(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_creation() {
        let grid = HexGrid::new(7, 8);
        assert_eq!(grid.rows(), 7);
        assert_eq!(grid.cols(), 8);
        assert_eq!(grid.cells().count(), 56);
    }

    #[test]
    fn test_out_of_bounds() {
        let grid = HexGrid::new(7, 8);
        assert!(grid.cell(HexCoord::new(8, 0)).is_none());
        assert!(grid.cell(HexCoord::new(0, -1)).is_none());
        assert!(!grid.is_walkable(HexCoord::new(100, 100)));
    }

    #[test]
    fn test_corner_neighbors_filtered() {
        let grid = HexGrid::new(7, 8);
        let n: Vec<_> = grid.neighbors(HexCoord::new(0, 0)).collect();
        assert_eq!(n, vec![HexCoord::new(1, 0), HexCoord::new(0, 1)]);
    }

    #[test]
    fn test_from_model_marks_cells() {
        let mut model = MapModel::new(5, 5);
        model.obstacles.push(HexCoord::new(2, 2));
        model.disables.push(HexCoord::new(4, 4));
        let grid = HexGrid::from_model(&model).unwrap();

        assert_eq!(
            grid.cell(HexCoord::new(2, 2)).unwrap().cell_type,
            CellType::Obstacle
        );
        assert!(!grid.is_walkable(HexCoord::new(2, 2)));
        assert_eq!(
            grid.cell(HexCoord::new(4, 4)).unwrap().cell_type,
            CellType::Unavailable
        );
        assert!(grid.is_walkable(HexCoord::new(1, 1)));
    }

    #[test]
    fn test_from_model_rejects_out_of_bounds_obstacle() {
        let mut model = MapModel::new(3, 3);
        model.obstacles.push(HexCoord::new(3, 0));
        let result = HexGrid::from_model(&model);
        assert_eq!(
            result.unwrap_err(),
            NotFoundError::Coordinate(HexCoord::new(3, 0))
        );
    }

    #[test]
    fn test_mirroring_round_trip() {
        let mut model = MapModel::new(7, 8);
        model.direction = MapDirection::Mirrored;
        let grid = HexGrid::from_model(&model).unwrap();

        let logical = HexCoord::new(1, 3);
        let mirrored = grid.to_mirrored(logical);
        assert_eq!(mirrored, HexCoord::new(6, 3));
        assert_eq!(grid.from_mirrored(mirrored), logical);
    }

    #[test]
    fn test_map_model_from_json() {
        let json = r#"{"rows": 7, "cols": 8, "direction": 1, "obstacles": [{"x": 3, "y": 3}]}"#;
        let model: MapModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.direction, MapDirection::Mirrored);
        assert_eq!(model.obstacles, vec![HexCoord::new(3, 3)]);
        assert!(model.disables.is_empty());
    }
}
