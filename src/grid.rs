//! The versioned spatial line index.
//!
//! Lines register into every 14×14 cell their segment rasterizes into;
//! which cells those are depends on the grid version the track was saved
//! under. Queries walk a 3×3 cell neighborhood and hand back lines in
//! each cell's stored (descending id) order. The physics can observe
//! that order, so it is part of the contract.

pub mod cell;
pub use cell::{Cell, CellPosition};

mod raster;

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::line::{Line, LINE_HITBOX_HEIGHT};
use crate::math::Vec2;

/// Side length of a grid cell in world units.
pub const GRID_CELL_SIZE: f64 = 14.0;

/// Which historical player's rasterization to reproduce.
///
/// 6.7 shares the 6.2 stepping; it differs only in the engine's gravity
/// constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridVersion {
    V60,
    V61,
    V62,
    V67,
}

/// Spatial index mapping cell keys to line buckets.
#[derive(Clone, Debug)]
pub struct Grid {
    version: GridVersion,
    cell_size: f64,
    lines: HashMap<i64, Line>,
    cells: HashMap<i64, Cell>,
}

impl Grid {
    pub fn new(version: GridVersion, cell_size: f64) -> Self {
        Grid {
            version,
            cell_size,
            lines: HashMap::new(),
            cells: HashMap::new(),
        }
    }

    pub fn version(&self) -> GridVersion {
        self.version
    }

    /// Register a line in every cell its segment passes through and take
    /// ownership of it.
    pub fn add_line(&mut self, line: Line) {
        let (p1, p2) = line.endpoints();
        for position in raster::cell_positions_between(self.version, self.cell_size, p1, p2) {
            self.register(line.id, &position);
        }
        self.lines.insert(line.id, line);
    }

    /// Remove a line by id. Unknown ids are a no-op.
    pub fn remove_line(&mut self, id: i64) -> Option<Line> {
        let line = self.lines.remove(&id)?;
        let (p1, p2) = line.endpoints();
        for position in raster::cell_positions_between(self.version, self.cell_size, p1, p2) {
            self.unregister(id, &position);
        }
        Some(line)
    }

    /// Move a line's endpoints, re-registering it under its new cells.
    pub fn move_line(&mut self, id: i64, p1: Vec2, p2: Vec2) {
        let Some(line) = self.lines.get_mut(&id) else {
            return;
        };
        let (old_p1, old_p2) = line.endpoints();
        line.set_endpoints(p1, p2);
        for position in raster::cell_positions_between(self.version, self.cell_size, old_p1, old_p2)
        {
            let key = cell::cell_key(position.cx, position.cy);
            if let Some(cell) = self.cells.get_mut(&key) {
                cell.remove_line(id);
            }
        }
        for position in raster::cell_positions_between(self.version, self.cell_size, p1, p2) {
            self.register(id, &position);
        }
    }

    fn register(&mut self, id: i64, position: &CellPosition) {
        let key = cell::cell_key(position.cx, position.cy);
        self.cells
            .entry(key)
            .or_insert_with(|| Cell::new(position.cx, position.cy))
            .add_line(id);
    }

    fn unregister(&mut self, id: i64, position: &CellPosition) {
        let key = cell::cell_key(position.cx, position.cy);
        if let Some(cell) = self.cells.get_mut(&key) {
            cell.remove_line(id);
        }
    }

    pub fn line(&self, id: i64) -> Option<&Line> {
        self.lines.get(&id)
    }

    pub fn contains_line(&self, id: i64) -> bool {
        self.lines.contains_key(&id)
    }

    pub fn max_line_id(&self) -> Option<i64> {
        self.lines.keys().copied().max()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// All lines, in no particular order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.values()
    }

    /// Every nonempty cell, in no particular order. Each item is the cell
    /// coordinates and the bucket's id list (descending).
    pub fn occupied_cells(&self) -> impl Iterator<Item = ((i64, i64), &[i64])> {
        self.cells
            .values()
            .filter(|cell| !cell.is_empty())
            .map(|cell| ((cell.cx, cell.cy), cell.line_ids()))
    }

    /// The cell containing a world position, if it has ever been populated.
    pub fn cell_at(&self, position: Vec2) -> Option<&Cell> {
        let cell_position = CellPosition::containing(position, self.cell_size);
        self.cells
            .get(&cell::cell_key(cell_position.cx, cell_position.cy))
    }

    /// Lines near a point, in the order collisions must apply them:
    /// the 3×3 cell block around the point in row-major offset order,
    /// descending line id inside each cell. A line registered in several
    /// of those cells appears once per cell; the duplicates are part of
    /// the reproducible behavior.
    pub fn lines_near(&self, position: Vec2) -> SmallVec<[&Line; 16]> {
        let mut found = SmallVec::new();
        let reach = (1.0 + LINE_HITBOX_HEIGHT / self.cell_size) as i64;
        for x_offset in -reach..=reach {
            for y_offset in -reach..=reach {
                let probe =
                    position + Vec2::new(x_offset as f64, y_offset as f64) * self.cell_size;
                if let Some(cell) = self.cell_at(probe) {
                    for &id in cell.line_ids() {
                        if let Some(line) = self.lines.get(&id) {
                            found.push(line);
                        }
                    }
                }
            }
        }
        found
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snapshot(grid: &Grid) -> BTreeMap<(i64, i64), Vec<i64>> {
        grid.occupied_cells()
            .map(|(coords, ids)| (coords, ids.to_vec()))
            .collect()
    }

    fn floor_line(id: i64, y: f64) -> Line {
        // kept in the positive quadrant: negative-x cells are subject to
        // the rasterizer's historical skipping
        Line::normal(
            id,
            Vec2::new(1.0, y),
            Vec2::new(40.0, y),
            false,
            false,
            false,
        )
    }

    #[test]
    fn add_then_remove_restores_cell_contents() {
        let mut grid = Grid::new(GridVersion::V62, GRID_CELL_SIZE);
        grid.add_line(floor_line(0, 10.0));
        let before = snapshot(&grid);

        grid.add_line(floor_line(7, 12.0));
        grid.remove_line(7);

        assert_eq!(snapshot(&grid), before);
        assert!(!grid.contains_line(7));
    }

    #[test]
    fn removing_an_unknown_id_is_a_no_op() {
        let mut grid = Grid::new(GridVersion::V62, GRID_CELL_SIZE);
        grid.add_line(floor_line(0, 10.0));
        let before = snapshot(&grid);
        assert!(grid.remove_line(99).is_none());
        assert_eq!(snapshot(&grid), before);
    }

    #[test]
    fn query_order_is_descending_id_within_a_cell() {
        let mut grid = Grid::new(GridVersion::V62, GRID_CELL_SIZE);
        grid.add_line(floor_line(0, 10.0));
        grid.add_line(floor_line(3, 11.0));
        grid.add_line(floor_line(1, 12.0));

        let cell = grid.cell_at(Vec2::new(0.0, 10.0)).unwrap();
        assert_eq!(cell.line_ids(), &[3, 1, 0]);
    }

    #[test]
    fn lines_near_sees_lines_one_cell_away() {
        let mut grid = Grid::new(GridVersion::V62, GRID_CELL_SIZE);
        grid.add_line(floor_line(0, 10.0));
        // a point one cell above the line's row still finds it
        let found = grid.lines_near(Vec2::new(0.0, -3.0));
        assert!(found.iter().any(|line| line.id == 0));
        // three cells away it does not
        let found = grid.lines_near(Vec2::new(0.0, -40.0));
        assert!(found.is_empty());
    }

    #[test]
    fn move_line_reregisters_under_new_cells() {
        let mut grid = Grid::new(GridVersion::V62, GRID_CELL_SIZE);
        grid.add_line(floor_line(0, 10.0));
        grid.move_line(0, Vec2::new(200.0, 100.0), Vec2::new(280.0, 100.0));

        assert!(grid.lines_near(Vec2::new(0.0, 10.0)).is_empty());
        assert!(!grid.lines_near(Vec2::new(240.0, 100.0)).is_empty());
        let (p1, p2) = grid.line(0).unwrap().endpoints();
        assert_eq!(p1, Vec2::new(200.0, 100.0));
        assert_eq!(p2, Vec2::new(280.0, 100.0));
    }
}
