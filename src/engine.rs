//! The frame engine: runs the per-frame pipeline over every entity and
//! memoizes the results.
//!
//! Frames are computed strictly in order and cached; editing a line
//! throws the whole cache away except the initial snapshot. That is the
//! conservative invalidation; a finer one could keep frames that never
//! touched the edited cells, but correctness only requires this.

use crate::grid::{Grid, GridVersion, GRID_CELL_SIZE};
use crate::line::Line;
use crate::math::Vec2;
use crate::rider::Entity;

const GRAVITY_SCALE: f64 = 0.175;
/// The 6.3/6.7 betas shipped with gravity one bit off. Kept, of course.
const GRAVITY_SCALE_V6_7: f64 = 0.17500000000000002;

/// Owns the grid and the computed-frame cache. Not re-entrant: frames
/// and edits are strictly sequential, and nothing here blocks or does
/// I/O.
#[derive(Clone, Debug)]
pub struct Engine {
    grid: Grid,
    gravity: Vec2,
    /// `cache[n]` is the entity list after frame `n`; `cache[0]` is the
    /// initial snapshot before any physics.
    cache: Vec<Vec<Entity>>,
}

/// A view of one computed frame.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'e> {
    entities: &'e [Entity],
}

impl<'e> Frame<'e> {
    pub fn entities(&self) -> &'e [Entity] {
        self.entities
    }

    pub fn entity(&self, index: usize) -> Option<&'e Entity> {
        self.entities.get(index)
    }
}

impl Engine {
    pub fn new(version: GridVersion, entities: Vec<Entity>, lines: Vec<Line>) -> Self {
        let mut grid = Grid::new(version, GRID_CELL_SIZE);
        let line_count = lines.len();
        for line in lines {
            grid.add_line(line);
        }

        let gravity_scale = if version == GridVersion::V67 {
            GRAVITY_SCALE_V6_7
        } else {
            GRAVITY_SCALE
        };

        log::debug!(
            "engine up: {:?} grid, {} lines, {} entities",
            version,
            line_count,
            entities.len()
        );

        Engine {
            grid,
            gravity: Vec2::new(0.0, gravity_scale),
            cache: vec![entities],
        }
    }

    /// The entity states after frame `n`, computing forward from the last
    /// cached frame if needed. Negative frames don't exist.
    pub fn get_frame(&mut self, n: i64) -> Option<Frame<'_>> {
        if n < 0 {
            return None;
        }

        while (self.cache.len() as i64) <= n {
            let mut next = self.cache[self.cache.len() - 1].clone();
            for entity in next.iter_mut() {
                entity.process_frame(self.gravity, &self.grid);
            }
            for index in 0..next.len() {
                Entity::process_remount(&mut next, index);
            }
            self.cache.push(next);
        }

        Some(Frame {
            entities: &self.cache[n as usize],
        })
    }

    /// Add a line, assigning it the next free id. Every computed frame is
    /// invalidated. Returns the assigned id.
    pub fn add_line(&mut self, mut line: Line) -> i64 {
        let id = self.grid.max_line_id().map_or(0, |max| max + 1);
        line.id = id;
        self.cache.truncate(1);
        self.grid.add_line(line);
        log::debug!("line {} added, frame cache reset", id);
        id
    }

    /// Remove a line by id, invalidating every computed frame. Unknown
    /// ids are a no-op and keep the cache.
    pub fn remove_line(&mut self, id: i64) {
        if !self.grid.contains_line(id) {
            return;
        }
        self.cache.truncate(1);
        self.grid.remove_line(id);
        log::debug!("line {} removed, frame cache reset", id);
    }

    /// Move a line's endpoints, invalidating every computed frame.
    /// Unknown ids are a no-op and keep the cache.
    pub fn move_line(&mut self, id: i64, p1: Vec2, p2: Vec2) {
        if !self.grid.contains_line(id) {
            return;
        }
        self.cache.truncate(1);
        self.grid.move_line(id, p1, p2);
        log::debug!("line {} moved, frame cache reset", id);
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Number of cached frames, the initial snapshot included.
    pub fn cached_frame_count(&self) -> usize {
        self.cache.len()
    }
}

//
// tests
//
