//! Physics lines and the line–point collision response.
//!
//! A line precomputes everything the collision test needs at construction
//! time; the per-frame hot path only reads. The collision formulas follow
//! the historical players operation for operation, and the friction sign
//! flips are asymmetric between axes on purpose.

use crate::math::Vec2;
use crate::rider::point::Point;

/// Depth of the collision hitbox on a line's top side.
pub const LINE_HITBOX_HEIGHT: f64 = 10.0;
/// Endpoint extensions cap out at a quarter of the line's length.
pub const MAX_EXTENSION_RATIO: f64 = 0.25;

const ACCELERATION_MULT: f64 = 0.1;

/// A physics line. Normal lines only redirect; acceleration lines also
/// push along their direction.
///
/// Endpoint/flip/extension edits go through the setters so the derived
/// collision data stays consistent. The grid must be told separately
/// (see [`Grid::move_line`](crate::grid::Grid::move_line)).
#[derive(Clone, Debug)]
pub struct Line {
    pub id: i64,
    endpoints: (Vec2, Vec2),
    flipped: bool,
    left_extended: bool,
    right_extended: bool,
    /// Acceleration multiplier; 0 for normal lines.
    acceleration: f64,

    // derived at construction, cached for the collision hot path
    pub(crate) vector: Vec2,
    pub(crate) length: f64,
    inv_length_squared: f64,
    pub(crate) unit: Vec2,
    pub(crate) normal_unit: Vec2,
    limit_left: f64,
    limit_right: f64,
    acceleration_vector: Vec2,
}

impl Line {
    /// A plain (blue) line.
    pub fn normal(
        id: i64,
        p1: Vec2,
        p2: Vec2,
        flipped: bool,
        left_extended: bool,
        right_extended: bool,
    ) -> Self {
        Self::with_acceleration(id, p1, p2, flipped, left_extended, right_extended, 0.0)
    }

    /// An acceleration (red) line with the given multiplier.
    pub fn acceleration(
        id: i64,
        p1: Vec2,
        p2: Vec2,
        flipped: bool,
        left_extended: bool,
        right_extended: bool,
        multiplier: f64,
    ) -> Self {
        Self::with_acceleration(id, p1, p2, flipped, left_extended, right_extended, multiplier)
    }

    fn with_acceleration(
        id: i64,
        p1: Vec2,
        p2: Vec2,
        flipped: bool,
        left_extended: bool,
        right_extended: bool,
        acceleration: f64,
    ) -> Self {
        let mut line = Line {
            id,
            endpoints: (p1, p2),
            flipped,
            left_extended,
            right_extended,
            acceleration,
            vector: Vec2::ZERO,
            length: 0.0,
            inv_length_squared: 0.0,
            unit: Vec2::ZERO,
            normal_unit: Vec2::ZERO,
            limit_left: 0.0,
            limit_right: 1.0,
            acceleration_vector: Vec2::ZERO,
        };
        line.update_computed();
        line
    }

    /// Recompute all derived collision data from the primary fields.
    ///
    /// The loader filters coincident endpoints, so `length > 0` holds here.
    fn update_computed(&mut self) {
        self.vector = self.endpoints.1 - self.endpoints.0;
        self.length = self.vector.length();
        self.inv_length_squared = 1.0 / self.vector.length_sq();
        // multiplication by the reciprocal, not division: the historical
        // players computed it this way and the low bits differ
        self.unit = self.vector * (1.0 / self.length);
        self.normal_unit = self.unit.rot_ccw();
        if self.flipped {
            self.normal_unit = -self.normal_unit;
        }
        let ext_ratio = MAX_EXTENSION_RATIO.min(LINE_HITBOX_HEIGHT / self.length);
        self.limit_left = 0.0;
        self.limit_right = 1.0;
        if self.left_extended {
            self.limit_left -= ext_ratio;
        }
        if self.right_extended {
            self.limit_right += ext_ratio;
        }
        self.acceleration_vector = self.unit * self.acceleration * ACCELERATION_MULT;
    }

    pub fn endpoints(&self) -> (Vec2, Vec2) {
        self.endpoints
    }

    pub fn flipped(&self) -> bool {
        self.flipped
    }

    pub fn extensions(&self) -> (bool, bool) {
        (self.left_extended, self.right_extended)
    }

    pub fn acceleration_multiplier(&self) -> f64 {
        self.acceleration
    }

    pub fn set_endpoints(&mut self, p1: Vec2, p2: Vec2) {
        self.endpoints = (p1, p2);
        self.update_computed();
    }

    pub fn set_flipped(&mut self, flipped: bool) {
        self.flipped = flipped;
        self.update_computed();
    }

    pub fn set_extensions(&mut self, left: bool, right: bool) {
        self.left_extended = left;
        self.right_extended = right;
        self.update_computed();
    }

    /// Collide a contact point with this line.
    ///
    /// A hit rewrites `position` and `previous_position`; `velocity` is
    /// deliberately left stale and re-derived by the next frame's
    /// integration step.
    pub fn interact(&self, point: &mut Point, friction: f64) {
        let offset = point.position - self.endpoints.0;
        let moving_into_line = self.normal_unit.dot(point.velocity) > 0.0;
        if !moving_into_line {
            return;
        }

        let dist_from_line_top = self.normal_unit.dot(offset);
        if !(0.0 < dist_from_line_top && dist_from_line_top < LINE_HITBOX_HEIGHT) {
            return;
        }

        let pos_between_ends = self.vector.dot(offset) * self.inv_length_squared;
        if !(self.limit_left <= pos_between_ends && pos_between_ends <= self.limit_right) {
            return;
        }

        let new_position = point.position - self.normal_unit * dist_from_line_top;
        let mut friction_vector = self.normal_unit.rot_cw() * friction * dist_from_line_top;

        // asymmetric on purpose: x flips on >=, y flips on <
        if point.previous_position.x >= new_position.x {
            friction_vector.x = -friction_vector.x;
        }
        if point.previous_position.y < new_position.y {
            friction_vector.y = -friction_vector.y;
        }

        let new_previous_position =
            point.previous_position + friction_vector - self.acceleration_vector;

        point.position = new_position;
        point.previous_position = new_previous_position;
    }
}

//
// tests
//
