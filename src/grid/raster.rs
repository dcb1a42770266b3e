//! Version-dependent rasterization of a line segment into grid cells.
//!
//! The three algorithms reproduce the historical players bug for bug.
//! In particular the 6.2 boundary-delta table reads `remainder.x` in both
//! negative-`cy` branches where `remainder.y` would be the geometric
//! choice; cells get skipped in the negative quadrants because of it.
//! Do not fix it, saved tracks depend on the skips.

use itertools::iproduct;

use super::cell::CellPosition;
use super::GridVersion;
use crate::math::Vec2;

/// All cells a segment registers into, in visiting order.
pub fn cell_positions_between(
    version: GridVersion,
    cell_size: f64,
    p1: Vec2,
    p2: Vec2,
) -> Vec<CellPosition> {
    let initial = CellPosition::containing(p1, cell_size);
    let final_cell = CellPosition::containing(p2, cell_size);

    // degenerate segment, or one entirely inside a single cell
    if initial.same_cell(&final_cell) {
        return vec![initial];
    }

    match version {
        GridVersion::V62 | GridVersion::V67 => dda_sweep(cell_size, p1, p2, initial, final_cell),
        GridVersion::V61 => classic_sweep(cell_size, p1, p2, initial, final_cell),
        GridVersion::V60 => bounding_box_sweep(cell_size, p1, p2, initial, final_cell),
    }
}

/// Distance to the next x cell boundary, in the historical formulation.
fn x_boundary_delta(forwards: bool, cx: i64, remainder: Vec2, cell_size: f64) -> f64 {
    if forwards {
        if cx >= 0 {
            cell_size - remainder.x
        } else {
            cell_size + remainder.x
        }
    } else if cx >= 0 {
        -1.0 - remainder.x
    } else {
        -(cell_size + remainder.x)
    }
}

/// Distance to the next y cell boundary.
///
/// Both `cy < 0` branches read `remainder.x`. Historical quirk, load-bearing.
fn y_boundary_delta(forwards: bool, cy: i64, remainder: Vec2, cell_size: f64) -> f64 {
    if forwards {
        if cy >= 0 {
            cell_size - remainder.y
        } else {
            cell_size + remainder.x
        }
    } else if cy >= 0 {
        -1.0 - remainder.y
    } else {
        -(cell_size + remainder.x)
    }
}

fn outside_bounds(cell: &CellPosition, initial: &CellPosition, final_cell: &CellPosition) -> bool {
    let (lo_x, hi_x) = (
        initial.cx.min(final_cell.cx),
        initial.cx.max(final_cell.cx),
    );
    let (lo_y, hi_y) = (
        initial.cy.min(final_cell.cy),
        initial.cy.max(final_cell.cy),
    );
    cell.cx < lo_x || cell.cx > hi_x || cell.cy < lo_y || cell.cy > hi_y
}

/// 6.2 / 6.7: DDA stepping from boundary to boundary.
fn dda_sweep(
    cell_size: f64,
    p1: Vec2,
    p2: Vec2,
    initial: CellPosition,
    final_cell: CellPosition,
) -> Vec<CellPosition> {
    let vec = p2 - p1;
    let mut cells = vec![initial];
    let mut current = initial;

    loop {
        let dx = x_boundary_delta(vec.x > 0.0, current.cx, current.remainder, cell_size);
        let dy = y_boundary_delta(vec.y > 0.0, current.cy, current.remainder, cell_size);

        let step = if vec.y == 0.0 {
            Vec2::new(dx, 0.0)
        } else if vec.x == 0.0 {
            Vec2::new(0.0, dy)
        } else {
            let y_based_dx = dy * vec.x / vec.y;
            let x_based_dy = dx * vec.y / vec.x;
            if x_based_dy.abs() < dy.abs() {
                Vec2::new(dx, x_based_dy)
            } else if x_based_dy.abs() == dy.abs() {
                Vec2::new(dx, dy)
            } else {
                Vec2::new(y_based_dx, dy)
            }
        };

        let next = CellPosition::containing(current.world + step, cell_size);
        // a zero-progress step would loop forever (the 6.1 crash); stop instead
        if next.same_cell(&current) {
            return cells;
        }
        if outside_bounds(&next, &initial, &final_cell) {
            return cells;
        }
        cells.push(next);
        current = next;
    }
}

/// JS-style `Math.round`: halves toward positive infinity.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// 6.1: the same stepping skeleton, but the next cell is picked from the
/// line's slope-intercept form with the candidate crossings rounded to
/// whole coordinates. The equal-cell guard doubles as the mitigation for
/// the infinite loop the original shipped with.
fn classic_sweep(
    cell_size: f64,
    p1: Vec2,
    p2: Vec2,
    initial: CellPosition,
    final_cell: CellPosition,
) -> Vec<CellPosition> {
    let vec = p2 - p1;
    let (slope, intercept) = if vec.x != 0.0 {
        let slope = vec.y / vec.x;
        (slope, p1.y - slope * p1.x)
    } else {
        (0.0, 0.0)
    };

    let mut cells = vec![initial];
    let mut current = initial;

    loop {
        let dx = x_boundary_delta(vec.x > 0.0, current.cx, current.remainder, cell_size);
        let dy = y_boundary_delta(vec.y > 0.0, current.cy, current.remainder, cell_size);

        let step = if vec.y == 0.0 {
            Vec2::new(dx, 0.0)
        } else if vec.x == 0.0 {
            Vec2::new(0.0, dy)
        } else {
            let x_crossing = current.world.x + dx;
            let y_crossing = current.world.y + dy;
            let y_at_x = round_half_up(slope * x_crossing + intercept) - current.world.y;
            let x_at_y = round_half_up((y_crossing - intercept) / slope) - current.world.x;
            if y_at_x.abs() < dy.abs() {
                Vec2::new(dx, y_at_x)
            } else if y_at_x.abs() == dy.abs() {
                Vec2::new(dx, dy)
            } else {
                Vec2::new(x_at_y, dy)
            }
        };

        let next = CellPosition::containing(current.world + step, cell_size);
        if next.same_cell(&current) {
            return cells;
        }
        if outside_bounds(&next, &initial, &final_cell) {
            return cells;
        }
        cells.push(next);
        current = next;
    }
}

/// 6.0 (and the betas that shipped its grid): every cell in the bounding
/// box whose area overlaps the line's hitbox.
fn bounding_box_sweep(
    cell_size: f64,
    p1: Vec2,
    p2: Vec2,
    initial: CellPosition,
    final_cell: CellPosition,
) -> Vec<CellPosition> {
    let vec = p2 - p1;
    let unit = vec * (1.0 / vec.length());
    let normal = unit.rot_ccw();

    let half = Vec2::new(vec.x.abs() * 0.5, vec.y.abs() * 0.5);
    let mid = p1 + vec * 0.5;
    let abs_normal = Vec2::new(normal.x.abs(), normal.y.abs());
    let half_cell = Vec2::new(cell_size * 0.5, cell_size * 0.5);
    let dist_from_center = abs_normal.dot(half_cell);
    let overlap_into_hitbox = Vec2::new(dist_from_center, dist_from_center).dot(abs_normal);

    let (lo_x, hi_x) = (
        initial.cx.min(final_cell.cx),
        initial.cx.max(final_cell.cx),
    );
    let (lo_y, hi_y) = (
        initial.cy.min(final_cell.cy),
        initial.cy.max(final_cell.cy),
    );

    let mut cells = Vec::new();
    for (cx, cy) in iproduct!(lo_x..=hi_x, lo_y..=hi_y) {
        let center = Vec2::new(
            cx as f64 * cell_size + half_cell.x,
            cy as f64 * cell_size + half_cell.y,
        );
        let d = mid - center;
        let t = normal.dot(d);
        let dist_from_line = (t * normal.x).abs() + (t * normal.y).abs();

        let overlaps = half.x + half_cell.x >= d.x.abs()
            && half.y + half_cell.y >= d.y.abs()
            && overlap_into_hitbox >= dist_from_line;
        if overlaps {
            cells.push(CellPosition::containing(center, cell_size));
        }
    }
    cells
}

//
// tests
//
