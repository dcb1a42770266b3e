//! Length constraints between points.
//!
//! Bones address points by index into the owning entity's point arena.
//! One relaxation pass moves both endpoints half the error each
//! (`bias = 0.5`); six passes per frame interleaved with collisions is
//! what gives the simulation its characteristic stiffness.

use super::point::Point;
use crate::math::Vec2;

/// What a structural bone does with its length error.
#[derive(Clone, Copy, Debug)]
pub enum BoneKind {
    /// Enforce the rest length exactly.
    Normal,
    /// Enforce while mounted; reports broken when strained past
    /// `endurance * rest_length`.
    Mount { endurance: f64 },
    /// One-sided: pushes apart, never pulls. The rest length is already
    /// premultiplied by `length_factor` at construction.
    Repel { length_factor: f64 },
}

/// A structural length constraint between two points.
#[derive(Clone, Copy, Debug)]
pub struct Bone {
    pub p1: usize,
    pub p2: usize,
    /// Frozen at construction, before the entity is rotated and
    /// translated into its starting pose.
    pub rest_length: f64,
    pub kind: BoneKind,
}

impl Bone {
    #[inline]
    pub fn vector(&self, points: &[Point]) -> Vec2 {
        points[self.p1].position - points[self.p2].position
    }

    /// Halved relative length error; zero-length bones adjust by zero.
    fn adjustment(&self, length: f64) -> f64 {
        if length == 0.0 {
            0.0
        } else {
            (length - self.rest_length) / length * 0.5
        }
    }

    /// Whether a mount bone's strain is within endurance. Remounting
    /// doubles the allowance. Non-mount bones never report broken.
    pub fn is_intact(&self, points: &[Point], remounting: bool) -> bool {
        let BoneKind::Mount { endurance } = self.kind else {
            return true;
        };
        let factor = if remounting { 2.0 } else { 1.0 };
        let adjust = self.adjustment(self.vector(points).length());
        adjust <= endurance * factor * self.rest_length
    }

    /// One relaxation step, moving both endpoints.
    pub fn process(&self, points: &mut [Point], strength: f64) {
        let v = self.vector(points);
        let length = v.length();

        if let BoneKind::Repel { .. } = self.kind {
            if length >= self.rest_length {
                return;
            }
        }

        let delta = v * self.adjustment(length) * strength;
        points[self.p1].position -= delta;
        points[self.p2].position += delta;
    }
}

/// A directional constraint for the scarf chain: only `p2` moves, by the
/// full length error.
#[derive(Clone, Copy, Debug)]
pub struct FlutterBone {
    pub p1: usize,
    pub p2: usize,
    pub rest_length: f64,
}

impl FlutterBone {
    pub fn process(&self, points: &mut [Point]) {
        let v = points[self.p1].position - points[self.p2].position;
        let length = v.length();
        let adjust = if length == 0.0 {
            0.0
        } else {
            (length - self.rest_length) / length
        };
        points[self.p2].position += v * adjust;
    }
}

//
// tests
//
