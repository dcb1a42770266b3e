//! Simulation points and their integration step.

use crate::math::Vec2;

/// Shared state of every simulated point.
///
/// `previous_position` is not necessarily `position - velocity`: collisions
/// rewrite it to encode friction and acceleration, and the next frame's
/// integration derives the effective velocity from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub position: Vec2,
    pub previous_position: Vec2,
    pub velocity: Vec2,
}

impl Point {
    pub fn at_rest(position: Vec2) -> Self {
        Point {
            position,
            previous_position: position,
            velocity: Vec2::ZERO,
        }
    }
}

/// A colliding point; `friction` scales the tangential kick a line
/// collision writes into `previous_position`.
#[derive(Clone, Copy, Debug)]
pub struct ContactPoint {
    pub friction: f64,
}

/// A non-colliding point (the scarf). Damped by `air_friction` every
/// frame, moved only by gravity and flutter bones.
#[derive(Clone, Copy, Debug)]
pub struct FlutterPoint {
    pub air_friction: f64,
}

/// One integration step for a contact point.
pub fn contact_step(point: &mut Point, gravity: Vec2) {
    let computed_velocity = point.position - point.previous_position;
    let new_velocity = computed_velocity + gravity;
    point.previous_position = point.position;
    point.position = point.position + new_velocity;
    point.velocity = new_velocity;
}

/// One integration step for a flutter point: the derived velocity is
/// damped before gravity is added.
///
/// `com_scarf` adds the linerider.com pseudo-random flutter offset. Its
/// trig is not bit-reproducible across math libraries, which is why it
/// defaults to off and fixtures never enable it.
pub fn flutter_step(point: &mut Point, air_friction: f64, gravity: Vec2, com_scarf: bool) {
    let computed_velocity = point.position - point.previous_position;
    let new_velocity = computed_velocity * (1.0 - air_friction) + gravity;
    let current_position = point.position;
    let mut new_position = current_position + new_velocity;

    if com_scarf {
        new_position += flutter_offset(new_velocity, current_position);
    }

    point.previous_position = current_position;
    point.position = new_position;
    point.velocity = new_velocity;
}

/// GLSL-style hash in [0, 1).
fn glsl_rand(seed: Vec2) -> f64 {
    let next = (seed.dot(Vec2::new(12.9898, 78.233))).sin() * 43758.5453;
    next - next.trunc()
}

fn flutter_offset(velocity: Vec2, seed: Vec2) -> Vec2 {
    // smaller threshold means more flutter as speed increases
    const SPEED_THRESHOLD: f64 = 40.0;
    const INTENSITY: f64 = 2.0;

    let speed = velocity.length_sq().powf(0.25);
    let mut random_length = glsl_rand(velocity);
    let mut random_angle = glsl_rand(seed);
    random_length *= INTENSITY * speed * -((-speed / SPEED_THRESHOLD).exp_m1());
    random_angle *= 2.0 * std::f64::consts::PI;
    Vec2::new(random_angle.cos(), random_angle.sin()) * random_length
}

//
// tests
//
