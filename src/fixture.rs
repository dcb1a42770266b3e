//! Fixture format support for exact-bit comparison against reference
//! players.
//!
//! A point's state is serialized as 64 hex characters: the big-endian
//! IEEE-754 encodings of `pos.x`, `pos.y`, `vel.x`, `vel.y` back to
//! back. Comparisons are on the raw bits; "close enough" does not
//! exist in this crate.

use serde::{Deserialize, Serialize};

use crate::rider::{Entity, MountPhase, Point};

/// One fixture case: play `file` to `frame` and compare against `state`.
/// An absent `state` asserts the frame itself is absent (negative index).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Fixture {
    pub file: String,
    pub test: String,
    pub frame: i64,
    #[serde(default)]
    pub state: Option<ExpectedState>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ExpectedState {
    #[serde(default)]
    pub entities: Vec<ExpectedEntity>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ExpectedEntity {
    #[serde(default)]
    pub mount_state: Option<String>,
    #[serde(default)]
    pub sled_state: Option<String>,
    /// One 64-hex-char string per contact point, in point order.
    #[serde(default)]
    pub points: Vec<String>,
}

/// Encode a point's state as the fixture hex string.
pub fn encode_point_state(point: &Point) -> String {
    format!(
        "{:016x}{:016x}{:016x}{:016x}",
        point.position.x.to_bits(),
        point.position.y.to_bits(),
        point.velocity.x.to_bits(),
        point.velocity.y.to_bits(),
    )
}

/// Decode a fixture hex string back into `(pos.x, pos.y, vel.x, vel.y)`.
pub fn decode_point_state(hex: &str) -> Option<[f64; 4]> {
    if hex.len() != 64 {
        return None;
    }
    let mut values = [0.0; 4];
    for (i, value) in values.iter_mut().enumerate() {
        let chunk = &hex[i * 16..(i + 1) * 16];
        *value = f64::from_bits(u64::from_str_radix(chunk, 16).ok()?);
    }
    Some(values)
}

fn mount_phase_from_tag(tag: &str) -> MountPhase {
    match tag {
        "DISMOUNTING" => MountPhase::Dismounting,
        "DISMOUNTED" => MountPhase::Dismounted,
        "REMOUNTING" => MountPhase::Remounting,
        // "MOUNTED" and anything unexpected
        _ => MountPhase::Mounted,
    }
}

/// Compare computed entities against an expected state. The first
/// mismatch is reported with enough context to locate it.
pub fn verify_entities(entities: &[Entity], expected: &ExpectedState) -> Result<(), String> {
    if entities.len() != expected.entities.len() {
        return Err(format!(
            "entity count mismatch: got {}, expected {}",
            entities.len(),
            expected.entities.len()
        ));
    }

    for (i, (entity, expected_entity)) in entities.iter().zip(&expected.entities).enumerate() {
        if let Some(tag) = &expected_entity.mount_state {
            let expected_phase = mount_phase_from_tag(tag);
            if entity.state.mount_phase != expected_phase {
                return Err(format!(
                    "entity {}: mount state is {:?}, expected {:?}",
                    i, entity.state.mount_phase, expected_phase
                ));
            }
        }

        if let Some(tag) = &expected_entity.sled_state {
            let expected_intact = tag == "INTACT";
            if entity.state.sled_intact != expected_intact {
                return Err(format!(
                    "entity {}: sled intact is {}, expected {}",
                    i, entity.state.sled_intact, expected_intact
                ));
            }
        }

        if entity.points().len() < expected_entity.points.len() {
            return Err(format!(
                "entity {}: {} points computed, {} expected",
                i,
                entity.points().len(),
                expected_entity.points.len()
            ));
        }
        for (j, expected_hex) in expected_entity.points.iter().enumerate() {
            let got = encode_point_state(&entity.points()[j]);
            if &got != expected_hex {
                return Err(format!(
                    "entity {} point {}: got {}, expected {}",
                    i, j, got, expected_hex
                ));
            }
        }
    }

    Ok(())
}

//
// tests
//
