//! `.track.json` ingestion.
//!
//! Only the physics-relevant subset of the format is read; unknown keys
//! are ignored. Scenery lines and zero-length lines never reach the
//! core, so the engine is allowed to assume `length > 0`.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::engine::Engine;
use crate::grid::GridVersion;
use crate::line::Line;
use crate::math::Vec2;
use crate::rider::{Entity, InitialEntityParams, RemountVersion, SimFlags};

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("failed to read track file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse track json")]
    Json(#[from] serde_json::Error),
}

/// A parsed track, ready to be turned into an [`Engine`].
#[derive(Debug)]
pub struct TrackData {
    pub version: GridVersion,
    pub entities: Vec<Entity>,
    pub lines: Vec<Line>,
}

impl TrackData {
    pub fn into_engine(self) -> Engine {
        Engine::new(self.version, self.entities, self.lines)
    }
}

#[derive(Debug, Deserialize)]
struct TrackFile {
    #[serde(default)]
    version: String,
    #[serde(default)]
    riders: Vec<RiderSpec>,
    #[serde(default)]
    lines: Vec<LineSpec>,
}

#[derive(Debug, Deserialize)]
struct Coords {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RiderSpec {
    start_position: Coords,
    start_velocity: Coords,
    #[serde(default)]
    start_angle: f64,
    /// Three-valued: absent/bool/number pick the remount behavior.
    #[serde(default)]
    remountable: Option<Remountable>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Remountable {
    Flag(bool),
    Version(f64),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineSpec {
    id: i64,
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    flipped: bool,
    #[serde(default)]
    left_extended: bool,
    #[serde(default)]
    right_extended: bool,
    multiplier: Option<f64>,
}

/// Map a track version string to a grid version. Anything unrecognized
/// plays as 6.2, like the reference players.
pub fn convert_version(version: &str) -> GridVersion {
    match version {
        "6.0" => GridVersion::V60,
        "6.1" => GridVersion::V61,
        "6.2" => GridVersion::V62,
        _ => GridVersion::V62,
    }
}

fn convert_lines(specs: Vec<LineSpec>) -> Vec<Line> {
    let mut lines = Vec::with_capacity(specs.len());
    let mut skipped = 0usize;
    for spec in specs {
        // scenery and degenerate lines have no physics
        if spec.x1 == spec.x2 && spec.y1 == spec.y2 {
            skipped += 1;
            continue;
        }
        let p1 = Vec2::new(spec.x1, spec.y1);
        let p2 = Vec2::new(spec.x2, spec.y2);
        match spec.kind {
            0 => lines.push(Line::normal(
                spec.id,
                p1,
                p2,
                spec.flipped,
                spec.left_extended,
                spec.right_extended,
            )),
            1 => lines.push(Line::acceleration(
                spec.id,
                p1,
                p2,
                spec.flipped,
                spec.left_extended,
                spec.right_extended,
                spec.multiplier.unwrap_or(1.0),
            )),
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        log::debug!("skipped {} non-physics lines", skipped);
    }
    lines
}

fn convert_riders(specs: Vec<RiderSpec>, flags: SimFlags) -> Vec<Entity> {
    specs
        .into_iter()
        .map(|spec| {
            let mut remount_version = match spec.remountable {
                None => RemountVersion::None,
                Some(Remountable::Flag(_)) => RemountVersion::ComV1,
                Some(Remountable::Version(_)) => RemountVersion::ComV2,
            };
            if flags.lra_remount {
                remount_version = RemountVersion::Lra;
            }

            // truthiness, like the reference: false and 0 both disable
            let can_remount = match spec.remountable {
                None => false,
                Some(Remountable::Flag(flag)) => flag,
                Some(Remountable::Version(n)) => n != 0.0,
            };

            Entity::default_rider(
                InitialEntityParams {
                    position: Vec2::new(spec.start_position.x, spec.start_position.y),
                    velocity: Vec2::new(spec.start_velocity.x, spec.start_velocity.y),
                    rotation: spec.start_angle,
                    can_remount,
                },
                remount_version,
                flags,
            )
        })
        .collect()
}

/// Parse a track from its JSON text.
pub fn parse_track(json: &str, flags: SimFlags) -> Result<TrackData, TrackError> {
    let file: TrackFile = serde_json::from_str(json)?;
    Ok(TrackData {
        version: convert_version(&file.version),
        entities: convert_riders(file.riders, flags),
        lines: convert_lines(file.lines),
    })
}

/// Read and parse a track file.
pub fn load_track(path: impl AsRef<Path>, flags: SimFlags) -> Result<TrackData, TrackError> {
    let json = std::fs::read_to_string(path)?;
    parse_track(&json, flags)
}

//
// tests
//
