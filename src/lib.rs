//! A deterministic Line Rider–style physics core.
//!
//! Entities (articulated rider+sled bodies) advance through discrete
//! frames over an editable set of physics lines. Given the same grid
//! version, riders and lines, every frame is bit-for-bit reproducible.
//! That property is the whole point, and it constrains everything from
//! vector math evaluation order to iteration order over grid cells.
//!
//! The usual entry points are [`track::parse_track`] for `.track.json`
//! input or [`Engine::new`] for programmatic setup, then
//! [`Engine::get_frame`].

pub mod math;
pub use math::Vec2;

pub mod line;
pub use line::Line;

pub mod grid;
pub use grid::{Grid, GridVersion};

pub mod rider;
pub use rider::{
    Entity, EntityState, InitialEntityParams, MountPhase, RemountVersion, SimFlags,
};

pub mod engine;
pub use engine::{Engine, Frame};

pub mod track;
pub use track::{TrackData, TrackError};

pub mod fixture;
