//! Engine-level invariants: determinism, caching, edit behavior,
//! structural conservation.

use itertools::Itertools;

use sledcore::fixture::encode_point_state;
use sledcore::{
    Engine, Entity, GridVersion, InitialEntityParams, Line, RemountVersion, SimFlags, Vec2,
};

fn rider(position: Vec2, velocity: Vec2) -> Entity {
    Entity::default_rider(
        InitialEntityParams {
            position,
            velocity,
            rotation: 0.0,
            can_remount: false,
        },
        RemountVersion::None,
        SimFlags::default(),
    )
}

/// A track with enough contact to make frames interesting: a long floor
/// and a slope feeding into it.
fn standard_track() -> Vec<Line> {
    vec![
        Line::normal(
            0,
            Vec2::new(-100.0, 40.0),
            Vec2::new(300.0, 40.0),
            false,
            false,
            false,
        ),
        Line::normal(
            1,
            Vec2::new(-40.0, -10.0),
            Vec2::new(60.0, 30.0),
            false,
            false,
            false,
        ),
    ]
}

fn standard_engine(version: GridVersion) -> Engine {
    Engine::new(
        version,
        vec![rider(Vec2::new(0.0, -20.0), Vec2::new(2.0, 0.0))],
        standard_track(),
    )
}

fn frame_signature(engine: &mut Engine, n: i64) -> Vec<String> {
    engine
        .get_frame(n)
        .expect("frame should exist")
        .entities()
        .iter()
        .flat_map(|entity| entity.points().iter().map(encode_point_state))
        .collect()
}

#[test]
fn identical_inputs_give_identical_frames_on_every_grid_version() {
    for version in [
        GridVersion::V60,
        GridVersion::V61,
        GridVersion::V62,
        GridVersion::V67,
    ] {
        let mut a = standard_engine(version);
        let mut b = standard_engine(version);
        for n in (0..=50).step_by(10) {
            assert_eq!(
                frame_signature(&mut a, n),
                frame_signature(&mut b, n),
                "{:?} diverged at frame {}",
                version,
                n
            );
        }
    }
}

#[test]
fn repeated_queries_are_idempotent() {
    let mut engine = standard_engine(GridVersion::V62);
    let first = frame_signature(&mut engine, 30);
    let second = frame_signature(&mut engine, 30);
    assert_eq!(first, second);
}

#[test]
fn backtracking_matches_a_fresh_computation() {
    let mut fresh = standard_engine(GridVersion::V62);
    let direct = frame_signature(&mut fresh, 12);

    let mut warmed = standard_engine(GridVersion::V62);
    warmed.get_frame(30);
    assert_eq!(frame_signature(&mut warmed, 12), direct);
}

#[test]
fn line_edits_recompute_from_the_initial_snapshot() {
    let mut engine = standard_engine(GridVersion::V62);
    let initial = frame_signature(&mut engine, 0);
    let at_30 = frame_signature(&mut engine, 30);

    // dropped straight into the fall path, so it is hit well before frame 30
    let id = engine.add_line(Line::normal(
        0,
        Vec2::new(-40.0, 0.0),
        Vec2::new(60.0, 0.0),
        false,
        false,
        false,
    ));

    // frame 0 is untouched by the edit
    assert_eq!(frame_signature(&mut engine, 0), initial);
    // frame 30 now plays over the new line
    let at_30_edited = frame_signature(&mut engine, 30);
    assert_ne!(at_30_edited, at_30);

    // removing what was added restores the original playback
    engine.remove_line(id);
    assert_eq!(frame_signature(&mut engine, 0), initial);
    assert_eq!(frame_signature(&mut engine, 30), at_30);
}

#[test]
fn structure_is_conserved_across_frames() {
    let mut engine = standard_engine(GridVersion::V62);

    let (point_count, bone_count, rest_lengths): (usize, usize, Vec<u64>) = {
        let frame = engine.get_frame(0).expect("frame");
        let entity = &frame.entities()[0];
        (
            entity.points().len(),
            entity.bones().len(),
            entity
                .bones()
                .iter()
                .map(|bone| bone.rest_length.to_bits())
                .collect(),
        )
    };

    for n in [1, 10, 25, 50] {
        let frame = engine.get_frame(n).expect("frame");
        let entity = &frame.entities()[0];
        assert_eq!(entity.points().len(), point_count);
        assert_eq!(entity.bones().len(), bone_count);
        assert_eq!(entity.mount_joint_count(), 2);
        assert_eq!(entity.break_joint_count(), 1);
        let rests: Vec<u64> = entity
            .bones()
            .iter()
            .map(|bone| bone.rest_length.to_bits())
            .collect();
        assert_eq!(rests, rest_lengths, "rest length changed by frame {}", n);
    }
}

#[test]
fn sled_state_never_recovers() {
    // slam the rider into a wall and watch the whole run: whatever
    // happens, intact never follows broken
    let wall = Line::normal(
        0,
        Vec2::new(40.0, 1400.0),
        Vec2::new(40.0, -100.0),
        false,
        false,
        false,
    );
    let mut engine = Engine::new(
        GridVersion::V62,
        vec![rider(Vec2::ZERO, Vec2::new(9.0, 0.0))],
        vec![wall],
    );

    let intact_series: Vec<bool> = (0..=120)
        .map(|n| {
            engine
                .get_frame(n)
                .expect("frame")
                .entities()[0]
                .state
                .sled_intact
        })
        .collect();

    for (earlier, later) in intact_series.iter().tuple_windows() {
        assert!(*earlier || !*later, "sled came back from broken");
    }
}
