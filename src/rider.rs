//! The articulated rider+sled entity and its mount state machine.
//!
//! Instead of the pointer webs the historical players used, an entity is
//! a handful of flat arenas: points in one `Vec`, bones and joints
//! addressing them by index. Frame snapshots are then a plain `Clone`.
//!
//! Construction order is frozen: bones and joints hold indices, and the
//! per-frame processing order over these lists is observable in the
//! output bits.

pub mod bone;
pub mod joint;
pub mod point;

pub use bone::{Bone, BoneKind, FlutterBone};
pub use joint::Joint;
pub use point::{ContactPoint, FlutterPoint, Point};

use crate::grid::Grid;
use crate::math::Vec2;

/// Relaxation/collision passes per frame.
pub const NUM_ITERATIONS: usize = 6;

const MOUNT_ENDURANCE: f64 = 0.057;
const REPEL_LENGTH_FACTOR: f64 = 0.5;
const SCARF_AIR_FRICTION: f64 = 0.1;
const SCARF_AIR_FRICTION_COM: f64 = 0.2;

const REMOUNT_STRENGTH: f64 = 0.1;
const LRA_REMOUNT_STRENGTH: f64 = 0.5;

const DISMOUNTING_FRAMES: i32 = 30;
const DISMOUNTED_FRAMES: i32 = 3;
const REMOUNTING_FRAMES: i32 = 3;

/// Index of the tail contact point, the anchor the starting rotation
/// turns around.
const TAIL: usize = 1;
/// The first four contact points are the sled; remounting swaps them
/// between entities by value.
const SLED_POINT_COUNT: usize = 4;

/// Compatibility toggles, all defaulting to the testable flash-era
/// behavior.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimFlags {
    /// linerider.com scarf randomness. Not bit-reproducible across math
    /// libraries; leave off for anything that gets compared to fixtures.
    pub com_scarf: bool,
    /// LRA's legacy fakie handling: joints are also skipped on the frame
    /// the entity dismounted.
    pub lra_legacy_fakie_check: bool,
    /// Treat every rider as using LRA remount semantics regardless of
    /// what the track file says.
    pub lra_remount: bool,
}

/// Starting pose of a rider.
#[derive(Clone, Copy, Debug)]
pub struct InitialEntityParams {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Degrees, applied around the sled tail.
    pub rotation: f64,
    pub can_remount: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountPhase {
    /// Connected to the sled.
    Mounted,
    /// Just disconnected, not yet ready to reconnect.
    Dismounting,
    /// Fully disconnected, ready to reconnect.
    Dismounted,
    /// Reconnecting.
    Remounting,
}

/// Which player's remount rules the entity follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemountVersion {
    /// Pre-remount tracks: a dismount is final.
    None,
    /// `"remountable": true`: the tail fakie does not break the sled
    /// after dismounting (a .com bug kept for compatibility).
    ComV1,
    /// `"remountable": 1`, the fixed variant.
    ComV2,
    /// LRA's own remount implementation.
    Lra,
}

/// Mount bookkeeping for one entity.
#[derive(Clone, Copy, Debug)]
pub struct EntityState {
    pub remount_version: RemountVersion,
    pub can_remount: bool,
    pub sled_intact: bool,
    pub mount_phase: MountPhase,
    pub frames_until_dismounted: i32,
    pub frames_until_remounting: i32,
    pub frames_until_mounted: i32,
}

impl EntityState {
    fn new(can_remount: bool, remount_version: RemountVersion) -> Self {
        EntityState {
            remount_version,
            can_remount,
            sled_intact: true,
            mount_phase: MountPhase::Mounted,
            frames_until_dismounted: 0,
            frames_until_remounting: 0,
            frames_until_mounted: 0,
        }
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        matches!(
            self.mount_phase,
            MountPhase::Mounted | MountPhase::Remounting
        )
    }

    pub fn break_sled(&mut self) {
        self.sled_intact = false;
    }

    fn available_to_swap_sled(&self) -> bool {
        self.sled_intact && !self.is_mounted()
    }

    /// Set the phase, arming its timer when asked to.
    fn enter_mount_phase(&mut self, phase: MountPhase, reset_timer: bool) {
        if reset_timer {
            match phase {
                MountPhase::Dismounting => self.frames_until_dismounted = DISMOUNTING_FRAMES,
                MountPhase::Dismounted => self.frames_until_remounting = DISMOUNTED_FRAMES,
                MountPhase::Remounting => self.frames_until_mounted = REMOUNTING_FRAMES,
                MountPhase::Mounted => {}
            }
        }
        self.mount_phase = phase;
    }

    /// React to a dismount trigger (broken mount bone or mount joint).
    pub fn dismount(&mut self) {
        if self.remount_version == RemountVersion::None || !self.can_remount {
            // no timers, no way back
            self.enter_mount_phase(MountPhase::Dismounted, false);
        } else if self.mount_phase == MountPhase::Mounted {
            self.enter_mount_phase(MountPhase::Dismounting, true);
        } else if self.mount_phase == MountPhase::Remounting {
            self.enter_mount_phase(MountPhase::Dismounted, true);
        }
    }
}

/// A rider and its sled: point/bone/joint arenas plus mount state.
#[derive(Clone, Debug)]
pub struct Entity {
    pub state: EntityState,
    points: Vec<Point>,
    contact_points: Vec<ContactPoint>,
    flutter_points: Vec<FlutterPoint>,
    bones: Vec<Bone>,
    flutter_bones: Vec<FlutterBone>,
    mount_joints: Vec<Joint>,
    break_joints: Vec<Joint>,
    /// Latched when a mount bone or joint lets go; consumed by the mount
    /// state machine at the end of the frame.
    dismounted_this_frame: bool,
    com_scarf: bool,
    lra_legacy_fakie_check: bool,
}

impl Entity {
    /// The standard rider+sled skeleton, posed per `params`.
    ///
    /// Rest lengths are taken from the untransformed template; the whole
    /// body is then rotated around the tail and translated into place.
    pub fn default_rider(
        params: InitialEntityParams,
        remount_version: RemountVersion,
        flags: SimFlags,
    ) -> Self {
        let mut e = Entity {
            state: EntityState::new(params.can_remount, remount_version),
            points: Vec::new(),
            contact_points: Vec::new(),
            flutter_points: Vec::new(),
            bones: Vec::new(),
            flutter_bones: Vec::new(),
            mount_joints: Vec::new(),
            break_joints: Vec::new(),
            dismounted_this_frame: false,
            com_scarf: flags.com_scarf,
            lra_legacy_fakie_check: flags.lra_legacy_fakie_check,
        };

        let scarf_friction = if flags.com_scarf {
            SCARF_AIR_FRICTION_COM
        } else {
            SCARF_AIR_FRICTION
        };

        // sled points
        let peg = e.add_contact_point(Vec2::new(0.0, 0.0), 0.8);
        let tail = e.add_contact_point(Vec2::new(0.0, 5.0), 0.0);
        let nose = e.add_contact_point(Vec2::new(15.0, 5.0), 0.0);
        let string = e.add_contact_point(Vec2::new(17.5, 0.0), 0.0);
        debug_assert_eq!(tail, TAIL);
        debug_assert_eq!(string + 1, SLED_POINT_COUNT);

        // rider points
        let butt = e.add_contact_point(Vec2::new(5.0, 0.0), 0.8);
        let shoulder = e.add_contact_point(Vec2::new(5.0, -5.5), 0.8);
        let right_hand = e.add_contact_point(Vec2::new(11.5, -5.0), 0.1);
        let left_hand = e.add_contact_point(Vec2::new(11.5, -5.0), 0.1);
        let left_foot = e.add_contact_point(Vec2::new(10.0, 5.0), 0.0);
        let right_foot = e.add_contact_point(Vec2::new(10.0, 5.0), 0.0);

        let mut scarf = [0usize; 7];
        for (i, slot) in scarf.iter_mut().enumerate() {
            let x = 3.0 - 2.0 * i as f64;
            *slot = e.add_flutter_point(Vec2::new(x, -5.5), scarf_friction);
        }

        // sled bones
        let sled_back = e.add_normal_bone(peg, tail);
        e.add_normal_bone(tail, nose);
        e.add_normal_bone(nose, string);
        let sled_front = e.add_normal_bone(string, peg);
        e.add_normal_bone(peg, nose);
        e.add_normal_bone(string, tail);
        e.add_mount_bone(peg, butt);
        e.add_mount_bone(tail, butt);
        e.add_mount_bone(nose, butt);

        // rider bones; the shoulder/right-hand duplicate is part of the
        // historical template
        let torso = e.add_normal_bone(shoulder, butt);
        e.add_normal_bone(shoulder, left_hand);
        e.add_normal_bone(shoulder, right_hand);
        e.add_normal_bone(butt, left_foot);
        e.add_normal_bone(butt, right_foot);
        e.add_normal_bone(shoulder, right_hand);
        e.add_mount_bone(shoulder, peg);
        e.add_mount_bone(left_hand, string);
        e.add_mount_bone(right_hand, string);
        e.add_mount_bone(left_foot, nose);
        e.add_mount_bone(right_foot, nose);
        e.add_repel_bone(shoulder, left_foot);
        e.add_repel_bone(shoulder, right_foot);

        // scarf chain
        e.add_flutter_bone(shoulder, scarf[0]);
        for i in 0..scarf.len() - 1 {
            e.add_flutter_bone(scarf[i], scarf[i + 1]);
        }

        e.apply_initial_state(&params);

        e.add_mount_joint(sled_back, sled_front);
        e.add_mount_joint(torso, sled_front);
        e.add_break_joint(sled_back, sled_front);

        e
    }

    fn add_contact_point(&mut self, position: Vec2, friction: f64) -> usize {
        self.points.push(Point::at_rest(position));
        self.contact_points.push(ContactPoint { friction });
        self.points.len() - 1
    }

    fn add_flutter_point(&mut self, position: Vec2, air_friction: f64) -> usize {
        self.points.push(Point::at_rest(position));
        self.flutter_points.push(FlutterPoint { air_friction });
        self.points.len() - 1
    }

    fn add_bone(&mut self, p1: usize, p2: usize, kind: BoneKind) -> usize {
        let rest_length = self.points[p1]
            .position
            .distance_from(self.points[p2].position);
        self.bones.push(Bone {
            p1,
            p2,
            rest_length,
            kind,
        });
        self.bones.len() - 1
    }

    fn add_normal_bone(&mut self, p1: usize, p2: usize) -> usize {
        self.add_bone(p1, p2, BoneKind::Normal)
    }

    fn add_mount_bone(&mut self, p1: usize, p2: usize) -> usize {
        self.add_bone(
            p1,
            p2,
            BoneKind::Mount {
                endurance: MOUNT_ENDURANCE,
            },
        )
    }

    fn add_repel_bone(&mut self, p1: usize, p2: usize) -> usize {
        let rest_length = self.points[p1]
            .position
            .distance_from(self.points[p2].position)
            * REPEL_LENGTH_FACTOR;
        self.bones.push(Bone {
            p1,
            p2,
            rest_length,
            kind: BoneKind::Repel {
                length_factor: REPEL_LENGTH_FACTOR,
            },
        });
        self.bones.len() - 1
    }

    fn add_flutter_bone(&mut self, p1: usize, p2: usize) {
        let rest_length = self.points[p1]
            .position
            .distance_from(self.points[p2].position);
        self.flutter_bones.push(FlutterBone {
            p1,
            p2,
            rest_length,
        });
    }

    fn add_mount_joint(&mut self, bone1: usize, bone2: usize) {
        self.mount_joints.push(Joint { bone1, bone2 });
    }

    fn add_break_joint(&mut self, bone1: usize, bone2: usize) {
        self.break_joints.push(Joint { bone1, bone2 });
    }

    /// Rotate the template around the tail, then translate and seed the
    /// starting velocity.
    ///
    /// The cos/sin here are the documented cross-language soft spot;
    /// fixtures pin the specific angles they exercise.
    fn apply_initial_state(&mut self, params: &InitialEntityParams) {
        let radians = params.rotation * std::f64::consts::PI / 180.0;
        let cos_theta = radians.cos();
        let sin_theta = radians.sin();
        let origin = self.points[TAIL].position;

        for point in &mut self.points {
            let offset = point.position - origin;
            point.position = Vec2::new(
                origin.x + offset.x * cos_theta - offset.y * sin_theta,
                origin.y + offset.x * sin_theta + offset.y * cos_theta,
            );
        }

        for point in &mut self.points {
            let start_position = point.position + params.position;
            let start_velocity = point.velocity + params.velocity;
            point.position = start_position;
            point.velocity = start_velocity;
            point.previous_position = start_position - start_velocity;
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Contact points come first in the point arena.
    pub fn contact_point_count(&self) -> usize {
        self.contact_points.len()
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn flutter_bones(&self) -> &[FlutterBone] {
        &self.flutter_bones
    }

    pub fn mount_joint_count(&self) -> usize {
        self.mount_joints.len()
    }

    pub fn break_joint_count(&self) -> usize {
        self.break_joints.len()
    }

    pub fn average_position(&self) -> Vec2 {
        let mut sum = Vec2::ZERO;
        for point in &self.points {
            sum += point.position;
        }
        sum / self.points.len() as f64
    }

    /// One full physics frame for this entity (the mount state machine
    /// runs separately, after every entity has stepped).
    pub(crate) fn process_frame(&mut self, gravity: Vec2, grid: &Grid) {
        // momentum + gravity
        for i in 0..self.contact_points.len() {
            point::contact_step(&mut self.points[i], gravity);
        }
        let contact_count = self.contact_points.len();
        for (j, flutter) in self.flutter_points.iter().enumerate() {
            point::flutter_step(
                &mut self.points[contact_count + j],
                flutter.air_friction,
                gravity,
                self.com_scarf,
            );
        }

        // LRA decides strengths by the phase at the start of the frame,
        // .com by the live phase
        let initial_phase = self.state.mount_phase;
        for _ in 0..NUM_ITERATIONS {
            self.process_bones(initial_phase);
            self.process_collisions(grid);
        }

        for bone in &self.flutter_bones {
            bone.process(&mut self.points);
        }

        self.process_mount_joints();
        self.process_break_joints();
    }

    fn process_bones(&mut self, initial_phase: MountPhase) {
        let lra = self.state.remount_version == RemountVersion::Lra;
        for i in 0..self.bones.len() {
            let bone = self.bones[i];
            match bone.kind {
                BoneKind::Normal | BoneKind::Repel { .. } => {
                    let strength = if lra && initial_phase == MountPhase::Remounting {
                        LRA_REMOUNT_STRENGTH
                    } else {
                        1.0
                    };
                    bone.process(&mut self.points, strength);
                }
                BoneKind::Mount { .. } => {
                    let active = if lra {
                        matches!(
                            initial_phase,
                            MountPhase::Mounted | MountPhase::Remounting
                        )
                    } else {
                        self.state.is_mounted()
                    };
                    if !active {
                        continue;
                    }

                    let (intact, strength) = if lra && initial_phase == MountPhase::Remounting {
                        (bone.is_intact(&self.points, true), LRA_REMOUNT_STRENGTH)
                    } else if !lra && self.state.mount_phase == MountPhase::Remounting {
                        (bone.is_intact(&self.points, true), REMOUNT_STRENGTH)
                    } else {
                        (bone.is_intact(&self.points, false), 1.0)
                    };

                    if !self.dismounted_this_frame {
                        if intact {
                            bone.process(&mut self.points, strength);
                        } else {
                            self.dismounted_this_frame = true;
                            self.state.dismount();
                        }
                    }
                }
            }
        }
    }

    fn process_collisions(&mut self, grid: &Grid) {
        for i in 0..self.contact_points.len() {
            let friction = self.contact_points[i].friction;
            // the cell neighborhood is fixed by the position at the start
            // of this pass, even as collisions move the point
            let position = self.points[i].position;
            for line in grid.lines_near(position) {
                line.interact(&mut self.points[i], friction);
            }
        }
    }

    fn process_mount_joints(&mut self) {
        if !self.state.is_mounted() {
            return;
        }
        if self.lra_legacy_fakie_check && self.dismounted_this_frame {
            return;
        }
        for i in 0..self.mount_joints.len() {
            let joint = self.mount_joints[i];
            if joint.should_break(&self.bones, &self.points) && !self.dismounted_this_frame {
                self.dismounted_this_frame = true;
                self.state.dismount();
                if self.state.remount_version == RemountVersion::Lra {
                    // LRA also writes the sled off on a mount-joint fakie
                    self.state.break_sled();
                }
            }
        }
    }

    fn process_break_joints(&mut self) {
        // these two variants stop checking once the rider is off
        if matches!(
            self.state.remount_version,
            RemountVersion::Lra | RemountVersion::ComV1
        ) && !self.state.is_mounted()
        {
            return;
        }
        if self.lra_legacy_fakie_check && self.dismounted_this_frame {
            return;
        }
        for i in 0..self.break_joints.len() {
            let joint = self.break_joints[i];
            if self.state.sled_intact && joint.should_break(&self.bones, &self.points) {
                self.state.break_sled();
            }
        }
    }

    /// Whether this entity could hold the given phase right now: every
    /// mount bone within endurance and (outside LRA) no joint triggered.
    fn can_enter_mount_phase(&self, phase: MountPhase) -> bool {
        let remounting = phase == MountPhase::Remounting;
        for bone in &self.bones {
            if matches!(bone.kind, BoneKind::Mount { .. })
                && !bone.is_intact(&self.points, remounting)
            {
                return false;
            }
        }
        if self.state.remount_version != RemountVersion::Lra {
            for joint in self.break_joints.iter().chain(self.mount_joints.iter()) {
                if joint.should_break(&self.bones, &self.points) {
                    return false;
                }
            }
        }
        true
    }

    /// Advance the mount state machine for `entities[index]`. Runs after
    /// every entity has finished its physics frame.
    pub(crate) fn process_remount(entities: &mut [Entity], index: usize) {
        {
            let entity = &mut entities[index];
            if entity.state.remount_version == RemountVersion::None || !entity.state.can_remount {
                return;
            }
            if entity.dismounted_this_frame {
                entity.dismounted_this_frame = false;
                return;
            }
        }

        if entities[index].state.remount_version == RemountVersion::Lra {
            Self::process_remount_lra(entities, index);
        } else {
            Self::process_remount_com(entities, index);
        }
    }

    /// LRA ordering: timers are tested before they are decremented.
    fn process_remount_lra(entities: &mut [Entity], index: usize) {
        if !entities[index].state.sled_intact {
            entities[index]
                .state
                .enter_mount_phase(MountPhase::Dismounted, false);
            return;
        }

        match entities[index].state.mount_phase {
            MountPhase::Mounted => {}
            MountPhase::Dismounting => {
                let state = &mut entities[index].state;
                if state.frames_until_dismounted <= 0 {
                    state.enter_mount_phase(MountPhase::Dismounted, true);
                } else {
                    state.frames_until_dismounted -= 1;
                }
            }
            MountPhase::Dismounted => {
                if Self::can_enter_remounting(entities, index) {
                    let state = &mut entities[index].state;
                    if state.frames_until_remounting <= 0 {
                        state.enter_mount_phase(MountPhase::Remounting, true);
                    } else {
                        state.frames_until_remounting -= 1;
                    }
                } else {
                    entities[index]
                        .state
                        .enter_mount_phase(MountPhase::Dismounted, true);
                }
            }
            MountPhase::Remounting => {
                if entities[index].can_enter_mount_phase(MountPhase::Mounted) {
                    let state = &mut entities[index].state;
                    if state.frames_until_mounted <= 0 {
                        state.enter_mount_phase(MountPhase::Mounted, true);
                    } else {
                        state.frames_until_mounted -= 1;
                    }
                } else {
                    entities[index]
                        .state
                        .enter_mount_phase(MountPhase::Remounting, true);
                }
            }
        }
    }

    /// .com ordering: decrement first, then test.
    fn process_remount_com(entities: &mut [Entity], index: usize) {
        match entities[index].state.mount_phase {
            MountPhase::Mounted => {}
            MountPhase::Dismounting => {
                let state = &mut entities[index].state;
                state.frames_until_dismounted -= 1;
                if state.frames_until_dismounted <= 0 {
                    state.enter_mount_phase(MountPhase::Dismounted, true);
                }
            }
            MountPhase::Dismounted => {
                if Self::can_enter_remounting(entities, index) {
                    entities[index].state.frames_until_remounting -= 1;
                } else {
                    entities[index]
                        .state
                        .enter_mount_phase(MountPhase::Dismounted, true);
                }
                let state = &mut entities[index].state;
                if state.frames_until_remounting <= 0 {
                    state.enter_mount_phase(MountPhase::Remounting, true);
                }
            }
            MountPhase::Remounting => {
                if entities[index].can_enter_mount_phase(MountPhase::Mounted) {
                    entities[index].state.frames_until_mounted -= 1;
                } else {
                    entities[index]
                        .state
                        .enter_mount_phase(MountPhase::Remounting, true);
                }
                let state = &mut entities[index].state;
                if state.frames_until_mounted <= 0 {
                    state.enter_mount_phase(MountPhase::Mounted, true);
                }
            }
        }
    }

    /// Search the entity list for a sled the subject could remount.
    /// The subject itself is included: swapping with yourself is the
    /// identity, and is how single-rider remount re-arms. A successful
    /// check keeps the swap.
    fn can_enter_remounting(entities: &mut [Entity], subject: usize) -> bool {
        for other in 0..entities.len() {
            if !entities[other].state.available_to_swap_sled() {
                continue;
            }

            Self::swap_sleds(entities, subject, other);
            if entities[subject].can_enter_mount_phase(MountPhase::Remounting) {
                return true;
            }
            Self::swap_sleds(entities, subject, other);
        }
        false
    }

    /// Exchange the four sled points by value (and, for ComV2 subjects,
    /// the sled-intact flag).
    fn swap_sleds(entities: &mut [Entity], subject: usize, other: usize) {
        if subject == other {
            return;
        }
        let split = subject.max(other);
        let (head, rear) = entities.split_at_mut(split);
        let (subj, oth) = if subject < other {
            (&mut head[subject], &mut rear[0])
        } else {
            (&mut rear[0], &mut head[other])
        };

        if subj.state.remount_version == RemountVersion::ComV2 {
            std::mem::swap(&mut subj.state.sled_intact, &mut oth.state.sled_intact);
        }
        for i in 0..SLED_POINT_COUNT {
            std::mem::swap(&mut subj.points[i], &mut oth.points[i]);
        }
    }
}

//
// tests
//
