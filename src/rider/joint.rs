//! Orientation triggers over pairs of bones.

use super::bone::Bone;
use super::point::Point;

/// An ordered pair of structural bones (by index). The joint triggers
/// when their mutual orientation flips, i.e. the signed cross product
/// of their vectors goes negative. No hysteresis: the test is evaluated
/// fresh wherever it is asked.
///
/// Mount joints trigger dismounts; break joints break the sled.
#[derive(Clone, Copy, Debug)]
pub struct Joint {
    pub bone1: usize,
    pub bone2: usize,
}

impl Joint {
    pub fn should_break(&self, bones: &[Bone], points: &[Point]) -> bool {
        let delta1 = bones[self.bone1].vector(points);
        let delta2 = bones[self.bone2].vector(points);
        delta1.cross(delta2) < 0.0
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::rider::bone::BoneKind;

    fn rig(p2_of_second: Vec2) -> (Vec<Bone>, Vec<Point>) {
        let points = vec![
            Point::at_rest(Vec2::ZERO),
            Point::at_rest(Vec2::new(1.0, 0.0)),
            Point::at_rest(p2_of_second),
        ];
        let bones = vec![
            Bone {
                p1: 1,
                p2: 0,
                rest_length: 1.0,
                kind: BoneKind::Normal,
            },
            Bone {
                p1: 2,
                p2: 0,
                rest_length: 1.0,
                kind: BoneKind::Normal,
            },
        ];
        (bones, points)
    }

    #[test]
    fn triggers_only_on_negative_cross() {
        let joint = Joint { bone1: 0, bone2: 1 };

        // second bone counterclockwise of the first: positive cross
        let (bones, points) = rig(Vec2::new(0.0, 1.0));
        assert!(!joint.should_break(&bones, &points));

        // flipped to the clockwise side
        let (bones, points) = rig(Vec2::new(0.0, -1.0));
        assert!(joint.should_break(&bones, &points));

        // collinear is not a trigger
        let (bones, points) = rig(Vec2::new(2.0, 0.0));
        assert!(!joint.should_break(&bones, &points));
    }
}
