/// Position/orientation frame shared by objects and the camera
use std::f64::consts::FRAC_PI_2;

use crate::transform::{angle_between, world_up, Mat3, Vec3};

/// Targets closer than this are too near to look at
const LOOK_MIN_DISTANCE: f64 = 0.5;
/// Turns smaller than 0.1 degree are skipped
const LOOK_MIN_ANGLE: f64 = 0.1 * std::f64::consts::PI / 180.0;
/// Beyond 175 degrees the cross product no longer gives a usable axis
const LOOK_FALLBACK_ANGLE: f64 = 175.0 * std::f64::consts::PI / 180.0;

/// A rigid frame: where something is and which way it faces.
///
/// `direction` and `upper` stay unit length and mutually orthogonal under
/// rotation. Non-uniform scaling of an owner does not touch the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub center: Vec3,
    pub direction: Vec3,
    pub upper: Vec3,
}

impl Frame {
    pub fn new(center: Vec3, direction: Vec3, upper: Vec3) -> Self {
        Self {
            center,
            direction,
            upper,
        }
    }

    /// Unit vector to the frame's left (`upper × direction`)
    pub fn left(&self) -> Vec3 {
        self.upper.cross(&self.direction)
    }

    pub(crate) fn translate(&mut self, delta: &Vec3) {
        self.center += delta;
    }

    pub(crate) fn rotate(&mut self, r: &Mat3) {
        self.upper = (r * self.upper).normalize();
        self.direction = (r * self.direction).normalize();
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            center: Vec3::zeros(),
            direction: Vec3::new(0.0, 0.0, 1.0),
            upper: world_up(),
        }
    }
}

/// The rotation `(axis, angle)` that turns `frame` to face `target`.
///
/// Returns `None` when the target is within half a unit of the center or the
/// turn is below 0.1°. Near-antiparallel turns use the frame's own upper
/// vector as the axis.
pub fn look_turn(frame: &Frame, target: &Vec3) -> Option<(Vec3, f64)> {
    let wanted = target - frame.center;
    if wanted.norm() < LOOK_MIN_DISTANCE {
        return None;
    }
    let wanted = wanted.normalize();

    let angle = angle_between(&frame.direction, &wanted);
    if angle < LOOK_MIN_ANGLE {
        return None;
    }

    let axis = if angle > LOOK_FALLBACK_ANGLE {
        frame.upper
    } else {
        wanted.cross(&frame.direction).normalize()
    };
    Some((axis, angle))
}

/// Roll angle about `direction` that brings `upper` back toward `up`.
///
/// The sign follows which side of the new direction the world-up vector lies
/// on relative to `upper`.
pub fn upright_roll(frame: &Frame, up: &Vec3) -> f64 {
    let angle = angle_between(
        &frame.direction.cross(&frame.upper),
        &frame.direction.cross(up),
    );
    let side = angle_between(&world_up().cross(&frame.upper), &frame.direction);
    if side > FRAC_PI_2 {
        -angle
    } else {
        angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transform;

    #[test]
    fn test_look_turn_dead_zones() {
        let frame = Frame::default();
        assert!(look_turn(&frame, &Vec3::new(0.1, 0.2, 0.3)).is_none());
        // 0.05 degrees off the forward axis
        let tiny = Vec3::new((0.05f64).to_radians().tan() * 10.0, 0.0, 10.0);
        assert!(look_turn(&frame, &tiny).is_none());
    }

    #[test]
    fn test_look_turn_antiparallel_uses_upper() {
        let frame = Frame::default();
        let (axis, angle) = look_turn(&frame, &Vec3::new(0.0, 0.0, -10.0)).unwrap();
        assert_eq!(axis, frame.upper);
        assert!((angle - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_look_turn_axis_brings_direction_to_target() {
        let mut frame = Frame::default();
        let target = Vec3::new(4.0, 3.0, 1.0);
        let (axis, angle) = look_turn(&frame, &target).unwrap();
        frame.rotate(&Transform::rotation_matrix(&axis, angle));
        assert!(angle_between(&frame.direction, &target) < 1e-6);
    }

    #[test]
    fn test_upright_roll_restores_upper() {
        let mut frame = Frame::default();
        frame.rotate(&Transform::rotation_matrix(&frame.direction, 0.4));
        assert!(angle_between(&frame.upper, &world_up()) > 0.3);

        let roll = upright_roll(&frame, &world_up());
        frame.rotate(&Transform::rotation_matrix(&frame.direction, roll));
        assert!((frame.upper - world_up()).norm() < 1e-9);
    }
}
