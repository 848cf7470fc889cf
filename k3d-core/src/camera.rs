/// Movable camera with object tracking
use crate::frame::{look_turn, upright_roll, Frame};
use crate::scene::ObjectId;
use crate::transform::{world_up, Transform, Vec3};

/// How the camera follows its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tracking {
    /// Damped spring on the distance to the target
    Elastic {
        /// Spring constant, scaled by `1/fps` each frame
        spring: f64,
        /// Per-frame velocity damping factor
        damping: f64,
        /// Rest length of the spring
        rest: f64,
        /// Up vector the camera rolls toward
        up: Vec3,
    },
    /// Sit exactly where the target is, facing where it faces
    FirstPerson,
    /// Hover above the target at a fixed offset
    LookDown {
        up: Vec3,
        direction: Vec3,
        distance: f64,
    },
    /// Stay put and keep the target in view
    Gaze,
}

impl Tracking {
    pub fn elastic(spring: f64, rest: f64, damping: f64) -> Self {
        Tracking::Elastic {
            spring,
            damping,
            rest,
            up: world_up(),
        }
    }

    pub fn look_down(up: Vec3, direction: Vec3, distance: f64) -> Self {
        Tracking::LookDown {
            up,
            direction,
            distance,
        }
    }
}

/// The scene's point of view.
///
/// A camera owns its frame directly; it is never a polygon container.
/// Mutations made through [`crate::Scene::camera_mut`] refresh the scene's
/// view matrix when the borrow ends.
#[derive(Debug, Clone)]
pub struct Camera {
    frame: Frame,
    tracking: Option<(ObjectId, Tracking)>,
    velocity: f64,
}

impl Camera {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            tracking: None,
            velocity: 0.0,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn center(&self) -> Vec3 {
        self.frame.center
    }

    pub fn direction(&self) -> Vec3 {
        self.frame.direction
    }

    pub fn upper(&self) -> Vec3 {
        self.frame.upper
    }

    /// Current elastic-mode speed along the view direction
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn tracking(&self) -> Option<(ObjectId, &Tracking)> {
        self.tracking.as_ref().map(|(id, mode)| (*id, mode))
    }

    /// Follow `target` with `mode`; resets the spring velocity
    pub fn track(&mut self, target: ObjectId, mode: Tracking) {
        log::debug!("camera tracking {:?} with {:?}", target, mode);
        self.velocity = 0.0;
        self.tracking = Some((target, mode));
    }

    pub fn stop_tracking(&mut self) {
        self.tracking = None;
        self.velocity = 0.0;
    }

    pub fn move_by(&mut self, speed: f64, direction: &Vec3) {
        self.frame.translate(&(direction * speed));
    }

    pub fn move_forward(&mut self, speed: f64) {
        let direction = self.frame.direction;
        self.move_by(speed, &direction);
    }

    pub fn move_up(&mut self, speed: f64) {
        let upper = self.frame.upper;
        self.move_by(speed, &upper);
    }

    pub fn move_left(&mut self, speed: f64) {
        let left = self.frame.left();
        self.move_by(speed, &left);
    }

    pub fn move_to(&mut self, to: &Vec3) {
        self.frame.center = *to;
    }

    pub fn rotate(&mut self, axis: &Vec3, angle: f64) {
        self.frame.rotate(&Transform::rotation_matrix(axis, angle));
    }

    pub fn rotate_yaw(&mut self, angle: f64) {
        let axis = self.frame.upper;
        self.rotate(&axis, angle);
    }

    pub fn rotate_pitch(&mut self, angle: f64) {
        let axis = self.frame.left();
        self.rotate(&axis, angle);
    }

    pub fn rotate_roll(&mut self, angle: f64) {
        let axis = self.frame.direction;
        self.rotate(&axis, angle);
    }

    /// Turn toward `target` and roll back toward world up
    pub fn look(&mut self, target: &Vec3) {
        if let Some((axis, angle)) = look_turn(&self.frame, target) {
            self.rotate(&axis, angle);
            let roll = upright_roll(&self.frame, &world_up());
            self.rotate_roll(roll);
        }
    }

    /// Advance the tracking behavior by one frame given the target's frame
    pub(crate) fn follow(&mut self, target: &Frame, fps: f64) {
        let mode = match &self.tracking {
            Some((_, mode)) => *mode,
            None => return,
        };

        match mode {
            Tracking::Elastic {
                spring,
                damping,
                rest,
                up,
            } => {
                self.look(&target.center);
                let roll = upright_roll(&self.frame, &up);
                self.rotate_roll(roll);

                let distance = (self.frame.center - target.center).norm();
                if distance > rest {
                    self.velocity += spring / fps * (distance - rest);
                }
                self.velocity *= damping;
                if distance < rest / 2.0 {
                    self.velocity = 0.0;
                }
                self.move_forward(self.velocity);
            }
            Tracking::FirstPerson => {
                self.frame = *target;
            }
            Tracking::LookDown {
                up,
                direction,
                distance,
            } => {
                self.move_to(&(target.center + up * distance));
                self.look(&target.center);
                self.frame.upper = direction;
            }
            Tracking::Gaze => {
                self.look(&target.center);
            }
        }
    }
}

impl Default for Camera {
    /// Placed at z = 100 facing +z, the way a fresh scene starts
    fn default() -> Self {
        Self::new(Frame::new(
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 0.0, 1.0),
            world_up(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::angle_between;

    fn target_frame() -> Frame {
        Frame::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(1.0, 0.0, 0.0),
            world_up(),
        )
    }

    fn tracking(mode: Tracking) -> Camera {
        let mut camera = Camera::new(Frame::new(
            Vec3::new(0.0, 0.0, 20.0),
            Vec3::new(0.0, 0.0, -1.0),
            world_up(),
        ));
        camera.track(ObjectId::from_raw(7), mode);
        camera
    }

    #[test]
    fn test_first_person_snaps_to_target() {
        let mut camera = tracking(Tracking::FirstPerson);
        camera.follow(&target_frame(), 60.0);
        assert_eq!(camera.frame(), &target_frame());
    }

    #[test]
    fn test_gaze_only_turns() {
        let mut camera = tracking(Tracking::Gaze);
        let start = camera.center();
        let target = target_frame();
        camera.follow(&target, 60.0);
        assert_eq!(camera.center(), start);
        let wanted = target.center - start;
        assert!(angle_between(&camera.direction(), &wanted) < 1e-6);
    }

    #[test]
    fn test_look_down_hovers_above() {
        let down = Vec3::new(0.0, 0.0, -1.0);
        let mut camera = tracking(Tracking::look_down(world_up(), down, 10.0));
        let target = target_frame();
        camera.follow(&target, 60.0);
        assert!((camera.center() - Vec3::new(1.0, 12.0, 3.0)).norm() < 1e-9);
        assert!(angle_between(&camera.direction(), &-world_up()) < 1e-6);
        assert_eq!(camera.upper(), down);
    }

    #[test]
    fn test_elastic_pulls_toward_target() {
        let mut camera = tracking(Tracking::elastic(0.05, 5.0, 0.9));
        let target = Frame::default();
        for _ in 0..30 {
            camera.follow(&target, 60.0);
        }
        assert!(camera.velocity() > 0.0);
        assert!(camera.center().z < 20.0);
        assert!(angle_between(&camera.direction(), &-camera.center()) < 1e-6);
    }

    #[test]
    fn test_elastic_stops_inside_half_rest() {
        let mut camera = tracking(Tracking::elastic(0.05, 50.0, 0.9));
        camera.follow(&Frame::default(), 60.0);
        assert_eq!(camera.velocity(), 0.0);
        assert_eq!(camera.center(), Vec3::new(0.0, 0.0, 20.0));
    }

    #[test]
    fn test_untracked_camera_is_still() {
        let mut camera = Camera::default();
        let before = *camera.frame();
        camera.follow(&target_frame(), 60.0);
        assert_eq!(camera.frame(), &before);
        assert!(camera.tracking().is_none());
    }

    #[test]
    fn test_move_to_sets_center() {
        let mut camera = Camera::default();
        camera.move_to(&Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(camera.center(), Vec3::new(1.0, 1.0, 1.0));
        camera.move_forward(2.0);
        assert_eq!(camera.center(), Vec3::new(1.0, 1.0, 3.0));
    }
}
