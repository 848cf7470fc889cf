/// Rigid multi-polygon objects
use crate::animation::{Action, Animation, AnimationPattern};
use crate::frame::{look_turn, upright_roll, Frame};
use crate::geometry::{Polygon, RenderContext};
use crate::shapes::{Billboard, GateProbe, NeedleGate};
use crate::surface::DrawingSurface;
use crate::transform::{angle_between, world_up, Transform, Vec3};

/// Extra per-shape behavior layered on top of a plain object
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Plain,
    /// Re-orients toward the camera before every draw
    Billboard(Billboard),
    /// Hollow frame with outer/inner gate boxes
    Needle(NeedleGate),
}

/// A rigid composite of polygons with its own frame.
///
/// Every operation moves the frame, each polygon center and each vertex
/// together, so the shape never deforms except through [`Object::scale`].
#[derive(Debug, Clone)]
pub struct Object {
    frame: Frame,
    polygons: Vec<Polygon>,
    size: f64,
    animation: Option<Animation>,
    kind: ShapeKind,
}

impl Object {
    /// An empty object at the origin facing +z with +y up
    pub fn new() -> Self {
        Self::with_frame(Frame::default())
    }

    pub fn with_frame(frame: Frame) -> Self {
        Self {
            frame,
            polygons: Vec::new(),
            size: 0.0,
            animation: None,
            kind: ShapeKind::Plain,
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

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// Bounding radius around the center
    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: ShapeKind) {
        self.kind = kind;
    }

    pub fn animation(&self) -> Option<&Animation> {
        self.animation.as_ref()
    }

    /// Take ownership of `polygon`, growing the bounding radius if needed
    pub fn add_polygon(&mut self, polygon: Polygon) {
        self.grow_size(polygon.vertices());
        self.polygons.push(polygon);
    }

    fn grow_size(&mut self, vertices: &[Vec3]) {
        let center = self.frame.center;
        self.size = vertices
            .iter()
            .map(|v| (v - center).norm())
            .fold(self.size, f64::max);
    }

    /// Recolor every polygon
    pub fn set_color(&mut self, color: Vec3) {
        for polygon in &mut self.polygons {
            polygon.color = color;
        }
    }

    /// Translate by `speed` along `direction`
    pub fn move_by(&mut self, speed: f64, direction: &Vec3) {
        let delta = direction * speed;
        self.translate(&delta);
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
        let delta = to - self.frame.center;
        self.translate(&delta);
    }

    fn translate(&mut self, delta: &Vec3) {
        self.frame.translate(delta);
        for polygon in &mut self.polygons {
            polygon.translate(delta);
        }
    }

    /// Rotate about `axis` (unit length) through the object's center
    pub fn rotate(&mut self, axis: &Vec3, angle: f64) {
        let r = Transform::rotation_matrix(axis, angle);
        self.frame.rotate(&r);
        let pivot = self.frame.center;
        for polygon in &mut self.polygons {
            polygon.rotate_about(&pivot, &r);
        }
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

    /// Scale vertex offsets from the center per axis.
    ///
    /// Factors apply along world axes, so non-uniform scaling of a rotated
    /// object shears it. The bounding radius only ever grows.
    pub fn scale(&mut self, factors: &Vec3) {
        let pivot = self.frame.center;
        for polygon in &mut self.polygons {
            polygon.scale_about(&pivot, factors);
        }
        let vertices: Vec<Vec3> = self
            .polygons
            .iter()
            .flat_map(|p| p.vertices().iter().copied())
            .collect();
        self.grow_size(&vertices);
    }

    /// Turn to face `target`, then roll back toward world up
    pub fn look(&mut self, target: &Vec3) {
        if let Some((axis, angle)) = look_turn(&self.frame, target) {
            self.rotate(&axis, angle);
            let roll = upright_roll(&self.frame, &world_up());
            self.rotate_roll(roll);
        }
    }

    /// Approximate segment test: bounding sphere first, then polygon planes
    pub fn check_collision(&self, segment: &[Vec3; 2]) -> bool {
        let center = self.frame.center;
        if segment.iter().any(|p| (p - center).norm() > self.size) {
            return false;
        }
        self.polygons.iter().any(|polygon| polygon.crosses(segment))
    }

    /// Gate test for needles; `None` for any other shape
    pub fn probe(&self, point: &Vec3) -> Option<GateProbe> {
        match &self.kind {
            ShapeKind::Needle(gate) => Some(gate.probe(&self.frame, point)),
            _ => None,
        }
    }

    /// Install a copy of `pattern` as this object's animation
    pub fn set_animation(&mut self, pattern: &AnimationPattern) {
        log::debug!("installing animation with {} steps", pattern.steps.len());
        self.animation = Some(Animation::new(pattern.clone()));
    }

    pub fn clear_animation(&mut self) {
        self.animation = None;
    }

    /// Run one frame of the animation at the current frame rate
    pub fn update(&mut self, fps: f64) {
        let action = match self.animation.as_mut() {
            Some(animation) => animation.advance(fps),
            None => return,
        };
        if let Some(action) = action {
            self.apply(action);
        }
    }

    /// Perform one action immediately
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::MoveForward(p) => self.move_forward(p),
            Action::MoveUp(p) => self.move_up(p),
            Action::MoveLeft(p) => self.move_left(p),
            Action::RotateYaw(p) => self.rotate_yaw(p),
            Action::RotatePitch(p) => self.rotate_pitch(p),
            Action::RotateRoll(p) => self.rotate_roll(p),
            Action::Scale(factors) => self.scale(&factors),
            Action::Look(target) => self.look(&target),
        }
    }

    /// Billboards turn toward the camera; other shapes are left alone
    pub(crate) fn face_camera(&mut self, camera_direction: &Vec3) {
        let axis = match &self.kind {
            ShapeKind::Billboard(Billboard::Free) => {
                let target = self.frame.center - camera_direction;
                self.look(&target);
                return;
            }
            ShapeKind::Billboard(Billboard::FixedAxis(axis)) => *axis,
            _ => return,
        };

        let angle = angle_between(
            &axis.cross(&self.frame.direction),
            &axis.cross(camera_direction),
        );
        let side = angle_between(&world_up(), &self.frame.direction.cross(camera_direction));
        if side < std::f64::consts::FRAC_PI_2 {
            self.rotate(&axis, -angle);
        } else {
            self.rotate(&axis, angle);
        }
    }

    /// Draw polygons back to front
    pub fn draw(&self, ctx: &RenderContext<'_>, surface: &mut dyn DrawingSurface) {
        let mut order: Vec<(f64, &Polygon)> = self
            .polygons
            .iter()
            .map(|p| (p.depth(ctx.projection), p))
            .collect();
        order.sort_by(|a, b| b.0.total_cmp(&a.0));
        for (_, polygon) in order {
            polygon.draw(ctx, surface);
        }
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}
