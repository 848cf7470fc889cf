/// Scene: owns the camera, light, matrices and objects, and runs each frame
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use crate::camera::Camera;
use crate::frame::Frame;
use crate::geometry::RenderContext;
use crate::light::Light;
use crate::object::Object;
use crate::projection::{Projection, ProjectionConfig};
use crate::surface::DrawingSurface;
use crate::timing::{Clock, FpsCounter, SystemClock};
use crate::transform::{Vec2, Vec3};

/// Objects whose projected center leaves this box are not drawn
const CULL_XY: f64 = 1.4;
const CULL_Z: f64 = 1.0;

/// Stable handle to an object owned by a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Rebuild a handle from [`raw`](Self::raw), e.g. one passed through a host
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Everything a scene starts with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConfig {
    pub projection: ProjectionConfig,
    pub light: Light,
    pub camera: Frame,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionConfig::default(),
            light: Light::default(),
            camera: *Camera::default().frame(),
        }
    }
}

impl SceneConfig {
    pub fn with_projection(mut self, projection: ProjectionConfig) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.light = light;
        self
    }

    pub fn with_camera(mut self, camera: Frame) -> Self {
        self.camera = camera;
        self
    }
}

/// Runs before objects are updated each frame
pub type FrameHook = Box<dyn FnMut(&mut Scene)>;
/// Runs after the scene has been drawn each frame
pub type DrawHook = Box<dyn FnMut(&Scene, &mut dyn DrawingSurface)>;

/// Mutable access to the camera.
///
/// The view matrix is rebuilt when this guard is dropped, so the next render
/// always sees the camera's current frame.
pub struct CameraMut<'a> {
    camera: &'a mut Camera,
    projection: &'a mut Projection,
}

impl Deref for CameraMut<'_> {
    type Target = Camera;

    fn deref(&self) -> &Camera {
        self.camera
    }
}

impl DerefMut for CameraMut<'_> {
    fn deref_mut(&mut self) -> &mut Camera {
        self.camera
    }
}

impl Drop for CameraMut<'_> {
    fn drop(&mut self) {
        self.projection.refresh_view(self.camera.frame());
    }
}

/// A complete 3D scene drawn onto one surface.
///
/// The scene owns no thread: the host calls [`Scene::tick`] once per frame.
pub struct Scene {
    camera: Camera,
    light: Light,
    projection: Projection,
    objects: BTreeMap<ObjectId, Object>,
    next_id: u64,
    fps: FpsCounter,
    clock: Box<dyn Clock>,
    on_frame: Option<FrameHook>,
    extra_draw: Option<DrawHook>,
}

impl Scene {
    /// A default scene for a `width`×`height` surface on the system clock
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_config(width, height, SceneConfig::default(), Box::new(SystemClock))
    }

    pub fn with_config(width: u32, height: u32, config: SceneConfig, clock: Box<dyn Clock>) -> Self {
        let camera = Camera::new(config.camera);
        let projection = Projection::new(width, height, config.projection, camera.frame());
        let fps = FpsCounter::new(clock.now_secs());
        Self {
            camera,
            light: config.light,
            projection,
            objects: BTreeMap::new(),
            next_id: 0,
            fps,
            clock,
            on_frame: None,
            extra_draw: None,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> CameraMut<'_> {
        CameraMut {
            camera: &mut self.camera,
            projection: &mut self.projection,
        }
    }

    pub fn light(&self) -> &Light {
        &self.light
    }

    pub fn set_light(&mut self, light: Light) {
        self.light = light;
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Replace the clip planes and field of view (`fov` in radians)
    pub fn set_perspective(&mut self, near: f64, far: f64, fov: f64) {
        log::debug!("perspective near={} far={} fov={}", near, far, fov);
        self.projection.set_config(ProjectionConfig { near, far, fov });
    }

    /// Adopt a new surface size
    pub fn resize(&mut self, width: u32, height: u32) {
        log::debug!("surface resized to {}x{}", width, height);
        self.projection.resize(width, height);
    }

    /// Frames counted during the last full wall-clock second
    pub fn fps(&self) -> f64 {
        self.fps.fps()
    }

    pub fn add(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        log::debug!(
            "adding object {} ({} polygons)",
            id.0,
            object.polygons().len()
        );
        self.objects.insert(id, object);
        id
    }

    /// Take an object out of the scene; `None` if the handle is unknown
    pub fn remove(&mut self, id: ObjectId) -> Option<Object> {
        let removed = self.objects.remove(&id);
        log::debug!("removing object {}: found={}", id.0, removed.is_some());
        removed
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn set_on_frame(&mut self, hook: impl FnMut(&mut Scene) + 'static) {
        self.on_frame = Some(Box::new(hook));
    }

    pub fn set_extra_draw(&mut self, hook: impl FnMut(&Scene, &mut dyn DrawingSurface) + 'static) {
        self.extra_draw = Some(Box::new(hook));
    }

    /// Pixel position of a world point under the current camera
    pub fn project(&self, point: &Vec3) -> Vec2 {
        self.projection.to_screen(point)
    }

    /// Run one frame: hooks, updates, render and fps accounting
    pub fn tick(&mut self, surface: &mut dyn DrawingSurface) {
        let (width, height) = surface.size();
        if (width, height) != self.projection.size() {
            self.resize(width, height);
        }

        if let Some(mut hook) = self.on_frame.take() {
            hook(self);
            if self.on_frame.is_none() {
                self.on_frame = Some(hook);
            }
        }

        self.update();
        self.render(surface);

        if let Some(mut hook) = self.extra_draw.take() {
            hook(self, surface);
            if self.extra_draw.is_none() {
                self.extra_draw = Some(hook);
            }
        }

        if self.fps.count_frame(self.clock.now_secs()) {
            log::trace!("fps {}", self.fps.fps());
        }
    }

    /// Advance every object's animation, then the camera
    pub fn update(&mut self) {
        let fps = self.fps.fps();
        for object in self.objects.values_mut() {
            object.update(fps);
        }
        self.update_camera(fps);
    }

    fn update_camera(&mut self, fps: f64) {
        let Some((target_id, _)) = self.camera.tracking() else {
            return;
        };
        match self.objects.get(&target_id).map(|o| *o.frame()) {
            Some(target) => {
                self.camera.follow(&target, fps);
                self.projection.refresh_view(self.camera.frame());
            }
            None => {
                log::warn!("tracked object {} is gone; camera stops tracking", target_id.0);
                self.camera.stop_tracking();
            }
        }
    }

    /// Clear the surface and paint every visible object back to front
    pub fn render(&mut self, surface: &mut dyn DrawingSurface) {
        surface.clear();

        let mut visible: Vec<(f64, ObjectId)> = self
            .objects
            .iter()
            .filter_map(|(id, object)| {
                let p = self.projection.to_ndc(&object.center());
                let inside = p.x.abs() <= CULL_XY && p.y.abs() <= CULL_XY && p.z.abs() <= CULL_Z;
                inside.then_some((p.z, *id))
            })
            .collect();
        visible.sort_by(|a, b| b.0.total_cmp(&a.0));
        log::trace!("drawing {} of {} objects", visible.len(), self.objects.len());

        let camera_direction = self.camera.direction();
        for (_, id) in visible {
            if let Some(object) = self.objects.get_mut(&id) {
                object.face_camera(&camera_direction);
                let ctx = RenderContext {
                    projection: &self.projection,
                    camera_direction,
                    light: &self.light,
                };
                object.draw(&ctx, surface);
            }
        }
    }
}
