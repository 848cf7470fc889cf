/// K3D Web - WASM host drawing a scene onto a 2D canvas
///
/// JavaScript builds the scene through [`WebScene`] and either calls
/// `tick()` itself or lets `start()` drive it with `requestAnimationFrame`.
use k3d_core::{
    shapes, Action, AnimationPattern, Billboard, Clock, Light, NeedleParams, ObjectId, Polygon,
    Scene, SceneConfig, Texture, Tracking, Vec3,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub mod canvas;

pub use canvas::CanvasSurface;

/// Wall clock read through `Date.now()`
#[derive(Debug, Default, Clone, Copy)]
pub struct JsClock;

impl Clock for JsClock {
    fn now_secs(&self) -> u64 {
        (js_sys::Date::now() / 1000.0) as u64
    }
}

/// Bookkeeping for the `requestAnimationFrame` chain.
///
/// At most one frame request is outstanding, so a quick `stop()`/`start()`
/// pair picks up the pending frame instead of starting a second chain.
#[derive(Debug, Default)]
struct FrameLoop {
    running: bool,
    pending: Option<i32>,
}

impl FrameLoop {
    /// Mark the loop running; true when a frame must be requested
    fn start(&mut self) -> bool {
        self.running = true;
        self.pending.is_none()
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn scheduled(&mut self, handle: i32) {
        self.pending = Some(handle);
    }

    /// The pending frame fired; true when it should tick and request the next
    fn fire(&mut self) -> bool {
        self.pending = None;
        self.running
    }

    fn failed(&mut self) {
        self.running = false;
        self.pending = None;
    }
}

struct State {
    scene: Scene,
    surface: CanvasSurface,
    frames: FrameLoop,
}

impl State {
    fn tick(&mut self) {
        self.scene.tick(&mut self.surface);
    }
}

/// A scene bound to one canvas element
#[wasm_bindgen]
pub struct WebScene {
    state: Rc<RefCell<State>>,
    on_frame: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
}

#[wasm_bindgen]
impl WebScene {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str) -> Result<WebScene, JsValue> {
        let surface = CanvasSurface::from_id(canvas_id)?;
        let (width, height) = k3d_core::DrawingSurface::size(&surface);
        let scene = Scene::with_config(width, height, SceneConfig::default(), Box::new(JsClock));
        log::info!("scene attached to #{} ({}x{})", canvas_id, width, height);
        Ok(WebScene {
            state: Rc::new(RefCell::new(State {
                scene,
                surface,
                frames: FrameLoop::default(),
            })),
            on_frame: Rc::new(RefCell::new(None)),
        })
    }

    /// Register an image under `source` for polygons to use as a texture
    pub fn load_texture(&self, source: &str, url: &str) -> Result<(), JsValue> {
        self.state.borrow_mut().surface.load_image(source, url)
    }

    pub fn add_cube(&self, x: f64, y: f64, z: f64, r: f64, g: f64, b: f64) -> u32 {
        let mut cube = shapes::cube();
        cube.set_color(Vec3::new(r, g, b));
        cube.move_to(&Vec3::new(x, y, z));
        self.add(cube)
    }

    /// A `2·half_width`×`2·half_height` panel facing −z, optionally textured
    /// and optionally turning toward the camera
    #[allow(clippy::too_many_arguments)]
    pub fn add_rectangle(
        &self,
        x: f64,
        y: f64,
        z: f64,
        half_width: f64,
        half_height: f64,
        texture: Option<String>,
        billboard: bool,
    ) -> u32 {
        let mut polygon = Polygon::new(vec![
            Vec3::new(x - half_width, y + half_height, z),
            Vec3::new(x - half_width, y - half_height, z),
            Vec3::new(x + half_width, y - half_height, z),
            Vec3::new(x + half_width, y + half_height, z),
        ])
        .with_back_side();
        if let Some(source) = texture {
            polygon = polygon.with_texture(Texture::new(source));
        }
        let billboard = billboard.then_some(Billboard::Free);
        self.add(shapes::rectangle(polygon, billboard))
    }

    /// A course needle whose top face sits at `(x, y, z)`; the eye is
    /// `inner_width`×`inner_height`, `margin_top` below the top face
    #[allow(clippy::too_many_arguments)]
    pub fn add_needle(
        &self,
        x: f64,
        y: f64,
        z: f64,
        width: f64,
        height: f64,
        depth: f64,
        inner_width: f64,
        inner_height: f64,
        margin_top: f64,
    ) -> u32 {
        let mut needle = shapes::needle(NeedleParams {
            width,
            height,
            depth,
            inner_width,
            inner_height,
            margin_top,
        });
        needle.move_to(&Vec3::new(x, y, z));
        self.add(needle)
    }

    pub fn remove(&self, id: u32) -> bool {
        self.state.borrow_mut().scene.remove(object_id(id)).is_some()
    }

    pub fn set_color(&self, id: u32, r: f64, g: f64, b: f64) -> bool {
        self.with_object(id, |object| object.set_color(Vec3::new(r, g, b)))
    }

    pub fn move_object(&self, id: u32, x: f64, y: f64, z: f64) -> bool {
        self.with_object(id, |object| object.move_to(&Vec3::new(x, y, z)))
    }

    /// Spin about the object's upper axis at `radians_per_sec`, forever
    pub fn spin(&self, id: u32, radians_per_sec: f64) -> bool {
        let pattern = AnimationPattern::new()
            .then(Action::RotateYaw(radians_per_sec), 1000.0)
            .repeating();
        self.with_object(id, |object| object.set_animation(&pattern))
    }

    /// `"pass"`, `"hit"` or `"outside"` for needles; `None` for other shapes
    pub fn probe(&self, id: u32, x: f64, y: f64, z: f64) -> Option<String> {
        let state = self.state.borrow();
        let probe = state.scene.get(object_id(id))?.probe(&Vec3::new(x, y, z))?;
        let outcome = if probe.is_pass() {
            "pass"
        } else if probe.is_hit() {
            "hit"
        } else {
            "outside"
        };
        Some(outcome.to_string())
    }

    /// Follow an object: `elastic`, `first-person`, `look-down` or `gaze`.
    ///
    /// `params` is `[spring, rest, damping]` for `elastic` and
    /// `[up_x, up_y, up_z, dir_x, dir_y, dir_z, distance]` for `look-down`;
    /// an empty array picks the defaults.
    pub fn track(&self, id: u32, mode: &str, params: &[f64]) -> Result<(), JsValue> {
        let mode = tracking_mode(mode, params).map_err(|e| JsValue::from_str(&e))?;
        let mut state = self.state.borrow_mut();
        let target = object_id(id);
        if state.scene.get(target).is_none() {
            return Err(JsValue::from_str(&format!("no object {}", id)));
        }
        state.scene.camera_mut().track(target, mode);
        Ok(())
    }

    pub fn stop_tracking(&self) {
        self.state.borrow_mut().scene.camera_mut().stop_tracking();
    }

    pub fn move_camera(&self, forward: f64, up: f64, left: f64) {
        let mut state = self.state.borrow_mut();
        let mut camera = state.scene.camera_mut();
        camera.move_forward(forward);
        camera.move_up(up);
        camera.move_left(left);
    }

    pub fn turn_camera(&self, yaw: f64, pitch: f64, roll: f64) {
        let mut state = self.state.borrow_mut();
        let mut camera = state.scene.camera_mut();
        camera.rotate_yaw(yaw);
        camera.rotate_pitch(pitch);
        camera.rotate_roll(roll);
    }

    pub fn look_at(&self, x: f64, y: f64, z: f64) {
        self.state
            .borrow_mut()
            .scene
            .camera_mut()
            .look(&Vec3::new(x, y, z));
    }

    #[allow(clippy::too_many_arguments)]
    pub fn set_light(&self, r: f64, g: f64, b: f64, dx: f64, dy: f64, dz: f64, ambient: f64, diffuse: f64) {
        let light = Light::new(Vec3::new(r, g, b), Vec3::new(dx, dy, dz), ambient, diffuse);
        self.state.borrow_mut().scene.set_light(light);
    }

    pub fn set_perspective(&self, near: f64, far: f64, fov_degrees: f64) {
        self.state
            .borrow_mut()
            .scene
            .set_perspective(near, far, fov_degrees.to_radians());
    }

    pub fn fps(&self) -> f64 {
        self.state.borrow().scene.fps()
    }

    /// Run a single frame
    pub fn tick(&self) {
        self.state.borrow_mut().tick();
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().frames.running
    }

    /// Tick on every animation frame until `stop()` is called
    pub fn start(&self) -> Result<(), JsValue> {
        if self.is_running() {
            return Ok(());
        }
        log::info!("animation loop started");
        if !self.state.borrow_mut().frames.start() {
            return Ok(());
        }

        if self.on_frame.borrow().is_none() {
            *self.on_frame.borrow_mut() = Some(self.frame_callback());
        }
        let callback = self.on_frame.borrow();
        let Some(f) = callback.as_ref() else {
            return Ok(());
        };
        match request_animation_frame(f) {
            Ok(handle) => {
                self.state.borrow_mut().frames.scheduled(handle);
                Ok(())
            }
            Err(err) => {
                self.state.borrow_mut().frames.failed();
                Err(err)
            }
        }
    }

    pub fn stop(&self) {
        self.state.borrow_mut().frames.stop();
        log::info!("animation loop stopped");
    }
}

impl Drop for WebScene {
    fn drop(&mut self) {
        let pending = self.state.borrow_mut().frames.pending.take();
        if let (Some(handle), Some(window)) = (pending, web_sys::window()) {
            let _ = window.cancel_animation_frame(handle);
        }
    }
}

impl WebScene {
    /// The single callback behind every frame request; it holds the cell it
    /// lives in weakly so dropping the scene frees it
    fn frame_callback(&self) -> Closure<dyn FnMut()> {
        let state = self.state.clone();
        let cell = Rc::downgrade(&self.on_frame);
        Closure::wrap(Box::new(move || {
            let live = state.borrow_mut().frames.fire();
            if !live {
                return;
            }
            state.borrow_mut().tick();
            if let Some(cell) = cell.upgrade() {
                if let Some(f) = cell.borrow().as_ref() {
                    match request_animation_frame(f) {
                        Ok(handle) => state.borrow_mut().frames.scheduled(handle),
                        Err(err) => {
                            log::warn!("requestAnimationFrame failed: {:?}", err);
                            state.borrow_mut().frames.failed();
                        }
                    }
                }
            }
        }) as Box<dyn FnMut()>)
    }

    fn add(&self, object: k3d_core::Object) -> u32 {
        self.state.borrow_mut().scene.add(object).raw() as u32
    }

    fn with_object(&self, id: u32, f: impl FnOnce(&mut k3d_core::Object)) -> bool {
        self.state
            .borrow_mut()
            .scene
            .get_mut(object_id(id))
            .map(f)
            .is_some()
    }
}

fn object_id(raw: u32) -> ObjectId {
    ObjectId::from_raw(raw as u64)
}

fn tracking_mode(mode: &str, params: &[f64]) -> Result<Tracking, String> {
    let tracking = match (mode, params) {
        ("elastic", []) => Tracking::elastic(0.05, 5.0, 0.9),
        ("elastic", &[spring, rest, damping]) => Tracking::elastic(spring, rest, damping),
        ("look-down", []) => Tracking::look_down(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            10.0,
        ),
        ("look-down", &[ux, uy, uz, dx, dy, dz, distance]) => {
            Tracking::look_down(Vec3::new(ux, uy, uz), Vec3::new(dx, dy, dz), distance)
        }
        ("first-person", []) => Tracking::FirstPerson,
        ("gaze", []) => Tracking::Gaze,
        ("elastic" | "look-down" | "first-person" | "gaze", _) => {
            return Err(format!(
                "{} tracking got {} parameters",
                mode,
                params.len()
            ))
        }
        (other, _) => return Err(format!("unknown tracking mode {}", other)),
    };
    Ok(tracking)
}

fn request_animation_frame(f: &Closure<dyn FnMut()>) -> Result<i32, JsValue> {
    web_sys::window()
        .ok_or_else(|| JsValue::from_str("no window"))?
        .request_animation_frame(f.as_ref().unchecked_ref())
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    #[cfg(target_arch = "wasm32")]
    {
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));
        console_log::init_with_level(log::Level::Info)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_reuses_pending_frame() {
        let mut frames = FrameLoop::default();
        assert!(frames.start());
        frames.scheduled(1);

        frames.stop();
        assert!(!frames.start(), "a frame is still pending");
        assert!(frames.fire());
        frames.scheduled(2);
        assert_eq!(frames.pending, Some(2));
    }

    #[test]
    fn test_stopped_loop_ends_chain() {
        let mut frames = FrameLoop::default();
        assert!(frames.start());
        frames.scheduled(1);
        frames.stop();
        assert!(!frames.fire());
        assert_eq!(frames.pending, None);
        assert!(frames.start(), "nothing pending after the chain ended");
    }

    #[test]
    fn test_failed_request_stops_loop() {
        let mut frames = FrameLoop::default();
        frames.start();
        frames.failed();
        assert!(!frames.running);
        assert!(frames.start());
    }

    #[test]
    fn test_tracking_mode_defaults_and_params() {
        assert!(matches!(
            tracking_mode("elastic", &[]),
            Ok(Tracking::Elastic { rest, .. }) if rest == 5.0
        ));
        match tracking_mode("elastic", &[0.1, 8.0, 0.8]) {
            Ok(Tracking::Elastic { spring, damping, rest, .. }) => {
                assert_eq!((spring, rest, damping), (0.1, 8.0, 0.8));
            }
            other => panic!("unexpected {:?}", other),
        }
        match tracking_mode("look-down", &[0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 12.0]) {
            Ok(Tracking::LookDown { up, direction, distance }) => {
                assert_eq!(up, Vec3::new(0.0, 0.0, 1.0));
                assert_eq!(direction, Vec3::new(1.0, 0.0, 0.0));
                assert_eq!(distance, 12.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(tracking_mode("gaze", &[]), Ok(Tracking::Gaze)));
        assert!(matches!(tracking_mode("first-person", &[]), Ok(Tracking::FirstPerson)));
    }

    #[test]
    fn test_tracking_mode_rejects_bad_input() {
        assert!(tracking_mode("elastic", &[0.1, 8.0]).is_err());
        assert!(tracking_mode("look-down", &[1.0]).is_err());
        assert!(tracking_mode("gaze", &[1.0]).is_err());
        assert!(tracking_mode("orbit", &[]).is_err());
    }
}
