/// K3D Terminal Demo - Spinning cube, billboard and an optional textured panel
///
/// Usage: k3d-terminal [image-file]
///
/// Controls:
///   - WASD / R/F: Move the free camera
///   - Arrow Keys: Turn the free camera
///   - 1: Free camera  2: Elastic follow  3: Gaze  4: Look down
///   - Q/ESC: Quit
use anyhow::{Context, Result};
use crossterm::event::KeyCode;
use k3d_core::{
    shapes, Action, AnimationPattern, Billboard, Frame, ObjectId, Polygon, Scene, SceneConfig,
    SystemClock, Texture, Tracking, Vec3,
};
use k3d_terminal::{free_camera_controls, Framebuffer, TerminalApp};
use std::f64::consts::PI;

const PANEL_TEXTURE: &str = "panel";

fn main() -> Result<()> {
    env_logger::init();

    let (cols, rows) = crossterm::terminal::size().context("reading terminal size")?;
    let mut app = TerminalApp::with_size(build_scene(cols, rows), cols, rows).with_title("K3D Terminal");

    let textured = match std::env::args().nth(1) {
        Some(path) => {
            load_panel(app.framebuffer_mut(), &path)?;
            true
        }
        None => false,
    };

    let scene = app.scene_mut();
    let cube = add_cube(scene);
    add_sun(scene);
    add_panel(scene, textured);

    scene.set_extra_draw(|scene, surface| {
        let mode = match scene.camera().tracking() {
            None => "free",
            Some((_, Tracking::Elastic { .. })) => "elastic",
            Some((_, Tracking::FirstPerson)) => "first person",
            Some((_, Tracking::LookDown { .. })) => "look down",
            Some((_, Tracking::Gaze)) => "gaze",
        };
        surface.fill_text(&format!("camera: {}", mode), 1.0, 0.0, k3d_core::Rgba::opaque(200, 200, 200));
    });

    app.set_key_handler(move |scene, code| match code {
        KeyCode::Char('1') => scene.camera_mut().stop_tracking(),
        KeyCode::Char('2') => scene.camera_mut().track(cube, Tracking::elastic(0.05, 8.0, 0.9)),
        KeyCode::Char('3') => scene.camera_mut().track(cube, Tracking::Gaze),
        KeyCode::Char('4') => scene.camera_mut().track(
            cube,
            Tracking::look_down(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0), 12.0),
        ),
        code => free_camera_controls(scene, code),
    });

    app.run().context("terminal host failed")?;

    println!("Thank you for using K3D Terminal!");
    Ok(())
}

fn build_scene(cols: u16, rows: u16) -> Scene {
    let camera = Frame::new(
        Vec3::new(0.0, 2.0, -14.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.0, 1.0, 0.0),
    );
    let config = SceneConfig::default().with_camera(camera);
    Scene::with_config(cols as u32, rows as u32 * 2, config, Box::new(SystemClock))
}

fn load_panel(framebuffer: &mut Framebuffer, path: &str) -> Result<()> {
    framebuffer
        .load_image(PANEL_TEXTURE, path)
        .with_context(|| format!("loading texture {}", path))
}

fn add_cube(scene: &mut Scene) -> ObjectId {
    let mut cube = shapes::cube();
    cube.set_color(Vec3::new(0.2, 0.6, 1.0));
    cube.set_animation(
        &AnimationPattern::new()
            .then(Action::RotateYaw(2.0 * PI), 4000.0)
            .then(Action::MoveForward(6.0), 2000.0)
            .then(Action::RotatePitch(PI), 2000.0)
            .then(Action::Scale(Vec3::new(1.5, 1.5, 1.5)), 1000.0)
            .then(Action::Scale(Vec3::new(1.0 / 1.5, 1.0 / 1.5, 1.0 / 1.5)), 1000.0)
            .then(Action::RotatePitch(PI), 2000.0)
            .then(Action::MoveForward(6.0), 2000.0)
            .repeating(),
    );
    let id = scene.add(cube);

    // Pulse the cube's color once a second.
    let mut frame = 0u32;
    scene.set_on_frame(move |scene| {
        frame = frame.wrapping_add(1);
        let pulse = 0.5 + 0.5 * (frame as f64 * 2.0 * PI / 60.0).sin();
        if let Some(cube) = scene.get_mut(id) {
            cube.set_color(Vec3::new(0.2, 0.4 + 0.4 * pulse, 1.0));
        }
    });
    id
}

fn add_sun(scene: &mut Scene) {
    let size = 1.5;
    let polygon = Polygon::new(vec![
        Vec3::new(-size, size, 0.0),
        Vec3::new(-size, -size, 0.0),
        Vec3::new(size, -size, 0.0),
        Vec3::new(size, size, 0.0),
    ])
    .with_color(Vec3::new(1.0, 0.85, 0.2));
    let mut sun = shapes::rectangle(polygon, Some(Billboard::Free));
    sun.move_to(&Vec3::new(-6.0, 5.0, 8.0));
    sun.set_animation(
        &AnimationPattern::new()
            .then(Action::MoveUp(2.0), 1500.0)
            .then(Action::MoveUp(-2.0), 1500.0)
            .repeating(),
    );
    scene.add(sun);
}

fn add_panel(scene: &mut Scene, textured: bool) {
    let mut polygon = Polygon::new(vec![
        Vec3::new(4.0, 3.0, 4.0),
        Vec3::new(4.0, -1.0, 4.0),
        Vec3::new(8.0, -1.0, 4.0),
        Vec3::new(8.0, 3.0, 4.0),
    ])
    .with_color(Vec3::new(0.9, 0.3, 0.3))
    .with_back_side();
    if textured {
        polygon = polygon.with_texture(Texture::new(PANEL_TEXTURE));
    }
    let mut panel = shapes::rectangle(polygon, Some(Billboard::FixedAxis(Vec3::new(0.0, 1.0, 0.0))));
    panel.rotate_yaw(0.3);
    scene.add(panel);
}
