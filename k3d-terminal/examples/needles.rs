/// Example: Fly a small cube through a row of needles
///
/// Usage: cargo run --example needles
///
/// Arrow keys steer, Q quits. Passing through an eye scores a point;
/// clipping the frame of a needle counts as a hit.
use anyhow::Result;
use crossterm::event::KeyCode;
use k3d_core::{
    shapes, Action, AnimationPattern, Frame, NeedleParams, ObjectId, Rgba, Scene, SceneConfig,
    SystemClock, Tracking, Vec3,
};
use k3d_terminal::TerminalApp;
use std::cell::RefCell;
use std::rc::Rc;

const NEEDLES: usize = 8;
const SPACING: f64 = 15.0;
const STEER: f64 = 0.1;

#[derive(Default)]
struct Score {
    passes: u32,
    hits: u32,
    /// Needles currently being flown through
    inside: Vec<ObjectId>,
}

fn main() -> Result<()> {
    env_logger::init();

    let (cols, rows) = crossterm::terminal::size()?;
    let camera = Frame::new(Vec3::new(0.0, 19.0, -20.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0));
    let scene = Scene::with_config(
        cols as u32,
        rows as u32 * 2,
        SceneConfig::default().with_camera(camera),
        Box::new(SystemClock),
    );
    let mut app = TerminalApp::with_size(scene, cols, rows).with_title("K3D Needles");
    let scene = app.scene_mut();

    let params = NeedleParams {
        width: 1.0,
        height: 20.0,
        depth: 1.0,
        inner_width: 0.8,
        inner_height: 1.6,
        margin_top: 0.2,
    };
    let needles: Vec<ObjectId> = (0..NEEDLES)
        .map(|i| {
            let mut needle = shapes::needle(params);
            needle.set_color(Vec3::new(0.8, 0.8, 0.85));
            let x = if i % 2 == 0 { 0.0 } else { 0.6 };
            needle.move_to(&Vec3::new(x, params.height, SPACING * (i as f64 + 1.0)));
            scene.add(needle)
        })
        .collect();

    let mut player = shapes::cube();
    player.scale(&Vec3::new(0.1, 0.1, 0.1));
    player.set_color(Vec3::new(1.0, 0.4, 0.1));
    player.move_to(&Vec3::new(0.0, 19.0, 0.0));
    player.set_animation(
        &AnimationPattern::new()
            .then(Action::MoveForward(SPACING * (NEEDLES as f64 + 1.0)), 30_000.0),
    );
    let player = scene.add(player);
    scene
        .camera_mut()
        .track(player, Tracking::elastic(0.05, 6.0, 0.9));

    let score = Rc::new(RefCell::new(Score::default()));
    let tally = score.clone();
    scene.set_on_frame(move |scene| {
        let Some(position) = scene.get(player).map(|p| p.center()) else {
            return;
        };
        let mut score = tally.borrow_mut();
        for &id in &needles {
            let Some(probe) = scene.get(id).and_then(|n| n.probe(&position)) else {
                continue;
            };
            let was_inside = score.inside.contains(&id);
            if probe.inside_outer && !was_inside {
                score.inside.push(id);
                if probe.is_hit() {
                    log::info!("hit needle {}", id.raw());
                    score.hits += 1;
                } else {
                    score.passes += 1;
                }
            } else if !probe.inside_outer && was_inside {
                score.inside.retain(|n| *n != id);
            }
        }
    });

    let board = score.clone();
    scene.set_extra_draw(move |_, surface| {
        let score = board.borrow();
        let text = format!("passed {}  hit {}", score.passes, score.hits);
        surface.fill_text(&text, 1.0, 0.0, Rgba::opaque(120, 255, 120));
    });

    app.set_key_handler(move |scene, code| {
        let Some(cube) = scene.get_mut(player) else {
            return;
        };
        match code {
            KeyCode::Up => cube.move_up(STEER),
            KeyCode::Down => cube.move_up(-STEER),
            KeyCode::Left => cube.move_left(STEER),
            KeyCode::Right => cube.move_left(-STEER),
            _ => {}
        }
    });

    app.run()?;

    let score = score.borrow();
    println!("Passed {} of {} needles, {} hits", score.passes, NEEDLES, score.hits);
    Ok(())
}
