/// Terminal host for the K3D engine: half-block rendering through crossterm
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use k3d_core::Scene;
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::Framebuffer;

/// Frames per second the host paces itself to
const TARGET_FPS: u64 = 30;
/// Rows kept free at the top for the status line
const STATUS_ROWS: u16 = 1;

/// Speed of the free camera per key press
const MOVE_STEP: f64 = 0.5;
const TURN_STEP: f64 = 0.05;

type KeyHandler = Box<dyn FnMut(&mut Scene, KeyCode)>;

/// Owns a scene and drives it in the terminal until the user quits
pub struct TerminalApp {
    scene: Scene,
    framebuffer: Framebuffer,
    title: String,
    on_key: Option<KeyHandler>,
    running: bool,
}

impl TerminalApp {
    /// Wrap `scene`, sizing the framebuffer to the current terminal
    pub fn new(scene: Scene) -> io::Result<Self> {
        let (cols, rows) = terminal::size()?;
        Ok(Self::with_size(scene, cols, rows))
    }

    pub fn with_size(scene: Scene, cols: u16, rows: u16) -> Self {
        Self {
            scene,
            framebuffer: Framebuffer::new(cols, rows.saturating_sub(STATUS_ROWS)),
            title: "K3D".to_string(),
            on_key: None,
            running: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Texture registration goes through the framebuffer
    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    /// Keys other than Q/Esc are passed here
    pub fn set_key_handler(&mut self, handler: impl FnMut(&mut Scene, KeyCode) + 'static) {
        self.on_key = Some(Box::new(handler));
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ask the loop to exit after the current frame
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;
        log::info!("terminal host started");

        self.running = true;
        let result = self.main_loop();
        self.running = false;

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;
        log::info!("terminal host stopped");

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / TARGET_FPS);

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                let event = event::read()?;
                self.handle_event(event);
            }

            self.scene.tick(&mut self.framebuffer);
            self.render()?;

            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent { code, kind, .. }) if kind != KeyEventKind::Release => match code {
                KeyCode::Char('q') | KeyCode::Esc => self.stop(),
                code => {
                    if let Some(handler) = self.on_key.as_mut() {
                        handler(&mut self.scene, code);
                    }
                }
            },
            Event::Resize(cols, rows) => {
                self.framebuffer.resize(cols, rows.saturating_sub(STATUS_ROWS));
            }
            _ => {}
        }
    }

    fn render(&mut self) -> io::Result<()> {
        let mut stdout = stdout();

        self.framebuffer.draw(&mut stdout, STATUS_ROWS)?;

        // Draw status line
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::CurrentLine),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "{} | FPS: {:.0} | objects: {} | Q=Quit",
                self.title,
                self.scene.fps(),
                self.scene.len()
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// WASD moves, arrows turn, R/F rise and sink.
///
/// Keys are ignored while the camera is tracking an object.
pub fn free_camera_controls(scene: &mut Scene, code: KeyCode) {
    if scene.camera().tracking().is_some() {
        return;
    }
    let mut camera = scene.camera_mut();
    match code {
        KeyCode::Char('w') => camera.move_forward(MOVE_STEP),
        KeyCode::Char('s') => camera.move_forward(-MOVE_STEP),
        KeyCode::Char('a') => camera.move_left(MOVE_STEP),
        KeyCode::Char('d') => camera.move_left(-MOVE_STEP),
        KeyCode::Char('r') => camera.move_up(MOVE_STEP),
        KeyCode::Char('f') => camera.move_up(-MOVE_STEP),
        KeyCode::Left => camera.rotate_yaw(-TURN_STEP),
        KeyCode::Right => camera.rotate_yaw(TURN_STEP),
        KeyCode::Up => camera.rotate_pitch(-TURN_STEP),
        KeyCode::Down => camera.rotate_pitch(TURN_STEP),
        _ => {}
    }
}
