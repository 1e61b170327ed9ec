/// hwraster command-line tooling: exporters, matrix and trace tools, and an
/// interactive terminal viewer driven by the software rasterizer
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

use hwraster_core::{
    AtlasProvider, Camera, Mesh, PipelineConfig, Renderer, RotationState, TextureAtlas, Transform,
};

pub mod args;
pub mod commands;
pub mod renderer;

pub use renderer::HalfBlockRenderer;

const STEP: f64 = 0.1;

/// Interactive viewer: renders the mesh every frame and rotates it from
/// keyboard input
pub struct TerminalApp {
    mesh: Mesh,
    atlas: TextureAtlas,
    provider: Box<dyn AtlasProvider>,
    config: PipelineConfig,
    rotation: RotationState,
    spin: bool,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
    culled: usize,
}

impl TerminalApp {
    pub fn new(
        mesh: Mesh,
        atlas: TextureAtlas,
        provider: Box<dyn AtlasProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            mesh,
            atlas,
            provider,
            config,
            rotation: RotationState::new(0.3, 0.3, 0.0),
            spin: true,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
            culled: 0,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30);

        while self.running {
            let frame_start = Instant::now();

            if event::poll(Duration::from_millis(0))? {
                self.handle_input()?;
            }
            if self.spin {
                self.rotation.rotate(0.01, 0.015, 0.0);
            }
            self.render()?;

            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_input(&mut self) -> io::Result<()> {
        if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
            if kind == KeyEventKind::Release {
                return Ok(());
            }
            self.apply_key(code);
        }
        Ok(())
    }

    fn apply_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char('w') | KeyCode::Up => self.rotation.rotate(STEP, 0.0, 0.0),
            KeyCode::Char('s') | KeyCode::Down => self.rotation.rotate(-STEP, 0.0, 0.0),
            KeyCode::Char('a') | KeyCode::Left => self.rotation.rotate(0.0, -STEP, 0.0),
            KeyCode::Char('d') | KeyCode::Right => self.rotation.rotate(0.0, STEP, 0.0),
            KeyCode::Char('e') => self.rotation.rotate(0.0, 0.0, STEP),
            KeyCode::Char('r') => self.rotation.rotate(0.0, 0.0, -STEP),
            KeyCode::Char(' ') => self.spin = !self.spin,
            _ => {}
        }
    }

    fn render(&mut self) -> io::Result<()> {
        let (columns, rows) = terminal::size()?;
        // top row is the status line
        let cells = HalfBlockRenderer::new(columns, rows.saturating_sub(1));
        let (width, height) = cells.canvas_size();

        let renderer = Renderer::new(PipelineConfig {
            width,
            height,
            ..self.config
        });
        let camera = Camera::new(width, height);
        let mvp = camera.mvp(&Transform::rotation_matrix(&self.rotation));
        let provider = &self.provider;
        let frame = renderer
            .render(&self.mesh, &mvp, &self.atlas, |m, uv| provider.map_uv(m, uv))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.culled = frame.stats.culled;

        let mut stdout = stdout();
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "hwraster | FPS: {:.1} | culled {:>3} | WASD/Arrows=Rotate E/R=Roll Space=Spin Q=Quit",
                self.fps, self.culled
            )),
            ResetColor,
            terminal::Clear(terminal::ClearType::UntilNewLine),
            cursor::MoveTo(0, 1),
        )?;
        cells.draw(&mut stdout, &frame.canvas)?;

        stdout.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwraster_core::Passthrough;

    fn app() -> TerminalApp {
        let atlas = TextureAtlas::solid([255, 0, 0]);
        TerminalApp::new(
            Mesh::test_triangle(),
            atlas.clone(),
            Box::new(Passthrough::new(atlas.to_image())),
            PipelineConfig::default(),
        )
    }

    #[test]
    fn test_keys_rotate_and_quit() {
        let mut app = app();
        app.apply_key(KeyCode::Char('w'));
        app.apply_key(KeyCode::Left);
        app.apply_key(KeyCode::Char('e'));
        assert!((app.rotation.x - 0.4).abs() < 1e-12);
        assert!((app.rotation.y - 0.2).abs() < 1e-12);
        assert!((app.rotation.z - 0.1).abs() < 1e-12);

        app.apply_key(KeyCode::Char(' '));
        assert!(!app.spin);
        app.apply_key(KeyCode::Esc);
        assert!(!app.running);
    }
}
