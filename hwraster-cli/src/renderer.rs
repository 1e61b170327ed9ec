/// True-colour terminal output for software-rendered frames
use crossterm::{
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use std::io::Write;

use hwraster_core::{Canvas, Rgb};

/// Upper half block: the foreground paints the top pixel, the background
/// the bottom one
const HALF_BLOCK: char = '\u{2580}';

fn color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb[0],
        g: rgb[1],
        b: rgb[2],
    }
}

/// Prints a canvas as terminal cells, two pixel rows per text row
pub struct HalfBlockRenderer {
    columns: u32,
    rows: u32,
}

impl HalfBlockRenderer {
    pub fn new(columns: u16, rows: u16) -> Self {
        Self {
            columns: columns.max(1) as u32,
            rows: rows.max(1) as u32,
        }
    }

    /// Pixel size of a canvas that fills the cell grid exactly
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.columns, self.rows * 2)
    }

    /// Nearest-neighbour scale of `canvas` onto the cell grid
    pub fn fit(&self, canvas: &Canvas) -> Canvas {
        let (w, h) = self.canvas_size();
        if (canvas.width(), canvas.height()) == (w, h) {
            return canvas.clone();
        }
        let mut out = Canvas::new(w, h, [0, 0, 0]);
        for y in 0..h {
            let sy = (y as u64 * canvas.height() as u64 / h as u64) as u32;
            for x in 0..w {
                let sx = (x as u64 * canvas.width() as u64 / w as u64) as u32;
                out.put(x, y, canvas.get(sx, sy));
            }
        }
        out
    }

    pub fn draw<W: Write>(&self, writer: &mut W, canvas: &Canvas) -> std::io::Result<()> {
        let canvas = self.fit(canvas);
        for row in 0..self.rows {
            for x in 0..self.columns {
                let top = canvas.get(x, row * 2);
                let bottom = canvas.get(x, row * 2 + 1);
                writer.queue(SetForegroundColor(color(top)))?;
                writer.queue(SetBackgroundColor(color(bottom)))?;
                writer.queue(Print(HALF_BLOCK))?;
            }
            writer.queue(ResetColor)?;
            if row + 1 < self.rows {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_downsamples() {
        let mut canvas = Canvas::new(4, 4, [0, 0, 0]);
        canvas.put(2, 2, [255, 0, 0]);
        let renderer = HalfBlockRenderer::new(2, 1);
        let small = renderer.fit(&canvas);
        assert_eq!((small.width(), small.height()), (2, 2));
        assert_eq!(small.get(1, 1), [255, 0, 0]);
        assert_eq!(small.get(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_draw_emits_one_cell_per_column() {
        let canvas = Canvas::new(3, 4, [1, 2, 3]);
        let renderer = HalfBlockRenderer::new(3, 2);
        let mut out = Vec::new();
        renderer.draw(&mut out, &canvas).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches(HALF_BLOCK).count(), 6);
        assert_eq!(text.matches("\r\n").count(), 1);
    }
}
