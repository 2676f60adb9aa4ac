//! Presentation state and the tiny-skia grid renderer.

use anyhow::{anyhow, Result};
use tiny_skia::{Color, Paint, Pixmap, Rect, Transform};

use tonespan_core::GRID_SIZE;
use tonespan_session::SessionView;

/// Grid slot the ready prompt occupies (center of the 3×3 layout).
pub const READY_CELL: usize = 4;

const CELL_PADDING: f32 = 2.0;

/// What the session wants on screen. Mutated only through [`SessionView`]
/// calls; read by the renderer once per redraw.
#[derive(Debug, Default)]
pub struct GridView {
    pub highlighted: [bool; GRID_SIZE],
    pub buttons_visible: bool,
    pub label: String,
    pub closing: bool,
    /// Set on every view change; the shell clears it after redrawing.
    pub dirty: bool,
}

impl SessionView for GridView {
    fn stimulus_effect(&mut self, index: usize) {
        self.highlighted[index] = true;
        self.dirty = true;
    }

    fn stimulus_clear(&mut self, index: usize) {
        self.highlighted[index] = false;
        self.dirty = true;
    }

    fn set_label(&mut self, text: &str) {
        self.label = text.to_string();
        self.dirty = true;
    }

    fn show_buttons(&mut self) {
        self.buttons_visible = true;
        self.dirty = true;
    }

    fn hide_buttons(&mut self) {
        self.buttons_visible = false;
        self.dirty = true;
    }

    fn show_closing(&mut self) {
        self.closing = true;
        self.buttons_visible = false;
        self.dirty = true;
    }
}

fn button_blue() -> Color {
    Color::from_rgba8(0, 0, 255, 255)
}

fn effect_orange() -> Color {
    Color::from_rgba8(255, 165, 0, 255)
}

fn ready_grey() -> Color {
    Color::from_rgba8(216, 216, 216, 255)
}

/// Draws the view into an RGBA frame. The grid always occupies the largest
/// centered square of the surface, matching the original layout.
pub struct GridRenderer {
    width: u32,
    height: u32,
    canvas: Pixmap,
}

impl GridRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let canvas = Pixmap::new(width, height).ok_or_else(|| anyhow!("zero-sized surface"))?;
        Ok(Self {
            width,
            height,
            canvas,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.canvas = Pixmap::new(width, height).ok_or_else(|| anyhow!("zero-sized surface"))?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Centered square the grid lives in: (origin x, origin y, side).
    fn square(&self) -> (f32, f32, f32) {
        let side = self.width.min(self.height) as f32;
        let x = (self.width as f32 - side) / 2.0;
        let y = (self.height as f32 - side) / 2.0;
        (x, y, side)
    }

    fn cell_rect(&self, index: usize) -> Option<Rect> {
        let (x0, y0, side) = self.square();
        let cell = side / 3.0;
        let col = (index % 3) as f32;
        let row = (index / 3) as f32;
        Rect::from_xywh(
            x0 + col * cell + CELL_PADDING,
            y0 + row * cell + CELL_PADDING,
            cell - 2.0 * CELL_PADDING,
            cell - 2.0 * CELL_PADDING,
        )
    }

    /// Grid slot under a surface position, if any.
    pub fn cell_at(&self, x: f32, y: f32) -> Option<usize> {
        let (x0, y0, side) = self.square();
        if side <= 0.0 || x < x0 || y < y0 || x >= x0 + side || y >= y0 + side {
            return None;
        }
        let cell = side / 3.0;
        let col = ((x - x0) / cell) as usize;
        let row = ((y - y0) / cell) as usize;
        Some(row.min(2) * 3 + col.min(2))
    }

    pub fn render(&mut self, view: &GridView, frame: &mut [u8]) -> Result<()> {
        self.canvas.fill(Color::BLACK);

        if view.closing {
            // Blank closing screen; the thank-you text lives in the title bar.
        } else if view.buttons_visible {
            let mut paint = Paint::default();
            for index in 0..GRID_SIZE {
                let color = if view.highlighted[index] {
                    effect_orange()
                } else {
                    button_blue()
                };
                paint.set_color(color);
                if let Some(rect) = self.cell_rect(index) {
                    self.canvas
                        .fill_rect(rect, &paint, Transform::identity(), None);
                }
            }
        } else {
            let mut paint = Paint::default();
            paint.set_color(ready_grey());
            if let Some(rect) = self.cell_rect(READY_CELL) {
                self.canvas
                    .fill_rect(rect, &paint, Transform::identity(), None);
            }
        }

        // Surface and buffer resizes arrive as separate events; skip the frame
        // if they are momentarily out of step.
        if frame.len() == self.canvas.data().len() {
            frame.copy_from_slice(self.canvas.data());
        }
        Ok(())
    }
}
