use crate::{CanvasGeometry, Point, Result};

/// Straight (non-premultiplied) colour with a unit-range alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn from_rgb(rgb: [u8; 3], alpha: f32) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: alpha,
        }
    }
}

/// Drawing surface the render scheduler paints onto.
pub trait Canvas {
    /// Live dimensions of the surface.
    fn size(&self) -> CanvasGeometry;
    fn resize(&mut self, width: f32, height: f32);
    fn clear(&mut self, background: Rgba);
    /// Strokes the closed outline through `points`.
    fn stroke_polygon(&mut self, points: &[Point], color: Rgba, line_width: f32);
    /// Marks the end of a frame.
    fn present(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeCommand {
    pub points: Vec<Point>,
    pub color: Rgba,
    pub line_width: f32,
}

/// Headless canvas that keeps the draw calls of the last presented frame.
#[derive(Debug, Clone)]
pub struct FrameRecorder {
    geometry: CanvasGeometry,
    background: Option<Rgba>,
    pending: Vec<StrokeCommand>,
    last_frame: Vec<StrokeCommand>,
    frames_presented: u64,
}

impl FrameRecorder {
    pub fn new(geometry: CanvasGeometry) -> Self {
        Self {
            geometry,
            background: None,
            pending: Vec::new(),
            last_frame: Vec::new(),
            frames_presented: 0,
        }
    }

    pub fn last_frame(&self) -> &[StrokeCommand] {
        &self.last_frame
    }

    pub fn background(&self) -> Option<Rgba> {
        self.background
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl Canvas for FrameRecorder {
    fn size(&self) -> CanvasGeometry {
        self.geometry
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.geometry = CanvasGeometry::new(width, height);
    }

    fn clear(&mut self, background: Rgba) {
        self.background = Some(background);
        self.pending.clear();
    }

    fn stroke_polygon(&mut self, points: &[Point], color: Rgba, line_width: f32) {
        self.pending.push(StrokeCommand {
            points: points.to_vec(),
            color,
            line_width,
        });
    }

    fn present(&mut self) -> Result<()> {
        self.last_frame = std::mem::take(&mut self.pending);
        self.frames_presented += 1;
        Ok(())
    }
}
