use std::{fmt::Write as _, path::Path};

use crate::{render::canvas::Rgba, Canvas, CanvasGeometry, Point, Result};

/// Canvas that renders every frame into a standalone SVG document.
#[derive(Debug, Clone)]
pub struct SvgCanvas {
    geometry: CanvasGeometry,
    body: String,
    document: Option<String>,
}

impl SvgCanvas {
    pub fn new(geometry: CanvasGeometry) -> Self {
        Self {
            geometry,
            body: String::new(),
            document: None,
        }
    }

    /// The most recently presented frame, if any.
    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let document = self
            .document
            .as_deref()
            .ok_or_else(|| crate::VisualiserError::msg("no frame has been rendered yet"))?;
        std::fs::write(path, document)?;
        Ok(())
    }
}

impl Canvas for SvgCanvas {
    fn size(&self) -> CanvasGeometry {
        self.geometry
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.geometry = CanvasGeometry::new(width, height);
    }

    fn clear(&mut self, background: Rgba) {
        self.body.clear();
        let _ = writeln!(
            self.body,
            r#"  <rect width="100%" height="100%" fill="rgb({},{},{})"/>"#,
            background.r, background.g, background.b
        );
    }

    fn stroke_polygon(&mut self, points: &[Point], color: Rgba, line_width: f32) {
        let mut coords = String::new();
        for (index, point) in points.iter().enumerate() {
            if index > 0 {
                coords.push(' ');
            }
            let _ = write!(coords, "{:.2},{:.2}", point.x, point.y);
        }
        let _ = writeln!(
            self.body,
            r#"  <polygon points="{coords}" fill="none" stroke="rgb({},{},{})" stroke-opacity="{:.3}" stroke-width="{line_width}"/>"#,
            color.r, color.g, color.b, color.a
        );
    }

    fn present(&mut self) -> Result<()> {
        let CanvasGeometry { width, height } = self.geometry;
        self.document = Some(format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n{}</svg>\n",
            self.body
        ));
        Ok(())
    }
}
