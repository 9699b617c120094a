//! Frame production, decoupled from how often feature events arrive.

pub mod canvas;
pub mod svg;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::{Particle, Result};

pub use canvas::{Canvas, FrameRecorder, Rgba, StrokeCommand};
pub use svg::SvgCanvas;

pub const STROKE_WIDTH: f32 = 5.0;

/// Bounds used when spawning new particles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasGeometry {
    pub width: f32,
    pub height: f32,
}

impl CanvasGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for CanvasGeometry {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn background(self) -> Rgba {
        match self {
            Theme::Dark => Rgba::opaque(17, 24, 39),
            Theme::Light => Rgba::opaque(243, 244, 246),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// Drives the draw loop and tracks the canvas bounds.
///
/// Pausing only stops frame production; particles keep evolving elsewhere.
#[derive(Debug)]
pub struct RenderScheduler {
    playing: bool,
    frame_period: Duration,
    ticker: Option<Interval>,
    geometry: CanvasGeometry,
    theme: Theme,
    frames_drawn: u64,
}

impl RenderScheduler {
    pub fn new(frame_rate: u32, geometry: CanvasGeometry, theme: Theme) -> Self {
        Self {
            playing: true,
            frame_period: Duration::from_secs_f64(1.0 / f64::from(frame_rate.max(1))),
            ticker: None,
            geometry,
            theme,
            frames_drawn: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        if !self.playing {
            tracing::debug!("rendering resumed");
        }
        self.playing = true;
    }

    /// Cancels the pending frame request. Particle state is left untouched.
    pub fn pause(&mut self) {
        if self.playing {
            tracing::debug!("rendering paused");
        }
        self.playing = false;
        self.ticker = None;
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn geometry(&self) -> CanvasGeometry {
        self.geometry
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Re-reads the live surface size. Only future spawns see the new bounds.
    pub fn on_resize(&mut self, canvas: &impl Canvas) -> CanvasGeometry {
        self.geometry = canvas.size();
        tracing::debug!(
            width = self.geometry.width,
            height = self.geometry.height,
            "canvas resized"
        );
        self.geometry
    }

    /// Waits for the next frame slot. Never resolves while paused.
    pub async fn next_frame(&mut self) {
        if !self.playing {
            return std::future::pending().await;
        }
        let period = self.frame_period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });
        ticker.tick().await;
    }

    /// Paints one frame of `particles`.
    pub fn draw_frame(&mut self, particles: &[Particle], canvas: &mut impl Canvas) -> Result<()> {
        canvas.clear(self.theme.background());
        for particle in particles {
            let color = Rgba::from_rgb(particle.color.rgb(), particle.alpha());
            canvas.stroke_polygon(&particle.vertices(), color, STROKE_WIDTH);
        }
        canvas.present()?;
        self.frames_drawn += 1;
        tracing::trace!(
            frame = self.frames_drawn,
            particles = particles.len(),
            "frame drawn"
        );
        Ok(())
    }
}
