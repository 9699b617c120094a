use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CanvasGeometry, Result, RetryPolicy, Theme, VisualiserError};

/// Default address of the feature-producing backend.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8766";

pub const RHYTHM_FACTOR_RANGE: (f32, f32) = (0.005, 0.2);
pub const DECAY_RATE_RANGE: (f32, f32) = (0.9, 0.999);
pub const MAX_SHAPES_RANGE: (usize, usize) = (10, 200);

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: String,
    pub retry: RetryPolicy,
    pub visuals: VisualiserConfig,
    pub canvas: CanvasGeometry,
    pub frame_rate: u32,
    pub theme: Theme,
    /// Seed for particle placement. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            retry: RetryPolicy::default(),
            visuals: VisualiserConfig::default(),
            canvas: CanvasGeometry::default(),
            frame_rate: 60,
            theme: Theme::Dark,
            seed: None,
        }
    }
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(VisualiserError::InvalidConfig(
                "endpoint must not be empty".to_string(),
            ));
        }
        if self.frame_rate == 0 {
            return Err(VisualiserError::InvalidConfig(
                "frame rate must be at least 1".to_string(),
            ));
        }
        let CanvasGeometry { width, height } = self.canvas;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(VisualiserError::InvalidConfig(format!(
                "canvas must be positive, got {width}x{height}"
            )));
        }
        if self.retry.max_failures == 0 {
            return Err(VisualiserError::InvalidConfig(
                "retry policy must allow at least one failure".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tunables exposed to the user while the animation runs.
///
/// The runtime reads the latest value on every feature event, so changes
/// apply to the very next update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualiserConfig {
    /// How strongly an event's rhythm intensity inflates particle radii.
    pub rhythm_factor: f32,
    /// Multiplier applied to each particle's lifespan per event.
    pub decay_rate: f32,
    /// Capacity of the particle registry.
    pub max_shapes: usize,
}

impl Default for VisualiserConfig {
    fn default() -> Self {
        Self {
            rhythm_factor: 0.05,
            decay_rate: 0.98,
            max_shapes: 50,
        }
    }
}

impl VisualiserConfig {
    /// Returns a copy with every field pulled into its slider range.
    /// Non-finite values fall back to the defaults.
    pub fn clamped(self) -> Self {
        let defaults = Self::default();
        Self {
            rhythm_factor: clamp_finite(
                self.rhythm_factor,
                RHYTHM_FACTOR_RANGE,
                defaults.rhythm_factor,
            ),
            decay_rate: clamp_finite(self.decay_rate, DECAY_RATE_RANGE, defaults.decay_rate),
            max_shapes: self.max_shapes.clamp(MAX_SHAPES_RANGE.0, MAX_SHAPES_RANGE.1),
        }
    }

    /// Non-finite values are ignored.
    pub fn set_rhythm_factor(&mut self, value: f32) {
        self.rhythm_factor = clamp_finite(value, RHYTHM_FACTOR_RANGE, self.rhythm_factor);
    }

    /// Non-finite values are ignored.
    pub fn set_decay_rate(&mut self, value: f32) {
        self.decay_rate = clamp_finite(value, DECAY_RATE_RANGE, self.decay_rate);
    }

    pub fn set_max_shapes(&mut self, value: usize) {
        self.max_shapes = value.clamp(MAX_SHAPES_RANGE.0, MAX_SHAPES_RANGE.1);
    }
}

/// Clamps into `min..=max`; non-finite input yields `fallback`.
fn clamp_finite(value: f32, (min, max): (f32, f32), fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        tracing::warn!(value, fallback, "ignoring non-finite setting");
        fallback
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn setters_clamp_into_slider_ranges() {
        let mut config = VisualiserConfig::default();
        config.set_rhythm_factor(5.0);
        config.set_decay_rate(0.1);
        config.set_max_shapes(1_000);

        assert_eq!(config.rhythm_factor, 0.2);
        assert_eq!(config.decay_rate, 0.9);
        assert_eq!(config.max_shapes, 200);
    }

    #[test]
    fn setters_ignore_non_finite_values() {
        let mut config = VisualiserConfig::default();
        config.set_rhythm_factor(0.1);
        config.set_decay_rate(0.95);

        config.set_rhythm_factor(f32::NAN);
        config.set_decay_rate(f32::NAN);
        assert_eq!(config.rhythm_factor, 0.1);
        assert_eq!(config.decay_rate, 0.95);

        config.set_rhythm_factor(f32::INFINITY);
        config.set_decay_rate(f32::NEG_INFINITY);
        assert_eq!(config.rhythm_factor, 0.1);
        assert_eq!(config.decay_rate, 0.95);
    }

    #[test]
    fn clamped_replaces_non_finite_values_with_defaults() {
        let config = VisualiserConfig {
            rhythm_factor: f32::NAN,
            decay_rate: f32::INFINITY,
            max_shapes: 20,
        }
        .clamped();

        assert_eq!(config.rhythm_factor, 0.05);
        assert_eq!(config.decay_rate, 0.98);
        assert_eq!(config.max_shapes, 20);
    }

    #[test]
    fn clamped_leaves_in_range_values_alone() {
        let config = VisualiserConfig::default();
        assert_eq!(config.clamped(), config);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let raw = r#"{
            "endpoint": "ws://127.0.0.1:9000",
            "retry": { "max_failures": 3, "delay_ms": 250 },
            "visuals": { "decay_rate": 0.95 }
        }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(config.endpoint, "ws://127.0.0.1:9000");
        assert_eq!(config.retry.max_failures, 3);
        assert_eq!(config.retry.delay, Duration::from_millis(250));
        assert_eq!(config.visuals.decay_rate, 0.95);
        assert_eq!(config.visuals.max_shapes, 50);
        assert_eq!(config.frame_rate, 60);
        assert_eq!(config.theme, Theme::Dark);
    }

    #[test]
    fn rejects_empty_endpoint() {
        let config = AppConfig {
            endpoint: "  ".to_string(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("endpoint"));
    }

    #[test]
    fn rejects_degenerate_canvas() {
        for canvas in [
            CanvasGeometry::new(-5.0, 10.0),
            CanvasGeometry::new(800.0, 0.0),
            CanvasGeometry::new(f32::NAN, 600.0),
        ] {
            let config = AppConfig {
                canvas,
                ..AppConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(format!("{err}").contains("canvas"));
        }
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AppConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, VisualiserError::Io(_)));
    }
}
