use std::f32::consts::TAU;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::VisualiserConfig;

pub const INITIAL_RADIUS: f32 = 30.0;
pub const INITIAL_LIFESPAN: f32 = 255.0;
/// Particles whose lifespan drops to this value or below are culled.
pub const LIFESPAN_FLOOR: f32 = 1.0;
pub const MIN_VERTICES: u8 = 3;
pub const MAX_VERTICES: u8 = 10;

/// Neon palette that particles draw their stroke colour from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeonColor {
    Magenta,
    Cyan,
    Yellow,
    Green,
    Blue,
    HotPink,
    Orange,
}

impl NeonColor {
    pub const PALETTE: [NeonColor; 7] = [
        NeonColor::Magenta,
        NeonColor::Cyan,
        NeonColor::Yellow,
        NeonColor::Green,
        NeonColor::Blue,
        NeonColor::HotPink,
        NeonColor::Orange,
    ];

    pub fn rgb(self) -> [u8; 3] {
        match self {
            NeonColor::Magenta => [255, 0, 255],
            NeonColor::Cyan => [0, 255, 255],
            NeonColor::Yellow => [255, 255, 0],
            NeonColor::Green => [57, 255, 20],
            NeonColor::Blue => [0, 191, 255],
            NeonColor::HotPink => [255, 105, 180],
            NeonColor::Orange => [255, 140, 0],
        }
    }
}

/// Source of randomness for particle creation.
///
/// Production code wraps a seedable RNG in [`RngEntropy`]; tests can script
/// exact values to pin spawn positions and palette picks.
pub trait Entropy {
    /// Uniform sample in `[0, 1)`.
    fn unit(&mut self) -> f32;
    /// Uniform index in `[0, len)`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// [`Entropy`] backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngEntropy<R = StdRng> {
    rng: R,
}

impl RngEntropy<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_os() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> RngEntropy<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Entropy for RngEntropy<R> {
    fn unit(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// A single polygon vertex in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Transient polygon spawned by a drum kick.
///
/// `vertex_count` and `color` never change after creation; `radius` and
/// `lifespan` evolve with every feature event.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Spawn sequence number, unique within a registry.
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub vertex_count: u8,
    pub color: NeonColor,
    pub lifespan: f32,
}

impl Particle {
    /// Creates a particle at a random spot inside `width x height`.
    pub fn random(id: u64, width: f32, height: f32, entropy: &mut impl Entropy) -> Self {
        let x = entropy.unit() * width;
        let y = entropy.unit() * height;
        let span = usize::from(MAX_VERTICES - MIN_VERTICES) + 1;
        let vertex_count = MIN_VERTICES + entropy.pick(span).min(span - 1) as u8;
        let palette = NeonColor::PALETTE;
        let color = palette[entropy.pick(palette.len()).min(palette.len() - 1)];

        Self {
            id,
            x,
            y,
            radius: INITIAL_RADIUS,
            vertex_count,
            color,
            lifespan: INITIAL_LIFESPAN,
        }
    }

    /// Applies one feature event's physics and returns the updated particle.
    pub fn evolve(&self, rhythm_intensity: f32, config: &VisualiserConfig) -> Self {
        Self {
            radius: self.radius + rhythm_intensity * config.rhythm_factor * self.radius - 1.0,
            lifespan: self.lifespan * config.decay_rate,
            ..self.clone()
        }
    }

    pub fn is_alive(&self) -> bool {
        self.lifespan > LIFESPAN_FLOOR
    }

    /// Stroke opacity derived from the remaining lifespan.
    pub fn alpha(&self) -> f32 {
        (self.lifespan / INITIAL_LIFESPAN).clamp(f32::MIN_POSITIVE, 1.0)
    }

    /// Corners of the regular polygon centred on the particle.
    pub fn vertices(&self) -> Vec<Point> {
        let n = self.vertex_count.max(1);
        (0..n)
            .map(|i| {
                let angle = TAU * f32::from(i) / f32::from(n);
                Point {
                    x: self.x + self.radius * angle.cos(),
                    y: self.y + self.radius * angle.sin(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Replays fixed values so spawn results can be asserted exactly.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedEntropy {
        units: VecDeque<f32>,
        picks: VecDeque<usize>,
    }

    impl ScriptedEntropy {
        pub(crate) fn new(units: &[f32], picks: &[usize]) -> Self {
            Self {
                units: units.iter().copied().collect(),
                picks: picks.iter().copied().collect(),
            }
        }
    }

    impl Entropy for ScriptedEntropy {
        fn unit(&mut self) -> f32 {
            self.units.pop_front().unwrap_or(0.0)
        }

        fn pick(&mut self, _len: usize) -> usize {
            self.picks.pop_front().unwrap_or(0)
        }
    }

    #[test]
    fn random_particle_uses_entropy_in_order() {
        let mut entropy = ScriptedEntropy::new(&[0.25, 0.5], &[4, 2]);
        let particle = Particle::random(7, 800.0, 600.0, &mut entropy);

        assert_eq!(particle.id, 7);
        assert_eq!(particle.x, 200.0);
        assert_eq!(particle.y, 300.0);
        assert_eq!(particle.vertex_count, 7);
        assert_eq!(particle.color, NeonColor::Yellow);
        assert_eq!(particle.radius, INITIAL_RADIUS);
        assert_eq!(particle.lifespan, INITIAL_LIFESPAN);
    }

    #[test]
    fn seeded_entropy_stays_within_bounds() {
        let mut entropy = RngEntropy::seeded(42);
        for id in 0..500 {
            let particle = Particle::random(id, 320.0, 240.0, &mut entropy);
            assert!((0.0..320.0).contains(&particle.x));
            assert!((0.0..240.0).contains(&particle.y));
            assert!((MIN_VERTICES..=MAX_VERTICES).contains(&particle.vertex_count));
        }
    }

    #[test]
    fn evolve_matches_reference_growth() {
        let mut entropy = ScriptedEntropy::default();
        let particle = Particle::random(0, 100.0, 100.0, &mut entropy);
        let config = VisualiserConfig {
            rhythm_factor: 0.05,
            decay_rate: 0.98,
            max_shapes: 50,
        };

        let next = particle.evolve(1.0, &config);

        assert_eq!(next.radius, 30.5);
        assert_eq!(next.lifespan, 255.0 * 0.98);
        assert_eq!(next.vertex_count, particle.vertex_count);
        assert_eq!(next.color, particle.color);
    }

    #[test]
    fn alpha_tracks_lifespan() {
        let mut entropy = ScriptedEntropy::default();
        let mut particle = Particle::random(0, 10.0, 10.0, &mut entropy);
        assert_eq!(particle.alpha(), 1.0);

        particle.lifespan = 127.5;
        assert!((particle.alpha() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn vertices_form_regular_polygon() {
        let particle = Particle {
            id: 0,
            x: 10.0,
            y: 20.0,
            radius: 5.0,
            vertex_count: 4,
            color: NeonColor::Cyan,
            lifespan: INITIAL_LIFESPAN,
        };

        let points = particle.vertices();
        assert_eq!(points.len(), 4);
        assert!((points[0].x - 15.0).abs() < 1e-4);
        assert!((points[0].y - 20.0).abs() < 1e-4);
        assert!((points[1].x - 10.0).abs() < 1e-4);
        assert!((points[1].y - 25.0).abs() < 1e-4);
        for point in points {
            let distance = ((point.x - 10.0).powi(2) + (point.y - 20.0).powi(2)).sqrt();
            assert!((distance - 5.0).abs() < 1e-4);
        }
    }
}
