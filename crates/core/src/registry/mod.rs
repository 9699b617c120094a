use std::sync::Arc;

use crate::{CanvasGeometry, Entropy, FeatureEvent, Particle, VisualiserConfig};

/// Immutable, insertion-ordered view of the live particles.
pub type Snapshot = Arc<[Particle]>;

/// Bookkeeping returned by [`ParticleRegistry::apply_event`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub spawned: bool,
    pub evicted: usize,
    pub culled: usize,
}

/// Bounded, insertion-ordered collection of live particles.
#[derive(Debug)]
pub struct ParticleRegistry {
    particles: Vec<Particle>,
    snapshot: Snapshot,
    next_id: u64,
}

impl Default for ParticleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleRegistry {
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
            snapshot: Arc::from(Vec::new()),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Creates a fresh particle inside `geometry` without registering it.
    pub fn spawn(&mut self, geometry: CanvasGeometry, entropy: &mut impl Entropy) -> Particle {
        let id = self.next_id;
        self.next_id += 1;
        Particle::random(id, geometry.width, geometry.height, entropy)
    }

    /// Folds one feature event into the registry.
    ///
    /// Order is spawn, capacity eviction, physics update, lifespan cull. The
    /// published snapshot only changes once all four steps are done.
    pub fn apply_event(
        &mut self,
        event: &FeatureEvent,
        config: &VisualiserConfig,
        geometry: CanvasGeometry,
        entropy: &mut impl Entropy,
    ) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        if event.is_drum_kick {
            let particle = self.spawn(geometry, entropy);
            self.particles.push(particle);
            outcome.spawned = true;

            if self.particles.len() > config.max_shapes {
                let overflow = self.particles.len() - config.max_shapes;
                self.particles.drain(..overflow);
                outcome.evicted = overflow;
            }
        }

        let before = self.particles.len();
        self.particles = self
            .particles
            .iter()
            .map(|particle| particle.evolve(event.rhythm_factor, config))
            .filter(Particle::is_alive)
            .collect();
        outcome.culled = before - self.particles.len();

        self.publish();
        tracing::trace!(
            live = self.particles.len(),
            spawned = outcome.spawned,
            evicted = outcome.evicted,
            culled = outcome.culled,
            "applied feature event"
        );
        outcome
    }

    pub fn reset(&mut self) {
        self.particles.clear();
        self.publish();
    }

    /// Cheap handle to the current contents; later events never alter it.
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.snapshot)
    }

    fn publish(&mut self) {
        self.snapshot = Arc::from(self.particles.as_slice());
    }
}
