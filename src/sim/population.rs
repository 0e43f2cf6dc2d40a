use tracing::debug;

use crate::config::{CLICK_BURST, Config};

use super::derived::Viewport;
use super::particle::Particle;

/// `clamp(floor(area * density), min, max)`, written so that a `min > max` or a
/// negative/NaN density degrades instead of panicking.
pub fn target_population(config: &Config, viewport: Viewport) -> usize {
    let by_area = (viewport.area() * config.particle_density as f64).floor();
    // saturating cast: negative and NaN land on 0
    let by_area = by_area as usize;
    by_area.max(config.min_particles).min(config.max_particles)
}

/// Decides when particles may be added and trims the oldest ones when the cap drops.
#[derive(Debug, Default, Clone, Copy)]
pub struct PopulationController {
    spawned: u64,
    trimmed: u64,
}

impl PopulationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Throttled automatic spawn: once every `spawn_interval` frames while under the cap.
    /// An interval of 0 turns automatic spawning off.
    pub fn should_spawn(&self, frame: u64, spawn_interval: u32, live: usize, cap: usize) -> bool {
        spawn_interval != 0 && frame % u64::from(spawn_interval) == 0 && live < cap
    }

    /// Ceiling for externally requested bursts; lets a click overshoot the cap by one burst.
    pub fn burst_ceiling(&self, cap: usize) -> usize {
        cap.saturating_add(CLICK_BURST)
    }

    /// Claim one spawn slot if `live` is under `limit`.
    pub fn admit(&mut self, live: usize, limit: usize) -> bool {
        if live >= limit {
            return false;
        }
        self.spawned += 1;
        true
    }

    /// Remove the oldest-spawned particles until at most `cap` remain. Returns how many went.
    pub fn trim_to(&mut self, particles: &mut Vec<Particle>, cap: usize) -> usize {
        let excess = particles.len().saturating_sub(cap);
        if excess > 0 {
            particles.drain(..excess);
            self.trimmed += excess as u64;
            debug!(excess, cap, "trimmed oldest particles");
        }
        excess
    }

    pub fn spawned_total(&self) -> u64 {
        self.spawned
    }

    pub fn trimmed_total(&self) -> u64 {
        self.trimmed
    }
}
