use std::sync::Arc;

use bevy::math::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace, warn};

use crate::config::{CLICK_BURST, Config, ConfigPatch, ConfigStore, MAX_STEP, TIME_UNITS_PER_MS};

use super::derived::{DerivedConstants, Viewport};
use super::frame::{ConnectionDraw, ParticleDraw, TickReport};
use super::interaction::{InteractionField, PairwiseField};
use super::particle::{Charge, Particle, StepContext};
use super::population::PopulationController;

/// Turns wall-clock timestamps into simulated time steps.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameClock {
    last_timestamp_ms: Option<f64>,
    elapsed: f64,
}

impl FrameClock {
    /// Step since the previous timestamp. The first call after a reset steps by zero;
    /// timestamps going backwards step by zero; long gaps are cut to `MAX_STEP`.
    pub fn advance(&mut self, timestamp_ms: f64) -> f32 {
        let dt = match self.last_timestamp_ms {
            Some(last) => ((timestamp_ms - last) * TIME_UNITS_PER_MS).max(0.0) as f32,
            None => 0.0,
        };
        let dt = dt.min(MAX_STEP);
        self.last_timestamp_ms = Some(timestamp_ms);
        self.elapsed += dt as f64;
        dt
    }

    /// Forget the last timestamp so a resumed run does not replay the pause.
    pub fn reset(&mut self) {
        self.last_timestamp_ms = None;
    }

    /// Total simulated time.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    /// Terminal: particles released, inputs ignored.
    Destroyed,
}

/// The whole simulation: particles, inputs, derived limits and the tick that ties them together.
#[derive(Debug)]
pub struct Simulation<F = PairwiseField> {
    config: ConfigStore,
    derived: DerivedConstants,
    viewport: Viewport,
    particles: Vec<Particle>,
    connections: Vec<ConnectionDraw>,
    population: PopulationController,
    field: F,
    cursor: Option<Vec2>,
    frame: u64,
    clock: FrameClock,
    state: RunState,
    rng: StdRng,
}

impl Simulation<PairwiseField> {
    pub fn new(config: Config, viewport: Viewport) -> Self {
        Self::with_field(config, viewport, PairwiseField, StdRng::from_os_rng())
    }

    /// Reproducible run; same seed and inputs give the same particles.
    pub fn seeded(config: Config, viewport: Viewport, seed: u64) -> Self {
        Self::with_field(config, viewport, PairwiseField, StdRng::seed_from_u64(seed))
    }
}

impl<F: InteractionField> Simulation<F> {
    pub fn with_field(config: Config, viewport: Viewport, field: F, rng: StdRng) -> Self {
        let derived = DerivedConstants::compute(&config, viewport);
        Self {
            config: ConfigStore::new(config),
            derived,
            viewport,
            particles: Vec::new(),
            connections: Vec::new(),
            population: PopulationController::new(),
            field,
            cursor: None,
            frame: 0,
            clock: FrameClock::default(),
            state: RunState::Stopped,
            rng,
        }
    }

    // --------------------- Control surface ---------------------

    pub fn start(&mut self) {
        match self.state {
            RunState::Stopped => {
                self.clock.reset();
                self.state = RunState::Running;
                info!(frame = self.frame, live = self.particles.len(), "simulation started");
            }
            RunState::Running => {}
            RunState::Destroyed => warn!("start ignored: simulation was destroyed"),
        }
    }

    /// Halt ticking; particles and time stay as they are.
    pub fn stop(&mut self) {
        if self.state == RunState::Running {
            self.state = RunState::Stopped;
            info!(frame = self.frame, "simulation stopped");
        }
    }

    /// Stop for good and release all particle state.
    pub fn destroy(&mut self) {
        if self.state == RunState::Destroyed {
            return;
        }
        self.state = RunState::Destroyed;
        self.particles = Vec::new();
        self.connections = Vec::new();
        self.cursor = None;
        info!(frame = self.frame, "simulation destroyed");
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Merge `patch` into the config, then refresh derived limits and trim to the new cap.
    pub fn update_config(&mut self, patch: &ConfigPatch) -> Arc<Config> {
        if self.state == RunState::Destroyed {
            warn!("config update ignored: simulation was destroyed");
            return Arc::clone(self.config.current());
        }
        let config = self.config.apply_update(patch);
        debug!(fields = patch.len(), "config updated");
        self.refresh_limits();
        config
    }

    // --------------------- Inputs ---------------------

    pub fn on_resize(&mut self, width: f32, height: f32) {
        if self.state == RunState::Destroyed {
            return;
        }
        self.viewport = Viewport::new(width, height);
        self.refresh_limits();
    }

    pub fn on_pointer_move(&mut self, x: f32, y: f32) {
        if self.state != RunState::Destroyed {
            self.cursor = Some(Vec2::new(x, y));
        }
    }

    pub fn on_pointer_leave(&mut self) {
        self.cursor = None;
    }

    /// Spawn a burst at `(x, y)`, ignoring the spawn interval but not the burst ceiling.
    /// Returns how many particles were added.
    pub fn request_spawn(&mut self, x: f32, y: f32) -> usize {
        let mut added = 0;
        for _ in 0..CLICK_BURST {
            if self.spawn_at(Vec2::new(x, y), None) {
                added += 1;
            }
        }
        added
    }

    /// Add one particle at an explicit position, optionally with a fixed charge.
    pub fn spawn_at(&mut self, position: Vec2, charge: Option<Charge>) -> bool {
        if self.state == RunState::Destroyed {
            return false;
        }
        let limit = self.population.burst_ceiling(self.derived.max_population);
        if !self.population.admit(self.particles.len(), limit) {
            return false;
        }
        let particle = Particle::spawn(position, charge, self.config.current(), &mut self.rng);
        self.particles.push(particle);
        true
    }

    // --------------------- Tick ---------------------

    /// Advance one frame. Returns `None` unless running.
    ///
    /// Particles update in spawn order against the live set, so earlier particles have
    /// already moved when later ones read them. Particles that die this tick still push
    /// and pull during it and are dropped afterwards.
    pub fn tick(&mut self, timestamp_ms: f64) -> Option<TickReport> {
        if self.state != RunState::Running {
            return None;
        }

        self.frame += 1;
        let dt = self.clock.advance(timestamp_ms);
        let config = Arc::clone(self.config.current());

        let mut spawned = 0;
        if self.population.should_spawn(
            self.frame,
            config.spawn_interval,
            self.particles.len(),
            self.derived.max_population,
        ) {
            let position = self.random_position();
            if self.population.admit(self.particles.len(), self.derived.max_population) {
                self.particles
                    .push(Particle::spawn(position, None, &config, &mut self.rng));
                spawned = 1;
            }
        }

        let ctx = StepContext {
            config: &config,
            derived: &self.derived,
            viewport: self.viewport,
            cursor: self.cursor,
            dt,
            frame: self.frame,
        };

        self.field.prepare(&self.particles, &ctx);
        for index in 0..self.particles.len() {
            let particle = &mut self.particles[index];
            particle.integrate(&ctx);
            particle.update_size(&ctx);
            particle.react_to_cursor(&ctx);

            let impulse = self.field.pair_impulse(index, &self.particles, &ctx);
            let particle = &mut self.particles[index];
            particle.velocity += impulse;
            particle.bounce_in_bounds(&ctx);
        }

        let before = self.particles.len();
        self.particles.retain(Particle::is_alive);
        let removed = before - self.particles.len();

        self.connections.clear();
        self.field
            .connections(&self.particles, &ctx, &mut self.connections);

        let report = TickReport {
            frame: self.frame,
            dt,
            spawned,
            removed,
            live: self.particles.len(),
            connections: self.connections.len(),
        };
        trace!(?report, "tick");
        Some(report)
    }

    fn random_position(&mut self) -> Vec2 {
        Vec2::new(
            self.rng.random::<f32>() * self.viewport.width,
            self.rng.random::<f32>() * self.viewport.height,
        )
    }

    fn refresh_limits(&mut self) {
        let previous = self.derived.max_population;
        self.derived = DerivedConstants::compute(self.config.current(), self.viewport);
        if previous != self.derived.max_population {
            debug!(
                from = previous,
                to = self.derived.max_population,
                "population cap changed"
            );
        }
        self.population
            .trim_to(&mut self.particles, self.derived.max_population);
    }

    // --------------------- Views ---------------------

    pub fn config(&self) -> &Arc<Config> {
        self.config.current()
    }

    pub fn derived(&self) -> &DerivedConstants {
        &self.derived
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn max_population(&self) -> usize {
        self.derived.max_population
    }

    pub fn cursor(&self) -> Option<Vec2> {
        self.cursor
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn simulated_time(&self) -> f64 {
        self.clock.elapsed()
    }

    /// Live particles in spawn order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle_draws(&self) -> impl Iterator<Item = ParticleDraw<'_>> {
        let config = self.config.current();
        self.particles
            .iter()
            .map(move |particle| ParticleDraw::new(particle, self.frame, config))
    }

    /// Connections found on the last tick.
    pub fn connections(&self) -> &[ConnectionDraw] {
        &self.connections
    }

    pub fn population(&self) -> &PopulationController {
        &self.population
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::Vec2;

    use super::{FrameClock, RunState, Simulation};
    use crate::config::{Config, ConfigPatch};
    use crate::sim::derived::Viewport;
    use crate::sim::particle::Charge;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    fn running(config: Config, width: f32, height: f32) -> Simulation {
        let mut sim = Simulation::seeded(config, Viewport::new(width, height), 42);
        sim.start();
        sim
    }

    fn run_frames(sim: &mut Simulation, frames: u64) {
        let start = sim.frame_count();
        for i in 0..frames {
            sim.tick((start + i) as f64 * FRAME_MS);
        }
    }

    #[test]
    fn clock_starts_at_zero_and_clamps() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.advance(1_000.0), 0.0);
        assert!((clock.advance(1_010.0) - 2.0).abs() < 1e-6);
        assert_eq!(clock.advance(1_005.0), 0.0);
        assert_eq!(clock.advance(60_000.0), 12.0);
        assert!((clock.elapsed() - 14.0).abs() < 1e-6);
        clock.reset();
        assert_eq!(clock.advance(90_000.0), 0.0);
        // a 10 fps frame is 20 units of wall clock but only advances by the cap
        assert_eq!(clock.advance(90_100.0), 12.0);
    }

    #[test]
    fn totals_track_spawns_trims_and_time() {
        let config = Config {
            shrink_rate: 0.0,
            particle_density: 0.001,
            ..Config::default()
        };
        let mut sim = running(config, 800.0, 600.0);
        run_frames(&mut sim, 11);
        assert_eq!(sim.population().spawned_total(), 11);
        // first tick after start is zero-length
        let expected = 10.0 * FRAME_MS * crate::config::TIME_UNITS_PER_MS;
        assert!((sim.simulated_time() - expected).abs() < 1e-3);

        sim.request_spawn(10.0, 10.0);
        sim.update_config(&ConfigPatch {
            particle_density: Some(0.0),
            ..Default::default()
        });
        assert_eq!(sim.population().spawned_total(), 16);
        assert_eq!(sim.population().trimmed_total(), 0);
        sim.on_resize(100.0, 100.0);
        assert_eq!(sim.particles().len(), 16);
        sim.update_config(&ConfigPatch {
            min_particles: Some(10),
            ..Default::default()
        });
        assert_eq!(sim.population().trimmed_total(), 6);
    }

    #[test]
    fn stopped_world_does_not_tick() {
        let mut sim = Simulation::seeded(Config::default(), Viewport::new(800.0, 600.0), 1);
        assert_eq!(sim.state(), RunState::Stopped);
        assert!(sim.tick(0.0).is_none());
        assert_eq!(sim.frame_count(), 0);
        sim.start();
        assert!(sim.tick(0.0).is_some());
        sim.stop();
        assert!(sim.tick(16.0).is_none());
        assert_eq!(sim.frame_count(), 1);
        assert_eq!(sim.particles().len(), 1);
    }

    #[test]
    fn max_population_follows_resize() {
        let mut sim = running(Config::default(), 800.0, 600.0);
        assert_eq!(sim.max_population(), 20);
        sim.on_resize(1920.0, 1080.0);
        // floor(2_073_600 * 0.00002) = 41
        assert_eq!(sim.max_population(), 41);
    }

    #[test]
    fn population_never_exceeds_cap_without_bursts() {
        let config = Config {
            shrink_rate: 0.0,
            ..Config::default()
        };
        let mut sim = running(config, 800.0, 600.0);
        for i in 0..200 {
            sim.tick(i as f64 * FRAME_MS);
            assert!(sim.particles().len() <= sim.max_population());
        }
        assert_eq!(sim.particles().len(), 20);
    }

    #[test]
    fn burst_overshoots_by_at_most_one_burst() {
        let config = Config {
            shrink_rate: 0.0,
            ..Config::default()
        };
        let mut sim = running(config, 800.0, 600.0);
        run_frames(&mut sim, 40);
        assert_eq!(sim.particles().len(), 20);
        assert_eq!(sim.request_spawn(10.0, 10.0), 5);
        assert_eq!(sim.request_spawn(10.0, 10.0), 0);
        assert_eq!(sim.particles().len(), 25);
        // no automatic spawn while above the cap
        run_frames(&mut sim, 5);
        assert_eq!(sim.particles().len(), 25);
    }

    #[test]
    fn shrinking_cap_trims_oldest() {
        let config = Config {
            shrink_rate: 0.0,
            particle_density: 0.001,
            ..Config::default()
        };
        let mut sim = running(config, 800.0, 600.0);
        assert_eq!(sim.max_population(), 480);
        run_frames(&mut sim, 30);
        assert_eq!(sim.particles().len(), 30);
        let survivors: Vec<Vec2> = sim.particles()[10..].iter().map(|p| p.position).collect();

        sim.update_config(&ConfigPatch {
            particle_density: Some(0.0),
            ..Default::default()
        });
        assert_eq!(sim.max_population(), 20);
        assert_eq!(sim.particles().len(), 20);
        let kept: Vec<Vec2> = sim.particles().iter().map(|p| p.position).collect();
        assert_eq!(kept, survivors);
    }

    #[test]
    fn density_change_is_seen_on_next_tick() {
        let mut sim = running(Config::default(), 1024.0, 1024.0);
        assert_eq!(sim.max_population(), 20);
        // 2^20 units of area at 2^-14 per unit
        sim.update_config(&ConfigPatch {
            particle_density: Some(1.0 / 16_384.0),
            ..Default::default()
        });
        assert_eq!(sim.max_population(), 64);
        run_frames(&mut sim, 1);
        assert_eq!(sim.max_population(), 64);
    }

    #[test]
    fn particles_die_and_never_come_back() {
        let config = Config {
            growth_rate: 10.0,
            shrink_rate: 10.0,
            spawn_interval: 1_000_000,
            ..Config::default()
        };
        let mut sim = running(config, 800.0, 600.0);
        sim.spawn_at(Vec2::new(100.0, 100.0), Some(Charge::Positive));
        sim.tick(0.0);
        assert_eq!(sim.particles().len(), 1);

        let mut removed = 0;
        for i in 1..20 {
            let report = sim.tick(i as f64 * FRAME_MS).expect("running");
            removed += report.removed;
            for p in sim.particles() {
                assert!(p.size.current > 0.0);
            }
        }
        assert_eq!(removed, 1);
        assert!(sim.particles().is_empty());
    }

    #[test]
    fn invariants_hold_over_a_long_run() {
        let mut sim = running(Config::default(), 640.0, 480.0);
        sim.on_pointer_move(320.0, 240.0);
        for i in 0..600 {
            sim.tick(i as f64 * FRAME_MS);
            if i % 50 == 0 {
                sim.request_spawn(320.0, 240.0);
            }
            for p in sim.particles() {
                assert!((0.0..=1.0).contains(&p.opacity));
                assert!(p.trail.len() <= sim.config().trail_max_length);
                assert!(p.position.is_finite());
            }
        }
    }

    #[test]
    fn speed_is_bounded_right_after_integration() {
        let mut sim = running(Config::default(), 800.0, 600.0);
        run_frames(&mut sim, 60);
        let config = sim.config().clone();
        let derived = *sim.derived();
        let ctx = crate::sim::particle::StepContext {
            config: &config,
            derived: &derived,
            viewport: sim.viewport(),
            cursor: None,
            dt: 3.0,
            frame: sim.frame_count(),
        };
        for mut p in sim.particles().iter().cloned() {
            p.velocity *= 50.0;
            p.integrate(&ctx);
            assert!(p.velocity.length() <= derived.max_speed * (1.0 + 1e-5));
        }
    }

    #[test]
    fn destroy_releases_and_detaches() {
        let mut sim = running(Config::default(), 800.0, 600.0);
        run_frames(&mut sim, 10);
        assert!(!sim.particles().is_empty());
        sim.destroy();
        assert_eq!(sim.state(), RunState::Destroyed);
        assert!(sim.particles().is_empty());
        assert!(sim.tick(1_000.0).is_none());
        sim.start();
        assert_eq!(sim.state(), RunState::Destroyed);
        assert_eq!(sim.request_spawn(1.0, 1.0), 0);
        sim.on_pointer_move(5.0, 5.0);
        assert_eq!(sim.cursor(), None);
    }

    #[test]
    fn connections_are_rebuilt_every_tick() {
        let config = Config {
            spawn_interval: 1_000_000,
            ..Config::default()
        };
        let mut sim = running(config, 800.0, 600.0);
        sim.spawn_at(Vec2::new(100.0, 100.0), Some(Charge::Positive));
        sim.spawn_at(Vec2::new(150.0, 100.0), Some(Charge::Negative));
        let report = sim.tick(0.0).expect("running");
        assert_eq!(report.connections, 1);
        assert_eq!(sim.connections().len(), 1);
        assert!(!sim.connections()[0].same_charge);
        assert_eq!(sim.particle_draws().count(), 2);
    }

    #[test]
    fn dying_particle_still_pushes_on_its_last_tick() {
        let config = Config {
            growth_rate: 10.0,
            shrink_rate: 10.0,
            spawn_interval: 0,
            ..Config::default()
        };
        let mut sim = running(config, 800.0, 600.0);
        sim.spawn_at(Vec2::new(100.0, 100.0), Some(Charge::Positive));
        sim.tick(0.0);
        // reaches max size; shrinks past zero on the next tick
        sim.tick(FRAME_MS);
        assert!(!sim.particles()[0].size.growing);

        sim.spawn_at(Vec2::new(120.0, 100.0), Some(Charge::Positive));
        let before = sim.particles()[1].clone();
        let config = sim.config().clone();
        let dt = (FRAME_MS * crate::config::TIME_UNITS_PER_MS) as f32;
        let max_speed = sim.derived().max_speed;

        let report = sim.tick(2.0 * FRAME_MS).expect("running");
        assert_eq!(report.removed, 1);
        assert_eq!(sim.particles().len(), 1);

        // velocity the survivor would have with nobody else around
        let mut alone = before.velocity - before.velocity * config.damping * dt;
        if alone.length() > max_speed {
            alone = alone.normalize_or_zero() * max_speed;
        }
        let push = sim.particles()[0].velocity - alone;
        // same charges: pushed away from the dying neighbour on its left
        assert!((push.length() - config.attraction * dt).abs() < 1e-4);
        assert!(push.x > 0.9 * config.attraction * dt);
    }

    #[test]
    fn burst_drains_back_under_cap_without_trimming() {
        let config = Config {
            growth_rate: 0.5,
            shrink_rate: 0.25,
            ..Config::default()
        };
        let mut sim = running(config, 800.0, 600.0);
        run_frames(&mut sim, 5);
        while sim.request_spawn(400.0, 300.0) > 0 {}
        assert_eq!(sim.particles().len(), sim.max_population() + 5);

        let mut settled = false;
        for _ in 0..60 {
            run_frames(&mut sim, 1);
            if sim.particles().len() <= sim.max_population() {
                settled = true;
                break;
            }
        }
        assert!(settled);
        assert_eq!(sim.population().trimmed_total(), 0);
    }

    #[test]
    fn zero_spawn_interval_leaves_spawning_to_requests() {
        let config = Config {
            spawn_interval: 0,
            shrink_rate: 0.0,
            ..Config::default()
        };
        let mut sim = running(config, 800.0, 600.0);
        run_frames(&mut sim, 30);
        assert!(sim.particles().is_empty());
        assert_eq!(sim.request_spawn(50.0, 50.0), 5);
        run_frames(&mut sim, 30);
        assert_eq!(sim.particles().len(), 5);
    }

    #[test]
    fn seeded_runs_repeat() {
        let mut a = running(Config::default(), 800.0, 600.0);
        let mut b = running(Config::default(), 800.0, 600.0);
        run_frames(&mut a, 100);
        run_frames(&mut b, 100);
        assert_eq!(a.particles(), b.particles());
    }
}
