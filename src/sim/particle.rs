use std::collections::VecDeque;
use std::f32::consts::TAU;

use bevy::math::Vec2;
use rand::Rng;

use crate::config::Config;

use super::derived::{DerivedConstants, Viewport};

/// Signed tag that decides the sign of pairwise and cursor forces. Neutral is inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charge {
    Negative,
    Neutral,
    Positive,
}

impl Charge {
    pub fn sign(self) -> f32 {
        match self {
            Self::Negative => -1.0,
            Self::Neutral => 0.0,
            Self::Positive => 1.0,
        }
    }

    /// Base hue (degrees) a particle of this charge is drawn with.
    pub fn hue(self) -> f32 {
        match self {
            Self::Negative => 240.0,
            Self::Neutral => 120.0,
            Self::Positive => 0.0,
        }
    }

    /// Randomly spawned particles are always charged; neutral ones only come from explicit requests.
    pub fn random_polar(rng: &mut impl Rng) -> Self {
        if rng.random_bool(0.5) {
            Self::Negative
        } else {
            Self::Positive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub current: f32,
    pub max: f32,
    /// Flips to false once `max` is reached and never flips back.
    pub growing: bool,
}

impl Size {
    pub fn opacity(self) -> f32 {
        if self.max > 0.0 {
            (self.current / self.max).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleColor {
    /// Degrees.
    pub hue: f32,
    /// Percent.
    pub saturation: f32,
}

/// Everything one update step reads besides the particle itself.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub config: &'a Config,
    pub derived: &'a DerivedConstants,
    pub viewport: Viewport,
    /// `None` while the pointer is off the surface.
    pub cursor: Option<Vec2>,
    /// Elapsed simulated time for this tick.
    pub dt: f32,
    pub frame: u64,
}

/// A charged, aging point particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Size,
    /// Always `size.opacity()` as of the last size update.
    pub opacity: f32,
    pub charge: Charge,
    pub color: ParticleColor,
    pub pulse_phase: f32,
    pub glow_intensity: f32,
    /// Prior positions, oldest first.
    pub trail: VecDeque<Vec2>,
}

impl Particle {
    /// Deterministic particle: size 1 growing to 5, full saturation, no pulse offset.
    pub fn new(position: Vec2, velocity: Vec2, charge: Charge) -> Self {
        let size = Size {
            current: 1.0,
            max: 5.0,
            growing: true,
        };
        Self {
            position,
            velocity,
            size,
            opacity: size.opacity(),
            charge,
            color: ParticleColor {
                hue: charge.hue(),
                saturation: 100.0,
            },
            pulse_phase: 0.0,
            glow_intensity: 1.0,
            trail: VecDeque::new(),
        }
    }

    /// Fresh particle with every visual and kinetic property drawn from the config ranges.
    pub fn spawn(
        position: Vec2,
        charge: Option<Charge>,
        config: &Config,
        rng: &mut impl Rng,
    ) -> Self {
        let charge = charge.unwrap_or_else(|| Charge::random_polar(rng));
        let speed = sample(rng, config.speed_range);
        let heading = rng.random::<f32>() * TAU;
        let size = Size {
            current: 1.0,
            max: sample(rng, config.size_range),
            growing: true,
        };

        Self {
            position,
            velocity: Vec2::from_angle(heading) * speed,
            size,
            opacity: size.opacity(),
            charge,
            color: ParticleColor {
                hue: charge.hue(),
                saturation: sample(rng, config.sat_range),
            },
            pulse_phase: rng.random::<f32>() * TAU,
            glow_intensity: sample(rng, config.glow_intensity_range),
            trail: VecDeque::with_capacity(config.trail_max_length + 1),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.size.current > 0.0
    }

    /// Damp, clamp to the current max speed, record the trail point, then move.
    pub fn integrate(&mut self, ctx: &StepContext) {
        self.velocity -= self.velocity * ctx.config.damping * ctx.dt;
        if self.velocity.length_squared() > ctx.derived.max_speed_sq {
            self.velocity = self.velocity.normalize_or_zero() * ctx.derived.max_speed;
        }

        self.trail.push_back(self.position);
        while self.trail.len() > ctx.config.trail_max_length {
            self.trail.pop_front();
        }

        self.position += self.velocity * ctx.dt;
    }

    /// Grow toward `size.max`, then shrink for good. Opacity follows size.
    pub fn update_size(&mut self, ctx: &StepContext) {
        if self.size.growing {
            self.size.current += ctx.config.growth_rate * ctx.dt;
            if self.size.current >= self.size.max {
                self.size.current = self.size.max;
                self.size.growing = false;
            }
        } else {
            self.size.current -= ctx.config.shrink_rate * ctx.dt;
        }
        self.size.current = self.size.current.max(0.0);
        self.opacity = self.size.opacity();
    }

    /// Inner zone is a wall the particle slides along; outer zone pushes or pulls by charge.
    pub fn react_to_cursor(&mut self, ctx: &StepContext) {
        let Some(cursor) = ctx.cursor else {
            return;
        };
        let config = ctx.config;
        let offset = self.position - cursor;
        let dist_sq = offset.length_squared();

        if dist_sq < ctx.derived.impenetrable_radius_sq && dist_sq > 0.0 {
            let normal = offset.normalize_or_zero();
            self.position = cursor + normal * config.cursor_impenetrable_radius;
            let inward = self.velocity.dot(normal);
            if inward < 0.0 {
                self.velocity -= normal * inward;
            }
        }

        if dist_sq < ctx.derived.avoid_radius_sq && dist_sq >= ctx.derived.impenetrable_radius_sq {
            let normal = offset.normalize_or_zero();
            let product = self.charge.sign() * config.cursor_charge;
            self.velocity += normal * product * config.cursor_avoid_force * ctx.dt;
        }
    }

    /// Clamp into `[margin, extent - margin]` per axis, sending the velocity back inward
    /// with `bounce_retention` of its magnitude.
    pub fn bounce_in_bounds(&mut self, ctx: &StepContext) {
        let margin = ctx.config.boundary_margin;
        let retention = ctx.config.bounce_retention;
        let far = ctx.viewport.size() - Vec2::splat(margin);

        if self.position.x < margin {
            self.position.x = margin;
            self.velocity.x = self.velocity.x.abs() * retention;
        } else if self.position.x > far.x {
            self.position.x = far.x;
            self.velocity.x = -self.velocity.x.abs() * retention;
        }

        if self.position.y < margin {
            self.position.y = margin;
            self.velocity.y = self.velocity.y.abs() * retention;
        } else if self.position.y > far.y {
            self.position.y = far.y;
            self.velocity.y = -self.velocity.y.abs() * retention;
        }
    }

    /// Size multiplier for drawing; purely visual.
    pub fn pulse(&self, frame: u64, config: &Config) -> f32 {
        1.0 + (self.pulse_phase + frame as f32 * config.pulse_speed).sin() * config.pulse_amplitude
    }
}

/// Uniform draw from `[a, b]`; also fine when `a > b` or `a == b`.
pub(crate) fn sample(rng: &mut impl Rng, [a, b]: [f32; 2]) -> f32 {
    a + (b - a) * rng.random::<f32>()
}
