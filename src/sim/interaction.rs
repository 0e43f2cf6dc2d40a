use bevy::math::Vec2;

use crate::config::CONTRAST_HUE;

use super::frame::{ConnectionDraw, Hsla};
use super::particle::{Particle, StepContext};

/// Pairwise charge forces and connection discovery.
///
/// Particles only see this through `pair_impulse` and `connections`, so a spatially
/// partitioned field can replace the all-pairs scan without touching lifecycle code.
pub trait InteractionField {
    /// Runs once per tick before any particle moves.
    fn prepare(&mut self, _particles: &[Particle], _ctx: &StepContext) {}

    /// Velocity change on `particles[subject]` from every other particle in range.
    fn pair_impulse(&self, subject: usize, particles: &[Particle], ctx: &StepContext) -> Vec2;

    /// Append one record per unordered pair closer than the max connection distance.
    fn connections(&self, particles: &[Particle], ctx: &StepContext, out: &mut Vec<ConnectionDraw>);
}

/// Scans every pair. Fine up to the population ceiling of a few hundred.
#[derive(Debug, Default, Clone, Copy)]
pub struct PairwiseField;

impl InteractionField for PairwiseField {
    fn pair_impulse(&self, subject: usize, particles: &[Particle], ctx: &StepContext) -> Vec2 {
        let Some(me) = particles.get(subject) else {
            return Vec2::ZERO;
        };

        let mut impulse = Vec2::ZERO;
        for (index, other) in particles.iter().enumerate() {
            if index == subject {
                continue;
            }
            impulse += pair_force(me, other, ctx);
        }
        impulse
    }

    fn connections(&self, particles: &[Particle], ctx: &StepContext, out: &mut Vec<ConnectionDraw>) {
        let max_sq = ctx.derived.max_connection_distance_sq;
        let pulse = connection_pulse(ctx);

        for (i, a) in particles.iter().enumerate() {
            for b in &particles[i + 1..] {
                let dist_sq = a.position.distance_squared(b.position);
                if dist_sq < max_sq {
                    out.push(connection(a, b, dist_sq, pulse, ctx));
                }
            }
        }
    }
}

/// Velocity change on `me` caused by `other`: same charges separate, opposite charges
/// close in, neutral pairs and pairs out of range do nothing.
pub fn pair_force(me: &Particle, other: &Particle, ctx: &StepContext) -> Vec2 {
    let offset = other.position - me.position;
    if offset.length_squared() >= ctx.derived.interaction_radius_sq {
        return Vec2::ZERO;
    }
    let product = me.charge.sign() * other.charge.sign();
    -offset.normalize_or_zero() * product * ctx.config.attraction * ctx.dt
}

fn connection_pulse(ctx: &StepContext) -> f32 {
    let config = ctx.config;
    1.0 + (ctx.frame as f32 * config.connection_pulse_speed).sin()
        * config.connection_pulse_amplitude
}

fn connection(a: &Particle, b: &Particle, dist_sq: f32, pulse: f32, ctx: &StepContext) -> ConnectionDraw {
    let config = ctx.config;
    let closeness = 1.0 - dist_sq / ctx.derived.max_connection_distance_sq;
    let opacity = closeness * config.connection_opacity * a.opacity.min(b.opacity);
    let same_charge = a.charge == b.charge;
    let end_alpha = config.connection_opacity * 0.5;
    let end_color = if same_charge {
        Hsla::new(a.color.hue, 100.0, 100.0, end_alpha)
    } else {
        Hsla::new(CONTRAST_HUE, 100.0, 50.0, end_alpha)
    };

    ConnectionDraw {
        from: a.position,
        to: b.position,
        opacity,
        line_width: config.connection_line_width * opacity,
        pulse,
        glow_opacity: config.connection_opacity * config.connection_glow_opacity * pulse,
        glow_width: config.connection_glow_width,
        same_charge,
        start_color: Hsla::new(a.color.hue, a.color.saturation, 70.0, 0.0),
        end_color,
    }
}
