//! Per-tick output handed to whatever paints the surface.

use std::collections::VecDeque;

use bevy::math::Vec2;

use crate::config::Config;

use super::particle::{Charge, Particle};

/// Colour in the renderer's terms: hue in degrees, saturation and lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
    pub alpha: f32,
}

impl Hsla {
    pub fn new(hue: f32, saturation: f32, lightness: f32, alpha: f32) -> Self {
        Self {
            hue,
            saturation,
            lightness,
            alpha,
        }
    }
}

/// How one live particle should be drawn this frame.
#[derive(Debug, Clone, Copy)]
pub struct ParticleDraw<'a> {
    pub position: Vec2,
    pub size: f32,
    /// `size` scaled by the pulse.
    pub radius: f32,
    pub opacity: f32,
    pub hue: f32,
    pub saturation: f32,
    pub pulse_phase: f32,
    pub pulse: f32,
    pub glow_intensity: f32,
    pub charge: Charge,
    pub core_opacity: f32,
    pub body_opacity: f32,
    pub trail_opacity: f32,
    /// Oldest first.
    pub trail: &'a VecDeque<Vec2>,
}

impl<'a> ParticleDraw<'a> {
    pub fn new(particle: &'a Particle, frame: u64, config: &Config) -> Self {
        let pulse = particle.pulse(frame, config);
        Self {
            position: particle.position,
            size: particle.size.current,
            radius: particle.size.current * pulse,
            opacity: particle.opacity,
            hue: particle.color.hue,
            saturation: particle.color.saturation,
            pulse_phase: particle.pulse_phase,
            pulse,
            glow_intensity: particle.glow_intensity,
            charge: particle.charge,
            core_opacity: config.opacity_core,
            body_opacity: config.opacity_body,
            trail_opacity: config.trail_opacity,
            trail: &particle.trail,
        }
    }

    /// Trail stamps oldest first as (position, radius, alpha), fading in toward the head.
    pub fn trail_stamps(&self) -> impl Iterator<Item = (Vec2, f32, f32)> + '_ {
        let len = self.trail.len() as f32;
        self.trail.iter().enumerate().map(move |(i, &point)| {
            let t = i as f32 / len;
            (
                point,
                self.radius * (0.5 + t * 0.5),
                t * self.opacity * self.trail_opacity,
            )
        })
    }
}

/// A visual link between two nearby particles. Never fed back into the physics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionDraw {
    pub from: Vec2,
    pub to: Vec2,
    pub opacity: f32,
    pub line_width: f32,
    pub pulse: f32,
    pub glow_opacity: f32,
    pub glow_width: f32,
    pub same_charge: bool,
    pub start_color: Hsla,
    pub end_color: Hsla,
}

/// Summary of one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub frame: u64,
    pub dt: f32,
    pub spawned: usize,
    pub removed: usize,
    pub live: usize,
    pub connections: usize,
}
