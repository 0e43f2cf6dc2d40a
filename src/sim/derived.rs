use bevy::math::Vec2;

use crate::config::{Config, MAX_SPEED_PER_DIAGONAL};

use super::population::target_population;

/// Surface size in device-independent units; origin top-left, +y down.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn size(self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn diagonal(self) -> f32 {
        self.size().length()
    }

    pub fn area(self) -> f64 {
        self.width as f64 * self.height as f64
    }
}

/// Values recomputed from config + viewport and cached for the per-pair loop.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DerivedConstants {
    pub max_speed: f32,
    pub max_speed_sq: f32,
    pub max_population: usize,
    pub max_connection_distance: f32,
    pub max_connection_distance_sq: f32,
    pub interaction_radius_sq: f32,
    pub avoid_radius_sq: f32,
    pub impenetrable_radius_sq: f32,
}

impl DerivedConstants {
    pub fn compute(config: &Config, viewport: Viewport) -> Self {
        let diagonal = viewport.diagonal();
        let max_speed = diagonal * MAX_SPEED_PER_DIAGONAL;
        let max_connection_distance = config
            .connection_max_distance_limit
            .min(diagonal * config.connection_max_distance_ratio);

        Self {
            max_speed,
            max_speed_sq: max_speed * max_speed,
            max_population: target_population(config, viewport),
            max_connection_distance,
            max_connection_distance_sq: max_connection_distance * max_connection_distance,
            interaction_radius_sq: config.interaction_radius * config.interaction_radius,
            avoid_radius_sq: config.cursor_avoid_radius * config.cursor_avoid_radius,
            impenetrable_radius_sq: config.cursor_impenetrable_radius
                * config.cursor_impenetrable_radius,
        }
    }
}
