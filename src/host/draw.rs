use bevy::prelude::*;
use ion_field::sim::Hsla;

use super::SimulationHandle;

/// Simulation space (top-left origin, +y down) to Bevy 2D world (centered, +y up).
fn to_world(point: Vec2, surface: Vec2) -> Vec2 {
    Vec2::new(point.x - surface.x * 0.5, surface.y * 0.5 - point.y)
}

fn color(c: Hsla) -> Color {
    Color::hsla(c.hue, c.saturation / 100.0, c.lightness / 100.0, c.alpha)
}

pub fn sync_clear_color(sim: Res<SimulationHandle>, mut clear: ResMut<ClearColor>) {
    let [r, g, b, a] = sim.0.config().background;
    let background = Color::srgba(r, g, b, a);
    if clear.0 != background {
        clear.0 = background;
    }
}

/// Trails first, then a dark body ring and a bright core ring per particle.
pub fn draw_particles(mut gizmos: Gizmos, sim: Res<SimulationHandle>) {
    let surface = sim.0.viewport().size();
    for draw in sim.0.particle_draws() {
        for (point, radius, alpha) in draw.trail_stamps() {
            gizmos.circle_2d(
                to_world(point, surface),
                radius,
                color(Hsla::new(draw.hue, draw.saturation, 60.0, alpha)),
            );
        }

        let center = to_world(draw.position, surface);
        let body = Hsla::new(draw.hue, draw.saturation, 20.0, draw.body_opacity * draw.opacity);
        let core = Hsla::new(
            draw.hue,
            draw.saturation,
            100.0,
            draw.core_opacity * draw.opacity * draw.glow_intensity,
        );
        gizmos.circle_2d(center, draw.radius, color(body));
        gizmos.circle_2d(center, draw.radius * 0.5, color(core));
    }
}

/// Gradient line per connection plus a pulsing glow pass. Gizmo lines share one width,
/// so the per-link width is folded into alpha.
pub fn draw_connections(mut gizmos: Gizmos, sim: Res<SimulationHandle>) {
    let surface = sim.0.viewport().size();
    for link in sim.0.connections() {
        let from = to_world(link.from, surface);
        let to = to_world(link.to, surface);

        let mut end = link.end_color;
        end.alpha *= link.opacity;
        gizmos.line_gradient_2d(from, to, color(link.start_color), color(end));

        let glow = Hsla {
            alpha: link.glow_opacity * link.opacity,
            ..link.end_color
        };
        gizmos.line_2d(from, to, color(glow));
    }
}

/// Faint outer ring where charge forces act, brighter inner ring for the wall.
pub fn draw_cursor_zones(mut gizmos: Gizmos, sim: Res<SimulationHandle>) {
    let Some(cursor) = sim.0.cursor() else {
        return;
    };
    let config = sim.0.config();
    let center = to_world(cursor, sim.0.viewport().size());
    gizmos.circle_2d(center, config.cursor_avoid_radius, Color::srgba(1.0, 1.0, 1.0, 0.05));
    gizmos.circle_2d(
        center,
        config.cursor_impenetrable_radius,
        Color::srgba(1.0, 1.0, 1.0, 0.15),
    );
}
