use bevy::prelude::*;
use ion_field::{Config, Simulation, Viewport};

pub mod draw;
pub mod systems;

use systems::SurfaceSize;

/// The simulation as a Bevy resource; systems below are its only callers.
#[derive(Resource)]
pub struct SimulationHandle(pub Simulation);

/// Plug this into your App with `.add_plugins(HostPlugin { config })`.
pub struct HostPlugin {
    pub config: Config,
}

impl Plugin for HostPlugin {
    fn build(&self, app: &mut App) {
        // Viewport starts empty; the first `sync_viewport` run sizes it from the window.
        let simulation = Simulation::new(self.config.clone(), Viewport::default());

        app.insert_resource(SimulationHandle(simulation))
            .init_resource::<SurfaceSize>()
            .add_systems(Startup, systems::spawn_camera_and_start)
            // Inputs first, then exactly one tick per rendered frame, then draw what it produced
            .add_systems(
                Update,
                (
                    systems::sync_viewport,
                    systems::track_pointer,
                    systems::spawn_on_click,
                    systems::keyboard_controls,
                    systems::tick_simulation,
                    draw::sync_clear_color,
                    draw::draw_connections,
                    draw::draw_particles,
                    draw::draw_cursor_zones,
                )
                    .chain(),
            );
    }
}
