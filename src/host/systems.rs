use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use ion_field::{ConfigPatch, Simulation};
use tracing::{debug, info};

use super::SimulationHandle;

/// Density multiplier applied per Up/Down key press.
const DENSITY_STEP: f32 = 1.25;

/// Last window size pushed into the simulation (logical pixels).
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct SurfaceSize(pub Vec2);

pub fn spawn_camera_and_start(mut commands: Commands, mut sim: ResMut<SimulationHandle>) {
    commands.spawn(Camera2d);
    sim.0.start();
}

/// Forward window resizes (and DPI changes) to the simulation.
pub fn sync_viewport(
    windows: Query<&Window, With<PrimaryWindow>>,
    mut surface: ResMut<SurfaceSize>,
    mut sim: ResMut<SimulationHandle>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let size = window.size();
    if size != surface.0 {
        surface.0 = size;
        sim.0.on_resize(size.x, size.y);
        debug!(width = size.x, height = size.y, cap = sim.0.max_population(), "viewport resized");
    }
}

/// Cursor in window space (top-left origin, +y down) is already simulation space.
pub fn track_pointer(
    windows: Query<&Window, With<PrimaryWindow>>,
    mut sim: ResMut<SimulationHandle>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    match window.cursor_position() {
        Some(pos) => sim.0.on_pointer_move(pos.x, pos.y),
        None => sim.0.on_pointer_leave(),
    }
}

pub fn spawn_on_click(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut sim: ResMut<SimulationHandle>,
) {
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    if let Some(pos) = window.cursor_position() {
        let added = sim.0.request_spawn(pos.x, pos.y);
        debug!(added, x = pos.x, y = pos.y, "click burst");
    }
}

/// Space toggles ticking, Up/Down scale density, Esc or Q tears down and quits (native only).
pub fn keyboard_controls(
    keys: Res<ButtonInput<KeyCode>>,
    mut sim: ResMut<SimulationHandle>,
    mut exit: MessageWriter<AppExit>,
) {
    if keys.just_pressed(KeyCode::Space) {
        if sim.0.is_running() {
            sim.0.stop();
        } else {
            sim.0.start();
        }
    }
    if keys.just_pressed(KeyCode::ArrowUp) {
        scale_density(&mut sim.0, DENSITY_STEP);
    }
    if keys.just_pressed(KeyCode::ArrowDown) {
        scale_density(&mut sim.0, DENSITY_STEP.recip());
    }
    if cfg!(not(target_arch = "wasm32")) && keys.any_just_pressed([KeyCode::Escape, KeyCode::KeyQ])
    {
        sim.0.destroy();
        exit.write(AppExit::Success);
    }
}

fn scale_density(sim: &mut Simulation, factor: f32) {
    let density = sim.config().particle_density * factor;
    sim.update_config(&ConfigPatch {
        particle_density: Some(density),
        ..default()
    });
    info!(density, cap = sim.max_population(), "particle density changed");
}

/// One simulation tick per rendered frame, stamped with the app clock in milliseconds.
pub fn tick_simulation(time: Res<Time>, mut sim: ResMut<SimulationHandle>) {
    sim.0.tick(time.elapsed_secs_f64() * 1000.0);
}
