use bevy::prelude::*;
use ion_field::Config;

mod host;

use host::HostPlugin;

fn main() {
    let mut app = App::new();
    app
        // Overwritten from `config.background` once the first frame runs
        .insert_resource(ClearColor(Color::BLACK))
        // LogPlugin installs the tracing subscriber here, before the config is read
        .add_plugins(DefaultPlugins);

    let config = startup_config();
    app.add_plugins(HostPlugin { config }).run();
}

/// `--config <file.json>` patches the defaults with whatever keys the file sets.
#[cfg(feature = "serde")]
fn startup_config() -> Config {
    use ion_field::ConfigPatch;
    use tracing::{info, warn};

    let args: Vec<String> = std::env::args().collect();
    let Some(path) = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
    else {
        return Config::default();
    };

    match ConfigPatch::load(path) {
        Ok(patch) => {
            info!(path = %path, fields = patch.len(), "loaded config overrides");
            Config::default().merged(&patch)
        }
        Err(err) => {
            warn!(path = %path, %err, "ignoring config file, using defaults");
            Config::default()
        }
    }
}

#[cfg(not(feature = "serde"))]
fn startup_config() -> Config {
    Config::default()
}
