use std::sync::Arc;

/// Timing
/// Simulated time runs at one unit per 5 ms of wall clock.
pub const TIME_UNITS_PER_MS: f64 = 1.0 / 5.0;
/// Largest step a single tick may take (60 ms of wall clock); long stalls are not replayed.
/// Below about 16 fps every frame hits this cap, so simulated time falls behind the wall clock.
pub const MAX_STEP: f32 = 12.0;

/// Population
/// Particles spawned by one external spawn request (a click).
pub const CLICK_BURST: usize = 5;

/// Max speed is this fraction of the viewport diagonal.
pub const MAX_SPEED_PER_DIAGONAL: f32 = 0.0001;

/// Hue used at the far end of opposite-charge connections.
pub const CONTRAST_HUE: f32 = 270.0;

/// Generates `Config`, its all-optional `ConfigPatch` twin and the merge between them,
/// so the two field lists cannot drift apart.
macro_rules! config_fields {
    ($( $(#[$doc:meta])* $field:ident : $ty:ty = $default:expr, )*) => {
        /// One immutable parameter snapshot. Values are taken as-is; nothing is range checked.
        #[derive(Debug, Clone, PartialEq)]
        #[cfg_attr(
            feature = "serde",
            derive(serde::Serialize, serde::Deserialize),
            serde(default)
        )]
        pub struct Config {
            $( $(#[$doc])* pub $field: $ty, )*
        }

        impl Default for Config {
            fn default() -> Self {
                Self {
                    $( $field: $default, )*
                }
            }
        }

        /// Any subset of `Config` fields; `None` leaves the current value alone.
        #[derive(Debug, Clone, Default, PartialEq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct ConfigPatch {
            $( pub $field: Option<$ty>, )*
        }

        impl Config {
            /// Build the snapshot that results from laying `patch` over `self`.
            pub fn merged(&self, patch: &ConfigPatch) -> Self {
                Self {
                    $( $field: patch.$field.unwrap_or(self.$field), )*
                }
            }
        }

        impl ConfigPatch {
            /// Number of fields this patch sets.
            pub fn len(&self) -> usize {
                0 $( + usize::from(self.$field.is_some()) )*
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }
        }
    };
}

config_fields! {
    // ----- spawning -----
    /// Particles per square unit of viewport.
    particle_density: f32 = 0.000_02,
    min_particles: usize = 20,
    max_particles: usize = 500,
    /// Ticks between automatic spawns.
    spawn_interval: u32 = 1,

    // ----- physics -----
    /// Initial speed range [min, max].
    speed_range: [f32; 2] = [0.5, 1.0],
    /// Static max speed; replaced by the viewport-derived limit while simulating.
    max_speed: f32 = 2.0,
    /// Fraction of velocity removed per unit of simulated time.
    damping: f32 = 0.000_01,

    // ----- lifecycle -----
    size_range: [f32; 2] = [4.0, 5.0],
    growth_rate: f32 = 0.01,
    shrink_rate: f32 = 0.005,

    // ----- colour -----
    /// Saturation range in percent.
    sat_range: [f32; 2] = [70.0, 100.0],

    // ----- boundaries -----
    boundary_margin: f32 = 0.0,
    /// Share of the normal velocity kept on a bounce.
    bounce_retention: f32 = 0.8,

    // ----- cursor -----
    cursor_avoid_radius: f32 = 100.0,
    cursor_avoid_force: f32 = 10.0,
    cursor_impenetrable_radius: f32 = 30.0,
    cursor_charge: f32 = 1.0,

    // ----- pairwise -----
    interaction_radius: f32 = 60.0,
    attraction: f32 = 0.05,

    // ----- trails -----
    trail_opacity: f32 = 0.4,
    trail_max_length: usize = 30,

    // ----- visual -----
    pulse_speed: f32 = 0.03,
    pulse_amplitude: f32 = 0.1,
    glow_intensity_range: [f32; 2] = [0.6, 1.0],
    opacity_body: f32 = 1.0,
    opacity_core: f32 = 0.7,

    // ----- connections -----
    /// Share of the viewport diagonal two particles may be apart and still connect.
    connection_max_distance_ratio: f32 = 0.3,
    connection_max_distance_limit: f32 = 200.0,
    connection_opacity: f32 = 0.6,
    connection_pulse_speed: f32 = 0.05,
    connection_pulse_amplitude: f32 = 0.3,
    connection_line_width: f32 = 0.5,
    connection_glow_width: f32 = 0.5,
    connection_glow_opacity: f32 = 0.3,

    // ----- surface -----
    /// Background fill as sRGBA.
    background: [f32; 4] = [0.0, 0.0, 0.0, 1.0],
}

/// Holds the current snapshot. Updates swap in a whole new `Arc<Config>`, so a
/// snapshot handed out earlier never changes underneath its holder.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    current: Arc<Config>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            current: Arc::new(config),
        }
    }

    pub fn current(&self) -> &Arc<Config> {
        &self.current
    }

    pub fn apply_update(&mut self, patch: &ConfigPatch) -> Arc<Config> {
        self.current = Arc::new(self.current.merged(patch));
        Arc::clone(&self.current)
    }
}

#[cfg(feature = "serde")]
pub use loading::ConfigError;

#[cfg(feature = "serde")]
mod loading {
    use std::path::Path;

    use super::ConfigPatch;

    #[derive(Debug)]
    pub enum ConfigError {
        Io(std::io::Error),
        Parse(serde_json::Error),
    }

    impl std::fmt::Display for ConfigError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Io(err) => write!(f, "failed to read config patch: {err}"),
                Self::Parse(err) => write!(f, "invalid config patch: {err}"),
            }
        }
    }

    impl std::error::Error for ConfigError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            match self {
                Self::Io(err) => Some(err),
                Self::Parse(err) => Some(err),
            }
        }
    }

    impl ConfigPatch {
        pub fn from_json(text: &str) -> Result<Self, ConfigError> {
            serde_json::from_str(text).map_err(ConfigError::Parse)
        }

        pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
            let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
            Self::from_json(&text)
        }
    }
}
