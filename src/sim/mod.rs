//! Simulation core: particles, their pairwise field, population sizing and the tick.

pub mod derived;
pub mod frame;
pub mod interaction;
pub mod particle;
pub mod population;
pub mod world;

pub use derived::{DerivedConstants, Viewport};
pub use frame::{ConnectionDraw, Hsla, ParticleDraw, TickReport};
pub use interaction::{InteractionField, PairwiseField, pair_force};
pub use particle::{Charge, Particle, ParticleColor, Size, StepContext};
pub use population::{PopulationController, target_population};
pub use world::{FrameClock, RunState, Simulation};
