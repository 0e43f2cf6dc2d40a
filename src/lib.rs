//! Charged, aging point particles drifting under damping, pairwise charge forces and
//! cursor repulsion/attraction, linked visually when close.

pub mod config;
pub mod sim;

pub use config::{Config, ConfigPatch, ConfigStore};
pub use sim::{Simulation, Viewport};
