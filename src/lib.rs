//! Event-driven molecular dynamics for hard (impulsive) interactions.
//!
//! Particles fly ballistically between instantaneous events. An [`Engine`]
//! predicts the next event from per-particle schedules, advances everything
//! to it, applies the impulse through the responsible potential and repairs
//! only the predictions the event can have changed.
//!
//! ```no_run
//! use hardsim::{Boundary, Engine, EngineConfig, HardSphere, ParticleBox, PotentialMap};
//!
//! # fn main() -> hardsim::Result<()> {
//! let space = ParticleBox::random(Boundary::periodic([10.0; 3])?, 100, 0, 0.5, 1.0, Some(7))?;
//! let mut potentials = PotentialMap::new(1);
//! potentials.add_pair(0, 0, HardSphere::new(0.5)?)?;
//! let mut engine = Engine::new(space, potentials, EngineConfig::default())?;
//! engine.reset()?;
//! engine.do_step(1.0)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod potential;

#[cfg(feature = "python")]
mod python;

pub use crate::config::{EngineConfig, Thermostat, TieBreak};
pub use crate::core::{
    Boundary, CollisionEvent, CollisionListener, Engine, EngineState, EventKind, ListenerId,
    NextEvent, Particle, ParticleBox,
};
pub use crate::error::{Error, Result};
pub use crate::potential::{
    CollisionPotential, HardSphere, MovingWall, NullPotential, PeriodicImage, Potential,
    PotentialId, PotentialMap, SquareWell,
};
