//! Particles, the simulation cell and the scheduling engine.

pub mod agent;
pub mod directive;
pub mod engine;
pub mod event;
pub mod listener;
pub mod particle;
pub mod space;

pub use agent::{Agent, Reduction};
pub use directive::{Direction, Directive, Target, Visit};
pub use engine::{Engine, EngineState, OverlapReport};
pub use event::{CollisionEvent, EventKind, NextEvent};
pub use listener::{CollisionListener, ListenerId, ListenerRegistry};
pub use particle::{Particle, DIM};
pub use space::{Boundary, ParticleBox};
