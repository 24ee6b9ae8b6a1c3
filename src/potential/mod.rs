//! Hard (impulsive) potentials and the per-type lookup table.
//!
//! A potential predicts when its atoms next interact under ballistic motion
//! and applies the impulsive response when they do. The set of
//! implementations is closed: [`Potential`] dispatches to one of them and
//! [`PotentialMap`] selects it per type pair (or per type, for one-body
//! potentials such as walls) once, at setup time. [`PeriodicImage`] is the
//! one member the engine installs itself.

pub mod hard_sphere;
pub mod map;
pub mod moving_wall;
pub mod periodic;
pub mod square_well;

pub use hard_sphere::HardSphere;
pub use map::{PotentialId, PotentialMap};
pub use moving_wall::MovingWall;
pub use periodic::PeriodicImage;
pub use square_well::SquareWell;

use crate::core::particle::{dot, Particle, DIM};
use crate::core::space::Boundary;
use crate::error::{Error, Result};

/// Number of atoms a potential acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    One,
    Two,
}

/// Read-only view of the atoms a potential is evaluated on.
///
/// Pairs are always passed in index order (`a.index < b.index`).
#[derive(Debug, Clone, Copy)]
pub enum Atoms<'a> {
    One(&'a Particle),
    Two {
        a: &'a Particle,
        b: &'a Particle,
        boundary: &'a Boundary,
    },
}

/// Mutable view handed to [`CollisionPotential::bump`].
#[derive(Debug)]
pub enum AtomsMut<'a> {
    One(&'a mut Particle),
    Two {
        a: &'a mut Particle,
        b: &'a mut Particle,
        boundary: &'a Boundary,
    },
}

/// Outcome of one impulsive event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bump {
    /// Virial contribution `-r_ab · Δp_b` (negative for a repulsive impulse).
    pub virial: f64,
    /// Change of potential energy caused by the event.
    pub energy_change: f64,
    /// The event changed state seen by every particle (e.g. a wall's velocity),
    /// so every scheduled prediction is void.
    pub invalidates_all: bool,
    /// Nothing was exchanged; the atom's predictions only need recomputing.
    pub rescan_only: bool,
}

/// Contract for a hard potential.
///
/// `false_time` is an offset already elapsed since the atoms were last
/// synchronized: positions are read as `r + v * false_time`. `bump` keeps the
/// trajectories continuous for the same offset, so stored positions stay
/// consistent with the new velocities.
pub trait CollisionPotential {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Whether the potential can act on atoms of the given arity.
    fn accepts(&self, arity: Arity) -> bool;

    /// Time until the next event, `f64::INFINITY` if none.
    ///
    /// Negative only when the atoms already overlap and are approaching.
    fn collision_time(&self, atoms: Atoms<'_>, false_time: f64) -> f64;

    /// Apply the impulsive law.
    fn bump(&mut self, atoms: AtomsMut<'_>, false_time: f64) -> Result<Bump>;

    /// Potential energy of the configuration; `f64::INFINITY` on overlap.
    fn energy(&self, atoms: Atoms<'_>) -> f64;

    /// Largest center distance at which a pair can interact.
    fn range(&self) -> f64 {
        0.0
    }

    /// Free flight of state owned by the potential itself.
    fn advance(&mut self, _dt: f64) {}

    /// Drop internal per-pair state before a full rebuild.
    fn clear_state(&mut self) {}

    /// Re-derive internal per-pair state from the current geometry.
    fn refresh(&mut self, _atoms: Atoms<'_>) {}
}

/// Zero-range potential: never collides, never overlaps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NullPotential;

impl CollisionPotential for NullPotential {
    fn name(&self) -> &'static str {
        "null"
    }

    fn accepts(&self, _arity: Arity) -> bool {
        true
    }

    fn collision_time(&self, _atoms: Atoms<'_>, _false_time: f64) -> f64 {
        f64::INFINITY
    }

    fn bump(&mut self, _atoms: AtomsMut<'_>, _false_time: f64) -> Result<Bump> {
        Ok(Bump::default())
    }

    fn energy(&self, _atoms: Atoms<'_>) -> f64 {
        0.0
    }
}

/// The closed set of hard potentials.
#[derive(Debug, Clone)]
pub enum Potential {
    Null(NullPotential),
    HardSphere(HardSphere),
    SquareWell(SquareWell),
    MovingWall(MovingWall),
    PeriodicImage(PeriodicImage),
}

macro_rules! dispatch {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            Potential::Null($p) => $body,
            Potential::HardSphere($p) => $body,
            Potential::SquareWell($p) => $body,
            Potential::MovingWall($p) => $body,
            Potential::PeriodicImage($p) => $body,
        }
    };
}

impl CollisionPotential for Potential {
    fn name(&self) -> &'static str {
        dispatch!(self, p => p.name())
    }

    fn accepts(&self, arity: Arity) -> bool {
        dispatch!(self, p => p.accepts(arity))
    }

    fn collision_time(&self, atoms: Atoms<'_>, false_time: f64) -> f64 {
        dispatch!(self, p => p.collision_time(atoms, false_time))
    }

    fn bump(&mut self, atoms: AtomsMut<'_>, false_time: f64) -> Result<Bump> {
        dispatch!(self, p => p.bump(atoms, false_time))
    }

    fn energy(&self, atoms: Atoms<'_>) -> f64 {
        dispatch!(self, p => p.energy(atoms))
    }

    fn range(&self) -> f64 {
        dispatch!(self, p => p.range())
    }

    fn advance(&mut self, dt: f64) {
        dispatch!(self, p => p.advance(dt))
    }

    fn clear_state(&mut self) {
        dispatch!(self, p => p.clear_state())
    }

    fn refresh(&mut self, atoms: Atoms<'_>) {
        dispatch!(self, p => p.refresh(atoms))
    }
}

impl From<NullPotential> for Potential {
    fn from(p: NullPotential) -> Self {
        Potential::Null(p)
    }
}

impl From<HardSphere> for Potential {
    fn from(p: HardSphere) -> Self {
        Potential::HardSphere(p)
    }
}

impl From<SquareWell> for Potential {
    fn from(p: SquareWell) -> Self {
        Potential::SquareWell(p)
    }
}

impl From<MovingWall> for Potential {
    fn from(p: MovingWall) -> Self {
        Potential::MovingWall(p)
    }
}

impl From<PeriodicImage> for Potential {
    fn from(p: PeriodicImage) -> Self {
        Potential::PeriodicImage(p)
    }
}

// ============ Shared pair kinematics ============

/// Minimum-image separation `b - a` and relative velocity `v_b - v_a` at `false_time`.
#[inline]
pub(crate) fn separation(
    a: &Particle,
    b: &Particle,
    boundary: &Boundary,
    false_time: f64,
) -> ([f64; DIM], [f64; DIM]) {
    let mut dr = [0.0_f64; DIM];
    let mut dv = [0.0_f64; DIM];
    for k in 0..DIM {
        dv[k] = b.v[k] - a.v[k];
        dr[k] = b.r[k] - a.r[k] + dv[k] * false_time;
    }
    boundary.nearest_image(&mut dr);
    (dr, dv)
}

/// Earlier root of `v2 t^2 + 2 bij t + c = 0` for an approaching pair (`bij < 0`),
/// in the cancellation-free form `c / (-bij + sqrt(bij^2 - v2 c))`.
///
/// Returns `f64::INFINITY` when the pair misses the shell.
#[inline]
pub(crate) fn entry_time(bij: f64, v2: f64, c: f64) -> f64 {
    let disc = bij * bij - v2 * c;
    if bij >= 0.0 || disc <= 0.0 {
        return f64::INFINITY;
    }
    c / (-bij + disc.sqrt())
}

/// Later root of `v2 t^2 + 2 bij t + c = 0` for a pair inside the shell (`c <= 0`).
#[inline]
pub(crate) fn exit_time(bij: f64, v2: f64, c: f64) -> f64 {
    if v2 <= 0.0 {
        return f64::INFINITY;
    }
    let disc = (bij * bij - v2 * c).max(0.0);
    let s = disc.sqrt();
    if bij > 0.0 {
        -c / (bij + s)
    } else {
        (s - bij) / v2
    }
}

/// Apply impulse `dp` to `b` and `-dp` to `a`, keeping both trajectories continuous at `false_time`.
#[inline]
pub(crate) fn exchange(a: &mut Particle, b: &mut Particle, dp: &[f64; DIM], false_time: f64) {
    for k in 0..DIM {
        let dva = -dp[k] * a.inv_mass;
        let dvb = dp[k] * b.inv_mass;
        a.v[k] += dva;
        b.v[k] += dvb;
        a.r[k] -= dva * false_time;
        b.r[k] -= dvb * false_time;
    }
}

/// Impulse along the line of centers that changes the radial relative velocity
/// from `vr` to `vr_new`, with the associated virial.
///
/// Returns `(dp, virial)` where `dp` acts on `b`.
#[inline]
pub(crate) fn radial_impulse(
    dr: &[f64; DIM],
    r: f64,
    reduced_mass: f64,
    vr: f64,
    vr_new: f64,
) -> ([f64; DIM], f64) {
    let j = reduced_mass * (vr_new - vr);
    let mut dp = [0.0_f64; DIM];
    for (dpk, &drk) in dp.iter_mut().zip(dr.iter()) {
        *dpk = j * drk / r;
    }
    (dp, -j * r)
}

/// `1 / (1/m_a + 1/m_b)`, or an error when both atoms are immovable.
#[inline]
pub(crate) fn reduced_mass(a: &Particle, b: &Particle) -> Result<f64> {
    let sum = a.inv_mass + b.inv_mass;
    if sum <= 0.0 {
        return Err(Error::MathError(format!(
            "pair ({}, {}) has two immovable atoms",
            a.index, b.index
        )));
    }
    Ok(1.0 / sum)
}

#[inline]
pub(crate) fn pair_geometry(dr: &[f64; DIM], dv: &[f64; DIM]) -> (f64, f64, f64) {
    (dot(dr, dr), dot(dr, dv), dot(dv, dv))
}

pub(crate) fn arity_mismatch(name: &'static str) -> Error {
    Error::MathError(format!("{name} potential invoked with the wrong number of atoms"))
}
