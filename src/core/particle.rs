use crate::error::{Error, Result};

/// Fixed spatial dimension (3D).
pub const DIM: usize = 3;

/// A hard-body particle in D=3.
///
/// Fields:
/// - `index`: stable ordinal; defines the total order used by the collision scans
/// - `kind`: type tag used to look up the potentials acting on this particle
/// - `r`: position vector [x, y, z]
/// - `v`: velocity vector [vx, vy, vz]
/// - `inv_mass`: inverse mass (0 for an immovable particle)
/// - `collision_count`: incremented each time the particle participates in a resolved event
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Ordinal index inside the owning container.
    pub index: usize,
    /// Type tag.
    pub kind: usize,
    /// Position (x, y, z).
    pub r: [f64; DIM],
    /// Velocity (vx, vy, vz).
    pub v: [f64; DIM],
    /// Inverse mass (>= 0).
    pub inv_mass: f64,
    /// Resolved-event participation counter.
    pub collision_count: u64,
}

impl Particle {
    /// Create a new particle after validating invariants.
    ///
    /// `mass` may be `f64::INFINITY`, which yields an immovable particle.
    ///
    /// Errors:
    /// - `Error::InvalidParam` if `mass` is non-positive or NaN, or any component is NaN/inf.
    pub fn new(index: usize, kind: usize, r: [f64; DIM], v: [f64; DIM], mass: f64) -> Result<Self> {
        if mass.is_nan() || mass <= 0.0 {
            return Err(Error::InvalidParam("mass must be > 0".into()));
        }
        if !r.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("position must be finite".into()));
        }
        if !v.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("velocity must be finite".into()));
        }
        Ok(Self {
            index,
            kind,
            r,
            v,
            inv_mass: 1.0 / mass,
            collision_count: 0,
        })
    }

    /// Mass of the particle (`f64::INFINITY` when immovable).
    #[inline]
    pub fn mass(&self) -> f64 {
        if self.inv_mass == 0.0 {
            f64::INFINITY
        } else {
            1.0 / self.inv_mass
        }
    }

    /// Increment the collision counter.
    #[inline]
    pub fn bump_collision_count(&mut self) {
        self.collision_count = self.collision_count.saturating_add(1);
    }

    /// Kinetic energy 1/2 m |v|^2; immovable particles contribute nothing.
    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        if self.inv_mass == 0.0 {
            return 0.0;
        }
        let vsq: f64 = self.v.iter().map(|&c| c * c).sum();
        0.5 * vsq / self.inv_mass
    }

    /// Momentum m v; zero for immovable particles.
    #[inline]
    pub fn momentum(&self) -> [f64; DIM] {
        let mut p = [0.0; DIM];
        if self.inv_mass > 0.0 {
            for (pk, &vk) in p.iter_mut().zip(self.v.iter()) {
                *pk = vk / self.inv_mass;
            }
        }
        p
    }

    /// Position extrapolated by ballistic flight over `dt`.
    #[inline]
    pub fn position_at(&self, dt: f64) -> [f64; DIM] {
        let mut r = self.r;
        for (rk, &vk) in r.iter_mut().zip(self.v.iter()) {
            *rk += vk * dt;
        }
        r
    }

    /// Set position (validated as finite).
    pub fn set_position(&mut self, r: [f64; DIM]) -> Result<()> {
        if !r.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("position must be finite".into()));
        }
        self.r = r;
        Ok(())
    }

    /// Set velocity (validated as finite).
    pub fn set_velocity(&mut self, v: [f64; DIM]) -> Result<()> {
        if !v.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam("velocity must be finite".into()));
        }
        self.v = v;
        Ok(())
    }
}

#[inline]
pub(crate) fn dot(a: &[f64; DIM], b: &[f64; DIM]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
