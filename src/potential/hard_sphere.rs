use super::{
    arity_mismatch, entry_time, exchange, pair_geometry, radial_impulse, reduced_mass,
    separation, Arity, Atoms, AtomsMut, Bump, CollisionPotential,
};
use crate::core::particle::dot;
use crate::error::{Error, Result};

/// Elastic hard spheres of a common contact `diameter`.
#[derive(Debug, Clone, PartialEq)]
pub struct HardSphere {
    diameter: f64,
    sig2: f64,
}

impl HardSphere {
    /// Errors: `Error::InvalidParam` unless `diameter` is finite and >= 0.
    pub fn new(diameter: f64) -> Result<Self> {
        if !diameter.is_finite() || diameter < 0.0 {
            return Err(Error::InvalidParam(
                "hard-sphere diameter must be finite and >= 0".into(),
            ));
        }
        Ok(Self {
            diameter,
            sig2: diameter * diameter,
        })
    }

    /// Contact distance.
    pub fn diameter(&self) -> f64 {
        self.diameter
    }
}

impl CollisionPotential for HardSphere {
    fn name(&self) -> &'static str {
        "hard-sphere"
    }

    fn accepts(&self, arity: Arity) -> bool {
        arity == Arity::Two
    }

    fn collision_time(&self, atoms: Atoms<'_>, false_time: f64) -> f64 {
        let Atoms::Two { a, b, boundary } = atoms else {
            return f64::INFINITY;
        };
        if a.inv_mass + b.inv_mass <= 0.0 {
            return f64::INFINITY;
        }
        let (dr, dv) = separation(a, b, boundary, false_time);
        let (r2, bij, v2) = pair_geometry(&dr, &dv);
        if v2 <= 0.0 {
            return f64::INFINITY;
        }
        entry_time(bij, v2, r2 - self.sig2)
    }

    fn bump(&mut self, atoms: AtomsMut<'_>, false_time: f64) -> Result<Bump> {
        let AtomsMut::Two { a, b, boundary } = atoms else {
            return Err(arity_mismatch(self.name()));
        };
        let (dr, dv) = separation(a, b, boundary, false_time);
        let (r2, bij, _) = pair_geometry(&dr, &dv);
        if r2 <= 0.0 {
            return Err(Error::MathError(format!(
                "degenerate contact normal between particles {} and {}",
                a.index, b.index
            )));
        }
        let mu = reduced_mass(a, b)?;
        let r = r2.sqrt();
        let vr = bij / r;
        let (dp, virial) = radial_impulse(&dr, r, mu, vr, -vr);
        exchange(a, b, &dp, false_time);
        Ok(Bump {
            virial,
            ..Bump::default()
        })
    }

    fn energy(&self, atoms: Atoms<'_>) -> f64 {
        let Atoms::Two { a, b, boundary } = atoms else {
            return 0.0;
        };
        let (dr, _) = separation(a, b, boundary, 0.0);
        if dot(&dr, &dr) < self.sig2 {
            f64::INFINITY
        } else {
            0.0
        }
    }

    fn range(&self) -> f64 {
        self.diameter
    }
}
