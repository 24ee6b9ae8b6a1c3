use super::{
    arity_mismatch, entry_time, exchange, exit_time, pair_geometry, radial_impulse,
    reduced_mass, separation, Arity, Atoms, AtomsMut, Bump, CollisionPotential,
};
use crate::core::particle::{dot, Particle};
use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// Relative band around the squared well edge where geometry alone cannot
/// tell inside from outside.
const EDGE_TOLERANCE: f64 = 1e-10;

/// Hard core of diameter `core` surrounded by an attractive well of depth
/// `epsilon` reaching out to `lambda * core`.
///
/// Whether a pair sits inside the well is tracked explicitly (the bonding
/// state) instead of being re-derived from a distance that is numerically
/// ambiguous right at the well edge. Crossing into the well binds the pair and
/// releases `epsilon` as kinetic energy; leaving it costs `epsilon`, and a pair
/// without enough radial kinetic energy is reflected back inside.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareWell {
    core: f64,
    well: f64,
    epsilon: f64,
    core2: f64,
    well2: f64,
    bonded: BTreeSet<(usize, usize)>,
}

#[inline]
fn key(a: &Particle, b: &Particle) -> (usize, usize) {
    (a.index.min(b.index), a.index.max(b.index))
}

impl SquareWell {
    /// Errors: `Error::InvalidParam` unless `core >= 0`, `lambda > 1` and `epsilon >= 0` (all finite).
    pub fn new(core: f64, lambda: f64, epsilon: f64) -> Result<Self> {
        if !core.is_finite() || core < 0.0 {
            return Err(Error::InvalidParam(
                "square-well core must be finite and >= 0".into(),
            ));
        }
        if !lambda.is_finite() || lambda <= 1.0 {
            return Err(Error::InvalidParam(
                "square-well lambda must be finite and > 1".into(),
            ));
        }
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(Error::InvalidParam(
                "square-well epsilon must be finite and >= 0".into(),
            ));
        }
        let well = core * lambda;
        Ok(Self {
            core,
            well,
            epsilon,
            core2: core * core,
            well2: well * well,
            bonded: BTreeSet::new(),
        })
    }

    /// Core diameter.
    pub fn core(&self) -> f64 {
        self.core
    }

    /// Outer well diameter.
    pub fn well(&self) -> f64 {
        self.well
    }

    /// Well depth.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// True if the pair `(i, j)` is currently inside the well.
    pub fn is_bonded(&self, i: usize, j: usize) -> bool {
        self.bonded.contains(&(i.min(j), i.max(j)))
    }

    /// Number of bound pairs.
    pub fn bond_count(&self) -> usize {
        self.bonded.len()
    }
}

impl CollisionPotential for SquareWell {
    fn name(&self) -> &'static str {
        "square-well"
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
        if self.bonded.contains(&key(a, b)) {
            let t_core = entry_time(bij, v2, r2 - self.core2);
            if t_core.is_finite() {
                return t_core;
            }
            // overshoot past the edge resolves immediately
            exit_time(bij, v2, r2 - self.well2).max(0.0)
        } else {
            entry_time(bij, v2, r2 - self.well2).max(0.0)
        }
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
        let k = key(a, b);

        let mut energy_change = 0.0;
        let vr_new = if 2.0 * r2 < self.core2 + self.well2 {
            // core collision
            -vr
        } else if self.bonded.contains(&k) {
            let radial_ke = 0.5 * mu * vr * vr;
            if radial_ke < self.epsilon {
                -vr
            } else {
                self.bonded.remove(&k);
                energy_change = self.epsilon;
                (vr * vr - 2.0 * self.epsilon / mu).max(0.0).sqrt()
            }
        } else {
            self.bonded.insert(k);
            energy_change = -self.epsilon;
            -(vr * vr + 2.0 * self.epsilon / mu).sqrt()
        };

        let (dp, virial) = radial_impulse(&dr, r, mu, vr, vr_new);
        exchange(a, b, &dp, false_time);
        Ok(Bump {
            virial,
            energy_change,
            ..Bump::default()
        })
    }

    fn energy(&self, atoms: Atoms<'_>) -> f64 {
        let Atoms::Two { a, b, boundary } = atoms else {
            return 0.0;
        };
        let (dr, _) = separation(a, b, boundary, 0.0);
        if dot(&dr, &dr) < self.core2 {
            f64::INFINITY
        } else if self.bonded.contains(&key(a, b)) {
            -self.epsilon
        } else {
            0.0
        }
    }

    fn range(&self) -> f64 {
        self.well
    }

    fn clear_state(&mut self) {
        self.bonded.clear();
    }

    /// A pair sitting on the edge is inside when it is moving inward: it was
    /// just captured or reflected, and an escaping pair is already moving out.
    fn refresh(&mut self, atoms: Atoms<'_>) {
        let Atoms::Two { a, b, boundary } = atoms else {
            return;
        };
        let (dr, dv) = separation(a, b, boundary, 0.0);
        let (r2, bij, _) = pair_geometry(&dr, &dv);
        let inside = if (r2 - self.well2).abs() <= EDGE_TOLERANCE * self.well2 {
            bij < 0.0
        } else {
            r2 < self.well2
        };
        if inside {
            self.bonded.insert(key(a, b));
        } else {
            self.bonded.remove(&key(a, b));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::space::Boundary;

    fn line_pair(x: f64, closing: f64) -> Result<(Particle, Particle)> {
        Ok((
            Particle::new(0, 0, [5.0, 5.0, 5.0], [0.5 * closing, 0.0, 0.0], 1.0)?,
            Particle::new(1, 0, [5.0 + x, 5.0, 5.0], [-0.5 * closing, 0.0, 0.0], 1.0)?,
        ))
    }

    fn kinetic(a: &Particle, b: &Particle) -> f64 {
        a.kinetic_energy() + b.kinetic_energy()
    }

    #[test]
    fn parameters_validated() {
        assert!(SquareWell::new(1.0, 1.0, 1.0).is_err());
        assert!(SquareWell::new(1.0, 1.5, -1.0).is_err());
        assert!(SquareWell::new(-1.0, 1.5, 1.0).is_err());
    }

    #[test]
    fn outside_pair_targets_well_edge() -> Result<()> {
        let bnd = Boundary::open([20.0, 20.0, 20.0])?;
        let sw = SquareWell::new(1.0, 1.5, 0.5)?;
        let (a, b) = line_pair(3.0, 1.0)?;
        let t = sw.collision_time(
            Atoms::Two {
                a: &a,
                b: &b,
                boundary: &bnd,
            },
            0.0,
        );
        assert!((t - 1.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn capture_releases_well_depth() -> Result<()> {
        let bnd = Boundary::open([20.0, 20.0, 20.0])?;
        let mut sw = SquareWell::new(1.0, 1.5, 0.5)?;
        let (mut a, mut b) = line_pair(1.5, 1.0)?;
        let ke0 = kinetic(&a, &b);
        let out = sw.bump(
            AtomsMut::Two {
                a: &mut a,
                b: &mut b,
                boundary: &bnd,
            },
            0.0,
        )?;
        assert!(sw.is_bonded(0, 1));
        assert!((out.energy_change + 0.5).abs() < 1e-12);
        assert!((kinetic(&a, &b) - ke0 - 0.5).abs() < 1e-12);
        // still approaching, now faster
        assert!(b.v[0] - a.v[0] < -1.0);
        Ok(())
    }

    #[test]
    fn bonded_pair_without_energy_is_reflected() -> Result<()> {
        let bnd = Boundary::open([20.0, 20.0, 20.0])?;
        let mut sw = SquareWell::new(1.0, 1.5, 0.5)?;
        // receding at 1 from the inside edge: radial KE 0.25 < 0.5
        let (mut a, mut b) = line_pair(1.5, -1.0)?;
        sw.bonded.insert((0, 1));
        let ke0 = kinetic(&a, &b);
        let out = sw.bump(
            AtomsMut::Two {
                a: &mut a,
                b: &mut b,
                boundary: &bnd,
            },
            0.0,
        )?;
        assert!(sw.is_bonded(0, 1));
        assert_eq!(out.energy_change, 0.0);
        assert!((kinetic(&a, &b) - ke0).abs() < 1e-12);
        assert!(b.v[0] - a.v[0] < 0.0);
        Ok(())
    }

    #[test]
    fn bonded_pair_with_energy_escapes() -> Result<()> {
        let bnd = Boundary::open([20.0, 20.0, 20.0])?;
        let mut sw = SquareWell::new(1.0, 1.5, 0.5)?;
        // receding at sqrt(3): radial KE 0.75 >= 0.5
        let (mut a, mut b) = line_pair(1.5, -(3.0_f64).sqrt())?;
        sw.bonded.insert((0, 1));
        let ke0 = kinetic(&a, &b);
        let out = sw.bump(
            AtomsMut::Two {
                a: &mut a,
                b: &mut b,
                boundary: &bnd,
            },
            0.0,
        )?;
        assert!(!sw.is_bonded(0, 1));
        assert!((out.energy_change - 0.5).abs() < 1e-12);
        assert!((ke0 - kinetic(&a, &b) - 0.5).abs() < 1e-12);
        assert!((b.v[0] - a.v[0] - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn bonded_pair_heads_for_core_or_edge() -> Result<()> {
        let bnd = Boundary::open([20.0, 20.0, 20.0])?;
        let mut sw = SquareWell::new(1.0, 1.5, 0.5)?;
        let (a, b) = line_pair(1.2, 1.0)?;
        sw.refresh(Atoms::Two {
            a: &a,
            b: &b,
            boundary: &bnd,
        });
        assert!(sw.is_bonded(0, 1));
        let atoms = Atoms::Two {
            a: &a,
            b: &b,
            boundary: &bnd,
        };
        assert!((sw.collision_time(atoms, 0.0) - 0.2).abs() < 1e-12);
        assert_eq!(sw.energy(atoms), -0.5);

        let (c, d) = line_pair(1.2, -1.0)?;
        let receding = Atoms::Two {
            a: &c,
            b: &d,
            boundary: &bnd,
        };
        assert!((sw.collision_time(receding, 0.0) - 0.3).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn refresh_at_the_edge_follows_the_velocity() -> Result<()> {
        let bnd = Boundary::open([20.0, 20.0, 20.0])?;
        let mut sw = SquareWell::new(1.0, 1.5, 0.5)?;
        let (a, b) = line_pair(1.5 + 1e-12, 2.0)?;
        sw.refresh(Atoms::Two {
            a: &a,
            b: &b,
            boundary: &bnd,
        });
        assert!(sw.is_bonded(0, 1));

        let (c, d) = line_pair(1.5 - 1e-12, -2.0)?;
        sw.refresh(Atoms::Two {
            a: &c,
            b: &d,
            boundary: &bnd,
        });
        assert!(!sw.is_bonded(0, 1));

        // away from the edge position decides, whatever the motion
        let (e, f) = line_pair(1.4, -2.0)?;
        sw.refresh(Atoms::Two {
            a: &e,
            b: &f,
            boundary: &bnd,
        });
        assert!(sw.is_bonded(0, 1));
        assert_eq!(sw.range(), 1.5);
        Ok(())
    }

    #[test]
    fn clear_state_forgets_bonds() -> Result<()> {
        let bnd = Boundary::open([20.0, 20.0, 20.0])?;
        let mut sw = SquareWell::new(1.0, 1.5, 0.5)?;
        let (a, b) = line_pair(1.2, 0.0)?;
        sw.refresh(Atoms::Two {
            a: &a,
            b: &b,
            boundary: &bnd,
        });
        assert_eq!(sw.bond_count(), 1);
        sw.clear_state();
        assert_eq!(sw.bond_count(), 0);
        Ok(())
    }
}
