use super::{arity_mismatch, Arity, Atoms, AtomsMut, Bump, CollisionPotential};
use crate::core::particle::DIM;
use crate::core::space::Boundary;
use crate::error::{Error, Result};

/// Crossings closer than this fraction of a lattice spacing count as already made.
const PLANE_SLACK: f64 = 1e-9;

/// One-body pseudo-potential that re-evaluates a particle's predictions in a
/// periodic cell.
///
/// Pair predictions only follow the minimum image at the time they were
/// made. Another image starts at least half a cell away along some axis, so
/// it cannot come within interaction range before the pair has moved
/// `L/2 - range` relative to each other. Each periodic axis is cut by evenly
/// spaced planes no more than a third of that distance apart, and the guard
/// fires whenever a particle crosses one. The crossing bumps nothing; the
/// engine rescans the particle against everything, so no pair ever travels
/// far enough on a stale image to miss a contact.
///
/// The planes divide the cell exactly, which keeps crossing times independent
/// of when the particle was last wrapped or rescanned.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicImage {
    spacing: [f64; DIM],
}

impl PeriodicImage {
    /// Guard planes for `boundary` and pair potentials reaching at most `range`.
    ///
    /// Errors: `Error::InvalidParam` if a periodic axis is not longer than
    /// twice `range`, since a pair could then touch through two images at once.
    pub fn new(boundary: &Boundary, range: f64) -> Result<Self> {
        if !range.is_finite() || range < 0.0 {
            return Err(Error::InvalidParam(format!(
                "interaction range must be finite and >= 0, got {}",
                range
            )));
        }
        let dims = boundary.dims();
        let periodic = boundary.periodicity();
        let mut spacing = [f64::INFINITY; DIM];
        for k in 0..DIM {
            if !periodic[k] {
                continue;
            }
            let free = 0.5 * dims[k] - range;
            if free <= 0.0 {
                return Err(Error::InvalidParam(format!(
                    "periodic axis {} of length {} is too short for interaction range {}",
                    k, dims[k], range
                )));
            }
            let planes = (3.0 * dims[k] / free).ceil();
            spacing[k] = dims[k] / planes;
        }
        Ok(Self { spacing })
    }

    /// Distance between guard planes per axis; infinite on closed axes.
    pub fn spacing(&self) -> [f64; DIM] {
        self.spacing
    }

    /// True if at least one axis carries guard planes.
    pub fn is_active(&self) -> bool {
        self.spacing.iter().any(|s| s.is_finite())
    }
}

impl CollisionPotential for PeriodicImage {
    fn name(&self) -> &'static str {
        "periodic-image"
    }

    fn accepts(&self, arity: Arity) -> bool {
        arity == Arity::One
    }

    fn collision_time(&self, atoms: Atoms<'_>, false_time: f64) -> f64 {
        let Atoms::One(p) = atoms else {
            return f64::INFINITY;
        };
        let mut best = f64::INFINITY;
        for k in 0..DIM {
            let (d, v) = (self.spacing[k], p.v[k]);
            if !d.is_finite() || v == 0.0 {
                continue;
            }
            let u = (p.r[k] + v * false_time) / d;
            let plane = if v > 0.0 {
                (u + PLANE_SLACK).floor() + 1.0
            } else {
                (u - PLANE_SLACK).ceil() - 1.0
            };
            let t = ((plane - u) * d / v).max(0.0);
            best = best.min(t);
        }
        best
    }

    fn bump(&mut self, atoms: AtomsMut<'_>, _false_time: f64) -> Result<Bump> {
        if !matches!(atoms, AtomsMut::One(_)) {
            return Err(arity_mismatch(self.name()));
        }
        Ok(Bump {
            rescan_only: true,
            ..Bump::default()
        })
    }

    fn energy(&self, _atoms: Atoms<'_>) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::particle::Particle;

    #[test]
    fn planes_divide_the_cell() -> Result<()> {
        let guard = PeriodicImage::new(&Boundary::new([10.0, 4.0, 10.0], [true, true, false])?, 1.0)?;
        let s = guard.spacing();
        // free span 4 → at most 4/3 → 8 planes
        assert!((s[0] - 1.25).abs() < 1e-12);
        // free span 1 → at most 1/3 → 12 planes
        assert!((s[1] - 4.0 / 12.0).abs() < 1e-12);
        assert!(s[2].is_infinite());
        assert!(guard.is_active());
        assert!(!PeriodicImage::new(&Boundary::open([3.0; 3])?, 5.0)?.is_active());
        Ok(())
    }

    #[test]
    fn short_periodic_axis_rejected() -> Result<()> {
        let b = Boundary::periodic([2.0, 10.0, 10.0])?;
        assert!(matches!(PeriodicImage::new(&b, 1.0), Err(Error::InvalidParam(_))));
        Ok(())
    }

    #[test]
    fn fires_at_the_next_plane_ahead() -> Result<()> {
        let guard = PeriodicImage::new(&Boundary::periodic([10.0; 3])?, 1.0)?;
        let forward = Particle::new(0, 0, [5.0, 5.0, 5.0], [1.0, 0.0, 0.0], 1.0)?;
        assert!((guard.collision_time(Atoms::One(&forward), 0.0) - 1.25).abs() < 1e-12);
        let back = Particle::new(0, 0, [5.0, 5.0, 5.0], [0.0, -2.0, 0.0], 1.0)?;
        assert!((guard.collision_time(Atoms::One(&back), 0.0) - 0.625).abs() < 1e-12);
        let still = Particle::new(0, 0, [5.0, 5.0, 5.0], [0.0; DIM], 1.0)?;
        assert!(guard.collision_time(Atoms::One(&still), 0.0).is_infinite());
        Ok(())
    }

    #[test]
    fn crossing_just_made_is_not_repeated() -> Result<()> {
        let guard = PeriodicImage::new(&Boundary::periodic([10.0; 3])?, 1.0)?;
        let p = Particle::new(0, 0, [6.25 - 1e-13, 5.0, 5.0], [1.0, 0.0, 0.0], 1.0)?;
        let t = guard.collision_time(Atoms::One(&p), 0.0);
        assert!((t - 1.25).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn bump_leaves_the_particle_alone() -> Result<()> {
        let mut guard = PeriodicImage::new(&Boundary::periodic([10.0; 3])?, 1.0)?;
        let mut p = Particle::new(0, 0, [5.0, 5.0, 5.0], [1.0, 2.0, 3.0], 1.0)?;
        let out = guard.bump(AtomsMut::One(&mut p), 0.0)?;
        assert!(out.rescan_only);
        assert_eq!(out.energy_change, 0.0);
        assert_eq!(p.v, [1.0, 2.0, 3.0]);
        Ok(())
    }
}
