use super::{arity_mismatch, Arity, Atoms, AtomsMut, Bump, CollisionPotential};
use crate::core::particle::DIM;
use crate::error::{Error, Result};

/// Plane perpendicular to `axis` that particles bounce off elastically.
///
/// The wall has its own position and velocity along the axis and may carry a
/// finite mass driven by a constant `force` (a piston). An immovable wall
/// (infinite mass) keeps its velocity forever; a massive wall recoils on every
/// bump, which changes its trajectory for every particle at once.
///
/// Particles touch the wall when their center is `sigma / 2` away from it,
/// on whichever side they currently are.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingWall {
    axis: usize,
    position: f64,
    velocity: f64,
    force: f64,
    inv_mass: f64,
    sigma: f64,
    impulse: f64,
}

impl MovingWall {
    /// Immovable wall at `position` on `axis`, moving at constant `velocity`.
    pub fn fixed(axis: usize, position: f64, velocity: f64, sigma: f64) -> Result<Self> {
        Self::new(axis, position, velocity, f64::INFINITY, 0.0, sigma)
    }

    /// Wall of finite or infinite `mass` pushed by a constant `force`.
    ///
    /// Errors: `Error::InvalidParam` for an axis outside `0..3`, non-finite
    /// kinematics, a non-positive mass or a negative `sigma`.
    pub fn new(
        axis: usize,
        position: f64,
        velocity: f64,
        mass: f64,
        force: f64,
        sigma: f64,
    ) -> Result<Self> {
        if axis >= DIM {
            return Err(Error::InvalidParam(format!(
                "wall axis must be in [0, {}), got {}",
                DIM, axis
            )));
        }
        if !position.is_finite() || !velocity.is_finite() || !force.is_finite() {
            return Err(Error::InvalidParam(
                "wall position, velocity and force must be finite".into(),
            ));
        }
        if mass.is_nan() || mass <= 0.0 {
            return Err(Error::InvalidParam("wall mass must be > 0".into()));
        }
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(Error::InvalidParam(
                "wall sigma must be finite and >= 0".into(),
            ));
        }
        Ok(Self {
            axis,
            position,
            velocity,
            force,
            inv_mass: 1.0 / mass,
            sigma,
            impulse: 0.0,
        })
    }

    /// Normal axis.
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// Current wall coordinate along its axis.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Current wall velocity along its axis.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Set the wall velocity (piston speed). Any schedule using this wall must be rebuilt.
    pub fn set_velocity(&mut self, velocity: f64) -> Result<()> {
        if !velocity.is_finite() {
            return Err(Error::InvalidParam("wall velocity must be finite".into()));
        }
        self.velocity = velocity;
        Ok(())
    }

    /// Wall mass; infinite for an immovable wall.
    pub fn mass(&self) -> f64 {
        1.0 / self.inv_mass
    }

    /// Acceleration imposed by the driving force.
    pub fn acceleration(&self) -> f64 {
        self.force * self.inv_mass
    }

    /// Total momentum the wall has delivered to particles along its axis.
    pub fn accumulated_impulse(&self) -> f64 {
        self.impulse
    }

    /// Reset the impulse accumulator.
    pub fn clear_impulse(&mut self) {
        self.impulse = 0.0;
    }

    /// Wall position and velocity after `dt` of driven flight.
    #[inline]
    fn state_at(&self, dt: f64) -> (f64, f64) {
        let a = self.acceleration();
        (
            self.position + self.velocity * dt + 0.5 * a * dt * dt,
            self.velocity + a * dt,
        )
    }
}

impl CollisionPotential for MovingWall {
    fn name(&self) -> &'static str {
        "moving-wall"
    }

    fn accepts(&self, arity: Arity) -> bool {
        arity == Arity::One
    }

    fn collision_time(&self, atoms: Atoms<'_>, false_time: f64) -> f64 {
        let Atoms::One(p) = atoms else {
            return f64::INFINITY;
        };
        if p.inv_mass + self.inv_mass <= 0.0 {
            return f64::INFINITY;
        }
        let (xw, vw) = self.state_at(false_time);
        let k = self.axis;
        let dx = p.r[k] + p.v[k] * false_time - xw;
        let dv = p.v[k] - vw;
        let da = -self.acceleration();
        let s = 0.5 * self.sigma;
        let side = if dx >= 0.0 { 1.0 } else { -1.0 };

        if dx.abs() < s {
            // already inside the contact shell
            if dx * dv < 0.0 {
                return -(s - dx.abs()) / dv.abs();
            }
            return f64::INFINITY;
        }

        // dx(t) - side * s = h + dv t + da t^2 / 2; contact on an approaching root
        let h = dx - side * s;
        let approaching = |t: f64| (dv + da * t) * side < 0.0;
        let mut best = f64::INFINITY;
        if da == 0.0 {
            if dv != 0.0 {
                let t = -h / dv;
                if t >= 0.0 && approaching(t) {
                    best = t;
                }
            }
            return best;
        }
        let a2 = 0.5 * da;
        let disc = dv * dv - 4.0 * a2 * h;
        if disc < 0.0 {
            return f64::INFINITY;
        }
        let q = -0.5 * (dv + dv.signum() * disc.sqrt());
        let mut roots = [f64::NAN, f64::NAN];
        if q != 0.0 {
            roots[0] = q / a2;
            roots[1] = h / q;
        } else {
            roots[0] = (-h / a2).max(0.0).sqrt();
        }
        for t in roots {
            if t >= 0.0 && t < best && approaching(t) {
                best = t;
            }
        }
        best
    }

    fn bump(&mut self, atoms: AtomsMut<'_>, false_time: f64) -> Result<Bump> {
        let AtomsMut::One(p) = atoms else {
            return Err(arity_mismatch(self.name()));
        };
        let inv_sum = p.inv_mass + self.inv_mass;
        if inv_sum <= 0.0 {
            return Err(Error::MathError(format!(
                "particle {} and wall are both immovable",
                p.index
            )));
        }
        let k = self.axis;
        let (xw, vw) = self.state_at(false_time);
        let dx = p.r[k] + p.v[k] * false_time - xw;
        let dv = p.v[k] - vw;
        let j = -2.0 * dv / inv_sum;

        let dvp = j * p.inv_mass;
        p.v[k] += dvp;
        p.r[k] -= dvp * false_time;

        let dvw = -j * self.inv_mass;
        self.velocity += dvw;
        self.position -= dvw * false_time;
        self.impulse += j;

        Ok(Bump {
            virial: -j * dx,
            energy_change: 0.0,
            invalidates_all: self.inv_mass > 0.0,
            rescan_only: false,
        })
    }

    fn energy(&self, atoms: Atoms<'_>) -> f64 {
        let Atoms::One(p) = atoms else {
            return 0.0;
        };
        if (p.r[self.axis] - self.position).abs() < 0.5 * self.sigma {
            f64::INFINITY
        } else {
            0.0
        }
    }

    fn advance(&mut self, dt: f64) {
        let (x, v) = self.state_at(dt);
        self.position = x;
        self.velocity = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::particle::Particle;

    #[test]
    fn fixed_wall_reflects_particle() -> Result<()> {
        let mut wall = MovingWall::fixed(0, 0.0, 0.0, 1.0)?;
        let mut p = Particle::new(0, 0, [2.0, 1.0, 1.0], [-1.0, 0.3, 0.0], 1.0)?;
        let t = wall.collision_time(Atoms::One(&p), 0.0);
        assert!((t - 1.5).abs() < 1e-12);

        let out = wall.bump(AtomsMut::One(&mut p), t)?;
        assert_eq!(p.v, [1.0, 0.3, 0.0]);
        assert!((p.position_at(t)[0] - 0.5).abs() < 1e-12);
        assert!((wall.accumulated_impulse() - 2.0).abs() < 1e-12);
        assert!(!out.invalidates_all);
        assert_eq!(wall.velocity(), 0.0);
        Ok(())
    }

    #[test]
    fn particle_on_either_side_is_tracked() -> Result<()> {
        let wall = MovingWall::fixed(1, 5.0, 0.0, 0.0)?;
        let below = Particle::new(0, 0, [1.0, 3.0, 1.0], [0.0, 2.0, 0.0], 1.0)?;
        let above = Particle::new(1, 0, [1.0, 8.0, 1.0], [0.0, 2.0, 0.0], 1.0)?;
        assert!((wall.collision_time(Atoms::One(&below), 0.0) - 1.0).abs() < 1e-12);
        assert!(wall.collision_time(Atoms::One(&above), 0.0).is_infinite());
        Ok(())
    }

    #[test]
    fn moving_piston_meets_resting_particle() -> Result<()> {
        let wall = MovingWall::fixed(0, 10.0, -2.0, 1.0)?;
        let p = Particle::new(0, 0, [4.5, 1.0, 1.0], [0.0; DIM], 1.0)?;
        // wall must travel 10 - 0.5 - 4.5 = 5 at speed 2
        assert!((wall.collision_time(Atoms::One(&p), 0.0) - 2.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn accelerating_wall_prediction() -> Result<()> {
        // a = F/M = 2 toward +x; contact when the wall reaches 2.0: t^2 = 2
        let wall = MovingWall::new(0, 0.0, 0.0, 1.0, 2.0, 1.0)?;
        let p = Particle::new(0, 0, [2.5, 1.0, 1.0], [0.0; DIM], 1.0)?;
        let t = wall.collision_time(Atoms::One(&p), 0.0);
        assert!((t - 2.0_f64.sqrt()).abs() < 1e-12);

        // a receding particle is still caught by the accelerating wall
        let q = Particle::new(1, 0, [2.5, 1.0, 1.0], [0.5, 0.0, 0.0], 1.0)?;
        let tq = wall.collision_time(Atoms::One(&q), 0.0);
        // t^2 - 0.5 t - 2 = 0
        let expected = (0.5 + (0.25_f64 + 8.0).sqrt()) / 2.0;
        assert!((tq - expected).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn massive_wall_recoils_and_invalidates_schedule() -> Result<()> {
        let mut wall = MovingWall::new(0, 0.0, 0.0, 1.0, 0.0, 1.0)?;
        let mut p = Particle::new(0, 0, [0.5, 1.0, 1.0], [-1.0, 0.0, 0.0], 1.0)?;
        let out = wall.bump(AtomsMut::One(&mut p), 0.0)?;
        // equal masses exchange velocities
        assert!(p.v[0].abs() < 1e-12);
        assert!((wall.velocity() + 1.0).abs() < 1e-12);
        assert!(out.invalidates_all);

        wall.advance(1.5);
        assert!((wall.position() + 1.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn overlap_reports_negative_time() -> Result<()> {
        let wall = MovingWall::fixed(2, 0.0, 0.0, 1.0)?;
        let p = Particle::new(0, 0, [1.0, 1.0, 0.25], [0.0, 0.0, -1.0], 1.0)?;
        assert!(wall.collision_time(Atoms::One(&p), 0.0) < 0.0);
        assert!(wall.energy(Atoms::One(&p)).is_infinite());
        Ok(())
    }

    #[test]
    fn invalid_axis_rejected() {
        assert!(MovingWall::fixed(3, 0.0, 0.0, 1.0).is_err());
        assert!(MovingWall::new(0, 0.0, 0.0, 0.0, 0.0, 1.0).is_err());
    }
}
