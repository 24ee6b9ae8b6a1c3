use crate::core::particle::{dot, Particle, DIM};
use crate::error::{Error, Result};
use rand::{rng, rngs::StdRng, Rng, SeedableRng};

/// Axis-aligned simulation cell with per-axis periodicity.
///
/// The cell spans `[0, L_k)` on every axis. Periodic axes wrap positions and use
/// minimum-image separations; non-periodic axes leave both untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    dims: [f64; DIM],
    periodic: [bool; DIM],
}

impl Boundary {
    /// Create a cell with edge lengths `dims` (each finite and > 0).
    pub fn new(dims: [f64; DIM], periodic: [bool; DIM]) -> Result<Self> {
        if !dims.iter().all(|&l| l.is_finite() && l > 0.0) {
            return Err(Error::InvalidParam(
                "box dimensions must be finite and > 0".into(),
            ));
        }
        Ok(Self { dims, periodic })
    }

    /// Fully periodic cubic-or-not cell.
    pub fn periodic(dims: [f64; DIM]) -> Result<Self> {
        Self::new(dims, [true; DIM])
    }

    /// Cell without any periodic axis.
    pub fn open(dims: [f64; DIM]) -> Result<Self> {
        Self::new(dims, [false; DIM])
    }

    /// Edge lengths.
    pub fn dims(&self) -> [f64; DIM] {
        self.dims
    }

    /// Periodicity flags.
    pub fn periodicity(&self) -> [bool; DIM] {
        self.periodic
    }

    /// Cell volume.
    pub fn volume(&self) -> f64 {
        self.dims.iter().product()
    }

    /// Replace `dr` with its minimum image along the periodic axes.
    #[inline]
    pub fn nearest_image(&self, dr: &mut [f64; DIM]) {
        for k in 0..DIM {
            if self.periodic[k] {
                let l = self.dims[k];
                dr[k] -= l * (dr[k] / l).round();
            }
        }
    }

    /// Fold a position back into the primary cell along the periodic axes.
    #[inline]
    pub fn wrap(&self, r: &mut [f64; DIM]) {
        for k in 0..DIM {
            if self.periodic[k] {
                let l = self.dims[k];
                r[k] -= l * (r[k] / l).floor();
            }
        }
    }
}

/// Ordered, index-stable particle container.
///
/// `Particle::index` always equals the particle's position in the container;
/// removals shift the indices of every later particle.
#[derive(Debug, Clone)]
pub struct ParticleBox {
    boundary: Boundary,
    particles: Vec<Particle>,
}

impl ParticleBox {
    /// Empty container inside `boundary`.
    pub fn new(boundary: Boundary) -> Self {
        Self {
            boundary,
            particles: Vec::new(),
        }
    }

    /// Fill a box with `num_particles` particles of type `kind` and equal `mass`.
    ///
    /// Positions are drawn by rejection sampling so that no two centers are
    /// closer than `diameter` (minimum image) and, on non-periodic axes, every
    /// center keeps `diameter / 2` away from the faces. Velocity components are
    /// uniform in [-1, 1]. `seed = None` draws a seed from the thread RNG.
    pub fn random(
        boundary: Boundary,
        num_particles: usize,
        kind: usize,
        diameter: f64,
        mass: f64,
        seed: Option<u64>,
    ) -> Result<Self> {
        if num_particles == 0 {
            return Err(Error::InvalidParam("num_particles must be > 0".into()));
        }
        if !diameter.is_finite() || diameter < 0.0 {
            return Err(Error::InvalidParam(
                "diameter must be finite and >= 0".into(),
            ));
        }
        let dims = boundary.dims();
        let periodic = boundary.periodicity();
        for k in 0..DIM {
            if !periodic[k] && dims[k] < diameter {
                return Err(Error::InvalidParam(
                    "box must be at least one diameter wide on closed axes".into(),
                ));
            }
        }

        let mut rng: StdRng = match seed {
            Some(s) => SeedableRng::seed_from_u64(s),
            None => SeedableRng::seed_from_u64(rng().random()),
        };

        let mut out = Self::new(boundary);
        let radius = 0.5 * diameter;
        let max_attempts = 1_000_000usize;
        for id in 0..num_particles {
            let mut attempts = 0usize;
            let r = loop {
                if attempts >= max_attempts {
                    return Err(Error::InvalidParam(format!(
                        "failed to place particle {} without overlap; try fewer particles or a smaller diameter",
                        id
                    )));
                }
                attempts += 1;
                let mut r = [0.0_f64; DIM];
                for (k, r_k) in r.iter_mut().enumerate() {
                    let (lo, hi) = if periodic[k] {
                        (0.0, dims[k])
                    } else {
                        (radius, dims[k] - radius)
                    };
                    *r_k = if hi > lo { rng.random_range(lo..hi) } else { lo };
                }
                if !out.overlaps_existing(&r, diameter) {
                    break r;
                }
            };

            let mut v = [0.0_f64; DIM];
            v.iter_mut().for_each(|x| *x = rng.random_range(-1.0..=1.0));
            out.push(kind, r, v, mass)?;
        }
        Ok(out)
    }

    /// The cell.
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True if the container holds no particle.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Particles in index order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable access to particles. Callers owning a schedule must rebuild it afterwards.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Particle at `index`.
    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.particles.get(index)
    }

    /// Append a particle; returns its index.
    pub fn push(&mut self, kind: usize, r: [f64; DIM], v: [f64; DIM], mass: f64) -> Result<usize> {
        let index = self.particles.len();
        let mut r = r;
        self.boundary.wrap(&mut r);
        self.particles.push(Particle::new(index, kind, r, v, mass)?);
        Ok(index)
    }

    /// Remove the particle at `index`, renumbering every later particle.
    pub fn remove(&mut self, index: usize) -> Result<Particle> {
        if index >= self.particles.len() {
            return Err(Error::InvalidParam(format!(
                "particle index {} out of range (N = {})",
                index,
                self.particles.len()
            )));
        }
        let removed = self.particles.remove(index);
        for (i, p) in self.particles.iter_mut().enumerate().skip(index) {
            p.index = i;
        }
        Ok(removed)
    }

    /// Particle at `index`, borrowed mutably.
    pub fn particle_mut(&mut self, index: usize) -> Result<&mut Particle> {
        let n = self.particles.len();
        self.particles.get_mut(index).ok_or_else(|| {
            Error::InvalidParam(format!("particle index {} out of range (N = {})", index, n))
        })
    }

    /// Two distinct particles, in the requested order, borrowed mutably with the cell.
    pub fn pair_mut(
        &mut self,
        i: usize,
        j: usize,
    ) -> Result<(&mut Particle, &mut Particle, &Boundary)> {
        let n = self.particles.len();
        if i == j || i >= n || j >= n {
            return Err(Error::InvalidParam(format!(
                "invalid particle pair ({}, {}) for N = {}",
                i, j, n
            )));
        }
        let boundary = &self.boundary;
        if i < j {
            let (lo, hi) = self.particles.split_at_mut(j);
            Ok((&mut lo[i], &mut hi[0], boundary))
        } else {
            let (lo, hi) = self.particles.split_at_mut(i);
            Ok((&mut hi[0], &mut lo[j], boundary))
        }
    }

    /// Ballistic flight of every particle over `dt`, folded back into the cell.
    pub fn drift_all(&mut self, dt: f64) {
        for p in &mut self.particles {
            for k in 0..DIM {
                p.r[k] += p.v[k] * dt;
            }
            self.boundary.wrap(&mut p.r);
        }
    }

    /// Total kinetic energy.
    pub fn kinetic_energy(&self) -> f64 {
        self.particles.iter().map(|p| p.kinetic_energy()).sum()
    }

    /// Total momentum.
    pub fn momentum(&self) -> [f64; DIM] {
        let mut total = [0.0; DIM];
        for p in &self.particles {
            for (t, pk) in total.iter_mut().zip(p.momentum()) {
                *t += pk;
            }
        }
        total
    }

    /// Number of particles with finite mass.
    pub fn mobile_count(&self) -> usize {
        self.particles.iter().filter(|p| p.inv_mass > 0.0).count()
    }

    /// Kinetic temperature 2K / (D N) over finite-mass particles (k_B = 1).
    pub fn temperature(&self) -> f64 {
        let n = self.mobile_count();
        if n == 0 {
            return 0.0;
        }
        2.0 * self.kinetic_energy() / ((DIM * n) as f64)
    }

    fn overlaps_existing(&self, r: &[f64; DIM], diameter: f64) -> bool {
        let min_sq = diameter * diameter;
        self.particles.iter().any(|p| {
            let mut d = [0.0_f64; DIM];
            for ((dk, &rk), &pk) in d.iter_mut().zip(r.iter()).zip(p.r.iter()) {
                *dk = rk - pk;
            }
            self.boundary.nearest_image(&mut d);
            dot(&d, &d) < min_sq
        })
    }
}
