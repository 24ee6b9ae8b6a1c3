use std::sync::{Mutex, MutexGuard};

use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::EngineConfig;
use crate::core::particle::DIM;
use crate::core::{Boundary, Engine, ParticleBox};
use crate::potential::{HardSphere, MovingWall, Potential, PotentialId, PotentialMap};

fn py_err<E: ToString>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Python-facing wrapper around a single-species hard-sphere [`Engine`].
///
/// API:
/// - __new__(num_particles, box_size, diameter=1.0, mass=1.0, periodic=True, seed=None, config=None)
/// - reset(), do_step(t_step) -> int, elapsed_time()
/// - get/set_positions, get/set_velocities as np.ndarray of shape (N, 3)
/// - add_wall(axis, position, velocity=0.0, mass=None, sigma=0.0) -> wall id
/// - get_wall_impulse(wall_id)
#[pyclass]
pub struct HardSim {
    engine: Mutex<Engine>,
}

impl HardSim {
    fn engine(&self) -> PyResult<MutexGuard<'_, Engine>> {
        self.engine.lock().map_err(py_err)
    }

    fn engine_mut(&mut self) -> PyResult<&mut Engine> {
        self.engine.get_mut().map_err(py_err)
    }
}

fn to_array(n: usize, rows: impl Iterator<Item = [f64; DIM]>) -> Array2<f64> {
    let mut arr = Array2::<f64>::zeros((n, DIM));
    for (i, row) in rows.enumerate() {
        for k in 0..DIM {
            arr[[i, k]] = row[k];
        }
    }
    arr
}

fn read_rows(arr: &PyReadonlyArray2<'_, f64>, n: usize, what: &str) -> PyResult<Vec<[f64; DIM]>> {
    let a = arr.as_array();
    if a.shape() != [n, DIM] {
        return Err(py_err(format!(
            "{} must have shape ({}, {}), got {:?}",
            what,
            n,
            DIM,
            a.shape()
        )));
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let mut row = [0.0; DIM];
        for (k, x) in row.iter_mut().enumerate() {
            *x = a[[i, k]];
            if !x.is_finite() {
                return Err(py_err(format!("{} values must be finite", what)));
            }
        }
        out.push(row);
    }
    Ok(out)
}

#[pymethods]
impl HardSim {
    /// Fill a box with non-overlapping hard spheres and build the schedule.
    ///
    /// `config` is an optional JSON document for the engine settings.
    #[new]
    #[pyo3(signature = (num_particles, box_size, diameter=1.0, mass=1.0, periodic=true, seed=None, config=None))]
    fn new(
        num_particles: usize,
        box_size: Vec<f64>,
        diameter: f64,
        mass: f64,
        periodic: bool,
        seed: Option<u64>,
        config: Option<&str>,
    ) -> PyResult<Self> {
        let dims: [f64; DIM] = box_size
            .as_slice()
            .try_into()
            .map_err(|_| py_err(format!("box_size must have length {}", DIM)))?;
        let boundary = Boundary::new(dims, [periodic; DIM]).map_err(py_err)?;
        let space = ParticleBox::random(boundary, num_particles, 0, diameter, mass, seed)
            .map_err(py_err)?;
        let mut potentials = PotentialMap::new(1);
        potentials
            .add_pair(0, 0, HardSphere::new(diameter).map_err(py_err)?)
            .map_err(py_err)?;
        let config = match config {
            Some(s) => EngineConfig::from_json_str(s).map_err(py_err)?,
            None => EngineConfig::default(),
        };
        let mut engine = Engine::new(space, potentials, config).map_err(py_err)?;
        engine.reset().map_err(py_err)?;
        Ok(Self {
            engine: Mutex::new(engine),
        })
    }

    /// Rebuild the schedule; also clears a halted engine.
    fn reset(&mut self) -> PyResult<()> {
        self.engine_mut()?.reset().map_err(py_err)
    }

    /// Advance by `t_step` (releases the GIL); returns the number of events resolved.
    fn do_step(&mut self, py: Python<'_>, t_step: f64) -> PyResult<usize> {
        let engine = self.engine_mut()?;
        py.detach(|| engine.do_step(t_step)).map_err(py_err)
    }

    fn elapsed_time(&self) -> PyResult<f64> {
        Ok(self.engine()?.elapsed_time())
    }

    fn collision_count(&self) -> PyResult<u64> {
        Ok(self.engine()?.collision_count())
    }

    fn kinetic_energy(&self) -> PyResult<f64> {
        Ok(self.engine()?.kinetic_energy())
    }

    fn temperature(&self) -> PyResult<f64> {
        Ok(self.engine()?.temperature())
    }

    /// Positions as a NumPy array of shape (N, 3), dtype=float64.
    fn get_positions(&self, py: Python<'_>) -> PyResult<Py<PyArray2<f64>>> {
        let engine = self.engine()?;
        let ps = engine.space().particles();
        let arr = to_array(ps.len(), ps.iter().map(|p| p.r));
        Ok(arr.into_pyarray(py).unbind())
    }

    /// Velocities as a NumPy array of shape (N, 3), dtype=float64.
    fn get_velocities(&self, py: Python<'_>) -> PyResult<Py<PyArray2<f64>>> {
        let engine = self.engine()?;
        let ps = engine.space().particles();
        let arr = to_array(ps.len(), ps.iter().map(|p| p.v));
        Ok(arr.into_pyarray(py).unbind())
    }

    /// Replace every position and rebuild the schedule.
    fn set_positions(&mut self, positions: PyReadonlyArray2<'_, f64>) -> PyResult<()> {
        let engine = self.engine_mut()?;
        let rows = read_rows(&positions, engine.space().len(), "positions")?;
        let space = engine.space_mut();
        for (i, r) in rows.into_iter().enumerate() {
            let mut r = r;
            space.boundary().wrap(&mut r);
            space.particles_mut()[i].set_position(r).map_err(py_err)?;
        }
        engine.reset().map_err(py_err)
    }

    /// Replace every velocity and rebuild the schedule.
    fn set_velocities(&mut self, velocities: PyReadonlyArray2<'_, f64>) -> PyResult<()> {
        let engine = self.engine_mut()?;
        let rows = read_rows(&velocities, engine.space().len(), "velocities")?;
        let space = engine.space_mut();
        for (i, v) in rows.into_iter().enumerate() {
            space.particles_mut()[i].set_velocity(v).map_err(py_err)?;
        }
        engine.reset().map_err(py_err)
    }

    /// Add a planar wall normal to `axis`; `mass=None` makes it immovable.
    ///
    /// Returns the wall id used by `get_wall_impulse`.
    #[pyo3(signature = (axis, position, velocity=0.0, mass=None, sigma=0.0))]
    fn add_wall(
        &mut self,
        axis: usize,
        position: f64,
        velocity: f64,
        mass: Option<f64>,
        sigma: f64,
    ) -> PyResult<usize> {
        let wall = match mass {
            Some(m) => MovingWall::new(axis, position, velocity, m, 0.0, sigma),
            None => MovingWall::fixed(axis, position, velocity, sigma),
        }
        .map_err(py_err)?;
        let engine = self.engine_mut()?;
        let id = engine
            .potentials_mut()
            .add_single(&[0], wall)
            .map_err(py_err)?;
        engine.reset().map_err(py_err)?;
        Ok(id.0)
    }

    /// Total impulse the gas has delivered to a wall along its axis.
    fn get_wall_impulse(&self, wall_id: usize) -> PyResult<f64> {
        let engine = self.engine()?;
        match engine.potentials().get(PotentialId(wall_id)) {
            Some(Potential::MovingWall(w)) => Ok(w.accumulated_impulse()),
            _ => Err(py_err(format!("{} is not a wall id", wall_id))),
        }
    }
}

/// The hardsim Python module entry point.
#[pymodule]
fn hardsim(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<HardSim>()?;
    Ok(())
}
