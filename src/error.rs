use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Renders an optional partner index for diagnostics (`-` for one-body events).
fn partner_label(partner: &Option<usize>) -> String {
    match partner {
        Some(j) => j.to_string(),
        None => "-".to_string(),
    }
}

/// Error type for the hard-body engine.
///
/// Every scheduling failure carries the offending collider, partner and
/// potential so the run can be diagnosed after it aborts. None of the
/// scheduling variants are recovered internally: once returned from
/// `Engine::do_step` the engine is halted until the next successful reset.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Numerical or geometric issue (degenerate contact normal, infinite masses on both sides).
    #[error("numerical error: {0}")]
    MathError(String),

    /// A resolved collision time was negative or NaN outside the overlap-tolerance path.
    #[error(
        "scheduling inconsistency: time {time} for particle {collider} with partner {} via {potential}",
        partner_label(.partner)
    )]
    SchedulingInconsistency {
        time: f64,
        collider: usize,
        partner: Option<usize>,
        potential: &'static str,
    },

    /// Interpenetrating, approaching atoms while overlaps are not tolerated.
    #[error(
        "overlap: particle {collider} with partner {} via {potential} (predicted time {time})",
        partner_label(.partner)
    )]
    Overlap {
        collider: usize,
        partner: Option<usize>,
        potential: &'static str,
        time: f64,
    },

    /// The collision cascade inside one step did not terminate within the event cap.
    #[error(
        "unresolved cascade: {events} events in one step without consuming it; last event particle {collider} with partner {} via {potential} at elapsed time {elapsed}",
        partner_label(.partner)
    )]
    UnresolvedCascade {
        events: usize,
        collider: usize,
        partner: Option<usize>,
        potential: &'static str,
        elapsed: f64,
    },

    /// Isothermal rescaling requested while the kinetic energy is zero.
    #[error("degenerate thermostat: cannot rescale velocities with zero kinetic energy")]
    DegenerateThermostat,

    /// The schedule no longer matches particle state; `reset()` must run first.
    #[error("collision schedule is stale; call reset() before stepping")]
    ScheduleStale,

    /// A previous fatal error halted the engine.
    #[error("engine halted by an earlier fatal error; call reset() to rebuild")]
    Halted,

    /// Malformed engine configuration document.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Propagated I/O errors (configuration files).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for the variants that abort a run (the scheduling taxonomy).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::SchedulingInconsistency { .. }
                | Error::Overlap { .. }
                | Error::UnresolvedCascade { .. }
                | Error::DegenerateThermostat
                | Error::MathError(_)
        )
    }
}
