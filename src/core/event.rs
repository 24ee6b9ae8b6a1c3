use crate::error::{Error, Result};
use crate::potential::PotentialId;
use ordered_float::NotNan;
use std::cmp::Ordering;

/// Participants of a resolved or scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Pair collision between particles `i < j`.
    Pair { i: usize, j: usize },
    /// One-body event (wall) of particle `i`.
    Single { i: usize },
}

impl EventKind {
    /// Build from an agent's owner and partner.
    #[inline]
    pub fn from_partner(i: usize, partner: Option<usize>) -> Self {
        match partner {
            Some(j) => EventKind::Pair {
                i: i.min(j),
                j: i.max(j),
            },
            None => EventKind::Single { i },
        }
    }

    /// The particle whose agent owned the event.
    #[inline]
    pub fn collider(&self) -> usize {
        match *self {
            EventKind::Pair { i, .. } | EventKind::Single { i } => i,
        }
    }

    /// The second particle, if any.
    #[inline]
    pub fn partner(&self) -> Option<usize> {
        match *self {
            EventKind::Pair { j, .. } => Some(j),
            EventKind::Single { .. } => None,
        }
    }
}

/// The next scheduled event as seen by a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextEvent {
    /// Time from now until the event.
    pub time: NotNan<f64>,
    pub kind: EventKind,
    pub potential: PotentialId,
}

/// A resolved event, as reported to collision listeners.
///
/// - `time`: elapsed simulation time at which the event happened.
/// - `sequence`: running count of resolved events; strictly increasing.
/// - `virial`, `energy_change`: as reported by the potential's bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionEvent {
    pub time: NotNan<f64>,
    pub sequence: u64,
    pub kind: EventKind,
    pub potential: PotentialId,
    pub potential_name: &'static str,
    pub virial: NotNan<f64>,
    pub energy_change: NotNan<f64>,
}

impl CollisionEvent {
    /// Create a new event, validating that every scalar is non-NaN and the time is finite.
    pub fn new(
        time: f64,
        sequence: u64,
        kind: EventKind,
        potential: PotentialId,
        potential_name: &'static str,
        virial: f64,
        energy_change: f64,
    ) -> Result<Self> {
        if !time.is_finite() {
            return Err(Error::InvalidParam("event time must be finite".into()));
        }
        let nn = |x: f64, what: &str| {
            NotNan::new(x).map_err(|_| Error::MathError(format!("event {what} is NaN")))
        };
        Ok(Self {
            time: nn(time, "time")?,
            sequence,
            kind,
            potential,
            potential_name,
            virial: nn(virial, "virial")?,
            energy_change: nn(energy_change, "energy change")?,
        })
    }

    /// Returns the raw f64 event time.
    #[inline]
    pub fn time_f64(&self) -> f64 {
        self.time.into_inner()
    }
}

impl Ord for CollisionEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for CollisionEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
