use crate::config::TieBreak;
use crate::potential::PotentialId;

/// Per-particle scheduling record.
///
/// `collision_time` is relative to "now" and covers the owning particle's
/// upward pairs plus its one-body potentials. `partner = None` with a
/// potential set means the scheduled event is one-body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agent {
    pub collision_time: f64,
    pub partner: Option<usize>,
    pub potential: Option<PotentialId>,
}

impl Default for Agent {
    fn default() -> Self {
        Self {
            collision_time: f64::INFINITY,
            partner: None,
            potential: None,
        }
    }
}

impl Agent {
    /// Forget the scheduled event.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True if a finite event is scheduled.
    #[inline]
    pub fn is_scheduled(&self) -> bool {
        self.collision_time.is_finite() && self.potential.is_some()
    }

    /// True if the scheduled partner is one of `particles`.
    #[inline]
    pub fn depends_on(&self, particles: &[usize]) -> bool {
        matches!(self.partner, Some(p) if particles.contains(&p))
    }

    #[inline]
    fn take(&mut self, time: f64, partner: Option<usize>, potential: PotentialId) {
        self.collision_time = time;
        self.partner = partner;
        self.potential = Some(potential);
    }
}

/// How a scan folds per-candidate predictions into the agents.
///
/// Both policies write to the agent of the lower particle of a pair (or the
/// atom of a one-body candidate), which is the agent owning that prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Min-search: the owner's agent is cleared when its group begins and
    /// keeps the smallest prediction, ties settled by the tie policy.
    Up,
    /// Min-update: the owner's existing schedule is replaced only by a
    /// strictly earlier prediction.
    Down,
}

impl Reduction {
    /// Start of `owner`'s upward group.
    #[inline]
    pub fn begin(self, agents: &mut [Agent], owner: usize) {
        if self == Reduction::Up {
            if let Some(a) = agents.get_mut(owner) {
                a.reset();
            }
        }
    }

    /// Fold one prediction into `owner`'s agent; returns true if it was taken.
    #[inline]
    pub fn offer(
        self,
        agents: &mut [Agent],
        owner: usize,
        time: f64,
        partner: Option<usize>,
        potential: PotentialId,
        tie: TieBreak,
    ) -> bool {
        let Some(agent) = agents.get_mut(owner) else {
            return false;
        };
        let take = match self {
            Reduction::Up => match tie {
                TieBreak::FirstInOrder => time < agent.collision_time,
                TieBreak::LastInOrder => {
                    time < agent.collision_time
                        || (time == agent.collision_time && time.is_finite())
                }
            },
            Reduction::Down => time < agent.collision_time,
        };
        if take {
            agent.take(time, partner, potential);
        }
        take
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_agent_is_unscheduled() {
        let a = Agent::default();
        assert!(a.collision_time.is_infinite());
        assert!(!a.is_scheduled());
        assert!(!a.depends_on(&[0, 1]));
    }

    #[test]
    fn up_reduction_resets_then_keeps_minimum() {
        let mut agents = vec![Agent::default(); 3];
        agents[0].collision_time = 0.1;
        Reduction::Up.begin(&mut agents, 0);
        assert!(agents[0].collision_time.is_infinite());
        let pid = PotentialId(0);
        assert!(Reduction::Up.offer(&mut agents, 0, 2.0, Some(1), pid, TieBreak::FirstInOrder));
        assert!(Reduction::Up.offer(&mut agents, 0, 1.0, Some(2), pid, TieBreak::FirstInOrder));
        assert!(!Reduction::Up.offer(&mut agents, 0, 1.5, None, pid, TieBreak::FirstInOrder));
        assert_eq!(agents[0].partner, Some(2));
        assert!(agents[0].depends_on(&[2]));
    }

    #[test]
    fn tie_policy_applies_to_up_reduction() {
        let pid = PotentialId(3);
        let mut agents = vec![Agent::default(); 3];
        Reduction::Up.offer(&mut agents, 0, 1.0, Some(1), pid, TieBreak::FirstInOrder);
        Reduction::Up.offer(&mut agents, 0, 1.0, Some(2), pid, TieBreak::FirstInOrder);
        assert_eq!(agents[0].partner, Some(1));

        Reduction::Up.offer(&mut agents, 0, 1.0, Some(2), pid, TieBreak::LastInOrder);
        assert_eq!(agents[0].partner, Some(2));
    }

    #[test]
    fn down_reduction_requires_strict_improvement() {
        let pid = PotentialId(0);
        let mut agents = vec![Agent::default(); 2];
        agents[0] = Agent {
            collision_time: 1.0,
            partner: Some(1),
            potential: Some(pid),
        };
        Reduction::Down.begin(&mut agents, 0);
        assert_eq!(agents[0].collision_time, 1.0);
        assert!(!Reduction::Down.offer(&mut agents, 0, 1.0, None, PotentialId(1), TieBreak::LastInOrder));
        assert!(Reduction::Down.offer(&mut agents, 0, 0.5, None, PotentialId(1), TieBreak::LastInOrder));
        assert_eq!(agents[0].partner, None);
        assert_eq!(agents[0].potential, Some(PotentialId(1)));
    }
}
