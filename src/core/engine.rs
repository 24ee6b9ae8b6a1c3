//! Event-driven scheduling engine.
//!
//! The engine owns the particles, the potential table and one [`Agent`] per
//! particle. Agents cache the earliest predicted event of their particle's
//! upward pairs and one-body potentials, with times relative to "now"; the
//! next event of the whole system is the smallest of them. After each event
//! only the predictions that can have changed are recomputed:
//!
//! 1. third parties ordered before the higher collider whose partner was a
//!    collider are marked stale (before anything is rescanned),
//! 2. each collider gets an Up scan, which replaces its own schedule,
//! 3. each stale third party gets an Up scan,
//! 4. each collider gets a Down scan, which may only bring lower agents'
//!    schedules forward.
//!
//! Events that change state every particle sees (a recoiling wall) trigger a
//! full rebuild of the schedule instead. Internal rebuilds keep potential
//! state such as square-well bonds; only [`Engine::reset`] re-derives it.
//!
//! In a periodic cell every particle also carries a [`PeriodicImage`] guard.
//! Its events exchange nothing and are not reported; they only rescan the
//! particle so that pair predictions never lag behind a change of image.

use crate::config::{EngineConfig, TieBreak};
use crate::core::agent::{Agent, Reduction};
use crate::core::directive::{Direction, Directive, Visit};
use crate::core::event::{CollisionEvent, EventKind, NextEvent};
use crate::core::listener::{CollisionListener, ListenerId, ListenerRegistry};
use crate::core::particle::{Particle, DIM};
use crate::core::space::ParticleBox;
use crate::error::{Error, Result};
use crate::potential::{
    Atoms, AtomsMut, CollisionPotential, PeriodicImage, Potential, PotentialId, PotentialMap,
};
use ordered_float::NotNan;
use tracing::{debug, error, instrument, trace, warn};

/// Predictions this far below zero are rounding noise and resolve to "now".
pub const EPS_TIME: f64 = 1e-12;

/// Lifecycle of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Particle or potential state changed since the last rebuild.
    Stale,
    /// Agents are consistent with the particles.
    Ready,
    /// A fatal error was returned; only `reset` leaves this state.
    Fatal,
}

/// An interacting pair or wall contact with infinite potential energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapReport {
    pub kind: EventKind,
    pub potential: PotentialId,
    pub potential_name: &'static str,
}

/// Event-driven hard-body engine.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    space: ParticleBox,
    potentials: PotentialMap,
    agents: Vec<Agent>,
    listeners: ListenerRegistry,
    state: EngineState,
    elapsed: f64,
    next_collider: Option<usize>,
    events: u64,
    steps: u64,
}

impl Engine {
    /// Create an engine in the `Stale` state; call [`Engine::reset`] before stepping.
    pub fn new(space: ParticleBox, potentials: PotentialMap, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let n = space.len();
        Ok(Self {
            config,
            space,
            potentials,
            agents: vec![Agent::default(); n],
            listeners: ListenerRegistry::default(),
            state: EngineState::Stale,
            elapsed: 0.0,
            next_collider: None,
            events: 0,
            steps: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Simulated time since construction.
    pub fn elapsed_time(&self) -> f64 {
        self.elapsed
    }

    /// Number of events resolved so far, image guard rescans excluded.
    pub fn collision_count(&self) -> u64 {
        self.events
    }

    /// Number of completed `do_step` calls.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    pub fn space(&self) -> &ParticleBox {
        &self.space
    }

    /// Mutable particle access; marks the schedule stale.
    pub fn space_mut(&mut self) -> &mut ParticleBox {
        self.mark_stale();
        &mut self.space
    }

    pub fn potentials(&self) -> &PotentialMap {
        &self.potentials
    }

    /// Mutable potential access; marks the schedule stale.
    pub fn potentials_mut(&mut self) -> &mut PotentialMap {
        self.mark_stale();
        &mut self.potentials
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, index: usize) -> Option<&Agent> {
        self.agents.get(index)
    }

    /// Append a particle; the schedule must be rebuilt afterwards.
    pub fn add_particle(
        &mut self,
        kind: usize,
        r: [f64; DIM],
        v: [f64; DIM],
        mass: f64,
    ) -> Result<usize> {
        if kind >= self.potentials.num_kinds() {
            return Err(Error::InvalidParam(format!(
                "particle kind {} not in the potential table ({} kinds)",
                kind,
                self.potentials.num_kinds()
            )));
        }
        let index = self.space.push(kind, r, v, mass)?;
        self.agents.push(Agent::default());
        self.mark_stale();
        Ok(index)
    }

    /// Remove a particle, renumbering later ones; the schedule must be rebuilt afterwards.
    pub fn remove_particle(&mut self, index: usize) -> Result<Particle> {
        let removed = self.space.remove(index)?;
        self.agents.remove(index);
        self.mark_stale();
        Ok(removed)
    }

    pub fn add_listener(
        &mut self,
        listener: impl CollisionListener + Send + 'static,
    ) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Returns false if `id` was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn mark_stale(&mut self) {
        if self.state == EngineState::Ready {
            self.state = EngineState::Stale;
        }
        self.next_collider = None;
    }

    fn halt(&mut self, e: Error) -> Error {
        error!(error = %e, elapsed = self.elapsed, "engine halted");
        self.state = EngineState::Fatal;
        e
    }

    /// Rebuild every agent from scratch.
    ///
    /// Re-derives potential state (square-well bonds) from the current
    /// positions and velocities, sizes the periodic image guard for the cell
    /// and the widest pair potential, then runs one Up-directed whole-system
    /// scan. This is also the only way out of the `Fatal` state.
    ///
    /// Errors: `Error::InvalidParam` for a particle kind outside the potential
    /// table or a periodic axis shorter than twice the widest pair range.
    #[instrument(level = "debug", skip(self), fields(n = self.space.len()))]
    pub fn reset(&mut self) -> Result<()> {
        let num_kinds = self.potentials.num_kinds();
        if let Some(p) = self.space.particles().iter().find(|p| p.kind >= num_kinds) {
            return Err(Error::InvalidParam(format!(
                "particle {} has kind {} outside the potential table ({} kinds)",
                p.index, p.kind, num_kinds
            )));
        }
        let guard = PeriodicImage::new(self.space.boundary(), self.potentials.pair_range())?;
        self.potentials.set_image_guard(guard);
        self.potentials.clear_states();
        self.refresh_potential_states();
        match self.rebuild_schedule() {
            Ok(()) => {
                self.state = EngineState::Ready;
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(self.halt(e)),
            Err(e) => Err(e),
        }
    }

    /// Recompute every agent without touching potential state.
    fn rebuild_schedule(&mut self) -> Result<()> {
        self.agents.clear();
        self.agents.resize(self.space.len(), Agent::default());
        self.scan(Directive::all(Direction::Up), Reduction::Up)?;
        let next = self.find_next_collider();
        debug!(
            next = ?next,
            time = ?next.map(|i| self.agents[i].collision_time),
            "schedule rebuilt"
        );
        Ok(())
    }

    fn refresh_potential_states(&mut self) {
        let Self {
            space, potentials, ..
        } = self;
        let boundary = space.boundary();
        let ps = space.particles();
        Directive::all(Direction::Up).for_each_visit(ps.len(), |visit| match visit {
            Visit::Begin(_) => {}
            Visit::Single(i) => {
                for pid in potentials.singles(ps[i].kind).to_vec() {
                    if let Some(pot) = potentials.get_mut(pid) {
                        pot.refresh(Atoms::One(&ps[i]));
                    }
                }
            }
            Visit::Pair { lower, upper } => {
                let (a, b) = (&ps[lower], &ps[upper]);
                let Some(pid) = potentials.pair(a.kind, b.kind) else {
                    return;
                };
                if let Some(pot) = potentials.get_mut(pid) {
                    pot.refresh(Atoms::Two { a, b, boundary });
                }
            }
        });
    }

    /// Run a neighbor scan, folding every prediction into the agents.
    fn scan(&mut self, directive: Directive, reduction: Reduction) -> Result<()> {
        let n = self.space.len();
        let Self {
            config,
            space,
            potentials,
            agents,
            ..
        } = self;
        let config: &EngineConfig = config;
        let potentials: &PotentialMap = potentials;
        let tie = config.tie_break;
        let guard = potentials.image_guard();
        let boundary = space.boundary();
        let ps = space.particles();
        directive.try_for_each_visit(n, |visit| match visit {
            Visit::Begin(i) => {
                reduction.begin(agents, i);
                Ok(())
            }
            Visit::Single(i) => {
                let p = &ps[i];
                for &pid in potentials.singles(p.kind).iter().chain(guard.iter()) {
                    let pot = lookup(potentials, pid)?;
                    let atoms = Atoms::One(p);
                    let t = resolve_time(config, pot, atoms, i, None)?;
                    reduction.offer(agents, i, t, None, pid, tie);
                }
                Ok(())
            }
            Visit::Pair { lower, upper } => {
                let (a, b) = (&ps[lower], &ps[upper]);
                let Some(pid) = potentials.pair(a.kind, b.kind) else {
                    return Ok(());
                };
                let pot = lookup(potentials, pid)?;
                let atoms = Atoms::Two { a, b, boundary };
                let t = resolve_time(config, pot, atoms, lower, Some(upper))?;
                reduction.offer(agents, lower, t, Some(upper), pid, tie);
                Ok(())
            }
        })
    }

    /// Locate the agent with the smallest scheduled time, honoring the tie policy.
    pub fn find_next_collider(&mut self) -> Option<usize> {
        let tie = self.config.tie_break;
        let mut best: Option<usize> = None;
        let mut best_t = f64::INFINITY;
        for (i, a) in self.agents.iter().enumerate() {
            if !a.is_scheduled() {
                continue;
            }
            let better = match tie {
                TieBreak::FirstInOrder => a.collision_time < best_t,
                TieBreak::LastInOrder => a.collision_time <= best_t,
            };
            if better {
                best = Some(i);
                best_t = a.collision_time;
            }
        }
        self.next_collider = best;
        best
    }

    /// The next scheduled event, if the schedule is ready and one exists.
    pub fn next_event(&self) -> Option<NextEvent> {
        if self.state != EngineState::Ready {
            return None;
        }
        let i = self.next_collider?;
        let a = self.agents.get(i)?;
        Some(NextEvent {
            time: NotNan::new(a.collision_time).ok()?,
            kind: EventKind::from_partner(i, a.partner),
            potential: a.potential?,
        })
    }

    /// Advance the simulation by `t_step`, resolving every event inside it.
    ///
    /// Returns the number of events resolved, not counting image guard
    /// rescans. Any error raised while stepping halts the engine; later calls return [`Error::Halted`] until
    /// [`Engine::reset`] succeeds.
    #[instrument(level = "debug", skip(self), fields(elapsed = self.elapsed))]
    pub fn do_step(&mut self, t_step: f64) -> Result<usize> {
        match self.state {
            EngineState::Stale => return Err(Error::ScheduleStale),
            EngineState::Fatal => return Err(Error::Halted),
            EngineState::Ready => {}
        }
        if !t_step.is_finite() || t_step < 0.0 {
            return Err(Error::InvalidParam(format!(
                "step length must be finite and >= 0, got {}",
                t_step
            )));
        }
        // a failure mid-step leaves the schedule partially repaired
        self.run_step(t_step).map_err(|e| self.halt(e))
    }

    fn run_step(&mut self, t_step: f64) -> Result<usize> {
        let mut remaining = t_step;
        let mut resolved = 0usize;
        // guard rescans count toward the cap too
        let mut processed = 0usize;
        loop {
            let next = self
                .next_collider
                .map(|i| (i, self.agents[i].collision_time))
                .filter(|&(_, t)| t <= remaining);
            let Some((i, t)) = next else {
                self.advance(remaining);
                break;
            };
            if processed >= self.config.max_events_per_step {
                let a = self.agents[i];
                return Err(Error::UnresolvedCascade {
                    events: processed,
                    collider: i,
                    partner: a.partner,
                    potential: self.potential_name(a.potential),
                    elapsed: self.elapsed,
                });
            }
            if t.is_nan() || t < 0.0 {
                let a = self.agents[i];
                return Err(Error::SchedulingInconsistency {
                    time: t,
                    collider: i,
                    partner: a.partner,
                    potential: self.potential_name(a.potential),
                });
            }
            self.advance(t);
            remaining = (remaining - t).max(0.0);
            if self.process_event(i)? {
                resolved += 1;
            }
            processed += 1;
        }
        self.steps += 1;
        self.apply_thermostat()?;
        trace!(resolved, elapsed = self.elapsed, "step complete");
        Ok(resolved)
    }

    /// Ballistic flight of everything by `dt`; agents count down.
    fn advance(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        self.space.drift_all(dt);
        self.potentials.advance_all(dt);
        for a in &mut self.agents {
            a.collision_time -= dt;
        }
        self.elapsed += dt;
    }

    fn potential_name(&self, id: Option<PotentialId>) -> &'static str {
        id.and_then(|pid| self.potentials.get(pid))
            .map_or("none", |p| p.name())
    }

    /// Resolve the event owned by agent `i`, repair the schedule and notify listeners.
    ///
    /// Returns false for an image guard rescan, which is neither counted nor reported.
    fn process_event(&mut self, i: usize) -> Result<bool> {
        let agent = self.agents[i];
        let Some(pid) = agent.potential else {
            return Err(Error::SchedulingInconsistency {
                time: agent.collision_time,
                collider: i,
                partner: agent.partner,
                potential: "none",
            });
        };
        let kind = EventKind::from_partner(i, agent.partner);
        let involved = [i, agent.partner.unwrap_or(i)];
        let horizon = involved[0].max(involved[1]);
        let stale: Vec<usize> = self.agents[..horizon]
            .iter()
            .enumerate()
            .filter(|&(k, a)| !involved.contains(&k) && a.depends_on(&involved))
            .map(|(k, _)| k)
            .collect();

        let potential = self
            .potentials
            .get_mut(pid)
            .ok_or_else(|| Error::InvalidParam(format!("unknown potential id {}", pid.0)))?;
        let name = potential.name();
        let bump = match agent.partner {
            Some(j) => {
                let (a, b, boundary) = self.space.pair_mut(i, j)?;
                potential.bump(AtomsMut::Two { a, b, boundary }, 0.0)?
            }
            None => potential.bump(AtomsMut::One(self.space.particle_mut(i)?), 0.0)?,
        };
        if !bump.rescan_only {
            let particles = self.space.particles_mut();
            particles[i].bump_collision_count();
            if let Some(j) = agent.partner {
                particles[j].bump_collision_count();
            }
        }

        if bump.invalidates_all {
            trace!(collider = i, potential = name, "event voids every prediction");
            self.rebuild_schedule()?;
        } else {
            self.scan(Directive::one(i, Direction::Up), Reduction::Up)?;
            if let Some(j) = agent.partner {
                self.scan(Directive::one(j, Direction::Up), Reduction::Up)?;
            }
            for k in stale {
                self.scan(Directive::one(k, Direction::Up), Reduction::Up)?;
            }
            self.scan(Directive::one(i, Direction::Down), Reduction::Down)?;
            if let Some(j) = agent.partner {
                self.scan(Directive::one(j, Direction::Down), Reduction::Down)?;
            }
            self.find_next_collider();
        }

        if bump.rescan_only {
            trace!(particle = i, time = self.elapsed, "image guard rescan");
            return Ok(false);
        }
        let sequence = self.events;
        self.events += 1;
        let event = CollisionEvent::new(
            self.elapsed,
            sequence,
            kind,
            pid,
            name,
            bump.virial,
            bump.energy_change,
        )?;
        trace!(
            sequence,
            time = self.elapsed,
            collider = kind.collider(),
            partner = ?kind.partner(),
            potential = name,
            "event resolved"
        );
        self.listeners.notify(&event);
        Ok(true)
    }

    fn apply_thermostat(&mut self) -> Result<()> {
        let Some(th) = self.config.thermostat else {
            return Ok(());
        };
        if self.steps % th.interval != 0 {
            return Ok(());
        }
        let current = self.space.temperature();
        if current.is_nan() || current <= 0.0 {
            return Err(Error::DegenerateThermostat);
        }
        let scale = (th.temperature / current).sqrt();
        for p in self.space.particles_mut() {
            if p.inv_mass > 0.0 {
                let v = p.v.map(|x| x * scale);
                p.set_velocity(v)?;
            }
        }
        debug!(from = current, to = th.temperature, "velocities rescaled");
        self.rebuild_schedule()
    }

    /// Total kinetic energy.
    pub fn kinetic_energy(&self) -> f64 {
        self.space.kinetic_energy()
    }

    /// Total momentum of the finite-mass particles.
    pub fn momentum(&self) -> [f64; DIM] {
        self.space.momentum()
    }

    /// Kinetic temperature `2K / (D N)` over finite-mass particles.
    pub fn temperature(&self) -> f64 {
        self.space.temperature()
    }

    /// Sum of the potential energy over every interacting pair and one-body contact.
    ///
    /// Infinite when any hard core is violated.
    pub fn potential_energy(&self) -> f64 {
        self.interaction_energy(Directive::all(Direction::Up))
    }

    /// Potential energy summed over the candidates `directive` visits.
    ///
    /// `Directive::one(i, Direction::Both)` gives everything particle `i`
    /// feels, `Direction::Neither` only its one-body terms, and
    /// `Directive::pair(a, b)` a single pair.
    pub fn interaction_energy(&self, directive: Directive) -> f64 {
        let mut total = 0.0;
        self.for_each_interaction(directive, |_, _, e| total += e);
        total
    }

    /// Every pair or one-body contact whose energy is infinite.
    pub fn overlaps(&self) -> Vec<OverlapReport> {
        let mut out = Vec::new();
        self.for_each_interaction(Directive::all(Direction::Up), |kind, pid, e| {
            if e == f64::INFINITY {
                out.push(OverlapReport {
                    kind,
                    potential: pid,
                    potential_name: self.potential_name(Some(pid)),
                });
            }
        });
        out
    }

    fn for_each_interaction(
        &self,
        directive: Directive,
        mut f: impl FnMut(EventKind, PotentialId, f64),
    ) {
        let boundary = self.space.boundary();
        let ps = self.space.particles();
        directive.for_each_visit(ps.len(), |visit| match visit {
            Visit::Begin(_) => {}
            Visit::Single(i) => {
                for &pid in self.potentials.singles(ps[i].kind) {
                    if let Some(pot) = self.potentials.get(pid) {
                        f(EventKind::Single { i }, pid, pot.energy(Atoms::One(&ps[i])));
                    }
                }
            }
            Visit::Pair { lower, upper } => {
                let (a, b) = (&ps[lower], &ps[upper]);
                if let Some(pid) = self.potentials.pair(a.kind, b.kind) {
                    if let Some(pot) = self.potentials.get(pid) {
                        let e = pot.energy(Atoms::Two { a, b, boundary });
                        f(EventKind::Pair { i: lower, j: upper }, pid, e);
                    }
                }
            }
        });
    }

    /// Check that every scheduled time is non-negative and every partner is above its owner.
    pub fn verify_schedule(&self) -> Result<()> {
        for (i, a) in self.agents.iter().enumerate() {
            let partner_ok = a.partner.map_or(true, |j| j > i && j < self.agents.len());
            if a.collision_time.is_nan() || a.collision_time < 0.0 || !partner_ok {
                return Err(Error::SchedulingInconsistency {
                    time: a.collision_time,
                    collider: i,
                    partner: a.partner,
                    potential: self.potential_name(a.potential),
                });
            }
        }
        Ok(())
    }
}

fn lookup(potentials: &PotentialMap, pid: PotentialId) -> Result<&Potential> {
    potentials
        .get(pid)
        .ok_or_else(|| Error::InvalidParam(format!("unknown potential id {}", pid.0)))
}

/// Turn a raw prediction into a schedulable time.
///
/// Non-negative times pass through, rounding noise down to `-EPS_TIME`
/// resolves to zero, and an earlier time is accepted only for truly
/// overlapping atoms when overlaps are tolerated.
fn resolve_time(
    config: &EngineConfig,
    potential: &Potential,
    atoms: Atoms<'_>,
    collider: usize,
    partner: Option<usize>,
) -> Result<f64> {
    let t = potential.collision_time(atoms, 0.0);
    if t >= 0.0 {
        return Ok(t);
    }
    let name = potential.name();
    if t.is_nan() {
        return Err(Error::SchedulingInconsistency {
            time: t,
            collider,
            partner,
            potential: name,
        });
    }
    if t >= -EPS_TIME {
        return Ok(0.0);
    }
    if potential.energy(atoms) == f64::INFINITY {
        if config.ignore_overlap {
            warn!(collider, partner = ?partner, potential = name, time = t, "overlap tolerated");
            return Ok(0.0);
        }
        return Err(Error::Overlap {
            collider,
            partner,
            potential: name,
            time: t,
        });
    }
    Err(Error::SchedulingInconsistency {
        time: t,
        collider,
        partner,
        potential: name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::space::Boundary;
    use crate::potential::{HardSphere, MovingWall, NullPotential, SquareWell};
    use approx::assert_relative_eq;

    fn head_on(gap_centers: f64, speed: f64) -> Result<Engine> {
        let mut space = ParticleBox::new(Boundary::open([20.0, 20.0, 20.0])?);
        let x0 = 10.0 - 0.5 * gap_centers;
        space.push(0, [x0, 10.0, 10.0], [speed, 0.0, 0.0], 1.0)?;
        space.push(0, [x0 + gap_centers, 10.0, 10.0], [-speed, 0.0, 0.0], 1.0)?;
        let mut potentials = PotentialMap::new(1);
        potentials.add_pair(0, 0, HardSphere::new(1.0)?)?;
        Engine::new(space, potentials, EngineConfig::default())
    }

    #[test]
    fn stepping_requires_a_reset() -> Result<()> {
        let mut engine = head_on(3.0, 1.0)?;
        assert!(matches!(engine.do_step(0.1), Err(Error::ScheduleStale)));
        engine.reset()?;
        assert_eq!(engine.state(), EngineState::Ready);
        engine.do_step(0.1)?;
        engine.space_mut();
        assert_eq!(engine.state(), EngineState::Stale);
        assert!(engine.next_event().is_none());
        Ok(())
    }

    #[test]
    fn next_event_matches_analytic_contact() -> Result<()> {
        let mut engine = head_on(3.0, 1.0)?;
        engine.reset()?;
        let next = engine
            .next_event()
            .ok_or_else(|| Error::InvalidParam("no event".into()))?;
        assert_relative_eq!(next.time.into_inner(), 1.0, epsilon = 1e-12);
        assert_eq!(next.kind, EventKind::Pair { i: 0, j: 1 });
        assert_eq!(engine.agents()[1].collision_time, f64::INFINITY);
        Ok(())
    }

    #[test]
    fn partial_step_counts_down() -> Result<()> {
        let mut engine = head_on(3.0, 1.0)?;
        engine.reset()?;
        assert_eq!(engine.do_step(0.25)?, 0);
        assert_relative_eq!(engine.agents()[0].collision_time, 0.75, epsilon = 1e-12);
        assert_relative_eq!(engine.elapsed_time(), 0.25);
        assert_eq!(engine.do_step(1.0)?, 1);
        assert_eq!(engine.collision_count(), 1);
        assert_eq!(engine.space().particles()[0].v[0], -1.0);
        Ok(())
    }

    #[test]
    fn negative_step_rejected_without_halting() -> Result<()> {
        let mut engine = head_on(3.0, 1.0)?;
        engine.reset()?;
        assert!(matches!(engine.do_step(-1.0), Err(Error::InvalidParam(_))));
        assert_eq!(engine.state(), EngineState::Ready);
        Ok(())
    }

    #[test]
    fn rounding_noise_resolves_to_now() -> Result<()> {
        let mut space = ParticleBox::new(Boundary::open([20.0, 20.0, 20.0])?);
        space.push(0, [5.0, 5.0, 5.0], [1.0, 0.0, 0.0], 1.0)?;
        space.push(0, [6.0 - 1e-14, 5.0, 5.0], [-1.0, 0.0, 0.0], 1.0)?;
        let mut potentials = PotentialMap::new(1);
        potentials.add_pair(0, 0, HardSphere::new(1.0)?)?;
        let mut engine = Engine::new(space, potentials, EngineConfig::default())?;
        engine.reset()?;
        assert_eq!(engine.agents()[0].collision_time, 0.0);
        Ok(())
    }

    #[test]
    fn null_potential_is_free_flight() -> Result<()> {
        let mut space = ParticleBox::new(Boundary::periodic([5.0, 5.0, 5.0])?);
        space.push(0, [1.0, 1.0, 1.0], [1.0, 0.5, 0.0], 1.0)?;
        space.push(0, [1.2, 1.0, 1.0], [-1.0, 0.0, 0.0], 1.0)?;
        let mut potentials = PotentialMap::new(1);
        potentials.add_pair(0, 0, NullPotential)?;
        let mut engine = Engine::new(space, potentials, EngineConfig::default())?;
        engine.reset()?;
        assert!(engine.next_event().is_none());
        assert_eq!(engine.do_step(2.0)?, 0);
        let p = &engine.space().particles()[0];
        assert_relative_eq!(p.r[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(p.r[1], 2.0, epsilon = 1e-12);
        assert_eq!(engine.potential_energy(), 0.0);
        Ok(())
    }

    #[test]
    fn overlap_reported_and_fatal_without_tolerance() -> Result<()> {
        let mut engine = head_on(0.5, 1.0)?;
        assert_eq!(engine.overlaps().len(), 1);
        assert_eq!(engine.potential_energy(), f64::INFINITY);
        assert!(matches!(engine.reset(), Err(Error::Overlap { collider: 0, .. })));
        assert_eq!(engine.state(), EngineState::Fatal);
        assert!(matches!(engine.do_step(0.1), Err(Error::Halted)));
        Ok(())
    }

    #[test]
    fn unknown_kind_rejected_on_reset() -> Result<()> {
        let mut engine = head_on(3.0, 1.0)?;
        engine.space_mut().push(4, [1.0, 1.0, 1.0], [0.0; DIM], 1.0)?;
        assert!(matches!(engine.reset(), Err(Error::InvalidParam(_))));
        assert!(engine.add_particle(4, [1.0, 1.0, 1.0], [0.0; DIM], 1.0).is_err());
        Ok(())
    }

    #[test]
    fn directed_energy_follows_the_directive() -> Result<()> {
        // 0-1 and 1-2 inside the well, 0-2 outside it
        let mut space = ParticleBox::new(Boundary::open([20.0, 20.0, 20.0])?);
        for x in [8.8, 10.0, 11.2] {
            space.push(0, [x, 10.0, 10.0], [0.0; DIM], 1.0)?;
        }
        let mut potentials = PotentialMap::new(1);
        potentials.add_pair(0, 0, SquareWell::new(1.0, 1.5, 0.5)?)?;
        potentials.add_single(&[0], MovingWall::fixed(0, 0.0, 0.0, 1.0)?)?;
        let mut engine = Engine::new(space, potentials, EngineConfig::default())?;
        engine.reset()?;

        assert_relative_eq!(engine.potential_energy(), -1.0);
        assert_relative_eq!(engine.interaction_energy(Directive::all(Direction::Down)), -1.0);
        assert_relative_eq!(engine.interaction_energy(Directive::one(1, Direction::Both)), -1.0);
        assert_relative_eq!(engine.interaction_energy(Directive::one(0, Direction::Both)), -0.5);
        assert_eq!(engine.interaction_energy(Directive::one(1, Direction::Neither)), 0.0);
        assert_relative_eq!(engine.interaction_energy(Directive::pair(2, 1)), -0.5);
        assert_eq!(engine.interaction_energy(Directive::pair(0, 2)), 0.0);
        Ok(())
    }

    #[test]
    fn one_body_terms_alone_with_neither() -> Result<()> {
        // particle 0 is inside the wall's contact shell, at rest
        let mut space = ParticleBox::new(Boundary::open([20.0, 20.0, 20.0])?);
        space.push(0, [0.2, 10.0, 10.0], [0.0; DIM], 1.0)?;
        space.push(0, [5.0, 10.0, 10.0], [0.0; DIM], 1.0)?;
        let mut potentials = PotentialMap::new(1);
        potentials.add_pair(0, 0, HardSphere::new(1.0)?)?;
        potentials.add_single(&[0], MovingWall::fixed(0, 0.0, 0.0, 1.0)?)?;
        let engine = Engine::new(space, potentials, EngineConfig::default())?;
        assert_eq!(
            engine.interaction_energy(Directive::one(0, Direction::Neither)),
            f64::INFINITY
        );
        assert_eq!(engine.interaction_energy(Directive::one(1, Direction::Neither)), 0.0);
        assert_eq!(engine.interaction_energy(Directive::pair(0, 1)), 0.0);
        Ok(())
    }

    #[test]
    fn short_periodic_cell_rejected_on_reset() -> Result<()> {
        let mut space = ParticleBox::new(Boundary::periodic([1.8, 10.0, 10.0])?);
        space.push(0, [0.5, 5.0, 5.0], [1.0, 0.0, 0.0], 1.0)?;
        let mut potentials = PotentialMap::new(1);
        potentials.add_pair(0, 0, HardSphere::new(1.0)?)?;
        let mut engine = Engine::new(space, potentials, EngineConfig::default())?;
        assert!(matches!(engine.reset(), Err(Error::InvalidParam(_))));
        assert_eq!(engine.state(), EngineState::Stale);
        Ok(())
    }
}
