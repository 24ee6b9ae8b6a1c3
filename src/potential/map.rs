use super::{Arity, CollisionPotential, PeriodicImage, Potential};
use crate::error::{Error, Result};

/// Handle to a potential stored in a [`PotentialMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PotentialId(pub usize);

/// Potential lookup by particle type.
///
/// Pair potentials are registered per unordered type pair; one-body
/// potentials (walls) per type, and a single one-body potential may act on
/// several types. Type pairs without an entry do not interact. The periodic
/// image guard is stored alongside but acts on every type and is not listed
/// among the one-body potentials.
#[derive(Debug, Clone)]
pub struct PotentialMap {
    num_kinds: usize,
    potentials: Vec<Potential>,
    pairs: Vec<Option<PotentialId>>,
    singles: Vec<Vec<PotentialId>>,
    image_guard: Option<PotentialId>,
}

impl PotentialMap {
    /// Empty table for particle types `0..num_kinds`.
    pub fn new(num_kinds: usize) -> Self {
        Self {
            num_kinds,
            potentials: Vec::new(),
            pairs: vec![None; num_kinds * num_kinds],
            singles: vec![Vec::new(); num_kinds],
            image_guard: None,
        }
    }

    /// Number of particle types covered by the table.
    pub fn num_kinds(&self) -> usize {
        self.num_kinds
    }

    fn check_kind(&self, kind: usize) -> Result<()> {
        if kind >= self.num_kinds {
            return Err(Error::InvalidParam(format!(
                "particle type {} outside the potential table (types: {})",
                kind, self.num_kinds
            )));
        }
        Ok(())
    }

    /// Register the potential acting between types `a` and `b` (either order).
    ///
    /// Errors: unknown type, a one-body potential, or an already registered pair.
    pub fn add_pair(
        &mut self,
        a: usize,
        b: usize,
        potential: impl Into<Potential>,
    ) -> Result<PotentialId> {
        self.check_kind(a)?;
        self.check_kind(b)?;
        let potential = potential.into();
        if !potential.accepts(Arity::Two) {
            return Err(Error::InvalidParam(format!(
                "{} potential cannot act on a pair",
                potential.name()
            )));
        }
        if self.pairs[a * self.num_kinds + b].is_some() {
            return Err(Error::InvalidParam(format!(
                "a potential is already registered for types ({}, {})",
                a, b
            )));
        }
        let id = PotentialId(self.potentials.len());
        self.potentials.push(potential);
        self.pairs[a * self.num_kinds + b] = Some(id);
        self.pairs[b * self.num_kinds + a] = Some(id);
        Ok(id)
    }

    /// Register a one-body potential acting on every type in `kinds`.
    pub fn add_single(&mut self, kinds: &[usize], potential: impl Into<Potential>) -> Result<PotentialId> {
        for &k in kinds {
            self.check_kind(k)?;
        }
        let potential = potential.into();
        if !potential.accepts(Arity::One) {
            return Err(Error::InvalidParam(format!(
                "{} potential cannot act on a single atom",
                potential.name()
            )));
        }
        let id = PotentialId(self.potentials.len());
        self.potentials.push(potential);
        for &k in kinds {
            if !self.singles[k].contains(&id) {
                self.singles[k].push(id);
            }
        }
        Ok(id)
    }

    /// Pair potential for types `a` and `b`, if any.
    #[inline]
    pub fn pair(&self, a: usize, b: usize) -> Option<PotentialId> {
        if a >= self.num_kinds || b >= self.num_kinds {
            return None;
        }
        self.pairs[a * self.num_kinds + b]
    }

    /// One-body potentials acting on `kind`.
    #[inline]
    pub fn singles(&self, kind: usize) -> &[PotentialId] {
        self.singles.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Largest interaction range over the registered pair potentials.
    pub fn pair_range(&self) -> f64 {
        self.pairs
            .iter()
            .flatten()
            .filter_map(|&id| self.get(id))
            .map(|p| p.range())
            .fold(0.0, f64::max)
    }

    /// Install or replace the periodic image guard.
    ///
    /// An inactive guard is stored only when it replaces an earlier one.
    pub fn set_image_guard(&mut self, guard: PeriodicImage) -> Option<PotentialId> {
        match self.image_guard {
            Some(id) => {
                self.potentials[id.0] = guard.into();
            }
            None if guard.is_active() => {
                let id = PotentialId(self.potentials.len());
                self.potentials.push(guard.into());
                self.image_guard = Some(id);
            }
            None => {}
        }
        self.image_guard
    }

    /// The periodic image guard, once installed.
    #[inline]
    pub fn image_guard(&self) -> Option<PotentialId> {
        self.image_guard
    }

    /// Potential behind `id`.
    pub fn get(&self, id: PotentialId) -> Option<&Potential> {
        self.potentials.get(id.0)
    }

    /// Mutable potential behind `id`.
    pub fn get_mut(&mut self, id: PotentialId) -> Option<&mut Potential> {
        self.potentials.get_mut(id.0)
    }

    /// Number of registered potentials.
    pub fn len(&self) -> usize {
        self.potentials.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.potentials.is_empty()
    }

    /// All potentials with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (PotentialId, &Potential)> {
        self.potentials
            .iter()
            .enumerate()
            .map(|(i, p)| (PotentialId(i), p))
    }

    /// Free flight of potential-owned state.
    pub fn advance_all(&mut self, dt: f64) {
        for p in &mut self.potentials {
            p.advance(dt);
        }
    }

    /// Drop all per-pair internal state.
    pub fn clear_states(&mut self) {
        for p in &mut self.potentials {
            p.clear_state();
        }
    }
}
