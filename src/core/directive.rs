//! Neighbor-scan directives.
//!
//! A [`Directive`] names the particles a scan starts from and the direction
//! it looks in, relative to the fixed total order of particle indices. Pair
//! candidates are always reported as `(lower, upper)`, so every unordered pair
//! has a single canonical form no matter which side issued the scan.

use std::convert::Infallible;

/// Scan direction relative to the target in the index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Only candidates ordered after the target.
    Up,
    /// Only candidates ordered before the target.
    Down,
    /// No partners; only the target's one-body interactions.
    Neither,
    /// Every other particle.
    Both,
}

/// Which particles a directive addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The whole system.
    All,
    One(usize),
    Pair(usize, usize),
}

/// One candidate produced by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// A target's group of upward candidates starts here.
    Begin(usize),
    /// One-body interactions of a particle.
    Single(usize),
    /// Pair in index order.
    Pair { lower: usize, upper: usize },
}

/// Iteration instruction for a neighbor scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive {
    pub target: Target,
    pub direction: Direction,
}

impl Directive {
    /// Whole-system scan.
    pub fn all(direction: Direction) -> Self {
        Self {
            target: Target::All,
            direction,
        }
    }

    /// Scan around one particle.
    pub fn one(target: usize, direction: Direction) -> Self {
        Self {
            target: Target::One(target),
            direction,
        }
    }

    /// Scan of exactly one pair.
    pub fn pair(a: usize, b: usize) -> Self {
        Self {
            target: Target::Pair(a, b),
            direction: Direction::Both,
        }
    }

    /// Enumerate the candidates of this directive over `n` particles,
    /// stopping at the first error `f` returns.
    ///
    /// Whole-system scans visit every unordered pair exactly once: `Up` groups
    /// pairs by their lower member and `Down` by their upper member. `Begin(i)`
    /// precedes the group of upward candidates owned by `i`, which is where a
    /// min-search reduction resets `i`'s schedule. Out-of-range targets visit
    /// nothing.
    pub fn try_for_each_visit<E, F>(&self, n: usize, mut f: F) -> Result<(), E>
    where
        F: FnMut(Visit) -> Result<(), E>,
    {
        match self.target {
            Target::All => match self.direction {
                Direction::Up | Direction::Both => {
                    for i in 0..n {
                        up_from(i, n, &mut f)?;
                    }
                }
                Direction::Down => {
                    for i in 0..n {
                        for j in 0..i {
                            f(Visit::Pair { lower: j, upper: i })?;
                        }
                    }
                }
                Direction::Neither => {
                    for i in 0..n {
                        f(Visit::Single(i))?;
                    }
                }
            },
            Target::One(i) => {
                if i >= n {
                    return Ok(());
                }
                match self.direction {
                    Direction::Up => up_from(i, n, &mut f)?,
                    Direction::Down => {
                        for j in 0..i {
                            f(Visit::Pair { lower: j, upper: i })?;
                        }
                    }
                    Direction::Neither => f(Visit::Single(i))?,
                    Direction::Both => {
                        f(Visit::Single(i))?;
                        for j in (0..n).filter(|&j| j != i) {
                            f(Visit::Pair {
                                lower: i.min(j),
                                upper: i.max(j),
                            })?;
                        }
                    }
                }
            }
            Target::Pair(a, b) => {
                if a >= n || b >= n {
                    return Ok(());
                }
                if self.direction == Direction::Neither {
                    f(Visit::Single(a))?;
                    if b != a {
                        f(Visit::Single(b))?;
                    }
                } else if a != b {
                    f(Visit::Pair {
                        lower: a.min(b),
                        upper: a.max(b),
                    })?;
                }
            }
        }
        Ok(())
    }

    /// [`Directive::try_for_each_visit`] for visitors that cannot fail.
    pub fn for_each_visit<F>(&self, n: usize, mut f: F)
    where
        F: FnMut(Visit),
    {
        let walked = self.try_for_each_visit::<Infallible, _>(n, |v| {
            f(v);
            Ok(())
        });
        match walked {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }
}

fn up_from<E, F>(i: usize, n: usize, f: &mut F) -> Result<(), E>
where
    F: FnMut(Visit) -> Result<(), E>,
{
    f(Visit::Begin(i))?;
    f(Visit::Single(i))?;
    for j in (i + 1)..n {
        f(Visit::Pair { lower: i, upper: j })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn collect(d: Directive, n: usize) -> Vec<Visit> {
        let mut out = Vec::new();
        d.for_each_visit(n, |v| out.push(v));
        out
    }

    fn pairs(visits: &[Visit]) -> Vec<(usize, usize)> {
        visits
            .iter()
            .filter_map(|v| match *v {
                Visit::Pair { lower, upper } => Some((lower, upper)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn full_up_scan_visits_each_pair_once() {
        let n = 6;
        let visits = collect(Directive::all(Direction::Up), n);
        let ps = pairs(&visits);
        let unique: BTreeSet<_> = ps.iter().copied().collect();
        assert_eq!(ps.len(), n * (n - 1) / 2);
        assert_eq!(unique.len(), ps.len());
        assert!(ps.iter().all(|&(l, u)| l < u));
        let begins = visits
            .iter()
            .filter(|v| matches!(v, Visit::Begin(_)))
            .count();
        assert_eq!(begins, n);
    }

    #[test]
    fn full_down_scan_covers_the_same_pairs() {
        let up: BTreeSet<_> = pairs(&collect(Directive::all(Direction::Up), 5))
            .into_iter()
            .collect();
        let down: BTreeSet<_> = pairs(&collect(Directive::all(Direction::Down), 5))
            .into_iter()
            .collect();
        assert_eq!(up, down);
    }

    #[test]
    fn single_target_directions() {
        let up = collect(Directive::one(2, Direction::Up), 5);
        assert_eq!(up[0], Visit::Begin(2));
        assert_eq!(up[1], Visit::Single(2));
        assert_eq!(pairs(&up), vec![(2, 3), (2, 4)]);

        let down = collect(Directive::one(2, Direction::Down), 5);
        assert_eq!(pairs(&down), vec![(0, 2), (1, 2)]);
        assert!(!down.contains(&Visit::Single(2)));

        let both = collect(Directive::one(2, Direction::Both), 5);
        assert_eq!(pairs(&both), vec![(0, 2), (1, 2), (2, 3), (2, 4)]);

        let neither = collect(Directive::one(2, Direction::Neither), 5);
        assert_eq!(neither, vec![Visit::Single(2)]);
    }

    #[test]
    fn pair_target_is_canonical() {
        let v = collect(Directive::pair(4, 1), 5);
        assert_eq!(v, vec![Visit::Pair { lower: 1, upper: 4 }]);
        assert!(collect(Directive::pair(4, 9), 5).is_empty());
        assert!(collect(Directive::one(7, Direction::Up), 5).is_empty());
    }

    #[test]
    fn failing_visitor_stops_the_walk() {
        let mut seen = 0;
        let walked = Directive::all(Direction::Up).try_for_each_visit(4, |v| {
            seen += 1;
            match v {
                Visit::Pair { lower: 1, upper: 2 } => Err(v),
                _ => Ok(()),
            }
        });
        assert_eq!(walked, Err(Visit::Pair { lower: 1, upper: 2 }));
        // 0's group (begin, single, 3 pairs) then 1's begin, single and first pair
        assert_eq!(seen, 8);
    }
}
