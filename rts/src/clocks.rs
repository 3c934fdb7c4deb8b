use core::{cmp::Ordering, fmt, hash::Hash};

use fixedbitset::FixedBitSet;

// CLOCK SET
// ================================================================================================

/// A set of clock indices of one automaton.
///
/// Regions partition the clock index set into such sets; all sets belonging to the same automaton
/// share the same capacity (the automaton's clock count). Comparisons and hashing are only
/// meaningful between sets of equal capacity, which the region operators maintain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClockSet(FixedBitSet);

impl ClockSet {
    // CONSTRUCTORS
    // --------------------------------------------------------------------------------------------

    /// An empty set over `num_clocks` clock indices.
    pub fn empty(num_clocks: usize) -> Self {
        Self(FixedBitSet::with_capacity(num_clocks))
    }

    /// The full set over `num_clocks` clock indices.
    pub fn full(num_clocks: usize) -> Self {
        let mut bits = FixedBitSet::with_capacity(num_clocks);
        bits.set_range(.., true);
        Self(bits)
    }

    /// Builds a set from explicit indices.
    pub fn from_indices(num_clocks: usize, indices: &[usize]) -> Self {
        let mut set = Self::empty(num_clocks);
        for &i in indices {
            set.insert(i);
        }
        set
    }

    // ACCESSORS
    // --------------------------------------------------------------------------------------------

    /// Number of clock indices the set ranges over (not the number of members).
    pub fn capacity(&self) -> usize {
        self.0.len()
    }

    /// Number of member clocks.
    pub fn len(&self) -> usize {
        self.0.count_ones(..)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, clock: usize) -> bool {
        self.0.contains(clock)
    }

    /// Iterates member indices in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.ones()
    }

    pub fn is_subset(&self, other: &ClockSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_disjoint(&self, other: &ClockSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    // MUTATORS
    // --------------------------------------------------------------------------------------------

    pub fn insert(&mut self, clock: usize) {
        self.0.set(clock, true);
    }

    pub fn remove(&mut self, clock: usize) {
        self.0.set(clock, false);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn union_with(&mut self, other: &ClockSet) {
        self.0.union_with(&other.0);
    }

    pub fn difference_with(&mut self, other: &ClockSet) {
        self.0.difference_with(&other.0);
    }

    /// Returns the intersection as a new set.
    pub fn intersection(&self, other: &ClockSet) -> ClockSet {
        let mut bits = self.0.clone();
        bits.intersect_with(&other.0);
        Self(bits)
    }
}

impl Hash for ClockSet {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        // equal-capacity sets with equal members emit identical index sequences
        self.len().hash(state);
        for clock in self.ones() {
            clock.hash(state);
        }
    }
}

impl PartialOrd for ClockSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClockSet {
    /// Lexicographic over the ascending member indices; any total order works for the canonical
    /// sort, this one keeps `{0} < {1}` intuitive.
    fn cmp(&self, other: &Self) -> Ordering {
        self.ones().cmp(other.ones())
    }
}

impl fmt::Display for ClockSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (n, clock) in self.ones().enumerate() {
            if n > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{clock}")?;
        }
        f.write_str("}")
    }
}

// TESTS
// ================================================================================================
