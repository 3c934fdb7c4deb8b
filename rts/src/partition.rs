//! Ordered-partition combinatorics used by the predecessor operators.
//!
//! Discrete predecessor computation must expand one successor region into every way the reset
//! clocks could have been arranged before the transition fired: set partitions of the reset
//! clocks, orderings of the resulting blocks, insertion points among the surviving fractional
//! groups, and admissible integer values. The helpers here enumerate each of those dimensions.

use std::collections::{BTreeMap, HashMap, VecDeque};

use itertools::Itertools;

use crate::ClockSet;

// RESTRICTED GROWTH STRINGS
// ================================================================================================

/// Enumerates every restricted growth string of length `n`.
///
/// A restricted growth string `a` has `a[0] = 0` and `a[i] <= 1 + max(a[0..i])`; each string
/// encodes one set partition of `{0, .., n-1}` (element `i` belongs to block `a[i]`), so the
/// result has Bell-number length. The implementation follows the reflected Gray code of
/// "Maximize the Rightmost Digit: Gray Codes for Restricted Growth Strings": successive strings
/// differ in a single digit and every string is emitted exactly once.
pub fn restricted_growth_strings(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![vec![]];
    }

    let mut strings = Vec::new();

    let mut a = vec![0i64; n];
    let mut f: Vec<usize> = (0..=n).collect();
    let mut s = vec![0i64; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut v = vec![true; n];

    // the all-zeros string is the trivial one-block partition
    strings.push(a.iter().map(|&d| d as usize).collect());

    let threshold = n - 1;
    while f[0] < threshold {
        let idx = f[0];
        f[0] = 0;

        if a[idx] == s[idx] {
            let m = if v[idx] {
                v[idx] = false;
                0
            } else if stack.is_empty() {
                1
            } else {
                a[*stack.last().expect("stack is non-empty")]
            };

            a[idx] = m + 1;
            if m + 1 != 1 {
                stack.push(idx);
            }
        } else if a[idx] == 2 && s[idx] == 1 {
            a[idx] -= 2;
            if stack.last() == Some(&idx) {
                stack.pop();
            }
        } else {
            a[idx] -= 1;
            if stack.last() == Some(&idx) {
                stack.pop();
            }
        }

        strings.push(a.iter().map(|&d| d as usize).collect());

        if a[idx] == 1 - s[idx] {
            f[idx] = f[idx + 1];
            f[idx + 1] = idx + 1;
            s[idx] = a[idx];
        }
    }

    strings
}

/// Materializes a restricted growth string over `members` into clock-set blocks.
///
/// Block `j` collects every member whose digit is `j`; blocks come out in digit order. An empty
/// string yields no blocks.
pub fn blocks_from_rgs(capacity: usize, rgs: &[usize], members: &[usize]) -> Vec<ClockSet> {
    debug_assert_eq!(rgs.len(), members.len());
    if rgs.is_empty() {
        return Vec::new();
    }

    let num_blocks = rgs.iter().copied().max().expect("string is non-empty") + 1;
    let mut blocks = vec![ClockSet::empty(capacity); num_blocks];
    for (digit, &member) in rgs.iter().zip(members) {
        blocks[*digit].insert(member);
    }
    // the Gray code may label blocks non-contiguously; only the occupied ones are blocks
    blocks.retain(|block| !block.is_empty());
    blocks
}

/// Enumerates the set partitions of `set` as block lists (blocks in restricted-growth order).
pub fn set_partitions(set: &ClockSet) -> Vec<Vec<ClockSet>> {
    let members: Vec<usize> = set.ones().collect();
    restricted_growth_strings(members.len())
        .iter()
        .map(|rgs| blocks_from_rgs(set.capacity(), rgs, &members))
        .collect()
}

// DEQUE GENERATION
// ================================================================================================

/// Enumerates every deque obtained by inserting, at each position named by `insertions`, every
/// permutation of the block vector attached to that position.
///
/// Positions are interpreted against `base` and processed in descending order, so an insertion
/// never shifts a smaller position. Permutations of one vector are computed once per call and
/// cached for the recursion; the cache lives on this call's stack and is dropped on return.
pub fn generate_all_deques(
    insertions: &BTreeMap<usize, Vec<ClockSet>>,
    base: &VecDeque<ClockSet>,
) -> Vec<VecDeque<ClockSet>> {
    let positions: Vec<usize> = insertions.keys().rev().copied().collect();
    let mut output = Vec::new();
    let mut cache: HashMap<usize, Vec<Vec<ClockSet>>> = HashMap::new();

    generate_deques(insertions, &positions, 0, base.clone(), &mut cache, &mut output);
    output
}

fn generate_deques(
    insertions: &BTreeMap<usize, Vec<ClockSet>>,
    positions: &[usize],
    next: usize,
    current: VecDeque<ClockSet>,
    cache: &mut HashMap<usize, Vec<Vec<ClockSet>>>,
    output: &mut Vec<VecDeque<ClockSet>>,
) {
    let Some(&pos) = positions.get(next) else {
        output.push(current);
        return;
    };

    let blocks = &insertions[&pos];
    if !cache.contains_key(&pos) {
        let permutations: Vec<Vec<ClockSet>> =
            blocks.iter().cloned().permutations(blocks.len()).collect();
        cache.insert(pos, permutations);
    }

    for perm_idx in 0..cache[&pos].len() {
        let mut extended = current.clone();
        for (offset, block) in cache[&pos][perm_idx].clone().into_iter().enumerate() {
            extended.insert(pos + offset, block);
        }
        generate_deques(insertions, positions, next + 1, extended, cache, output);
    }
}

// INTEGER INTERVAL COMBINATIONS
// ================================================================================================

/// Enumerates every assignment `key -> v` with `v` drawn from that key's closed interval, via a
/// mixed-radix counter. An empty interval map, or any empty interval, yields no assignments.
pub fn integer_interval_combinations(intervals: &BTreeMap<usize, (u32, u32)>) -> Vec<Vec<(usize, u32)>> {
    let mut result = Vec::new();
    if intervals.is_empty() || intervals.values().any(|&(lo, hi)| hi < lo) {
        return result;
    }

    let keys: Vec<usize> = intervals.keys().copied().collect();
    let ranges: Vec<(u32, u32)> = intervals.values().copied().collect();

    let total: usize = ranges.iter().map(|&(lo, hi)| (hi - lo + 1) as usize).product();
    result.reserve(total);

    for mut counter in 0..total {
        let mut combination = Vec::with_capacity(keys.len());
        for (key, &(lo, hi)) in keys.iter().zip(&ranges) {
            let radix = (hi - lo + 1) as usize;
            combination.push((*key, lo + (counter % radix) as u32));
            counter /= radix;
        }
        result.push(combination);
    }

    result
}

// CARTESIAN PRODUCT
// ================================================================================================

/// N-ary cartesian product of the input vectors, in positional order.
pub fn cartesian_product<T: Clone>(input: &[Vec<T>]) -> Vec<Vec<T>> {
    if input.is_empty() {
        return Vec::new();
    }

    let mut result: Vec<Vec<T>> = vec![Vec::new()];
    for inner in input {
        let mut extended = Vec::with_capacity(result.len() * inner.len());
        for combination in &result {
            for value in inner {
                let mut with_value = combination.clone();
                with_value.push(value.clone());
                extended.push(with_value);
            }
        }
        result = extended;
    }

    result
}

// TESTS
// ================================================================================================
