use super::Region;
use crate::ClockSet;

// DELAY SUCCESSOR
// ================================================================================================

impl Region {
    /// Computes the unique region reached by letting an infinitesimal amount of time elapse.
    ///
    /// Three shapes:
    ///
    /// - clocks sit at fractional zero: they acquire the smallest positive fraction and become
    ///   the new front bounded group;
    /// - no clock at zero but some are fractional: the largest-fraction group reaches the next
    ///   integer; clocks crossing their maximum constant form one new most-recent unbounded
    ///   group, the rest re-enter `x0`;
    /// - everything unbounded: the region is a fixed point of delay and is returned unchanged.
    pub fn delay_successor(&self, max_constants: &[u32]) -> Region {
        let mut next = self.clone();

        if !next.x0.is_empty() {
            let zero_group = next.x0.clone();
            next.x0.clear();
            next.bounded.push_front(zero_group);
        } else if let Some(back) = next.bounded.pop_back() {
            let mut crossed = ClockSet::empty(next.num_clocks());
            for clock in back.ones() {
                next.h[clock] += 1;
                if next.h[clock] > max_constants[clock] {
                    crossed.insert(clock);
                } else {
                    next.x0.insert(clock);
                }
            }
            if !crossed.is_empty() {
                next.unbounded.push_front(crossed);
            }
        }

        next.debug_assert_partition();
        next
    }

    // DELAY PREDECESSORS
    // ================================================================================================

    /// Computes the regions whose delay successor is this region.
    ///
    /// The inverse relation is multi-valued: a region whose `x0` clocks all carry a positive
    /// integer part may have just seen those clocks reach the integer, with or without the most
    /// recent unbounded group crossing in the same step; a region with empty `x0` may have just
    /// seen its front bounded group leave zero, or its most recent unbounded group cross alone.
    /// Regions with no admissible pre-image (the initial region among them) yield an empty vector.
    pub fn delay_predecessors(&self, max_constants: &[u32]) -> Vec<Region> {
        let mut predecessors = Vec::new();

        if !self.x0.is_empty() {
            // the x0 clocks were just incremented off the back bounded group
            if self.x0.ones().all(|clock| self.h[clock] >= 1) {
                let mut pred = self.clone();
                let back = pred.x0.clone();
                pred.x0.clear();
                for clock in back.ones() {
                    pred.h[clock] -= 1;
                }

                // the most recent unbounded group may have crossed in the same step
                if let Some(crossed) = pred.unbounded.front().cloned() {
                    let mut with_crossed = pred.clone();
                    let mut wide_back = back.clone();
                    with_crossed.unbounded.pop_front();
                    for clock in crossed.ones() {
                        with_crossed.h[clock] = max_constants[clock];
                        wide_back.insert(clock);
                    }
                    with_crossed.bounded.push_back(wide_back);
                    with_crossed.debug_assert_partition();
                    predecessors.push(with_crossed);
                }

                pred.bounded.push_back(back);
                pred.debug_assert_partition();
                predecessors.push(pred);
            }
        } else {
            // an entire bounded group may have crossed at once, leaving x0 empty
            if let Some(crossed) = self.unbounded.front().cloned() {
                let mut pred = self.clone();
                pred.unbounded.pop_front();
                for clock in crossed.ones() {
                    pred.h[clock] = max_constants[clock];
                }
                pred.bounded.push_back(crossed);
                pred.debug_assert_partition();
                predecessors.push(pred);
            }

            // the front bounded group had the smallest fraction and was at zero one step ago
            if let Some(front) = self.bounded.front().cloned() {
                let mut pred = self.clone();
                pred.bounded.pop_front();
                pred.x0 = front;
                pred.debug_assert_partition();
                predecessors.push(pred);
            }
        }

        predecessors
    }
}

// TESTS
// ================================================================================================
