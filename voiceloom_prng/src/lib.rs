// Deterministic, portable pseudo-random number generator.
//
// Implements a 32-bit linear congruential generator with the Numerical
// Recipes multiplier/increment pair. This is a hand-rolled implementation
// with zero external dependencies, chosen for portability and to guarantee
// identical output across all platforms. The entire generator state is one
// `u32`, so it is trivial to seed, clone mid-stream, and serialize.
//
// This crate is the single source of randomness for the voiceloom separation
// search. By avoiding external RNG crates (like `rand`) we guarantee that a
// given seed reproduces the exact same voice assignment, release after
// release.
//
// **Critical constraint: determinism.** Every draw advances the state exactly
// once, and the core step is integer-only arithmetic. Callers that consume
// draws in a fixed order get a stable stream; one extra or skipped draw would
// silently change every assignment downstream.

use serde::{Deserialize, Serialize};

const LCG_MULTIPLIER: u32 = 1_664_525;
const LCG_INCREMENT: u32 = 1_013_904_223;

/// Linear congruential generator, the project's sole source of randomness.
///
/// All random decisions in the separation search draw from one instance of
/// this generator, seeded from the run configuration, ensuring reproducible
/// assignment streams.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LcgRng {
    state: u32,
}

impl LcgRng {
    /// Create a new PRNG whose state starts at `seed`.
    ///
    /// The seed is the state itself: the first draw already applies the LCG
    /// step, so `new(s).next_u32()` never returns `s` unchanged. Two `LcgRng`
    /// instances created with the same seed produce identical sequences.
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Generate the next `u32` in the sequence.
    ///
    /// One wrapping multiply and one wrapping add; the updated state is the
    /// output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        self.state
    }

    /// Generate a uniform `f64` in [0, 1).
    ///
    /// One raw draw scaled by 2^32. The scaling happens after the integer
    /// state update, so the stream stays aligned with `next_u32`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Reduces one raw draw by modulo. The modulo bias is negligible for the
    /// small ranges the search draws from (window indices, voice numbers),
    /// and keeping it a single state advance keeps the stream stable.
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        assert!(low < high, "range_usize: low must be less than high");
        low + self.next_u32() as usize % (high - low)
    }
}
