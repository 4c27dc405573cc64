// Voiceloom: stochastic voice separation for polyphonic note sequences.
//
// Takes notes sorted by onset and distributes them across a fixed number of
// melodic voices so each voice reads as a plausible line: small pitch
// steps, short rests, clean chords, no note entering over its own voice's
// tail, and no voices trading places. Assignment happens window by window
// over maximal runs of mutually overlapping notes, using a stochastic local
// search driven by a five-term cost model.
//
// Architecture:
// - notes.rs: parallel-array note storage, input validation, chain links
// - slice.rs: window extraction (maximal mutually overlapping runs)
// - chain.rs: backward walks over per-voice chains and chord groups
// - config.rs: voice count, penalty weights, lookback, seed; JSON loading
// - cost.rs: the five-term cost model and its soft-OR defect algebra
// - search.rs: the per-window stochastic search and the driver loop
//
// Separation is deterministic given a seed, supporting reproducible runs.

pub mod chain;
pub mod config;
pub mod cost;
pub mod notes;
pub mod search;
pub mod slice;

pub use voiceloom_prng as prng;
