// Stochastic local search over voice assignments, one window at a time.
//
// Each window starts with every note on voice 0 and improves from there by
// a mix of moves: with probability 0.8 the single reassignment that lowers
// the window cost the most is applied (ties keep the incumbent), otherwise
// one random note moves to a random other voice. The best assignment seen
// so far is snapshotted and recommitted at the end, so random moves can
// explore freely without losing ground. The search stops after
// window length * max_voices * 3 consecutive non-improving evaluations.
//
// Committing a window threads its notes onto the per-voice chains and
// advances the heads; later windows see only those heads, never the
// window's interior.
//
// **Critical constraint: determinism.** All randomness flows from one
// `LcgRng` seeded by the config, and the draw order is fixed by the loop
// structure, so a given seed and input always produce the same assignment.

use crate::config::SeparationConfig;
use crate::cost::total_cost;
use crate::notes::{NoteBuffer, SeparationError, SeparationResult};
use crate::slice::next_slice;
use std::ops::Range;
use voiceloom_prng::LcgRng;

/// Counters and the summed committed cost from one separation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparationStats {
    /// Windows processed.
    pub windows: usize,
    /// Search iterations across all windows.
    pub steps: usize,
    /// Sum of the committed windows' costs.
    pub cost: f64,
}

/// Assign every note in `notes` to one of `config.max_voices` voices.
///
/// Windows are solved left to right; the chains committed by earlier
/// windows are the history later windows are scored against. On success the
/// buffer's `voice` and `link` columns hold the assignment.
pub fn separate(
    notes: &mut NoteBuffer,
    config: &SeparationConfig,
) -> SeparationResult<SeparationStats> {
    if config.max_voices == 0 {
        return Err(SeparationError::NoVoices);
    }
    let mut rng = LcgRng::new(config.seed);
    let mut heads: Vec<Option<usize>> = vec![None; config.max_voices];
    let mut stats = SeparationStats {
        windows: 0,
        steps: 0,
        cost: 0.0,
    };
    let mut cursor = 0;
    while let Some(window) = next_slice(notes, cursor) {
        cursor = window.end;
        let (cost, steps) = solve_window(notes, &window, &mut heads, config, &mut rng);
        stats.windows += 1;
        stats.steps += steps;
        stats.cost += cost;
    }
    Ok(stats)
}

/// Search one window and commit the best assignment found.
///
/// Returns the committed cost and the number of search iterations.
fn solve_window(
    notes: &mut NoteBuffer,
    window: &Range<usize>,
    heads: &mut [Option<usize>],
    config: &SeparationConfig,
    rng: &mut LcgRng,
) -> (f64, usize) {
    for i in window.clone() {
        notes.voice[i] = 0;
    }
    let mut best: Vec<usize> = vec![0; window.len()];
    let mut best_cost = total_cost(notes, window, heads, config);
    let stall_limit = window.len() * config.max_voices * 3;
    let mut stalled = 0;
    let mut steps = 0;
    while stalled < stall_limit {
        if rng.next_f64() <= 0.8 {
            greedy_move(notes, window, heads, config);
        } else {
            random_move(notes, window, config.max_voices, rng);
        }
        steps += 1;
        let cost = total_cost(notes, window, heads, config);
        if cost < best_cost {
            for (slot, i) in window.clone().enumerate() {
                best[slot] = notes.voice[i];
            }
            best_cost = cost;
            stalled = 0;
        } else {
            stalled += 1;
        }
    }
    for (slot, i) in window.clone().enumerate() {
        notes.voice[i] = best[slot];
        notes.link[i] = heads[best[slot]];
        heads[best[slot]] = Some(i);
    }
    (best_cost, steps)
}

/// Apply the single note-to-voice reassignment that lowers the window cost
/// the most. Keeps the current assignment when nothing improves on it.
fn greedy_move(
    notes: &mut NoteBuffer,
    window: &Range<usize>,
    heads: &[Option<usize>],
    config: &SeparationConfig,
) {
    let mut best_cost = total_cost(notes, window, heads, config);
    let mut best_move: Option<(usize, usize)> = None;
    for i in window.clone() {
        let original = notes.voice[i];
        for v in 0..config.max_voices {
            if v == original {
                continue;
            }
            notes.voice[i] = v;
            let cost = total_cost(notes, window, heads, config);
            if cost < best_cost {
                best_cost = cost;
                best_move = Some((i, v));
            }
        }
        notes.voice[i] = original;
    }
    if let Some((i, v)) = best_move {
        notes.voice[i] = v;
    }
}

/// Move one random window note to a random voice other than its current
/// one. A single voice leaves nowhere to move, so no draws are made.
fn random_move(notes: &mut NoteBuffer, window: &Range<usize>, max_voices: usize, rng: &mut LcgRng) {
    if max_voices < 2 {
        return;
    }
    let i = rng.range_usize(window.start, window.end);
    let mut v = rng.range_usize(0, max_voices - 1);
    if v >= notes.voice[i] {
        v += 1;
    }
    notes.voice[i] = v;
}
