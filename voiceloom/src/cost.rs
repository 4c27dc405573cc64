// The cost model: five penalties over a window's candidate voice assignment.
//
// Evaluation first threads the window's notes onto the chains left by
// committed windows (scratch heads only, committed links are never touched),
// then each penalty walks the chains backward from the per-voice heads.
// Defects combine with a soft OR, a + (1 - a) * b, so every term stays in
// [0, 1] no matter how many defects pile up; the weighted terms then sum.
//
// Terms:
// - pitch: each window note against the contour of the groups before it
// - gap: silence between a chord group and the group before it
// - chord: duration and pitch spread inside each group
// - overlap: a group sounding over the tail of its voice's previous group
// - cross: per-voice window averages ordered against pre-window averages
//
// **Critical constraint: determinism.** Evaluation is pure arithmetic over
// the buffer in a fixed walk order: adds, multiplies, divides, comparisons.
// Identical assignments always score identically.

use crate::chain::{
    chord_position_sum, highest_in_chord, latest_release_in_chord, longest_in_chord,
    lowest_in_chord, nearest_position_in_chord, previous_chord, shortest_in_chord,
};
use crate::config::SeparationConfig;
use crate::notes::NoteBuffer;
use smallvec::SmallVec;
use std::ops::Range;

/// Per-voice chain heads: index is the voice number, `None` means the voice
/// has no notes yet. Inline capacity covers typical voice counts.
type VoiceHeads = SmallVec<[Option<usize>; 8]>;

/// Soft OR of two defects in [0, 1]: saturates instead of summing.
pub fn accumulate_defect(running: f64, defect: f64) -> f64 {
    running + (1.0 - running) * defect
}

/// Thread the window's notes onto the committed chains, scratch-only.
///
/// Returns the would-be per-voice heads after the window. `notes.link` is
/// rewritten for window notes on every evaluation; links before
/// `window.start` stay committed and untouched.
fn thread_window(
    notes: &mut NoteBuffer,
    window: &Range<usize>,
    heads: &[Option<usize>],
) -> VoiceHeads {
    let mut scratch = VoiceHeads::from(heads);
    for i in window.clone() {
        let v = notes.voice[i];
        notes.link[i] = scratch[v];
        scratch[v] = Some(i);
    }
    scratch
}

/// One window evaluation split by term. Every field is already weighted.
#[derive(Debug, Clone, Copy)]
pub struct CostBreakdown {
    pub pitch: f64,
    pub gap: f64,
    pub chord: f64,
    pub overlap: f64,
    pub cross: f64,
    pub total: f64,
}

/// Score the window's current voice assignment, split by term.
///
/// `heads` are the committed per-voice chain heads from the windows before
/// this one; pass all `None` for the first window.
pub fn cost_breakdown(
    notes: &mut NoteBuffer,
    window: &Range<usize>,
    heads: &[Option<usize>],
    config: &SeparationConfig,
) -> CostBreakdown {
    let scratch = thread_window(notes, window, heads);
    let start = window.start;
    let pitch = config.weights.pitch * pitch_penalty(notes, start, &scratch, config.pitch_lookback);
    let gap = config.weights.gap * gap_penalty(notes, start, &scratch);
    let chord = config.weights.chord * chord_penalty(notes, start, &scratch);
    let overlap = config.weights.overlap * overlap_penalty(notes, start, &scratch);
    let cross = config.weights.cross * cross_penalty(notes, start, &scratch);
    CostBreakdown {
        pitch,
        gap,
        chord,
        overlap,
        cross,
        total: pitch + gap + chord + overlap + cross,
    }
}

/// Weighted total cost of the window's current voice assignment.
pub fn total_cost(
    notes: &mut NoteBuffer,
    window: &Range<usize>,
    heads: &[Option<usize>],
    config: &SeparationConfig,
) -> f64 {
    cost_breakdown(notes, window, heads, config).total
}

/// Melodic jump badness: every window note against the pitch predicted from
/// the groups before it. Per note, the prediction starts at the previous
/// group's nearest pitch and blends in up to `lookback` older groups at
/// 0.8/0.2; the jump is |pitch - prediction| / 128, capped at 1. Defects
/// soft-OR per voice, then across voices.
fn pitch_penalty(notes: &NoteBuffer, start: usize, heads: &[Option<usize>], lookback: u32) -> f64 {
    let mut total = 0.0;
    for &head in heads {
        let mut voice_defect = 0.0;
        let mut cursor = head;
        while let Some(i) = cursor {
            if i < start {
                break;
            }
            if let Some(group) = previous_chord(notes, i) {
                let target = f64::from(notes.position[i]);
                let mut predicted = nearest_position_in_chord(notes, group, target);
                let mut older = previous_chord(notes, group);
                for _ in 0..lookback {
                    let Some(g) = older else { break };
                    predicted = 0.8 * predicted + 0.2 * nearest_position_in_chord(notes, g, target);
                    older = previous_chord(notes, g);
                }
                let jump = ((target - predicted).abs() / 128.0).min(1.0);
                voice_defect = accumulate_defect(voice_defect, jump);
            }
            cursor = notes.link[i];
        }
        total = accumulate_defect(total, voice_defect);
    }
    total
}

/// Rest badness: for each window chord group, the silence between the
/// previous group's latest release and this group's onset, over four time
/// units, clamped to [0, 1]. A group with no predecessor measures from time
/// zero. Averaged over every group visited; zero when nothing was visited.
fn gap_penalty(notes: &NoteBuffer, start: usize, heads: &[Option<usize>]) -> f64 {
    let mut total = 0.0;
    let mut counted = 0u32;
    for &head in heads {
        let mut cursor = head;
        while let Some(i) = cursor {
            if i < start {
                break;
            }
            let release = match previous_chord(notes, i) {
                Some(group) => notes.offset[latest_release_in_chord(notes, group)],
                None => 0.0,
            };
            total += ((notes.onset[i] - release) / 4.0).clamp(0.0, 1.0);
            counted += 1;
            cursor = previous_chord(notes, i);
        }
    }
    if counted == 0 {
        0.0
    } else {
        total / f64::from(counted)
    }
}

/// Chord raggedness: per window group, how unequal the durations are
/// (1 - shortest/longest) soft-ORed with how wide the pitch spread is
/// relative to two octaves. One accumulator across all voices.
fn chord_penalty(notes: &NoteBuffer, start: usize, heads: &[Option<usize>]) -> f64 {
    let mut total = 0.0;
    for &head in heads {
        let mut cursor = head;
        while let Some(i) = cursor {
            if i < start {
                break;
            }
            let d_min = notes.duration[shortest_in_chord(notes, i)];
            let d_max = notes.duration[longest_in_chord(notes, i)];
            let p_min = notes.position[lowest_in_chord(notes, i)];
            let p_max = notes.position[highest_in_chord(notes, i)];
            let ragged = 1.0 - d_min / d_max;
            let spread = (f64::from(p_max - p_min) / 24.0).min(1.0);
            total = accumulate_defect(total, accumulate_defect(ragged, spread));
            cursor = previous_chord(notes, i);
        }
    }
    total
}

/// Self-shadowing: a group entering while the longest note of its voice's
/// previous group still sounds. Badness is how deep into that note the new
/// onset falls. Soft-OR within each voice, then across voices.
fn overlap_penalty(notes: &NoteBuffer, start: usize, heads: &[Option<usize>]) -> f64 {
    let mut total = 0.0;
    for &head in heads {
        let mut voice_defect = 0.0;
        let mut cursor = head;
        while let Some(i) = cursor {
            if i < start {
                break;
            }
            if let Some(group) = previous_chord(notes, i) {
                let longest = longest_in_chord(notes, group);
                if notes.overlaps(longest, i) {
                    let depth =
                        1.0 - (notes.onset[i] - notes.onset[longest]) / notes.duration[longest];
                    voice_defect = accumulate_defect(voice_defect, depth);
                }
            }
            cursor = previous_chord(notes, i);
        }
        total = accumulate_defect(total, voice_defect);
    }
    total
}

/// Voice crossing: sorts the voices that reach back past the window start
/// by their average pitch inside the window; if their pre-window averages
/// are not in the same order, the penalty is 1, otherwise 0. Voices with no
/// pre-window group stay out of the comparison.
fn cross_penalty(notes: &NoteBuffer, start: usize, heads: &[Option<usize>]) -> f64 {
    let mut entries: SmallVec<[(f64, f64); 8]> = SmallVec::new();
    for &head in heads {
        let Some(first) = head else { continue };
        let mut sum = 0.0;
        let mut count = 0u32;
        let mut i = first;
        let boundary = loop {
            let (group_sum, group_count) = chord_position_sum(notes, i);
            sum += group_sum;
            count += group_count;
            match previous_chord(notes, i) {
                Some(j) if j >= start => i = j,
                older => break older,
            }
        };
        if let Some(outside) = boundary {
            let (outside_sum, outside_count) = chord_position_sum(notes, outside);
            entries.push((
                sum / f64::from(count),
                outside_sum / f64::from(outside_count),
            ));
        }
    }
    entries.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
    let mut floor = f64::NEG_INFINITY;
    for &(_, outside) in &entries {
        if outside < floor {
            return 1.0;
        }
        floor = outside;
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PenaltyWeights;
    use crate::notes::Note;

    fn weights_only(select: impl Fn(&mut PenaltyWeights)) -> SeparationConfig {
        let mut weights = PenaltyWeights {
            pitch: 0.0,
            gap: 0.0,
            chord: 0.0,
            overlap: 0.0,
            cross: 0.0,
        };
        select(&mut weights);
        SeparationConfig {
            weights,
            ..SeparationConfig::default()
        }
    }

    #[test]
    fn defects_saturate_toward_one() {
        assert_eq!(accumulate_defect(0.0, 0.25), 0.25);
        assert_eq!(accumulate_defect(0.25, 0.0), 0.25);
        assert_eq!(accumulate_defect(1.0, 0.7), 1.0);
        let piled = accumulate_defect(accumulate_defect(0.9, 0.9), 0.9);
        assert!(piled < 1.0 && piled > 0.9);
    }

    #[test]
    fn single_note_window_costs_nothing() {
        let notes = [Note::new(0.0, 1.0, 60)];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        let config = SeparationConfig::default();
        let cost = total_cost(&mut buffer, &(0..1), &[None, None], &config);
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn threading_is_scratch_only_before_the_window() {
        let notes = [
            Note::new(0.0, 1.0, 60),
            Note::new(1.0, 1.0, 62),
            Note::new(2.0, 1.0, 64),
        ];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        // Note 1 committed onto note 0's chain.
        buffer.link[1] = Some(0);
        let config = SeparationConfig::default();
        let heads = [Some(1), None];
        total_cost(&mut buffer, &(2..3), &heads, &config);
        assert_eq!(buffer.link[0], None);
        assert_eq!(buffer.link[1], Some(0));
        assert_eq!(buffer.link[2], Some(1));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let notes = [
            Note::new(0.0, 2.0, 48),
            Note::new(0.0, 1.0, 60),
            Note::new(1.0, 1.0, 62),
        ];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        buffer.voice[1] = 1;
        buffer.voice[2] = 1;
        let config = SeparationConfig::default();
        let heads = [None, None];
        let first = total_cost(&mut buffer, &(0..3), &heads, &config);
        let links = buffer.links().to_vec();
        let second = total_cost(&mut buffer, &(0..3), &heads, &config);
        assert_eq!(first, second);
        assert_eq!(buffer.links(), &links[..]);
    }

    #[test]
    fn pitch_penalty_measures_jump_from_previous_group() {
        let notes = [Note::new(0.0, 1.0, 60), Note::new(1.0, 1.0, 72)];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        let config = weights_only(|w| w.pitch = 1.0);
        // Note 0 already committed; the window holds note 1 on the same voice.
        let scored = cost_breakdown(&mut buffer, &(1..2), &[Some(0)], &config);
        assert_eq!(scored.pitch, 12.0 / 128.0);
        assert_eq!(scored.total, 12.0 / 128.0);
    }

    #[test]
    fn pitch_lookback_blends_older_groups() {
        let notes = [
            Note::new(0.0, 1.0, 60),
            Note::new(1.0, 1.0, 64),
            Note::new(2.0, 1.0, 64),
        ];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        buffer.link[1] = Some(0);
        let mut config = weights_only(|w| w.pitch = 1.0);

        // No lookback: prediction is the previous group's 64, a zero jump.
        config.pitch_lookback = 0;
        let scored = cost_breakdown(&mut buffer, &(2..3), &[Some(1)], &config);
        assert_eq!(scored.pitch, 0.0);

        // One older group drags the prediction toward 60.
        config.pitch_lookback = 1;
        let scored = cost_breakdown(&mut buffer, &(2..3), &[Some(1)], &config);
        let predicted: f64 = 0.8 * 64.0 + 0.2 * 60.0;
        assert_eq!(scored.pitch, (64.0 - predicted).abs() / 128.0);
    }

    #[test]
    fn gap_penalty_averages_over_groups() {
        // Voice with two groups: a one-unit rest between them, and the first
        // group measured from time zero.
        let notes = [Note::new(1.0, 1.0, 60), Note::new(3.0, 1.0, 62)];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        let config = weights_only(|w| w.gap = 1.0);
        let scored = cost_breakdown(&mut buffer, &(0..2), &[None], &config);
        // Group at 3.0: rest is (3 - 2) / 4. Group at 1.0: (1 - 0) / 4.
        assert_eq!(scored.gap, (0.25 + 0.25) / 2.0);
    }

    #[test]
    fn gap_penalty_clamps_long_rests() {
        let notes = [Note::new(0.0, 1.0, 60), Note::new(20.0, 1.0, 62)];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        let config = weights_only(|w| w.gap = 1.0);
        let scored = cost_breakdown(&mut buffer, &(0..2), &[None], &config);
        // The nineteen-unit rest clamps to 1; the first group adds nothing.
        assert_eq!(scored.gap, (1.0 + 0.0) / 2.0);
    }

    #[test]
    fn chord_penalty_scores_ragged_groups() {
        let notes = [Note::new(0.0, 1.0, 60), Note::new(0.0, 2.0, 67)];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        let config = weights_only(|w| w.chord = 1.0);
        let scored = cost_breakdown(&mut buffer, &(0..2), &[None], &config);
        // Durations 1 and 2: raggedness 0.5. Spread 7 of 24 semitones.
        assert_eq!(scored.chord, 0.5 + 0.5 * (7.0 / 24.0));
    }

    #[test]
    fn clean_chord_costs_nothing() {
        let notes = [Note::new(0.0, 1.0, 60), Note::new(0.0, 1.0, 60)];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        let config = weights_only(|w| w.chord = 1.0);
        let scored = cost_breakdown(&mut buffer, &(0..2), &[None], &config);
        assert_eq!(scored.chord, 0.0);
    }

    #[test]
    fn overlap_penalty_scores_shadowed_entries() {
        // Second note enters halfway through the first, same voice.
        let notes = [Note::new(0.0, 2.0, 60), Note::new(1.0, 2.0, 60)];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        let config = weights_only(|w| w.overlap = 1.0);
        let scored = cost_breakdown(&mut buffer, &(0..2), &[None], &config);
        assert_eq!(scored.overlap, 0.5);
    }

    #[test]
    fn touching_notes_do_not_overlap() {
        let notes = [Note::new(0.0, 2.0, 60), Note::new(2.0, 2.0, 60)];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        let config = weights_only(|w| w.overlap = 1.0);
        let scored = cost_breakdown(&mut buffer, &(0..2), &[None], &config);
        assert_eq!(scored.overlap, 0.0);
    }

    #[test]
    fn cross_penalty_fires_when_voices_trade_places() {
        // Committed groups: voice 0 at 60, voice 1 at 66. In the window,
        // voice 0 leaps above voice 1.
        let notes = [
            Note::new(0.0, 1.0, 60),
            Note::new(0.0, 1.0, 66),
            Note::new(1.0, 1.0, 70),
            Note::new(1.0, 1.0, 65),
        ];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        buffer.voice[1] = 1;
        buffer.voice[3] = 1;
        buffer.link[2] = Some(0);
        buffer.link[3] = Some(1);
        let penalty = cross_penalty(&buffer, 2, &[Some(2), Some(3)]);
        assert_eq!(penalty, 1.0);
    }

    #[test]
    fn cross_penalty_accepts_preserved_order() {
        let notes = [
            Note::new(0.0, 1.0, 60),
            Note::new(0.0, 1.0, 66),
            Note::new(1.0, 1.0, 62),
            Note::new(1.0, 1.0, 68),
        ];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        buffer.voice[1] = 1;
        buffer.voice[3] = 1;
        buffer.link[2] = Some(0);
        buffer.link[3] = Some(1);
        let penalty = cross_penalty(&buffer, 2, &[Some(2), Some(3)]);
        assert_eq!(penalty, 0.0);
    }

    #[test]
    fn cross_penalty_ignores_voices_without_history() {
        // Neither voice reaches back past the window start, so nothing can
        // be compared and nothing crosses.
        let notes = [Note::new(0.0, 1.0, 60), Note::new(0.0, 1.0, 72)];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        buffer.voice[1] = 1;
        let penalty = cross_penalty(&buffer, 0, &[Some(0), Some(1)]);
        assert_eq!(penalty, 0.0);
    }

    #[test]
    fn cross_penalty_averages_across_window_groups() {
        // Voice 0 has two window groups (62 then 70, average 66) against a
        // committed group at 60; voice 1 sits still at 64 against 65. Window
        // averages order 64 < 66, history orders 65 > 60: crossed.
        let notes = [
            Note::new(0.0, 1.0, 60),
            Note::new(0.0, 1.0, 65),
            Note::new(1.0, 1.0, 62),
            Note::new(1.0, 1.0, 64),
            Note::new(2.0, 1.0, 70),
        ];
        let mut buffer = NoteBuffer::from_notes(&notes).unwrap();
        buffer.voice[1] = 1;
        buffer.voice[3] = 1;
        buffer.link[2] = Some(0);
        buffer.link[3] = Some(1);
        buffer.link[4] = Some(2);
        let penalty = cross_penalty(&buffer, 2, &[Some(4), Some(3)]);
        assert_eq!(penalty, 1.0);
    }
}
