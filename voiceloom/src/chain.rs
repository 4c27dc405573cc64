// Backward walks over per-voice chains.
//
// After threading, each note's `link` points at the previous note in its
// voice. Notes with equal onsets form a chord group inside the chain; these
// helpers walk one group at a time and answer questions about it: extreme
// members, pitch sums, the member nearest a reference pitch, and the hop to
// the group before it. All walks go strictly backward through `link`, so
// they terminate without any visited bookkeeping.

use crate::notes::NoteBuffer;

/// First chain note strictly before `i`'s chord group, or `None` when the
/// chain holds nothing older than `i`'s onset.
pub fn previous_chord(notes: &NoteBuffer, i: usize) -> Option<usize> {
    let onset = notes.onset[i];
    let mut i = i;
    while let Some(j) = notes.link[i] {
        if notes.onset[j] < onset {
            return Some(j);
        }
        i = j;
    }
    None
}

/// Walk `i`'s chord group and keep the member `prefer` favors.
///
/// The walk stops as soon as the chain steps to an earlier onset, so only
/// members of `i`'s own group are considered.
fn chord_extreme(
    notes: &NoteBuffer,
    i: usize,
    prefer: impl Fn(&NoteBuffer, usize, usize) -> bool,
) -> usize {
    let mut best = i;
    let mut i = i;
    while let Some(j) = notes.link[i] {
        if notes.onset[j] < notes.onset[best] {
            break;
        }
        if prefer(notes, j, best) {
            best = j;
        }
        i = j;
    }
    best
}

/// Group member with the smallest duration.
pub fn shortest_in_chord(notes: &NoteBuffer, i: usize) -> usize {
    chord_extreme(notes, i, |n, candidate, best| {
        n.duration[candidate] < n.duration[best]
    })
}

/// Group member with the largest duration.
pub fn longest_in_chord(notes: &NoteBuffer, i: usize) -> usize {
    chord_extreme(notes, i, |n, candidate, best| {
        n.duration[candidate] > n.duration[best]
    })
}

/// Group member with the lowest pitch.
pub fn lowest_in_chord(notes: &NoteBuffer, i: usize) -> usize {
    chord_extreme(notes, i, |n, candidate, best| {
        n.position[candidate] < n.position[best]
    })
}

/// Group member with the highest pitch.
pub fn highest_in_chord(notes: &NoteBuffer, i: usize) -> usize {
    chord_extreme(notes, i, |n, candidate, best| {
        n.position[candidate] > n.position[best]
    })
}

/// Group member whose span ends last.
pub fn latest_release_in_chord(notes: &NoteBuffer, i: usize) -> usize {
    chord_extreme(notes, i, |n, candidate, best| {
        n.offset[candidate] > n.offset[best]
    })
}

/// Sum of pitches over `i`'s chord group, with the member count.
pub fn chord_position_sum(notes: &NoteBuffer, i: usize) -> (f64, u32) {
    let onset = notes.onset[i];
    let mut sum = f64::from(notes.position[i]);
    let mut count = 1u32;
    let mut i = i;
    while let Some(j) = notes.link[i] {
        if notes.onset[j] < onset {
            break;
        }
        sum += f64::from(notes.position[j]);
        count += 1;
        i = j;
    }
    (sum, count)
}

/// Pitch of the group member closest to `reference`. Ties keep the member
/// seen first, walking backward from `i`.
pub fn nearest_position_in_chord(notes: &NoteBuffer, i: usize, reference: f64) -> f64 {
    let mut best = i;
    let mut i = i;
    while let Some(j) = notes.link[i] {
        if notes.onset[j] < notes.onset[best] {
            break;
        }
        if (f64::from(notes.position[j]) - reference).abs()
            < (f64::from(notes.position[best]) - reference).abs()
        {
            best = j;
        }
        i = j;
    }
    f64::from(notes.position[best])
}
