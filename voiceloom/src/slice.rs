// Window extraction: maximal runs of mutually overlapping notes.
//
// The search optimizes one window at a time, left to right. A window grows
// while the next note in onset order overlaps every note already inside it,
// so chords and suspensions stay together while separated notes get windows
// of their own. Windows partition the buffer. Notes sharing an onset always
// land in the same window: every note has positive duration, so it overlaps
// everything else starting at that onset.

use crate::notes::NoteBuffer;
use std::ops::Range;

/// Return the maximal window starting at `start`, or `None` past the end.
///
/// Every pair of notes inside the returned range overlaps in time, and the
/// first note past the range fails to overlap at least one member.
pub fn next_slice(notes: &NoteBuffer, start: usize) -> Option<Range<usize>> {
    let mut stop = start;
    while stop < notes.len() && (start..stop).all(|i| notes.overlaps(i, stop)) {
        stop += 1;
    }
    (start < stop).then_some(start..stop)
}
