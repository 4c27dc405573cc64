// Note storage for voice separation.
//
// Notes live in parallel arrays indexed by note id, in onset order. The
// separation search reads onsets, durations and pitches, writes voice
// numbers, and threads `link` into per-voice backward chains: `link[i]`
// points at the previous note of the same voice, which may be a chord
// sibling sharing `i`'s onset. Those chains are the only history the cost
// model ever walks (see chain.rs and cost.rs), so the arrays stay fixed in
// size once built.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One input note: a pitched span on the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Start time, in whatever unit the caller uses consistently.
    pub onset: f64,
    /// Length of the span. Must be strictly positive.
    pub duration: f64,
    /// End time, normally `onset + duration`.
    pub offset: f64,
    /// Pitch as a number, MIDI-style (middle C = 60).
    pub position: i32,
}

impl Note {
    /// Build a note whose offset is `onset + duration`.
    pub fn new(onset: f64, duration: f64, position: i32) -> Self {
        Note {
            onset,
            duration,
            offset: onset + duration,
            position,
        }
    }
}

/// Input rejections raised by [`NoteBuffer::from_notes`] and
/// [`crate::search::separate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeparationError {
    /// The note at `index` starts earlier than the note before it.
    UnsortedOnset { index: usize },
    /// The note at `index` has a duration that is not strictly positive.
    NonPositiveDuration { index: usize },
    /// The configured voice count is zero.
    NoVoices,
}

impl fmt::Display for SeparationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeparationError::UnsortedOnset { index } => {
                write!(f, "note {index} starts before the note preceding it")
            }
            SeparationError::NonPositiveDuration { index } => {
                write!(f, "note {index} has a non-positive duration")
            }
            SeparationError::NoVoices => {
                write!(f, "max_voices must be at least 1")
            }
        }
    }
}

impl std::error::Error for SeparationError {}

pub type SeparationResult<T> = Result<T, SeparationError>;

/// Onset-sorted notes in parallel arrays, plus the separation outputs.
///
/// `voice` and `link` start out meaningless (all zero, unthreaded) and
/// become the result once [`crate::search::separate`] has run.
#[derive(Debug, Clone)]
pub struct NoteBuffer {
    pub(crate) onset: Vec<f64>,
    pub(crate) duration: Vec<f64>,
    pub(crate) offset: Vec<f64>,
    pub(crate) position: Vec<i32>,
    pub(crate) voice: Vec<usize>,
    pub(crate) link: Vec<Option<usize>>,
}

impl NoteBuffer {
    /// Validate `notes` and store them column-wise.
    ///
    /// Rejects onsets that go backward and durations that are not strictly
    /// positive. A NaN duration fails the positivity check.
    pub fn from_notes(notes: &[Note]) -> SeparationResult<Self> {
        for (index, pair) in notes.windows(2).enumerate() {
            if pair[1].onset < pair[0].onset {
                return Err(SeparationError::UnsortedOnset { index: index + 1 });
            }
        }
        for (index, note) in notes.iter().enumerate() {
            if note.duration <= 0.0 || note.duration.is_nan() {
                return Err(SeparationError::NonPositiveDuration { index });
            }
        }
        Ok(NoteBuffer {
            onset: notes.iter().map(|n| n.onset).collect(),
            duration: notes.iter().map(|n| n.duration).collect(),
            offset: notes.iter().map(|n| n.offset).collect(),
            position: notes.iter().map(|n| n.position).collect(),
            voice: vec![0; notes.len()],
            link: vec![None; notes.len()],
        })
    }

    /// Number of notes.
    pub fn len(&self) -> usize {
        self.onset.len()
    }

    /// True when the buffer holds no notes.
    pub fn is_empty(&self) -> bool {
        self.onset.is_empty()
    }

    /// Start time of note `i`.
    pub fn onset(&self, i: usize) -> f64 {
        self.onset[i]
    }

    /// Duration of note `i`.
    pub fn duration(&self, i: usize) -> f64 {
        self.duration[i]
    }

    /// End time of note `i`.
    pub fn offset(&self, i: usize) -> f64 {
        self.offset[i]
    }

    /// Pitch of note `i`.
    pub fn position(&self, i: usize) -> i32 {
        self.position[i]
    }

    /// Voice assigned to note `i` (zero until separation has run).
    pub fn voice(&self, i: usize) -> usize {
        self.voice[i]
    }

    /// Previous note in `i`'s voice chain, if any.
    pub fn link(&self, i: usize) -> Option<usize> {
        self.link[i]
    }

    /// All voice assignments, note-indexed.
    pub fn voices(&self) -> &[usize] {
        &self.voice
    }

    /// All chain links, note-indexed.
    pub fn links(&self) -> &[Option<usize>] {
        &self.link
    }

    /// True when notes `a` and `b` overlap in time.
    ///
    /// Spans are half-open: a note ending exactly where another starts does
    /// not overlap it. Symmetric in its arguments.
    pub fn overlaps(&self, a: usize, b: usize) -> bool {
        if self.onset[a] <= self.onset[b] {
            self.offset[a] > self.onset[b]
        } else {
            self.offset[b] > self.onset[a]
        }
    }

    /// Render the assignment as one block per voice, for eyeballing results.
    pub fn summary(&self) -> String {
        let voices = self.voice.iter().copied().max().map_or(0, |v| v + 1);
        let mut out = String::new();
        for v in 0..voices {
            out.push_str(&format!("voice {v}\n"));
            for i in 0..self.len() {
                if self.voice[i] == v {
                    out.push_str(&format!(
                        "  {:>8.3} .. {:<8.3}  pos {}\n",
                        self.onset[i], self.offset[i], self.position[i]
                    ));
                }
            }
        }
        out
    }
}
