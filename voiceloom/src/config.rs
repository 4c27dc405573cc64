// Separation parameters: voice count, penalty weights, contour lookback,
// and the search seed. Configs load from JSON so a run can be repeated
// later with the exact numbers that produced a result.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Relative strength of each cost term.
///
/// Every penalty is normalized into [0, 1] before weighting, so the weights
/// express nothing but the terms' relative importance. Zero disables a term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PenaltyWeights {
    /// Melodic jumps away from a voice's recent pitch contour.
    pub pitch: f64,
    /// Silent gaps between consecutive groups of a voice.
    pub gap: f64,
    /// Ragged chords: unequal durations or wide pitch spreads in a group.
    pub chord: f64,
    /// A note entering while its voice's previous group still sounds.
    pub overlap: f64,
    /// Voices whose average pitches cross between windows.
    pub cross: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        PenaltyWeights {
            pitch: 1.0,
            gap: 1.0,
            chord: 1.0,
            overlap: 1.0,
            cross: 1.0,
        }
    }
}

/// Everything a separation run needs besides the notes themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeparationConfig {
    /// Number of voices to distribute notes across. Must be at least 1.
    pub max_voices: usize,
    /// Cost term weights.
    pub weights: PenaltyWeights,
    /// How many chord groups beyond the most recent feed the pitch contour
    /// estimate.
    pub pitch_lookback: u32,
    /// Seed for the search's random stream. Same seed, same assignment.
    pub seed: u32,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        SeparationConfig {
            max_voices: 2,
            weights: PenaltyWeights::default(),
            pitch_lookback: 2,
            seed: 0,
        }
    }
}

impl SeparationConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }
}
