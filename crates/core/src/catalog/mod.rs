use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Kind of note a player can strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteType {
    Tap,
    Hold,
    Flick,
    Drag,
    Special,
}

/// Static presentation and scoring data attached to a [`NoteType`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteSpec {
    pub color: [u8; 3],
    pub radius: f32,
    pub base_score: u32,
}

impl NoteType {
    pub const ALL: [NoteType; 5] = [
        NoteType::Tap,
        NoteType::Hold,
        NoteType::Flick,
        NoteType::Drag,
        NoteType::Special,
    ];

    pub fn spec(self) -> NoteSpec {
        match self {
            NoteType::Tap => NoteSpec {
                color: [0, 200, 255],
                radius: 25.0,
                base_score: 100,
            },
            NoteType::Hold => NoteSpec {
                color: [255, 150, 0],
                radius: 30.0,
                base_score: 150,
            },
            NoteType::Flick => NoteSpec {
                color: [200, 0, 255],
                radius: 28.0,
                base_score: 200,
            },
            NoteType::Drag => NoteSpec {
                color: [0, 255, 100],
                radius: 26.0,
                base_score: 180,
            },
            NoteType::Special => NoteSpec {
                color: [255, 215, 0],
                radius: 35.0,
                base_score: 300,
            },
        }
    }

    pub fn base_score(self) -> u32 {
        self.spec().base_score
    }

    /// Hold and drag notes carry a sustain duration.
    pub fn has_duration(self) -> bool {
        matches!(self, NoteType::Hold | NoteType::Drag)
    }

    /// Draws a type uniformly from the catalog.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteType::Tap => "tap",
            NoteType::Hold => "hold",
            NoteType::Flick => "flick",
            NoteType::Drag => "drag",
            NoteType::Special => "special",
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
