use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{NoteType, Quality};

const COMBO_BONUS_CAP: u32 = 100;

/// Score multiplier earned by the current combo, in `[1.0, 2.0]`.
pub fn combo_bonus(combo: u32) -> f64 {
    1.0 + f64::from(combo.min(COMBO_BONUS_CAP)) / f64::from(COMBO_BONUS_CAP)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Rank {
    #[default]
    F,
    D,
    C,
    B,
    A,
    S,
}

impl Rank {
    /// Blends accuracy (70%) with the share of the chart covered by the best
    /// combo (30%).
    pub fn rank_score(accuracy: f64, max_combo: u32, total_notes: u32) -> f64 {
        let combo_ratio = f64::from(max_combo) / f64::from(total_notes.max(1));
        accuracy * 0.7 + combo_ratio * 0.3
    }

    pub fn from_score(score: f64) -> Self {
        if score > 0.95 {
            Rank::S
        } else if score > 0.9 {
            Rank::A
        } else if score > 0.8 {
            Rank::B
        } else if score > 0.7 {
            Rank::C
        } else if score > 0.6 {
            Rank::D
        } else {
            Rank::F
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Rank::F => "F",
            Rank::D => "D",
            Rank::C => "C",
            Rank::B => "B",
            Rank::A => "A",
            Rank::S => "S",
        };
        f.write_str(letter)
    }
}

/// Scoring snapshot for one song attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub accuracy: f64,
    pub hits: u32,
    pub perfect_hits: u32,
    pub good_hits: u32,
    pub misses: u32,
    pub total_notes: u32,
    pub special_hits: u32,
    pub rank: Rank,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreEvent {
    Hit { note_type: NoteType, quality: Quality },
    Miss { note_type: NoteType },
}

/// Sole owner of [`GameStats`]; all mutation goes through [`ScoringEngine::apply`].
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    stats: GameStats,
}

impl ScoringEngine {
    pub fn new(total_notes: u32) -> Self {
        Self {
            stats: GameStats {
                total_notes,
                ..GameStats::default()
            },
        }
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    pub fn combo(&self) -> u32 {
        self.stats.combo
    }

    /// Applies one event and returns the score it added.
    pub fn apply(&mut self, event: ScoreEvent) -> u64 {
        let stats = &mut self.stats;
        let delta = match event {
            ScoreEvent::Hit { note_type, quality } => {
                let bonus = combo_bonus(stats.combo);
                let delta =
                    (f64::from(note_type.base_score()) * quality.multiplier() * bonus).round() as u64;
                stats.score += delta;
                stats.combo += 1;
                stats.max_combo = stats.max_combo.max(stats.combo);
                stats.hits += 1;
                match quality {
                    Quality::Perfect => stats.perfect_hits += 1,
                    Quality::Good => stats.good_hits += 1,
                    Quality::Ok => {}
                }
                if note_type == NoteType::Special {
                    stats.special_hits += 1;
                }
                delta
            }
            ScoreEvent::Miss { .. } => {
                stats.misses += 1;
                stats.combo = 0;
                0
            }
        };

        let judged = stats.hits + stats.misses;
        stats.accuracy = if judged > 0 {
            f64::from(stats.hits) / f64::from(judged)
        } else {
            0.0
        };
        stats.rank = Rank::from_score(Rank::rank_score(
            stats.accuracy,
            stats.max_combo,
            stats.total_notes,
        ));
        delta
    }
}
