//! Numeric achievement triggers evaluated against a finished attempt. Names,
//! icons and unlock storage belong to the presentation layer.

use serde::{Deserialize, Serialize};

use crate::{Difficulty, GameStats, Rank};

pub const HIGH_SCORE_THRESHOLD: u64 = 500_000;
pub const SPECIALIST_HITS: u32 = 50;
pub const LONG_COMBO: u32 = 100;
pub const ALL_SONGS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstPlay,
    FullCombo,
    Master,
    NoMiss,
    HighScore,
    Specialist,
    LongCombo,
    SongComplete,
}

impl AchievementId {
    pub fn as_str(self) -> &'static str {
        match self {
            AchievementId::FirstPlay => "first_play",
            AchievementId::FullCombo => "full_combo",
            AchievementId::Master => "master",
            AchievementId::NoMiss => "no_miss",
            AchievementId::HighScore => "high_score",
            AchievementId::Specialist => "specialist",
            AchievementId::LongCombo => "long_combo",
            AchievementId::SongComplete => "song_complete",
        }
    }
}

/// Progress values that live outside a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementContext {
    pub games_played: u32,
    pub completed_songs: u32,
    pub difficulty: Difficulty,
}

/// Every trigger satisfied by `stats` in `context`, in a stable order.
pub fn evaluate(stats: &GameStats, context: &AchievementContext) -> Vec<AchievementId> {
    let checks = [
        (AchievementId::FirstPlay, context.games_played >= 1),
        (AchievementId::LongCombo, stats.max_combo >= LONG_COMBO),
        (
            AchievementId::FullCombo,
            stats.total_notes > 0 && stats.max_combo == stats.total_notes,
        ),
        (
            AchievementId::NoMiss,
            stats.misses == 0 && context.games_played > 0,
        ),
        (AchievementId::HighScore, stats.score > HIGH_SCORE_THRESHOLD),
        (AchievementId::Specialist, stats.special_hits >= SPECIALIST_HITS),
        (
            AchievementId::Master,
            stats.rank == Rank::S && context.difficulty == Difficulty::Hard,
        ),
        (
            AchievementId::SongComplete,
            context.completed_songs == ALL_SONGS,
        ),
    ];

    checks
        .into_iter()
        .filter_map(|(id, unlocked)| unlocked.then_some(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(difficulty: Difficulty) -> AchievementContext {
        AchievementContext {
            games_played: 1,
            completed_songs: 1,
            difficulty,
        }
    }

    #[test]
    fn nothing_before_first_game() {
        let ctx = AchievementContext {
            games_played: 0,
            completed_songs: 0,
            difficulty: Difficulty::Medium,
        };
        assert!(evaluate(&GameStats::default(), &ctx).is_empty());
    }

    #[test]
    fn clean_hard_clear_unlocks_master() {
        let stats = GameStats {
            score: 12_000,
            max_combo: 40,
            total_notes: 40,
            hits: 40,
            accuracy: 1.0,
            rank: Rank::S,
            ..GameStats::default()
        };
        let unlocked = evaluate(&stats, &context(Difficulty::Hard));
        assert_eq!(
            unlocked,
            vec![
                AchievementId::FirstPlay,
                AchievementId::FullCombo,
                AchievementId::NoMiss,
                AchievementId::Master,
            ]
        );

        let unlocked = evaluate(&stats, &context(Difficulty::Medium));
        assert!(!unlocked.contains(&AchievementId::Master));
    }

    #[test]
    fn numeric_thresholds() {
        let stats = GameStats {
            score: 500_001,
            max_combo: 100,
            total_notes: 300,
            special_hits: 50,
            misses: 3,
            ..GameStats::default()
        };
        let ctx = AchievementContext {
            completed_songs: 12,
            ..context(Difficulty::Easy)
        };
        let unlocked = evaluate(&stats, &ctx);
        for id in [
            AchievementId::HighScore,
            AchievementId::LongCombo,
            AchievementId::Specialist,
            AchievementId::SongComplete,
        ] {
            assert!(unlocked.contains(&id), "{} missing", id.as_str());
        }
        assert!(!unlocked.contains(&AchievementId::NoMiss));
        assert!(!unlocked.contains(&AchievementId::FullCombo));

        let just_under = GameStats {
            score: 500_000,
            max_combo: 99,
            special_hits: 49,
            ..stats
        };
        let unlocked = evaluate(&just_under, &ctx);
        assert!(!unlocked.contains(&AchievementId::HighScore));
        assert!(!unlocked.contains(&AchievementId::LongCombo));
        assert!(!unlocked.contains(&AchievementId::Specialist));
    }
}
