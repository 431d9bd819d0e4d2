use std::{fmt, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{JudgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = JudgeError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(JudgeError::InvalidDifficulty(value.to_string())),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Note density multipliers for each difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyMultipliers {
    pub easy: f64,
    pub medium: f64,
    pub hard: f64,
}

/// Song descriptor as handed over by the external catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongDescriptor {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_ms: f64,
    pub bpm: u32,
    pub multipliers: DifficultyMultipliers,
}

impl SongDescriptor {
    pub fn multiplier(&self, difficulty: Difficulty) -> f64 {
        match difficulty {
            Difficulty::Easy => self.multipliers.easy,
            Difficulty::Medium => self.multipliers.medium,
            Difficulty::Hard => self.multipliers.hard,
        }
    }
}

/// Registry of the songs a session can be started from.
#[derive(Debug, Clone, Default)]
pub struct SongLibrary {
    songs: Vec<SongDescriptor>,
}

impl SongLibrary {
    pub fn new() -> Self {
        Self { songs: Vec::new() }
    }

    /// The twelve songs shipped with the game.
    pub fn builtin() -> Self {
        let table: [(&str, &str, u32, u32, [f64; 3]); 12] = [
            ("Electric Pulse", "Digital Rhythm", 120, 128, [0.7, 1.0, 1.5]),
            ("Starlight Journey", "Voice of the Cosmos", 150, 110, [0.8, 1.1, 1.6]),
            ("Mechanical Heartbeat", "Future Factory", 135, 140, [0.9, 1.2, 1.7]),
            ("Summer Breeze", "Sounds of Nature", 125, 100, [0.6, 1.0, 1.4]),
            ("City Night", "Neon Shadows", 140, 95, [0.8, 1.1, 1.5]),
            ("Deep Sea Expedition", "Ocean Explorer", 160, 85, [0.7, 1.0, 1.3]),
            ("Cloud Walk", "Sky City", 130, 120, [0.9, 1.2, 1.8]),
            ("Desert Storm", "Wasteland Traveller", 145, 115, [0.8, 1.1, 1.6]),
            ("Forest Song", "Green Guardian", 128, 105, [0.7, 1.0, 1.4]),
            ("Eruption", "Heart of Lava", 155, 145, [0.9, 1.3, 1.9]),
            ("Aurora Dance", "Polaris", 138, 98, [0.8, 1.1, 1.5]),
            ("Time Travel", "Chrononaut", 148, 110, [0.7, 1.0, 1.4]),
        ];

        let mut library = Self::new();
        for (index, (title, artist, seconds, bpm, [easy, medium, hard])) in
            table.into_iter().enumerate()
        {
            library.register(SongDescriptor {
                id: format!("song{}", index + 1),
                title: title.to_string(),
                artist: artist.to_string(),
                duration_ms: f64::from(seconds) * 1000.0,
                bpm,
                multipliers: DifficultyMultipliers { easy, medium, hard },
            });
        }
        library
    }

    /// Adds a song, replacing any existing entry with the same id.
    pub fn register(&mut self, song: SongDescriptor) {
        match self.songs.iter_mut().find(|existing| existing.id == song.id) {
            Some(existing) => *existing = song,
            None => self.songs.push(song),
        }
    }

    pub fn get_song_by_id(&self, id: &str) -> Result<&SongDescriptor> {
        self.songs
            .iter()
            .find(|song| song.id == id)
            .ok_or_else(|| JudgeError::SongNotFound(id.to_string()))
    }

    pub fn random_song(&self, rng: &mut impl Rng) -> Option<&SongDescriptor> {
        if self.songs.is_empty() {
            return None;
        }
        self.songs.get(rng.random_range(0..self.songs.len()))
    }

    pub fn songs(&self) -> &[SongDescriptor] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}
