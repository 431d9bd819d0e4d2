use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    achievements::ALL_SONGS, judge::DEFAULT_HIT_RADIUS, kinematics::DEFAULT_AMPLITUDE, Difficulty,
    JudgeError, MotionPattern, RecordingSettings, ResolveStrategy, Result,
};

/// Top-level configuration of a game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub line: LineConfig,
    pub judge: JudgeConfig,
    pub calibration_enabled: bool,
    /// Seed for note generation and random jumps. `None` draws from entropy.
    pub seed: Option<u64>,
    pub replay: RecordingSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            line: LineConfig::default(),
            judge: JudgeConfig::default(),
            calibration_enabled: true,
            seed: None,
            replay: RecordingSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.judge.hit_radius.is_nan() || config.judge.hit_radius <= 0.0 {
            return Err(JudgeError::msg(format!(
                "hit radius must be positive, got {}",
                config.judge.hit_radius
            )));
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LineConfig {
    pub pattern: MotionPattern,
    pub amplitude: f64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            pattern: MotionPattern::Sine,
            amplitude: DEFAULT_AMPLITUDE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JudgeConfig {
    pub hit_radius: f64,
    pub strategy: ResolveStrategy,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            hit_radius: DEFAULT_HIT_RADIUS,
            strategy: ResolveStrategy::EarliestScheduled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skin {
    #[default]
    Default,
    Neon,
    Pastel,
}

impl FromStr for Skin {
    type Err = JudgeError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Skin::Default),
            "neon" => Ok(Skin::Neon),
            "pastel" => Ok(Skin::Pastel),
            _ => Err(JudgeError::msg(format!("unknown skin `{value}`"))),
        }
    }
}

impl fmt::Display for Skin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Skin::Default => "default",
            Skin::Neon => "neon",
            Skin::Pastel => "pastel",
        };
        f.write_str(name)
    }
}

/// Persisted player progress. Reading and writing the file is the caller's
/// job; this type only validates what was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub completed_songs: u32,
    pub unlocked_achievements: u32,
    pub difficulty: Difficulty,
    pub skin: Skin,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawProgress {
    completed_songs: u32,
    unlocked_achievements: u32,
    difficulty: String,
    skin: String,
}

impl Default for RawProgress {
    fn default() -> Self {
        Self {
            completed_songs: 0,
            unlocked_achievements: 0,
            difficulty: Difficulty::default().to_string(),
            skin: Skin::default().to_string(),
        }
    }
}

impl Progress {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawProgress = serde_json::from_str(json)?;
        Ok(Self {
            completed_songs: raw.completed_songs.min(ALL_SONGS),
            unlocked_achievements: raw.unlocked_achievements,
            difficulty: raw.difficulty.parse()?,
            skin: raw.skin.parse()?,
        })
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
