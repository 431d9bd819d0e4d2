//! Motion of the judgment line.
//!
//! Every pattern except [`MotionPattern::RandomJump`] is a pure function of
//! the elapsed song time. Random jumps keep the last pose between ticks and
//! only resample it at jump instants, using an injected generator so runs can
//! be reproduced from a seed.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const BASE_X: f64 = 640.0;
pub const BASE_Y: f64 = 500.0;
pub const DEFAULT_AMPLITUDE: f64 = 100.0;

/// Per-tick probability of a random jump is `1 - JUMP_THRESHOLD`.
const JUMP_THRESHOLD: f64 = 0.98;
const JUMP_X_RANGE: std::ops::RangeInclusive<i32> = 200..=1000;
const JUMP_Y_RANGE: std::ops::RangeInclusive<i32> = 300..=600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPattern {
    #[default]
    Sine,
    Circle,
    RandomJump,
    Zigzag,
}

/// Position and rotation (degrees) of the judgment line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgmentLinePose {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

impl Default for JudgmentLinePose {
    fn default() -> Self {
        Self {
            x: BASE_X,
            y: BASE_Y,
            angle: 0.0,
        }
    }
}

impl JudgmentLinePose {
    /// Expresses a screen point in the line's local frame by rotating the
    /// offset by `-angle`.
    pub fn to_line_frame(&self, px: f64, py: f64) -> (f64, f64) {
        let (sin, cos) = (-self.angle).to_radians().sin_cos();
        let dx = px - self.x;
        let dy = py - self.y;
        (dx * cos - dy * sin, dx * sin + dy * cos)
    }
}

impl MotionPattern {
    /// Pose for the deterministic patterns. Components a pattern does not
    /// drive are carried over from `previous`; random jumps return it as is.
    pub fn pose(self, t_ms: f64, amplitude: f64, previous: JudgmentLinePose) -> JudgmentLinePose {
        match self {
            MotionPattern::Sine => JudgmentLinePose {
                x: BASE_X + (t_ms / 800.0).sin() * amplitude,
                y: BASE_Y + (t_ms / 1200.0).sin() * amplitude * 0.5,
                angle: (t_ms / 1000.0).sin() * 30.0,
            },
            MotionPattern::Circle => JudgmentLinePose {
                x: BASE_X + (t_ms / 1200.0).cos() * amplitude,
                y: BASE_Y + (t_ms / 1200.0).sin() * amplitude,
                angle: previous.angle,
            },
            MotionPattern::RandomJump => previous,
            MotionPattern::Zigzag => {
                let s = t_ms / 1000.0;
                JudgmentLinePose {
                    x: BASE_X + (2.0 * s).sin() * amplitude,
                    y: BASE_Y + (3.0 * s).sin() * amplitude * 0.5,
                    angle: s.sin() * 45.0,
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct JudgmentLine {
    pattern: MotionPattern,
    amplitude: f64,
    pose: JudgmentLinePose,
    rng: StdRng,
}

impl JudgmentLine {
    pub fn new(pattern: MotionPattern, amplitude: f64, seed: u64) -> Self {
        Self {
            pattern,
            amplitude,
            pose: JudgmentLinePose::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn pattern(&self) -> MotionPattern {
        self.pattern
    }

    pub fn set_pattern(&mut self, pattern: MotionPattern) {
        self.pattern = pattern;
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn pose(&self) -> JudgmentLinePose {
        self.pose
    }

    /// Pose at `t_ms` without advancing any state.
    pub fn pose_at(&self, t_ms: f64) -> JudgmentLinePose {
        self.pattern.pose(t_ms, self.amplitude, self.pose)
    }

    /// Recomputes the pose for a new tick.
    pub fn update(&mut self, t_ms: f64) -> JudgmentLinePose {
        self.pose = match self.pattern {
            MotionPattern::RandomJump => {
                if self.rng.random::<f64>() > JUMP_THRESHOLD {
                    let pose = JudgmentLinePose {
                        x: f64::from(self.rng.random_range(JUMP_X_RANGE)),
                        y: f64::from(self.rng.random_range(JUMP_Y_RANGE)),
                        angle: self.pose.angle,
                    };
                    tracing::trace!(x = pose.x, y = pose.y, "judgment line jumped");
                    pose
                } else {
                    self.pose
                }
            }
            pattern => pattern.pose(t_ms, self.amplitude, self.pose),
        };
        self.pose
    }

    pub fn reset(&mut self, seed: u64) {
        self.pose = JudgmentLinePose::default();
        self.rng = StdRng::seed_from_u64(seed);
    }
}
