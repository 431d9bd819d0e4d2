//! Core library for the Rhythm Judge engine.
//!
//! The crate turns a song descriptor into a set of timed notes, moves the
//! judgment line those notes converge on, resolves pointer input into hits,
//! estimates input latency and keeps score. Everything runs on the caller's
//! clock: a frame-driven tick source calls [`GameSession::tick`] and input
//! events are handed to [`GameSession::handle_input`] as they arrive. Drawing,
//! audio and persistence stay outside and only exchange small snapshots with
//! the core.

pub mod achievements;
pub mod calibration;
pub mod catalog;
pub mod config;
pub mod error;
pub mod judge;
pub mod kinematics;
pub mod library;
pub mod record;
pub mod scoring;
pub mod session;
pub mod snapshot;
pub mod timeline;

pub use achievements::{AchievementContext, AchievementId};
pub use calibration::{CalibrationEstimator, CalibrationPhase, CalibrationStatus};
pub use catalog::{NoteSpec, NoteType};
pub use config::{EngineConfig, JudgeConfig, LineConfig, Progress, Skin};
pub use error::{JudgeError, Result};
pub use judge::{HitOutcome, HitResolver, InputEvent, Point, Quality, ResolveStrategy};
pub use kinematics::{JudgmentLine, JudgmentLinePose, MotionPattern};
pub use library::{Difficulty, DifficultyMultipliers, SongDescriptor, SongLibrary};
pub use record::{Recorder, RecordingSettings, ReplayFrame, ReplayNote};
pub use scoring::{combo_bonus, GameStats, Rank, ScoreEvent, ScoringEngine};
pub use session::{CompletionReport, GameSession, SessionState};
pub use snapshot::{FrameSnapshot, NoteView};
pub use timeline::{MissEvent, Note, NoteId, NoteScheduler, NoteState, PlaybackClock, SchedulerTick};
