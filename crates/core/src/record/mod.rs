use serde::{Deserialize, Serialize};

use crate::{
    judge::note_position, GameStats, JudgmentLinePose, Note, NoteId, NoteState, NoteType, Point,
};

/// Configuration options for replay recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordingSettings {
    pub enabled: bool,
    /// Capture one frame every this many ticks.
    pub interval_ticks: u32,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ticks: 1,
        }
    }
}

/// Where one note was drawn in a recorded frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayNote {
    pub id: NoteId,
    pub note_type: NoteType,
    pub lane: u8,
    pub state: NoteState,
    pub position: Point,
}

impl ReplayNote {
    pub fn capture(note: &Note, pose: &JudgmentLinePose, elapsed_ms: f64) -> Self {
        Self {
            id: note.id(),
            note_type: note.note_type(),
            lane: note.lane(),
            state: note.state(),
            position: note_position(note, pose, elapsed_ms),
        }
    }
}

/// State of the attempt at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub elapsed_ms: f64,
    pub pose: JudgmentLinePose,
    /// Notes that are active or already hit.
    pub live_notes: Vec<ReplayNote>,
    pub stats: GameStats,
}

/// Collects [`ReplayFrame`]s while a song is playing.
#[derive(Debug, Default)]
pub struct Recorder {
    settings: RecordingSettings,
    frames: Vec<ReplayFrame>,
    ticks: u64,
    is_recording: bool,
}

impl Recorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            frames: Vec::new(),
            ticks: 0,
            is_recording: false,
        }
    }

    /// Discards previous frames and starts recording if enabled.
    pub fn start(&mut self) {
        self.frames.clear();
        self.ticks = 0;
        self.is_recording = self.settings.enabled;
    }

    pub fn stop(&mut self) {
        self.is_recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    /// Offers a frame for the current tick. The closure only runs for ticks
    /// that are actually captured.
    pub fn capture(&mut self, frame: impl FnOnce() -> ReplayFrame) {
        if !self.is_recording {
            return;
        }
        let interval = u64::from(self.settings.interval_ticks.max(1));
        if self.ticks % interval == 0 {
            self.frames.push(frame());
        }
        self.ticks += 1;
    }

    pub fn frames(&self) -> &[ReplayFrame] {
        &self.frames
    }

    pub fn take_frames(&mut self) -> Vec<ReplayFrame> {
        std::mem::take(&mut self.frames)
    }
}
