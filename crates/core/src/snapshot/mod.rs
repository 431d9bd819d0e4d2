use serde::Serialize;

use crate::{
    judge::note_position, CalibrationStatus, GameStats, JudgmentLinePose, NoteId, NoteScheduler,
    NoteState, NoteType, Point, SessionState,
};

/// Everything a renderer needs to draw one note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteView {
    pub id: NoteId,
    pub note_type: NoteType,
    pub lane: u8,
    pub scheduled_ms: f64,
    pub state: NoteState,
    pub position: Point,
    pub color: [u8; 3],
    pub radius: f32,
    pub hold_ms: f64,
}

/// Read-only picture of a session at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub elapsed_ms: f64,
    pub state: SessionState,
    pub pose: JudgmentLinePose,
    pub notes: Vec<NoteView>,
    pub stats: GameStats,
    pub calibration: CalibrationStatus,
}

impl FrameSnapshot {
    pub(crate) fn capture(
        elapsed_ms: f64,
        state: SessionState,
        pose: JudgmentLinePose,
        scheduler: &NoteScheduler,
        stats: &GameStats,
        calibration: CalibrationStatus,
    ) -> Self {
        let notes = scheduler
            .active_notes()
            .map(|note| {
                let spec = note.note_type().spec();
                NoteView {
                    id: note.id(),
                    note_type: note.note_type(),
                    lane: note.lane(),
                    scheduled_ms: note.scheduled_ms(),
                    state: note.state(),
                    position: note_position(note, &pose, elapsed_ms),
                    color: spec.color,
                    radius: spec.radius,
                    hold_ms: note.hold_ms(),
                }
            })
            .collect();

        Self {
            elapsed_ms,
            state,
            pose,
            notes,
            stats: stats.clone(),
            calibration,
        }
    }

    pub fn note(&self, id: NoteId) -> Option<&NoteView> {
        self.notes.iter().find(|view| view.id == id)
    }
}
