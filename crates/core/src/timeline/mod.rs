use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{scoring::combo_bonus, JudgeError, NoteType, Quality, Result};

/// Notes become judgeable this long before their scheduled time.
pub const ACTIVATION_WINDOW_MS: f64 = 1500.0;
/// Active notes are missed once the clock is this far past their scheduled time.
pub const MISS_WINDOW_MS: f64 = 300.0;
pub const LANE_COUNT: u8 = 8;

const LEAD_IN_MS: i64 = 2000;
const NOTES_PER_SECOND_DIVISOR: f64 = 1.5;
const HOLD_RANGE_MS: std::ops::RangeInclusive<u32> = 300..=1000;

/// Externally advanced millisecond clock. It never runs backwards.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaybackClock {
    pub time_ms: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_ms = 0.0;
    }

    pub fn advance(&mut self, delta_ms: f64) {
        self.time_ms = (self.time_ms + delta_ms.max(0.0)).max(0.0);
    }

    pub fn set(&mut self, now_ms: f64) {
        self.time_ms = self.time_ms.max(now_ms);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteId(pub u32);

/// Lifecycle of a note. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteState {
    Inactive,
    Active,
    Hit,
    Missed,
}

impl NoteState {
    pub fn is_resolved(self) -> bool {
        matches!(self, NoteState::Hit | NoteState::Missed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Note {
    id: NoteId,
    note_type: NoteType,
    scheduled_ms: f64,
    lane: u8,
    hold_ms: f64,
    state: NoteState,
    hit_ms: Option<f64>,
    quality: Option<Quality>,
}

impl Note {
    fn new(id: NoteId, note_type: NoteType, scheduled_ms: f64, lane: u8, hold_ms: f64) -> Self {
        Self {
            id,
            note_type,
            scheduled_ms,
            lane,
            hold_ms,
            state: NoteState::Inactive,
            hit_ms: None,
            quality: None,
        }
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn note_type(&self) -> NoteType {
        self.note_type
    }

    pub fn scheduled_ms(&self) -> f64 {
        self.scheduled_ms
    }

    pub fn lane(&self) -> u8 {
        self.lane
    }

    pub fn hold_ms(&self) -> f64 {
        self.hold_ms
    }

    pub fn state(&self) -> NoteState {
        self.state
    }

    pub fn hit_ms(&self) -> Option<f64> {
        self.hit_ms
    }

    pub fn quality(&self) -> Option<Quality> {
        self.quality
    }

    /// Horizontal offset of the lane relative to the judgment line centre.
    pub fn lane_offset(&self) -> f64 {
        f64::from(self.lane) * 100.0 - 350.0
    }

    /// Approach progress in `[0, 1]`, reaching 1 one second after the
    /// scheduled time.
    pub fn progress(&self, now_ms: f64) -> f64 {
        ((now_ms - self.scheduled_ms) / 1000.0).clamp(0.0, 1.0)
    }

    fn activate(&mut self) -> bool {
        if self.state != NoteState::Inactive {
            return false;
        }
        self.state = NoteState::Active;
        true
    }

    fn mark_hit(&mut self, now_ms: f64, quality: Quality) -> bool {
        if self.state != NoteState::Active {
            return false;
        }
        self.state = NoteState::Hit;
        self.hit_ms = Some(now_ms);
        self.quality = Some(quality);
        true
    }

    fn mark_missed(&mut self) -> bool {
        if self.state != NoteState::Active {
            return false;
        }
        self.state = NoteState::Missed;
        true
    }
}

/// Emitted by [`NoteScheduler::update`] for every note that slipped past the
/// miss window. The scoring engine consumes these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissEvent {
    pub note_id: NoteId,
    pub note_type: NoteType,
    pub scheduled_ms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerTick {
    /// Multiplier to use for the next scoring computation.
    pub combo_bonus: f64,
    pub activated: usize,
    pub missed: Vec<MissEvent>,
}

/// Owns the notes of one song attempt, kept sorted by scheduled time.
#[derive(Debug, Default)]
pub struct NoteScheduler {
    notes: Vec<Note>,
    /// Every note before this index has been resolved.
    head: usize,
    /// First note that has not been activated yet.
    next_inactive: usize,
    next_id: u32,
    missed: u32,
}

impl NoteScheduler {
    /// Empty note set for an editor session.
    pub fn editor() -> Self {
        Self::default()
    }

    /// Generates the notes for a song of `duration_ms` at the given multiplier.
    pub fn generate(duration_ms: f64, multiplier: f64, rng: &mut impl Rng) -> Result<Self> {
        if !duration_ms.is_finite() || duration_ms < 2.0 * LEAD_IN_MS as f64 {
            return Err(JudgeError::InvalidDuration { duration_ms });
        }
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(JudgeError::InvalidMultiplier(multiplier));
        }

        let count = (duration_ms / 1000.0 * multiplier / NOTES_PER_SECOND_DIVISOR).floor() as usize;
        let latest = duration_ms as i64 - LEAD_IN_MS;

        let mut notes: Vec<Note> = (0..count)
            .map(|index| {
                let note_type = NoteType::random(rng);
                let scheduled_ms = rng.random_range(LEAD_IN_MS..=latest) as f64;
                let lane = rng.random_range(0..LANE_COUNT);
                let hold_ms = if note_type.has_duration() {
                    f64::from(rng.random_range(HOLD_RANGE_MS))
                } else {
                    0.0
                };
                Note::new(NoteId(index as u32), note_type, scheduled_ms, lane, hold_ms)
            })
            .collect();
        notes.sort_by(|a, b| a.scheduled_ms.total_cmp(&b.scheduled_ms));

        tracing::debug!(count, duration_ms, multiplier, "generated notes");

        Ok(Self {
            notes,
            head: 0,
            next_inactive: 0,
            next_id: count as u32,
            missed: 0,
        })
    }

    /// Inserts a note by hand, keeping the set sorted. A missing type is
    /// replaced by a uniformly random one.
    pub fn insert_note(
        &mut self,
        note_type: Option<NoteType>,
        scheduled_ms: f64,
        lane: u8,
        hold_ms: f64,
        rng: &mut impl Rng,
    ) -> Result<NoteId> {
        if lane >= LANE_COUNT {
            return Err(JudgeError::InvalidLane(lane));
        }
        if !scheduled_ms.is_finite() || !hold_ms.is_finite() || hold_ms < 0.0 {
            return Err(JudgeError::InvalidNoteTiming {
                scheduled_ms,
                hold_ms,
            });
        }
        let note_type = note_type.unwrap_or_else(|| NoteType::random(rng));
        let id = NoteId(self.next_id);
        self.next_id += 1;

        let index = self
            .notes
            .partition_point(|note| note.scheduled_ms <= scheduled_ms);
        self.notes.insert(
            index,
            Note::new(id, note_type, scheduled_ms, lane, hold_ms),
        );
        self.head = self.head.min(index);
        self.next_inactive = self.next_inactive.min(index);
        Ok(id)
    }

    /// Activates notes entering the activation window and misses notes that
    /// left the miss window. `combo` is the scoring engine's current combo.
    pub fn update(&mut self, now_ms: f64, combo: u32) -> SchedulerTick {
        let mut activated = 0;
        while let Some(note) = self.notes.get_mut(self.next_inactive) {
            if note.state == NoteState::Inactive {
                if now_ms < note.scheduled_ms - ACTIVATION_WINDOW_MS {
                    break;
                }
                note.activate();
                activated += 1;
            }
            self.next_inactive += 1;
        }

        let mut missed = Vec::new();
        for note in &mut self.notes[self.head..self.next_inactive] {
            if note.state == NoteState::Active && now_ms > note.scheduled_ms + MISS_WINDOW_MS {
                note.mark_missed();
                tracing::debug!(id = note.id.0, scheduled_ms = note.scheduled_ms, "note missed");
                missed.push(MissEvent {
                    note_id: note.id,
                    note_type: note.note_type,
                    scheduled_ms: note.scheduled_ms,
                });
            }
        }
        self.missed += missed.len() as u32;
        self.advance_head();

        let combo = if missed.is_empty() { combo } else { 0 };
        SchedulerTick {
            combo_bonus: combo_bonus(combo),
            activated,
            missed,
        }
    }

    /// Transitions an active note to `Hit`. Returns the note on success.
    pub fn mark_hit(&mut self, id: NoteId, now_ms: f64, quality: Quality) -> Option<&Note> {
        let index = self.notes.iter().position(|note| note.id == id)?;
        if !self.notes[index].mark_hit(now_ms, quality) {
            return None;
        }
        self.advance_head();
        Some(&self.notes[index])
    }

    /// Active notes in scheduling order.
    pub fn active_notes(&self) -> impl Iterator<Item = &Note> {
        self.notes[self.head..self.next_inactive]
            .iter()
            .filter(|note| note.state == NoteState::Active)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn missed_count(&self) -> u32 {
        self.missed
    }

    fn advance_head(&mut self) {
        while self.head < self.next_inactive && self.notes[self.head].state.is_resolved() {
            self.head += 1;
        }
    }
}
