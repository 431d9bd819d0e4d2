use serde::{Deserialize, Serialize};

use crate::{
    CalibrationEstimator, JudgmentLine, JudgmentLinePose, Note, NoteId, NoteScheduler, NoteType,
};

pub const DEFAULT_HIT_RADIUS: f64 = 30.0;
const PERFECT_MS: f64 = 50.0;
const GOOD_MS: f64 = 100.0;
/// Notes start this far above the line and reach it one second after their
/// scheduled time.
const SPAWN_HEIGHT: f64 = 200.0;

/// Timing grade of a successful hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Perfect,
    Good,
    Ok,
}

impl Quality {
    /// Grades the absolute distance between the hit and the scheduled time.
    pub fn classify(delta_ms: f64) -> Self {
        let delta = delta_ms.abs();
        if delta < PERFECT_MS {
            Quality::Perfect
        } else if delta < GOOD_MS {
            Quality::Good
        } else {
            Quality::Ok
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            Quality::Perfect => 1.2,
            Quality::Good => 1.0,
            Quality::Ok => 0.8,
        }
    }
}

/// How a touch is matched against overlapping candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveStrategy {
    /// First candidate in scheduling order whose position is within reach.
    #[default]
    EarliestScheduled,
    /// Closest candidate within reach, earliest on ties.
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Raw pointer input in core space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub point: Point,
    pub timestamp_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HitOutcome {
    pub note_id: NoteId,
    pub note_type: NoteType,
    pub quality: Quality,
    /// `raw - scheduled`; negative when early.
    pub delta_ms: f64,
    pub effective_ms: f64,
}

/// Screen position of a note while it approaches the line.
pub fn note_position(note: &Note, pose: &JudgmentLinePose, now_ms: f64) -> Point {
    let spawn_y = pose.y - SPAWN_HEIGHT;
    Point {
        x: pose.x + note.lane_offset(),
        y: spawn_y + (pose.y - spawn_y) * note.progress(now_ms),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HitResolver {
    hit_radius: f64,
    strategy: ResolveStrategy,
}

impl Default for HitResolver {
    fn default() -> Self {
        Self::new(DEFAULT_HIT_RADIUS, ResolveStrategy::default())
    }
}

impl HitResolver {
    pub fn new(hit_radius: f64, strategy: ResolveStrategy) -> Self {
        Self {
            hit_radius,
            strategy,
        }
    }

    pub fn hit_radius(&self) -> f64 {
        self.hit_radius
    }

    pub fn strategy(&self) -> ResolveStrategy {
        self.strategy
    }

    /// Finds the active note struck by `point` at `raw_ms`, marks it hit and
    /// feeds the timing sample to calibration. `None` means the tap landed on
    /// nothing.
    pub fn resolve(
        &self,
        point: Point,
        raw_ms: f64,
        scheduler: &mut NoteScheduler,
        line: &JudgmentLine,
        calibration: &mut CalibrationEstimator,
    ) -> Option<HitOutcome> {
        let effective_ms = calibration.adjust(raw_ms);
        let pose = line.pose_at(raw_ms);

        let (id, scheduled_ms, note_type) = self.find_candidate(point, raw_ms, &pose, scheduler)?;

        let delta_ms = raw_ms - scheduled_ms;
        let quality = Quality::classify(delta_ms);
        calibration.on_sample(raw_ms, scheduled_ms);
        scheduler.mark_hit(id, raw_ms, quality)?;

        tracing::debug!(id = id.0, ?quality, delta_ms, "note hit");

        Some(HitOutcome {
            note_id: id,
            note_type,
            quality,
            delta_ms,
            effective_ms,
        })
    }

    fn find_candidate(
        &self,
        point: Point,
        raw_ms: f64,
        pose: &JudgmentLinePose,
        scheduler: &NoteScheduler,
    ) -> Option<(NoteId, f64, NoteType)> {
        let mut candidates = scheduler.active_notes().filter_map(|note| {
            let distance = point.distance(note_position(note, pose, raw_ms));
            (distance < self.hit_radius).then_some((note, distance))
        });

        let (note, _) = match self.strategy {
            ResolveStrategy::EarliestScheduled => candidates.next()?,
            ResolveStrategy::Nearest => candidates.fold(None, |best: Option<(&Note, f64)>, item| {
                match best {
                    Some(current) if current.1 <= item.1 => Some(current),
                    _ => Some(item),
                }
            })?,
        };
        Some((note.id(), note.scheduled_ms(), note.note_type()))
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{MotionPattern, NoteState};

    struct Fixture {
        scheduler: NoteScheduler,
        line: JudgmentLine,
        calibration: CalibrationEstimator,
    }

    fn fixture(notes: &[(f64, u8)]) -> Fixture {
        let mut rng = StdRng::seed_from_u64(1);
        let mut scheduler = NoteScheduler::editor();
        for &(at, lane) in notes {
            scheduler
                .insert_note(Some(NoteType::Tap), at, lane, 0.0, &mut rng)
                .unwrap();
        }
        Fixture {
            scheduler,
            line: JudgmentLine::new(MotionPattern::Circle, 0.0, 1),
            calibration: CalibrationEstimator::new(),
        }
    }

    fn position_of(f: &Fixture, index: usize, now: f64) -> Point {
        note_position(&f.scheduler.notes()[index], &f.line.pose_at(now), now)
    }

    #[test]
    fn quality_tiers() {
        assert_eq!(Quality::classify(0.0), Quality::Perfect);
        assert_eq!(Quality::classify(-49.9), Quality::Perfect);
        assert_eq!(Quality::classify(50.0), Quality::Good);
        assert_eq!(Quality::classify(-99.0), Quality::Good);
        assert_eq!(Quality::classify(100.0), Quality::Ok);
        assert_eq!(Quality::classify(-1400.0), Quality::Ok);
    }

    #[test]
    fn note_descends_onto_line() {
        let f = fixture(&[(2000.0, 0)]);
        let at_spawn = position_of(&f, 0, 1500.0);
        assert_eq!(at_spawn, Point::new(640.0 - 350.0, 300.0));
        let halfway = position_of(&f, 0, 2500.0);
        assert_eq!(halfway.y, 400.0);
        let landed = position_of(&f, 0, 4000.0);
        assert_eq!(landed.y, 500.0);
    }

    #[test]
    fn resolves_touch_on_active_note() {
        let mut f = fixture(&[(2000.0, 3)]);
        f.scheduler.update(1990.0, 0);
        let point = position_of(&f, 0, 2010.0);

        let outcome = HitResolver::default()
            .resolve(point, 2010.0, &mut f.scheduler, &f.line, &mut f.calibration)
            .expect("touch should hit");

        assert_eq!(outcome.quality, Quality::Perfect);
        assert_eq!(outcome.delta_ms, 10.0);
        assert_eq!(f.scheduler.notes()[0].state(), NoteState::Hit);
        assert_eq!(f.scheduler.notes()[0].hit_ms(), Some(2010.0));
        assert_eq!(f.scheduler.active_notes().count(), 0);
        assert_eq!(f.calibration.samples().collect::<Vec<_>>(), vec![10.0]);
    }

    #[test]
    fn inactive_notes_cannot_be_hit() {
        let mut f = fixture(&[(5000.0, 3)]);
        f.scheduler.update(3000.0, 0);
        let point = position_of(&f, 0, 3000.0);

        let outcome = HitResolver::default().resolve(
            point,
            3000.0,
            &mut f.scheduler,
            &f.line,
            &mut f.calibration,
        );
        assert!(outcome.is_none());
        assert_eq!(f.scheduler.notes()[0].state(), NoteState::Inactive);
    }

    #[test]
    fn tap_on_nothing_is_no_hit() {
        let mut f = fixture(&[(2000.0, 0)]);
        f.scheduler.update(2000.0, 0);
        let outcome = HitResolver::default().resolve(
            Point::new(1200.0, 50.0),
            2000.0,
            &mut f.scheduler,
            &f.line,
            &mut f.calibration,
        );
        assert!(outcome.is_none());
        assert_eq!(f.calibration.samples().count(), 0);
    }

    #[test]
    fn earliest_scheduled_wins_over_nearest() {
        // Both notes sit in lane 3; the later one is exactly under the touch.
        let mut f = fixture(&[(2000.0, 3), (2005.0, 3)]);
        f.scheduler.update(2000.0, 0);
        let point = position_of(&f, 1, 2500.0);

        let outcome = HitResolver::default()
            .resolve(point, 2500.0, &mut f.scheduler, &f.line, &mut f.calibration)
            .unwrap();
        assert_eq!(outcome.note_id, f.scheduler.notes()[0].id());
    }

    #[test]
    fn nearest_strategy_picks_closest() {
        let mut f = fixture(&[(2000.0, 3), (2005.0, 3)]);
        f.scheduler.update(2000.0, 0);
        let point = position_of(&f, 1, 2500.0);

        let resolver = HitResolver::new(DEFAULT_HIT_RADIUS, ResolveStrategy::Nearest);
        let outcome = resolver
            .resolve(point, 2500.0, &mut f.scheduler, &f.line, &mut f.calibration)
            .unwrap();
        assert_eq!(outcome.note_id, f.scheduler.notes()[1].id());
        assert_eq!(outcome.quality, Quality::Ok);
    }

    #[test]
    fn effective_time_uses_calibration_offset() {
        let mut f = fixture(&[(2000.0, 0)]);
        for _ in 0..3 {
            f.calibration.on_sample(20.0, 0.0);
        }
        f.scheduler.update(2000.0, 0);
        let point = position_of(&f, 0, 2060.0);
        let outcome = HitResolver::default()
            .resolve(point, 2060.0, &mut f.scheduler, &f.line, &mut f.calibration)
            .unwrap();
        assert_eq!(outcome.effective_ms, 2040.0);
        assert_eq!(outcome.quality, Quality::Good);
    }
}
