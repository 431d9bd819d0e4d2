//! One song attempt from start to results.
//!
//! The session wires the components together in the order the external tick
//! source drives them: scheduler, scoring (for misses), judgment line,
//! calibration, replay. Input events are resolved immediately, in between
//! ticks. All times handed to the components are milliseconds since the song
//! started.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    achievements::{self, AchievementContext, AchievementId, ALL_SONGS},
    CalibrationEstimator, CalibrationStatus, Difficulty, EngineConfig, FrameSnapshot, GameStats,
    HitOutcome, HitResolver, InputEvent, JudgeError, JudgmentLine, JudgmentLinePose, Note,
    NoteScheduler, NoteState, Progress, Recorder, ReplayFrame, ReplayNote, Result, ScoreEvent,
    ScoringEngine, SongDescriptor, SongLibrary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    NotStarted,
    Playing,
    Completed,
}

/// Handed out exactly once, on the tick that completes a song.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionReport {
    pub song_id: String,
    pub difficulty: Difficulty,
    pub stats: GameStats,
    pub games_played: u32,
    pub completed_songs: u32,
    pub triggered: Vec<AchievementId>,
}

#[derive(Debug)]
pub struct GameSession {
    config: EngineConfig,
    state: SessionState,
    song: Option<SongDescriptor>,
    difficulty: Difficulty,
    start_ms: f64,
    elapsed_ms: f64,
    scheduler: NoteScheduler,
    line: JudgmentLine,
    calibration: CalibrationEstimator,
    resolver: HitResolver,
    scoring: ScoringEngine,
    recorder: Recorder,
    rng: StdRng,
    combo_bonus: f64,
    games_played: u32,
    completed_songs: u32,
}

impl GameSession {
    pub fn new(config: EngineConfig, progress: Progress) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let line = JudgmentLine::new(config.line.pattern, config.line.amplitude, rng.random());
        let resolver = HitResolver::new(config.judge.hit_radius, config.judge.strategy);
        let recorder = Recorder::new(config.replay.clone());

        Self {
            config,
            state: SessionState::NotStarted,
            song: None,
            difficulty: progress.difficulty,
            start_ms: 0.0,
            elapsed_ms: 0.0,
            scheduler: NoteScheduler::default(),
            line,
            calibration: CalibrationEstimator::new(),
            resolver,
            scoring: ScoringEngine::default(),
            recorder,
            rng,
            combo_bonus: 1.0,
            games_played: 0,
            completed_songs: progress.completed_songs.min(ALL_SONGS),
        }
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
    }

    /// Starts a new attempt, discarding the previous notes and stats. On error
    /// the session is left exactly as it was.
    pub fn start_song(
        &mut self,
        library: &SongLibrary,
        song_id: Option<&str>,
        now_ms: f64,
    ) -> Result<()> {
        let song = match song_id {
            Some(id) => library.get_song_by_id(id)?,
            None => library
                .random_song(&mut self.rng)
                .ok_or_else(|| JudgeError::msg("song library is empty"))?,
        };
        let multiplier = song.multiplier(self.difficulty);
        let scheduler = NoteScheduler::generate(song.duration_ms, multiplier, &mut self.rng)?;

        tracing::info!(
            song = %song.id,
            difficulty = %self.difficulty,
            notes = scheduler.len(),
            "starting song"
        );

        self.scoring = ScoringEngine::new(scheduler.len() as u32);
        self.scheduler = scheduler;
        self.song = Some(song.clone());
        self.line.reset(self.rng.random());
        if self.config.calibration_enabled {
            self.calibration.start(0.0);
        }
        self.recorder.start();
        self.start_ms = now_ms;
        self.elapsed_ms = 0.0;
        self.combo_bonus = 1.0;
        self.state = SessionState::Playing;
        Ok(())
    }

    /// Advances the attempt to `now_ms`. Returns the completion report on
    /// the tick that ends the song.
    pub fn tick(&mut self, now_ms: f64) -> Option<CompletionReport> {
        if self.state != SessionState::Playing {
            return None;
        }
        let elapsed = (now_ms - self.start_ms).max(self.elapsed_ms);
        self.elapsed_ms = elapsed;

        let tick = self.scheduler.update(elapsed, self.scoring.combo());
        for miss in &tick.missed {
            self.scoring.apply(ScoreEvent::Miss {
                note_type: miss.note_type,
            });
        }
        self.combo_bonus = tick.combo_bonus;

        self.line.update(elapsed);
        if self.calibration.is_running() {
            self.calibration.advance(elapsed);
        }

        let (line, scheduler, scoring) = (&self.line, &self.scheduler, &self.scoring);
        self.recorder.capture(|| {
            let pose = line.pose();
            ReplayFrame {
                elapsed_ms: elapsed,
                pose,
                live_notes: scheduler
                    .notes()
                    .iter()
                    .filter(|note| matches!(note.state(), NoteState::Active | NoteState::Hit))
                    .map(|note| ReplayNote::capture(note, &pose, elapsed))
                    .collect(),
                stats: scoring.stats().clone(),
            }
        });

        let duration_ms = self.song.as_ref().map_or(0.0, |song| song.duration_ms);
        if elapsed > duration_ms {
            return Some(self.complete());
        }
        None
    }

    /// Resolves a touch immediately. `None` when nothing was struck or the
    /// song is not playing.
    pub fn handle_input(&mut self, event: InputEvent) -> Option<HitOutcome> {
        if self.state != SessionState::Playing {
            return None;
        }
        let raw_ms = event.timestamp_ms - self.start_ms;
        let outcome = self.resolver.resolve(
            event.point,
            raw_ms,
            &mut self.scheduler,
            &self.line,
            &mut self.calibration,
        )?;
        self.scoring.apply(ScoreEvent::Hit {
            note_type: outcome.note_type,
            quality: outcome.quality,
        });
        Some(outcome)
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot::capture(
            self.elapsed_ms,
            self.state,
            self.line.pose(),
            &self.scheduler,
            self.scoring.stats(),
            self.calibration.status(),
        )
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn song(&self) -> Option<&SongDescriptor> {
        self.song.as_ref()
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Absolute time at which the current attempt started.
    pub fn start_ms(&self) -> f64 {
        self.start_ms
    }

    pub fn stats(&self) -> &GameStats {
        self.scoring.stats()
    }

    pub fn notes(&self) -> &[Note] {
        self.scheduler.notes()
    }

    pub fn pose(&self) -> JudgmentLinePose {
        self.line.pose()
    }

    pub fn combo_bonus(&self) -> f64 {
        self.combo_bonus
    }

    pub fn calibration(&self) -> CalibrationStatus {
        self.calibration.status()
    }

    pub fn replay(&self) -> &[ReplayFrame] {
        self.recorder.frames()
    }

    pub fn games_played(&self) -> u32 {
        self.games_played
    }

    pub fn completed_songs(&self) -> u32 {
        self.completed_songs
    }

    fn complete(&mut self) -> CompletionReport {
        self.state = SessionState::Completed;
        self.recorder.stop();
        self.games_played += 1;
        if self.completed_songs < ALL_SONGS {
            self.completed_songs += 1;
        }

        let stats = self.scoring.stats().clone();
        let context = AchievementContext {
            games_played: self.games_played,
            completed_songs: self.completed_songs,
            difficulty: self.difficulty,
        };
        let triggered = achievements::evaluate(&stats, &context);
        let song_id = self
            .song
            .as_ref()
            .map(|song| song.id.clone())
            .unwrap_or_default();

        tracing::info!(
            song = %song_id,
            score = stats.score,
            rank = %stats.rank,
            achievements = triggered.len(),
            "song completed"
        );

        CompletionReport {
            song_id,
            difficulty: self.difficulty,
            stats,
            games_played: self.games_played,
            completed_songs: self.completed_songs,
            triggered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CalibrationPhase, DifficultyMultipliers, Point, Quality};

    const TICK_MS: f64 = 1000.0 / 60.0;

    fn short_library() -> SongLibrary {
        let mut library = SongLibrary::new();
        library.register(SongDescriptor {
            id: "short".to_string(),
            title: "Short".to_string(),
            artist: "Test".to_string(),
            duration_ms: 10_000.0,
            bpm: 120,
            multipliers: DifficultyMultipliers {
                easy: 1.0,
                medium: 1.0,
                hard: 1.0,
            },
        });
        library
    }

    fn session(seed: u64) -> GameSession {
        let config = EngineConfig {
            seed: Some(seed),
            ..EngineConfig::default()
        };
        GameSession::new(config, Progress::default())
    }

    fn run_until(session: &mut GameSession, target_ms: f64) -> Option<CompletionReport> {
        let mut now = session.start_ms() + session.elapsed_ms();
        let end = session.start_ms() + target_ms;
        let mut report = None;
        while now < end {
            now = (now + TICK_MS).min(end);
            if let Some(r) = session.tick(now) {
                report = Some(r);
            }
        }
        report
    }

    #[test]
    fn touching_a_note_on_time_is_perfect() {
        let library = short_library();
        let mut session = session(11);
        session.start_song(&library, Some("short"), 500.0).unwrap();
        assert_eq!(session.notes().len(), 6);

        let first = session.notes()[0].clone();
        let at = first.scheduled_ms() + 10.0;
        run_until(&mut session, at);

        let view = session.snapshot();
        let target = view.note(first.id()).expect("note is on screen").position;
        let outcome = session
            .handle_input(InputEvent {
                point: target,
                timestamp_ms: 500.0 + at,
            })
            .expect("touch should land");

        assert_eq!(outcome.note_id, first.id());
        assert_eq!(outcome.quality, Quality::Perfect);
        let stats = session.stats();
        assert_eq!((stats.hits, stats.misses, stats.combo), (1, 0, 1));
        assert!(stats.score >= 120);
    }

    #[test]
    fn replay_frames_record_note_positions() {
        let library = short_library();
        let mut session = session(11);
        session.start_song(&library, Some("short"), 0.0).unwrap();

        let first = session.notes()[0].clone();
        let at = first.scheduled_ms();
        run_until(&mut session, at);

        let view = session.snapshot();
        let frame = session.replay().last().unwrap().clone();
        assert_eq!(frame.elapsed_ms, view.elapsed_ms);
        assert_eq!(frame.pose, view.pose);
        let recorded = frame
            .live_notes
            .iter()
            .find(|note| note.id == first.id())
            .unwrap();
        assert_eq!(recorded.state, NoteState::Active);
        assert_eq!(recorded.position, view.note(first.id()).unwrap().position);

        let target = recorded.position;
        session
            .handle_input(InputEvent {
                point: target,
                timestamp_ms: at,
            })
            .unwrap();
        run_until(&mut session, at + TICK_MS);

        let frame = session.replay().last().unwrap();
        let recorded = frame
            .live_notes
            .iter()
            .find(|note| note.id == first.id())
            .unwrap();
        assert_eq!(recorded.state, NoteState::Hit);
    }

    #[test]
    fn unplayed_notes_are_missed_and_reset_combo() {
        let library = short_library();
        let mut session = session(3);
        session.start_song(&library, Some("short"), 0.0).unwrap();

        let first = session.notes()[0].clone();
        run_until(&mut session, first.scheduled_ms());
        let view = session.snapshot();
        let point = view.note(first.id()).unwrap().position;
        session
            .handle_input(InputEvent {
                point,
                timestamp_ms: first.scheduled_ms(),
            })
            .unwrap();
        assert_eq!(session.stats().combo, 1);

        run_until(&mut session, 9_000.0);
        let stats = session.stats();
        assert_eq!(stats.misses, 5);
        assert_eq!(stats.combo, 0);
        assert_eq!(stats.max_combo, 1);
        assert!(session
            .notes()
            .iter()
            .skip(1)
            .all(|note| note.state() == NoteState::Missed));
    }

    #[test]
    fn completes_once_and_reports_achievements() {
        let library = short_library();
        let mut session = session(5);
        session.start_song(&library, Some("short"), 0.0).unwrap();

        let report = run_until(&mut session, 10_100.0).expect("song should complete");
        assert_eq!(session.state(), SessionState::Completed);
        assert_eq!(report.song_id, "short");
        assert_eq!(report.games_played, 1);
        assert_eq!(report.completed_songs, 1);
        assert_eq!(report.stats.misses, 6);
        assert!(report.triggered.contains(&AchievementId::FirstPlay));
        assert!(!report.triggered.contains(&AchievementId::NoMiss));

        assert!(session.tick(20_000.0).is_none());
        assert!(session
            .handle_input(InputEvent {
                point: Point::new(640.0, 500.0),
                timestamp_ms: 20_000.0,
            })
            .is_none());
    }

    #[test]
    fn unknown_song_leaves_state_untouched() {
        let library = short_library();
        let mut session = session(8);
        let err = session.start_song(&library, Some("nope"), 0.0).unwrap_err();
        assert!(matches!(err, JudgeError::SongNotFound(_)));
        assert_eq!(session.state(), SessionState::NotStarted);
        assert!(session.notes().is_empty());

        session.start_song(&library, Some("short"), 0.0).unwrap();
        let before = session.notes().len();
        assert!(session.start_song(&library, Some("nope"), 100.0).is_err());
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(session.notes().len(), before);
    }

    #[test]
    fn too_short_song_cannot_start() {
        let mut library = short_library();
        let mut song = library.get_song_by_id("short").unwrap().clone();
        song.id = "blip".to_string();
        song.duration_ms = 3000.0;
        library.register(song);

        let mut session = session(1);
        let err = session.start_song(&library, Some("blip"), 0.0).unwrap_err();
        assert!(matches!(err, JudgeError::InvalidDuration { .. }));
        assert_eq!(session.state(), SessionState::NotStarted);
    }

    #[test]
    fn calibration_runs_alongside_the_song() {
        let library = short_library();
        let mut session = session(2);
        session.start_song(&library, Some("short"), 0.0).unwrap();
        assert!(session.calibration().next_beat_ms.is_some());

        run_until(&mut session, 8_000.0);
        assert_eq!(session.calibration().phase, CalibrationPhase::Complete);
    }

    #[test]
    fn restart_discards_previous_attempt() {
        let library = SongLibrary::builtin();
        let mut session = session(4);
        session.set_difficulty(Difficulty::Hard);
        session.start_song(&library, Some("song1"), 0.0).unwrap();
        assert_eq!(session.notes().len(), 120);

        run_until(&mut session, 20_000.0);
        assert!(session.stats().misses > 0);
        assert!(!session.replay().is_empty());

        session.start_song(&library, None, 30_000.0).unwrap();
        assert_eq!(session.stats(), &GameStats {
            total_notes: session.notes().len() as u32,
            ..GameStats::default()
        });
        assert_eq!(session.elapsed_ms(), 0.0);
        assert!(session.replay().is_empty());
    }

    #[test]
    fn seeded_sessions_are_reproducible() {
        let library = SongLibrary::builtin();
        let mut a = session(99);
        let mut b = session(99);
        a.start_song(&library, None, 0.0).unwrap();
        b.start_song(&library, None, 0.0).unwrap();
        assert_eq!(a.song().map(|s| &s.id), b.song().map(|s| &s.id));
        let times = |s: &GameSession| s.notes().iter().map(Note::scheduled_ms).collect::<Vec<_>>();
        assert_eq!(times(&a), times(&b));
    }
}
