use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rhythm_judge_core::{
    calibration::BEAT_COUNT, CalibrationEstimator, CompletionReport, Difficulty, EngineConfig,
    GameSession, InputEvent, NoteId, PlaybackClock, Progress, SongLibrary,
};
use tracing_subscriber::EnvFilter;

const TICK_MS: f64 = 1000.0 / 60.0;
const DEFAULT_SKILL: f64 = 0.9;

fn main() -> rhythm_judge_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Songs => run_songs(),
        Commands::Play {
            song,
            difficulty,
            seed,
            skill,
            progress,
            config,
        } => run_play(PlayOptions {
            song,
            difficulty,
            seed,
            skill,
            progress,
            config,
        }),
        Commands::Calibrate { latency, seed } => run_calibrate(latency, seed),
    }
}

fn run_songs() -> rhythm_judge_core::Result<()> {
    let library = SongLibrary::builtin();
    for song in library.songs() {
        println!(
            "{:<7} {:<22} {:<20} {:>4}s {:>4} bpm  x{:.1}/{:.1}/{:.1}",
            song.id,
            song.title,
            song.artist,
            song.duration_ms / 1000.0,
            song.bpm,
            song.multipliers.easy,
            song.multipliers.medium,
            song.multipliers.hard,
        );
    }
    Ok(())
}

struct PlayOptions {
    song: Option<String>,
    difficulty: Option<String>,
    seed: Option<u64>,
    skill: f64,
    progress: PathBuf,
    config: Option<PathBuf>,
}

fn run_play(options: PlayOptions) -> rhythm_judge_core::Result<()> {
    let mut config = match &options.config {
        Some(path) => EngineConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let seed = options
        .seed
        .or(config.seed)
        .unwrap_or_else(rand::random);
    config.seed = Some(seed);

    let mut progress = load_progress(&options.progress);
    if let Some(difficulty) = &options.difficulty {
        progress.difficulty = difficulty.parse::<Difficulty>()?;
    }

    tracing::info!(
        seed,
        skill = options.skill,
        difficulty = %progress.difficulty,
        "starting autoplay"
    );

    let library = SongLibrary::builtin();
    let mut session = GameSession::new(config, progress);
    let mut clock = PlaybackClock::default();
    session.start_song(&library, options.song.as_deref(), clock.time_ms)?;

    let mut player = AutoPlayer::new(options.skill, seed);
    let report = loop {
        clock.advance(TICK_MS);
        if let Some(report) = session.tick(clock.time_ms) {
            break report;
        }
        for event in player.touches(&session, clock.time_ms) {
            session.handle_input(event);
        }
    };

    progress.completed_songs = report.completed_songs;
    progress.unlocked_achievements = progress
        .unlocked_achievements
        .max(report.triggered.len() as u32);
    save_progress(&options.progress, &progress);

    print_report(&report)
}

fn run_calibrate(latency_ms: f64, seed: Option<u64>) -> rhythm_judge_core::Result<()> {
    let mut rng = StdRng::seed_from_u64(seed.unwrap_or_else(rand::random));
    let mut calibration = CalibrationEstimator::new();
    let mut clock = PlaybackClock::default();
    calibration.start(clock.time_ms);

    let beats = *calibration.beats();
    let taps: [f64; BEAT_COUNT] =
        std::array::from_fn(|index| beats[index] + latency_ms + rng.random_range(-5.0..=5.0));
    let mut tapped = [false; BEAT_COUNT];
    while calibration.is_running() {
        clock.advance(TICK_MS);
        for index in 0..BEAT_COUNT {
            if !tapped[index] && clock.time_ms >= taps[index] {
                tapped[index] = true;
                calibration.on_sample(taps[index], beats[index]);
            }
        }
        calibration.advance(clock.time_ms);
    }

    let status = calibration.status();
    tracing::info!(offset_ms = status.offset_ms, samples = status.samples, "calibration finished");
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// Simulated player that taps each note once, at a jittered time, with
/// probability `skill`.
struct AutoPlayer {
    skill: f64,
    rng: StdRng,
    plans: HashMap<NoteId, Option<f64>>,
}

impl AutoPlayer {
    fn new(skill: f64, seed: u64) -> Self {
        Self {
            skill: sanitize_skill(skill),
            rng: StdRng::seed_from_u64(seed ^ 0x5eed),
            plans: HashMap::new(),
        }
    }

    fn touches(&mut self, session: &GameSession, now_ms: f64) -> Vec<InputEvent> {
        let snapshot = session.snapshot();
        let spread = (1.0 - self.skill) * 150.0 + 10.0;
        let mut events = Vec::new();

        for view in &snapshot.notes {
            let plan = *self.plans.entry(view.id).or_insert_with(|| {
                self.rng
                    .random_bool(self.skill)
                    .then(|| view.scheduled_ms + self.rng.random_range(-spread..=spread))
            });
            let Some(tap_at) = plan else {
                continue;
            };
            if snapshot.elapsed_ms >= tap_at {
                self.plans.insert(view.id, None);
                events.push(InputEvent {
                    point: view.position,
                    timestamp_ms: now_ms,
                });
            }
        }
        events
    }
}

fn sanitize_skill(skill: f64) -> f64 {
    if skill.is_finite() {
        skill.clamp(0.0, 1.0)
    } else {
        tracing::warn!(skill, fallback = DEFAULT_SKILL, "skill is not a finite number");
        DEFAULT_SKILL
    }
}

fn load_progress(path: &Path) -> Progress {
    if !path.exists() {
        tracing::debug!(?path, "no progress file, starting fresh");
        return Progress::default();
    }
    match std::fs::read_to_string(path)
        .map_err(rhythm_judge_core::JudgeError::from)
        .and_then(|json| Progress::from_json_str(&json))
    {
        Ok(progress) => progress,
        Err(err) => {
            tracing::warn!(?path, %err, "could not load progress, using defaults");
            Progress::default()
        }
    }
}

fn save_progress(path: &Path, progress: &Progress) {
    let result = progress
        .to_json_string()
        .and_then(|json| std::fs::write(path, json).map_err(Into::into));
    if let Err(err) = result {
        tracing::warn!(?path, %err, "could not save progress");
    }
}

fn print_report(report: &CompletionReport) -> rhythm_judge_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Rhythm judgment engine driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the built-in songs.
    Songs,
    /// Autoplay a song with a simulated player and print the results.
    Play {
        /// Song id such as `song3`. A random song is picked when omitted.
        #[arg(short, long)]
        song: Option<String>,
        /// easy, medium or hard. Defaults to the difficulty stored in progress.
        #[arg(short, long)]
        difficulty: Option<String>,
        /// Seed for note generation and the simulated player.
        #[arg(long)]
        seed: Option<u64>,
        /// Probability that the simulated player taps a given note.
        #[arg(long, default_value_t = DEFAULT_SKILL)]
        skill: f64,
        /// Progress file read before and written after the song.
        #[arg(long, default_value = "progress.json")]
        progress: PathBuf,
        /// Engine configuration (JSON).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run a calibration pass with a player who taps every beat late.
    Calibrate {
        /// Simulated input latency in milliseconds.
        #[arg(short, long, default_value_t = 40.0)]
        latency: f64,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_is_clamped_and_non_finite_falls_back() {
        assert_eq!(sanitize_skill(1.7), 1.0);
        assert_eq!(sanitize_skill(-0.2), 0.0);
        assert_eq!(sanitize_skill(f64::NAN), DEFAULT_SKILL);
        assert_eq!(sanitize_skill(f64::INFINITY), DEFAULT_SKILL);
    }

    #[test]
    fn autoplayer_with_nan_skill_still_plays() {
        let library = SongLibrary::builtin();
        let config = EngineConfig {
            seed: Some(5),
            ..EngineConfig::default()
        };
        let mut session = GameSession::new(config, Progress::default());
        session.start_song(&library, Some("song1"), 0.0).unwrap();

        let mut player = AutoPlayer::new(f64::NAN, 5);
        let mut clock = PlaybackClock::default();
        let report = loop {
            clock.advance(TICK_MS);
            if let Some(report) = session.tick(clock.time_ms) {
                break report;
            }
            for event in player.touches(&session, clock.time_ms) {
                session.handle_input(event);
            }
        };
        assert!(report.stats.hits > 0);
    }
}
