use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub const SAMPLE_CAPACITY: usize = 10;
/// The offset is only re-estimated once this many samples are present.
pub const MIN_SAMPLES: usize = 3;
pub const BEAT_COUNT: usize = 4;
const BEAT_SPACING_MS: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "step")]
pub enum CalibrationPhase {
    #[default]
    NotStarted,
    /// Waiting for the beat with the given index (0-based).
    AwaitingStep(u8),
    Complete,
}

/// Read-only view used by a "calibrating" indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationStatus {
    pub phase: CalibrationPhase,
    pub offset_ms: f64,
    pub samples: usize,
    pub next_beat_ms: Option<f64>,
    pub progress: f32,
}

/// Online estimate of the systematic delay between a beat and the player's
/// input for it.
#[derive(Debug, Clone, Default)]
pub struct CalibrationEstimator {
    samples: VecDeque<f64>,
    offset_ms: f64,
    phase: CalibrationPhase,
    beats: [f64; BEAT_COUNT],
}

impl CalibrationEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a run with beats 2, 4, 6 and 8 seconds after `start_ms`. The
    /// previous offset is kept until enough new samples arrive.
    pub fn start(&mut self, start_ms: f64) {
        self.samples.clear();
        for (index, beat) in self.beats.iter_mut().enumerate() {
            *beat = start_ms + BEAT_SPACING_MS * (index + 1) as f64;
        }
        self.phase = CalibrationPhase::AwaitingStep(0);
        tracing::debug!(start_ms, "calibration started");
    }

    /// Records one `input - expected` sample.
    pub fn on_sample(&mut self, input_ms: f64, expected_ms: f64) {
        self.samples.push_back(input_ms - expected_ms);
        while self.samples.len() > SAMPLE_CAPACITY {
            self.samples.pop_front();
        }
        self.recompute();
    }

    /// Moves past every beat instant `now_ms` has reached. Returns `true` on
    /// the call that completes the run.
    pub fn advance(&mut self, now_ms: f64) -> bool {
        let CalibrationPhase::AwaitingStep(mut step) = self.phase else {
            return false;
        };

        while usize::from(step) < BEAT_COUNT && now_ms >= self.beats[usize::from(step)] {
            step += 1;
            tracing::debug!(step, now_ms, "calibration beat passed");
        }

        if usize::from(step) == BEAT_COUNT {
            self.recompute();
            self.phase = CalibrationPhase::Complete;
            tracing::info!(offset_ms = self.offset_ms, samples = self.samples.len(), "calibration complete");
            true
        } else {
            self.phase = CalibrationPhase::AwaitingStep(step);
            false
        }
    }

    /// Removes the estimated latency from a raw timestamp.
    pub fn adjust(&self, time_ms: f64) -> f64 {
        time_ms - self.offset_ms
    }

    pub fn offset_ms(&self) -> f64 {
        self.offset_ms
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, CalibrationPhase::AwaitingStep(_))
    }

    pub fn beats(&self) -> &[f64; BEAT_COUNT] {
        &self.beats
    }

    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn status(&self) -> CalibrationStatus {
        let (next_beat_ms, progress) = match self.phase {
            CalibrationPhase::NotStarted => (None, 0.0),
            CalibrationPhase::AwaitingStep(step) => (
                self.beats.get(usize::from(step)).copied(),
                f32::from(step) / BEAT_COUNT as f32,
            ),
            CalibrationPhase::Complete => (None, 1.0),
        };
        CalibrationStatus {
            phase: self.phase,
            offset_ms: self.offset_ms,
            samples: self.samples.len(),
            next_beat_ms,
            progress,
        }
    }

    fn recompute(&mut self) {
        if self.samples.len() < MIN_SAMPLES {
            return;
        }
        self.offset_ms = self.samples.iter().sum::<f64>() / self.samples.len() as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_symmetric_samples_is_zero() {
        let mut calibration = CalibrationEstimator::new();
        for (i, delta) in [10.0, -10.0, 20.0, -20.0].into_iter().enumerate() {
            let expected = 2000.0 * (i + 1) as f64;
            calibration.on_sample(expected + delta, expected);
        }
        assert_eq!(calibration.offset_ms(), 0.0);
        assert_eq!(calibration.adjust(1000.0), 1000.0);
    }

    #[test]
    fn fewer_than_three_samples_keep_offset() {
        let mut calibration = CalibrationEstimator::new();
        calibration.on_sample(140.0, 100.0);
        calibration.on_sample(150.0, 100.0);
        assert_eq!(calibration.offset_ms(), 0.0);

        calibration.on_sample(160.0, 100.0);
        assert!((calibration.offset_ms() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn window_evicts_oldest_samples() {
        let mut calibration = CalibrationEstimator::new();
        for _ in 0..5 {
            calibration.on_sample(1000.0, 0.0);
        }
        for _ in 0..SAMPLE_CAPACITY {
            calibration.on_sample(30.0, 0.0);
        }
        assert_eq!(calibration.samples().count(), SAMPLE_CAPACITY);
        assert!((calibration.offset_ms() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn steps_through_four_beats() {
        let mut calibration = CalibrationEstimator::new();
        assert!(!calibration.advance(10_000.0));

        calibration.start(1000.0);
        assert_eq!(calibration.beats(), &[3000.0, 5000.0, 7000.0, 9000.0]);
        assert!(!calibration.advance(2999.0));
        assert_eq!(calibration.phase(), CalibrationPhase::AwaitingStep(0));

        assert!(!calibration.advance(3000.0));
        assert_eq!(calibration.phase(), CalibrationPhase::AwaitingStep(1));
        assert_eq!(calibration.status().next_beat_ms, Some(5000.0));

        for beat in calibration.beats().to_vec() {
            calibration.on_sample(beat + 40.0, beat);
        }
        assert!(!calibration.advance(7500.0));
        assert_eq!(calibration.status().progress, 0.75);

        assert!(calibration.advance(9000.0));
        assert_eq!(calibration.phase(), CalibrationPhase::Complete);
        assert!((calibration.offset_ms() - 40.0).abs() < 1e-9);
        assert!(!calibration.advance(20_000.0));
    }

    #[test]
    fn completes_without_samples() {
        let mut calibration = CalibrationEstimator::new();
        calibration.start(0.0);
        assert!(calibration.advance(8000.0));
        assert_eq!(calibration.offset_ms(), 0.0);
    }

    #[test]
    fn restart_keeps_previous_offset() {
        let mut calibration = CalibrationEstimator::new();
        for _ in 0..3 {
            calibration.on_sample(25.0, 0.0);
        }
        calibration.start(0.0);
        assert_eq!(calibration.samples().count(), 0);
        assert!((calibration.offset_ms() - 25.0).abs() < 1e-9);
    }
}
