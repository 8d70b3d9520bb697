use std::f32::consts::PI;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const SAMPLE_RATE: u32 = 44_100;
const START_GAIN: f32 = 0.1;
const END_GAIN: f32 = 0.01;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

impl Waveform {
    /// One sample of a unit-amplitude wave at `phase` (in cycles).
    fn sample(self, phase: f32) -> f32 {
        let frac = phase.fract();
        match self {
            Waveform::Sine => (2.0 * PI * frac).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (frac - 0.5).abs(),
            Waveform::Sawtooth => 2.0 * frac - 1.0,
            Waveform::Square => {
                if frac < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

/// A short mono cue tone with an exponential fade from 0.1 to 0.01 gain.
///
/// Finite: yields exactly `duration * sample_rate` samples.
#[derive(Debug, Clone)]
pub struct Tone {
    frequency_hz: f32,
    waveform: Waveform,
    sample_rate: u32,
    total_samples: usize,
    num_sample: usize,
}

impl Tone {
    pub fn new(frequency_hz: f32, duration_ms: u64, waveform: Waveform) -> Self {
        let total_samples = (u64::from(SAMPLE_RATE) * duration_ms / 1_000) as usize;
        Self {
            frequency_hz,
            waveform,
            sample_rate: SAMPLE_RATE,
            total_samples,
            num_sample: 0,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_samples as f64 / f64::from(self.sample_rate))
    }

    fn gain(&self) -> f32 {
        if self.total_samples == 0 {
            return END_GAIN;
        }
        let progress = self.num_sample as f32 / self.total_samples as f32;
        START_GAIN * (END_GAIN / START_GAIN).powf(progress)
    }
}

impl Iterator for Tone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        let t = self.num_sample as f32 / self.sample_rate as f32;
        let sample = self.waveform.sample(self.frequency_hz * t) * self.gain();
        self.num_sample += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_samples.saturating_sub(self.num_sample);
        (remaining, Some(remaining))
    }
}

#[cfg(feature = "audio")]
impl rodio::Source for Tone {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples.saturating_sub(self.num_sample))
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.duration())
    }
}
