use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44_100;
/// Fade in/out length, keeps the beep from clicking.
const RAMP_SAMPLES: usize = 441;

/// Finite sine beep, mono.
pub struct AlarmTone {
    frequency: f32,
    total_samples: usize,
    num_sample: usize,
}

impl AlarmTone {
    pub fn new(frequency_hz: u32, duration_ms: u64) -> Self {
        let total_samples = (SAMPLE_RATE as u64 * duration_ms / 1000) as usize;
        Self {
            frequency: frequency_hz as f32,
            total_samples,
            num_sample: 0,
        }
    }

    fn envelope(&self) -> f32 {
        let from_start = self.num_sample;
        let to_end = self.total_samples.saturating_sub(self.num_sample);
        let edge = from_start.min(to_end);
        if edge >= RAMP_SAMPLES {
            1.0
        } else {
            edge as f32 / RAMP_SAMPLES as f32
        }
    }
}

impl Iterator for AlarmTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }

        let t = self.num_sample as f32 / SAMPLE_RATE as f32;
        let sample = (2.0 * PI * self.frequency * t).sin() * self.envelope();
        self.num_sample += 1;

        Some(sample * 0.4)
    }
}

impl Source for AlarmTone {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(
            self.total_samples as f64 / SAMPLE_RATE as f64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_is_finite_and_ramped() {
        let tone = AlarmTone::new(1000, 300);
        let samples: Vec<f32> = tone.collect();
        assert_eq!(samples.len(), 13_230);
        assert_eq!(samples[0], 0.0);
        assert!(samples.iter().all(|s| s.abs() <= 0.4));
    }
}
