//! Sine tone synthesis.

use std::f32::consts::TAU;
use std::time::Duration;

/// Renders fixed-frequency sine bursts at a given sample rate.
#[derive(Debug, Clone, Copy)]
pub struct ToneSynth {
    frequency_hz: f32,
    volume: f32,
    sample_rate: u32,
}

impl ToneSynth {
    /// `volume` is clamped to [0.0, 1.0].
    pub fn new(frequency_hz: f32, volume: f32, sample_rate: u32) -> Self {
        Self {
            frequency_hz,
            volume: volume.clamp(0.0, 1.0),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of mono samples covering `duration`.
    pub fn sample_count(&self, duration: Duration) -> usize {
        (duration.as_secs_f64() * f64::from(self.sample_rate)).round() as usize
    }

    /// Mono samples for one tone, starting at phase zero.
    pub fn render(&self, duration: Duration) -> Vec<f32> {
        let step = TAU * self.frequency_hz / self.sample_rate as f32;
        (0..self.sample_count(duration))
            .map(|i| (step * i as f32).sin() * self.volume)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_count_matches_duration() {
        let synth = ToneSynth::new(800.0, 0.8, 44_100);
        assert_eq!(synth.sample_count(Duration::from_millis(100)), 4_410);
        assert_eq!(synth.render(Duration::from_millis(100)).len(), 4_410);
        assert!(synth.render(Duration::ZERO).is_empty());
    }

    #[test]
    fn peak_never_exceeds_volume() {
        let synth = ToneSynth::new(800.0, 0.8, 48_000);
        let samples = synth.render(Duration::from_millis(50));
        assert_eq!(samples[0], 0.0);
        let peak = samples.iter().fold(0f32, |acc, s| acc.max(s.abs()));
        assert!(peak <= 0.8 + 1e-6, "peak={peak}");
        assert!(peak > 0.75, "peak={peak}");
    }

    #[test]
    fn volume_is_clamped() {
        let synth = ToneSynth::new(600.0, 3.0, 8_000);
        let peak = synth
            .render(Duration::from_millis(20))
            .iter()
            .fold(0f32, |acc, s| acc.max(s.abs()));
        assert!(peak <= 1.0 + 1e-6);
    }
}
