use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BeatDetection, Result, WindowKind};

/// Smallest buffer the transform accepts; it yields a single bin.
pub const MIN_BUFFER_SIZE: usize = 2;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analyzer: AnalyzerConfig,
    pub audio: AudioConfig,
}

impl AppConfig {
    /// Parses a JSON document. Missing fields fall back to their defaults and
    /// out-of-range values are coerced the same way the setters coerce them.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut config: AppConfig = serde_json::from_str(json)?;
        config.analyzer = config.analyzer.sanitized();
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Tuning for the band tracker and log aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub buffer_size: usize,
    pub max_decay: f32,
    pub peak_decay: f32,
    pub threshold: f32,
    pub mirror: bool,
    pub beat_detection: BeatDetection,
    pub window: WindowKind,
    pub linear_eq: LinearEq,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            max_decay: 0.995,
            peak_decay: 0.96,
            threshold: 0.5,
            mirror: false,
            beat_detection: BeatDetection::default(),
            window: WindowKind::default(),
            linear_eq: LinearEq::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Returns a copy with the buffer size rounded to a power of two and the
    /// decay/threshold values clamped into `[0, 1]`.
    pub fn sanitized(mut self) -> Self {
        self.buffer_size = coerce_buffer_size(self.buffer_size);
        self.max_decay = clamp_unit(self.max_decay);
        self.peak_decay = clamp_unit(self.peak_decay);
        self.threshold = clamp_unit(self.threshold);
        self
    }
}

/// Linear equalisation curve applied across the bins before normalisation:
/// `gain(i) = intercept + i / (N - 1) * slope`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearEq {
    pub intercept: f32,
    pub slope: f32,
}

impl Default for LinearEq {
    fn default() -> Self {
        Self {
            intercept: 1.0,
            slope: 0.0,
        }
    }
}

impl LinearEq {
    pub fn gain(&self, index: usize, len: usize) -> f32 {
        let position = if len > 1 {
            index as f32 / (len - 1) as f32
        } else {
            0.0
        };
        self.intercept + position * self.slope
    }
}

/// Configuration specific to the audio ingest side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: usize,
    pub input_channel: usize,
    pub buffer_count: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            input_channel: 0,
            buffer_count: 4,
        }
    }
}

/// Rounds a requested buffer size up to the next power of two.
pub fn coerce_buffer_size(requested: usize) -> usize {
    requested.max(MIN_BUFFER_SIZE).next_power_of_two()
}

/// Clamps into `[0, 1]`. NaN collapses to zero.
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sizes_round_up_to_powers_of_two() {
        assert_eq!(coerce_buffer_size(100), 128);
        assert_eq!(coerce_buffer_size(512), 512);
        assert_eq!(coerce_buffer_size(513), 1024);
        assert_eq!(coerce_buffer_size(0), MIN_BUFFER_SIZE);
    }

    #[test]
    fn parses_partial_documents_with_defaults() {
        let config = AppConfig::from_json_str(
            r#"{ "analyzer": { "buffer_size": 300, "threshold": 1.7, "mirror": true } }"#,
        )
        .unwrap();

        assert_eq!(config.analyzer.buffer_size, 512);
        assert_eq!(config.analyzer.threshold, 1.0);
        assert!(config.analyzer.mirror);
        assert_eq!(config.analyzer.peak_decay, 0.96);
        assert_eq!(config.audio.sample_rate, 44_100);
        assert_eq!(config.audio.buffer_count, 4);
    }

    #[test]
    fn parses_enum_choices() {
        let config = AppConfig::from_json_str(
            r#"{ "analyzer": { "beat_detection": "per_band_falling_edge", "window": "hann" } }"#,
        )
        .unwrap();

        assert_eq!(
            config.analyzer.beat_detection,
            BeatDetection::PerBandFallingEdge
        );
        assert_eq!(config.analyzer.window, WindowKind::Hann);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = AppConfig::from_json_str("{ analyzer: ").unwrap_err();
        assert!(format!("{err}").starts_with("invalid configuration"));
    }

    #[test]
    fn eq_gain_spans_intercept_to_intercept_plus_slope() {
        let eq = LinearEq {
            intercept: 0.5,
            slope: 1.0,
        };
        assert_eq!(eq.gain(0, 5), 0.5);
        assert_eq!(eq.gain(4, 5), 1.5);
        assert_eq!(eq.gain(0, 1), 0.5);
    }
}
