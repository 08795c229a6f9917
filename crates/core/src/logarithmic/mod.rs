use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::LinearBands;

/// How band beats are derived from consecutive cut sequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatDetection {
    /// Every band reports a beat when the whole new cut sequence orders
    /// lexicographically before the previous one (`false < true`).
    #[default]
    WholeSequence,
    /// A band reports a beat when its own gate closes: not cut last tick,
    /// cut this tick.
    PerBandFallingEdge,
}

/// Bin ranges of width 1, 2, 4, ... that fit entirely inside `bins`. A
/// trailing partial band is dropped.
pub fn octave_ranges(bins: usize) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    let mut width = 1;
    while start + width <= bins {
        ranges.push(start..start + width);
        start += width;
        width *= 2;
    }
    ranges
}

/// Band-level view of a [`LinearBands`] tick on a doubling-width axis.
#[derive(Debug, Clone, Default)]
pub struct LogBands {
    bins: usize,
    ranges: Vec<Range<usize>>,
    norm: Vec<f32>,
    peak: Vec<f32>,
    cut: Vec<bool>,
    prev_cut: Vec<bool>,
    beats: Vec<bool>,
    peak_average: f32,
    detection: BeatDetection,
}

impl LogBands {
    /// Creates the band layout for `bins` linear bins.
    pub fn new(bins: usize, detection: BeatDetection) -> Self {
        Self {
            bins,
            ranges: octave_ranges(bins),
            detection,
            ..Default::default()
        }
    }

    /// Rebuilds the band layout for a new bin count and forgets all history.
    pub fn resize(&mut self, bins: usize) {
        *self = Self::new(bins, self.detection);
    }

    /// Aggregates the latest linear tick. A bin count that differs from the
    /// current layout rebuilds the bands first.
    pub fn update(&mut self, linear: &LinearBands) {
        if linear.len() != self.bins {
            tracing::debug!(
                from = self.bins,
                to = linear.len(),
                "rebuilding log bands for new bin count"
            );
            self.resize(linear.len());
        }

        let threshold = linear.cut_threshold();
        let norm_in = linear.norm();
        let peak_in = linear.peak();

        self.prev_cut = std::mem::take(&mut self.cut);
        self.norm.clear();
        self.peak.clear();
        self.beats.clear();
        self.peak_average = 0.0;

        for range in &self.ranges {
            let width = range.len() as f32;
            let norm = norm_in[range.clone()].iter().sum::<f32>() / width;
            let peak = peak_in[range.clone()].iter().sum::<f32>() / width;

            self.norm.push(norm);
            self.peak.push(peak);
            self.cut.push(peak < threshold);
            self.peak_average += peak;
        }

        if !self.peak.is_empty() {
            self.peak_average /= self.peak.len() as f32;
        }

        match self.detection {
            BeatDetection::WholeSequence => {
                let beat = !self.prev_cut.is_empty() && self.cut < self.prev_cut;
                self.beats.resize(self.cut.len(), beat);
            }
            BeatDetection::PerBandFallingEdge if self.prev_cut.is_empty() => {
                self.beats.resize(self.cut.len(), false);
            }
            BeatDetection::PerBandFallingEdge => {
                self.beats.extend(
                    self.cut
                        .iter()
                        .zip(&self.prev_cut)
                        .map(|(&now, &was)| now && !was),
                );
            }
        }
    }

    pub fn band_count(&self) -> usize {
        self.ranges.len()
    }

    /// Linear bin range covered by each band.
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn norm(&self) -> &[f32] {
        &self.norm
    }

    pub fn peak(&self) -> &[f32] {
        &self.peak
    }

    pub fn cut(&self) -> &[bool] {
        &self.cut
    }

    pub fn prev_cut(&self) -> &[bool] {
        &self.prev_cut
    }

    pub fn beats(&self) -> &[bool] {
        &self.beats
    }

    pub fn peak_average(&self) -> f32 {
        self.peak_average
    }

    pub fn detection(&self) -> BeatDetection {
        self.detection
    }

    pub fn set_detection(&mut self, detection: BeatDetection) {
        self.detection = detection;
    }
}
