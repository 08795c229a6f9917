use std::iter;

use crate::{
    config::{clamp_unit, LinearEq},
    AnalyzerConfig,
};

/// Magnitudes below this are treated as silence and normalise to zero.
pub const NOISE_FLOOR: f32 = 0.1;

/// Per-bin state on the linear frequency axis.
///
/// `running_max` and `peak` carry across ticks; everything else is rebuilt by
/// each call to [`LinearBands::update`].
#[derive(Debug, Clone)]
pub struct LinearBands {
    raw: Vec<f32>,
    norm: Vec<f32>,
    running_max: Vec<f32>,
    peak: Vec<f32>,
    cut: Vec<bool>,
    peak_value: f32,
    peak_average: f32,
    max_decay: f32,
    peak_decay: f32,
    cut_threshold: f32,
    linear_eq: LinearEq,
    mirror: bool,
}

impl LinearBands {
    /// Creates `bins` zeroed bins using the default tuning.
    pub fn new(bins: usize) -> Self {
        Self::with_config(bins, &AnalyzerConfig::default())
    }

    pub fn with_config(bins: usize, config: &AnalyzerConfig) -> Self {
        Self {
            raw: vec![0.0; bins],
            norm: vec![0.0; bins],
            running_max: vec![0.0; bins],
            peak: vec![0.0; bins],
            cut: vec![false; bins],
            peak_value: 0.0,
            peak_average: 0.0,
            max_decay: clamp_unit(config.max_decay),
            peak_decay: clamp_unit(config.peak_decay),
            cut_threshold: clamp_unit(config.threshold),
            linear_eq: config.linear_eq,
            mirror: config.mirror,
        }
    }

    /// Reallocates every array to `bins` entries and zeroes the decay state.
    /// Tuning parameters are kept.
    pub fn resize(&mut self, bins: usize) {
        self.raw = vec![0.0; bins];
        self.norm = vec![0.0; bins];
        self.running_max = vec![0.0; bins];
        self.peak = vec![0.0; bins];
        self.cut = vec![false; bins];
        self.peak_value = 0.0;
        self.peak_average = 0.0;
    }

    /// Ingests one tick of raw magnitudes.
    ///
    /// If any equalised magnitude is non-finite the tick is abandoned after
    /// `raw` has been copied: `peak_value` and `peak_average` drop to zero
    /// and the normalised, peak and cut arrays keep last tick's values.
    pub fn update(&mut self, magnitudes: &[f32]) {
        let len = self.raw.len();
        if magnitudes.len() != len {
            tracing::warn!(
                expected = len,
                received = magnitudes.len(),
                "magnitude count does not match bin count"
            );
        }

        for (slot, value) in self
            .raw
            .iter_mut()
            .zip(magnitudes.iter().copied().chain(iter::repeat(0.0)))
        {
            *slot = value;
        }

        self.peak_value = 0.0;
        self.peak_average = 0.0;

        if let Some(index) = (0..len).find(|&i| !self.scaled(i).is_finite()) {
            tracing::error!(
                index,
                raw = self.raw[index],
                "non-finite magnitude, skipping band update"
            );
            return;
        }

        self.peak_value = self.raw.iter().copied().fold(0.0, f32::max);

        for i in 0..len {
            let value = self.scaled(i);

            let max = self.running_max[i].max(value);
            let norm = if value < NOISE_FLOOR || max <= 0.0 {
                0.0
            } else {
                value / max
            };
            self.running_max[i] = max * self.max_decay;
            self.norm[i] = norm;

            let peak = (self.peak[i] * self.peak_decay).max(norm);
            self.peak[i] = peak;
            self.peak_average += peak;
            self.cut[i] = peak < self.cut_threshold;
        }

        if len > 0 {
            self.peak_average /= len as f32;
        }

        if self.mirror {
            self.mirror_halves();
        }
    }

    fn scaled(&self, index: usize) -> f32 {
        self.raw[index] * self.linear_eq.gain(index, self.raw.len())
    }

    /// Reflects the lower half onto the upper half. `raw` stays untouched.
    fn mirror_halves(&mut self) {
        let len = self.norm.len();
        for i in 0..len / 2 {
            let k = len - 1 - i;
            self.norm[k] = self.norm[i];
            self.running_max[k] = self.running_max[i];
            self.peak[k] = self.peak[i];
            self.cut[k] = self.cut[i];
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn raw(&self) -> &[f32] {
        &self.raw
    }

    pub fn norm(&self) -> &[f32] {
        &self.norm
    }

    pub fn running_max(&self) -> &[f32] {
        &self.running_max
    }

    pub fn peak(&self) -> &[f32] {
        &self.peak
    }

    pub fn cut(&self) -> &[bool] {
        &self.cut
    }

    /// Largest raw magnitude of the last completed tick.
    pub fn peak_value(&self) -> f32 {
        self.peak_value
    }

    /// Ratio of a bin's equalised magnitude to the tick's largest raw
    /// magnitude. Zero when the tick had no energy or was abandoned.
    pub fn peak_ratio(&self, index: usize) -> f32 {
        if self.peak_value > 0.0 && index < self.raw.len() {
            self.scaled(index) / self.peak_value
        } else {
            0.0
        }
    }

    pub fn peak_average(&self) -> f32 {
        self.peak_average
    }

    pub fn max_decay(&self) -> f32 {
        self.max_decay
    }

    pub fn set_max_decay(&mut self, value: f32) {
        self.max_decay = clamp_unit(value);
    }

    pub fn peak_decay(&self) -> f32 {
        self.peak_decay
    }

    pub fn set_peak_decay(&mut self, value: f32) {
        self.peak_decay = clamp_unit(value);
    }

    pub fn cut_threshold(&self) -> f32 {
        self.cut_threshold
    }

    pub fn set_cut_threshold(&mut self, value: f32) {
        self.cut_threshold = clamp_unit(value);
    }

    pub fn linear_eq(&self) -> LinearEq {
        self.linear_eq
    }

    pub fn set_linear_eq(&mut self, eq: LinearEq) {
        self.linear_eq = eq;
    }

    pub fn mirror(&self) -> bool {
        self.mirror
    }

    pub fn set_mirror(&mut self, enabled: bool) {
        self.mirror = enabled;
    }
}

/// Nearest-neighbour resampling of `source` into `out`, mapping output index
/// `i` to `floor(i / (L - 1) * (N - 1))`.
pub fn resample_into<T: Copy + Default>(source: &[T], out: &mut [T]) {
    if source.is_empty() {
        out.iter_mut().for_each(|slot| *slot = T::default());
        return;
    }

    let last_out = out.len().saturating_sub(1);
    let last_in = source.len() - 1;
    for (i, slot) in out.iter_mut().enumerate() {
        let index = if last_out == 0 { 0 } else { i * last_in / last_out };
        *slot = source[index];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_decay: f32, peak_decay: f32, threshold: f32) -> AnalyzerConfig {
        AnalyzerConfig {
            max_decay,
            peak_decay,
            threshold,
            ..Default::default()
        }
    }

    #[test]
    fn silence_normalises_to_zero_and_cuts_everything() {
        for bins in [1, 7, 64] {
            let mut bands = LinearBands::new(bins);
            bands.update(&vec![0.0; bins]);

            assert!(bands.norm().iter().all(|v| *v == 0.0));
            assert!(bands.peak().iter().all(|v| *v == 0.0));
            assert!(bands.cut().iter().all(|c| *c));
            assert_eq!(bands.peak_average(), 0.0);
        }
    }

    #[test]
    fn first_tick_of_ramp_without_decay() {
        let mut bands = LinearBands::with_config(8, &config(1.0, 1.0, 0.5));
        let input = [1.0, 2.0, 3.0, 4.0, 4.0, 3.0, 2.0, 1.0];
        bands.update(&input);

        assert_eq!(bands.peak_value(), 4.0);
        assert_eq!(bands.running_max(), &input);
        assert!(bands.norm().iter().all(|v| *v == 1.0));
        assert!(bands.peak().iter().all(|v| *v == 1.0));
        assert!(bands.cut().iter().all(|c| !*c));
        assert_eq!(bands.peak_average(), 1.0);
        assert_eq!(bands.peak_ratio(0), 0.25);
    }

    #[test]
    fn values_under_noise_floor_are_zeroed() {
        let mut bands = LinearBands::with_config(4, &config(1.0, 1.0, 0.5));
        bands.update(&[0.05, 0.5, 0.09, 2.0]);

        assert_eq!(bands.norm(), &[0.0, 1.0, 0.0, 1.0]);
        assert_eq!(bands.running_max()[0], 0.05);
        assert_eq!(bands.cut(), &[true, false, true, false]);
    }

    #[test]
    fn quieter_tick_normalises_against_decayed_max() {
        let mut bands = LinearBands::with_config(1, &config(0.5, 0.5, 0.5));
        bands.update(&[4.0]);
        assert_eq!(bands.running_max(), &[2.0]);

        bands.update(&[1.0]);
        assert_eq!(bands.norm(), &[0.5]);
        assert_eq!(bands.running_max(), &[1.0]);
        // max(1.0 * 0.5, 0.5)
        assert_eq!(bands.peak(), &[0.5]);
        assert_eq!(bands.cut(), &[false]);

        bands.update(&[0.0]);
        assert_eq!(bands.peak(), &[0.25]);
        assert_eq!(bands.cut(), &[true]);
    }

    #[test]
    fn repeated_input_converges() {
        let mut bands = LinearBands::new(16);
        let input: Vec<f32> = (0..16).map(|i| 0.5 + i as f32).collect();

        for _ in 0..2_000 {
            bands.update(&input);
        }
        let norm = bands.norm().to_vec();
        let peak = bands.peak().to_vec();
        bands.update(&input);

        for (a, b) in norm.iter().zip(bands.norm()) {
            assert!((a - b).abs() < 1e-6);
        }
        for (a, b) in peak.iter().zip(bands.peak()) {
            assert!((a - b).abs() < 1e-6);
        }
        assert!(bands.norm().iter().all(|v| (*v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn mirroring_reflects_lower_half_but_not_raw() {
        let mut bands = LinearBands::with_config(
            8,
            &AnalyzerConfig {
                mirror: true,
                ..config(1.0, 1.0, 0.5)
            },
        );
        let input = [8.0, 0.0, 3.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        bands.update(&input);
        bands.update(&[4.0, 0.0, 3.0, 0.0, 1.0, 1.0, 1.0, 1.0]);

        for i in 0..4 {
            assert_eq!(bands.norm()[7 - i], bands.norm()[i]);
            assert_eq!(bands.peak()[7 - i], bands.peak()[i]);
            assert_eq!(bands.running_max()[7 - i], bands.running_max()[i]);
            assert_eq!(bands.cut()[7 - i], bands.cut()[i]);
        }
        assert_eq!(bands.norm()[0], 0.5);
        assert_eq!(bands.raw()[7], 1.0);
    }

    #[test]
    fn non_finite_input_leaves_previous_tick_in_place() {
        let mut bands = LinearBands::new(4);
        bands.update(&[1.0, 2.0, 3.0, 4.0]);
        let norm = bands.norm().to_vec();
        let peak = bands.peak().to_vec();
        let cut = bands.cut().to_vec();
        assert!(bands.peak_average() > 0.0);

        bands.update(&[5.0, 5.0, f32::INFINITY, 5.0]);

        assert_eq!(bands.peak_average(), 0.0);
        assert_eq!(bands.peak_value(), 0.0);
        assert_eq!(bands.norm(), norm.as_slice());
        assert_eq!(bands.peak(), peak.as_slice());
        assert_eq!(bands.cut(), cut.as_slice());
        assert_eq!(bands.raw()[0], 5.0);

        bands.update(&[f32::NAN, 0.0, 0.0, 0.0]);
        assert_eq!(bands.peak(), peak.as_slice());
    }

    #[test]
    fn eq_slope_scales_upper_bins() {
        let mut bands = LinearBands::with_config(
            3,
            &AnalyzerConfig {
                linear_eq: LinearEq {
                    intercept: 0.0,
                    slope: 1.0,
                },
                ..config(1.0, 1.0, 0.5)
            },
        );
        bands.update(&[1.0, 1.0, 1.0]);

        assert_eq!(bands.running_max(), &[0.0, 0.5, 1.0]);
        assert_eq!(bands.norm(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn short_input_is_zero_padded() {
        let mut bands = LinearBands::new(4);
        bands.update(&[1.0, 1.0]);
        assert_eq!(bands.raw(), &[1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn setters_clamp_into_unit_range() {
        let mut bands = LinearBands::new(2);
        bands.set_cut_threshold(-0.5);
        assert_eq!(bands.cut_threshold(), 0.0);
        bands.set_cut_threshold(1.5);
        assert_eq!(bands.cut_threshold(), 1.0);
        bands.set_peak_decay(2.0);
        assert_eq!(bands.peak_decay(), 1.0);
        bands.set_max_decay(-1.0);
        assert_eq!(bands.max_decay(), 0.0);
    }

    #[test]
    fn resize_resets_decay_state() {
        let mut bands = LinearBands::new(4);
        bands.update(&[1.0, 2.0, 3.0, 4.0]);
        bands.resize(8);

        assert_eq!(bands.len(), 8);
        assert!(bands.running_max().iter().all(|v| *v == 0.0));
        assert!(bands.peak().iter().all(|v| *v == 0.0));
        assert_eq!(bands.peak_average(), 0.0);
    }

    #[test]
    fn resampling_picks_nearest_lower_index() {
        let source = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let mut out = [0.0; 3];
        resample_into(&source, &mut out);
        assert_eq!(out, [0.0, 3.0, 7.0]);

        let mut single = [9.0; 1];
        resample_into(&source, &mut single);
        assert_eq!(single, [0.0]);

        let mut wide = [0.0; 15];
        resample_into(&source[..2], &mut wide);
        assert_eq!(wide[0], 0.0);
        assert_eq!(wide[14], 1.0);
    }
}
