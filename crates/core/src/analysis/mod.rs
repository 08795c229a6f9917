use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    config::coerce_buffer_size,
    linear::resample_into,
    AnalyzerConfig, BeatDetection, IngestBuffer, LinearBands, LinearEq, LogBands, RealFftTransform,
    SampleSink, Transform, WindowKind,
};

/// Builds a transform for a given buffer size. Called again on every resize.
pub type TransformFactory = Box<dyn Fn(usize) -> Box<dyn Transform> + Send>;

/// Serializable copy of both axes after a tick, for renderers and exports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandSnapshot {
    pub tick: u64,
    pub linear: LinearSnapshot,
    pub log: LogSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearSnapshot {
    pub raw: Vec<f32>,
    pub norm: Vec<f32>,
    pub peak: Vec<f32>,
    pub cut: Vec<bool>,
    pub peak_average: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogSnapshot {
    pub norm: Vec<f32>,
    pub peak: Vec<f32>,
    pub cut: Vec<bool>,
    pub beats: Vec<bool>,
    pub peak_average: f32,
}

/// Owns the whole per-tick pipeline: ingest slot, window, transform, linear
/// bins and log bands.
///
/// Samples go in through [`SampleSink::push`]; each [`SpectrumAnalyzer::update`]
/// transforms whatever was pushed last and refreshes both axes.
pub struct SpectrumAnalyzer {
    buffer_size: usize,
    window_kind: WindowKind,
    window: Vec<f32>,
    ingest: IngestBuffer,
    factory: TransformFactory,
    transform: Box<dyn Transform>,
    magnitudes: Vec<f32>,
    phases: Vec<f32>,
    linear: LinearBands,
    log: LogBands,
    ticks: u64,
}

impl SpectrumAnalyzer {
    /// Creates an analyser backed by the `realfft` transform.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_transform_factory(
            config,
            Box::new(|size: usize| Box::new(RealFftTransform::new(size)) as Box<dyn Transform>),
        )
    }

    /// Creates an analyser with a custom transform primitive.
    pub fn with_transform_factory(config: AnalyzerConfig, factory: TransformFactory) -> Self {
        let config = config.sanitized();
        let buffer_size = config.buffer_size;
        let bins = buffer_size / 2;

        Self {
            buffer_size,
            window_kind: config.window,
            window: config.window.coefficients(buffer_size),
            ingest: IngestBuffer::new(buffer_size),
            transform: factory(buffer_size),
            factory,
            magnitudes: vec![0.0; bins],
            phases: vec![0.0; bins],
            linear: LinearBands::with_config(bins, &config),
            log: LogBands::new(bins, config.beat_detection),
            ticks: 0,
        }
    }

    /// Transforms the last pushed block and refreshes both axes. A failing
    /// transform skips the tick and leaves every output as it was.
    pub fn update(&mut self) {
        let outcome = self.transform.transform(
            self.ingest.samples(),
            &self.window,
            &mut self.magnitudes,
            &mut self.phases,
        );

        if let Err(err) = outcome {
            tracing::warn!(%err, "transform failed, skipping tick");
            return;
        }

        self.ticks += 1;
        self.linear.update(&self.magnitudes);
        self.log.update(&self.linear);
    }

    /// Runs one tick from magnitudes computed elsewhere, bypassing the
    /// transform. The slice should hold [`SpectrumAnalyzer::bin_size`] values.
    pub fn process_magnitudes(&mut self, magnitudes: &[f32]) {
        self.ticks += 1;
        self.linear.update(magnitudes);
        self.log.update(&self.linear);
    }

    /// Changes the buffer size, rounding up to the next power of two. Every
    /// array is reallocated and all decay state starts over; asking for the
    /// current size does nothing.
    pub fn set_buffer_size(&mut self, requested: usize) {
        let buffer_size = coerce_buffer_size(requested);
        if buffer_size == self.buffer_size {
            return;
        }

        tracing::debug!(
            from = self.buffer_size,
            to = buffer_size,
            "rebuilding transform for new buffer size"
        );

        let bins = buffer_size / 2;
        self.buffer_size = buffer_size;
        self.transform = (self.factory)(buffer_size);
        self.window = self.window_kind.coefficients(buffer_size);
        self.ingest.resize(buffer_size);
        self.magnitudes = vec![0.0; bins];
        self.phases = vec![0.0; bins];
        self.linear.resize(bins);
        self.log.resize(bins);
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Number of linear bins, half the buffer size.
    pub fn bin_size(&self) -> usize {
        self.buffer_size / 2
    }

    /// Number of completed ticks since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn set_threshold(&mut self, value: f32) {
        self.linear.set_cut_threshold(value);
    }

    pub fn threshold(&self) -> f32 {
        self.linear.cut_threshold()
    }

    pub fn set_peak_decay(&mut self, value: f32) {
        self.linear.set_peak_decay(value);
    }

    pub fn peak_decay(&self) -> f32 {
        self.linear.peak_decay()
    }

    pub fn set_max_decay(&mut self, value: f32) {
        self.linear.set_max_decay(value);
    }

    pub fn max_decay(&self) -> f32 {
        self.linear.max_decay()
    }

    pub fn set_mirror_data(&mut self, enabled: bool) {
        self.linear.set_mirror(enabled);
    }

    pub fn mirror_data(&self) -> bool {
        self.linear.mirror()
    }

    pub fn set_linear_eq(&mut self, intercept: f32, slope: f32) {
        self.linear.set_linear_eq(LinearEq { intercept, slope });
    }

    pub fn linear_eq(&self) -> LinearEq {
        self.linear.linear_eq()
    }

    pub fn set_beat_detection(&mut self, detection: BeatDetection) {
        self.log.set_detection(detection);
    }

    pub fn beat_detection(&self) -> BeatDetection {
        self.log.detection()
    }

    /// Swaps the analysis window. Takes effect on the next tick.
    pub fn set_window(&mut self, kind: WindowKind) {
        if kind != self.window_kind {
            self.window_kind = kind;
            self.window = kind.coefficients(self.buffer_size);
        }
    }

    pub fn window_kind(&self) -> WindowKind {
        self.window_kind
    }

    /// Current settings, suitable for persisting with serde.
    pub fn config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            buffer_size: self.buffer_size,
            max_decay: self.max_decay(),
            peak_decay: self.peak_decay(),
            threshold: self.threshold(),
            mirror: self.mirror_data(),
            beat_detection: self.beat_detection(),
            window: self.window_kind,
            linear_eq: self.linear_eq(),
        }
    }

    pub fn linear(&self) -> &LinearBands {
        &self.linear
    }

    pub fn log(&self) -> &LogBands {
        &self.log
    }

    pub fn samples(&self) -> &[f32] {
        self.ingest.samples()
    }

    pub fn window(&self) -> &[f32] {
        &self.window
    }

    /// Phase per bin from the last transform.
    pub fn phases(&self) -> &[f32] {
        &self.phases
    }

    pub fn fft_raw_data(&self) -> &[f32] {
        self.linear.raw()
    }

    pub fn fft_norm_data(&self) -> &[f32] {
        self.linear.norm()
    }

    pub fn fft_peak_data(&self) -> &[f32] {
        self.linear.peak()
    }

    pub fn glitch_data(&self) -> &[bool] {
        self.linear.cut()
    }

    pub fn average_peak(&self) -> f32 {
        self.linear.peak_average()
    }

    /// Samples the normalised bins down (or up) to `out.len()` entries.
    pub fn fft_norm_resampled(&self, out: &mut [f32]) {
        resample_into(self.linear.norm(), out);
    }

    pub fn fft_peak_resampled(&self, out: &mut [f32]) {
        resample_into(self.linear.peak(), out);
    }

    pub fn glitch_resampled(&self, out: &mut [bool]) {
        resample_into(self.linear.cut(), out);
    }

    pub fn snapshot(&self) -> BandSnapshot {
        BandSnapshot {
            tick: self.ticks,
            linear: LinearSnapshot {
                raw: self.linear.raw().to_vec(),
                norm: self.linear.norm().to_vec(),
                peak: self.linear.peak().to_vec(),
                cut: self.linear.cut().to_vec(),
                peak_average: self.linear.peak_average(),
            },
            log: LogSnapshot {
                norm: self.log.norm().to_vec(),
                peak: self.log.peak().to_vec(),
                cut: self.log.cut().to_vec(),
                beats: self.log.beats().to_vec(),
                peak_average: self.log.peak_average(),
            },
        }
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

impl SampleSink for SpectrumAnalyzer {
    fn push(&mut self, samples: &[f32]) {
        self.ingest.push(samples);
    }
}

impl fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("buffer_size", &self.buffer_size)
            .field("window", &self.window_kind)
            .field("bins", &self.linear.len())
            .field("bands", &self.log.band_count())
            .field("ticks", &self.ticks)
            .finish()
    }
}
