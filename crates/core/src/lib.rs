//! Core library for the spectral bands analyser.
//!
//! Audio is pushed into a single-slot ingest buffer, windowed and transformed
//! once per tick, then tracked per bin on a linear axis (running maximum,
//! decaying peak, threshold gate) and folded into doubling-width bands on a
//! logarithmic axis where beats are detected from the gate transitions.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod linear;
pub mod logarithmic;
pub mod transform;

pub use analysis::{BandSnapshot, LinearSnapshot, LogSnapshot, SpectrumAnalyzer, TransformFactory};
pub use audio::{ChannelSelector, IngestBuffer, SampleSink, SharedIngest};
pub use config::{AnalyzerConfig, AppConfig, AudioConfig, LinearEq};
pub use error::{Result, SpectralError};
pub use linear::LinearBands;
pub use logarithmic::{octave_ranges, BeatDetection, LogBands};
pub use transform::{RealFftTransform, Transform, WindowKind};
