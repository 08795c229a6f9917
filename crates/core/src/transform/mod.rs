use std::{f32::consts::TAU, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{Result, SpectralError};

/// Analysis window applied to the sample buffer before the transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Rectangular,
    Hann,
    Hamming,
    #[default]
    BlackmanHarris,
}

impl WindowKind {
    /// Periodic window coefficients of the requested length.
    pub fn coefficients(self, len: usize) -> Vec<f32> {
        let phase = |n: usize| TAU * n as f32 / len as f32;
        match self {
            WindowKind::Rectangular => vec![1.0; len],
            WindowKind::Hann => (0..len).map(|n| 0.5 - 0.5 * phase(n).cos()).collect(),
            WindowKind::Hamming => (0..len).map(|n| 0.54 - 0.46 * phase(n).cos()).collect(),
            WindowKind::BlackmanHarris => {
                const A0: f32 = 0.358_75;
                const A1: f32 = 0.488_29;
                const A2: f32 = 0.141_28;
                const A3: f32 = 0.011_68;
                (0..len)
                    .map(|n| {
                        let x = phase(n);
                        A0 - A1 * x.cos() + A2 * (2.0 * x).cos() - A3 * (3.0 * x).cos()
                    })
                    .collect()
            }
        }
    }
}

/// Forward transform primitive: windowed samples in, per-bin magnitude and
/// phase out. `magnitudes` and `phases` both hold `size() / 2` bins.
pub trait Transform: Send {
    /// Number of time-domain samples consumed per call.
    fn size(&self) -> usize;

    fn transform(
        &mut self,
        buffer: &[f32],
        window: &[f32],
        magnitudes: &mut [f32],
        phases: &mut [f32],
    ) -> Result<()>;
}

/// [`Transform`] backed by `realfft`.
///
/// Magnitudes are reported as `2 * |X[k]|` without length normalisation, the
/// scale the 0.1 noise floor of the band tracker was tuned against.
pub struct RealFftTransform {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl RealFftTransform {
    pub fn new(size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);
        let input = plan.make_input_vec();
        let spectrum = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();
        Self {
            size,
            plan,
            input,
            spectrum,
            scratch,
        }
    }
}

impl Transform for RealFftTransform {
    fn size(&self) -> usize {
        self.size
    }

    fn transform(
        &mut self,
        buffer: &[f32],
        window: &[f32],
        magnitudes: &mut [f32],
        phases: &mut [f32],
    ) -> Result<()> {
        let bins = self.size / 2;
        if buffer.len() != self.size || window.len() != self.size {
            return Err(SpectralError::InvalidInput(
                "transform input and window must match the transform size",
            ));
        }
        if magnitudes.len() != bins || phases.len() != bins {
            return Err(SpectralError::InvalidInput(
                "transform outputs must hold half the transform size",
            ));
        }

        for ((slot, sample), weight) in self.input.iter_mut().zip(buffer).zip(window) {
            *slot = sample * weight;
        }

        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)?;

        for (i, bin) in self.spectrum.iter().take(bins).enumerate() {
            magnitudes[i] = 2.0 * bin.norm();
            phases[i] = bin.im.atan2(bin.re);
        }

        Ok(())
    }
}

impl fmt::Debug for RealFftTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealFftTransform")
            .field("size", &self.size)
            .finish()
    }
}
