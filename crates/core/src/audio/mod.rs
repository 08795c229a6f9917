use std::sync::{Arc, Mutex, MutexGuard};

use crate::{Result, SpectralError};

/// Anything that accepts blocks of mono samples. Live inputs, file readers
/// and test generators all feed the analyser through this.
pub trait SampleSink {
    fn push(&mut self, samples: &[f32]);
}

/// Single-slot sample buffer. Each push overwrites the previous contents so
/// the next tick always sees the most recent block.
#[derive(Debug, Clone)]
pub struct IngestBuffer {
    samples: Vec<f32>,
}

impl IngestBuffer {
    pub fn new(size: usize) -> Self {
        Self {
            samples: vec![0.0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Reallocates to `size` zeroed samples.
    pub fn resize(&mut self, size: usize) {
        self.samples = vec![0.0; size];
    }
}

impl SampleSink for IngestBuffer {
    /// Copies up to `len()` samples. A short block leaves the tail zeroed and
    /// extra samples are ignored.
    fn push(&mut self, samples: &[f32]) {
        let count = samples.len().min(self.samples.len());
        self.samples[..count].copy_from_slice(&samples[..count]);
        self.samples[count..].fill(0.0);
    }
}

/// Thread-safe handle around an [`IngestBuffer`] for hosts that deliver audio
/// on a dedicated callback thread. `push` is the only operation that crosses
/// threads; the analysis tick copies the slot out under the same lock.
#[derive(Debug, Clone)]
pub struct SharedIngest {
    shared: Arc<Mutex<IngestBuffer>>,
}

impl SharedIngest {
    pub fn new(size: usize) -> Self {
        Self {
            shared: Arc::new(Mutex::new(IngestBuffer::new(size))),
        }
    }

    pub fn push_samples(&self, samples: &[f32]) -> Result<()> {
        let mut buffer = self.lock()?;
        buffer.push(samples);
        Ok(())
    }

    /// Copies the current slot into `out`.
    pub fn read_into(&self, out: &mut [f32]) -> Result<()> {
        let buffer = self.lock()?;
        let count = out.len().min(buffer.len());
        out[..count].copy_from_slice(&buffer.samples()[..count]);
        out[count..].fill(0.0);
        Ok(())
    }

    pub fn resize(&self, size: usize) -> Result<()> {
        self.lock()?.resize(size);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, IngestBuffer>> {
        self.shared
            .lock()
            .map_err(|_| SpectralError::msg("ingest buffer has been poisoned"))
    }
}

/// Pulls a single channel out of interleaved frames before handing the
/// result to a [`SampleSink`].
#[derive(Debug, Clone)]
pub struct ChannelSelector {
    channels: usize,
    channel: usize,
    scratch: Vec<f32>,
}

impl ChannelSelector {
    pub fn new(channels: usize, channel: usize) -> Result<Self> {
        if channels == 0 {
            return Err(SpectralError::InvalidInput(
                "channel count must be at least one",
            ));
        }
        if channel >= channels {
            return Err(SpectralError::msg(format!(
                "input channel {channel} is out of range for {channels} channels"
            )));
        }
        Ok(Self {
            channels,
            channel,
            scratch: Vec::new(),
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Extracts the selected channel of `interleaved`. Trailing partial frames
    /// are ignored.
    pub fn extract(&mut self, interleaved: &[f32]) -> &[f32] {
        self.scratch.clear();
        self.scratch.extend(
            interleaved
                .chunks_exact(self.channels)
                .map(|frame| frame[self.channel]),
        );
        &self.scratch
    }

    pub fn forward<S: SampleSink + ?Sized>(&mut self, interleaved: &[f32], sink: &mut S) {
        let samples = self.extract(interleaved);
        sink.push(samples);
    }
}
