//! Decoded PCM audio and WAV container parsing.
//!
//! [`PcmBuffer`] is the in-memory representation the trimmer and encoder
//! work on: one ordered `f32` sample sequence per channel, values in
//! `[-1.0, 1.0]`.  Buffers are immutable after creation — trimming produces
//! a new buffer rather than mutating the original.

use std::io::Cursor;

use hound::{SampleFormat, WavReader};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DecodeError
// ---------------------------------------------------------------------------

/// The assembled blob could not be parsed back into PCM samples.
///
/// Recoverable: the pipeline falls back to the untrimmed blob and surfaces a
/// transient notification.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("could not parse audio container: {0}")]
    Container(#[from] hound::Error),

    #[error("audio container declares zero channels")]
    NoChannels,

    #[error("unsupported sample layout: {0}-bit {1:?}")]
    UnsupportedFormat(u16, SampleFormat),
}

// ---------------------------------------------------------------------------
// PcmBuffer
// ---------------------------------------------------------------------------

/// Decoded samples: channel count, sample rate, and one ordered sequence of
/// floating-point samples per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// De-interleaved samples, one `Vec<f32>` per channel.  All channels
    /// have the same length.
    pub channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// `true` when the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f32 / self.sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// decode_wav
// ---------------------------------------------------------------------------

/// Parse a WAV container into a [`PcmBuffer`].
///
/// Handles 32-bit float data (the assembled-recording format) as well as
/// integer PCM up to 32 bits (the encoder's 16-bit output, third-party
/// files).  Integer samples are scaled by the format's positive full-scale
/// value, so a container produced by
/// [`encode_wav_pcm16`](crate::audio::encode::encode_wav_pcm16) round-trips
/// within the 16-bit quantization error bound.
pub fn decode_wav(bytes: &[u8]) -> Result<PcmBuffer, DecodeError> {
    let mut reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();

    if spec.channels == 0 {
        return Err(DecodeError::NoChannels);
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()?,
        (SampleFormat::Int, bits) if bits <= 32 => {
            let full_scale = ((1i64 << (bits - 1)) - 1) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<Result<Vec<_>, _>>()?
        }
        (format, bits) => return Err(DecodeError::UnsupportedFormat(bits, format)),
    };

    let channel_count = spec.channels as usize;
    let frames = interleaved.len() / channel_count;
    let mut channels = vec![Vec::with_capacity(frames); channel_count];
    for (i, sample) in interleaved.into_iter().enumerate() {
        channels[i % channel_count].push(sample);
    }

    Ok(PcmBuffer {
        sample_rate: spec.sample_rate,
        channels,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
