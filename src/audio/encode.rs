//! 16-bit PCM WAV encoding and the single-slot artifact store.
//!
//! [`encode_wav_pcm16`] serialises a [`PcmBuffer`] into a byte-exact
//! RIFF/WAVE container: format code 1 (linear PCM), 16 bits per sample,
//! little-endian, channels interleaved per frame, `fmt ` subchunk of 16
//! bytes and a declared data size of `samples × channels × 2`.  Any
//! container-compliant player can consume the result.
//!
//! [`ArtifactSlot`] holds the most recent [`AudioArtifact`] for a session.
//! Publishing a new artifact supersedes the previous one and releases its
//! handle — repeated recordings never leak handles.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::pcm::PcmBuffer;

// ---------------------------------------------------------------------------
// encode_wav_pcm16
// ---------------------------------------------------------------------------

/// Serialise `buf` as a 16-bit PCM WAV container.
///
/// Each floating-point sample is clamped to `[-1.0, 1.0]` and scaled to a
/// signed 16-bit integer (`round(sample × 32767)`).
pub fn encode_wav_pcm16(buf: &PcmBuffer) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec {
        channels: buf.channel_count() as u16,
        sample_rate: buf.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut bytes = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec)?;
        for frame in 0..buf.len() {
            for channel in &buf.channels {
                let sample = channel[frame].clamp(-1.0, 1.0);
                writer.write_sample((sample * 32767.0).round() as i16)?;
            }
        }
        writer.finalize()?;
    }

    Ok(bytes)
}

// ---------------------------------------------------------------------------
// ArtifactHandle / AudioArtifact
// ---------------------------------------------------------------------------

/// Dereferenceable handle to a published artifact.
///
/// Handles are unique per slot publication; a superseded handle no longer
/// resolves through the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactHandle {
    id: u64,
}

impl ArtifactHandle {
    /// URL-like identifier for the presentation layer.
    pub fn uri(&self) -> String {
        format!("artifact://recording/{}", self.id)
    }
}

/// The final encoded, playable audio object produced from one recording.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    /// Encoded container bytes, shared cheaply with the playback side.
    pub bytes: Arc<[u8]>,
    /// Handle issued at publication time.
    pub handle: ArtifactHandle,
}

// ---------------------------------------------------------------------------
// ArtifactSlot
// ---------------------------------------------------------------------------

/// Single-slot store for the session's current artifact.
///
/// Clone-able; the recording pipeline publishes into it and the playback
/// controller polls it.  Publishing releases the previous artifact.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSlot {
    inner: Arc<Mutex<SlotState>>,
}

#[derive(Debug, Default)]
struct SlotState {
    current: Option<AudioArtifact>,
    next_id: u64,
}

impl ArtifactSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish new container bytes, superseding any previous artifact.
    pub fn publish(&self, bytes: Vec<u8>) -> ArtifactHandle {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let handle = ArtifactHandle { id: state.next_id };
        state.next_id += 1;

        if let Some(old) = state.current.take() {
            log::debug!("artifact: releasing superseded {}", old.handle.uri());
        }
        state.current = Some(AudioArtifact {
            bytes: bytes.into(),
            handle,
        });
        handle
    }

    /// The current artifact, if one has been published.
    pub fn current(&self) -> Option<AudioArtifact> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .current
            .clone()
    }

    /// `true` once an artifact is available.
    pub fn has_artifact(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .current
            .is_some()
    }

    /// Drop the current artifact, releasing its handle.
    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .current = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::decode_wav;

    fn mono(samples: Vec<f32>, sample_rate: u32) -> PcmBuffer {
        PcmBuffer {
            sample_rate,
            channels: vec![samples],
        }
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
    }

    /// Field-by-field check of the 44-byte canonical header.
    #[test]
    fn header_layout_is_byte_exact() {
        let buf = mono(vec![0.0_f32; 100], 16_000);
        let bytes = encode_wav_pcm16(&buf).unwrap();
        let data_bytes: u32 = 100 * 1 * 2;

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32_at(&bytes, 4), 36 + data_bytes); // total size
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u32_at(&bytes, 16), 16); // fmt subchunk size
        assert_eq!(u16_at(&bytes, 20), 1); // linear PCM
        assert_eq!(u16_at(&bytes, 22), 1); // channels
        assert_eq!(u32_at(&bytes, 24), 16_000); // sample rate
        assert_eq!(u32_at(&bytes, 28), 16_000 * 1 * 2); // byte rate
        assert_eq!(u16_at(&bytes, 32), 1 * 2); // block align
        assert_eq!(u16_at(&bytes, 34), 16); // bits per sample
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_at(&bytes, 40), data_bytes);
        assert_eq!(bytes.len() as u32, 44 + data_bytes);
    }

    #[test]
    fn declared_data_size_matches_samples_times_channels() {
        let buf = PcmBuffer {
            sample_rate: 44_100,
            channels: vec![vec![0.1_f32; 333], vec![-0.1_f32; 333]],
        };
        let bytes = encode_wav_pcm16(&buf).unwrap();
        assert_eq!(u32_at(&bytes, 40), 333 * 2 * 2);
    }

    #[test]
    fn samples_are_clamped_before_scaling() {
        let buf = mono(vec![2.0, -2.0, 1.0, -1.0], 8_000);
        let bytes = encode_wav_pcm16(&buf).unwrap();

        let data = &bytes[44..];
        let s0 = i16::from_le_bytes([data[0], data[1]]);
        let s1 = i16::from_le_bytes([data[2], data[3]]);
        assert_eq!(s0, 32_767);
        assert_eq!(s1, -32_767);
    }

    #[test]
    fn interleaving_is_frame_major() {
        let buf = PcmBuffer {
            sample_rate: 8_000,
            channels: vec![vec![0.5, 0.5], vec![-0.5, -0.5]],
        };
        let bytes = encode_wav_pcm16(&buf).unwrap();
        let data = &bytes[44..];

        // L R L R
        let l0 = i16::from_le_bytes([data[0], data[1]]);
        let r0 = i16::from_le_bytes([data[2], data[3]]);
        assert!(l0 > 0);
        assert!(r0 < 0);
    }

    /// Decoding an encoded container recovers values within the 16-bit
    /// quantization error bound.
    #[test]
    fn round_trip_within_quantization_error() {
        let original = vec![0.0_f32, 0.25, -0.25, 0.9, -0.9, 1.0, -1.0, 0.123];
        let buf = mono(original.clone(), 16_000);

        let bytes = encode_wav_pcm16(&buf).unwrap();
        let decoded = decode_wav(&bytes).unwrap();

        assert_eq!(decoded.len(), original.len());
        for (a, b) in original.iter().zip(&decoded.channels[0]) {
            assert!(
                (a - b).abs() <= 1.0 / 32767.0,
                "sample {a} decoded as {b}"
            );
        }
    }

    // --- ArtifactSlot ---

    #[test]
    fn slot_starts_empty() {
        let slot = ArtifactSlot::new();
        assert!(!slot.has_artifact());
        assert!(slot.current().is_none());
    }

    #[test]
    fn publish_supersedes_previous_handle() {
        let slot = ArtifactSlot::new();
        let first = slot.publish(vec![1, 2, 3]);
        let second = slot.publish(vec![4, 5, 6]);

        assert_ne!(first, second);
        let current = slot.current().unwrap();
        assert_eq!(current.handle, second);
        assert_eq!(&current.bytes[..], &[4, 5, 6]);
    }

    #[test]
    fn handle_uri_is_stable_per_publication() {
        let slot = ArtifactSlot::new();
        let handle = slot.publish(vec![0]);
        assert_eq!(handle.uri(), "artifact://recording/0");
        let handle = slot.publish(vec![0]);
        assert_eq!(handle.uri(), "artifact://recording/1");
    }

    #[test]
    fn clear_releases_artifact() {
        let slot = ArtifactSlot::new();
        slot.publish(vec![9]);
        slot.clear();
        assert!(!slot.has_artifact());
    }
}
