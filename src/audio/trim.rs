//! Energy-based leading/trailing silence trimming.
//!
//! [`SilenceTrimmer`] partitions channel 0 of a [`PcmBuffer`] into fixed
//! 10 ms windows, computes an RMS energy envelope, and removes the leading
//! and trailing regions whose windows never exceed the silence threshold.
//!
//! Two guard clauses keep the trim conservative:
//!
//! * an edge is only trimmed when the detected silence there is at least
//!   `min_silence_secs` long — naturally quiet speech onsets survive;
//! * an empty or inverted result aborts the trim and the original buffer is
//!   returned unchanged.
//!
//! The 10 ms window trades detection granularity against noise sensitivity.

use crate::audio::pcm::PcmBuffer;
use crate::config::TrimConfig;

// ---------------------------------------------------------------------------
// Energy envelope
// ---------------------------------------------------------------------------

/// Per-window RMS energy of `samples`.
///
/// The final window may be shorter than `window`; its RMS is computed over
/// the samples it actually contains.
pub fn energy_envelope(samples: &[f32], window: usize) -> Vec<f32> {
    assert!(window > 0, "window must be > 0");
    samples
        .chunks(window)
        .map(|w| (w.iter().map(|s| s * s).sum::<f32>() / w.len() as f32).sqrt())
        .collect()
}

// ---------------------------------------------------------------------------
// TrimBounds
// ---------------------------------------------------------------------------

/// Half-open sample range `[start_sample, end_sample)` to keep.
///
/// Invariant: `0 ≤ start_sample ≤ end_sample ≤ total_samples`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimBounds {
    pub start_sample: usize,
    pub end_sample: usize,
}

// ---------------------------------------------------------------------------
// SilenceTrimmer
// ---------------------------------------------------------------------------

/// Removes leading and trailing low-energy regions from a decoded buffer.
///
/// # Example
///
/// ```
/// use talkplay_audio::audio::{PcmBuffer, SilenceTrimmer};
///
/// let rate = 16_000;
/// // 1 s silence, 0.5 s tone, 1 s silence
/// let mut samples = vec![0.0_f32; rate];
/// samples.extend(vec![0.5_f32; rate / 2]);
/// samples.extend(vec![0.0_f32; rate]);
///
/// let buf = PcmBuffer { sample_rate: rate as u32, channels: vec![samples] };
/// let trimmed = SilenceTrimmer::default().trim(&buf);
/// assert_eq!(trimmed.len(), rate / 2);
/// ```
#[derive(Debug, Clone)]
pub struct SilenceTrimmer {
    silence_threshold: f32,
    min_silence_secs: f32,
    window_secs: f32,
}

impl SilenceTrimmer {
    pub fn new(config: &TrimConfig) -> Self {
        Self {
            silence_threshold: config.silence_threshold,
            min_silence_secs: config.min_silence_secs,
            window_secs: config.window_secs,
        }
    }

    /// Compute the keep-range for `buf` without copying any samples.
    ///
    /// Analysis uses channel 0 only, regardless of channel count.
    pub fn bounds(&self, buf: &PcmBuffer) -> TrimBounds {
        let total = buf.len();
        if total == 0 || buf.channel_count() == 0 {
            return TrimBounds {
                start_sample: 0,
                end_sample: total,
            };
        }

        let window = ((buf.sample_rate as f32 * self.window_secs) as usize).max(1);
        let envelope = energy_envelope(&buf.channels[0], window);

        let mut start = 0;
        if let Some(i) = envelope.iter().position(|&rms| rms > self.silence_threshold) {
            start = i * window;
        }

        let mut end = total;
        if let Some(i) = envelope
            .iter()
            .rposition(|&rms| rms > self.silence_threshold)
        {
            end = total.min((i + 1) * window);
        }

        // Edge guards: silence shorter than the minimum is not worth
        // trimming and may clip a quiet onset.
        let min_silence = (self.min_silence_secs * buf.sample_rate as f32) as usize;
        if start < min_silence {
            start = 0;
        }
        if end > total.saturating_sub(min_silence) {
            end = total;
        }

        TrimBounds {
            start_sample: start,
            end_sample: end,
        }
    }

    /// Produce a new buffer containing only `[start, end)` on every channel.
    ///
    /// Returns the original buffer unchanged when the trim decision is a
    /// no-op or would produce an empty/inverted region.  The sample rate is
    /// never altered.
    pub fn trim(&self, buf: &PcmBuffer) -> PcmBuffer {
        let bounds = self.bounds(buf);
        let total = buf.len();

        if bounds.end_sample <= bounds.start_sample {
            log::debug!("trim: empty or inverted region, keeping original");
            return buf.clone();
        }
        if bounds.start_sample == 0 && bounds.end_sample == total {
            return buf.clone();
        }

        log::debug!(
            "trim: keeping samples {}..{} of {}",
            bounds.start_sample,
            bounds.end_sample,
            total
        );

        PcmBuffer {
            sample_rate: buf.sample_rate,
            channels: buf
                .channels
                .iter()
                .map(|ch| ch[bounds.start_sample..bounds.end_sample].to_vec())
                .collect(),
        }
    }
}

impl Default for SilenceTrimmer {
    fn default() -> Self {
        Self::new(&TrimConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 16_000;

    fn mono(samples: Vec<f32>) -> PcmBuffer {
        PcmBuffer {
            sample_rate: RATE,
            channels: vec![samples],
        }
    }

    /// silence(pre) + speech + silence(post), durations in seconds.
    fn signal(pre: f32, speech: f32, post: f32) -> PcmBuffer {
        let sec = RATE as f32;
        let mut v = vec![0.0_f32; (pre * sec) as usize];
        v.extend(vec![0.5_f32; (speech * sec) as usize]);
        v.extend(vec![0.0_f32; (post * sec) as usize]);
        mono(v)
    }

    #[test]
    fn envelope_has_one_value_per_window() {
        let env = energy_envelope(&vec![0.5_f32; 480], 160);
        assert_eq!(env.len(), 3);
        assert!(env.iter().all(|&rms| (rms - 0.5).abs() < 1e-6));
    }

    #[test]
    fn envelope_handles_partial_final_window() {
        let env = energy_envelope(&vec![0.5_f32; 200], 160);
        assert_eq!(env.len(), 2);
        assert!((env[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn all_silence_returns_original_unchanged() {
        let buf = signal(2.0, 0.0, 0.0);
        let trimmed = SilenceTrimmer::default().trim(&buf);
        assert_eq!(trimmed, buf);
    }

    #[test]
    fn long_silence_is_trimmed_on_both_edges() {
        let buf = signal(1.0, 0.5, 1.0);
        let trimmed = SilenceTrimmer::default().trim(&buf);
        assert_eq!(trimmed.len(), RATE as usize / 2);
        assert_eq!(trimmed.sample_rate, RATE);
    }

    /// 2 s buffer, silence [0, 0.3] and [1.2, 2.0], speech in between.
    /// The 0.3 s leading silence is under the 0.5 s guard → start stays 0;
    /// the 0.8 s trailing silence is over the guard → it is removed.
    #[test]
    fn short_leading_silence_is_kept_long_trailing_is_cut() {
        let buf = signal(0.3, 0.9, 0.8);
        let trimmer = SilenceTrimmer::default();

        let bounds = trimmer.bounds(&buf);
        assert_eq!(bounds.start_sample, 0);
        assert_eq!(bounds.end_sample, (1.2 * RATE as f32) as usize);

        let trimmed = trimmer.trim(&buf);
        assert_eq!(trimmed.len(), (1.2 * RATE as f32) as usize);
    }

    /// Trailing silence under the 0.5 s guard is preserved, symmetric to the
    /// leading edge.
    #[test]
    fn short_trailing_silence_is_kept() {
        let buf = signal(1.0, 0.8, 0.2);
        let trimmer = SilenceTrimmer::default();

        let bounds = trimmer.bounds(&buf);
        assert_eq!(bounds.start_sample, RATE as usize);
        assert_eq!(bounds.end_sample, buf.len());
    }

    #[test]
    fn empty_buffer_returns_unchanged() {
        let buf = mono(Vec::new());
        let trimmed = SilenceTrimmer::default().trim(&buf);
        assert!(trimmed.is_empty());
    }

    #[test]
    fn analysis_uses_channel_zero_but_trims_all_channels() {
        let sec = RATE as usize;
        // Channel 0 carries the speech; channel 1 is pure noise floor.
        let mut ch0 = vec![0.0_f32; sec];
        ch0.extend(vec![0.5_f32; sec / 2]);
        ch0.extend(vec![0.0_f32; sec]);
        let ch1 = vec![0.001_f32; ch0.len()];

        let buf = PcmBuffer {
            sample_rate: RATE,
            channels: vec![ch0, ch1],
        };

        let trimmed = SilenceTrimmer::default().trim(&buf);
        assert_eq!(trimmed.channel_count(), 2);
        assert_eq!(trimmed.channels[0].len(), sec / 2);
        assert_eq!(trimmed.channels[1].len(), sec / 2);
    }

    #[test]
    fn bounds_invariant_holds() {
        for buf in [
            signal(0.0, 2.0, 0.0),
            signal(1.0, 0.1, 1.0),
            signal(0.6, 0.0, 0.6),
            mono(Vec::new()),
        ] {
            let b = SilenceTrimmer::default().bounds(&buf);
            assert!(b.start_sample <= b.end_sample);
            assert!(b.end_sample <= buf.len());
        }
    }

    #[test]
    fn threshold_boundary_is_exclusive() {
        // Exactly at the threshold counts as silence (`>` comparison).
        let buf = mono(vec![0.01_f32; RATE as usize * 2]);
        let trimmed = SilenceTrimmer::default().trim(&buf);
        assert_eq!(trimmed.len(), buf.len());
    }
}
