use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Bit depths accepted for linear PCM capture.
pub const SUPPORTED_BIT_DEPTHS: [u16; 4] = [8, 16, 24, 32];

/// Linear PCM stream parameters shared by the capture source and the WAV header.
///
/// Samples are interleaved and little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl PcmFormat {
    pub const fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// 48 kHz, mono, 16-bit.
    pub const fn mono_48k() -> Self {
        Self::new(48000, 1, 16)
    }

    /// 48 kHz, stereo, 16-bit.
    pub const fn stereo_48k() -> Self {
        Self::new(48000, 2, 16)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.sample_rate == 0 {
            return Err(CaptureError::InvalidParameters(
                "sample rate must be positive".into(),
            ));
        }
        if self.channels == 0 {
            return Err(CaptureError::InvalidParameters(
                "channel count must be positive".into(),
            ));
        }
        if !SUPPORTED_BIT_DEPTHS.contains(&self.bits_per_sample) {
            return Err(CaptureError::InvalidParameters(format!(
                "unsupported bits per sample: {}",
                self.bits_per_sample
            )));
        }
        if self.channels as u32 * self.bytes_per_sample() as u32 > u16::MAX as u32 {
            return Err(CaptureError::InvalidParameters(format!(
                "block align overflows 16 bits: {} ch x {} bit",
                self.channels, self.bits_per_sample
            )));
        }
        if self.byte_rate_u64() > u32::MAX as u64 {
            return Err(CaptureError::InvalidParameters(format!(
                "byte rate overflows 32 bits: {} Hz x {} ch x {} bit",
                self.sample_rate, self.channels, self.bits_per_sample
            )));
        }
        Ok(())
    }

    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Bytes per interleaved frame: `channels * bits_per_sample / 8`.
    ///
    /// Saturates for formats that [`validate`](Self::validate) rejects.
    pub fn block_align(&self) -> u16 {
        self.channels.saturating_mul(self.bytes_per_sample())
    }

    /// Bytes per second: `sample_rate * channels * bits_per_sample / 8`.
    pub fn byte_rate(&self) -> u32 {
        self.byte_rate_u64() as u32
    }

    fn byte_rate_u64(&self) -> u64 {
        self.sample_rate as u64 * self.channels as u64 * self.bytes_per_sample() as u64
    }

    /// Playback duration of `byte_count` bytes of this format.
    pub fn duration_secs(&self, byte_count: u64) -> f64 {
        let rate = self.byte_rate_u64();
        if rate == 0 {
            return 0.0;
        }
        byte_count as f64 / rate as f64
    }

    /// Byte count covering `secs` of audio, rounded down to whole blocks.
    pub fn bytes_for_duration(&self, secs: f64) -> u64 {
        let raw = (secs.max(0.0) * self.byte_rate_u64() as f64) as u64;
        self.align_down(raw)
    }

    /// Round `byte_count` down to a multiple of `block_align`.
    pub fn align_down(&self, byte_count: u64) -> u64 {
        let block = self.block_align() as u64;
        if block == 0 {
            return byte_count;
        }
        byte_count - byte_count % block
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::stereo_48k()
    }
}

/// A platform capability gated by the host's permission system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    RecordAudio,
}

/// Outcome of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// An input device that backs a capture provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}
