use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::audio_models::PcmFormat;
use super::error::CaptureError;

/// Frame length used when neither the configuration nor the provider picks one.
pub const DEFAULT_FRAME_MILLIS: u64 = 20;

/// Configuration for a capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfiguration {
    /// Capture and container format (default: 48 kHz, stereo, 16-bit).
    pub format: PcmFormat,

    /// Bytes requested per source read. None defers to the provider, then to 20 ms of audio.
    pub frame_bytes: Option<usize>,

    /// Sleep after a read that returned no bytes (default: 10 ms).
    #[serde(with = "millis")]
    pub empty_read_backoff: Duration,

    /// Maximum recording duration in seconds (None = unlimited).
    pub max_duration_secs: Option<f64>,

    /// Keep the raw PCM stream after the WAV has been published.
    pub keep_raw_file: bool,

    /// Write `{recording}.metadata.json` next to the WAV.
    pub write_metadata: bool,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), CaptureError> {
        self.format.validate()?;
        if self.frame_bytes == Some(0) {
            return Err(CaptureError::InvalidParameters(
                "frame size must be positive".into(),
            ));
        }
        if let Some(max) = self.max_duration_secs {
            if !(max > 0.0) {
                return Err(CaptureError::InvalidParameters(format!(
                    "max duration must be positive: {}",
                    max
                )));
            }
        }
        Ok(())
    }

    /// Resolve the per-read frame size.
    ///
    /// Always a whole number of blocks, and never smaller than one block.
    pub fn resolve_frame_bytes(&self, provider_preferred: Option<usize>) -> usize {
        let block = self.format.block_align().max(1) as usize;
        let requested = self
            .frame_bytes
            .or(provider_preferred)
            .filter(|&n| n > 0)
            .unwrap_or_else(|| {
                self.format.bytes_for_duration(DEFAULT_FRAME_MILLIS as f64 / 1000.0) as usize
            });
        (requested - requested % block).max(block)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            format: PcmFormat::default(),
            frame_bytes: None,
            empty_read_backoff: Duration::from_millis(10),
            max_duration_secs: None,
            keep_raw_file: false,
            write_metadata: false,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
