use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::PcmFormat;
use super::state::StopReason;

/// Outcome of a capture session once its thread has been joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSummary {
    pub raw_path: PathBuf,
    pub bytes_written: u64,
    pub frames_written: u64,
    pub reason: StopReason,
}

/// Result returned when a recording has been published as a WAV file.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub data_size: u32,
    pub duration_secs: f64,
    pub checksum: String,
    pub metadata: RecordingMetadata,
}

/// Metadata stored alongside a recording.
///
/// Serializable for the JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub file_path: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
    pub duration_secs: f64,
    pub checksum: String,
}

impl RecordingMetadata {
    pub fn new(format: &PcmFormat, file_path: &str, data_size: u32, checksum: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            file_path: file_path.to_string(),
            sample_rate: format.sample_rate,
            channels: format.channels,
            bits_per_sample: format.bits_per_sample,
            data_size,
            duration_secs: format.duration_secs(data_size as u64),
            checksum: checksum.to_string(),
        }
    }

    pub fn format(&self) -> PcmFormat {
        PcmFormat::new(self.sample_rate, self.channels, self.bits_per_sample)
    }
}
