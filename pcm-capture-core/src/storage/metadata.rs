use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;

/// Path of the JSON sidecar for a recording: `{recording}.metadata.json`.
pub fn metadata_path_for(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<PathBuf, CaptureError> {
    let metadata_path = metadata_path_for(recording_path);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::IoFailure(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&metadata_path, json).map_err(|e| CaptureError::io("failed to write metadata", e))?;
    Ok(metadata_path)
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let metadata_path = metadata_path_for(recording_path);
    let json = fs::read_to_string(&metadata_path).map_err(|e| CaptureError::io("failed to read metadata", e))?;
    let metadata: RecordingMetadata = serde_json::from_str(&json)
        .map_err(|e| CaptureError::IoFailure(format!("failed to parse metadata: {}", e)))?;
    Ok(metadata)
}
