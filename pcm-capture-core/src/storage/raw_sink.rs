use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;

const SINK_BUFFER_BYTES: usize = 64 * 1024;

/// Append-only writer for the raw PCM stream of one session.
///
/// Opening truncates any stale stream at the same path. Bytes land in the
/// file in exactly the order they are written; `close` flushes and syncs
/// before the handle is dropped.
pub struct RawPcmSink {
    file_path: PathBuf,
    writer: Option<BufWriter<File>>,
    total_bytes_written: u64,
}

impl RawPcmSink {
    pub fn create(file_path: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let file_path = file_path.into();

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| CaptureError::io("failed to create directory", e))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&file_path)
            .map_err(|e| CaptureError::io("failed to create raw stream", e))?;

        Ok(Self {
            file_path,
            writer: Some(BufWriter::with_capacity(SINK_BUFFER_BYTES, file)),
            total_bytes_written: 0,
        })
    }

    /// Append `data` to the stream.
    pub fn write(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CaptureError::InvalidState("raw stream is closed".into()))?;
        writer
            .write_all(data)
            .map_err(|e| CaptureError::io("raw stream write failed", e))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }

    /// Flush buffered bytes, sync to disk and close the file.
    ///
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> Result<u64, CaptureError> {
        let Some(writer) = self.writer.take() else {
            return Ok(self.total_bytes_written);
        };
        let file = writer
            .into_inner()
            .map_err(|e| CaptureError::io("raw stream flush failed", e.into_error()))?;
        file.sync_all()
            .map_err(|e| CaptureError::io("raw stream sync failed", e))?;
        Ok(self.total_bytes_written)
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Total bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

impl Drop for RawPcmSink {
    fn drop(&mut self) {
        if self.writer.is_some() {
            if let Err(e) = self.close() {
                log::error!("Failed to close raw stream {}: {}", self.file_path.display(), e);
            }
        }
    }
}
