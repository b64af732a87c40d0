use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::{CaptureState, StopReason};
use crate::session::capture_session::CaptureSession;
use crate::session::stop_token::StopToken;
use crate::storage::container_writer;
use crate::storage::metadata::write_metadata;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::permission::PermissionProvider;

/// Records one take to a WAV file.
///
/// ```text
/// start → [CaptureSession] → {raw .pcm} ── stop ──→ finalize → {out .wav}
/// ```
///
/// The WAV is only produced for a session that stopped on request or at its
/// limit. A session that failed mid-capture keeps its raw stream on disk and
/// reports the failure from [`stop`](Self::stop).
pub struct WavRecorder<P: CaptureProvider + 'static> {
    session: CaptureSession<P>,
    out_path: PathBuf,
    raw_path: PathBuf,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    result: Option<RecordingResult>,
}

impl<P: CaptureProvider + 'static> WavRecorder<P> {
    /// Raw samples are spooled next to `out_path` with a `.pcm` extension.
    pub fn new(
        provider: P,
        permissions: Arc<dyn PermissionProvider>,
        config: CaptureConfiguration,
        out_path: impl Into<PathBuf>,
    ) -> Self {
        let out_path = out_path.into();
        let raw_path = default_raw_path(&out_path);
        Self {
            session: CaptureSession::new(provider, permissions, config),
            out_path,
            raw_path,
            delegate: None,
            result: None,
        }
    }

    pub fn with_raw_path(mut self, raw_path: impl Into<PathBuf>) -> Self {
        self.raw_path = raw_path.into();
        self
    }

    pub fn with_stop_token(mut self, stop_token: StopToken) -> Self {
        self.session = self.session.with_stop_token(stop_token);
        self
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.session.set_delegate(Arc::clone(&delegate));
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> CaptureState {
        self.session.state()
    }

    pub fn bytes_captured(&self) -> u64 {
        self.session.bytes_captured()
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.raw_path == self.out_path {
            return Err(CaptureError::InvalidParameters(format!(
                "raw stream and output share a path: {}",
                self.out_path.display()
            )));
        }
        self.session.start(&self.raw_path)
    }

    /// Stop capturing, then wrap the raw stream in a WAV container.
    ///
    /// Calling stop again after a successful finalize returns the same result.
    pub fn stop(&mut self) -> Result<RecordingResult, CaptureError> {
        if let Some(result) = &self.result {
            return Ok(result.clone());
        }

        let summary = self.session.stop()?;
        if let StopReason::Failed(e) = &summary.reason {
            log::warn!(
                "Capture failed after {} bytes; raw stream kept at {}",
                summary.bytes_written,
                summary.raw_path.display()
            );
            return Err(e.clone());
        }

        let config = self.session.config().clone();
        let format = config.format;
        let wav = container_writer::finalize(&summary.raw_path, &self.out_path, &format)?;

        let metadata = RecordingMetadata::new(&format, &wav.path.to_string_lossy(), wav.data_size, &wav.checksum);
        if config.write_metadata {
            write_metadata(&metadata, &wav.path)?;
        }

        if !config.keep_raw_file {
            if let Err(e) = fs::remove_file(&summary.raw_path) {
                log::warn!("Failed to remove raw stream {}: {}", summary.raw_path.display(), e);
            }
        }

        let result = RecordingResult {
            file_path: wav.path,
            data_size: wav.data_size,
            duration_secs: format.duration_secs(wav.data_size as u64),
            checksum: wav.checksum,
            metadata,
        };

        if let Some(ref delegate) = self.delegate {
            delegate.on_recording_finished(&result);
        }

        self.result = Some(result.clone());
        Ok(result)
    }
}

/// `take.wav` spools to `take.pcm`; an output already named `.pcm` spools to `.pcm.raw`.
pub fn default_raw_path(out_path: &Path) -> PathBuf {
    let raw_path = out_path.with_extension("pcm");
    if raw_path == out_path {
        out_path.with_extension("pcm.raw")
    } else {
        raw_path
    }
}
