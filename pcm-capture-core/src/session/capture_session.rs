use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioDevice, Capability, PermissionStatus};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::CaptureSummary;
use crate::models::state::{CaptureState, StopReason};
use crate::processing::wav_format::MAX_DATA_SIZE;
use crate::session::capture_loop::{run_capture_loop, LoopParams};
use crate::session::stop_token::StopToken;
use crate::storage::raw_sink::RawPcmSink;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::permission::PermissionProvider;

/// A provider between `acquire` and `release`.
///
/// Dropping it releases the device, so the source is released exactly once
/// whether the capture thread finishes, fails, or never spawns.
struct AcquiredProvider<P: CaptureProvider>(P);

impl<P: CaptureProvider> Drop for AcquiredProvider<P> {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// One recording session: a provider draining into a raw PCM stream on a
/// dedicated capture thread.
///
/// ```text
/// [CaptureProvider] → read_frame → [RawPcmSink] → {raw_path}
///        ↑ StopToken (checked before every read)
/// ```
///
/// State transitions: `Idle → Recording → Stopped`. A stopped session
/// cannot be restarted; create a new one.
pub struct CaptureSession<P: CaptureProvider + 'static> {
    provider: Option<P>,
    device: AudioDevice,
    permissions: Arc<dyn PermissionProvider>,
    config: CaptureConfiguration,
    state: Arc<Mutex<CaptureState>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
    stop_token: StopToken,
    bytes_captured: Arc<AtomicU64>,
    capture_handle: Option<thread::JoinHandle<CaptureSummary>>,
    raw_path: Option<PathBuf>,
    summary: Option<CaptureSummary>,
}

impl<P: CaptureProvider + 'static> CaptureSession<P> {
    pub fn new(provider: P, permissions: Arc<dyn PermissionProvider>, config: CaptureConfiguration) -> Self {
        let device = provider.device_info();
        Self {
            provider: Some(provider),
            device,
            permissions,
            config,
            state: Arc::new(Mutex::new(CaptureState::Idle)),
            delegate: None,
            stop_token: StopToken::new(),
            bytes_captured: Arc::new(AtomicU64::new(0)),
            capture_handle: None,
            raw_path: None,
            summary: None,
        }
    }

    /// Share an existing stop flag with this session, e.g. one held by a UI.
    ///
    /// Only meaningful before [`start`](Self::start).
    pub fn with_stop_token(mut self, stop_token: StopToken) -> Self {
        self.stop_token = stop_token;
        self
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> CaptureState {
        self.state.lock().clone()
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn device_info(&self) -> &AudioDevice {
        &self.device
    }

    /// Handle to this session's stop flag. Triggering it stops the capture
    /// thread without joining it; call [`stop`](Self::stop) to collect the summary.
    pub fn stop_token(&self) -> StopToken {
        self.stop_token.clone()
    }

    /// Raw bytes written so far.
    pub fn bytes_captured(&self) -> u64 {
        self.bytes_captured.load(Ordering::Relaxed)
    }

    pub fn raw_path(&self) -> Option<&Path> {
        self.raw_path.as_deref()
    }

    /// Whether the capture thread has closed the sink and released the source.
    pub fn is_finished(&self) -> bool {
        self.state.lock().is_stopped()
    }

    /// Acquire the provider, open the raw stream at `raw_path` and start the
    /// capture thread. Transitions: idle → recording.
    ///
    /// On failure the session stays idle and may be started again.
    pub fn start(&mut self, raw_path: impl AsRef<Path>) -> Result<(), CaptureError> {
        let raw_path = raw_path.as_ref().to_path_buf();

        if !self.state.lock().is_idle() {
            return Err(CaptureError::InvalidState(
                "can only start from idle state".into(),
            ));
        }
        self.config.validate()?;
        self.check_permission()?;

        let mut provider = self
            .provider
            .take()
            .ok_or_else(|| CaptureError::InvalidState("provider already consumed".into()))?;

        if !provider.is_available() {
            self.provider = Some(provider);
            return Err(CaptureError::SourceUnavailable(format!(
                "{} is not available",
                self.device.name
            )));
        }

        let format = self.config.format;
        if let Err(e) = provider.acquire(&format) {
            log::warn!("Failed to acquire {}: {}", self.device.name, e);
            self.provider = Some(provider);
            return Err(e);
        }
        let sink = match RawPcmSink::create(&raw_path) {
            Ok(sink) => sink,
            Err(e) => {
                provider.release();
                self.provider = Some(provider);
                return Err(e);
            }
        };
        let frame_bytes = self.config.resolve_frame_bytes(provider.preferred_frame_bytes(&format));
        let source = AcquiredProvider(provider);

        let params = LoopParams {
            frame_bytes,
            byte_limit: self.byte_limit(),
            empty_read_backoff: self.config.empty_read_backoff,
        };

        log::info!(
            "Recording from {} to {} ({} Hz, {} ch, {} bit, {} byte frames)",
            self.device.name,
            raw_path.display(),
            format.sample_rate,
            format.channels,
            format.bits_per_sample,
            frame_bytes
        );

        self.raw_path = Some(raw_path.clone());
        self.set_state(CaptureState::Recording);

        let worker = CaptureWorker {
            source,
            sink,
            raw_path,
            params,
            stop_token: self.stop_token.clone(),
            progress: Arc::clone(&self.bytes_captured),
            state: Arc::clone(&self.state),
            delegate: self.delegate.clone(),
        };

        match thread::Builder::new()
            .name("pcm-capture".into())
            .spawn(move || worker.run())
        {
            Ok(handle) => {
                self.capture_handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                let error = CaptureError::IoFailure(format!("failed to spawn capture thread: {}", e));
                let reason = StopReason::Failed(error.clone());
                self.summary = Some(CaptureSummary {
                    raw_path: self.raw_path.clone().unwrap_or_default(),
                    bytes_written: 0,
                    frames_written: 0,
                    reason: reason.clone(),
                });
                self.set_state(CaptureState::Stopped(reason));
                Err(error)
            }
        }
    }

    /// Request a stop and wait for the capture thread to close the sink and
    /// release the source. Transitions: recording → stopped.
    ///
    /// Calling stop again returns the same summary.
    pub fn stop(&mut self) -> Result<CaptureSummary, CaptureError> {
        if let Some(summary) = &self.summary {
            return Ok(summary.clone());
        }

        let Some(handle) = self.capture_handle.take() else {
            return Err(CaptureError::InvalidState(
                "session was never started".into(),
            ));
        };

        self.stop_token.request_stop();

        let summary = match handle.join() {
            Ok(summary) => summary,
            Err(_) => {
                let error = CaptureError::IoFailure("capture thread panicked".into());
                self.set_state(CaptureState::Stopped(StopReason::Failed(error.clone())));
                CaptureSummary {
                    raw_path: self.raw_path.clone().unwrap_or_default(),
                    bytes_written: self.bytes_captured(),
                    frames_written: 0,
                    reason: StopReason::Failed(error),
                }
            }
        };

        log::info!(
            "Capture stopped: {} bytes in {} frames ({:?})",
            summary.bytes_written,
            summary.frames_written,
            summary.reason
        );

        self.summary = Some(summary.clone());
        Ok(summary)
    }

    fn check_permission(&self) -> Result<(), CaptureError> {
        if self.permissions.has_permission(Capability::RecordAudio) {
            return Ok(());
        }
        log::warn!("Record permission not granted; requesting");
        self.permissions.request_permission(
            Capability::RecordAudio,
            Box::new(|status: PermissionStatus| match status {
                PermissionStatus::Granted => log::info!("Record permission granted"),
                PermissionStatus::Denied => log::warn!("Record permission denied"),
            }),
        );
        Err(CaptureError::PermissionDenied)
    }

    /// Largest stream the session may write: the configured duration or the
    /// RIFF size limit, whichever is smaller, in whole blocks.
    fn byte_limit(&self) -> u64 {
        let format = &self.config.format;
        let riff_limit = format.align_down(MAX_DATA_SIZE as u64);
        match self.config.max_duration_secs {
            Some(secs) => format.bytes_for_duration(secs).min(riff_limit),
            None => riff_limit,
        }
    }

    fn set_state(&self, new_state: CaptureState) {
        *self.state.lock() = new_state.clone();
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }
}

impl<P: CaptureProvider + 'static> Drop for CaptureSession<P> {
    fn drop(&mut self) {
        if self.capture_handle.is_some() {
            if let Err(e) = self.stop() {
                log::error!("Failed to stop capture session on drop: {}", e);
            }
        }
    }
}

/// Everything the capture thread owns.
struct CaptureWorker<P: CaptureProvider> {
    source: AcquiredProvider<P>,
    sink: RawPcmSink,
    raw_path: PathBuf,
    params: LoopParams,
    stop_token: StopToken,
    progress: Arc<AtomicU64>,
    state: Arc<Mutex<CaptureState>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl<P: CaptureProvider> CaptureWorker<P> {
    fn run(self) -> CaptureSummary {
        let CaptureWorker {
            mut source,
            mut sink,
            raw_path,
            params,
            stop_token,
            progress,
            state,
            delegate,
        } = self;

        let outcome = run_capture_loop(&mut source.0, &mut sink, &stop_token, &params, &progress);

        let close_result = sink.close();
        drop(source);

        let reason = match (outcome.reason, close_result) {
            (StopReason::Failed(e), _) => StopReason::Failed(e),
            (_, Err(e)) => {
                log::error!("Failed to close raw stream: {}", e);
                StopReason::Failed(e)
            }
            (reason, Ok(_)) => reason,
        };

        let summary = CaptureSummary {
            raw_path,
            bytes_written: outcome.bytes_written,
            frames_written: outcome.frames_written,
            reason,
        };

        let stopped = CaptureState::Stopped(summary.reason.clone());
        *state.lock() = stopped.clone();

        if let Some(ref delegate) = delegate {
            if let Some(error) = summary.reason.error() {
                delegate.on_error(error);
            }
            delegate.on_state_changed(&stopped);
            delegate.on_capture_stopped(&summary);
        }

        summary
    }
}
