//! Fake providers and delegates shared by the session tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioDevice, Capability, PcmFormat, PermissionStatus};
use crate::models::error::CaptureError;
use crate::models::recording_result::{CaptureSummary, RecordingResult};
use crate::models::state::CaptureState;
use crate::session::stop_token::StopToken;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::permission::{PermissionCallback, PermissionProvider};

/// Counters a test keeps after the provider has moved into the capture thread.
#[derive(Debug, Clone, Default)]
pub struct ProviderProbe {
    pub reads: Arc<AtomicUsize>,
    pub acquired: Arc<AtomicUsize>,
    pub released: Arc<AtomicUsize>,
    pub late_reads: Arc<AtomicUsize>,
}

impl ProviderProbe {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Reads that began after the watched stop token was triggered.
    pub fn late_reads(&self) -> usize {
        self.late_reads.load(Ordering::SeqCst)
    }
}

/// Replays a fixed list of frames, then returns empty reads.
pub struct ScriptedProvider {
    frames: VecDeque<Vec<u8>>,
    stop_after: Option<(usize, StopToken)>,
    fail_on_read: Option<usize>,
    acquire_error: Option<CaptureError>,
    available: bool,
    preferred_frame_bytes: Option<usize>,
    pub probe: ProviderProbe,
}

impl ScriptedProvider {
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
            stop_after: None,
            fail_on_read: None,
            acquire_error: None,
            available: true,
            preferred_frame_bytes: None,
            probe: ProviderProbe::default(),
        }
    }

    /// Trigger `token` while serving read number `read` (1-based).
    pub fn stop_during_read(mut self, read: usize, token: StopToken) -> Self {
        self.stop_after = Some((read, token));
        self
    }

    /// Fail read number `read` (1-based).
    pub fn fail_on_read(mut self, read: usize) -> Self {
        self.fail_on_read = Some(read);
        self
    }

    pub fn fail_acquire(mut self, error: CaptureError) -> Self {
        self.acquire_error = Some(error);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn preferring(mut self, frame_bytes: usize) -> Self {
        self.preferred_frame_bytes = Some(frame_bytes);
        self
    }
}

impl CaptureProvider for ScriptedProvider {
    fn is_available(&self) -> bool {
        self.available
    }

    fn preferred_frame_bytes(&self, _format: &PcmFormat) -> Option<usize> {
        self.preferred_frame_bytes
    }

    fn acquire(&mut self, _format: &PcmFormat) -> Result<(), CaptureError> {
        if let Some(e) = self.acquire_error.clone() {
            return Err(e);
        }
        self.probe.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        let read = self.probe.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_read == Some(read) {
            return Err(CaptureError::IoFailure("device disconnected".into()));
        }
        let n = match self.frames.pop_front() {
            Some(frame) => {
                let n = frame.len().min(buf.len());
                buf[..n].copy_from_slice(&frame[..n]);
                n
            }
            None => 0,
        };
        if let Some((at, token)) = &self.stop_after {
            if *at == read {
                token.request_stop();
            }
        }
        Ok(n)
    }

    fn release(&mut self) {
        self.probe.released.fetch_add(1, Ordering::SeqCst);
    }

    fn device_info(&self) -> AudioDevice {
        AudioDevice {
            id: "scripted".into(),
            name: "Scripted Microphone".into(),
            is_default: true,
        }
    }
}

/// Produces an endless byte counter, one frame per read, pacing each read.
pub struct CountingProvider {
    next: u8,
    pace: Duration,
    watch: Option<StopToken>,
    pub probe: ProviderProbe,
}

impl CountingProvider {
    pub fn new(pace: Duration) -> Self {
        Self {
            next: 0,
            pace,
            watch: None,
            probe: ProviderProbe::default(),
        }
    }

    /// Count reads that start after `token` is triggered.
    pub fn watching(mut self, token: StopToken) -> Self {
        self.watch = Some(token);
        self
    }
}

impl CaptureProvider for CountingProvider {
    fn is_available(&self) -> bool {
        true
    }

    fn acquire(&mut self, _format: &PcmFormat) -> Result<(), CaptureError> {
        self.probe.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        self.probe.reads.fetch_add(1, Ordering::SeqCst);
        if self.watch.as_ref().is_some_and(|t| t.is_stop_requested()) {
            self.probe.late_reads.fetch_add(1, Ordering::SeqCst);
        }
        thread::sleep(self.pace);
        for byte in buf.iter_mut() {
            *byte = self.next;
            self.next = self.next.wrapping_add(1);
        }
        Ok(buf.len())
    }

    fn release(&mut self) {
        self.probe.released.fetch_add(1, Ordering::SeqCst);
    }

    fn device_info(&self) -> AudioDevice {
        AudioDevice {
            id: "counting".into(),
            name: "Counting Microphone".into(),
            is_default: false,
        }
    }
}

/// Permission provider with a fixed answer that records prompts.
#[derive(Debug, Default)]
pub struct FixedPermissions {
    pub granted: bool,
    pub requests: AtomicUsize,
}

impl FixedPermissions {
    pub fn granted() -> Arc<Self> {
        Arc::new(Self {
            granted: true,
            ..Default::default()
        })
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl PermissionProvider for FixedPermissions {
    fn has_permission(&self, _capability: Capability) -> bool {
        self.granted
    }

    fn request_permission(&self, _capability: Capability, on_result: PermissionCallback) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        on_result(if self.granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        });
    }
}

/// Delegate that records every callback.
#[derive(Default)]
pub struct RecordingDelegate {
    pub states: Mutex<Vec<CaptureState>>,
    pub errors: Mutex<Vec<CaptureError>>,
    pub stopped: Mutex<Vec<CaptureSummary>>,
    pub finished: Mutex<Vec<RecordingResult>>,
}

impl CaptureDelegate for RecordingDelegate {
    fn on_state_changed(&self, state: &CaptureState) {
        self.states.lock().push(state.clone());
    }

    fn on_error(&self, error: &CaptureError) {
        self.errors.lock().push(error.clone());
    }

    fn on_capture_stopped(&self, summary: &CaptureSummary) {
        self.stopped.lock().push(summary.clone());
    }

    fn on_recording_finished(&self, result: &RecordingResult) {
        self.finished.lock().push(result.clone());
    }
}
