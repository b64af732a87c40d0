use crate::models::error::CaptureError;
use crate::models::recording_result::{CaptureSummary, RecordingResult};
use crate::models::state::CaptureState;

/// Event delegate for capture session notifications.
///
/// State changes and errors raised by the capture loop are delivered on the
/// capture thread, not the caller's thread. Implementations should marshal to
/// a UI thread if needed.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called when a read or write fails during capture.
    fn on_error(&self, error: &CaptureError);

    /// Called once the capture thread has closed the sink and released the source.
    fn on_capture_stopped(&self, _summary: &CaptureSummary) {}

    /// Called when the WAV file has been published.
    fn on_recording_finished(&self, _result: &RecordingResult) {}
}
