use crate::models::audio_models::{AudioDevice, PcmFormat};
use crate::models::error::CaptureError;

/// Interface for a blocking PCM input source.
///
/// The capture thread takes ownership of the provider for the session's
/// lifetime: `acquire` once, `read_frame` until stopped, then `release`.
/// Implementations deliver interleaved little-endian samples in the format
/// passed to `acquire`.
pub trait CaptureProvider: Send {
    /// Whether this capture source is currently available.
    fn is_available(&self) -> bool;

    /// Frame size the device reads most efficiently, if it has one.
    fn preferred_frame_bytes(&self, _format: &PcmFormat) -> Option<usize> {
        None
    }

    /// Open the device and start delivering audio.
    ///
    /// Fails with `SourceUnavailable` if the device is missing or busy, or
    /// `PermissionDenied` if the platform refuses access.
    fn acquire(&mut self, format: &PcmFormat) -> Result<(), CaptureError>;

    /// Block until audio is available and copy up to `buf.len()` bytes into `buf`.
    ///
    /// Returns the number of bytes written. Zero means no audio was ready.
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError>;

    /// Stop the device and release its resources. Called exactly once per acquire.
    fn release(&mut self);

    /// Information about the device backing this provider.
    fn device_info(&self) -> AudioDevice;
}
