//! # pcm-capture-core
//!
//! Records a blocking PCM input source to a WAV file.
//!
//! A `CaptureSession` drains fixed-size frames from a `CaptureProvider` into
//! a raw PCM stream on a dedicated thread until its `StopToken` fires. Once
//! the thread has been joined, `finalize` prepends a 44-byte RIFF/WAVE header
//! computed from the stream's final length and publishes the WAV atomically.
//! `WavRecorder` runs both steps for a single take.
//!
//! ## Architecture
//!
//! ```text
//! pcm-capture-core (this crate)
//! ├── traits/       ← CaptureProvider, PermissionProvider, CaptureDelegate
//! ├── models/       ← CaptureError, CaptureState, CaptureConfiguration, PcmFormat, results
//! ├── processing/   ← WAV header generation and parsing
//! ├── session/      ← capture loop, CaptureSession, WavRecorder, StopToken
//! └── storage/      ← RawPcmSink, container finalize, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioDevice, Capability, PcmFormat, PermissionStatus};
pub use models::config::CaptureConfiguration;
pub use models::error::CaptureError;
pub use models::recording_result::{CaptureSummary, RecordingMetadata, RecordingResult};
pub use models::state::{CaptureState, StopReason};
pub use processing::wav_format::{WavHeader, WAV_HEADER_SIZE};
pub use session::capture_session::CaptureSession;
pub use session::recorder::WavRecorder;
pub use session::stop_token::StopToken;
pub use storage::container_writer::{finalize, FinalizedWav};
pub use storage::raw_sink::RawPcmSink;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::capture_provider::CaptureProvider;
pub use traits::permission::{AlwaysGranted, PermissionCallback, PermissionProvider};
