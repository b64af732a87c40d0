use super::error::CaptureError;

/// Why a capture loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The stop token was triggered.
    Requested,
    /// The configured duration or the RIFF size limit was reached.
    LimitReached,
    /// A read or write failed; data written before the failure is kept.
    Failed(CaptureError),
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn error(&self) -> Option<&CaptureError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → recording → stopped
/// ```
/// A stopped session never records again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Stopped(StopReason),
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Stopped(StopReason::Failed(_)) => "failed",
            Self::Stopped(_) => "stopped",
        }
    }
}
