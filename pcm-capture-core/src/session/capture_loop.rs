use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crate::models::state::StopReason;
use crate::session::stop_token::StopToken;
use crate::storage::raw_sink::RawPcmSink;
use crate::traits::capture_provider::CaptureProvider;

/// Fixed parameters of one capture loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopParams {
    /// Bytes requested per read. Must be positive.
    pub frame_bytes: usize,
    /// The loop stops once this many bytes have been written.
    pub byte_limit: u64,
    /// Sleep after a read that returned nothing.
    pub empty_read_backoff: Duration,
}

/// What a capture loop run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub bytes_written: u64,
    pub frames_written: u64,
    pub reason: StopReason,
}

/// Drain frames from `provider` into `sink` until stopped, limited, or failed.
///
/// The stop token is checked before every read, so once a stop is requested
/// at most the in-flight read and its write complete. Every byte a read
/// returns is written before the token is checked again. The sink is left
/// open; the caller closes it and releases the provider.
pub fn run_capture_loop<P: CaptureProvider + ?Sized>(
    provider: &mut P,
    sink: &mut RawPcmSink,
    stop: &StopToken,
    params: &LoopParams,
    progress: &AtomicU64,
) -> LoopOutcome {
    let mut frame = vec![0u8; params.frame_bytes];
    let mut bytes_written: u64 = 0;
    let mut frames_written: u64 = 0;

    let reason = loop {
        if stop.is_stop_requested() {
            break StopReason::Requested;
        }

        let remaining = params.byte_limit.saturating_sub(bytes_written);
        if remaining == 0 {
            log::info!("Capture limit of {} bytes reached", params.byte_limit);
            break StopReason::LimitReached;
        }
        let want = (params.frame_bytes as u64).min(remaining) as usize;

        let n = match provider.read_frame(&mut frame[..want]) {
            Ok(n) => n.min(want),
            Err(e) => {
                log::error!("Audio read failed after {} bytes: {}", bytes_written, e);
                break StopReason::Failed(e);
            }
        };

        if n == 0 {
            if !params.empty_read_backoff.is_zero() {
                thread::sleep(params.empty_read_backoff);
            }
            continue;
        }

        if let Err(e) = sink.write(&frame[..n]) {
            log::error!("Raw stream write failed after {} bytes: {}", bytes_written, e);
            break StopReason::Failed(e);
        }

        bytes_written += n as u64;
        frames_written += 1;
        progress.store(bytes_written, Ordering::Relaxed);
    };

    log::debug!(
        "Capture loop exited: {:?} ({} frames, {} bytes)",
        reason,
        frames_written,
        bytes_written
    );

    LoopOutcome {
        bytes_written,
        frames_written,
        reason,
    }
}
