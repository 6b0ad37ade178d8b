//! Upload progress reporting.

use std::sync::Arc;

use parking_lot::Mutex;

/// Bytes handed to the transport so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes sent, strictly increasing between events of one request.
    pub loaded: u64,
    /// Body length, when known up front.
    pub total: Option<u64>,
}

impl UploadProgress {
    /// Completion ratio in `0.0..=1.0`, when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.loaded as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// Receives upload progress for one request.
///
/// Called zero or more times with increasing `loaded`, never after the
/// request has completed, failed or timed out.
pub trait UploadObserver: Send + Sync {
    /// One progress event.
    fn on_progress(&self, progress: UploadProgress);
}

impl<F> UploadObserver for F
where
    F: Fn(UploadProgress) + Send + Sync,
{
    fn on_progress(&self, progress: UploadProgress) {
        self(progress)
    }
}

/// Gate between the body stream and an [`UploadObserver`].
///
/// Enforces monotonic progress and stops forwarding once closed. The observer
/// runs under the gate's lock, so [`ProgressReporter::close`] returns only
/// after any notification already in progress has finished.
pub(crate) struct ProgressReporter {
    observer: Arc<dyn UploadObserver>,
    total: Option<u64>,
    gate: Mutex<Gate>,
}

#[derive(Default)]
struct Gate {
    loaded: u64,
    closed: bool,
}

impl ProgressReporter {
    pub(crate) fn new(observer: Arc<dyn UploadObserver>, total: Option<u64>) -> Self {
        Self {
            observer,
            total,
            gate: Mutex::new(Gate::default()),
        }
    }

    /// Record `bytes` more sent and notify the observer.
    pub(crate) fn advance(&self, bytes: u64) {
        let mut gate = self.gate.lock();
        // 关闭后不再通知
        if bytes == 0 || gate.closed {
            return;
        }
        gate.loaded += bytes;
        self.observer.on_progress(UploadProgress {
            loaded: gate.loaded,
            total: self.total,
        });
    }

    /// Stop forwarding events; idempotent. Waits for a notification that is
    /// already running.
    pub(crate) fn close(&self) {
        self.gate.lock().closed = true;
    }
}
