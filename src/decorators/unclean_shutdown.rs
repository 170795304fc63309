// src/decorators/unclean_shutdown.rs
//! Unclean shutdown detection
//!
//! Counts `notify_shutdown` calls. At process exit every detector created in
//! the process is checked: zero calls usually means a decorator further out
//! did not forward the shutdown, more than one means something forwarded it
//! twice. Both are logged; neither changes the exit status.
//!
//! The exit hook is a single `libc::atexit` handler over a process-wide
//! registry of detector states, installed by the first detector.

use crate::evaluator::Evaluator;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};
use tracing::{debug, error, warn};

#[derive(Debug)]
struct DetectorState {
    notifications: AtomicU64,
    created_at: String,
}

static LIVE_DETECTORS: Lazy<Mutex<Vec<Arc<DetectorState>>>> = Lazy::new(|| Mutex::new(Vec::new()));
static INSTALL_EXIT_HOOK: Once = Once::new();

extern "C" fn check_detectors_at_exit() {
    let detectors = LIVE_DETECTORS.lock().clone();
    report_unclean(&detectors);
}

/// Log every detector whose shutdown count is not exactly one. Returns how
/// many were reported.
fn report_unclean(detectors: &[Arc<DetectorState>]) -> usize {
    let mut unclean = 0;
    for detector in detectors {
        match detector.notifications.load(Ordering::SeqCst) {
            1 => continue,
            0 => {
                error!("Unclean Shutdown Detected, You must call notify_shutdown() on your evaluator. You may have a broken decorator that doesn't forward notify_shutdown() correctly");
                eprintln!("Unclean Shutdown Detected, You must call notify_shutdown() on your evaluator before exiting. You may have a decorator that doesn't forward the call correctly.");
            }
            count => {
                warn!("notify_shutdown() was called {} times on the same evaluator, this is almost certainly a logic error", count);
                eprintln!("You called notify_shutdown() on your evaluator {} times, this is almost certainly a logic error and may cause weird behaviour", count);
            }
        }
        debug!("Evaluator that wasn't shutdown cleanly was created by {}", detector.created_at);
        unclean += 1;
    }
    unclean
}

pub struct UncleanShutdownDetector {
    inner: Arc<dyn Evaluator>,
    state: Arc<DetectorState>,
}

impl UncleanShutdownDetector {
    /// `created_at` describes the owner, it is printed for unclean detectors
    pub fn new(inner: Arc<dyn Evaluator>, created_at: impl Into<String>) -> Self {
        let state = Arc::new(DetectorState {
            notifications: AtomicU64::new(0),
            created_at: created_at.into(),
        });

        LIVE_DETECTORS.lock().push(Arc::clone(&state));
        INSTALL_EXIT_HOOK.call_once(|| {
            // SAFETY: the handler is a plain extern "C" fn with no arguments
            let rc = unsafe { libc::atexit(check_detectors_at_exit) };
            if rc != 0 {
                warn!("Could not register unclean shutdown exit hook ({})", rc);
            }
        });

        Self { inner, state }
    }

    pub fn shutdown_notifications(&self) -> u64 {
        self.state.notifications.load(Ordering::SeqCst)
    }

    /// Exactly one shutdown notification so far
    pub fn is_clean(&self) -> bool {
        self.shutdown_notifications() == 1
    }
}

impl Evaluator for UncleanShutdownDetector {
    fn notify_shutdown(&self) {
        self.state.notifications.fetch_add(1, Ordering::SeqCst);
        self.inner.notify_shutdown();
    }

    delegate_evaluator!(inner =>
        evaluate_runs,
        evaluate_runs_async,
        is_run_final,
        are_runs_persisted,
        are_runs_observable,
        run_count,
        outstanding_run_count,
        outstanding_batch_count,
        wait_for_outstanding_evaluations,
        seek,
    );
}
