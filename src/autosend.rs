//! Auto-send countdown for high-confidence reply drafts.
//!
//! A timer is armed only for drafts whose analysis confidence clears the
//! auto-send threshold. The countdown polls a cancellation flag every tick
//! so an edit or explicit cancel lands before the send fires; dropping the
//! timer aborts the task outright. The send closure runs at most once.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::intelligence::analyze::EmailAnalysis;

/// Countdown before an auto-send fires.
pub const AUTO_SEND_COUNTDOWN_SECS: u64 = 3;

/// Arm the countdown for a draft whose analysis clears the auto-send
/// threshold; analyses below it never start a timer.
pub fn arm_for_analysis<F, Fut>(analysis: &EmailAnalysis, send: F) -> Option<AutoSendTimer>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    arm_for_analysis_with_tick(analysis, AUTO_SEND_COUNTDOWN_SECS, Duration::from_secs(1), send)
}

pub fn arm_for_analysis_with_tick<F, Fut>(
    analysis: &EmailAnalysis,
    ticks: u64,
    tick: Duration,
    send: F,
) -> Option<AutoSendTimer>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if !analysis.qualifies_for_auto_send() {
        return None;
    }
    Some(AutoSendTimer::arm_with_tick(ticks, tick, send))
}

pub struct AutoSendTimer {
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<bool>>,
}

impl AutoSendTimer {
    /// Arm the countdown with the default three-second window, polled once
    /// per second.
    pub fn arm<F, Fut>(send: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::arm_with_tick(AUTO_SEND_COUNTDOWN_SECS, Duration::from_secs(1), send)
    }

    /// Arm with an explicit tick count and tick length; the window is
    /// `ticks * tick` and cancellation is checked at every tick.
    pub fn arm_with_tick<F, Fut>(ticks: u64, tick: Duration, send: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();

        let handle = tokio::spawn(async move {
            for _ in 0..ticks {
                if flag.load(Ordering::SeqCst) {
                    return false;
                }
                tokio::time::sleep(tick).await;
            }
            // Last check after the window elapses; a cancel that raced the
            // final sleep still wins.
            if flag.load(Ordering::SeqCst) {
                return false;
            }
            send().await;
            true
        });

        Self {
            cancelled,
            handle: Some(handle),
        }
    }

    /// Explicit cancel. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// An edit to the draft aborts the pending auto-send.
    pub fn note_edit(&self) {
        self.cancel();
    }

    /// Wait for the countdown to resolve; true if the send fired.
    pub async fn join(mut self) -> bool {
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or(false),
            None => false,
        }
    }
}

impl Drop for AutoSendTimer {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
