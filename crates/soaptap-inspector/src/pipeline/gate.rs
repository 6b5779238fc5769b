//! Signals that force logging on regardless of `EnableLogging`.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

pub trait InspectionSignal: Send + Sync {
    fn is_active(&self) -> bool;
}

/// How long an [`AttachedDebugger`] answer is reused before re-reading.
pub const DEBUGGER_RECHECK: Duration = Duration::from_secs(1);

/// Active while a debugger (ptrace tracer) is attached to the process.
///
/// Process status is read at most once per [`DEBUGGER_RECHECK`]; calls in
/// between reuse the last answer.
pub struct AttachedDebugger {
    read_status: fn() -> Option<String>,
    recheck: Duration,
    cached: Mutex<Option<(Instant, bool)>>,
}

impl AttachedDebugger {
    pub fn new() -> Self {
        Self::with_status_reader(process_status, DEBUGGER_RECHECK)
    }

    fn with_status_reader(read_status: fn() -> Option<String>, recheck: Duration) -> Self {
        Self {
            read_status,
            recheck,
            cached: Mutex::new(None),
        }
    }
}

impl Default for AttachedDebugger {
    fn default() -> Self {
        Self::new()
    }
}

impl InspectionSignal for AttachedDebugger {
    fn is_active(&self) -> bool {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((at, active)) = *cached {
            if at.elapsed() < self.recheck {
                return active;
            }
        }
        let active = (self.read_status)()
            .as_deref()
            .and_then(tracer_pid)
            .is_some_and(|pid| pid != 0);
        *cached = Some((Instant::now(), active));
        active
    }
}

#[cfg(target_os = "linux")]
fn process_status() -> Option<String> {
    std::fs::read_to_string("/proc/self/status").ok()
}

#[cfg(not(target_os = "linux"))]
fn process_status() -> Option<String> {
    None
}

/// Never active.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInspection;

impl InspectionSignal for NoInspection {
    fn is_active(&self) -> bool {
        false
    }
}

/// Fixed answer, for hosts that decide inspection themselves.
#[derive(Debug, Clone, Copy)]
pub struct ForcedInspection(pub bool);

impl InspectionSignal for ForcedInspection {
    fn is_active(&self) -> bool {
        self.0
    }
}

fn tracer_pid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TRACED_READS: AtomicUsize = AtomicUsize::new(0);
    static UNTRACED_READS: AtomicUsize = AtomicUsize::new(0);

    fn traced_status() -> Option<String> {
        TRACED_READS.fetch_add(1, Ordering::SeqCst);
        Some("Name:\tsoaptap\nTracerPid:\t77\n".to_string())
    }

    fn untraced_status() -> Option<String> {
        UNTRACED_READS.fetch_add(1, Ordering::SeqCst);
        Some("TracerPid:\t0\n".to_string())
    }

    #[test]
    fn status_is_read_once_per_interval() {
        let debugger = AttachedDebugger::with_status_reader(traced_status, Duration::from_secs(3600));
        for _ in 0..1000 {
            assert!(debugger.is_active());
        }
        assert_eq!(TRACED_READS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_answer_is_read_again() {
        let debugger = AttachedDebugger::with_status_reader(untraced_status, Duration::ZERO);
        assert!(!debugger.is_active());
        assert!(!debugger.is_active());
        assert_eq!(UNTRACED_READS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unreadable_status_means_inactive() {
        let debugger = AttachedDebugger::with_status_reader(|| None, Duration::ZERO);
        assert!(!debugger.is_active());
    }

    #[test]
    fn parses_tracer_pid() {
        let status = "Name:\tsoaptap\nState:\tR (running)\nTracerPid:\t4242\nUid:\t0\n";
        assert_eq!(tracer_pid(status), Some(4242));
        assert_eq!(tracer_pid("TracerPid:\t0\n"), Some(0));
        assert_eq!(tracer_pid("Name:\tx\n"), None);
    }
}
