//! Process-wide send counters.
//! In-memory only; nothing here is persisted.
use std::sync::atomic::{AtomicU64, Ordering};

static SESSIONS_OPENED: AtomicU64 = AtomicU64::new(0);
static PACKETS_SENT: AtomicU64 = AtomicU64::new(0);
static READ_ONLY_SKIPS: AtomicU64 = AtomicU64::new(0);
static VERIFY_REJECTIONS: AtomicU64 = AtomicU64::new(0);
static CONNECTION_FAILURES: AtomicU64 = AtomicU64::new(0);

pub fn inc_sessions_opened() {
    SESSIONS_OPENED.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_packets_sent() {
    PACKETS_SENT.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_read_only_skips() {
    READ_ONLY_SKIPS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_verify_rejections() {
    VERIFY_REJECTIONS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_connection_failures() {
    CONNECTION_FAILURES.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub sessions_opened: u64,
    pub packets_sent: u64,
    pub read_only_skips: u64,
    pub verify_rejections: u64,
    pub connection_failures: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        sessions_opened: SESSIONS_OPENED.load(Ordering::Relaxed),
        packets_sent: PACKETS_SENT.load(Ordering::Relaxed),
        read_only_skips: READ_ONLY_SKIPS.load(Ordering::Relaxed),
        verify_rejections: VERIFY_REJECTIONS.load(Ordering::Relaxed),
        connection_failures: CONNECTION_FAILURES.load(Ordering::Relaxed),
    }
}
