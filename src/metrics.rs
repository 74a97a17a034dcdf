use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters for one upload run
pub struct Metrics {
    pub subjects_created: AtomicU64,
    pub experiments_created: AtomicU64,
    pub scans_created: AtomicU64,
    pub resources_created: AtomicU64,
    pub files_uploaded: AtomicU64,
    pub directories_uploaded: AtomicU64,
    pub entries_skipped: AtomicU64,
    pub failures: AtomicU64,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            subjects_created: AtomicU64::new(0),
            experiments_created: AtomicU64::new(0),
            scans_created: AtomicU64::new(0),
            resources_created: AtomicU64::new(0),
            files_uploaded: AtomicU64::new(0),
            directories_uploaded: AtomicU64::new(0),
            entries_skipped: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn inc_subjects_created(&self) {
        self.subjects_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_experiments_created(&self) {
        self.experiments_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_scans_created(&self) {
        self.scans_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_resources_created(&self) {
        self.resources_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_files_uploaded(&self, count: u64) {
        self.files_uploaded.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_directories_uploaded(&self) {
        self.directories_uploaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_entries_skipped(&self) {
        self.entries_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            subjects_created: self.subjects_created.load(Ordering::Relaxed),
            experiments_created: self.experiments_created.load(Ordering::Relaxed),
            scans_created: self.scans_created.load(Ordering::Relaxed),
            resources_created: self.resources_created.load(Ordering::Relaxed),
            files_uploaded: self.files_uploaded.load(Ordering::Relaxed),
            directories_uploaded: self.directories_uploaded.load(Ordering::Relaxed),
            entries_skipped: self.entries_skipped.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            elapsed_ms: self.start_time.elapsed().as_millis() as u64,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub subjects_created: u64,
    pub experiments_created: u64,
    pub scans_created: u64,
    pub resources_created: u64,
    pub files_uploaded: u64,
    pub directories_uploaded: u64,
    pub entries_skipped: u64,
    pub failures: u64,
    pub elapsed_ms: u64,
}
