//! Run phases and per-batch transfer accounting.

use std::fmt;

use uuid::Uuid;

use crate::error::TransferFailure;
use crate::media::MediaKind;

/// Lifecycle of a single pipeline run. There is no failed state: item
/// failures are recorded in the batch reports instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Resolved,
    Fetching,
    Uploading,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Resolved => write!(f, "resolved"),
            RunPhase::Fetching => write!(f, "fetching"),
            RunPhase::Uploading => write!(f, "uploading"),
            RunPhase::Done => write!(f, "done"),
        }
    }
}

/// Pipeline stage an item failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Upload => write!(f, "upload"),
        }
    }
}

/// One item that did not make it through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub stage: Stage,
    /// Source URL for fetch failures, filename for upload failures.
    pub item: String,
    pub failure: TransferFailure,
}

/// Outcome of one transfer batch (all images or all videos of a run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub kind: MediaKind,
    pub folder: String,
    pub queued: usize,
    pub fetched: usize,
    pub delivered: usize,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn new(kind: MediaKind, folder: String, queued: usize) -> Self {
        Self {
            kind,
            folder,
            queued,
            fetched: 0,
            delivered: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_fetched(&mut self) {
        self.fetched += 1;
    }

    pub fn record_delivered(&mut self) {
        self.delivered += 1;
    }

    pub fn record_failure(&mut self, stage: Stage, item: impl Into<String>, failure: TransferFailure) {
        self.failures.push(ItemFailure {
            stage,
            item: item.into(),
            failure,
        });
    }

    /// Number of items that failed in the given stage.
    pub fn failed_in(&self, stage: Stage) -> usize {
        self.failures.iter().filter(|f| f.stage == stage).count()
    }

    /// Whether every queued item was delivered.
    pub fn is_complete(&self) -> bool {
        self.delivered == self.queued
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub images: BatchReport,
    pub videos: BatchReport,
    pub cancelled: bool,
}

impl RunReport {
    pub fn total_queued(&self) -> usize {
        self.images.queued + self.videos.queued
    }

    pub fn total_delivered(&self) -> usize {
        self.images.delivered + self.videos.delivered
    }

    pub fn is_complete(&self) -> bool {
        self.images.is_complete() && self.videos.is_complete()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemFailure> {
        self.images.failures.iter().chain(self.videos.failures.iter())
    }
}
