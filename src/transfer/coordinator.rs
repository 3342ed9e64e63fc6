//! Fans a manifest out over bounded fetch and upload pools.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::media::naming::unique_filename;
use crate::media::{MediaKind, MediaManifest, NamedBlob, TransferUnit};
use crate::output::create_item_bar;
use crate::transfer::fetch::{Fetch, Fetcher};
use crate::transfer::state::{BatchReport, RunPhase, RunReport, Stage};
use crate::transfer::upload::{Upload, Uploader};

/// Default simultaneous requests per batch.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Drives one manifest through fetch and upload.
///
/// Images and videos are separate batches with their own pool of
/// `concurrency` slots, so up to twice that many requests can be in flight.
pub struct TransferCoordinator<F, U> {
    fetcher: F,
    uploader: U,
    concurrency: usize,
    deadline: Option<Duration>,
    cancel: CancellationToken,
    progress: Option<MultiProgress>,
}

impl TransferCoordinator<Fetcher, Uploader> {
    /// Build the HTTP-backed coordinator described by `config`.
    pub fn from_config(client: Client, config: &Config) -> Self {
        let fetcher = Fetcher::new(client.clone(), &config.transfer);
        let uploader = Uploader::new(client, config);

        Self::new(fetcher, uploader, config.transfer.concurrency)
            .with_deadline(config.transfer.run_deadline())
            .with_progress(config.transfer.show_progress)
    }
}

impl<F: Fetch, U: Upload> TransferCoordinator<F, U> {
    pub fn new(fetcher: F, uploader: U, concurrency: usize) -> Self {
        Self {
            fetcher,
            uploader,
            concurrency: concurrency.max(1),
            deadline: None,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Cancel the run once `deadline` has elapsed.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled.then(MultiProgress::new);
        self
    }

    /// Token that stops every in-flight transfer of this coordinator.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fetch and upload everything in `manifest`.
    ///
    /// Fails only for a manifest with nothing to transfer. Item failures
    /// are collected in the returned report.
    pub async fn run(&self, manifest: &MediaManifest) -> Result<RunReport> {
        manifest.validate()?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id, author = %manifest.author.name);

        self.run_inner(run_id, manifest).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, manifest: &MediaManifest) -> Result<RunReport> {
        let cancel = self.cancel.child_token();
        let deadline_guard = self.deadline.map(|deadline| {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                tracing::warn!("Run deadline of {:?} reached, cancelling", deadline);
                token.cancel();
            })
        });

        let image_units = manifest.image_units();
        let video_units = manifest.video_units();

        let mut images = BatchReport::new(
            MediaKind::Image,
            manifest.destination_folder(MediaKind::Image),
            image_units.len(),
        );
        let mut videos = BatchReport::new(
            MediaKind::Video,
            manifest.destination_folder(MediaKind::Video),
            video_units.len(),
        );

        tracing::info!(phase = %RunPhase::Resolved, images = images.queued, videos = videos.queued, "Manifest accepted");

        tracing::info!(phase = %RunPhase::Fetching, "Fetching media");
        let (image_blobs, video_blobs) = tokio::join!(
            self.fetch_batch(&image_units, &mut images, &cancel),
            self.fetch_batch(&video_units, &mut videos, &cancel),
        );
        tracing::info!(images = image_blobs.len(), videos = video_blobs.len(), "Fetch finish");

        tracing::info!(phase = %RunPhase::Uploading, "Uploading media");
        tokio::join!(
            self.upload_batch(image_blobs, &mut images, &cancel),
            self.upload_batch(video_blobs, &mut videos, &cancel),
        );

        if let Some(guard) = deadline_guard {
            guard.abort();
        }

        let report = RunReport {
            run_id,
            images,
            videos,
            cancelled: cancel.is_cancelled(),
        };

        tracing::info!(
            phase = %RunPhase::Done,
            delivered = report.total_delivered(),
            queued = report.total_queued(),
            cancelled = report.cancelled,
            "Upload finish"
        );

        Ok(report)
    }

    /// Fetch every unit of one batch, keyed by the unit's index.
    ///
    /// Failed units are recorded in `report` and leave no entry behind.
    async fn fetch_batch(
        &self,
        units: &[TransferUnit],
        report: &mut BatchReport,
        cancel: &CancellationToken,
    ) -> BTreeMap<usize, NamedBlob> {
        let bar = self.item_bar(units.len(), &format!("Fetching {}s", report.kind));
        let bar = &bar;

        let results: Vec<_> = stream::iter(units)
            .map(|unit| async move {
                let result = self.fetcher.fetch(&unit.url, cancel).await;
                bar.inc(1);
                (unit, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        bar.finish_and_clear();

        let mut blobs = BTreeMap::new();
        for (unit, result) in results {
            match result {
                Ok(blob) => {
                    report.record_fetched();
                    blobs.insert(unit.index, blob);
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch {} {}: {}", unit.kind, unit.url, e);
                    report.record_failure(Stage::Fetch, unit.url.clone(), e);
                }
            }
        }

        blobs
    }

    /// Upload one batch's blobs into the batch folder.
    async fn upload_batch(
        &self,
        blobs: BTreeMap<usize, NamedBlob>,
        report: &mut BatchReport,
        cancel: &CancellationToken,
    ) {
        if blobs.is_empty() {
            return;
        }

        let blobs = assign_unique_names(blobs);
        let folder = report.folder.clone();
        let folder = folder.as_str();
        let bar = self.item_bar(blobs.len(), &format!("Uploading {}s", report.kind));
        let bar = &bar;

        let results: Vec<_> = stream::iter(&blobs)
            .map(|blob| async move {
                let result = self.uploader.upload(blob, folder, cancel).await;
                bar.inc(1);
                (blob, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        bar.finish_and_clear();

        for (blob, result) in results {
            match result {
                Ok(()) => report.record_delivered(),
                Err(e) => {
                    tracing::error!("Upload of {} to {} failed: {}", blob.filename, folder, e);
                    report.record_failure(Stage::Upload, blob.filename.clone(), e);
                }
            }
        }
    }

    fn item_bar(&self, len: usize, message: &str) -> ProgressBar {
        match &self.progress {
            Some(multi) if len > 0 => multi.add(create_item_bar(len as u64, message)),
            _ => ProgressBar::hidden(),
        }
    }
}

/// Give colliding filenames distinct suffixes, in input order.
fn assign_unique_names(blobs: BTreeMap<usize, NamedBlob>) -> Vec<NamedBlob> {
    let mut taken = HashSet::new();
    blobs
        .into_values()
        .map(|blob| {
            let name = unique_filename(&blob.filename, &mut taken);
            if name == blob.filename {
                blob
            } else {
                tracing::debug!("Renaming colliding {} to {}", blob.filename, name);
                blob.renamed(name)
            }
        })
        .collect()
}
