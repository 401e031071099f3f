// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan coordinator: the single consumer of the command queue.
//
// Commands are processed strictly one at a time because the scanner cannot
// serve two captures at once.  The coordinator alone owns the page buffer:
//
//   MultiPage        capture a page, buffer it
//   LastPage         capture a page, buffer it, save the buffer
//   FinishMultiPage  dummy capture, save the buffer
//   AbortMultiPage   dummy capture, discard the buffer
//
// The dummy capture exists for the device: it keeps its menu busy until it
// has seen a scan after a button event.  A command whose capture fails leaves
// the buffer untouched.  A failed save keeps the pages buffered.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use scanbridge_core::{BridgeConfig, CaptureFormat, CaptureRequest, Command, JobId, ScanArea};
use scanbridge_document::{DocumentSink, SavedDocument};
use scanbridge_net::CommandReceiver;

use crate::capture::{CaptureInvoker, CapturePolicy, capture_with_retry};

/// Capture parameters shared by every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub resolution_dpi: u32,
    pub format: CaptureFormat,
    pub device: Option<String>,
    pub policy: CapturePolicy,
}

impl CoordinatorSettings {
    /// Capture settings taken from the bridge configuration.
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            resolution_dpi: config.resolution_dpi,
            format: config.capture_format,
            device: config.scanner_device.clone(),
            policy: CapturePolicy {
                settle_delay: config.settle_delay(),
                attempts: config.capture_attempts,
            },
        }
    }
}

/// What one command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Page added; `pages` is the new buffer size.
    Buffered { pages: usize },
    Saved(SavedDocument),
    Discarded { pages: usize },
    /// Capture failed on every attempt; the buffer is as it was.
    CaptureFailed,
    /// Saving failed; `pages` are still buffered.
    SaveFailed { pages: usize },
    /// Save requested with an empty buffer.
    NothingToSave,
}

/// Single consumer of the command queue and sole owner of the page buffer.
pub struct ScanCoordinator<C, S> {
    invoker: C,
    sink: Arc<S>,
    settings: CoordinatorSettings,
    pages: Vec<Vec<u8>>,
    job: JobId,
}

impl<C: CaptureInvoker, S: DocumentSink> ScanCoordinator<C, S> {
    /// Coordinator with an empty buffer and a fresh job id.
    pub fn new(invoker: C, sink: S, settings: CoordinatorSettings) -> Self {
        Self {
            invoker,
            sink: Arc::new(sink),
            settings,
            pages: Vec::new(),
            job: JobId::new(),
        }
    }

    /// Number of buffered pages.
    pub fn buffered_pages(&self) -> usize {
        self.pages.len()
    }

    /// Process commands until the queue closes or `shutdown` fires.
    ///
    /// Shutdown interrupts a capture in progress. A save that has started is
    /// always allowed to finish, so its result is logged and failed pages are
    /// reported as lost.
    pub async fn run(mut self, mut commands: CommandReceiver, shutdown: CancellationToken) {
        info!("scan coordinator ready");

        loop {
            let command = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("scan coordinator received shutdown signal");
                    break;
                }
                next = commands.recv() => match next {
                    Some(command) => command,
                    None => {
                        info!("command queue closed");
                        break;
                    }
                },
            };

            let image = tokio::select! {
                _ = shutdown.cancelled() => {
                    warn!(%command, "shutdown interrupted capture");
                    break;
                }
                image = self.capture_for(command) => image,
            };
            self.apply(command, image).await;
        }

        if !self.pages.is_empty() {
            warn!(job = %self.job, pages = self.pages.len(), "unsaved pages discarded at shutdown");
        }
        info!("scan coordinator stopped");
    }

    /// Process one command to completion.
    pub async fn handle(&mut self, command: Command) -> Outcome {
        let image = self.capture_for(command).await;
        self.apply(command, image).await
    }

    /// Capture phase of `command`: a full page or the dummy area.
    async fn capture_for(&self, command: Command) -> Option<Vec<u8>> {
        info!(%command, job = %self.job, buffered = self.pages.len(), "starting command");

        let area = if command.captures_page() {
            ScanArea::FULL_PAGE
        } else {
            ScanArea::DUMMY
        };
        self.capture(command, area).await
    }

    /// Buffer phase of `command`, given the result of its capture.
    async fn apply(&mut self, command: Command, image: Option<Vec<u8>>) -> Outcome {
        let Some(image) = image else {
            return Outcome::CaptureFailed;
        };

        match command {
            Command::MultiPage => {
                self.pages.push(image);
                info!(pages = self.pages.len(), "page buffered");
                Outcome::Buffered {
                    pages: self.pages.len(),
                }
            }
            Command::LastPage => {
                self.pages.push(image);
                self.save().await
            }
            Command::FinishMultiPage => self.save().await,
            Command::AbortMultiPage => {
                let pages = self.pages.len();
                self.pages.clear();
                self.job = JobId::new();
                info!(pages, "discarded buffered pages");
                Outcome::Discarded { pages }
            }
        }
    }

    async fn capture(&self, command: Command, area: ScanArea) -> Option<Vec<u8>> {
        let request = CaptureRequest {
            resolution_dpi: self.settings.resolution_dpi,
            area,
            format: self.settings.format,
            device: self.settings.device.clone(),
        };

        match capture_with_retry(&self.invoker, &request, &self.settings.policy).await {
            Ok(image) => Some(image),
            Err(e) => {
                error!(
                    %command,
                    attempts = self.settings.policy.attempts,
                    error = %e,
                    "capture failed, giving up on command"
                );
                None
            }
        }
    }

    /// Hand the buffer to the sink. Cleared only on success.
    async fn save(&mut self) -> Outcome {
        if self.pages.is_empty() {
            warn!(job = %self.job, "no buffered pages, nothing to save");
            return Outcome::NothingToSave;
        }

        let sink = Arc::clone(&self.sink);
        let pages = std::mem::take(&mut self.pages);
        let count = pages.len();

        let joined = tokio::task::spawn_blocking(move || {
            let result = sink.save(&pages);
            (pages, result)
        })
        .await;

        match joined {
            Ok((_, Ok(saved))) => {
                info!(
                    job = %self.job,
                    pages = saved.pages,
                    path = %saved.path.display(),
                    sha256 = %saved.sha256,
                    "document saved"
                );
                self.job = JobId::new();
                Outcome::Saved(saved)
            }
            Ok((pages, Err(e))) => {
                error!(
                    job = %self.job,
                    pages = count,
                    error = %e,
                    "DOCUMENT NOT SAVED, pages kept in buffer"
                );
                self.pages = pages;
                Outcome::SaveFailed { pages: count }
            }
            Err(e) => {
                error!(
                    job = %self.job,
                    pages = count,
                    error = %e,
                    "DOCUMENT NOT SAVED, save task aborted and pages lost"
                );
                Outcome::SaveFailed { pages: 0 }
            }
        }
    }
}
