// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanbridge-scan: Runs the capture tool and turns queued button commands
// into buffered pages and saved documents.

pub mod capture;
pub mod coordinator;

pub use capture::{CaptureInvoker, CapturePolicy, ScanImage, capture_with_retry};
pub use coordinator::{CoordinatorSettings, Outcome, ScanCoordinator};
