// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for scanbridge.

use std::net::SocketAddr;

use thiserror::Error;

/// Top-level error type for all scanbridge operations.
#[derive(Debug, Error)]
pub enum ScanBridgeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Network errors --
    #[error("cannot bind command socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("socket error: {0}")]
    Socket(String),

    #[error("SNMP request failed: {0}")]
    Snmp(String),

    #[error("SNMP agent returned error-status {status} at varbind {index}")]
    SnmpStatus { status: i64, index: i64 },

    // -- Capture errors --
    #[error("cannot start capture tool: {0}")]
    CaptureSpawn(String),

    #[error("capture tool exited with {status}: {stderr}")]
    CaptureFailed { status: String, stderr: String },

    // -- Document errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("refusing to save a document without pages")]
    EmptyDocument,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanBridgeError>;
