// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document persistence: encode the buffered pages and write one file per job.

use std::path::PathBuf;

use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

use scanbridge_core::error::{Result, ScanBridgeError};

use crate::pdf::PdfWriter;

/// A document that made it to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDocument {
    pub path: PathBuf,
    pub pages: usize,
    pub bytes: usize,
    /// Hex SHA-256 of the written file.
    pub sha256: String,
}

/// Where finished documents go.
///
/// Implementations are called from a blocking thread, so they may do
/// CPU-heavy encoding and synchronous I/O.
pub trait DocumentSink: Send + Sync + 'static {
    /// Encode `pages` (in order) as one document and persist it.
    fn save(&self, pages: &[Vec<u8>]) -> Result<SavedDocument>;
}

/// File name for a document saved at `at`: `SCAN_<Y-m-d_H.M.S>.<ext>`.
pub fn document_file_name(at: DateTime<Local>, extension: &str) -> String {
    format!("SCAN_{}.{}", at.format("%Y-%m-%d_%H.%M.%S"), extension)
}

/// Writes PDFs into a fixed output directory.
pub struct PdfDocumentSink {
    output_dir: PathBuf,
    writer: PdfWriter,
}

impl PdfDocumentSink {
    /// Sink writing into `output_dir`, which must already exist.
    pub fn new(output_dir: impl Into<PathBuf>, writer: PdfWriter) -> Self {
        Self {
            output_dir: output_dir.into(),
            writer,
        }
    }
}

impl DocumentSink for PdfDocumentSink {
    #[instrument(skip_all, fields(pages = pages.len(), dir = %self.output_dir.display()))]
    fn save(&self, pages: &[Vec<u8>]) -> Result<SavedDocument> {
        if pages.is_empty() {
            return Err(ScanBridgeError::EmptyDocument);
        }

        let encoded = self.writer.assemble(pages)?;
        let path = self.output_dir.join(document_file_name(Local::now(), "pdf"));

        info!(pages = pages.len(), path = %path.display(), "Saving document");
        std::fs::write(&path, &encoded)?;

        Ok(SavedDocument {
            path,
            pages: pages.len(),
            bytes: encoded.len(),
            sha256: hex::encode(Sha256::digest(&encoded)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::writer::tests::jpeg_page;
    use chrono::TimeZone;

    #[test]
    fn file_name_uses_local_save_time() {
        let at = Local
            .with_ymd_and_hms(2026, 3, 7, 9, 5, 2)
            .single()
            .expect("unambiguous local time");
        assert_eq!(document_file_name(at, "pdf"), "SCAN_2026-03-07_09.05.02.pdf");
    }

    #[test]
    fn save_writes_pdf_into_output_dir() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sink = PdfDocumentSink::new(dir.path(), PdfWriter::a4(200));

        let saved = sink
            .save(&[jpeg_page(30), jpeg_page(200)])
            .expect("save");

        assert_eq!(saved.pages, 2);
        assert!(saved.path.starts_with(dir.path()));
        let name = saved.path.file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.starts_with("SCAN_") && name.ends_with(".pdf"));

        let on_disk = std::fs::read(&saved.path).expect("read back");
        assert_eq!(on_disk.len(), saved.bytes);
        assert_eq!(saved.sha256, hex::encode(Sha256::digest(&on_disk)));
        let doc = lopdf::Document::load_mem(&on_disk).expect("parse");
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn save_refuses_empty_buffer() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sink = PdfDocumentSink::new(dir.path(), PdfWriter::a4(200));

        assert!(matches!(sink.save(&[]), Err(ScanBridgeError::EmptyDocument)));
        assert_eq!(std::fs::read_dir(dir.path()).expect("list").count(), 0);
    }

    #[test]
    fn missing_output_dir_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sink = PdfDocumentSink::new(dir.path().join("gone"), PdfWriter::a4(200));

        assert!(matches!(
            sink.save(&[jpeg_page(1)]),
            Err(ScanBridgeError::Io(_))
        ));
    }
}
