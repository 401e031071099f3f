// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanbridge-document: Turns the captured page images into one PDF per job
// and writes it to the output directory.

pub mod pdf;
pub mod sink;

pub use pdf::writer::PdfWriter;
pub use sink::{DocumentSink, PdfDocumentSink, SavedDocument, document_file_name};
