// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: assemble scanned page images into one document using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use scanbridge_core::ScanArea;
use scanbridge_core::error::ScanBridgeError;
use tracing::{debug, info, instrument, warn};

/// Builds multi-page PDFs from scanned page images, one image per page.
pub struct PdfWriter {
    /// Physical page size.
    page_area: ScanArea,
    /// Resolution the pages were captured at; determines their printed size.
    resolution_dpi: u32,
    /// Title metadata embedded in the PDF /Info dictionary.
    title: String,
}

impl PdfWriter {
    /// Writer for pages of `page_area` captured at `resolution_dpi` (at least 1).
    pub fn new(page_area: ScanArea, resolution_dpi: u32) -> Self {
        Self {
            page_area,
            resolution_dpi: resolution_dpi.max(1),
            title: "Scanned document".into(),
        }
    }

    /// A4 pages at the given capture resolution.
    pub fn a4(resolution_dpi: u32) -> Self {
        Self::new(ScanArea::FULL_PAGE, resolution_dpi)
    }

    fn page_dimensions(&self) -> (Mm, Mm) {
        (
            Mm(self.page_area.width_mm as f32),
            Mm(self.page_area.height_mm as f32),
        )
    }

    /// Encode the given page images, in order, as one PDF.
    ///
    /// Each image is drawn at its capture resolution, centred, and scaled down
    /// if it would not fit the page. Any undecodable page fails the whole
    /// document.
    #[instrument(skip(self, pages), fields(pages = pages.len()))]
    pub fn assemble(&self, pages: &[Vec<u8>]) -> Result<Vec<u8>, ScanBridgeError> {
        if pages.is_empty() {
            return Err(ScanBridgeError::EmptyDocument);
        }

        let (page_w, page_h) = self.page_dimensions();
        let page_w_pt = page_w.into_pt().0;
        let page_h_pt = page_h.into_pt().0;
        let dpi = self.resolution_dpi as f32;

        info!(title = %self.title, dpi, "Assembling scanned PDF");

        let mut doc = PdfDocument::new(&self.title);
        let mut pdf_pages: Vec<PdfPage> = Vec::with_capacity(pages.len());

        for (index, bytes) in pages.iter().enumerate() {
            let dynamic_image = ::image::load_from_memory(bytes).map_err(|err| {
                ScanBridgeError::ImageError(format!("page {}: cannot decode image: {}", index + 1, err))
            })?;

            let img_width = dynamic_image.width() as usize;
            let img_height = dynamic_image.height() as usize;

            let rgb_image = dynamic_image.to_rgb8();
            let raw = RawImage {
                pixels: RawImageData::U8(rgb_image.into_raw()),
                width: img_width,
                height: img_height,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            let img_w_pt = img_width as f32 / dpi * 72.0;
            let img_h_pt = img_height as f32 / dpi * 72.0;

            // Never upscale; a full-page scan at the capture dpi is exactly 1.0.
            let scale = (page_w_pt / img_w_pt).min(page_h_pt / img_h_pt).min(1.0);
            let rendered_w_pt = img_w_pt * scale;
            let rendered_h_pt = img_h_pt * scale;
            let x_offset = (page_w_pt - rendered_w_pt) / 2.0;
            let y_offset = (page_h_pt - rendered_h_pt) / 2.0;

            debug!(
                page = index + 1,
                img_width,
                img_height,
                scale,
                "Placing page image"
            );

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(x_offset)),
                    translate_y: Some(Pt(y_offset)),
                    scale_x: Some(scale),
                    scale_y: Some(scale),
                    dpi: Some(dpi),
                    rotate: None,
                },
            }];
            pdf_pages.push(PdfPage::new(page_w, page_h, ops));
        }

        doc.with_pages(pdf_pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "PDF serialiser reported warnings");
        }

        debug!(bytes = output.len(), "PDF assembled");
        Ok(output)
    }
}
