use thiserror::Error;

use divvy_core::{ExpenseItem, Money};

use crate::category::CategoryTable;
use crate::classify::LineClassifier;
use crate::preprocess::{self, PreprocessError};
use crate::rasterize::{self, PdfRasterizer, RasterizeError};
use crate::recognizer::{OcrBackend, OcrError};
use crate::total;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("PDF rasterization failed: {0}")]
    Rasterize(#[from] RasterizeError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
}

/// The result of parsing one uploaded receipt.
#[derive(Debug, Clone)]
pub struct ParsedReceipt {
    /// Raw OCR text, with `--- Page N ---` markers for multi-page PDFs.
    pub raw_text: String,
    /// Extracted total, or 0.00 when no plausible total was found.
    pub total_amount: Money,
    /// Line items recovered from the text, in reading order.
    pub items: Vec<ExpenseItem>,
}

/// Orchestrates: detect PDF → rasterize → preprocess → OCR → classify + total.
///
/// Synchronous and CPU-bound; callers on an async runtime should wrap calls
/// in their blocking-task facility.
pub struct ReceiptPipeline<R: OcrBackend, P: PdfRasterizer> {
    recognizer: R,
    rasterizer: P,
    classifier: LineClassifier,
}

impl<R: OcrBackend, P: PdfRasterizer> ReceiptPipeline<R, P> {
    pub fn new(recognizer: R, rasterizer: P) -> Self {
        Self::with_categories(recognizer, rasterizer, CategoryTable::default())
    }

    pub fn with_categories(recognizer: R, rasterizer: P, categories: CategoryTable) -> Self {
        Self {
            recognizer,
            rasterizer,
            classifier: LineClassifier::new(categories),
        }
    }

    /// Run the full parse: text extraction, then total and item extraction.
    pub fn process(
        &self,
        data: &[u8],
        filename: Option<&str>,
    ) -> Result<ParsedReceipt, PipelineError> {
        let raw_text = self.extract_text(data, filename)?;
        let total_amount = total::extract_total(&raw_text).unwrap_or_else(Money::zero);
        let items = self.classifier.classify(&raw_text);
        tracing::debug!(
            total = %total_amount,
            items = items.len(),
            chars = raw_text.len(),
            "receipt parsed"
        );
        Ok(ParsedReceipt { raw_text, total_amount, items })
    }

    /// OCR an upload into text. PDFs are rasterized page by page and the
    /// per-page texts are joined with `--- Page N ---` markers, preserving
    /// page order; empty pages are dropped. Raster images go through one
    /// preprocess + recognize pass.
    pub fn extract_text(
        &self,
        data: &[u8],
        filename: Option<&str>,
    ) -> Result<String, PipelineError> {
        if rasterize::is_pdf(data, filename) {
            let pages = self.rasterizer.rasterize(data)?;
            let mut sections = Vec::new();
            for (index, page) in pages.into_iter().enumerate() {
                let image_bytes = preprocess::encode_as_png(preprocess::binarize(page))?;
                let page_text = self.recognizer.recognize(&image_bytes)?;
                if !page_text.trim().is_empty() {
                    sections.push(format!("\n--- Page {} ---\n{}", index + 1, page_text));
                }
            }
            Ok(sections.join("\n").trim().to_string())
        } else {
            let image_bytes = preprocess::prepare_for_ocr_from_bytes(data)?;
            Ok(self.recognizer.recognize(&image_bytes)?.trim().to_string())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterize::{MockRasterizer, UnsupportedRasterizer};
    use crate::recognizer::{FailingRecognizer, MockRecognizer};
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use std::io::Cursor;

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn blank_page() -> DynamicImage {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([255u8]));
        DynamicImage::ImageLuma8(img)
    }

    const RECEIPT_TEXT: &str = "WALMART\nStore #1234\nGV MILK 2% 3.99\nBREAD 2.49\nSUBTOTAL 6.48\nTAX 0.52\nTOTAL 7.00";

    #[test]
    fn image_upload_parses_items_and_total() {
        let pipeline = ReceiptPipeline::new(
            MockRecognizer::new(RECEIPT_TEXT),
            UnsupportedRasterizer,
        );
        let parsed = pipeline.process(&tiny_png(), Some("receipt.png")).unwrap();

        assert_eq!(parsed.total_amount, Money::from_cents(700));
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].item, "gv milk 2%");
        assert_eq!(parsed.items[0].category, "Grocery");
        assert_eq!(parsed.items[1].item, "bread");
        assert!(parsed.raw_text.contains("WALMART"));
    }

    #[test]
    fn missing_total_defaults_to_zero() {
        let pipeline = ReceiptPipeline::new(
            MockRecognizer::new("no numbers here at all"),
            UnsupportedRasterizer,
        );
        let parsed = pipeline.process(&tiny_png(), None).unwrap();
        assert!(parsed.total_amount.is_zero());
        assert!(parsed.items.is_empty());
    }

    #[test]
    fn pdf_pages_are_marked_and_ordered() {
        let pipeline = ReceiptPipeline::new(
            MockRecognizer::new("page body"),
            MockRasterizer::new(vec![blank_page(), blank_page()]),
        );
        let text = pipeline.extract_text(b"%PDF-1.4 ...", None).unwrap();

        let first = text.find("--- Page 1 ---").expect("page 1 marker");
        let second = text.find("--- Page 2 ---").expect("page 2 marker");
        assert!(first < second);
        // Leading whitespace trimmed, so the text starts at the first marker.
        assert!(text.starts_with("--- Page 1 ---"));
    }

    #[test]
    fn pdf_detected_by_filename_without_magic() {
        let pipeline = ReceiptPipeline::new(
            MockRecognizer::new("scanned"),
            MockRasterizer::new(vec![blank_page()]),
        );
        let text = pipeline
            .extract_text(b"not actually pdf bytes", Some("scan.pdf"))
            .unwrap();
        assert!(text.contains("--- Page 1 ---"));
    }

    #[test]
    fn blank_pdf_pages_are_dropped() {
        let pipeline = ReceiptPipeline::new(
            MockRecognizer::new("   \n  "),
            MockRasterizer::new(vec![blank_page(), blank_page()]),
        );
        let text = pipeline.extract_text(b"%PDF", None).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn pdf_without_rasterizer_fails() {
        let pipeline = ReceiptPipeline::new(
            MockRecognizer::new("unreachable"),
            UnsupportedRasterizer,
        );
        let err = pipeline.process(b"%PDF-1.7", None).unwrap_err();
        assert!(matches!(err, PipelineError::Rasterize(_)));
    }

    #[test]
    fn engine_failure_is_wrapped_with_context() {
        let pipeline = ReceiptPipeline::new(
            FailingRecognizer::new("segfault in engine"),
            UnsupportedRasterizer,
        );
        let err = pipeline.process(&tiny_png(), None).unwrap_err();
        assert!(matches!(err, PipelineError::Ocr(_)));
        assert!(err.to_string().contains("segfault in engine"));
    }

    #[test]
    fn undecodable_image_is_a_preprocess_error() {
        let pipeline = ReceiptPipeline::new(
            MockRecognizer::new("unreachable"),
            UnsupportedRasterizer,
        );
        let err = pipeline.process(b"not an image", None).unwrap_err();
        assert!(matches!(err, PipelineError::Preprocess(_)));
    }
}
