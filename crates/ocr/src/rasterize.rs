use image::DynamicImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error("Failed to read PDF: {0}")]
    Decode(String),
    #[error("Failed to render PDF page {page}: {message}")]
    Render { page: usize, message: String },
    #[error("PDF rasterizer not available — build with `pdfium` feature")]
    NotAvailable,
}

/// Abstraction over a PDF-to-image renderer. Pages come back in document
/// order; the pipeline depends on that to keep page markers sequential.
pub trait PdfRasterizer: Send + Sync {
    fn rasterize(&self, pdf_bytes: &[u8]) -> Result<Vec<DynamicImage>, RasterizeError>;
}

impl<T: PdfRasterizer + ?Sized> PdfRasterizer for Box<T> {
    fn rasterize(&self, pdf_bytes: &[u8]) -> Result<Vec<DynamicImage>, RasterizeError> {
        (**self).rasterize(pdf_bytes)
    }
}

/// Is this upload a PDF? Checked by filename extension or the `%PDF` magic.
pub fn is_pdf(bytes: &[u8], filename: Option<&str>) -> bool {
    filename
        .map(|name| name.to_lowercase().ends_with(".pdf"))
        .unwrap_or(false)
        || bytes.starts_with(b"%PDF")
}

// ── Mock rasterizer (always available, used for tests) ────────────────────────

/// Returns a pre-set page list regardless of input.
pub struct MockRasterizer {
    pub pages: Vec<DynamicImage>,
}

impl MockRasterizer {
    pub fn new(pages: Vec<DynamicImage>) -> Self {
        Self { pages }
    }
}

impl PdfRasterizer for MockRasterizer {
    fn rasterize(&self, _pdf_bytes: &[u8]) -> Result<Vec<DynamicImage>, RasterizeError> {
        Ok(self.pages.clone())
    }
}

/// Stand-in for deployments without a PDF renderer: image uploads still work,
/// PDF uploads fail with a clear error.
pub struct UnsupportedRasterizer;

impl PdfRasterizer for UnsupportedRasterizer {
    fn rasterize(&self, _pdf_bytes: &[u8]) -> Result<Vec<DynamicImage>, RasterizeError> {
        Err(RasterizeError::NotAvailable)
    }
}

// ── pdfium backend (optional, gated behind `pdfium` feature) ──────────────────

#[cfg(feature = "pdfium")]
pub mod pdfium_backend {
    use super::{PdfRasterizer, RasterizeError};
    use image::DynamicImage;
    use pdfium_render::prelude::*;

    /// Renders each page at roughly 200 DPI for a letter-width page, which is
    /// enough for receipt-sized print.
    const TARGET_WIDTH: i32 = 1700;

    pub struct PdfiumRasterizer;

    impl PdfRasterizer for PdfiumRasterizer {
        fn rasterize(&self, pdf_bytes: &[u8]) -> Result<Vec<DynamicImage>, RasterizeError> {
            let bindings = Pdfium::bind_to_system_library()
                .map_err(|e| RasterizeError::Decode(format!("pdfium unavailable: {e:?}")))?;
            let pdfium = Pdfium::new(bindings);

            let document = pdfium
                .load_pdf_from_byte_slice(pdf_bytes, None)
                .map_err(|e| RasterizeError::Decode(format!("{e:?}")))?;

            let config = PdfRenderConfig::new().set_target_width(TARGET_WIDTH);

            let mut pages = Vec::new();
            for (index, page) in document.pages().iter().enumerate() {
                let bitmap = page.render_with_config(&config).map_err(|e| {
                    RasterizeError::Render { page: index + 1, message: format!("{e:?}") }
                })?;
                pages.push(bitmap.as_image());
            }
            Ok(pages)
        }
    }
}
