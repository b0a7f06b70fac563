use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use divvy_ocr::{OcrBackend, PdfRasterizer, ReceiptPipeline};
use divvy_storage::DbPool;

mod error;
mod routes;

/// Uploads above this size are rejected before they reach the pipeline.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub(crate) type Pipeline = ReceiptPipeline<Box<dyn OcrBackend>, Box<dyn PdfRasterizer>>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub db: DbPool,
    pub pipeline: Arc<Pipeline>,
}

pub(crate) fn app(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(routes::upload_receipt))
        .route("/split", post(routes::split_expense))
        .route("/receipts", get(routes::list_receipts).post(routes::create_receipt))
        .route("/receipts/{id}", get(routes::get_receipt))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let db_path = std::env::var("DIVVY_DB").unwrap_or_else(|_| "divvy.db".to_string());
    let addr = std::env::var("DIVVY_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let db = divvy_storage::create_db(Path::new(&db_path))
        .await
        .with_context(|| format!("Failed to open database at {db_path}"))?;

    let state = AppState {
        db,
        pipeline: Arc::new(ReceiptPipeline::new(build_recognizer(), build_rasterizer())),
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("divvy-server listening on {addr}");

    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[cfg(feature = "tesseract")]
fn build_recognizer() -> Box<dyn OcrBackend> {
    Box::new(divvy_ocr::recognizer::tesseract_backend::TesseractRecognizer::new(None, "eng"))
}

/// Without the `tesseract` feature the server still runs end to end;
/// uploads just OCR to empty text.
#[cfg(not(feature = "tesseract"))]
fn build_recognizer() -> Box<dyn OcrBackend> {
    Box::new(divvy_ocr::MockRecognizer::new(""))
}

#[cfg(feature = "pdfium")]
fn build_rasterizer() -> Box<dyn PdfRasterizer> {
    Box::new(divvy_ocr::rasterize::pdfium_backend::PdfiumRasterizer)
}

/// Without the `pdfium` feature, image uploads work and PDF uploads fail
/// with a clear error.
#[cfg(not(feature = "pdfium"))]
fn build_rasterizer() -> Box<dyn PdfRasterizer> {
    Box::new(divvy_ocr::UnsupportedRasterizer)
}
