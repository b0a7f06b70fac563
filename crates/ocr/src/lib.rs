pub mod category;
pub mod classify;
pub mod pipeline;
pub mod preprocess;
pub mod rasterize;
pub mod recognizer;
pub mod total;

pub use category::{CategoryTable, DEFAULT_CATEGORY};
pub use classify::{LineClassifier, STOP_KEYWORDS};
pub use pipeline::{ParsedReceipt, PipelineError, ReceiptPipeline};
pub use preprocess::{binarize, prepare_for_ocr, prepare_for_ocr_from_bytes, PreprocessError};
pub use rasterize::{MockRasterizer, PdfRasterizer, RasterizeError, UnsupportedRasterizer};
pub use recognizer::{FailingRecognizer, MockRecognizer, OcrBackend, OcrError};
pub use total::extract_total;
