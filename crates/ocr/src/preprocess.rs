use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to load image: {0}")]
    Load(#[from] image::ImageError),
    #[error("Failed to encode processed image: {0}")]
    Encode(String),
}

/// Load an image file, binarize it, and return PNG bytes ready for OCR.
pub fn prepare_for_ocr(path: &Path) -> Result<Vec<u8>, PreprocessError> {
    let img = image::open(path)?;
    encode_as_png(binarize(img))
}

/// Process raw image bytes (JPEG / PNG / GIF / …) and return binarized PNG bytes.
pub fn prepare_for_ocr_from_bytes(data: &[u8]) -> Result<Vec<u8>, PreprocessError> {
    let img = image::load_from_memory(data)?;
    encode_as_png(binarize(img))
}

/// Grayscale → 5×5 Gaussian blur → adaptive Gaussian threshold (block 11,
/// C = 2) → one 2×2 dilation pass. Output has the same dimensions as the
/// input and every pixel is either 0 or 255.
pub fn binarize(img: DynamicImage) -> DynamicImage {
    let gray: GrayImage = img.to_luma8();
    let blurred = gaussian_blur_5x5(&gray);
    let thresholded = adaptive_threshold(&blurred, 11, 2.0);
    let dilated = dilate_2x2(&thresholded);
    DynamicImage::ImageLuma8(dilated)
}

pub fn encode_as_png(img: DynamicImage) -> Result<Vec<u8>, PreprocessError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| PreprocessError::Encode(e.to_string()))?;
    Ok(buf)
}

// ── Filters ──────────────────────────────────────────────────────────────────

/// Separable binomial blur: [1, 4, 6, 4, 1] / 16 per axis, replicated borders.
fn gaussian_blur_5x5(src: &GrayImage) -> GrayImage {
    const KERNEL: [u32; 5] = [1, 4, 6, 4, 1];
    let (w, h) = src.dimensions();

    let horizontal: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_fn(w, h, |x, y| {
        let mut acc = 0u32;
        for (i, k) in KERNEL.iter().enumerate() {
            let sx = clamp_index(x as i64 + i as i64 - 2, w);
            acc += k * src.get_pixel(sx, y)[0] as u32;
        }
        Luma([(acc / 16) as u8])
    });

    ImageBuffer::from_fn(w, h, |x, y| {
        let mut acc = 0u32;
        for (i, k) in KERNEL.iter().enumerate() {
            let sy = clamp_index(y as i64 + i as i64 - 2, h);
            acc += k * horizontal.get_pixel(x, sy)[0] as u32;
        }
        Luma([(acc / 16) as u8])
    })
}

/// Adaptive Gaussian threshold: each pixel is compared against the
/// Gaussian-weighted mean of its `block × block` neighborhood minus `c`.
/// Brighter than the local mean → 255, else 0. Borders replicate.
fn adaptive_threshold(src: &GrayImage, block: usize, c: f32) -> GrayImage {
    let (w, h) = src.dimensions();
    let weights = gaussian_window(block);
    let radius = (block / 2) as i64;

    // Separable weighted mean: horizontal pass, then vertical.
    let mut horizontal = vec![0f32; (w * h) as usize];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (i, wt) in weights.iter().enumerate() {
                let sx = clamp_index(x as i64 + i as i64 - radius, w);
                acc += wt * src.get_pixel(sx, y)[0] as f32;
            }
            horizontal[(y * w + x) as usize] = acc;
        }
    }

    ImageBuffer::from_fn(w, h, |x, y| {
        let mut mean = 0f32;
        for (i, wt) in weights.iter().enumerate() {
            let sy = clamp_index(y as i64 + i as i64 - radius, h);
            mean += wt * horizontal[(sy * w + x) as usize];
        }
        let px = src.get_pixel(x, y)[0] as f32;
        Luma([if px > mean - c { 255 } else { 0 }])
    })
}

/// Normalized 1-D Gaussian weights for a window of `size` taps, using the
/// OpenCV sigma convention for an unspecified sigma:
/// `sigma = 0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
fn gaussian_window(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let mut weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-d * d / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// One dilation pass with a 2×2 structuring element: thickens strokes so
/// thin receipt print survives OCR.
fn dilate_2x2(src: &GrayImage) -> GrayImage {
    let (w, h) = src.dimensions();
    ImageBuffer::from_fn(w, h, |x, y| {
        let mut max = 0u8;
        for dy in 0..2 {
            for dx in 0..2 {
                let sx = clamp_index(x as i64 + dx, w);
                let sy = clamp_index(y as i64 + dy, h);
                max = max.max(src.get_pixel(sx, sy)[0]);
            }
        }
        Luma([max])
    })
}

fn clamp_index(i: i64, len: u32) -> u32 {
    i.clamp(0, len as i64 - 1) as u32
}

// ── Tests ─────────────────────────────────────────────────────────────────────
