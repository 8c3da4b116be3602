//! Image normalization for OCR: grayscale, autocontrast, and upsampling.
//!
//! Scanned front matter is often low-contrast and small; stretching the
//! intensity histogram to the full dynamic range and doubling the resolution
//! measurably improves what the text-detection service can read. The whole
//! stage is a pure function with a fixed, deterministic sequence.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};

/// Normalize one rendered page for OCR.
///
/// Deterministic sequence: single-channel grayscale → clip-free autocontrast
/// → resize to exactly `scale×` width and height with Lanczos resampling.
/// `scale` is expected to be ≥ 1 (the config builder clamps it).
pub fn normalize_for_ocr(image: &DynamicImage, scale: u32) -> DynamicImage {
    let gray = image.to_luma8();
    let stretched = autocontrast(gray);
    let (width, height) = stretched.dimensions();
    let resized = image::imageops::resize(
        &stretched,
        width * scale,
        height * scale,
        FilterType::Lanczos3,
    );
    DynamicImage::ImageLuma8(resized)
}

/// Stretch the observed intensity range linearly to 0..=255.
///
/// Clip-free: no percentile cutoff, the darkest pixel maps to 0 and the
/// brightest to 255. A flat image (min == max) passes through unchanged.
fn autocontrast(image: GrayImage) -> GrayImage {
    let (mut min, mut max) = (u8::MAX, u8::MIN);
    for pixel in image.pixels() {
        min = min.min(pixel.0[0]);
        max = max.max(pixel.0[0]);
    }
    if min >= max {
        return image;
    }

    let range = (max - min) as u32;
    let mut out = image;
    for pixel in out.pixels_mut() {
        let v = (pixel.0[0] - min) as u32;
        pixel.0[0] = ((v * 255 + range / 2) / range) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};

    fn gray_image(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| Luma([f(x, y)])))
    }

    #[test]
    fn output_is_grayscale_and_doubled() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            20,
            30,
            Rgba([200, 100, 50, 255]),
        ));
        let out = normalize_for_ocr(&img, 2);
        assert_eq!(out.width(), 40);
        assert_eq!(out.height(), 60);
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn contrast_is_stretched_to_full_range() {
        // Narrow band 100..=150 must stretch to touch both extremes.
        let img = gray_image(51, 1, |x, _| (100 + x) as u8);
        let out = normalize_for_ocr(&img, 1).to_luma8();

        let values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(*values.iter().min().unwrap(), 0);
        assert_eq!(*values.iter().max().unwrap(), 255);
    }

    #[test]
    fn flat_image_passes_through() {
        let img = gray_image(8, 8, |_, _| 77);
        let out = normalize_for_ocr(&img, 1).to_luma8();
        assert!(out.pixels().all(|p| p.0[0] == 77));
    }

    #[test]
    fn normalization_is_deterministic() {
        let img = gray_image(16, 16, |x, y| ((x * 7 + y * 13) % 200) as u8);
        let a = normalize_for_ocr(&img, 2);
        let b = normalize_for_ocr(&img, 2);
        assert_eq!(a.to_luma8().into_raw(), b.to_luma8().into_raw());
    }
}
