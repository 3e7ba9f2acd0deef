//! Image conditioning pipeline.
//!
//! Turns the raw code image into a clean binary buffer the recognition
//! engine can read: upscale, luminance, auto-invert, optional denoise,
//! binarize. Pure pixel transforms with no page access; the session feeds
//! in decoded PNG bytes and gets a black-text-on-white buffer back.

use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbaImage};

/// Conditioning tunables, consumed as a plain record.
#[derive(Clone, Copy, Debug)]
pub struct ConditionParams {
    /// Upscale factor, expected in 2..=4
    pub scale_factor: u32,
    /// Whether to run the 3x3 median pass
    pub denoise: bool,
    /// Binarization threshold, expected in 130..=145
    pub threshold: u8,
}

/// Runs the full conditioning pipeline in its fixed order:
/// upscale → luminance → auto-invert → median (optional) → binarize.
pub fn condition(src: &RgbaImage, params: &ConditionParams) -> GrayImage {
    // Nearest-neighbour keeps hard glyph edges instead of blurring them.
    let scaled = image::imageops::resize(
        src,
        src.width() * params.scale_factor,
        src.height() * params.scale_factor,
        FilterType::Nearest,
    );

    let mut lum = luminance_map(&scaled);

    // One global decision per image: a dark image is assumed to be light
    // text on a dark background and is normalized to the dark-on-light
    // convention before thresholding.
    if mean_luminance(&lum) < 128.0 {
        invert_in_place(&mut lum);
    }

    if params.denoise {
        lum = median_denoise(&lum);
    }

    binarize_in_place(&mut lum, params.threshold);
    lum
}

/// Computes per-pixel luminance with the ITU-R BT.601 weights:
/// Y = 0.299*R + 0.587*G + 0.114*B, rounded to the nearest integer.
pub fn luminance_map(img: &RgbaImage) -> GrayImage {
    let mut out = GrayImage::new(img.width(), img.height());
    for (x, y, pixel) in img.enumerate_pixels() {
        let y_val = 0.299 * pixel[0] as f64 + 0.587 * pixel[1] as f64 + 0.114 * pixel[2] as f64;
        out.put_pixel(x, y, Luma([y_val.round() as u8]));
    }
    out
}

/// Returns the mean luminance over the whole buffer, 0.0 to 255.0.
pub fn mean_luminance(img: &GrayImage) -> f64 {
    if img.width() == 0 || img.height() == 0 {
        return 0.0;
    }
    let total: f64 = img.pixels().map(|p| p[0] as f64).sum();
    total / (img.width() * img.height()) as f64
}

/// Inverts every luminance value. Self-inverse.
pub fn invert_in_place(img: &mut GrayImage) {
    for pixel in img.pixels_mut() {
        pixel[0] = 255 - pixel[0];
    }
}

/// Applies a 3x3 median filter over interior pixels.
///
/// Border pixels are left unfiltered; that is the documented edge policy,
/// not an oversight to fix here.
pub fn median_denoise(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = img.clone();
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut window = [0u8; 9];
            let mut i = 0;
            for dy in 0..3 {
                for dx in 0..3 {
                    window[i] = img.get_pixel(x + dx - 1, y + dy - 1)[0];
                    i += 1;
                }
            }
            window.sort_unstable();
            out.put_pixel(x, y, Luma([window[4]]));
        }
    }
    out
}

/// Binarizes in place: luminance >= threshold becomes pure white,
/// everything else pure black. Idempotent for any threshold in 1..=255.
pub fn binarize_in_place(img: &mut GrayImage, threshold: u8) {
    for pixel in img.pixels_mut() {
        pixel[0] = if pixel[0] >= threshold { 255 } else { 0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// 20x8 test card: uniform background with a block of text pixels.
    /// Text occupies 20 of the 160 pixels so the background dominates
    /// the mean.
    fn test_card(background: u8, text: u8) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(20, 8, Rgba([background, background, background, 255]));
        for y in 2..4 {
            for x in 5..15 {
                img.put_pixel(x, y, Rgba([text, text, text, 255]));
            }
        }
        img
    }

    const BASE: ConditionParams = ConditionParams {
        scale_factor: 2,
        denoise: false,
        threshold: 135,
    };

    #[test]
    fn test_bright_background_not_inverted() {
        // Background 200, text 10: mean is well above 128, so no invert.
        let out = condition(&test_card(200, 10), &BASE);
        assert_eq!(out.get_pixel(0, 0)[0], 255, "background must binarize to white");
        assert_eq!(out.get_pixel(12, 5)[0], 0, "text must binarize to black");
    }

    #[test]
    fn test_inverted_card_produces_identical_output() {
        // Same card with luminance flipped: mean < 128 triggers the
        // auto-invert, so the binary output is bit-identical.
        let bright = condition(&test_card(200, 10), &BASE);
        let dark = condition(&test_card(55, 245), &BASE);
        assert_eq!(bright.as_raw(), dark.as_raw());
    }

    #[test]
    fn test_luminance_weights() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        // 0.299 * 255 = 76.245 → rounds to 76
        assert_eq!(luminance_map(&img).get_pixel(0, 0)[0], 76);
    }

    #[test]
    fn test_invert_is_self_inverse() {
        let mut img = GrayImage::from_fn(7, 5, |x, y| Luma([(x * 31 + y * 17) as u8]));
        let original = img.clone();
        invert_in_place(&mut img);
        assert_ne!(img.as_raw(), original.as_raw());
        invert_in_place(&mut img);
        assert_eq!(img.as_raw(), original.as_raw());
    }

    #[test]
    fn test_binarize_is_idempotent() {
        let mut img = GrayImage::from_fn(10, 4, |x, y| Luma([(x * 23 + y * 41) as u8]));
        binarize_in_place(&mut img, 135);
        let once = img.clone();
        binarize_in_place(&mut img, 135);
        assert_eq!(img.as_raw(), once.as_raw());
    }

    #[test]
    fn test_binarize_threshold_inclusive_on_white_side() {
        let mut img = GrayImage::new(2, 1);
        img.put_pixel(0, 0, Luma([135]));
        img.put_pixel(1, 0, Luma([134]));
        binarize_in_place(&mut img, 135);
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        assert_eq!(img.get_pixel(1, 0)[0], 0);
    }

    #[test]
    fn test_median_removes_isolated_speck() {
        let mut img = GrayImage::from_pixel(5, 5, Luma([255]));
        img.put_pixel(2, 2, Luma([0]));
        let out = median_denoise(&img);
        assert_eq!(out.get_pixel(2, 2)[0], 255);
    }

    #[test]
    fn test_median_leaves_border_unfiltered() {
        let mut img = GrayImage::from_pixel(5, 5, Luma([255]));
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(4, 2, Luma([0]));
        let out = median_denoise(&img);
        // Border specks survive; only interior pixels are filtered.
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(4, 2)[0], 0);
    }

    #[test]
    fn test_median_too_small_image_unchanged() {
        let img = GrayImage::from_fn(2, 2, |x, y| Luma([(x + y) as u8 * 90]));
        let out = median_denoise(&img);
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn test_upscale_dimensions() {
        let out = condition(&test_card(200, 10), &ConditionParams { scale_factor: 4, ..BASE });
        assert_eq!(out.dimensions(), (80, 32));
    }
}
