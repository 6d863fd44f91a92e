//! Image preprocessing module
//!
//! Expands one decoded source image into a fixed set of nine variants,
//! each tuned for a different failure mode of OCR on scanned tabular
//! documents: uneven illumination, thin strokes, speckle noise, fonts
//! too small for the engine's defaults. Which variant will read best is
//! document-dependent and unknowable up front, so all of them are
//! produced and the fan-out runner tries every one.
//!
//! Everything here is deterministic. The input image is never mutated.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::{box_filter, filter3x3, gaussian_blur_f32, median_filter};
use imageproc::morphology::{dilate, open};

/// Names of the nine fixed preprocessing variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// CLAHE-equalized denoised grayscale.
    Enhanced,
    /// Adaptive threshold against a Gaussian-weighted local mean.
    ThresholdGaussian,
    /// Adaptive threshold against a plain box local mean.
    ThresholdMean,
    /// Morphological opening of the Gaussian threshold.
    Opened,
    /// Light dilation of the opened image.
    Dilated,
    /// Median-denoised grayscale.
    Denoised,
    /// Plain grayscale conversion of the source.
    OriginalGray,
    /// 2x upscale, sharpened, then aggressively equalized.
    ScaledEnhanced,
    /// 2x upscale with sharpening only.
    ScaledSharp,
}

impl Variant {
    pub const ALL: [Variant; 9] = [
        Variant::Enhanced,
        Variant::ThresholdGaussian,
        Variant::ThresholdMean,
        Variant::Opened,
        Variant::Dilated,
        Variant::Denoised,
        Variant::OriginalGray,
        Variant::ScaledEnhanced,
        Variant::ScaledSharp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Enhanced => "enhanced",
            Variant::ThresholdGaussian => "threshold_gaussian",
            Variant::ThresholdMean => "threshold_mean",
            Variant::Opened => "opened",
            Variant::Dilated => "dilated",
            Variant::Denoised => "denoised",
            Variant::OriginalGray => "original_gray",
            Variant::ScaledEnhanced => "scaled_enhanced",
            Variant::ScaledSharp => "scaled_sharp",
        }
    }
}

/// The complete set of preprocessed rasters for one source image.
#[derive(Debug, Clone)]
pub struct VariantSet {
    pub enhanced: GrayImage,
    pub threshold_gaussian: GrayImage,
    pub threshold_mean: GrayImage,
    pub opened: GrayImage,
    pub dilated: GrayImage,
    pub denoised: GrayImage,
    pub original_gray: GrayImage,
    pub scaled_enhanced: GrayImage,
    pub scaled_sharp: GrayImage,
}

impl VariantSet {
    pub fn get(&self, variant: Variant) -> &GrayImage {
        match variant {
            Variant::Enhanced => &self.enhanced,
            Variant::ThresholdGaussian => &self.threshold_gaussian,
            Variant::ThresholdMean => &self.threshold_mean,
            Variant::Opened => &self.opened,
            Variant::Dilated => &self.dilated,
            Variant::Denoised => &self.denoised,
            Variant::OriginalGray => &self.original_gray,
            Variant::ScaledEnhanced => &self.scaled_enhanced,
            Variant::ScaledSharp => &self.scaled_sharp,
        }
    }

    /// Iterate over all nine variants in their fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (Variant, &GrayImage)> {
        Variant::ALL.iter().map(move |&v| (v, self.get(v)))
    }
}

// Center-weighted high-pass kernel for the scaled variants.
const SHARPEN_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// Produce all nine named variants from one decoded source image.
pub fn preprocess(input: &DynamicImage) -> VariantSet {
    let gray = input.to_luma8();

    // Salt-and-pepper reduction before anything threshold-sensitive.
    let denoised = median_filter(&gray, 1, 1);

    // Two adaptive binarizations: the Gaussian-weighted one handles
    // uneven illumination better, the box-mean one keeps fine strokes.
    let threshold_gaussian = adaptive_threshold_gaussian(&denoised, 2.0, 2);
    let threshold_mean = adaptive_threshold_mean(&denoised, 7, 5);

    let enhanced = clahe(&denoised, 2.0, 8);

    // Strip speckle from the binarized table, then thicken strokes the
    // opening may have thinned.
    let opened = open(&threshold_gaussian, Norm::LInf, 1);
    let dilated = dilate(&opened, Norm::LInf, 1);

    // 2x upscale + sharpen + aggressive CLAHE for small-font documents.
    let (w, h) = gray.dimensions();
    let scaled = imageops::resize(&gray, w.saturating_mul(2), h.saturating_mul(2), FilterType::CatmullRom);
    let scaled_sharp: GrayImage = filter3x3::<Luma<u8>, f32, u8>(&scaled, &SHARPEN_KERNEL);
    let scaled_enhanced = clahe(&scaled_sharp, 3.0, 16);

    VariantSet {
        enhanced,
        threshold_gaussian,
        threshold_mean,
        opened,
        dilated,
        denoised,
        original_gray: gray,
        scaled_enhanced,
        scaled_sharp,
    }
}

/// Binarize against a Gaussian-weighted local mean minus a constant.
fn adaptive_threshold_gaussian(input: &GrayImage, sigma: f32, c: i16) -> GrayImage {
    if input.width() == 0 || input.height() == 0 {
        return input.clone();
    }
    let local_mean = gaussian_blur_f32(input, sigma);
    binarize_against(input, &local_mean, c)
}

/// Binarize against a box local mean minus a constant.
fn adaptive_threshold_mean(input: &GrayImage, radius: u32, c: i16) -> GrayImage {
    if input.width() == 0 || input.height() == 0 {
        return input.clone();
    }
    // Keep the window inside the image for very small inputs.
    let rx = radius.min(input.width().saturating_sub(1) / 2).max(1);
    let ry = radius.min(input.height().saturating_sub(1) / 2).max(1);
    let local_mean = box_filter(input, rx, ry);
    binarize_against(input, &local_mean, c)
}

fn binarize_against(input: &GrayImage, local_mean: &GrayImage, c: i16) -> GrayImage {
    let mut out = GrayImage::new(input.width(), input.height());
    for (x, y, pixel) in input.enumerate_pixels() {
        let mean = local_mean.get_pixel(x, y)[0] as i16;
        let value = if pixel[0] as i16 > mean - c { 255 } else { 0 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

/// Contrast-limited adaptive histogram equalization.
///
/// imageproc has a global `equalize_histogram` but no tiled variant, so
/// this is implemented directly: per-tile clipped histograms turned into
/// lookup tables, with bilinear interpolation between the four nearest
/// tile tables per pixel to avoid visible tile seams.
pub fn clahe(input: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = input.dimensions();
    if width == 0 || height == 0 {
        return input.clone();
    }

    // Tile counts are derived back from the tile size so the grid
    // exactly covers the image: every tile starts inside it and none
    // is empty, whatever the dimensions.
    let tile_w = width.div_ceil(grid.clamp(1, width));
    let tile_h = height.div_ceil(grid.clamp(1, height));
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    // One 256-entry LUT per tile.
    let mut luts: Vec<[u8; 256]> = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);

            let mut hist = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[input.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = ((x1 - x0) * (y1 - y0)) as u32;
            luts.push(clipped_lut(&hist, area, clip_limit));
        }
    }

    // Blend the four surrounding tile LUTs per pixel.
    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in input.enumerate_pixels() {
        let v = pixel[0] as usize;

        let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
        let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
        let tx0 = fx.floor().max(0.0) as u32;
        let ty0 = fy.floor().max(0.0) as u32;
        let tx0 = tx0.min(tiles_x - 1);
        let ty0 = ty0.min(tiles_y - 1);
        let tx1 = (tx0 + 1).min(tiles_x - 1);
        let ty1 = (ty0 + 1).min(tiles_y - 1);
        let wx = (fx - tx0 as f32).clamp(0.0, 1.0);
        let wy = (fy - ty0 as f32).clamp(0.0, 1.0);

        let lut = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][v] as f32;
        let top = lut(tx0, ty0) * (1.0 - wx) + lut(tx1, ty0) * wx;
        let bottom = lut(tx0, ty1) * (1.0 - wx) + lut(tx1, ty1) * wx;
        let blended = top * (1.0 - wy) + bottom * wy;
        out.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
    }
    out
}

/// Clip a tile histogram, redistribute the excess uniformly, and build
/// the equalization lookup table from the resulting CDF.
fn clipped_lut(hist: &[u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        return lut;
    }

    let limit = ((clip_limit * area as f32 / 256.0).max(1.0)) as u32;
    let mut clipped = [0u32; 256];
    let mut excess: u32 = 0;
    for i in 0..256 {
        if hist[i] > limit {
            excess += hist[i] - limit;
            clipped[i] = limit;
        } else {
            clipped[i] = hist[i];
        }
    }
    let bonus = excess / 256;
    let mut remainder = excess % 256;
    for bin in clipped.iter_mut() {
        *bin += bonus;
        if remainder > 0 {
            *bin += 1;
            remainder -= 1;
        }
    }

    let scale = 255.0 / area as f32;
    let mut cdf: u32 = 0;
    for i in 0..256 {
        cdf += clipped[i];
        lut[i] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn gradient_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let v = ((x * 7 + y * 13) % 64 + 96) as u8;
            Rgb([v, v, v])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_all_nine_variants_produced() {
        let input = gradient_image(64, 48);
        let set = preprocess(&input);
        let names: Vec<&str> = set.iter().map(|(v, _)| v.name()).collect();
        assert_eq!(
            names,
            vec![
                "enhanced",
                "threshold_gaussian",
                "threshold_mean",
                "opened",
                "dilated",
                "denoised",
                "original_gray",
                "scaled_enhanced",
                "scaled_sharp",
            ]
        );
    }

    #[test]
    fn test_variant_dimensions() {
        let input = gradient_image(60, 40);
        let set = preprocess(&input);
        assert_eq!(set.original_gray.dimensions(), (60, 40));
        assert_eq!(set.enhanced.dimensions(), (60, 40));
        assert_eq!(set.threshold_mean.dimensions(), (60, 40));
        // Scaled variants are exactly 2x.
        assert_eq!(set.scaled_sharp.dimensions(), (120, 80));
        assert_eq!(set.scaled_enhanced.dimensions(), (120, 80));
    }

    #[test]
    fn test_preprocess_deterministic() {
        let input = gradient_image(32, 32);
        let a = preprocess(&input);
        let b = preprocess(&input);
        for (va, vb) in a.iter().zip(b.iter()) {
            assert_eq!(va.0, vb.0);
            assert_eq!(va.1.as_raw(), vb.1.as_raw());
        }
    }

    #[test]
    fn test_preprocess_does_not_mutate_input() {
        let input = gradient_image(16, 16);
        let before = input.to_luma8();
        let _ = preprocess(&input);
        assert_eq!(input.to_luma8().as_raw(), before.as_raw());
    }

    #[test]
    fn test_thresholds_are_binary() {
        let input = gradient_image(40, 40);
        let set = preprocess(&input);
        for pixel in set.threshold_gaussian.pixels() {
            assert!(pixel[0] == 0 || pixel[0] == 255);
        }
        for pixel in set.threshold_mean.pixels() {
            assert!(pixel[0] == 0 || pixel[0] == 255);
        }
    }

    #[test]
    fn test_preprocess_tiny_image() {
        // Smaller than the CLAHE tile grid on both axes.
        let input = gradient_image(3, 5);
        let set = preprocess(&input);
        assert_eq!(set.enhanced.dimensions(), (3, 5));
        assert_eq!(set.scaled_enhanced.dimensions(), (6, 10));
    }

    #[test]
    fn test_clahe_dimensions_not_divisible_by_grid() {
        // Dimensions just above the grid size used to put the last
        // tile's origin past the image edge.
        for dim in 9..=13 {
            let input = gradient_image(dim, dim).to_luma8();
            let out = clahe(&input, 2.0, 8);
            assert_eq!(out.dimensions(), (dim, dim));
        }
        let set = preprocess(&gradient_image(10, 11));
        assert_eq!(set.scaled_enhanced.dimensions(), (20, 22));
    }

    #[test]
    fn test_clahe_uniform_image_stays_uniform() {
        // No tile may contribute an empty histogram that darkens the
        // right or bottom edge of the blend.
        let input = GrayImage::from_pixel(120, 90, Luma([200u8]));
        let out = clahe(&input, 2.0, 16);
        let first = out.get_pixel(0, 0)[0];
        for pixel in out.pixels() {
            assert_eq!(pixel[0], first);
        }
    }

    #[test]
    fn test_clahe_spreads_low_contrast() {
        // A washed-out gradient should come out with a wider value range.
        let input = gradient_image(64, 64).to_luma8();
        let (lo, hi) = input
            .pixels()
            .fold((255u8, 0u8), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
        let out = clahe(&input, 2.0, 8);
        let (olo, ohi) = out
            .pixels()
            .fold((255u8, 0u8), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
        assert!(ohi as i32 - olo as i32 >= hi as i32 - lo as i32);
    }
}
