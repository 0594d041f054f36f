// Bounded JPEG quality search under a two-sided size band

use image::DynamicImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::jpeg::{self, ChromaSubsampling, JpegOptions, JpegPixels, PixelLayout};

/// Quality change per search step, in either direction.
pub const QUALITY_STEP: u8 = 3;
/// Upper bound for the upward quality search before the q100 retries.
pub const QUALITY_CEILING: u8 = 95;
/// Guided downscaling only kicks in when the quality floor is this low or lower.
pub const DOWNSCALE_MAX_FLOOR: u8 = 32;
/// The guided downscale never shrinks the long side below this.
pub const MIN_LONG_SIDE: u32 = 960;
const SCALE_MIN: f64 = 0.60;
const SCALE_MAX: f64 = 0.98;

/// Encoder parameters for one compression level.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BandParams {
    pub quality_seed: u8,
    /// Upper bound on output / baseline.
    pub keep_max_ratio: Option<f64>,
    /// Lower bound on output / baseline.
    pub keep_min_ratio: Option<f64>,
    /// Long side the bitmap is reduced to before encoding.
    #[serde(default)]
    pub max_long_side: Option<u32>,
    pub quality_floor: u8,
    pub subsampling: ChromaSubsampling,
}

impl BandParams {
    /// Single fixed-quality encode with no band.
    pub fn fixed(quality: u8, subsampling: ChromaSubsampling) -> Self {
        Self {
            quality_seed: quality,
            keep_max_ratio: None,
            keep_min_ratio: None,
            max_long_side: None,
            quality_floor: quality,
            subsampling,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=100).contains(&self.quality_seed) {
            return Err(format!("quality_seed must be 1-100, got {}", self.quality_seed));
        }
        if self.quality_floor == 0 || self.quality_floor > self.quality_seed {
            return Err(format!(
                "quality_floor must be 1..=quality_seed, got {}",
                self.quality_floor
            ));
        }
        for ratio in [self.keep_min_ratio, self.keep_max_ratio].into_iter().flatten() {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(format!("band ratios must be in (0, 1], got {ratio}"));
            }
        }
        if let (Some(lo), Some(hi)) = (self.keep_min_ratio, self.keep_max_ratio)
            && lo > hi
        {
            return Err(format!("keep_min_ratio {lo} exceeds keep_max_ratio {hi}"));
        }
        if self.max_long_side == Some(0) {
            return Err("max_long_side must be positive".to_string());
        }
        Ok(())
    }
}

/// What the band is measured against.
#[derive(Debug, Clone, Copy)]
pub struct BandTarget {
    /// Byte length of the baseline representation.
    pub baseline_len: usize,
    /// Bytes the single-page PDF wrapper adds on top of the JPEG payload.
    pub container_overhead: usize,
}

/// Result of the band search.
#[derive(Debug, Clone)]
pub struct BandedJpeg {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub quality: u8,
    /// The search ran out of room (quality floor and minimum long side, or
    /// quality 100 unoptimised) and the result lies outside the band.
    pub reached_floor: bool,
}

/// Search JPEG settings so that the wrapped output lands inside
/// `[keep_min_ratio, keep_max_ratio] * baseline_len`.
///
/// 1. Encode once at the seed quality.
/// 2. Over the ceiling: step quality down to the floor.
/// 3. Still over at an aggressive floor: guided downscale, bounded by
///    [`MIN_LONG_SIDE`].
/// 4. Under the lower bound: step quality up to [`QUALITY_CEILING`], then
///    q100 at 4:4:4, then q100 without progressive/optimized tables. A step
///    that would overshoot the ceiling is not taken.
pub fn encode_within_band(
    bitmap: &DynamicImage,
    params: &BandParams,
    target: BandTarget,
) -> crate::error::Result<BandedJpeg> {
    let ceiling = params
        .keep_max_ratio
        .map(|r| target.baseline_len as f64 * r);
    let lower = params
        .keep_min_ratio
        .map(|r| target.baseline_len as f64 * r);
    let size = |d: &[u8]| (d.len() + target.container_overhead) as f64;
    let over = |d: &[u8]| ceiling.is_some_and(|c| size(d) > c);
    let fits = |d: &[u8]| ceiling.is_none_or(|c| size(d) <= c);
    let under = |d: &[u8]| lower.is_some_and(|l| size(d) < l);

    let mut pixels = JpegPixels::from_image(bitmap);
    let mut options = JpegOptions::new(params.quality_seed, params.subsampling);
    let mut data = jpeg::encode(&pixels, &options)?;

    while over(&data) && options.quality > params.quality_floor {
        options.quality = options
            .quality
            .saturating_sub(QUALITY_STEP)
            .max(params.quality_floor);
        data = jpeg::encode(&pixels, &options)?;
    }

    if over(&data) && params.quality_floor <= DOWNSCALE_MAX_FLOOR
        && let Some(ceiling) = ceiling
    {
        let (orig_w, orig_h) = (bitmap.width(), bitmap.height());
        let orig_long = orig_w.max(orig_h);
        while size(&data) > ceiling && pixels.width.max(pixels.height) > MIN_LONG_SIDE {
            let scale = (ceiling / size(&data)).sqrt().clamp(SCALE_MIN, SCALE_MAX);
            let long = pixels.width.max(pixels.height);
            let new_long = ((long as f64 * scale).round() as u32).max(MIN_LONG_SIDE);
            let (w, h) = scale_to_long_side(orig_w, orig_h, orig_long, new_long);
            let resized = bitmap.resize_exact(w, h, FilterType::Lanczos3);
            pixels = JpegPixels::from_image(&resized);
            data = jpeg::encode(&pixels, &options)?;
        }
    }

    if under(&data) {
        let mut blocked = false;
        while under(&data) && options.quality < QUALITY_CEILING {
            let mut next_options = options;
            next_options.quality = (options.quality + QUALITY_STEP).min(QUALITY_CEILING);
            let next = jpeg::encode(&pixels, &next_options)?;
            if !fits(&next) {
                blocked = true;
                break;
            }
            options = next_options;
            data = next;
        }

        let retries = [
            JpegOptions {
                quality: 100,
                subsampling: ChromaSubsampling::Yuv444,
                optimize: true,
            },
            JpegOptions {
                quality: 100,
                subsampling: ChromaSubsampling::Yuv444,
                optimize: false,
            },
        ];
        for retry in retries {
            if blocked || !under(&data) {
                break;
            }
            let next = jpeg::encode(&pixels, &retry)?;
            if !fits(&next) {
                blocked = true;
            } else if next.len() > data.len() {
                options = retry;
                data = next;
            }
        }
    }

    let reached_floor = over(&data) || under(&data);
    debug!(
        seed = params.quality_seed,
        quality = options.quality,
        width = pixels.width,
        height = pixels.height,
        bytes = data.len(),
        baseline = target.baseline_len,
        reached_floor,
        "band search finished"
    );

    Ok(BandedJpeg {
        data,
        width: pixels.width,
        height: pixels.height,
        layout: pixels.layout,
        quality: options.quality,
        reached_floor,
    })
}

/// Shrinks a bitmap so its long side is at most `max_long_side`.
/// Smaller bitmaps are returned unchanged.
pub fn limit_long_side(bitmap: DynamicImage, max_long_side: Option<u32>) -> DynamicImage {
    let Some(limit) = max_long_side else {
        return bitmap;
    };
    let (w, h) = (bitmap.width(), bitmap.height());
    let long = w.max(h);
    if long <= limit {
        return bitmap;
    }
    let (nw, nh) = scale_to_long_side(w, h, long, limit);
    bitmap.resize_exact(nw, nh, FilterType::Lanczos3)
}

fn scale_to_long_side(w: u32, h: u32, long: u32, new_long: u32) -> (u32, u32) {
    let factor = new_long as f64 / long as f64;
    let nw = ((w as f64 * factor).round() as u32).max(1);
    let nh = ((h as f64 * factor).round() as u32).max(1);
    (nw, nh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_to_long_side_keeps_aspect() {
        assert_eq!(scale_to_long_side(4000, 3000, 4000, 2000), (2000, 1500));
        assert_eq!(scale_to_long_side(3000, 4000, 4000, 1280), (960, 1280));
    }

    #[test]
    fn test_limit_long_side_leaves_small_bitmaps() {
        let img = DynamicImage::new_rgb8(100, 50);
        let out = limit_long_side(img, Some(1280));
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn test_validate_rejects_inverted_band() {
        let params = BandParams {
            quality_seed: 70,
            keep_max_ratio: Some(0.3),
            keep_min_ratio: Some(0.5),
            max_long_side: None,
            quality_floor: 30,
            subsampling: ChromaSubsampling::Yuv420,
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_floor_above_seed() {
        let mut params = BandParams::fixed(50, ChromaSubsampling::Yuv420);
        params.quality_floor = 60;
        assert!(params.validate().is_err());
    }
}
