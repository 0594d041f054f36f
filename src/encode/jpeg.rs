// image crate bitmap -> JPEG bytes via jpeg-encoder

use image::{ColorType, DynamicImage};
use jpeg_encoder::{ColorType as JpegColorType, Encoder, SamplingFactor};
use serde::{Deserialize, Serialize};

use crate::error::PdfPressError;

/// Chroma subsampling applied to color JPEGs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ChromaSubsampling {
    #[serde(rename = "4:4:4")]
    Yuv444,
    #[serde(rename = "4:2:0")]
    Yuv420,
}

impl ChromaSubsampling {
    fn sampling_factor(self) -> SamplingFactor {
        match self {
            Self::Yuv444 => SamplingFactor::R_4_4_4,
            Self::Yuv420 => SamplingFactor::R_4_2_0,
        }
    }
}

/// Per-encode knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegOptions {
    /// 1 = worst, 100 = best
    pub quality: u8,
    pub subsampling: ChromaSubsampling,
    /// Progressive scan + optimized Huffman tables.
    pub optimize: bool,
}

impl JpegOptions {
    pub fn new(quality: u8, subsampling: ChromaSubsampling) -> Self {
        Self {
            quality,
            subsampling,
            optimize: true,
        }
    }
}

/// Channel layout of the pixels handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Gray,
    Rgb,
}

impl PixelLayout {
    /// Matching PDF color space name.
    pub fn pdf_color_space(self) -> &'static str {
        match self {
            Self::Gray => "DeviceGray",
            Self::Rgb => "DeviceRGB",
        }
    }

    fn jpeg_color_type(self) -> JpegColorType {
        match self {
            Self::Gray => JpegColorType::Luma,
            Self::Rgb => JpegColorType::Rgb,
        }
    }
}

/// Pixel buffer ready for JPEG encoding.
///
/// Converting a `DynamicImage` is not free, so the adaptive search converts
/// once and re-encodes the same buffer at different settings.
pub struct JpegPixels {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
}

impl JpegPixels {
    /// Flattens any bitmap to 8-bit gray or RGB. Alpha is dropped.
    pub fn from_image(img: &DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        match img.color() {
            ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => Self {
                data: img.to_luma8().into_raw(),
                width,
                height,
                layout: PixelLayout::Gray,
            },
            _ => Self {
                data: img.to_rgb8().into_raw(),
                width,
                height,
                layout: PixelLayout::Rgb,
            },
        }
    }
}

/// Encode a pixel buffer to JPEG bytes.
///
/// # Errors
/// Returns `PdfPressError::JpegEncodeError` if the quality is outside 1-100,
/// a dimension is zero or exceeds the 65535 px JPEG limit, or the encoder
/// fails.
pub fn encode(pixels: &JpegPixels, options: &JpegOptions) -> crate::error::Result<Vec<u8>> {
    if !(1..=100).contains(&options.quality) {
        return Err(PdfPressError::jpeg_encode(format!(
            "JPEG quality must be 1-100, got {}",
            options.quality
        )));
    }

    let width = u16::try_from(pixels.width).ok().filter(|w| *w > 0);
    let height = u16::try_from(pixels.height).ok().filter(|h| *h > 0);
    let (Some(width), Some(height)) = (width, height) else {
        return Err(PdfPressError::jpeg_encode(format!(
            "JPEG dimensions must be 1-65535, got {}x{}",
            pixels.width, pixels.height
        )));
    };

    let mut buf = Vec::new();
    let mut encoder = Encoder::new(&mut buf, options.quality);
    if pixels.layout == PixelLayout::Rgb {
        encoder.set_sampling_factor(options.subsampling.sampling_factor());
    }
    encoder.set_progressive(options.optimize);
    encoder.set_optimized_huffman_tables(options.optimize);
    encoder.encode(&pixels.data, width, height, pixels.layout.jpeg_color_type())?;

    Ok(buf)
}
