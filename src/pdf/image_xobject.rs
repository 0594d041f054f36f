// 画像XObjectの構築: 元画像のそのままの埋め込み / 再エンコード済みJPEGの埋め込み

use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{ColorType, DynamicImage, ImageFormat, ImageReader};
use lopdf::{Object, Stream, dictionary};

use crate::encode::adaptive::BandedJpeg;
use crate::error::PdfPressError;

/// PDFに埋め込む準備ができた画像データ
#[derive(Debug, Clone)]
pub struct ImageXObject {
    pub data: Vec<u8>,
    pub filter: &'static str,
    pub color_space: &'static str,
    pub bits_per_component: u8,
    pub width: u32,
    pub height: u32,
}

impl ImageXObject {
    /// 元画像を変換せずに包む。
    ///
    /// グレー/RGBのJPEGはDCTDecodeとしてそのまま埋め込む。
    /// それ以外（PNG等、CMYK JPEG）はデコードして8bit画素をFlateDecodeで格納する。
    pub fn wrap_source(bytes: &[u8]) -> crate::error::Result<Self> {
        if let Some(header) = parse_jpeg_header(bytes) {
            let color_space = match header.components {
                1 => Some("DeviceGray"),
                3 => Some("DeviceRGB"),
                _ => None,
            };
            if let Some(color_space) = color_space {
                return Ok(Self {
                    data: bytes.to_vec(),
                    filter: "DCTDecode",
                    color_space,
                    bits_per_component: 8,
                    width: header.width as u32,
                    height: header.height as u32,
                });
            }
        }

        let img = decode_image(bytes)?;
        Self::flate_from_image(&img)
    }

    /// ビットマップを可逆(FlateDecode)で格納する。
    pub fn flate_from_image(img: &DynamicImage) -> crate::error::Result<Self> {
        let (width, height) = (img.width(), img.height());
        let (raw, color_space) = match img.color() {
            ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => {
                (img.to_luma8().into_raw(), "DeviceGray")
            }
            _ => (img.to_rgb8().into_raw(), "DeviceRGB"),
        };

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&raw)
            .map_err(|e| PdfPressError::pdf_write(format!("FlateDecode error: {e}")))?;
        let data = encoder
            .finish()
            .map_err(|e| PdfPressError::pdf_write(format!("FlateDecode error: {e}")))?;

        Ok(Self {
            data,
            filter: "FlateDecode",
            color_space,
            bits_per_component: 8,
            width,
            height,
        })
    }

    /// 再エンコード済みJPEGを包む。
    pub fn from_jpeg(jpeg: BandedJpeg) -> Self {
        Self {
            color_space: jpeg.layout.pdf_color_space(),
            data: jpeg.data,
            filter: "DCTDecode",
            bits_per_component: 8,
            width: jpeg.width,
            height: jpeg.height,
        }
    }

    /// lopdfのStreamに変換する。
    pub fn to_stream(&self) -> Stream {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => self.color_space,
            "BitsPerComponent" => self.bits_per_component as i64,
            "Filter" => self.filter,
        };
        // 既に圧縮済みなので最適化時の再圧縮は不要
        let mut stream = Stream::new(dict, self.data.clone());
        stream.allows_compression = false;
        stream
    }

    /// XObjectとして追加するときのObject。
    pub fn to_object(&self) -> Object {
        Object::Stream(self.to_stream())
    }
}

/// 画像バイト列をデコードする（形式はバイト列から推定）。
pub fn decode_image(bytes: &[u8]) -> crate::error::Result<DynamicImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PdfPressError::image_decode(e.to_string()))?;
    if reader.format().is_none() {
        return Err(PdfPressError::image_decode("unrecognised image format"));
    }
    Ok(reader.decode()?)
}

/// バイト列が画像として認識できる形式かどうか。
pub fn guess_image_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// JPEGのSOFセグメントから読み取ったヘッダ情報
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegHeader {
    pub width: u16,
    pub height: u16,
    pub components: u8,
}

/// JPEGのマーカーを走査してSOFから寸法と成分数を取得する。JPEGでなければNone。
pub fn parse_jpeg_header(bytes: &[u8]) -> Option<JpegHeader> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }

    let mut pos = 2;
    while pos + 3 < bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        // フィルバイト
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // 長さを持たないマーカー
        if marker == 0x01 || (0xD0..=0xD8).contains(&marker) {
            pos += 2;
            continue;
        }
        // SOS以降に到達したらSOFは無い
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }

        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        if len < 2 {
            return None;
        }
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            let seg = bytes.get(pos + 4..pos + 2 + len)?;
            if seg.len() < 6 {
                return None;
            }
            let height = u16::from_be_bytes([seg[1], seg[2]]);
            let width = u16::from_be_bytes([seg[3], seg[4]]);
            let components = seg[5];
            if width == 0 || height == 0 {
                return None;
            }
            return Some(JpegHeader {
                width,
                height,
                components,
            });
        }
        pos += 2 + len;
    }
    None
}
