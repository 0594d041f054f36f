// 候補生成: ベースライン（無変換の単一ページPDF）とレベル別のラスタライズ候補

use tracing::{debug, warn};

use super::Engine;
use super::unit::{LoadedSource, PageUnit};
use crate::config::level::{CompressionLevel, RasterMode};
use crate::encode::adaptive::{BandParams, BandTarget, BandedJpeg, encode_within_band, limit_long_side};
use crate::encode::jpeg::ChromaSubsampling;
use crate::pdf::image_xobject::{ImageXObject, decode_image};
use crate::pdf::reader::SourceDocument;
use crate::pdf::writer::PageWriter;
use crate::render::dpi::cap_dpi_for;

/// 無変換の単一ページPDF。すべての候補はこの長さと比較される。
#[derive(Debug, Clone)]
pub struct Baseline {
    pub pdf: Vec<u8>,
}

/// ラスタライズして再エンコードした単一ページPDF。
#[derive(Debug, Clone)]
pub struct Candidate {
    pub level: CompressionLevel,
    pub pdf: Vec<u8>,
    /// エンコーダが目標範囲に収められなかった
    pub reached_floor: bool,
}

/// 1ユニット・1レベル分の生成結果。
#[derive(Debug, Clone)]
pub struct Generated {
    pub baseline: Baseline,
    pub candidate: Option<Candidate>,
}

impl Engine {
    /// ユニットのベースラインを作る。
    pub fn baseline(&self, unit: &PageUnit<'_>) -> crate::error::Result<Baseline> {
        let source = LoadedSource::load(&unit.source())?;
        self.baseline_of(&source, unit.page_index)
    }

    /// 指定レベルの候補を作る。対象外・失敗時は None（呼び出し側はベースラインを使う）。
    pub fn candidate(
        &self,
        unit: &PageUnit<'_>,
        level: CompressionLevel,
        baseline_len: usize,
    ) -> Option<Candidate> {
        match LoadedSource::load(&unit.source()) {
            Ok(source) => self.candidate_of(&source, unit.page_index, level, baseline_len),
            Err(e) => {
                warn!(kind = unit.kind.as_str(), error = %e, "unreadable unit; no candidate");
                None
            }
        }
    }

    /// ベースラインと指定レベルの候補をまとめて作る。
    pub fn generate(
        &self,
        unit: &PageUnit<'_>,
        level: CompressionLevel,
    ) -> crate::error::Result<Generated> {
        let source = LoadedSource::load(&unit.source())?;
        let baseline = self.baseline_of(&source, unit.page_index)?;
        let candidate = self.candidate_of(&source, unit.page_index, level, baseline.pdf.len());
        Ok(Generated {
            baseline,
            candidate,
        })
    }

    pub(crate) fn baseline_of(
        &self,
        source: &LoadedSource<'_>,
        page_index: u32,
    ) -> crate::error::Result<Baseline> {
        let mut writer = PageWriter::new();
        match source {
            LoadedSource::Pdf(doc) => {
                let page_id = doc.page_id(page_index)?;
                writer.import_page(doc.document(), page_id)?;
            }
            LoadedSource::Image(bytes) => {
                let image = ImageXObject::wrap_source(bytes)?;
                let (width_pt, height_pt) = self.image_page_size(image.width, image.height);
                writer.add_image_page(&image, width_pt, height_pt);
            }
        }
        Ok(Baseline {
            pdf: writer.finish()?,
        })
    }

    pub(crate) fn candidate_of(
        &self,
        source: &LoadedSource<'_>,
        page_index: u32,
        level: CompressionLevel,
        baseline_len: usize,
    ) -> Option<Candidate> {
        let result = match source {
            LoadedSource::Pdf(doc) => self.pdf_candidate(doc, page_index, level),
            LoadedSource::Image(bytes) => self.image_candidate(bytes, level, baseline_len),
        };
        match result {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(
                    kind = source.kind().as_str(),
                    page_index,
                    %level,
                    error = %e,
                    "candidate generation failed; falling back to baseline"
                );
                None
            }
        }
    }

    /// PDFページ: レベルのDPI（上限適用後）でレンダリングし、固定品質の4:2:0 JPEGにする。
    fn pdf_candidate(
        &self,
        doc: &SourceDocument<'_>,
        page_index: u32,
        level: CompressionLevel,
    ) -> crate::error::Result<Option<Candidate>> {
        let Some(params) = self.settings.levels.get(level) else {
            return Ok(None);
        };
        match params.mode {
            RasterMode::None => return Ok(None),
            RasterMode::Smart if !self.classifier.is_image_only(doc, page_index) => {
                debug!(page_index, %level, "page has text or vectors; not rasterized");
                return Ok(None);
            }
            _ => {}
        }
        let Some(renderer) = self.renderer.as_deref() else {
            debug!(page_index, %level, "no renderer; not rasterized");
            return Ok(None);
        };

        let dpi = cap_dpi_for(
            doc.page_dimensions(page_index),
            params.dpi,
            self.settings.pixel_ceiling,
            self.settings.min_dpi,
        );
        let bitmap = renderer.render(doc.bytes(), page_index, dpi)?;
        // 元のページ矩形をそのまま使う。画素数からの逆算は丸めでずれる。
        let (width_pt, height_pt) = match doc.displayed_dimensions(page_index) {
            Ok(dimensions) => dimensions,
            Err(_) => (
                bitmap.width() as f64 * 72.0 / dpi as f64,
                bitmap.height() as f64 * 72.0 / dpi as f64,
            ),
        };

        let jpeg = encode_within_band(
            &bitmap,
            &BandParams::fixed(params.quality, ChromaSubsampling::Yuv420),
            BandTarget {
                baseline_len: 0,
                container_overhead: 0,
            },
        )?;
        let reached_floor = jpeg.reached_floor;
        let pdf = wrap_jpeg_page(jpeg, width_pt, height_pt)?;
        debug!(page_index, %level, dpi, bytes = pdf.len(), "PDF page candidate");

        Ok(Some(Candidate {
            level,
            pdf,
            reached_floor,
        }))
    }

    /// 画像: 長辺を制限してから、ベースライン比のバンドに収まるようエンコードする。
    ///
    /// ページの物理サイズは元画像の画素数から決め、縮小しても変えない。
    fn image_candidate(
        &self,
        bytes: &[u8],
        level: CompressionLevel,
        baseline_len: usize,
    ) -> crate::error::Result<Option<Candidate>> {
        let Some(band) = self.settings.image_bands.get(level) else {
            return Ok(None);
        };

        let original = decode_image(bytes)?;
        let (width_pt, height_pt) = self.image_page_size(original.width(), original.height());
        let bitmap = limit_long_side(original, band.max_long_side);

        let container_overhead =
            jpeg_container_overhead(bitmap.width(), bitmap.height(), width_pt, height_pt)?;
        let jpeg = encode_within_band(
            &bitmap,
            band,
            BandTarget {
                baseline_len,
                container_overhead,
            },
        )?;
        let reached_floor = jpeg.reached_floor;
        let pdf = wrap_jpeg_page(jpeg, width_pt, height_pt)?;

        if let Some(ratio) = band.keep_max_ratio
            && pdf.len() as f64 > baseline_len as f64 * ratio
        {
            debug!(%level, bytes = pdf.len(), baseline_len, "image candidate above its ceiling; discarded");
            return Ok(None);
        }
        debug!(%level, bytes = pdf.len(), baseline_len, reached_floor, "image candidate");

        Ok(Some(Candidate {
            level,
            pdf,
            reached_floor,
        }))
    }

    /// 画像をページにするときの寸法（ポイント）。
    pub fn image_page_size(&self, width_px: u32, height_px: u32) -> (f64, f64) {
        let dpi = self.settings.image_default_dpi as f64;
        (width_px as f64 * 72.0 / dpi, height_px as f64 * 72.0 / dpi)
    }
}

/// JPEGを全面に貼った単一ページPDFを作る。
fn wrap_jpeg_page(jpeg: BandedJpeg, width_pt: f64, height_pt: f64) -> crate::error::Result<Vec<u8>> {
    let mut writer = PageWriter::new();
    writer.add_image_page(&ImageXObject::from_jpeg(jpeg), width_pt, height_pt);
    writer.finish()
}

/// 単一ページPDFの、JPEG本体を除いた容器部分のバイト数。
pub fn jpeg_container_overhead(
    width: u32,
    height: u32,
    width_pt: f64,
    height_pt: f64,
) -> crate::error::Result<usize> {
    let empty = ImageXObject {
        data: Vec::new(),
        filter: "DCTDecode",
        color_space: "DeviceRGB",
        bits_per_component: 8,
        width,
        height,
    };
    let mut writer = PageWriter::new();
    writer.add_image_page(&empty, width_pt, height_pt);
    Ok(writer.finish()?.len())
}
