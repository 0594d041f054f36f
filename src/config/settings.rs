use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::level::{CompressionLevel, LevelParams, RasterMode};
use crate::encode::adaptive::BandParams;
use crate::encode::jpeg::ChromaSubsampling;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// ラスタライズ時の最大ピクセル数（これを超えるとDPIを下げる）
    pub pixel_ceiling: u64,
    /// DPIキャップの下限
    pub min_dpi: u32,
    /// 解像度情報を持たない画像をページ化するときのDPI
    pub image_default_dpi: u32,
    /// 文書全体の見積もりに加える固定オーバーヘッド（バイト）
    pub doc_overhead: u64,
    /// ページごとの見積もりに加える固定オーバーヘッド（バイト）
    pub page_overhead: u64,
    pub default_level: CompressionLevel,
    pub levels: LevelTable,
    pub image_bands: BandTable,
    /// 見積もりサイズの永続キャッシュ先。未指定ならメモリ内のみ
    pub cache_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            pixel_ceiling: 5_000_000,
            min_dpi: 72,
            image_default_dpi: 96,
            doc_overhead: 2048,
            page_overhead: 512,
            default_level: CompressionLevel::None,
            levels: LevelTable::default(),
            image_bands: BandTable::default(),
            cache_dir: None,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let settings: Settings = serde_yml::from_str(yaml).map_err(|e| {
            crate::error::PdfPressError::config(format!("Failed to parse settings YAML: {e}"))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// 値域チェック。数値そのものは経験的な既定値なので、壊れた組合せだけを弾く。
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.min_dpi == 0 || self.image_default_dpi == 0 {
            return Err(crate::error::PdfPressError::config(
                "min_dpi and image_default_dpi must be positive",
            ));
        }
        if self.pixel_ceiling == 0 {
            return Err(crate::error::PdfPressError::config(
                "pixel_ceiling must be positive",
            ));
        }
        for level in CompressionLevel::LOSSY {
            if let Some(params) = self.levels.get(level)
                && (params.dpi == 0 || !(1..=100).contains(&params.quality))
            {
                return Err(crate::error::PdfPressError::config(format!(
                    "levels.{level}: dpi must be positive and quality within 1-100"
                )));
            }
            if let Some(band) = self.image_bands.get(level) {
                band.validate().map_err(|e| {
                    crate::error::PdfPressError::config(format!("image_bands.{level}: {e}"))
                })?;
            }
        }
        Ok(())
    }
}

/// PDF由来ページのレベル別ラスタライズ設定。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LevelTable {
    pub min: LevelParams,
    pub med: LevelParams,
    pub max: LevelParams,
}

impl Default for LevelTable {
    fn default() -> Self {
        LevelTable {
            min: LevelParams {
                mode: RasterMode::Smart,
                dpi: 200,
                quality: 85,
            },
            med: LevelParams {
                mode: RasterMode::All,
                dpi: 150,
                quality: 70,
            },
            max: LevelParams {
                mode: RasterMode::All,
                dpi: 110,
                quality: 50,
            },
        }
    }
}

impl LevelTable {
    /// `None` レベルにはパラメータがない。
    pub fn get(&self, level: CompressionLevel) -> Option<LevelParams> {
        match level {
            CompressionLevel::None => None,
            CompressionLevel::Min => Some(self.min),
            CompressionLevel::Med => Some(self.med),
            CompressionLevel::Max => Some(self.max),
        }
    }
}

/// 画像由来ユニットのレベル別バンド設定。
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BandTable {
    pub min: BandParams,
    pub med: BandParams,
    pub max: BandParams,
}

impl Default for BandTable {
    fn default() -> Self {
        BandTable {
            min: BandParams {
                quality_seed: 88,
                keep_max_ratio: Some(0.75),
                keep_min_ratio: Some(0.65),
                max_long_side: None,
                quality_floor: 45,
                subsampling: ChromaSubsampling::Yuv444,
            },
            med: BandParams {
                quality_seed: 75,
                keep_max_ratio: Some(0.48),
                keep_min_ratio: Some(0.30),
                max_long_side: Some(1280),
                quality_floor: 30,
                subsampling: ChromaSubsampling::Yuv420,
            },
            max: BandParams {
                quality_seed: 65,
                keep_max_ratio: Some(0.30),
                keep_min_ratio: None,
                max_long_side: Some(2000),
                quality_floor: 24,
                subsampling: ChromaSubsampling::Yuv420,
            },
        }
    }
}

impl BandTable {
    pub fn get(&self, level: CompressionLevel) -> Option<&BandParams> {
        match level {
            CompressionLevel::None => None,
            CompressionLevel::Min => Some(&self.min),
            CompressionLevel::Med => Some(&self.med),
            CompressionLevel::Max => Some(&self.max),
        }
    }
}
