use serde::{Deserialize, Serialize};

/// User-facing compression tier, applied per page or globally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    #[default]
    None,
    Min,
    Med,
    Max,
}

impl CompressionLevel {
    /// All lossy tiers in ascending order.
    pub const LOSSY: [CompressionLevel; 3] = [Self::Min, Self::Med, Self::Max];

    /// Tiers evaluated when `self` is requested: `min..=self`.
    ///
    /// A higher tier is not guaranteed to produce a smaller artifact, so the
    /// selector always compares against the lower tiers as well.
    pub fn ladder(self) -> impl Iterator<Item = CompressionLevel> {
        Self::LOSSY.into_iter().filter(move |l| *l <= self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Min => "min",
            Self::Med => "med",
            Self::Max => "max",
        }
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompressionLevel {
    type Err = crate::error::PdfPressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "min" => Ok(Self::Min),
            "med" => Ok(Self::Med),
            "max" => Ok(Self::Max),
            other => Err(crate::error::PdfPressError::config(format!(
                "unknown compression level '{other}' (expected none, min, med or max)"
            ))),
        }
    }
}

/// Which pages of a PDF a level rasterizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterMode {
    /// Never rasterize.
    None,
    /// Rasterize only image-only pages.
    Smart,
    /// Rasterize every page.
    All,
}

/// Rasterization parameters for PDF-origin pages at one level.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LevelParams {
    pub mode: RasterMode,
    pub dpi: u32,
    pub quality: u8,
}

/// Page rotation in clockwise quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Builds a rotation from any multiple of 90 degrees (negative values and
    /// full turns are normalised).
    pub fn from_degrees(degrees: i64) -> crate::error::Result<Self> {
        match degrees.rem_euclid(360) {
            0 => Ok(Self::R0),
            90 => Ok(Self::R90),
            180 => Ok(Self::R180),
            270 => Ok(Self::R270),
            _ => Err(crate::error::PdfPressError::config(format!(
                "rotation must be a multiple of 90 degrees, got {degrees}"
            ))),
        }
    }

    pub fn degrees(self) -> i64 {
        match self {
            Self::R0 => 0,
            Self::R90 => 90,
            Self::R180 => 180,
            Self::R270 => 270,
        }
    }
}

impl<'de> Deserialize<'de> for Rotation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let degrees = i64::deserialize(deserializer)?;
        Rotation::from_degrees(degrees).map_err(serde::de::Error::custom)
    }
}
