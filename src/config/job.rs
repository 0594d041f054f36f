use std::collections::BTreeMap;

use serde::Deserialize;

use super::level::{CompressionLevel, Rotation};

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

/// 1ジョブ = 1出力PDF。`sources`（結合）か `split`（抽出）のどちらか一方を持つ。
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub output: String,
    pub level: Option<CompressionLevel>,
    pub estimate_only: Option<bool>,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    pub split: Option<SplitEntry>,
}

/// 結合対象の入力ファイル（PDFまたは画像）。
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    pub input: String,
    /// 1始まりのページ順序。記述順を保持する（並べ替え用）。
    #[serde(default, deserialize_with = "deserialize_page_order")]
    pub pages: Option<Vec<u32>>,
    pub level: Option<CompressionLevel>,
    pub rotate: Option<Rotation>,
}

/// 1つのPDFから指定ページだけを抜き出す。
#[derive(Debug, Clone, Deserialize)]
pub struct SplitEntry {
    pub input: String,
    #[serde(deserialize_with = "deserialize_pages")]
    pub pages: Vec<u32>,
    /// 1始まりのページ番号 → 回転角
    #[serde(default, deserialize_with = "deserialize_page_rotations")]
    pub rotate: BTreeMap<u32, Rotation>,
}

impl Job {
    /// `sources` と `split` の排他性を検証する。
    pub fn validate(&self) -> crate::error::Result<()> {
        match (self.sources.is_empty(), &self.split) {
            (true, None) => Err(crate::error::PdfPressError::config(format!(
                "job '{}' has neither sources nor split",
                self.output
            ))),
            (false, Some(_)) => Err(crate::error::PdfPressError::config(format!(
                "job '{}' cannot have both sources and split",
                self.output
            ))),
            _ => Ok(()),
        }
    }
}

/// ページ範囲文字列を記述順のままページ番号列に展開する。
///
/// 形式:
/// - 単一ページ: `"5"`
/// - 範囲: `"5-10"` (5, 6, 7, 8, 9, 10)
/// - 混合（カンマ区切り）: `"3, 1, 5-7"`
///
/// ページ番号は1始まり。0は不正。
pub fn parse_page_order(s: &str) -> crate::error::Result<Vec<u32>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(crate::error::PdfPressError::config(
            "Page range cannot be empty",
        ));
    }

    let mut pages = Vec::new();

    for part in trimmed.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start_str, end_str)) = part.split_once('-') {
            let start = parse_page_number(start_str)?;
            let end = parse_page_number(end_str)?;

            if start > end {
                return Err(crate::error::PdfPressError::config(format!(
                    "Invalid page range: start ({start}) > end ({end})"
                )));
            }

            pages.extend(start..=end);
        } else {
            pages.push(parse_page_number(part)?);
        }
    }

    if pages.is_empty() {
        return Err(crate::error::PdfPressError::config(
            "Page range resolved to empty set",
        ));
    }

    Ok(pages)
}

/// ページ範囲文字列をパースし、ソート済み・重複なしのページ番号列を返す。
pub fn parse_page_range(s: &str) -> crate::error::Result<Vec<u32>> {
    let mut pages = parse_page_order(s)?;
    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

fn parse_page_number(s: &str) -> crate::error::Result<u32> {
    let s = s.trim();
    match s.parse::<u32>() {
        Ok(0) => Err(crate::error::PdfPressError::config(
            "Page numbers are 1-based; 0 is not a page",
        )),
        Ok(n) => Ok(n),
        Err(_) => Err(crate::error::PdfPressError::config(format!(
            "Invalid page number: '{s}'"
        ))),
    }
}

/// serdeのdeserialize_withで使用するページ範囲デシリアライザ
fn deserialize_pages<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_page_range(&s).map_err(serde::de::Error::custom)
}

/// ページ番号キーも `pages` と同じく 0 を拒否する。
fn deserialize_page_rotations<'de, D>(deserializer: D) -> Result<BTreeMap<u32, Rotation>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let map = BTreeMap::<u32, Rotation>::deserialize(deserializer)?;
    for page in map.keys() {
        parse_page_number(&page.to_string()).map_err(serde::de::Error::custom)?;
    }
    Ok(map)
}

fn deserialize_page_order<'de, D>(deserializer: D) -> Result<Option<Vec<u32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    s.map(|s| parse_page_order(&s))
        .transpose()
        .map_err(serde::de::Error::custom)
}
