// ガードレール付き選択: ベースラインと min..=要求レベル の候補から最小のものを選ぶ

use tracing::debug;

use super::Engine;
use super::candidate::{Baseline, Candidate};
use super::unit::{LoadedSource, PageUnit};
use crate::config::level::CompressionLevel;

/// 選択結果。`level` が None ならベースラインが選ばれた。
#[derive(Debug, Clone)]
pub struct Selection {
    pub pdf: Vec<u8>,
    pub level: Option<CompressionLevel>,
    pub baseline_len: usize,
}

impl Selection {
    pub fn is_baseline(&self) -> bool {
        self.level.is_none()
    }

    /// ベースラインからの削減バイト数。
    pub fn saved_bytes(&self) -> usize {
        self.baseline_len - self.pdf.len()
    }
}

/// 長さ最小のものを返す。同じ長さなら先に来たもの（ベースライン優先）。
///
/// 結果は決してベースラインより長くならない。
pub fn select(baseline: Baseline, candidates: impl IntoIterator<Item = Candidate>) -> Selection {
    let baseline_len = baseline.pdf.len();
    let mut best = Selection {
        pdf: baseline.pdf,
        level: None,
        baseline_len,
    };
    for candidate in candidates {
        if candidate.pdf.len() < best.pdf.len() {
            best = Selection {
                pdf: candidate.pdf,
                level: Some(candidate.level),
                baseline_len,
            };
        }
    }
    best
}

impl Engine {
    /// ユニットを要求レベルで圧縮し、ガードレールを通した結果を返す。
    pub fn select_unit(
        &self,
        unit: &PageUnit<'_>,
        level: CompressionLevel,
    ) -> crate::error::Result<Selection> {
        let source = LoadedSource::load(&unit.source())?;
        self.select_loaded(&source, unit.page_index, level)
    }

    /// 読み込み済みソースの1ページについて選択する。
    ///
    /// `max` を要求しても `min`・`med` の候補を必ず評価する。上位レベルほど
    /// 小さくなるとは限らないため。
    pub fn select_loaded(
        &self,
        source: &LoadedSource<'_>,
        page_index: u32,
        level: CompressionLevel,
    ) -> crate::error::Result<Selection> {
        let baseline = self.baseline_of(source, page_index)?;
        let baseline_len = baseline.pdf.len();
        let candidates: Vec<Candidate> = level
            .ladder()
            .filter_map(|l| self.candidate_of(source, page_index, l, baseline_len))
            .collect();

        let selection = select(baseline, candidates);
        debug!(
            page_index,
            requested = %level,
            chosen = selection.level.map_or("none", CompressionLevel::as_str),
            bytes = selection.pdf.len(),
            baseline_len,
            "selection"
        );
        Ok(selection)
    }
}
