// 見積もり: 合成と同じ選択経路を通し、長さだけを返す

use tracing::{debug, warn};

use super::Engine;
use super::unit::{LoadedSource, PageDirective, SourceInput};
use crate::config::level::CompressionLevel;
use crate::pdf::reader::SourceDocument;

/// 変換前後の見積もりサイズ（バイト）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeEstimate {
    pub before: u64,
    pub after: u64,
}

impl SizeEstimate {
    pub fn saved(&self) -> u64 {
        self.before.saturating_sub(self.after)
    }

    /// after / before。before が0なら1.0。
    pub fn ratio(&self) -> f64 {
        if self.before == 0 {
            1.0
        } else {
            self.after as f64 / self.before as f64
        }
    }
}

impl Engine {
    /// PDF全体の見積もり。`none` なら入力長そのもの。
    ///
    /// それ以外はページごとの選択結果の長さに、文書・ページ単位の固定
    /// オーバーヘッドを加えたもの。読めないPDFは入力長を返す。
    pub fn estimate(&self, pdf: &[u8], level: CompressionLevel) -> u64 {
        if level == CompressionLevel::None {
            return pdf.len() as u64;
        }
        let source = match SourceDocument::load(pdf) {
            Ok(doc) => LoadedSource::Pdf(doc),
            Err(e) => {
                debug!(error = %e, "unreadable PDF; estimating as raw length");
                return pdf.len() as u64;
            }
        };

        let page_overhead = self.settings.page_overhead;
        (0..source.page_count()).fold(self.settings.doc_overhead, |total, page_index| {
            total + self.selected_len(&source, page_index, level, pdf.len()) + page_overhead
        })
    }

    /// 1ページの見積もり（選択結果の単一ページPDFの長さ）。範囲外のページは0。
    pub fn estimate_page(&self, pdf: &[u8], page_index: u32, level: CompressionLevel) -> u64 {
        let source = match SourceDocument::load(pdf) {
            Ok(doc) => LoadedSource::Pdf(doc),
            Err(e) => {
                debug!(error = %e, "unreadable PDF; estimating as raw length");
                return pdf.len() as u64;
            }
        };
        if !source.contains_page(page_index) {
            return 0;
        }
        self.selected_len(&source, page_index, level, pdf.len())
    }

    /// 画像1枚の見積もり（選択結果の単一ページPDFの長さ）。
    pub fn estimate_image(&self, image: &[u8], level: CompressionLevel) -> u64 {
        self.selected_len(&LoadedSource::Image(image), 0, level, image.len())
    }

    /// 読み込み済みソースの1ページの選択結果の長さ。失敗時は `fallback_len`。
    pub fn selected_len(
        &self,
        source: &LoadedSource<'_>,
        page_index: u32,
        level: CompressionLevel,
        fallback_len: usize,
    ) -> u64 {
        match self.select_loaded(source, page_index, level) {
            Ok(selection) => selection.pdf.len() as u64,
            Err(e) => {
                warn!(
                    kind = source.kind().as_str(),
                    page_index,
                    error = %e,
                    "unit could not be estimated; using raw length"
                );
                fallback_len as u64
            }
        }
    }

    /// ページ指示の並び全体について、無圧縮と要求レベルの合計を見積もる。
    ///
    /// `keep == false` の指示と、範囲外・読めないソースを指す指示は数えない。
    pub fn estimate_directives(
        &self,
        sources: &[SourceInput<'_>],
        directives: &[PageDirective],
    ) -> SizeEstimate {
        let loaded: Vec<Option<LoadedSource<'_>>> = sources
            .iter()
            .map(|input| LoadedSource::load(input).ok())
            .collect();

        let page_overhead = self.settings.page_overhead;
        let mut estimate = SizeEstimate {
            before: self.settings.doc_overhead,
            after: self.settings.doc_overhead,
        };
        for directive in directives.iter().filter(|d| d.keep) {
            let Some(Some(source)) = loaded.get(directive.source) else {
                continue;
            };
            if !source.contains_page(directive.page_index) {
                continue;
            }
            let raw_len = sources[directive.source].bytes.len();
            let before = self.selected_len(source, directive.page_index, CompressionLevel::None, raw_len);
            let after = if directive.level == CompressionLevel::None {
                before
            } else {
                self.selected_len(source, directive.page_index, directive.level, raw_len)
            };
            estimate.before += before + page_overhead;
            estimate.after += after + page_overhead;
        }
        estimate
    }
}
