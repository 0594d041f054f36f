// 合成: 選択結果の単一ページPDFを順に取り込み、回転を付けて1つの文書にする

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::Engine;
use super::unit::{LoadedSource, PageDirective, PageUnit, SourceInput};
use crate::config::level::{CompressionLevel, Rotation};
use crate::error::PdfPressError;
use crate::pdf::reader::SourceDocument;
use crate::pdf::writer::PageWriter;

/// 合成する1ユニット。
#[derive(Debug, Clone, Copy)]
pub struct ComposeItem<'a> {
    pub unit: PageUnit<'a>,
    pub level: CompressionLevel,
    pub rotation: Rotation,
}

/// 取り込めなかったユニットの記録。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipNote {
    /// 入力列での位置（0始まり）
    pub position: usize,
    pub reason: String,
}

/// 合成結果。
#[derive(Debug, Clone)]
pub struct Composition {
    pub pdf: Vec<u8>,
    pub pages: usize,
    pub skipped: Vec<SkipNote>,
}

/// ソースの並びとページ指示に解決済みの合成計画。
struct Plan<'a> {
    sources: Vec<SourceInput<'a>>,
    /// (入力列での位置, 指示)
    entries: Vec<(usize, PageDirective)>,
}

impl Engine {
    /// ユニットを指定順に合成する。
    ///
    /// 1ユニットの失敗（壊れた入力、復号できない暗号化PDF、範囲外のページ）は
    /// `skipped` に記録して続行する。1ページも残らなければエラー。
    pub fn compose(&self, items: &[ComposeItem<'_>]) -> crate::error::Result<Composition> {
        let mut plan = Plan {
            sources: Vec::new(),
            entries: Vec::with_capacity(items.len()),
        };
        for (position, item) in items.iter().enumerate() {
            let source_index = plan.source_index(item.unit.source());
            let directive = PageDirective::new(source_index, item.unit.page_index)
                .with_level(item.level)
                .with_rotation(item.rotation);
            plan.entries.push((position, directive));
        }
        self.compose_plan(plan)
    }

    /// 呼び出し側のページ指示から合成する。`keep == false` の指示は除外する。
    pub fn compose_directives(
        &self,
        sources: &[SourceInput<'_>],
        directives: &[PageDirective],
    ) -> crate::error::Result<Composition> {
        let plan = Plan {
            sources: sources.to_vec(),
            entries: directives
                .iter()
                .copied()
                .enumerate()
                .filter(|(_, d)| d.keep)
                .collect(),
        };
        self.compose_plan(plan)
    }

    fn compose_plan(&self, plan: Plan<'_>) -> crate::error::Result<Composition> {
        let loaded: Vec<crate::error::Result<LoadedSource<'_>>> =
            plan.sources.iter().map(LoadedSource::load).collect();

        let mut writer = PageWriter::new();
        let mut skipped = Vec::new();

        for (position, directive) in plan.entries {
            let outcome = match loaded.get(directive.source) {
                Some(Ok(source)) => self.insert_unit(&mut writer, source, &directive),
                Some(Err(e)) => Err(PdfPressError::pdf_read(format!("source unreadable: {e}"))),
                None => Err(PdfPressError::config(format!(
                    "directive refers to missing source #{}",
                    directive.source
                ))),
            };
            if let Err(e) = outcome {
                warn!(
                    position,
                    source = directive.source,
                    page_index = directive.page_index,
                    error_kind = e.kind(),
                    error = %e,
                    "unit skipped"
                );
                skipped.push(SkipNote {
                    position,
                    reason: e.to_string(),
                });
            }
        }

        let pages = writer.page_count();
        if pages == 0 {
            return Err(PdfPressError::pdf_write(
                "no pages could be composed from the given units",
            ));
        }
        let pdf = writer.finish()?;
        info!(pages, skipped = skipped.len(), bytes = pdf.len(), "composed");

        Ok(Composition {
            pdf,
            pages,
            skipped,
        })
    }

    fn insert_unit(
        &self,
        writer: &mut PageWriter,
        source: &LoadedSource<'_>,
        directive: &PageDirective,
    ) -> crate::error::Result<()> {
        if !source.contains_page(directive.page_index) {
            return Err(PdfPressError::pdf_read(format!(
                "page index {} out of range (document has {} pages)",
                directive.page_index,
                source.page_count()
            )));
        }
        let selection = self.select_loaded(source, directive.page_index, directive.level)?;
        let page_id = writer.import_first_page(&selection.pdf)?;
        if let Err(e) = writer.set_rotation(page_id, directive.rotation) {
            writer.discard_last_page();
            return Err(e);
        }
        Ok(())
    }

    /// PDFから指定ページだけを1:1で抜き出す（圧縮しない）。
    ///
    /// `keep_indices` は0始まり。整列・重複除去し、範囲外は無視する。
    /// `rotations` に載っているページには回転を設定する。
    pub fn subset(
        &self,
        pdf: &[u8],
        keep_indices: &[u32],
        rotations: &BTreeMap<u32, Rotation>,
    ) -> crate::error::Result<Vec<u8>> {
        let source = SourceDocument::load(pdf)?;

        let mut indices: Vec<u32> = keep_indices
            .iter()
            .copied()
            .filter(|&i| i < source.page_count())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        if indices.is_empty() {
            return Err(PdfPressError::pdf_write("no pages selected for split"));
        }

        let mut writer = PageWriter::new();
        for page_index in indices {
            let page_id = writer.import_page(source.document(), source.page_id(page_index)?)?;
            let rotation = rotations.get(&page_index).copied().unwrap_or_default();
            writer.set_rotation(page_id, rotation)?;
        }
        writer.finish()
    }
}

impl<'a> Plan<'a> {
    /// 同じバイト列を指すユニットは1つのソースにまとめる（PDFのパースは1回）。
    fn source_index(&mut self, input: SourceInput<'a>) -> usize {
        let position = self.sources.iter().position(|s| {
            std::ptr::eq(s.bytes.as_ptr(), input.bytes.as_ptr())
                && s.bytes.len() == input.bytes.len()
                && s.kind == input.kind
        });
        match position {
            Some(index) => index,
            None => {
                self.sources.push(input);
                self.sources.len() - 1
            }
        }
    }
}
