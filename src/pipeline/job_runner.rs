// ジョブ単位: 入力読込 -> 見積もり（キャッシュ経由）-> 合成/抽出 -> 出力書込

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cache::hash::compute_unit_key;
use crate::cache::store::EstimateCache;
use crate::config::job::Job;
use crate::config::level::{CompressionLevel, Rotation};
use crate::config::merged::MergedConfig;
use crate::config::settings::Settings;
use crate::engine::Engine;
use crate::engine::compositor::SkipNote;
use crate::engine::estimator::SizeEstimate;
use crate::engine::unit::{LoadedSource, PageDirective, SourceInput, SourceKind};
use crate::error::PdfPressError;

/// 結合対象の入力（設定解決済み）。
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub input_path: PathBuf,
    /// 1始まりのページ順序。None なら全ページ。画像では無視される。
    pub pages: Option<Vec<u32>>,
    pub level: CompressionLevel,
    pub rotation: Rotation,
}

/// 抽出の指定（設定解決済み）。
#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub input_path: PathBuf,
    /// 1始まり、整列・重複なし
    pub pages: Vec<u32>,
    /// 1始まりのページ番号 → 回転
    pub rotate: BTreeMap<u32, Rotation>,
}

#[derive(Debug, Clone)]
pub enum JobMode {
    Merge(Vec<SourceConfig>),
    Split(SplitConfig),
}

/// Configuration for a single job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub output_path: PathBuf,
    pub mode: JobMode,
    pub estimate_only: bool,
    pub settings: Settings,
}

/// Result of processing a single job.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub output_path: PathBuf,
    pub pages_written: usize,
    pub estimate: SizeEstimate,
    /// 書き出したPDFの長さ。`estimate_only` なら None。
    pub output_len: Option<u64>,
    pub skipped: Vec<SkipNote>,
}

impl JobConfig {
    /// ジョブ定義と設定から作る。相対パスはジョブファイルのディレクトリ基準。
    pub fn from_job(job: &Job, settings: &Settings, job_dir: &Path) -> crate::error::Result<Self> {
        job.validate()?;
        let merged = MergedConfig::new(settings, job);

        let mode = match &job.split {
            Some(split) => JobMode::Split(SplitConfig {
                input_path: resolve_path(job_dir, &split.input),
                pages: split.pages.clone(),
                rotate: split.rotate.clone(),
            }),
            None => JobMode::Merge(
                job.sources
                    .iter()
                    .map(|source| {
                        let (level, rotation) = merged.for_source(source);
                        SourceConfig {
                            input_path: resolve_path(job_dir, &source.input),
                            pages: source.pages.clone(),
                            level,
                            rotation,
                        }
                    })
                    .collect(),
            ),
        };

        Ok(Self {
            output_path: resolve_path(job_dir, &job.output),
            mode,
            estimate_only: merged.estimate_only,
            settings: settings.clone(),
        })
    }
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
pub fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// 1ジョブを実行する。
///
/// 入力ファイルが読めない・種別が判定できない場合はジョブ全体のエラー。
/// 入力の中身が壊れている場合はそのユニットだけを飛ばして続行する。
pub fn run_job(
    engine: &Engine,
    cache: &mut EstimateCache,
    config: &JobConfig,
) -> crate::error::Result<JobResult> {
    match &config.mode {
        JobMode::Merge(sources) => run_merge(engine, cache, config, sources),
        JobMode::Split(split) => run_split(engine, config, split),
    }
}

fn run_merge(
    engine: &Engine,
    cache: &mut EstimateCache,
    config: &JobConfig,
    sources: &[SourceConfig],
) -> crate::error::Result<JobResult> {
    let mut files: Vec<(Vec<u8>, SourceKind)> = Vec::with_capacity(sources.len());
    for source in sources {
        let bytes = std::fs::read(&source.input_path).map_err(|e| {
            PdfPressError::config(format!("cannot read {}: {e}", source.input_path.display()))
        })?;
        let kind = SourceKind::detect(&bytes, Some(&source.input_path)).ok_or_else(|| {
            PdfPressError::config(format!(
                "{} is neither a PDF nor a supported image",
                source.input_path.display()
            ))
        })?;
        files.push((bytes, kind));
    }

    let inputs: Vec<SourceInput<'_>> = files
        .iter()
        .map(|(bytes, kind)| SourceInput::new(bytes, *kind))
        .collect();
    let loaded: Vec<Option<LoadedSource<'_>>> = inputs
        .iter()
        .map(|input| LoadedSource::load(input).ok())
        .collect();

    let directives = build_directives(sources, &loaded);
    let estimate = estimate_with_cache(engine, cache, &inputs, &loaded, &directives);
    info!(
        output = %config.output_path.display(),
        before = estimate.before,
        after = estimate.after,
        "estimated"
    );

    if config.estimate_only {
        return Ok(JobResult {
            output_path: config.output_path.clone(),
            pages_written: 0,
            estimate,
            output_len: None,
            skipped: Vec::new(),
        });
    }

    let composition = engine.compose_directives(&inputs, &directives)?;
    write_output(&config.output_path, &composition.pdf)?;

    Ok(JobResult {
        output_path: config.output_path.clone(),
        pages_written: composition.pages,
        estimate,
        output_len: Some(composition.pdf.len() as u64),
        skipped: composition.skipped,
    })
}

/// 入力ごとのページ指定を、0始まりのページ指示の列に展開する。
///
/// 読めないPDFには1件だけ指示を出し、合成時にスキップとして記録させる。
fn build_directives(sources: &[SourceConfig], loaded: &[Option<LoadedSource<'_>>]) -> Vec<PageDirective> {
    let mut directives = Vec::new();
    for (index, (source, loaded)) in sources.iter().zip(loaded).enumerate() {
        let page_indices: Vec<u32> = match loaded {
            Some(LoadedSource::Image(_)) => {
                if source.pages.is_some() {
                    warn!(input = %source.input_path.display(), "page selection ignored for image input");
                }
                vec![0]
            }
            Some(LoadedSource::Pdf(doc)) => match &source.pages {
                Some(pages) => pages.iter().map(|p| p - 1).collect(),
                None => (0..doc.page_count()).collect(),
            },
            None => vec![0],
        };
        directives.extend(page_indices.into_iter().map(|page_index| {
            PageDirective::new(index, page_index)
                .with_level(source.level)
                .with_rotation(source.rotation)
        }));
    }
    directives
}

/// 無圧縮と要求レベルの合計サイズを、ユニット単位のキャッシュを通して見積もる。
fn estimate_with_cache(
    engine: &Engine,
    cache: &mut EstimateCache,
    inputs: &[SourceInput<'_>],
    loaded: &[Option<LoadedSource<'_>>],
    directives: &[PageDirective],
) -> SizeEstimate {
    let settings = engine.settings();
    let mut estimate = SizeEstimate {
        before: settings.doc_overhead,
        after: settings.doc_overhead,
    };

    for directive in directives.iter().filter(|d| d.keep) {
        let Some(Some(source)) = loaded.get(directive.source) else {
            continue;
        };
        if !source.contains_page(directive.page_index) {
            continue;
        }
        let bytes = inputs[directive.source].bytes;
        let mut sized = |level: CompressionLevel| {
            let key = compute_unit_key(
                bytes,
                directive.page_index,
                directive.rotation,
                level,
                engine.has_renderer(),
                settings,
            );
            cache.get_or_insert_with(&key, || {
                engine.selected_len(source, directive.page_index, level, bytes.len())
            })
        };
        let before = sized(CompressionLevel::None);
        let after = sized(directive.level);
        estimate.before += before + settings.page_overhead;
        estimate.after += after + settings.page_overhead;
    }
    estimate
}

fn run_split(engine: &Engine, config: &JobConfig, split: &SplitConfig) -> crate::error::Result<JobResult> {
    let bytes = std::fs::read(&split.input_path).map_err(|e| {
        PdfPressError::config(format!("cannot read {}: {e}", split.input_path.display()))
    })?;

    let keep: Vec<u32> = split
        .pages
        .iter()
        .map(|&page| zero_based(page))
        .collect::<crate::error::Result<_>>()?;
    let rotations: BTreeMap<u32, Rotation> = split
        .rotate
        .iter()
        .map(|(&page, rotation)| zero_based(page).map(|page| (page, *rotation)))
        .collect::<crate::error::Result<_>>()?;

    let pdf = engine.subset(&bytes, &keep, &rotations)?;
    let pages_written = lopdf::Document::load_mem(&pdf)?.get_pages().len();
    let estimate = SizeEstimate {
        before: bytes.len() as u64,
        after: pdf.len() as u64,
    };

    if config.estimate_only {
        return Ok(JobResult {
            output_path: config.output_path.clone(),
            pages_written: 0,
            estimate,
            output_len: None,
            skipped: Vec::new(),
        });
    }

    write_output(&config.output_path, &pdf)?;
    Ok(JobResult {
        output_path: config.output_path.clone(),
        pages_written,
        estimate,
        output_len: Some(pdf.len() as u64),
        skipped: Vec::new(),
    })
}

/// 1始まりのページ番号を0始まりにする。0 はページではない。
fn zero_based(page: u32) -> crate::error::Result<u32> {
    page.checked_sub(1)
        .ok_or_else(|| PdfPressError::config("Page numbers are 1-based; 0 is not a page"))
}

fn write_output(path: &Path, pdf: &[u8]) -> crate::error::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, pdf)?;
    Ok(())
}
