// 圧縮エンジン: 候補生成 → ガードレール付き選択 → 見積もり / 合成

pub mod candidate;
pub mod compositor;
pub mod estimator;
pub mod selector;
pub mod unit;

use tracing::warn;

use crate::config::settings::Settings;
use crate::pdf::classifier::{ContentStreamClassifier, PageClassifier};
use crate::render::PageRenderer;

/// 見積もりと合成の共通エントリポイント。
///
/// 呼び出し間で状態を持たない。同じ入力・レベル・回転からは同じバイト列が得られる。
pub struct Engine {
    settings: Settings,
    renderer: Option<Box<dyn PageRenderer>>,
    classifier: Box<dyn PageClassifier>,
}

impl Engine {
    /// 既定のレンダラ（pdfium）と分類器で作る。
    ///
    /// pdfiumが見つからない場合、PDFページはラスタライズされず常にコピーされる。
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            renderer: default_renderer(),
            classifier: Box::new(ContentStreamClassifier),
        }
    }

    /// レンダラを明示して作る。
    pub fn with_renderer(settings: Settings, renderer: Box<dyn PageRenderer>) -> Self {
        Self {
            settings,
            renderer: Some(renderer),
            classifier: Box::new(ContentStreamClassifier),
        }
    }

    /// PDFページのラスタライズを行わないエンジン。画像ユニットは通常どおり圧縮する。
    pub fn without_renderer(settings: Settings) -> Self {
        Self {
            settings,
            renderer: None,
            classifier: Box::new(ContentStreamClassifier),
        }
    }

    /// 分類器を差し替える。
    pub fn with_classifier(mut self, classifier: Box<dyn PageClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }
}

#[cfg(feature = "pdfium")]
fn default_renderer() -> Option<Box<dyn PageRenderer>> {
    match crate::render::pdfium::PdfiumRenderer::new() {
        Ok(renderer) => Some(Box::new(renderer)),
        Err(e) => {
            warn!(error = %e, "pdfium unavailable; PDF pages will be copied without rasterization");
            None
        }
    }
}

#[cfg(not(feature = "pdfium"))]
fn default_renderer() -> Option<Box<dyn PageRenderer>> {
    warn!("built without pdfium; PDF pages will be copied without rasterization");
    None
}
