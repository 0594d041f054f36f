// PDFページのラスタライズ: レンダラの差し替え口とDPI上限

pub mod dpi;
#[cfg(feature = "pdfium")]
pub mod pdfium;

use image::DynamicImage;

/// PDFページをビットマップにする。
///
/// 既定はpdfium実装。テストやpdfiumの無い環境では別実装を差し込む。
pub trait PageRenderer {
    /// `pdf` の `page_index`(0始まり) ページを `dpi` でレンダリングする。
    fn render(&self, pdf: &[u8], page_index: u32, dpi: u32) -> crate::error::Result<DynamicImage>;
}
