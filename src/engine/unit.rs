// エンジンの入力単位: ソース種別の判定、ページ単位、呼び出し側のページ指示

use std::path::Path;

use crate::config::level::{CompressionLevel, Rotation};
use crate::pdf::image_xobject::guess_image_format;
use crate::pdf::reader::SourceDocument;

/// PDFヘッダを探す範囲。先頭にゴミが付いたPDFも受け付ける。
const PDF_HEADER_SEARCH_LEN: usize = 1024;

/// 画像として扱う拡張子（マジックバイトで判定できない場合の補助）。
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "pnm", "pbm", "pgm", "ppm",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Pdf,
    Image,
}

impl SourceKind {
    /// マジックバイトで種別を判定する。判定できなければファイル名の拡張子を見る。
    pub fn detect(bytes: &[u8], file_name: Option<&Path>) -> Option<Self> {
        let head = &bytes[..bytes.len().min(PDF_HEADER_SEARCH_LEN)];
        if head.windows(5).any(|w| w == b"%PDF-") {
            return Some(Self::Pdf);
        }
        if guess_image_format(bytes).is_some() {
            return Some(Self::Image);
        }

        let ext = file_name?
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        if ext == "pdf" {
            Some(Self::Pdf)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
        }
    }
}

/// 1つの入力ファイル（借用）。
#[derive(Debug, Clone, Copy)]
pub struct SourceInput<'a> {
    pub bytes: &'a [u8],
    pub kind: SourceKind,
}

impl<'a> SourceInput<'a> {
    pub fn new(bytes: &'a [u8], kind: SourceKind) -> Self {
        Self { bytes, kind }
    }

    pub fn pdf(bytes: &'a [u8]) -> Self {
        Self::new(bytes, SourceKind::Pdf)
    }

    pub fn image(bytes: &'a [u8]) -> Self {
        Self::new(bytes, SourceKind::Image)
    }

    /// ページ単位に切り出す。画像では `page_index` は無視される。
    pub fn unit(&self, page_index: u32) -> PageUnit<'a> {
        PageUnit {
            bytes: self.bytes,
            kind: self.kind,
            page_index,
        }
    }
}

/// 圧縮の対象単位: PDFの1ページ、または画像1枚。
#[derive(Debug, Clone, Copy)]
pub struct PageUnit<'a> {
    pub bytes: &'a [u8],
    pub kind: SourceKind,
    /// 0始まり。画像では無視される。
    pub page_index: u32,
}

impl<'a> PageUnit<'a> {
    pub fn pdf_page(bytes: &'a [u8], page_index: u32) -> Self {
        Self {
            bytes,
            kind: SourceKind::Pdf,
            page_index,
        }
    }

    pub fn image(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            kind: SourceKind::Image,
            page_index: 0,
        }
    }

    pub fn source(&self) -> SourceInput<'a> {
        SourceInput::new(self.bytes, self.kind)
    }
}

/// 読み込み済みの入力。PDFは一度だけパースし、複数ページで共有する。
pub enum LoadedSource<'a> {
    Pdf(SourceDocument<'a>),
    Image(&'a [u8]),
}

impl<'a> LoadedSource<'a> {
    /// PDFをパースする（暗号化PDFは空パスワードで復号）。画像はデコードを遅延する。
    pub fn load(input: &SourceInput<'a>) -> crate::error::Result<Self> {
        match input.kind {
            SourceKind::Pdf => Ok(Self::Pdf(SourceDocument::load(input.bytes)?)),
            SourceKind::Image => Ok(Self::Image(input.bytes)),
        }
    }

    /// ページ数。画像は常に1。
    pub fn page_count(&self) -> u32 {
        match self {
            Self::Pdf(source) => source.page_count(),
            Self::Image(_) => 1,
        }
    }

    pub fn contains_page(&self, page_index: u32) -> bool {
        match self {
            Self::Pdf(source) => page_index < source.page_count(),
            Self::Image(_) => true,
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Pdf(_) => SourceKind::Pdf,
            Self::Image(_) => SourceKind::Image,
        }
    }
}

/// 呼び出し側が持つページ指示。エンジンは読むだけ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDirective {
    /// `sources` スライス内の位置
    pub source: usize,
    /// 0始まり。画像では無視される。
    pub page_index: u32,
    pub rotation: Rotation,
    pub level: CompressionLevel,
    pub keep: bool,
}

impl PageDirective {
    pub fn new(source: usize, page_index: u32) -> Self {
        Self {
            source,
            page_index,
            rotation: Rotation::R0,
            level: CompressionLevel::None,
            keep: true,
        }
    }

    pub fn with_level(mut self, level: CompressionLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn dropped(mut self) -> Self {
        self.keep = false;
        self
    }
}
