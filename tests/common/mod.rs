// テスト用の入力生成（PDFはlopdfでその場で組み立てる）とスタブレンダラ
#![allow(dead_code)]

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pdfpress::config::settings::Settings;
use pdfpress::engine::Engine;
use pdfpress::error::PdfPressError;
use pdfpress::pdf::reader::SourceDocument;
use pdfpress::render::PageRenderer;

/// テストページの中身。
#[derive(Debug, Clone, Copy)]
pub enum PageContent {
    /// 通常のテキスト
    Text,
    /// 不可視テキスト（OCRレイヤ相当、Tr 3）
    InvisibleText,
    /// 線と塗り
    Vector,
    /// クリップのみのパス
    ClipOnly,
    /// ノイズ画像を全面に貼ったスキャン相当のページ（一辺の画素数）
    ScannedImage(u32),
    /// Form XObject の中にテキスト
    FormWithText,
    /// 空文字列だけのテキスト描画
    EmptyText,
    /// 何もない
    Blank,
}

#[derive(Debug, Clone, Copy)]
pub struct TestPage {
    pub content: PageContent,
    pub width: i64,
    pub height: i64,
}

pub fn letter(content: PageContent) -> TestPage {
    TestPage {
        content,
        width: 612,
        height: 792,
    }
}

pub fn sized(content: PageContent, width: i64, height: i64) -> TestPage {
    TestPage {
        content,
        width,
        height,
    }
}

fn helvetica() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    }
}

/// 決定的な疑似乱数（xorshift32）でノイズ画像を作る。
pub fn noise_rgb(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.max(1);
    RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xFF) as u8
        };
        Rgb([next(), next(), next()])
    })
}

/// なめらかな写真風の画像（グラデーション + 弱いノイズ）。
pub fn smooth_rgb(width: u32, height: u32) -> RgbImage {
    let noise = noise_rgb(width.min(64), height.min(64), 7);
    RgbImage::from_fn(width, height, |x, y| {
        let n = noise.get_pixel(x % noise.width(), y % noise.height());
        let r = (x * 200 / width.max(1)) as u8;
        let g = (y * 180 / height.max(1)) as u8;
        let b = ((x + y) * 120 / (width + height).max(1)) as u8;
        Rgb([
            r.saturating_add(n[0] >> 5),
            g.saturating_add(n[1] >> 5),
            b.saturating_add(n[2] >> 5),
        ])
    })
}

pub fn jpeg_bytes(img: &RgbImage, quality: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    DynamicImage::ImageRgb8(img.clone())
        .write_with_encoder(encoder)
        .expect("JPEG encode");
    buf
}

pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut buf, ImageFormat::Png)
        .expect("PNG encode");
    buf.into_inner()
}

fn page_body(doc: &mut Document, content: PageContent, width: i64, height: i64) -> (Vec<u8>, Dictionary) {
    match content {
        PageContent::Text => (
            b"BT /F1 12 Tf 72 720 Td (Hello, world) Tj ET".to_vec(),
            dictionary! { "Font" => dictionary! { "F1" => helvetica() } },
        ),
        PageContent::InvisibleText => (
            b"BT 3 Tr /F1 12 Tf 72 720 Td [(hidden) -250 (ocr)] TJ ET".to_vec(),
            dictionary! { "Font" => dictionary! { "F1" => helvetica() } },
        ),
        PageContent::EmptyText => (
            b"BT /F1 12 Tf 72 720 Td () Tj [()] TJ ET".to_vec(),
            dictionary! { "Font" => dictionary! { "F1" => helvetica() } },
        ),
        PageContent::Vector => (
            b"1 0 0 RG 2 w 72 72 m 540 720 l S 0 0 1 rg 100 100 200 150 re f".to_vec(),
            Dictionary::new(),
        ),
        PageContent::ClipOnly => (b"q 0 0 100 100 re W n Q".to_vec(), Dictionary::new()),
        PageContent::Blank => (Vec::new(), Dictionary::new()),
        PageContent::ScannedImage(side) => {
            let img = noise_rgb(side, side, side + 11);
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => side as i64,
                    "Height" => side as i64,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                },
                img.into_raw(),
            ));
            (
                format!("q {width} 0 0 {height} 0 0 cm /Im0 Do Q").into_bytes(),
                dictionary! { "XObject" => dictionary! { "Im0" => image_id } },
            )
        }
        PageContent::FormWithText => {
            let form_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), width.into(), height.into()],
                    "Resources" => dictionary! { "Font" => dictionary! { "F1" => helvetica() } },
                },
                b"BT /F1 10 Tf 72 72 Td (Inside a form) Tj ET".to_vec(),
            ));
            (
                b"q /Fm0 Do Q".to_vec(),
                dictionary! { "XObject" => dictionary! { "Fm0" => form_id } },
            )
        }
    }
}

/// ページ列からPDFを作る。
pub fn build_pdf(pages: &[TestPage]) -> Vec<u8> {
    let mut doc = build_document(pages);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save test PDF");
    buf
}

pub fn build_document(pages: &[TestPage]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for page in pages {
        let (content, resources) = page_body(&mut doc, page.content, page.width, page.height);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page.width.into(), page.height.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// 単色の画像を返すレンダラ。ページ寸法とDPIから画素数を決める。
pub struct FlatRenderer;

impl PageRenderer for FlatRenderer {
    fn render(&self, pdf: &[u8], page_index: u32, dpi: u32) -> pdfpress::error::Result<DynamicImage> {
        let source = SourceDocument::load(pdf)?;
        let (w, h) = source.page_dimensions(page_index)?;
        let width = ((w * dpi as f64 / 72.0).round() as u32).max(1);
        let height = ((h * dpi as f64 / 72.0).round() as u32).max(1);
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([240, 240, 235]),
        )))
    }
}

/// 常に失敗するレンダラ。
pub struct FailingRenderer;

impl PageRenderer for FailingRenderer {
    fn render(&self, _pdf: &[u8], _page_index: u32, _dpi: u32) -> pdfpress::error::Result<DynamicImage> {
        Err(PdfPressError::render("renderer unavailable in test"))
    }
}

pub fn flat_engine() -> Engine {
    Engine::with_renderer(Settings::default(), Box::new(FlatRenderer))
}

/// ページのコンテンツストリームを展開して連結する。
pub fn page_content(doc: &Document, page_id: ObjectId) -> Vec<u8> {
    let page = doc.get_dictionary(page_id).expect("page dict");
    let ids: Vec<ObjectId> = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![*id],
        Ok(Object::Array(items)) => items.iter().filter_map(|o| o.as_reference().ok()).collect(),
        _ => Vec::new(),
    };
    let mut content = Vec::new();
    for id in ids {
        let stream = doc.get_object(id).and_then(Object::as_stream).expect("content stream");
        content.extend(stream.decompressed_content().unwrap_or_else(|_| stream.content.clone()));
    }
    content
}

/// ページのリソース辞書（直接または参照）。
pub fn page_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    let page = doc.get_dictionary(page_id).expect("page dict");
    match page.get(b"Resources") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).expect("resources").clone(),
        _ => Dictionary::new(),
    }
}

/// ページが参照する画像XObjectの Filter 名。
pub fn image_filters(doc: &Document, page_id: ObjectId) -> Vec<String> {
    let resources = page_resources(doc, page_id);
    let xobjects = match resources.get(b"XObject") {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).expect("xobjects").clone(),
        _ => return Vec::new(),
    };
    let mut filters = Vec::new();
    for (_, value) in xobjects.iter() {
        let Ok(id) = value.as_reference() else {
            continue;
        };
        let Ok(stream) = doc.get_object(id).and_then(Object::as_stream) else {
            continue;
        };
        if stream.dict.get(b"Subtype").and_then(Object::as_name).ok() != Some(b"Image".as_slice()) {
            continue;
        }
        if let Ok(filter) = stream.dict.get(b"Filter").and_then(Object::as_name) {
            filters.push(String::from_utf8_lossy(filter).into_owned());
        }
    }
    filters
}

/// ページの MediaBox の幅と高さ。
pub fn media_size(doc: &Document, page_id: ObjectId) -> (f64, f64) {
    let page = doc.get_dictionary(page_id).expect("page dict");
    let media_box = page.get(b"MediaBox").and_then(Object::as_array).expect("MediaBox");
    let num = |o: &Object| match o {
        Object::Integer(i) => *i as f64,
        Object::Real(r) => *r as f64,
        other => panic!("unexpected MediaBox entry {other:?}"),
    };
    (
        num(&media_box[2]) - num(&media_box[0]),
        num(&media_box[3]) - num(&media_box[1]),
    )
}

/// ページの /Rotate（無ければ0）。
pub fn rotate_of(doc: &Document, page_id: ObjectId) -> i64 {
    doc.get_dictionary(page_id)
        .expect("page dict")
        .get(b"Rotate")
        .and_then(Object::as_i64)
        .unwrap_or(0)
}
