// ページ分類: テキストもベクター描画も持たない「画像のみ」ページの判定

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object};
use tracing::debug;

use super::reader::SourceDocument;

/// Form XObject の入れ子をたどる上限。
const MAX_FORM_DEPTH: usize = 8;

/// テキストを描画するオペレータ。
const TEXT_SHOWING_OPERATORS: &[&str] = &["Tj", "TJ", "'", "\""];

/// パスを塗る・線を引くオペレータ。クリップのみのパス(`n`)は含まない。
const PATH_PAINTING_OPERATORS: &[&str] = &["S", "s", "f", "F", "f*", "B", "B*", "b", "b*"];

/// ページ分類器。別のPDFエンジンに差し替えられるようにトレイト化する。
pub trait PageClassifier {
    /// テキストもベクター描画もないページなら true。
    ///
    /// 判定できない場合は false を返す（ラスタライズせずにコピーする側に倒す）。
    fn is_image_only(&self, source: &SourceDocument<'_>, page_index: u32) -> bool;
}

/// lopdf でコンテンツストリームを走査する既定の分類器。
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentStreamClassifier;

/// ページ内容の走査結果。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageFeatures {
    pub has_text: bool,
    pub has_vectors: bool,
}

impl PageFeatures {
    fn merge(&mut self, other: PageFeatures) {
        self.has_text |= other.has_text;
        self.has_vectors |= other.has_vectors;
    }

    fn done(&self) -> bool {
        self.has_text && self.has_vectors
    }
}

impl PageClassifier for ContentStreamClassifier {
    fn is_image_only(&self, source: &SourceDocument<'_>, page_index: u32) -> bool {
        match scan_page(source, page_index) {
            Ok(features) => !features.has_text && !features.has_vectors,
            Err(e) => {
                debug!(page_index, error = %e, "page scan failed; treating as not image-only");
                false
            }
        }
    }
}

/// ページのコンテンツストリームと、そこから呼ばれる Form XObject を走査する。
pub fn scan_page(
    source: &SourceDocument<'_>,
    page_index: u32,
) -> crate::error::Result<PageFeatures> {
    let content = source.page_content(page_index)?;
    let resources = source.page_resources(page_index)?;
    scan_content(source.document(), &content, &resources, 0)
}

fn scan_content(
    doc: &Document,
    content_bytes: &[u8],
    resources: &[&Dictionary],
    depth: usize,
) -> crate::error::Result<PageFeatures> {
    let mut features = PageFeatures::default();
    if content_bytes.is_empty() {
        return Ok(features);
    }

    let content = Content::decode(content_bytes)
        .map_err(|e| crate::error::PdfPressError::content_stream(e.to_string()))?;

    for op in &content.operations {
        let operator = op.operator.as_str();
        if TEXT_SHOWING_OPERATORS.contains(&operator) {
            features.has_text |= shows_text(op);
        } else if PATH_PAINTING_OPERATORS.contains(&operator) {
            features.has_vectors = true;
        } else if operator == "Do"
            && depth < MAX_FORM_DEPTH
            && let Some(name) = op.operands.first().and_then(|o| o.as_name().ok())
            && let Some(form) = find_form_xobject(doc, resources, name)
        {
            let form_content = form.decompressed_content().unwrap_or_else(|_| form.content.clone());
            let form_resources = match form.dict.get(b"Resources") {
                Ok(Object::Dictionary(d)) => vec![d],
                Ok(Object::Reference(id)) => doc.get_dictionary(*id).into_iter().collect(),
                // リソースを持たないフォームは呼び出し元のリソースを使う
                _ => resources.to_vec(),
            };
            features.merge(scan_content(doc, &form_content, &form_resources, depth + 1)?);
        }

        if features.done() {
            break;
        }
    }

    Ok(features)
}

/// 文字列オペランドが空でなければテキストありとみなす。
fn shows_text(op: &Operation) -> bool {
    op.operands.iter().any(|operand| match operand {
        Object::String(bytes, _) => !bytes.is_empty(),
        Object::Array(items) => items
            .iter()
            .any(|item| matches!(item, Object::String(bytes, _) if !bytes.is_empty())),
        _ => false,
    })
}

/// リソース辞書から Subtype=Form の XObject を探す。画像 XObject は None。
fn find_form_xobject<'d>(
    doc: &'d Document,
    resources: &[&'d Dictionary],
    name: &[u8],
) -> Option<&'d lopdf::Stream> {
    for dict in resources.iter().copied() {
        let xobjects = match dict.get(b"XObject") {
            Ok(Object::Dictionary(d)) => d,
            Ok(Object::Reference(id)) => match doc.get_dictionary(*id) {
                Ok(d) => d,
                Err(_) => continue,
            },
            _ => continue,
        };
        let stream = match xobjects.get(name) {
            Ok(Object::Reference(id)) => doc.get_object(*id).and_then(Object::as_stream).ok(),
            Ok(Object::Stream(s)) => Some(s),
            _ => None,
        };
        if let Some(stream) = stream
            && stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|s| s == b"Form")
        {
            return Some(stream);
        }
    }
    None
}
