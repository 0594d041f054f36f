use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::config::level::Rotation;

/// バイト列から読み込んだPDF。元のバイト列はレンダラに渡すため保持する。
pub struct SourceDocument<'a> {
    bytes: &'a [u8],
    doc: Document,
}

impl<'a> SourceDocument<'a> {
    /// PDFバイト列を読み込む。暗号化されている場合は空パスワードで復号を試みる。
    pub fn load(bytes: &'a [u8]) -> crate::error::Result<Self> {
        let mut doc = Document::load_mem(bytes)?;

        if doc.is_encrypted() {
            doc.decrypt("")
                .map_err(|e| crate::error::PdfPressError::encrypted(e.to_string()))?;
            doc.trailer.remove(b"Encrypt");
            debug!("decrypted PDF with blank password");
        }

        if doc.get_pages().is_empty() {
            return Err(crate::error::PdfPressError::pdf_read("PDF has no pages"));
        }

        Ok(Self { bytes, doc })
    }

    /// 元のPDFバイト列。
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// 内部のlopdf Documentへの参照を返す。
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// ページ数を返す。
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// ページインデックス(0始まり)からObjectIdを取得する。
    pub fn page_id(&self, page_index: u32) -> crate::error::Result<ObjectId> {
        let pages = self.doc.get_pages();
        pages.get(&(page_index + 1)).copied().ok_or_else(|| {
            crate::error::PdfPressError::pdf_read(format!(
                "page index {} out of range (document has {} pages)",
                page_index,
                pages.len()
            ))
        })
    }

    /// 指定ページ(0始まり)のMediaBoxからページ寸法(width_pts, height_pts)を返す。
    pub fn page_dimensions(&self, page_index: u32) -> crate::error::Result<(f64, f64)> {
        let page_id = self.page_id(page_index)?;
        let media_box = inherited_attribute(&self.doc, page_id, b"MediaBox").ok_or_else(|| {
            crate::error::PdfPressError::pdf_read("MediaBox not found")
        })?;
        let media_box = match media_box {
            Object::Reference(id) => self.doc.get_object(id)?.clone(),
            other => other,
        };

        let media_box_array = media_box.as_array()?;
        if media_box_array.len() < 4 {
            return Err(crate::error::PdfPressError::pdf_read("Invalid MediaBox"));
        }

        let x0 = number(&media_box_array[0])?;
        let y0 = number(&media_box_array[1])?;
        let x1 = number(&media_box_array[2])?;
        let y1 = number(&media_box_array[3])?;

        let width = (x1 - x0).abs();
        let height = (y1 - y0).abs();

        if width <= 0.0 || height <= 0.0 {
            return Err(crate::error::PdfPressError::pdf_read(
                "Invalid MediaBox: non-positive page dimensions",
            ));
        }

        Ok((width, height))
    }

    /// 指定ページの表示回転（継承込み）。無い・不正な値は0°扱い。
    pub fn page_rotation(&self, page_index: u32) -> crate::error::Result<Rotation> {
        let page_id = self.page_id(page_index)?;
        let degrees = match inherited_attribute(&self.doc, page_id, b"Rotate") {
            Some(obj) => number(&obj).map(|d| d as i64).unwrap_or(0),
            None => 0,
        };
        Ok(Rotation::from_degrees(degrees).unwrap_or(Rotation::R0))
    }

    /// 表示上のページ寸法。/Rotate が 90°/270° なら幅と高さを入れ替える。
    pub fn displayed_dimensions(&self, page_index: u32) -> crate::error::Result<(f64, f64)> {
        let (width, height) = self.page_dimensions(page_index)?;
        Ok(match self.page_rotation(page_index)? {
            Rotation::R90 | Rotation::R270 => (height, width),
            Rotation::R0 | Rotation::R180 => (width, height),
        })
    }

    /// 指定ページ(0始まり)のコンテンツストリームを結合して返す。
    pub fn page_content(&self, page_index: u32) -> crate::error::Result<Vec<u8>> {
        let page_id = self.page_id(page_index)?;
        Ok(self.doc.get_page_content(page_id)?)
    }

    /// 指定ページのリソース辞書（直接埋め込み・参照・継承の全て）を返す。
    pub fn page_resources(&self, page_index: u32) -> crate::error::Result<Vec<&Dictionary>> {
        let page_id = self.page_id(page_index)?;
        let (resource_dict, resource_ids) = self.doc.get_page_resources(page_id)?;

        let mut dicts = Vec::new();
        if let Some(dict) = resource_dict {
            dicts.push(dict);
        }
        for res_id in resource_ids {
            dicts.push(self.doc.get_dictionary(res_id)?);
        }
        Ok(dicts)
    }
}

/// ページ辞書の属性を取得する（Parent経由の継承も考慮）。
///
/// MediaBox / CropBox / Resources / Rotate は継承可能属性。
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // 壊れたPDFの循環参照対策
    for _ in 0..64 {
        if let Ok(obj) = current.get(key) {
            return Some(obj.clone());
        }
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// lopdfのObjectから数値をf64として取得する。
pub(crate) fn number(obj: &Object) -> crate::error::Result<f64> {
    match obj {
        Object::Integer(i) => Ok(*i as f64),
        Object::Real(f) => Ok(*f as f64),
        _ => Err(crate::error::PdfPressError::pdf_read(format!(
            "expected numeric value, got {:?}",
            obj
        ))),
    }
}
