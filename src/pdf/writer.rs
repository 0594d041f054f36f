// 出力PDFの組立: 画像ページの生成、既存ページの取り込み、回転、最適化して保存

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

use super::image_xobject::ImageXObject;
use super::optimizer;
use super::reader::inherited_attribute;
use crate::config::level::Rotation;

/// ページ辞書で継承されうる属性。取り込み時にページ辞書へ実体化する。
const INHERITABLE_KEYS: &[&[u8]] = &[b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// ページ単位でPDFを組み立てる。
///
/// 単一ページPDF（ベースライン・候補）も結合結果も同じ経路で保存するため、
/// 見積もりと実際の出力のサイズが一致する。
pub struct PageWriter {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl Default for PageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PageWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// これまでに追加したページ数。
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// 画像1枚をページ全面に描画するページを追加する。
    ///
    /// 戻り値はページのオブジェクトID。
    pub fn add_image_page(
        &mut self,
        image: &ImageXObject,
        width_pt: f64,
        height_pt: f64,
    ) -> ObjectId {
        let image_id = self.doc.add_object(image.to_object());

        let mut xobject_dict = Dictionary::new();
        xobject_dict.set("Im0", Object::Reference(image_id));

        let content_bytes = Self::build_image_content_stream("Im0", width_pt, height_pt);
        let content_id = self
            .doc
            .add_object(Object::Stream(Stream::new(dictionary! {}, content_bytes)));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                pdf_number(width_pt),
                pdf_number(height_pt),
            ],
            "Resources" => dictionary! {
                "XObject" => Object::Dictionary(xobject_dict),
            },
            "Contents" => content_id,
        });
        self.kids.push(page_id);
        page_id
    }

    /// 画像をページ全面に描画するコンテンツストリームを生成する。
    ///
    /// `q <width> 0 0 <height> 0 0 cm /<name> Do Q`
    pub fn build_image_content_stream(name: &str, width_pt: f64, height_pt: f64) -> Vec<u8> {
        format!(
            "q {} 0 0 {} 0 0 cm /{} Do Q",
            format_number(width_pt),
            format_number(height_pt),
            name
        )
        .into_bytes()
    }

    /// 他の文書のページを1:1で取り込む。
    ///
    /// ページから参照されるオブジェクトを再帰的に複製する。Page/Pagesノードへの
    /// 参照（Parent・他ページへのリンク）はたどらない。
    pub fn import_page(&mut self, src: &Document, page_id: ObjectId) -> crate::error::Result<ObjectId> {
        let mut page = src.get_dictionary(page_id)?.clone();
        for key in INHERITABLE_KEYS {
            if !page.has(key)
                && let Some(value) = inherited_attribute(src, page_id, key)
            {
                page.set(key.to_vec(), value);
            }
        }
        page.remove(b"Parent");
        // スレッド（記事）は文書構造側の情報なので持ち込まない
        page.remove(b"B");

        let new_page_id = self.doc.new_object_id();
        let mut copier = ObjectCopier::new(src, page_id, new_page_id);
        let mut page_obj = Object::Dictionary(page);
        copier.remap(&mut page_obj, &mut self.doc);
        copier.drain(&mut self.doc);

        if let Object::Dictionary(dict) = &mut page_obj {
            dict.set("Parent", self.pages_id);
        }
        self.doc.objects.insert(new_page_id, page_obj);
        self.kids.push(new_page_id);
        Ok(new_page_id)
    }

    /// 単一ページPDFのバイト列から先頭ページを取り込む。
    pub fn import_first_page(&mut self, pdf_bytes: &[u8]) -> crate::error::Result<ObjectId> {
        let src = Document::load_mem(pdf_bytes)?;
        let page_id = src
            .get_pages()
            .get(&1)
            .copied()
            .ok_or_else(|| crate::error::PdfPressError::pdf_read("PDF has no pages"))?;
        self.import_page(&src, page_id)
    }

    /// ページの /Rotate を設定する。R0 の場合は元の回転を保持する。
    pub fn set_rotation(&mut self, page_id: ObjectId, rotation: Rotation) -> crate::error::Result<()> {
        if rotation == Rotation::R0 {
            return Ok(());
        }
        let page = self.doc.get_dictionary_mut(page_id)?;
        page.set("Rotate", rotation.degrees());
        Ok(())
    }

    /// 直前に追加したページを取り消す（取り込み後の処理に失敗した場合）。
    pub fn discard_last_page(&mut self) {
        if let Some(page_id) = self.kids.pop() {
            self.doc.objects.remove(&page_id);
            // 孤立した依存オブジェクトは保存時の最適化で除去される
        }
    }

    /// Pages/Catalogを組み立て、最適化してバイト列として出力する。
    pub fn finish(mut self) -> crate::error::Result<Vec<u8>> {
        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        optimizer::optimize(&mut self.doc);

        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| crate::error::PdfPressError::pdf_write(e.to_string()))?;
        Ok(buf)
    }
}

/// 元文書から出力文書へのオブジェクト複製。
///
/// 参照を見つけるたびに新しいIDを割り当ててキューに積み、反復的に複製する
/// （深い参照連鎖でもスタックを消費しない）。
struct ObjectCopier<'s> {
    src: &'s Document,
    map: HashMap<ObjectId, ObjectId>,
    pending: Vec<(ObjectId, ObjectId)>,
}

impl<'s> ObjectCopier<'s> {
    fn new(src: &'s Document, src_page: ObjectId, dst_page: ObjectId) -> Self {
        let mut map = HashMap::new();
        map.insert(src_page, dst_page);
        Self {
            src,
            map,
            pending: Vec::new(),
        }
    }

    fn remap(&mut self, object: &mut Object, dst: &mut Document) {
        match object {
            Object::Reference(id) => {
                *object = match self.translate(*id, dst) {
                    Some(new_id) => Object::Reference(new_id),
                    None => Object::Null,
                };
            }
            Object::Array(items) => {
                for item in items {
                    self.remap(item, dst);
                }
            }
            Object::Dictionary(dict) => self.remap_dict(dict, dst),
            Object::Stream(stream) => self.remap_dict(&mut stream.dict, dst),
            _ => {}
        }
    }

    fn remap_dict(&mut self, dict: &mut Dictionary, dst: &mut Document) {
        for (_, value) in dict.iter_mut() {
            self.remap(value, dst);
        }
    }

    /// 参照先の新IDを返す。ページツリーのノードや存在しないオブジェクトはNone。
    fn translate(&mut self, id: ObjectId, dst: &mut Document) -> Option<ObjectId> {
        if let Some(new_id) = self.map.get(&id) {
            return Some(*new_id);
        }
        let object = self.src.get_object(id).ok()?;
        if let Ok(dict) = object.as_dict()
            && let Ok(kind) = dict.get(b"Type").and_then(Object::as_name)
            && (kind == b"Page" || kind == b"Pages")
        {
            return None;
        }
        let new_id = dst.new_object_id();
        self.map.insert(id, new_id);
        self.pending.push((id, new_id));
        Some(new_id)
    }

    fn drain(&mut self, dst: &mut Document) {
        while let Some((src_id, new_id)) = self.pending.pop() {
            let Ok(object) = self.src.get_object(src_id) else {
                dst.objects.insert(new_id, Object::Null);
                continue;
            };
            let mut copy = object.clone();
            self.remap(&mut copy, dst);
            dst.objects.insert(new_id, copy);
        }
    }
}

/// ポイント値をPDFの数値オブジェクトにする（整数なら Integer）。
fn pdf_number(value: f64) -> Object {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Object::Integer(value as i64)
    } else {
        Object::Real(value as f32)
    }
}

/// コンテンツストリーム用の数値表記（末尾の0を削る）。
fn format_number(value: f64) -> String {
    let s = format!("{value:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_trims_zeros() {
        assert_eq!(format_number(612.0), "612");
        assert_eq!(format_number(595.276), "595.276");
        assert_eq!(format_number(10.5), "10.5");
    }

    #[test]
    fn test_pdf_number_prefers_integer() {
        assert!(matches!(pdf_number(792.0), Object::Integer(792)));
        assert!(matches!(pdf_number(841.89), Object::Real(_)));
    }
}
