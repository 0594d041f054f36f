// FlateDecode圧縮、重複ストリーム統合、孤立オブジェクト除去

use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document, Object, ObjectId};
use sha2::{Digest, Sha256};

/// ドキュメント内の未圧縮ストリームにFlateDecode圧縮を適用する。
///
/// 既にフィルターが設定されているストリームはスキップする（二重圧縮防止）。
/// 圧縮しても小さくならないストリームはそのまま残す。
pub fn compress_streams(doc: &mut Document) {
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();

    for id in ids {
        let Some(Object::Stream(stream)) = doc.objects.get_mut(&id) else {
            continue;
        };
        if stream.dict.get(b"Filter").is_ok() || !stream.allows_compression {
            continue;
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        if encoder.write_all(&stream.content).is_err() {
            continue;
        }
        let Ok(compressed) = encoder.finish() else {
            continue;
        };
        if compressed.len() >= stream.content.len() {
            continue;
        }

        stream.dict.set("Filter", "FlateDecode");
        stream.set_content(compressed);
    }
}

/// 辞書と内容が完全に一致するストリームを1つにまとめる。
///
/// 同じ元文書から複数ページを取り込むと、フォントや画像が重複して埋め込まれる。
/// 戻り値は統合されたオブジェクト数。
pub fn dedup_streams(doc: &mut Document) -> usize {
    // BTreeMapで決定的な順序を保つ（出力のバイト一致のため）
    let mut first_by_hash: BTreeMap<String, ObjectId> = BTreeMap::new();
    let mut replacements: HashMap<ObjectId, ObjectId> = HashMap::new();

    for (&id, object) in &doc.objects {
        let Object::Stream(stream) = object else {
            continue;
        };
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", stream.dict).as_bytes());
        hasher.update((stream.content.len() as u64).to_le_bytes());
        hasher.update(&stream.content);
        let key = hex::encode(hasher.finalize());

        match first_by_hash.get(&key) {
            Some(&canonical) => {
                replacements.insert(id, canonical);
            }
            None => {
                first_by_hash.insert(key, id);
            }
        }
    }

    if replacements.is_empty() {
        return 0;
    }

    for object in doc.objects.values_mut() {
        replace_references(object, &replacements);
    }
    replace_references_in_dict(&mut doc.trailer, &replacements);
    for id in replacements.keys() {
        doc.objects.remove(id);
    }

    replacements.len()
}

fn replace_references(object: &mut Object, map: &HashMap<ObjectId, ObjectId>) {
    match object {
        Object::Reference(id) => {
            if let Some(new_id) = map.get(id) {
                *id = *new_id;
            }
        }
        Object::Array(items) => {
            for item in items {
                replace_references(item, map);
            }
        }
        Object::Dictionary(dict) => replace_references_in_dict(dict, map),
        Object::Stream(stream) => replace_references_in_dict(&mut stream.dict, map),
        _ => {}
    }
}

fn replace_references_in_dict(dict: &mut lopdf::Dictionary, map: &HashMap<ObjectId, ObjectId>) {
    for (_, value) in dict.iter_mut() {
        replace_references(value, map);
    }
}

/// 孤立オブジェクト（どこからも参照されていないオブジェクト）を除去する。
pub fn delete_unused_objects(doc: &mut Document) {
    doc.prune_objects();
}

/// PDF最適化の全パスを順序通りに実行する。
///
/// 1. 未圧縮ストリームを圧縮
/// 2. 重複ストリームを統合
/// 3. 孤立オブジェクトを除去し、オブジェクト番号を詰める
pub fn optimize(doc: &mut Document) {
    compress_streams(doc);
    dedup_streams(doc);
    delete_unused_objects(doc);
    doc.renumber_objects();
}
