// SHA-256（ユニットの内容 + ページ + 回転 + レベル + レンダラ有無 + 設定）
//
// The key is a SHA-256 hash encoded as a lowercase hexadecimal string.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::config::level::{CompressionLevel, Rotation};
use crate::config::settings::Settings;

/// 選択結果に影響する設定だけを正規化JSON（キーはアルファベット順）にする。
fn settings_to_canonical_json(settings: &Settings) -> String {
    let mut map = BTreeMap::new();
    map.insert("image_bands.max", serde_json::json!(settings.image_bands.max));
    map.insert("image_bands.med", serde_json::json!(settings.image_bands.med));
    map.insert("image_bands.min", serde_json::json!(settings.image_bands.min));
    map.insert("image_default_dpi", serde_json::json!(settings.image_default_dpi));
    map.insert("levels.max", serde_json::json!(settings.levels.max));
    map.insert("levels.med", serde_json::json!(settings.levels.med));
    map.insert("levels.min", serde_json::json!(settings.levels.min));
    map.insert("min_dpi", serde_json::json!(settings.min_dpi));
    map.insert("pixel_ceiling", serde_json::json!(settings.pixel_ceiling));
    serde_json::json!(map).to_string()
}

/// ユニットのキャッシュキーを計算する。
///
/// ハッシュ入力: `content || page_index || rotation || level || rasterizes || settings_canonical_json`
/// 内容そのものをハッシュするので、同じバイト列なら別名のファイルでも一致する。
/// レンダラが無いエンジンはPDFページを常にベースラインで選ぶため、
/// `rasterizes` が違う実行同士ではキーを共有しない。
pub fn compute_unit_key(
    content: &[u8],
    page_index: u32,
    rotation: Rotation,
    level: CompressionLevel,
    rasterizes: bool,
    settings: &Settings,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update((content.len() as u64).to_le_bytes());
    hasher.update(content);
    hasher.update(page_index.to_le_bytes());
    hasher.update(rotation.degrees().to_le_bytes());
    hasher.update(level.as_str().as_bytes());
    hasher.update([u8::from(rasterizes)]);
    hasher.update(settings_to_canonical_json(settings).as_bytes());

    hex::encode(hasher.finalize())
}
