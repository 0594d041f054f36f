// 見積もりサイズのキャッシュ: メモリ + 任意でディスク（キー → 選択結果のバイト長）
//
// ディスクエントリ: <cache_dir>/<hex_hash>.json

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::PdfPressError;

/// ディスクに保存するエントリ。
#[derive(serde::Serialize, serde::Deserialize)]
struct CacheEntry {
    cache_key: String,
    size: u64,
}

/// キャッシュキーが有効な SHA-256 hex 文字列であることを検証する。
///
/// 有効なキーは正確に64文字の小文字16進数([0-9a-f])。
/// パストラバーサルや不正なファイルアクセスを防止する。
fn validate_cache_key(key: &str) -> crate::error::Result<()> {
    if key.len() == 64 && key.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        Ok(())
    } else {
        Err(PdfPressError::cache(format!(
            "invalid cache key: expected 64-character lowercase hex string, got '{}'",
            key
        )))
    }
}

/// 見積もりサイズのキャッシュ。
///
/// メモリ上のマップを常に使い、`cache_dir` があればディスクにも書き出して
/// 次回の実行に持ち越す。ディスクの読み書き失敗はキャッシュミスとして扱う。
#[derive(Debug, Default)]
pub struct EstimateCache {
    memory: HashMap<String, u64>,
    cache_dir: Option<PathBuf>,
    hits: u64,
    misses: u64,
}

impl EstimateCache {
    /// メモリのみのキャッシュ。
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// ディスクにも永続化するキャッシュ。
    pub fn with_dir(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            cache_dir: Some(cache_dir.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    fn entry_path(&self, key: &str) -> crate::error::Result<Option<PathBuf>> {
        validate_cache_key(key)?;
        Ok(self.cache_dir.as_ref().map(|dir| dir.join(format!("{key}.json"))))
    }

    /// キャッシュから取得する。
    pub fn get(&mut self, key: &str) -> crate::error::Result<Option<u64>> {
        if let Some(size) = self.memory.get(key) {
            return Ok(Some(*size));
        }
        let Some(path) = self.entry_path(key)? else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path).map_err(|e| PdfPressError::cache(e.to_string()))?;
        let entry: CacheEntry = serde_json::from_str(&json)?;
        if entry.cache_key != key {
            return Err(PdfPressError::cache(format!(
                "cache key mismatch: expected '{}', found '{}'",
                key, entry.cache_key
            )));
        }
        self.memory.insert(key.to_string(), entry.size);
        Ok(Some(entry.size))
    }

    /// キャッシュに保存する。
    ///
    /// ディスクへの書き込みはアトミック: 一時ファイルに書いてからrenameする。
    pub fn insert(&mut self, key: &str, size: u64) -> crate::error::Result<()> {
        let path = self.entry_path(key)?;
        self.memory.insert(key.to_string(), size);

        let Some(path) = path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| PdfPressError::cache(e.to_string()))?;
        }
        let entry = CacheEntry {
            cache_key: key.to_string(),
            size,
        };
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string(&entry)?)
            .map_err(|e| PdfPressError::cache(e.to_string()))?;
        fs::rename(&tmp_path, &path).map_err(|e| PdfPressError::cache(e.to_string()))?;
        Ok(())
    }

    /// ヒットすればその値を、なければ `compute` の結果を保存して返す。
    pub fn get_or_insert_with(&mut self, key: &str, compute: impl FnOnce() -> u64) -> u64 {
        match self.get(key) {
            Ok(Some(size)) => {
                self.hits += 1;
                return size;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "cache read failed; recomputing"),
        }

        self.misses += 1;
        let size = compute();
        if let Err(e) = self.insert(key, size) {
            warn!(error = %e, "cache write failed");
        }
        size
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
