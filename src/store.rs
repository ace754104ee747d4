//! # Store モジュール
//!
//! 実績解除状態を保持する永続キーバリューストアを提供します。
//!
//! - [`MemoryStore`]: プロセス内のみのストア（永続化なし）
//! - [`JsonFileStore`]: JSONファイルに全キーを保存するストア
//!
//! キーは `achievement_<id>`、値は `"true"` の書き込み一回限りの真偽値です。

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;
use crate::models::traits::IKeyValueStore;

/// 実績解除状態のキーを生成
pub fn achievement_key(id: &str) -> String {
    format!("achievement_{}", id)
}

/// メモリ上のストア
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IKeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSONファイルで永続化するストア
///
/// 書き込みのたびにファイル全体を書き直します。キー数が少ない前提です。
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// ファイルを開く。存在しない場合は空のストアとして扱う
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let entries = if path.exists() {
            let contents =
                fs::read_to_string(&path).map_err(|e| StoreError::Io(path.clone(), e))?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents).map_err(|e| StoreError::Json(path.clone(), e))?
            }
        } else {
            BTreeMap::new()
        };

        debug!("ストアを開きました: {} ({}件)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::Io(self.path.clone(), e))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| StoreError::Json(self.path.clone(), e))?;
        fs::write(&self.path, json).map_err(|e| StoreError::Io(self.path.clone(), e))
    }
}

impl IKeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist()
    }
}
