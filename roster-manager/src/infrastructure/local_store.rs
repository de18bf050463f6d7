// =====================
// ローカルバックエンド (同期 / 常に利用可能)
// =====================

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::domain::error::StoreError;

/// 同期キーバリューストア。呼び出しが中断 (await) することはない
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
    /// 名前空間の全削除
    fn clear(&self) -> Result<(), StoreError>;
}

/// キーとして使えない名前を弾く
fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty()
        || key.starts_with('.')
        || key.contains("..")
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0')
    {
        return Err(StoreError::InvalidName(key.to_string()));
    }
    Ok(())
}

// =====================
// メモリ実装
// =====================

#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries.write().clear();
        Ok(())
    }
}

// =====================
// ファイル実装 (1 文書 = 1 ファイル)
// =====================

fn file_name_of(key: &str) -> Cow<'_, str> {
    urlencoding::encode(key)
}

/// デコードできないファイル名 (手で置かれたもの) はそのままキーにする
fn key_of(file_name: &str) -> String {
    urlencoding::decode(file_name)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| file_name.to_string())
}

#[derive(Debug, Clone)]
pub struct FileLocalStore {
    root: PathBuf,
}

impl FileLocalStore {
    /// ディレクトリが無ければ作る (冪等)
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(StoreError::local)?;
        Ok(Self { root })
    }

    /// キーはパーセントエンコードしてファイル名にする
    /// (":" などファイルシステムによっては使えない文字があるため)
    fn path_of(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.root.join(&*file_name_of(key)))
    }
}

impl LocalStore for FileLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_of(key)?) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::local(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_of(key)?;
        // 一時ファイルに書いてから置き換える
        let tmp = self.root.join(format!(".{}.tmp", file_name_of(key)));
        fs::write(&tmp, value).map_err(StoreError::local)?;
        fs::rename(&tmp, &path).map_err(StoreError::local)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_of(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::local(e)),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(StoreError::local)? {
            let entry = entry.map_err(StoreError::local)?;
            if !entry.file_type().map_err(StoreError::local)?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                // 書き込み途中の一時ファイルは除外
                if !name.starts_with('.') {
                    keys.push(key_of(name));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn clear(&self) -> Result<(), StoreError> {
        for key in self.keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }
}
