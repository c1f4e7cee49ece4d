//! 会话 token 持久化
//!
//! 浏览器端的 LocalStorage 在这里换成 `TokenStore` 特性：测试用内存实现，
//! 命令行用配置目录下的 JSON 文件。

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// 键值存储接口
///
/// 与 LocalStorage 一致：读取失败视为不存在，写入/删除只报告成败。
pub trait TokenStore: Send + Sync {
    /// 获取存储的字符串值
    ///
    /// # 返回
    /// - `Some(String)` 如果键存在且有值
    /// - `None` 如果键不存在或发生错误
    fn get(&self, key: &str) -> Option<String>;

    /// 设置存储值，成功返回 `true`
    fn set(&self, key: &str, value: &str) -> bool;

    /// 删除存储的键值对，成功返回 `true`（键本来就不存在也算成功）
    fn delete(&self, key: &str) -> bool;
}

impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> bool {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> bool {
        (**self).delete(key)
    }
}

// =========================================================
// 内存实现
// =========================================================

#[derive(Default)]
pub struct MemoryTokenStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.entries.lock().insert(key.to_string(), value.to_string());
        true
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.lock().remove(key);
        true
    }
}

// =========================================================
// 文件实现
// =========================================================

/// 以 JSON 对象形式保存在单个文件中的存储
///
/// 每次操作都会重新读写整个文件，数据量只有一个 token，没有缓存的必要。
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> HashMap<String, String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return HashMap::new(),
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "ignoring unreadable token file");
            HashMap::new()
        })
    }

    fn write_entries(&self, entries: &HashMap<String, String>) -> bool {
        if let Some(parent) = self.path.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), error = %e, "failed to create token directory");
            return false;
        }

        let result = serde_json::to_string_pretty(entries)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&self.path, json).map_err(|e| e.to_string()));

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to write token file");
                false
            }
        }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock();
        self.read_entries().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> bool {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries();
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn delete(&self, key: &str) -> bool {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries();
        if entries.remove(key).is_none() {
            return true;
        }
        self.write_entries(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get("adminToken"), None);
        assert!(store.set("adminToken", "abc"));
        assert_eq!(store.get("adminToken").as_deref(), Some("abc"));
        assert!(store.delete("adminToken"));
        assert_eq!(store.get("adminToken"), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileTokenStore::new(&path);
        assert!(store.set("adminToken", "abc"));
        assert!(store.set("other", "x"));

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get("adminToken").as_deref(), Some("abc"));

        assert!(reopened.delete("adminToken"));
        assert_eq!(store.get("adminToken"), None);
        assert_eq!(store.get("other").as_deref(), Some("x"));
    }

    #[test]
    fn file_store_treats_garbage_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = FileTokenStore::new(&path);
        assert_eq!(store.get("adminToken"), None);
        assert!(store.set("adminToken", "abc"));
        assert_eq!(store.get("adminToken").as_deref(), Some("abc"));
    }
}
