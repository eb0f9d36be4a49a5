//! 键值存储模块
//!
//! 提供自动重启标记的持久化接口、内存实现和文件实现

use crate::error::StorageError;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// 自动重启标记的键
pub const PING_ENABLED_KEY: &str = "ping.enabled";

/// 自动重启标记的值
pub const PING_ENABLED_VALUE: &str = "1";

/// 最小键值存储接口
pub trait Storage: Send + Sync {
    /// 读取键
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// 写入键
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// 删除键
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// 查询是否存在自动重启标记
///
/// 读取失败按"不存在"处理。
pub fn should_auto_restart(storage: &dyn Storage) -> bool {
    match storage.get_item(PING_ENABLED_KEY) {
        Ok(value) => value.as_deref() == Some(PING_ENABLED_VALUE),
        Err(e) => {
            warn!("读取自动重启标记失败: {}", e);
            false
        }
    }
}

/// 进程内存储，未注入存储时的默认实现
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// 创建空的内存存储
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        items.remove(key);
        Ok(())
    }
}

/// 基于JSON文件的存储，标记可跨进程重启保留
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // 串行化同一进程内的读改写
    guard: Mutex<()>,
}

impl FileStorage {
    /// 创建文件存储
    ///
    /// # 参数
    /// * `path` - JSON文件路径，首次写入时创建
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// 默认文件路径
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(crate::APP_NAME)
            .join("state.json")
    }

    fn read_all(&self, key: &str) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let read_error = |reason: String| StorageError::ReadError {
            key: key.to_string(),
            reason,
        };
        let content = fs::read_to_string(&self.path).map_err(|e| read_error(e.to_string()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| read_error(e.to_string()))
    }

    fn write_all(&self, key: &str, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let write_error = |reason: String| StorageError::WriteError {
            key: key.to_string(),
            reason,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
            }
        }
        let content =
            serde_json::to_string_pretty(items).map_err(|e| write_error(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| write_error(e.to_string()))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.guard.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.read_all(key)?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.guard.lock().map_err(|_| StorageError::Poisoned)?;
        let mut items = self.read_all(key)?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(key, &items)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.guard.lock().map_err(|_| StorageError::Poisoned)?;
        let mut items = self.read_all(key)?;
        if items.remove(key).is_none() && !self.path.exists() {
            return Ok(());
        }
        self.write_all(key, &items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("a").unwrap(), None);
        storage.set_item("a", "1").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("1"));
        storage.remove_item("a").unwrap();
        assert_eq!(storage.get_item("a").unwrap(), None);
    }

    #[test]
    fn test_should_auto_restart_requires_exact_value() {
        let storage = MemoryStorage::new();
        assert!(!should_auto_restart(&storage));
        storage.set_item(PING_ENABLED_KEY, "0").unwrap();
        assert!(!should_auto_restart(&storage));
        storage.set_item(PING_ENABLED_KEY, "1").unwrap();
        assert!(should_auto_restart(&storage));
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let storage = FileStorage::new(&path);
        storage.set_item(PING_ENABLED_KEY, PING_ENABLED_VALUE).unwrap();
        storage.set_item("other", "x").unwrap();
        assert!(path.exists());

        let reopened = FileStorage::new(&path);
        assert!(should_auto_restart(&reopened));
        reopened.remove_item(PING_ENABLED_KEY).unwrap();

        let again = FileStorage::new(&path);
        assert!(!should_auto_restart(&again));
        assert_eq!(again.get_item("other").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_file_storage_remove_without_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let storage = FileStorage::new(&path);
        storage.remove_item(PING_ENABLED_KEY).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_file_storage_corrupt_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get_item(PING_ENABLED_KEY),
            Err(StorageError::ReadError { .. })
        ));
        assert!(!should_auto_restart(&storage));
        assert!(storage.set_item(PING_ENABLED_KEY, "1").is_err());
    }
}
