use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{CleanseError, Result};
use crate::schema::{FieldMapping, RecordKind};

/// 字段映射仓库：按（银行, 记录类型）存取映射配置。
///
/// `save` 先按记录类型的标准字段表校验，非法映射整体拒绝，
/// 不会出现写了一半的条目。
pub trait MappingStore {
    fn get(&self, bank_name: &str, kind: RecordKind) -> Option<FieldMapping>;

    fn save(&mut self, bank_name: &str, kind: RecordKind, mapping: FieldMapping) -> Result<()>;

    fn delete(&mut self, bank_name: &str, kind: RecordKind) -> bool;

    fn known_banks(&self) -> BTreeSet<String>;

    /// 全部条目，银行识别遍历用。
    fn entries(&self) -> Vec<(String, RecordKind, FieldMapping)>;
}

/// 内存实现，测试与单次会话使用。
#[derive(Debug, Clone, Default)]
pub struct InMemoryMappingStore {
    configs: BTreeMap<(String, RecordKind), FieldMapping>,
}

impl InMemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MappingStore for InMemoryMappingStore {
    fn get(&self, bank_name: &str, kind: RecordKind) -> Option<FieldMapping> {
        self.configs.get(&(bank_name.to_string(), kind)).cloned()
    }

    fn save(&mut self, bank_name: &str, kind: RecordKind, mapping: FieldMapping) -> Result<()> {
        if bank_name.trim().is_empty() {
            return Err(CleanseError::Mapping("银行名称不能为空".to_string()));
        }
        mapping.validate(kind)?;
        self.configs.insert((bank_name.to_string(), kind), mapping);
        Ok(())
    }

    fn delete(&mut self, bank_name: &str, kind: RecordKind) -> bool {
        self.configs
            .remove(&(bank_name.to_string(), kind))
            .is_some()
    }

    fn known_banks(&self) -> BTreeSet<String> {
        self.configs.keys().map(|(bank, _)| bank.clone()).collect()
    }

    fn entries(&self) -> Vec<(String, RecordKind, FieldMapping)> {
        self.configs
            .iter()
            .map(|((bank, kind), mapping)| (bank.clone(), *kind, mapping.clone()))
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredMapping {
    bank_name: String,
    record_kind: RecordKind,
    mapping: FieldMapping,
}

/// JSON 文件实现：整个仓库一份文件，每次变更整体重写。
/// 写入走临时文件再改名，读者不会看到写了一半的内容。
#[derive(Debug)]
pub struct JsonFileMappingStore {
    path: PathBuf,
    inner: InMemoryMappingStore,
}

impl JsonFileMappingStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut inner = InMemoryMappingStore::new();
        if path.exists() {
            let text = fs::read_to_string(&path)?;
            let stored: Vec<StoredMapping> = serde_json::from_str(&text).map_err(|e| {
                CleanseError::Mapping(format!("映射配置文件解析失败: {e}"))
            })?;
            for item in stored {
                inner.save(&item.bank_name, item.record_kind, item.mapping)?;
            }
        }
        Ok(JsonFileMappingStore { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 导出整个仓库为 JSON 文本，供配置交换。
    pub fn export_all(&self) -> Result<String> {
        let stored = self
            .inner
            .entries()
            .into_iter()
            .map(|(bank_name, record_kind, mapping)| StoredMapping {
                bank_name,
                record_kind,
                mapping,
            })
            .collect::<Vec<_>>();
        serde_json::to_string_pretty(&stored)
            .map_err(|e| CleanseError::Mapping(format!("映射配置序列化失败: {e}")))
    }

    /// 导入 JSON 文本，整体替换现有仓库。任何一条校验失败都不落盘。
    pub fn import_all(&mut self, text: &str) -> Result<()> {
        let stored: Vec<StoredMapping> = serde_json::from_str(text)
            .map_err(|e| CleanseError::Mapping(format!("映射配置解析失败: {e}")))?;
        let mut fresh = InMemoryMappingStore::new();
        for item in stored {
            fresh.save(&item.bank_name, item.record_kind, item.mapping)?;
        }
        self.inner = fresh;
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let text = self.export_all()?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl MappingStore for JsonFileMappingStore {
    fn get(&self, bank_name: &str, kind: RecordKind) -> Option<FieldMapping> {
        self.inner.get(bank_name, kind)
    }

    fn save(&mut self, bank_name: &str, kind: RecordKind, mapping: FieldMapping) -> Result<()> {
        self.inner.save(bank_name, kind, mapping)?;
        self.persist()
    }

    fn delete(&mut self, bank_name: &str, kind: RecordKind) -> bool {
        let removed = self.inner.delete(bank_name, kind);
        if removed {
            // 落盘失败时磁盘上仍留着旧条目，重新打开会复活
            if let Err(e) = self.persist() {
                warn!(path = %self.path.display(), error = %e, "删除后重写映射文件失败");
            }
        }
        removed
    }

    fn known_banks(&self) -> BTreeSet<String> {
        self.inner.known_banks()
    }

    fn entries(&self) -> Vec<(String, RecordKind, FieldMapping)> {
        self.inner.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mapping() -> FieldMapping {
        let mut mapping = FieldMapping::new();
        mapping.insert(
            "本方账号",
            vec!["账号".to_string(), "本方账号".to_string()],
        );
        mapping.insert("交易金额", vec!["发生额".to_string()]);
        mapping
    }

    #[test]
    fn save_then_get_round_trips() {
        let mut store = InMemoryMappingStore::new();
        store
            .save("招商银行", RecordKind::TransactionDetail, sample_mapping())
            .unwrap();
        let loaded = store.get("招商银行", RecordKind::TransactionDetail).unwrap();
        assert_eq!(loaded, sample_mapping());
        assert!(store.get("招商银行", RecordKind::AccountDirectory).is_none());
    }

    #[test]
    fn invalid_mapping_is_rejected_and_store_unchanged() {
        let mut store = InMemoryMappingStore::new();
        let mut bad = sample_mapping();
        bad.insert("不存在的字段", vec!["x".to_string()]);
        let err = store
            .save("招商银行", RecordKind::TransactionDetail, bad)
            .unwrap_err();
        assert!(matches!(err, CleanseError::Mapping(_)));
        assert!(store.get("招商银行", RecordKind::TransactionDetail).is_none());
        assert!(store.known_banks().is_empty());
    }

    #[test]
    fn delete_reports_whether_entry_existed() {
        let mut store = InMemoryMappingStore::new();
        store
            .save("工商银行", RecordKind::TransactionDetail, sample_mapping())
            .unwrap();
        assert!(store.delete("工商银行", RecordKind::TransactionDetail));
        assert!(!store.delete("工商银行", RecordKind::TransactionDetail));
    }

    #[test]
    fn known_banks_deduplicates_across_kinds() {
        let mut store = InMemoryMappingStore::new();
        let mut directory = FieldMapping::new();
        directory.insert("姓名", vec!["户名".to_string()]);
        store
            .save("农业银行", RecordKind::TransactionDetail, sample_mapping())
            .unwrap();
        store
            .save("农业银行", RecordKind::AccountDirectory, directory)
            .unwrap();
        assert_eq!(store.known_banks().len(), 1);
    }

    #[test]
    fn json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        {
            let mut store = JsonFileMappingStore::open(&path).unwrap();
            store
                .save("建设银行", RecordKind::TransactionDetail, sample_mapping())
                .unwrap();
        }
        let store = JsonFileMappingStore::open(&path).unwrap();
        assert_eq!(
            store.get("建设银行", RecordKind::TransactionDetail),
            Some(sample_mapping())
        );
    }

    #[test]
    fn deleted_entry_stays_gone_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        {
            let mut store = JsonFileMappingStore::open(&path).unwrap();
            store
                .save("交通银行", RecordKind::TransactionDetail, sample_mapping())
                .unwrap();
            assert!(store.delete("交通银行", RecordKind::TransactionDetail));
        }
        let store = JsonFileMappingStore::open(&path).unwrap();
        assert!(store.get("交通银行", RecordKind::TransactionDetail).is_none());
    }

    #[test]
    fn export_import_round_trips_whole_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileMappingStore::open(dir.path().join("a.json")).unwrap();
        store
            .save("中国银行", RecordKind::TransactionDetail, sample_mapping())
            .unwrap();
        let exported = store.export_all().unwrap();

        let mut other = JsonFileMappingStore::open(dir.path().join("b.json")).unwrap();
        other.import_all(&exported).unwrap();
        assert_eq!(
            other.get("中国银行", RecordKind::TransactionDetail),
            Some(sample_mapping())
        );
    }
}
