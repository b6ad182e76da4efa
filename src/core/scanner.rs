use crate::error::{RemoteError, SyncError};
use crate::storage::{LocalDir, RemoteStore};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// 默认同步的扩展名
pub const DEFAULT_TRACKED_EXTENSION: &str = ".jar";

/// 远程文件，只按名称（区分大小写）识别
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub remote_handle: String,
}

/// 文件名 -> 远程文件
pub type RemoteListing = BTreeMap<String, FileEntry>;

/// 本地目录中被跟踪的文件名
pub type LocalListing = BTreeSet<String>;

/// 文件扫描器配置
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 只同步以此结尾的文件
    pub tracked_extension: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tracked_extension: DEFAULT_TRACKED_EXTENSION.to_string(),
        }
    }
}

/// 文件扫描器
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    config: ScanConfig,
}

impl FileScanner {
    pub fn new(tracked_extension: impl Into<String>) -> Self {
        Self {
            config: ScanConfig {
                tracked_extension: tracked_extension.into(),
            },
        }
    }

    pub fn with_config(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn tracked_extension(&self) -> &str {
        &self.config.tracked_extension
    }

    fn is_tracked(&self, name: &str) -> bool {
        name.ends_with(&self.config.tracked_extension)
    }

    /// 扫描远程目录，只保留直接子文件
    pub async fn scan_remote(
        &self,
        store: &dyn RemoteStore,
        folder: &str,
    ) -> Result<RemoteListing, RemoteError> {
        info!("开始扫描远程目录: {}:{}", store.name(), folder);

        let entries = store.list_folder(folder).await?;
        let mut listing = RemoteListing::new();
        let mut dir_count = 0;
        let mut excluded_count = 0;

        for entry in entries {
            if !entry.is_file {
                dir_count += 1;
                continue;
            }

            if !self.is_tracked(&entry.name) {
                debug!("排除远程文件: {}", entry.name);
                excluded_count += 1;
                continue;
            }

            if listing.contains_key(&entry.name) {
                warn!("远程目录中出现重复文件名，忽略: {}", entry.name);
                continue;
            }

            listing.insert(
                entry.name.clone(),
                FileEntry {
                    name: entry.name,
                    remote_handle: entry.handle,
                },
            );
        }

        info!(
            "远程扫描完成: {} 个文件, {} 个目录, {} 个被排除",
            listing.len(),
            dir_count,
            excluded_count
        );

        Ok(listing)
    }

    /// 扫描本地目录（不递归）
    pub async fn scan_local(&self, local: &LocalDir) -> Result<LocalListing, SyncError> {
        let listing = local
            .list(&self.config.tracked_extension)
            .await
            .map_err(|e| SyncError::local_path(local.path(), e.to_string()))?;

        info!("本地扫描完成: {} 个文件 ({})", listing.len(), local.path().display());
        Ok(listing)
    }
}
