use crate::error::SyncError;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// 本地 mods 目录
#[derive(Debug, Clone)]
pub struct LocalDir {
    base_path: PathBuf,
}

impl LocalDir {
    /// 目录必须已存在，不会自动创建
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let base_path = path.as_ref().to_path_buf();
        if base_path.as_os_str().is_empty() {
            return Err(SyncError::local_path(&base_path, "未设置本地目录"));
        }

        match std::fs::metadata(&base_path) {
            Ok(meta) if meta.is_dir() => Ok(Self { base_path }),
            Ok(_) => Err(SyncError::local_path(&base_path, "不是目录")),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(SyncError::local_path(&base_path, "目录不存在"))
            }
            Err(e) => Err(SyncError::local_path(&base_path, e.to_string())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }

    /// 文件名只能是单级名称
    fn resolve_path(&self, name: &str) -> io::Result<PathBuf> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\');
        if invalid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("非法文件名: {:?}", name),
            ));
        }
        Ok(self.base_path.join(name))
    }

    /// 列出目录下以指定扩展名结尾的文件（不递归）
    pub async fn list(&self, extension: &str) -> io::Result<BTreeSet<String>> {
        let base = self.base_path.clone();
        let extension = extension.to_string();

        // 使用 spawn_blocking 避免阻塞 async runtime
        tokio::task::spawn_blocking(move || {
            let mut names = BTreeSet::new();
            for entry in WalkDir::new(&base).min_depth(1).max_depth(1).follow_links(false) {
                let entry = entry.map_err(io::Error::from)?;
                if !entry.path().is_file() {
                    continue;
                }
                let Some(name) = entry.file_name().to_str() else {
                    tracing::warn!("跳过非 UTF-8 文件名: {:?}", entry.path());
                    continue;
                };
                if name.ends_with(&extension) {
                    names.insert(name.to_string());
                }
            }
            Ok(names)
        })
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }

    /// 写入文件，已存在则覆盖
    pub async fn write(&self, name: &str, data: &[u8]) -> io::Result<()> {
        let full_path = self.resolve_path(name)?;

        // 使用临时文件写入，然后原子重命名
        let temp_path = self.base_path.join(format!(".{}.part", name));
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&temp_path, &full_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(())
    }

    pub async fn remove(&self, name: &str) -> io::Result<()> {
        let full_path = self.resolve_path(name)?;
        fs::remove_file(&full_path).await
    }
}
