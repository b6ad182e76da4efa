pub mod dropbox;
pub mod local;
pub mod s3;
pub mod webdav;

use crate::error::RemoteError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub use dropbox::DropboxStore;
pub use local::LocalDir;
pub use s3::S3Store;
pub use webdav::WebDavStore;

// ============ 公共常量 ============

/// 非 IO 操作超时（秒）- list, stat 等
pub const OP_TIMEOUT_SECS: u64 = 60;
/// IO 操作超时（秒）- 下载
pub const IO_TIMEOUT_SECS: u64 = 300;

/// 远程目录中的一个条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub is_file: bool,
    /// 后端用来下载内容的句柄（路径或 id）
    pub handle: String,
}

/// 访问凭据，Debug 输出时不泄露内容
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// 空白字符串视为没有凭据
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// 已认证的远程存储
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// 列出目录下的直接子项（不递归），分页必须全部取完
    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// 下载文件内容
    async fn fetch_content(&self, handle: &str) -> Result<Bytes, RemoteError>;

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}

/// 用凭据创建已认证的远程存储
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self, credential: &Credential) -> Result<Arc<dyn RemoteStore>, RemoteError>;
}

/// 远程存储类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RemoteBackend {
    Dropbox,
    WebDav {
        endpoint: String,
        username: String,
    },
    S3 {
        bucket: String,
        region: String,
        access_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },
}

impl Default for RemoteBackend {
    fn default() -> Self {
        Self::Dropbox
    }
}

/// 根据配置创建存储实例
pub async fn create_remote(
    backend: &RemoteBackend,
    credential: &Credential,
) -> Result<Arc<dyn RemoteStore>, RemoteError> {
    match backend {
        RemoteBackend::Dropbox => {
            tracing::info!("初始化 Dropbox 存储");
            Ok(Arc::new(DropboxStore::new(credential)?) as Arc<dyn RemoteStore>)
        }
        RemoteBackend::WebDav { endpoint, username } => {
            tracing::info!("初始化 WebDAV 存储: endpoint={}", endpoint);
            Ok(Arc::new(WebDavStore::new(endpoint, username, credential)?) as Arc<dyn RemoteStore>)
        }
        RemoteBackend::S3 {
            bucket,
            region,
            access_key,
            endpoint,
        } => {
            tracing::info!("初始化 S3 存储: bucket={}, region={}", bucket, region);
            Ok(Arc::new(S3Store::new(
                bucket,
                region,
                access_key,
                credential,
                endpoint.clone(),
            )?) as Arc<dyn RemoteStore>)
        }
    }
}

/// 按配置的后端类型创建连接
#[derive(Debug, Clone, Default)]
pub struct BackendConnector {
    pub backend: RemoteBackend,
}

impl BackendConnector {
    pub fn new(backend: RemoteBackend) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl RemoteConnector for BackendConnector {
    async fn connect(&self, credential: &Credential) -> Result<Arc<dyn RemoteStore>, RemoteError> {
        create_remote(&self.backend, credential).await
    }
}

/// opendal 的目录路径：根目录为空字符串，其余以 / 结尾
pub(crate) fn operator_dir(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// opendal 列表条目转换，WebDAV 和 S3 共用
pub(crate) async fn list_operator_folder(
    operator: &opendal::Operator,
    path: &str,
) -> Result<Vec<RemoteEntry>, RemoteError> {
    use futures::TryStreamExt;
    use opendal::Metakey;

    let dir = operator_dir(path);

    let mut lister = operator
        .lister_with(&dir)
        .metakey(Metakey::Mode)
        .await?;

    let mut entries = Vec::new();
    while let Some(entry) = lister.try_next().await? {
        // 跳过目录本身
        if entry.path() == dir || entry.name().is_empty() {
            continue;
        }

        entries.push(RemoteEntry {
            name: entry.name().trim_end_matches('/').to_string(),
            is_file: entry.metadata().is_file(),
            handle: entry.path().to_string(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_dir_is_relative_with_trailing_slash() {
        assert_eq!(operator_dir("/"), "");
        assert_eq!(operator_dir(""), "");
        assert_eq!(operator_dir("/mods"), "mods/");
        assert_eq!(operator_dir("packs/mods/"), "packs/mods/");
    }

    #[test]
    fn blank_credential_is_absent() {
        assert!(Credential::new("").is_none());
        assert!(Credential::new("   ").is_none());
        assert_eq!(Credential::new(" tok ").unwrap().secret(), "tok");
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::new("sl.very-secret").unwrap();
        assert!(!format!("{:?}", credential).contains("secret"));
    }

    #[test]
    fn backend_serializes_with_type_tag() {
        let json = serde_json::to_value(RemoteBackend::Dropbox).unwrap();
        assert_eq!(json["type"], "dropbox");

        let webdav: RemoteBackend = serde_json::from_str(
            r#"{"type":"webdav","endpoint":"https://dav.example.com","username":"steve"}"#,
        )
        .unwrap();
        assert_eq!(
            webdav,
            RemoteBackend::WebDav {
                endpoint: "https://dav.example.com".into(),
                username: "steve".into()
            }
        );
    }
}
