//! Dropbox HTTP API 存储

use super::{Credential, RemoteEntry, RemoteStore, IO_TIMEOUT_SECS};
use crate::error::RemoteError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.dropboxapi.com";
pub const DEFAULT_CONTENT_BASE: &str = "https://content.dropboxapi.com";

#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<Metadata>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
enum Metadata {
    File {
        name: String,
        #[serde(default)]
        path_lower: Option<String>,
        #[serde(default)]
        id: Option<String>,
    },
    Folder {
        name: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_summary: String,
}

pub struct DropboxStore {
    http: Client,
    token: String,
    api_base: String,
    content_base: String,
}

impl DropboxStore {
    pub fn new(credential: &Credential) -> Result<Self, RemoteError> {
        Self::with_endpoints(credential, DEFAULT_API_BASE, DEFAULT_CONTENT_BASE)
    }

    /// 指定 API 地址（测试时指向 mock 服务器）
    pub fn with_endpoints(
        credential: &Credential,
        api_base: &str,
        content_base: &str,
    ) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(IO_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("modsync/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            token: credential.secret().to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            content_base: content_base.trim_end_matches('/').to_string(),
        })
    }

    /// Dropbox 根目录用空字符串表示，其余路径以 / 开头且不以 / 结尾
    fn normalize_path(path: &str) -> String {
        let trimmed = path.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    async fn list_page(&self, endpoint: &str, body: serde_json::Value) -> Result<ListFolderResponse, RemoteError> {
        let url = format!("{}/2/files/{}", self.api_base, endpoint);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        response
            .json::<ListFolderResponse>()
            .await
            .map_err(|e| RemoteError::Backend(format!("解析 list_folder 响应失败: {}", e)))
    }

    async fn check_status(response: Response) -> Result<Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let summary = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|b| b.error_summary)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(text);

        Err(match status {
            StatusCode::UNAUTHORIZED => RemoteError::Auth(summary),
            StatusCode::CONFLICT if summary.contains("not_found") => RemoteError::NotFound(summary),
            StatusCode::TOO_MANY_REQUESTS => RemoteError::Backend(format!("请求过于频繁: {}", summary)),
            _ => RemoteError::Backend(format!("HTTP {}: {}", status.as_u16(), summary)),
        })
    }
}

/// Dropbox-API-Arg 头只允许 ASCII，非 ASCII 字符需要转义
fn header_safe_json(value: &serde_json::Value) -> String {
    let raw = value.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut buf = [0u16; 2];
            for unit in c.encode_utf16(&mut buf) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

#[async_trait]
impl RemoteStore for DropboxStore {
    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let path = Self::normalize_path(path);
        let mut page = self
            .list_page("list_folder", serde_json::json!({ "path": path }))
            .await?;

        let mut entries = Vec::new();
        loop {
            for meta in page.entries {
                match meta {
                    Metadata::File { name, path_lower, id } => {
                        let handle = path_lower
                            .or(id)
                            .unwrap_or_else(|| format!("{}/{}", path, name));
                        entries.push(RemoteEntry {
                            name,
                            is_file: true,
                            handle,
                        });
                    }
                    Metadata::Folder { name } => entries.push(RemoteEntry {
                        handle: format!("{}/{}", path, name),
                        name,
                        is_file: false,
                    }),
                    Metadata::Other => {}
                }
            }

            if !page.has_more {
                break;
            }

            debug!("list_folder 还有更多条目，继续拉取 (已获取 {} 个)", entries.len());
            page = self
                .list_page(
                    "list_folder/continue",
                    serde_json::json!({ "cursor": page.cursor }),
                )
                .await?;
        }

        Ok(entries)
    }

    async fn fetch_content(&self, handle: &str) -> Result<Bytes, RemoteError> {
        let url = format!("{}/2/files/download", self.content_base);
        let arg = header_safe_json(&serde_json::json!({ "path": handle }));

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", arg)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        Ok(response.bytes().await?)
    }

    fn name(&self) -> &str {
        "dropbox"
    }
}
