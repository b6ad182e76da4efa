//! 错误类型
//!
//! 前置条件错误和列表错误以 `Result` 返回；单个文件的传输失败不是错误，
//! 而是记录在 [`crate::core::TransferFailure`] 里。

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// 一次同步运行可能遇到的致命错误
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum SyncError {
    /// 没有配置访问凭据，同步不会开始
    #[error("未配置访问令牌，请先完成云存储授权")]
    NoCredential,

    /// 本地目录不存在或不是目录
    #[error("本地目录无效: {path}: {reason}")]
    LocalPath { path: PathBuf, reason: String },

    /// 扩展名为空时会匹配所有文件
    #[error("同步的文件扩展名不能为空")]
    EmptyExtension,

    /// 凭据被后端拒绝（无效或过期）
    #[error("访问令牌无效或已过期，请重新授权: {0}")]
    RemoteAuth(String),

    /// 网络或后端错误、远程目录不存在等
    #[error("列出远程目录失败: {0}")]
    RemoteList(String),

    /// 已有同步任务在运行
    #[error("已有同步任务正在运行")]
    AlreadyRunning,
}

impl SyncError {
    pub fn local_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::LocalPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// 存储后端错误
#[derive(Debug, Error)]
pub enum RemoteError {
    /// 凭据无效或过期
    #[error("认证失败: {0}")]
    Auth(String),

    #[error("路径不存在: {0}")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.status() == Some(reqwest::StatusCode::UNAUTHORIZED) {
            RemoteError::Auth(e.to_string())
        } else {
            RemoteError::Backend(e.to_string())
        }
    }
}

impl From<opendal::Error> for RemoteError {
    fn from(e: opendal::Error) -> Self {
        match e.kind() {
            opendal::ErrorKind::PermissionDenied => RemoteError::Auth(e.to_string()),
            opendal::ErrorKind::NotFound => RemoteError::NotFound(e.to_string()),
            _ => RemoteError::Backend(e.to_string()),
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Auth(msg) => SyncError::RemoteAuth(msg),
            other => SyncError::RemoteList(other.to_string()),
        }
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
