//! 传输执行 - 下载缺失文件、删除多余文件

use super::comparator::DiffResult;
use super::progress::ProgressSink;
use super::scanner::RemoteListing;
use crate::storage::{LocalDir, RemoteStore};
use futures::{FutureExt, StreamExt};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferOp {
    Download,
    Remove,
}

impl fmt::Display for TransferOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOp::Download => write!(f, "download"),
            TransferOp::Remove => write!(f, "remove"),
        }
    }
}

/// 单个文件的失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferFailure {
    pub name: String,
    pub operation: TransferOp,
    pub message: String,
}

/// 执行结果
#[derive(Debug, Clone, Default)]
pub struct TransferSummary {
    /// 已尝试的操作数（含失败）
    pub completed: usize,
    pub total: usize,
    pub downloaded: Vec<String>,
    pub removed: Vec<String>,
    pub failures: Vec<TransferFailure>,
    /// 因取消而有操作未尝试
    pub cancelled: bool,
}

/// 传输执行器
///
/// 单个文件失败只记录，不中断后续操作；内部不重试。
pub struct TransferExecutor<'a> {
    remote: &'a dyn RemoteStore,
    local: &'a LocalDir,
    cancelled: &'a AtomicBool,
    max_concurrent: usize,
}

impl<'a> TransferExecutor<'a> {
    pub fn new(remote: &'a dyn RemoteStore, local: &'a LocalDir, cancelled: &'a AtomicBool) -> Self {
        Self {
            remote,
            local,
            cancelled,
            max_concurrent: 1,
        }
    }

    /// 最大并行下载数，删除始终顺序执行
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// 先下载，后删除
    pub async fn execute(
        &self,
        diff: &DiffResult,
        listing: &RemoteListing,
        sink: &dyn ProgressSink,
    ) -> TransferSummary {
        let total = diff.total();
        let mut summary = TransferSummary {
            total,
            ..Default::default()
        };

        // 下载并发执行，但完成事件只在这个循环里处理，计数不会乱
        let jobs: Vec<(String, Option<String>)> = diff
            .to_download
            .iter()
            .map(|name| (name.clone(), listing.get(name).map(|e| e.remote_handle.clone())))
            .collect();

        let mut stream = futures::stream::iter(jobs)
            .map(|(name, handle)| {
                async move {
                    // 取消后剩余的下载不再发起
                    if self.is_cancelled() {
                        return None;
                    }
                    let result = match &handle {
                        Some(handle) => self.download(&name, handle).await,
                        None => Err("远程列表中没有该文件".to_string()),
                    };
                    Some((name, result))
                }
                .boxed()
            })
            .buffer_unordered(self.max_concurrent);

        while let Some(item) = stream.next().await {
            if let Some((name, result)) = item {
                Self::record(&mut summary, &name, TransferOp::Download, result, sink);
            }
        }
        drop(stream);

        for name in &diff.to_remove {
            if self.is_cancelled() {
                break;
            }
            debug!("删除: {}", name);
            let result = self.local.remove(name).await.map_err(|e| e.to_string());
            Self::record(&mut summary, name, TransferOp::Remove, result, sink);
        }

        summary.cancelled = summary.completed < total;
        summary
    }

    async fn download(&self, name: &str, handle: &str) -> Result<(), String> {
        debug!("下载: {} <- {}", name, handle);

        let data = self
            .remote
            .fetch_content(handle)
            .await
            .map_err(|e| e.to_string())?;
        debug!("  读取完成: {} {}字节", name, data.len());

        self.local
            .write(name, &data)
            .await
            .map_err(|e| format!("写入本地文件失败: {}", e))
    }

    fn record(
        summary: &mut TransferSummary,
        name: &str,
        operation: TransferOp,
        result: Result<(), String>,
        sink: &dyn ProgressSink,
    ) {
        summary.completed += 1;

        match result {
            Ok(()) => match operation {
                TransferOp::Download => summary.downloaded.push(name.to_string()),
                TransferOp::Remove => summary.removed.push(name.to_string()),
            },
            Err(message) => {
                warn!("{} 失败: {} - {}", operation, name, message);
                summary.failures.push(TransferFailure {
                    name: name.to_string(),
                    operation,
                    message,
                });
            }
        }

        sink.on_progress(summary.completed, summary.total);
    }
}
