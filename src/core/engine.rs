use crate::core::comparator::{diff, DiffResult};
use crate::core::progress::ProgressSink;
use crate::core::scanner::{FileScanner, LocalListing, RemoteListing, DEFAULT_TRACKED_EXTENSION};
use crate::core::transfer::{TransferExecutor, TransferFailure, TransferSummary};
use crate::error::SyncError;
use crate::storage::{Credential, LocalDir, RemoteConnector, RemoteStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// 一次同步所需的全部输入，调用方已完成校验
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub local_dir: PathBuf,
    pub remote_folder: String,
    pub tracked_extension: String,
    pub credential: Option<Credential>,
    /// 最大并行下载数，1 表示顺序执行
    pub max_concurrent_downloads: usize,
}

impl SyncContext {
    pub fn new(
        local_dir: impl Into<PathBuf>,
        remote_folder: impl Into<String>,
        credential: Option<Credential>,
    ) -> Self {
        Self {
            local_dir: local_dir.into(),
            remote_folder: remote_folder.into(),
            tracked_extension: DEFAULT_TRACKED_EXTENSION.to_string(),
            credential,
            max_concurrent_downloads: 1,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.tracked_extension = extension.into();
        self
    }

    pub fn with_max_concurrent_downloads(mut self, n: usize) -> Self {
        self.max_concurrent_downloads = n.max(1);
        self
    }
}

/// 同步状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Idle,
    Listing,
    Diffing,
    Executing,
    Done,
}

/// 最终结果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "camelCase")]
pub enum SyncOutcome {
    /// 无需任何操作
    AlreadyInSync,
    /// 全部操作成功
    Success,
    /// 有操作失败（包括全部失败），失败列表见报告
    PartialSuccess,
    /// 用户取消，未尝试的操作留给下次同步
    Cancelled,
    /// 列表阶段失败，未修改任何文件
    Blocked(SyncError),
}

impl SyncOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, SyncOutcome::Blocked(_))
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::AlreadyInSync => write!(f, "所有文件已是最新"),
            SyncOutcome::Success => write!(f, "同步完成"),
            SyncOutcome::PartialSuccess => write!(f, "同步完成，部分文件失败"),
            SyncOutcome::Cancelled => write!(f, "同步已取消"),
            SyncOutcome::Blocked(e) => write!(f, "同步失败: {}", e),
        }
    }
}

/// 同步报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: SyncOutcome,
    pub diff: DiffResult,
    pub completed: usize,
    pub total: usize,
    pub downloaded: Vec<String>,
    pub removed: Vec<String>,
    pub failures: Vec<TransferFailure>,
}

/// 同步引擎
pub struct SyncEngine {
    connector: Arc<dyn RemoteConnector>,
    cancelled: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(connector: Arc<dyn RemoteConnector>) -> Self {
        Self {
            connector,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 取消同步，在两个文件之间生效
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// 取消标志，可交给信号处理等其他任务
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// 检查前置条件：凭据存在，扩展名非空，本地目录有效
    fn check_preconditions(&self, ctx: &SyncContext) -> Result<(Credential, LocalDir), SyncError> {
        let credential = ctx.credential.clone().ok_or(SyncError::NoCredential)?;
        if ctx.tracked_extension.trim().is_empty() {
            return Err(SyncError::EmptyExtension);
        }
        let local = LocalDir::open(&ctx.local_dir)?;
        Ok((credential, local))
    }

    async fn list_both(
        &self,
        ctx: &SyncContext,
        credential: &Credential,
        local: &LocalDir,
    ) -> Result<(Arc<dyn RemoteStore>, RemoteListing, LocalListing), SyncError> {
        let scanner = FileScanner::new(ctx.tracked_extension.clone());

        let remote = self.connector.connect(credential).await?;
        let remote_listing = scanner.scan_remote(remote.as_ref(), &ctx.remote_folder).await?;
        let local_listing = scanner.scan_local(local).await?;

        Ok((remote, remote_listing, local_listing))
    }

    /// 只分析差异，不修改任何文件
    pub async fn analyze(&self, ctx: &SyncContext) -> Result<DiffResult, SyncError> {
        let (credential, local) = self.check_preconditions(ctx)?;
        let (_, remote_listing, local_listing) = self.list_both(ctx, &credential, &local).await?;

        let result = diff(&remote_listing, &local_listing);
        info!(
            "分析完成: {} 个待下载, {} 个待删除",
            result.to_download.len(),
            result.to_remove.len()
        );
        Ok(result)
    }

    /// 运行同步任务
    ///
    /// 前置条件失败时直接返回 `Err`，不会调用 `on_finished`；
    /// 之后的所有结果（包括 `Blocked`）都通过报告返回。
    pub async fn run_sync(
        &self,
        ctx: &SyncContext,
        sink: &dyn ProgressSink,
    ) -> Result<SyncReport, SyncError> {
        let (credential, local) = self.check_preconditions(ctx)?;

        let mut report = SyncReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            outcome: SyncOutcome::AlreadyInSync,
            diff: DiffResult::default(),
            completed: 0,
            total: 0,
            downloaded: Vec::new(),
            removed: Vec::new(),
            failures: Vec::new(),
        };

        // 重置取消标志
        self.cancelled.store(false, Ordering::SeqCst);

        info!(
            "开始同步 [{}]: {} -> {}",
            report.run_id,
            ctx.remote_folder,
            local.path().display()
        );

        sink.on_state(SyncState::Listing);
        let (remote, remote_listing, local_listing) =
            match self.list_both(ctx, &credential, &local).await {
                Ok(listed) => listed,
                Err(e) => {
                    error!("列出文件失败: {}", e);
                    report.outcome = SyncOutcome::Blocked(e);
                    return Ok(Self::finish(report, sink));
                }
            };

        if self.is_cancelled() {
            report.outcome = SyncOutcome::Cancelled;
            return Ok(Self::finish(report, sink));
        }

        sink.on_state(SyncState::Diffing);
        report.diff = diff(&remote_listing, &local_listing);
        report.total = report.diff.total();
        debug!(
            "比较完成: {} 个下载, {} 个删除",
            report.diff.to_download.len(),
            report.diff.to_remove.len()
        );

        if report.diff.is_empty() {
            report.outcome = SyncOutcome::AlreadyInSync;
            return Ok(Self::finish(report, sink));
        }

        sink.on_state(SyncState::Executing);
        let summary = TransferExecutor::new(remote.as_ref(), &local, &self.cancelled)
            .with_max_concurrent(ctx.max_concurrent_downloads)
            .execute(&report.diff, &remote_listing, sink)
            .await;

        report.outcome = if summary.cancelled {
            SyncOutcome::Cancelled
        } else if summary.failures.is_empty() {
            SyncOutcome::Success
        } else {
            SyncOutcome::PartialSuccess
        };
        Self::apply_summary(&mut report, summary);

        Ok(Self::finish(report, sink))
    }

    fn apply_summary(report: &mut SyncReport, summary: TransferSummary) {
        report.completed = summary.completed;
        report.downloaded = summary.downloaded;
        report.removed = summary.removed;
        report.failures = summary.failures;
    }

    fn finish(mut report: SyncReport, sink: &dyn ProgressSink) -> SyncReport {
        report.finished_at = Utc::now();

        info!(
            "同步任务结束 [{}]: {} - 下载 {}, 删除 {}, 失败 {}",
            report.run_id,
            report.outcome,
            report.downloaded.len(),
            report.removed.len(),
            report.failures.len()
        );

        sink.on_state(SyncState::Done);
        sink.on_finished(&report.outcome, &report.failures);
        report
    }
}
