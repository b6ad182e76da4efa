use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod storage;

pub use crate::core::{
    DiffResult, ProgressSink, SyncContext, SyncEngine, SyncOutcome, SyncReport, SyncState,
    TransferFailure, TransferOp,
};
pub use config::AppConfig;
pub use error::{RemoteError, SyncError};
pub use storage::{BackendConnector, Credential, RemoteBackend, RemoteConnector, RemoteStore};

/// 同步服务，保证同一时间只有一个同步任务在运行
#[derive(Clone)]
pub struct SyncService {
    engine: Arc<SyncEngine>,
    running: Arc<AtomicBool>,
}

impl SyncService {
    pub fn new(connector: Arc<dyn RemoteConnector>) -> Self {
        Self {
            engine: Arc::new(SyncEngine::new(connector)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 取消正在运行的同步
    pub fn cancel(&self) {
        self.engine.cancel();
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.engine.cancel_handle()
    }

    fn acquire(&self) -> Result<(), SyncError> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| SyncError::AlreadyRunning)
    }

    /// 在当前任务中运行一次同步，已有同步运行时返回 `AlreadyRunning`
    pub async fn run(
        &self,
        ctx: &SyncContext,
        sink: &dyn ProgressSink,
    ) -> Result<SyncReport, SyncError> {
        self.acquire()?;
        let running = self.running.clone();
        scopeguard::defer! {
            running.store(false, Ordering::SeqCst);
        }

        self.engine.run_sync(ctx, sink).await
    }

    /// 在后台任务中运行同步
    pub fn spawn(
        &self,
        ctx: SyncContext,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JoinHandle<Result<SyncReport, SyncError>>, SyncError> {
        self.acquire()?;
        let running = self.running.clone();
        let engine = self.engine.clone();

        Ok(tokio::spawn(async move {
            scopeguard::defer! {
                running.store(false, Ordering::SeqCst);
            }
            engine.run_sync(&ctx, sink.as_ref()).await
        }))
    }

    /// 只分析差异
    pub async fn analyze(&self, ctx: &SyncContext) -> Result<DiffResult, SyncError> {
        self.acquire()?;
        let running = self.running.clone();
        scopeguard::defer! {
            running.store(false, Ordering::SeqCst);
        }

        self.engine.analyze(ctx).await
    }
}

/// 默认配置目录
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("modsync"))
        .unwrap_or_else(|| PathBuf::from(".modsync"))
}

pub mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
        } else {
            // Linux
            std::env::var("XDG_CONFIG_HOME")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".config"))
                })
        }
    }
}
