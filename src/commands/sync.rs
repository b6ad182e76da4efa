use crate::config::AppConfig;
use crate::core::{ChannelSink, DiffResult, SyncEvent, SyncOutcome, SyncReport, SyncState};
use crate::storage::{BackendConnector, Credential};
use crate::error::SyncError;
use crate::SyncService;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// 命令行覆盖配置文件中的设置
#[derive(Debug, Clone, Default, Args)]
pub struct SyncOverrides {
    /// 本地 mods 目录
    #[arg(long)]
    pub local: Option<PathBuf>,
    /// 远程目录
    #[arg(long)]
    pub remote: Option<String>,
    /// 访问令牌
    #[arg(long, env = "MODSYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// 同步的文件扩展名
    #[arg(long)]
    pub extension: Option<String>,
    /// 并行下载数
    #[arg(long)]
    pub jobs: Option<usize>,
}

impl SyncOverrides {
    pub fn apply(&self, config: &mut AppConfig) -> anyhow::Result<()> {
        if let Some(local) = &self.local {
            config.mod_folder = local.to_string_lossy().into_owned();
        }
        if let Some(remote) = &self.remote {
            config.remote_folder = remote.clone();
        }
        if let Some(token) = &self.token {
            config.access_token = token.clone();
        }
        if let Some(ext) = &self.extension {
            if ext.trim().is_empty() {
                anyhow::bail!(SyncError::EmptyExtension);
            }
            config.tracked_extension = ext.clone();
        }
        if let Some(jobs) = self.jobs {
            config.max_concurrent_downloads = jobs.clamp(1, 16);
        }
        Ok(())
    }
}

pub(crate) fn load_config(config_dir: &Path, overrides: &SyncOverrides) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(config_dir);
    overrides.apply(&mut config)?;
    Ok(config)
}

fn service_for(config: &AppConfig) -> SyncService {
    SyncService::new(Arc::new(BackendConnector::new(config.backend.clone())))
}

/// 开始同步，返回是否全部成功
pub async fn start_sync(config_dir: &Path, overrides: &SyncOverrides) -> anyhow::Result<bool> {
    let config = load_config(config_dir, overrides)?;
    let service = service_for(&config);

    let (sink, progress_rx) = ChannelSink::new();
    let handle = service.spawn(config.sync_context(), Arc::new(sink))?;

    // Ctrl-C 只请求取消，已开始的文件会完成
    let cancel = service.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("正在取消，等待当前文件完成...");
            cancel.cancel();
        }
    });

    let printer = tokio::spawn(render_progress(progress_rx));
    let result = handle.await?;
    ctrl_c.abort();
    let _ = printer.await;

    let report = result?;
    print_report(&report);

    Ok(matches!(
        report.outcome,
        SyncOutcome::Success | SyncOutcome::AlreadyInSync
    ))
}

/// 只显示差异，不修改文件
pub async fn analyze(config_dir: &Path, overrides: &SyncOverrides) -> anyhow::Result<DiffResult> {
    let config = load_config(config_dir, overrides)?;
    let result = service_for(&config).analyze(&config.sync_context()).await?;

    if result.is_empty() {
        println!("所有文件已是最新");
    } else {
        for name in &result.to_download {
            println!("+ {}", name);
        }
        for name in &result.to_remove {
            println!("- {}", name);
        }
        println!(
            "共 {} 个待下载, {} 个待删除",
            result.to_download.len(),
            result.to_remove.len()
        );
    }

    Ok(result)
}

/// 消费进度事件并显示进度条
async fn render_progress(mut rx: mpsc::UnboundedReceiver<SyncEvent>) {
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = rx.recv().await {
        match event {
            SyncEvent::State { state } => match state {
                SyncState::Listing => eprintln!("正在扫描文件..."),
                SyncState::Executing => eprintln!("正在同步..."),
                _ => {}
            },
            SyncEvent::Progress { completed, total } => {
                let bar = bar.get_or_insert_with(|| {
                    let bar = ProgressBar::new(total as u64);
                    if let Ok(style) = ProgressStyle::with_template(
                        "Progress: {pos}/{len} ({percent}%) [{bar:30}]",
                    ) {
                        bar.set_style(style.progress_chars("=> "));
                    }
                    bar
                });
                bar.set_position(completed as u64);
            }
            SyncEvent::Finished { .. } => {
                if let Some(bar) = bar.take() {
                    bar.finish();
                }
            }
        }
    }
}

fn print_report(report: &SyncReport) {
    println!("{}", report.outcome);

    if report.total > 0 {
        println!(
            "已处理 {}/{}: 下载 {}, 删除 {}, 失败 {}",
            report.completed,
            report.total,
            report.downloaded.len(),
            report.removed.len(),
            report.failures.len()
        );
    }

    for failure in &report.failures {
        println!("  [{}] {}: {}", failure.operation, failure.name, failure.message);
    }
}

/// 用于检查连接的凭据
pub(crate) fn credential_or_bail(config: &AppConfig) -> anyhow::Result<Credential> {
    config
        .credential()
        .ok_or_else(|| anyhow::anyhow!(SyncError::NoCredential))
}
