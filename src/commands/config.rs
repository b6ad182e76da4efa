//! 配置相关命令

use crate::config::AppConfig;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Args)]
pub struct ConfigUpdate {
    #[arg(long)]
    pub mod_folder: Option<PathBuf>,
    #[arg(long)]
    pub remote_folder: Option<String>,
    #[arg(long)]
    pub token: Option<String>,
    #[arg(long)]
    pub extension: Option<String>,
    #[arg(long)]
    pub jobs: Option<usize>,
}

/// 显示当前配置，默认隐藏令牌
pub fn show_config(config_dir: &Path, reveal: bool) -> anyhow::Result<String> {
    let config = AppConfig::load(config_dir);

    let mut value = serde_json::to_value(&config)?;
    if !reveal {
        value["access_token"] = serde_json::Value::String(config.masked_token());
    }

    Ok(serde_json::to_string_pretty(&value)?)
}

/// 更新配置
pub fn update_config(config_dir: &Path, update: &ConfigUpdate) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(config_dir);

    if let Some(folder) = &update.mod_folder {
        if !folder.is_dir() {
            anyhow::bail!("不是有效的目录: {}", folder.display());
        }
        config.mod_folder = folder.to_string_lossy().into_owned();
    }
    if let Some(remote) = &update.remote_folder {
        config.remote_folder = remote.clone();
    }
    if let Some(token) = &update.token {
        config.access_token = token.trim().to_string();
    }
    if let Some(ext) = &update.extension {
        if ext.trim().is_empty() {
            anyhow::bail!("扩展名不能为空");
        }
        config.tracked_extension = ext.clone();
    }
    if let Some(jobs) = update.jobs {
        config.max_concurrent_downloads = jobs.clamp(1, 16);
    }

    config.save(config_dir)?;
    tracing::info!("配置已保存: {}", config_dir.display());
    Ok(config)
}
