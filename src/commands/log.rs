//! 日志相关命令

use crate::logging::LogConfig;
use std::path::Path;

/// 更新日志配置，未传入的字段保持不变
pub fn set_log_config(
    config_dir: &Path,
    enabled: Option<bool>,
    max_size_mb: Option<u32>,
    level: Option<&str>,
) -> anyhow::Result<LogConfig> {
    let mut config = LogConfig::load(config_dir);
    config.apply(enabled, max_size_mb, level)?;
    config.save(config_dir)?;
    Ok(config)
}
