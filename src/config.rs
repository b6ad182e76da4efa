//! 应用配置模块

use crate::core::{SyncContext, DEFAULT_TRACKED_EXTENSION};
use crate::storage::{Credential, RemoteBackend};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";

/// 同步配置，保存在 config.json 顶层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 本地 mods 目录
    #[serde(default)]
    pub mod_folder: String,
    /// 云存储访问令牌（WebDAV 为密码，S3 为 secret key）
    #[serde(default)]
    pub access_token: String,
    /// 远程目录
    #[serde(default = "default_remote_folder", alias = "dropbox_folder")]
    pub remote_folder: String,
    #[serde(default = "default_tracked_extension")]
    pub tracked_extension: String,
    #[serde(default)]
    pub backend: RemoteBackend,
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
}

fn default_remote_folder() -> String {
    "/mods".to_string()
}

fn default_tracked_extension() -> String {
    DEFAULT_TRACKED_EXTENSION.to_string()
}

fn default_max_concurrent_downloads() -> usize {
    1
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mod_folder: String::new(),
            access_token: String::new(),
            remote_folder: default_remote_folder(),
            tracked_extension: default_tracked_extension(),
            backend: RemoteBackend::default(),
            max_concurrent_downloads: default_max_concurrent_downloads(),
        }
    }
}

impl AppConfig {
    /// 从配置文件加载，读取失败时使用默认值；未设置 mods 目录时自动查找
    pub fn load(config_dir: &Path) -> Self {
        let mut config = read_config_value(config_dir)
            .and_then(|value| serde_json::from_value::<AppConfig>(value).ok())
            .unwrap_or_default();

        if config.mod_folder.is_empty() {
            if let Some(found) = discover_mods_folder() {
                tracing::debug!("自动找到 mods 目录: {:?}", found);
                config.mod_folder = found.to_string_lossy().into_owned();
            }
        }

        config
    }

    /// 保存配置，保留文件中其他部分（如 log）
    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        let mut config = read_config_value(config_dir)
            .filter(|v| v.is_object())
            .unwrap_or_else(|| serde_json::json!({}));

        let value = serde_json::to_value(self).map_err(io::Error::other)?;
        if let (Some(target), serde_json::Value::Object(fields)) = (config.as_object_mut(), value) {
            target.remove("dropbox_folder");
            target.extend(fields);
        }

        write_config_value(config_dir, &config)
    }

    pub fn credential(&self) -> Option<Credential> {
        Credential::new(self.access_token.clone())
    }

    pub fn sync_context(&self) -> SyncContext {
        SyncContext::new(&self.mod_folder, &self.remote_folder, self.credential())
            .with_extension(&self.tracked_extension)
            .with_max_concurrent_downloads(self.max_concurrent_downloads)
    }

    /// 用于显示的令牌
    pub fn masked_token(&self) -> String {
        if self.access_token.is_empty() {
            "(未设置)".to_string()
        } else {
            "•".repeat(30)
        }
    }
}

/// 读取整个 config.json
pub(crate) fn read_config_value(config_dir: &Path) -> Option<serde_json::Value> {
    let content = fs::read_to_string(config_dir.join(CONFIG_FILE)).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("读取配置失败: {}", e);
            None
        }
    }
}

pub(crate) fn write_config_value(config_dir: &Path, config: &serde_json::Value) -> io::Result<()> {
    fs::create_dir_all(config_dir)?;
    let content = serde_json::to_string_pretty(config).map_err(io::Error::other)?;
    fs::write(config_dir.join(CONFIG_FILE), content)
}

/// 查找默认的 Minecraft mods 目录
pub fn discover_mods_folder() -> Option<PathBuf> {
    let base = if cfg!(target_os = "windows") {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    } else {
        std::env::var("HOME").ok().map(PathBuf::from)
    };

    base.map(|b| b.join(".minecraft").join("mods"))
        .filter(|p| p.is_dir())
        .or_else(find_mods_in_all_drives)
}

/// Windows 下遍历所有盘符的用户目录
fn find_mods_in_all_drives() -> Option<PathBuf> {
    if !cfg!(target_os = "windows") {
        return None;
    }

    ('A'..='Z')
        .map(|drive| PathBuf::from(format!("{}:\\", drive)).join("Users"))
        .filter(|users| users.is_dir())
        .filter_map(|users| fs::read_dir(users).ok())
        .flat_map(|entries| entries.filter_map(|e| e.ok()))
        .map(|user| {
            user.path()
                .join("AppData")
                .join("Roaming")
                .join(".minecraft")
                .join("mods")
        })
        .find(|p| p.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_mod_updater_layout() {
        let config = AppConfig::default();
        assert_eq!(config.remote_folder, "/mods");
        assert_eq!(config.tracked_extension, ".jar");
        assert_eq!(config.backend, RemoteBackend::Dropbox);
        assert_eq!(config.max_concurrent_downloads, 1);
        assert!(config.credential().is_none());
    }

    #[test]
    fn accepts_legacy_dropbox_folder_key() {
        let config: AppConfig = serde_json::from_str(
            r#"{"mod_folder":"/games/mods","access_token":"tok","dropbox_folder":"/pack"}"#,
        )
        .unwrap();
        assert_eq!(config.remote_folder, "/pack");
        assert_eq!(config.credential().unwrap().secret(), "tok");
    }

    #[test]
    fn save_keeps_other_sections() {
        let dir = tempfile::tempdir().unwrap();
        write_config_value(
            dir.path(),
            &serde_json::json!({ "log": { "level": "debug" }, "dropbox_folder": "/old" }),
        )
        .unwrap();

        let config = AppConfig {
            mod_folder: "/games/mods".into(),
            remote_folder: "/pack".into(),
            ..Default::default()
        };
        config.save(dir.path()).unwrap();

        let saved = read_config_value(dir.path()).unwrap();
        assert_eq!(saved["log"]["level"], "debug");
        assert_eq!(saved["remote_folder"], "/pack");
        assert!(saved.get("dropbox_folder").is_none());

        let reloaded = AppConfig::load(dir.path());
        assert_eq!(reloaded.mod_folder, "/games/mods");
        assert_eq!(reloaded.remote_folder, "/pack");
    }

    #[test]
    fn sync_context_carries_settings() {
        let config = AppConfig {
            mod_folder: "/games/mods".into(),
            access_token: "tok".into(),
            tracked_extension: ".zip".into(),
            max_concurrent_downloads: 0,
            ..Default::default()
        };
        let ctx = config.sync_context();
        assert_eq!(ctx.local_dir, PathBuf::from("/games/mods"));
        assert_eq!(ctx.tracked_extension, ".zip");
        assert_eq!(ctx.max_concurrent_downloads, 1);
        assert!(ctx.credential.is_some());
    }
}
