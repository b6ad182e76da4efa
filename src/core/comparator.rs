use super::scanner::{LocalListing, RemoteListing};
use serde::Serialize;
use std::collections::BTreeSet;

/// 比较结果
///
/// 两边都有的同名文件视为已同步，不比较内容、大小或修改时间。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    /// 只在远程存在，需要下载
    pub to_download: BTreeSet<String>,
    /// 只在本地存在，需要删除
    pub to_remove: BTreeSet<String>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.to_download.is_empty() && self.to_remove.is_empty()
    }

    /// 本次需要执行的操作数
    pub fn total(&self) -> usize {
        self.to_download.len() + self.to_remove.len()
    }
}

/// 双向求差集
pub fn diff(remote: &RemoteListing, local: &LocalListing) -> DiffResult {
    let to_download = remote
        .keys()
        .filter(|name| !local.contains(*name))
        .cloned()
        .collect();

    let to_remove = local
        .iter()
        .filter(|name| !remote.contains_key(*name))
        .cloned()
        .collect();

    DiffResult {
        to_download,
        to_remove,
    }
}
