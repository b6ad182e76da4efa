//! 测试用的内存存储和进度记录器

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use modsync_lib::core::{ProgressSink, SyncOutcome, SyncState, TransferFailure};
use modsync_lib::storage::{Credential, RemoteEntry, RemoteStore};
use modsync_lib::{RemoteConnector, RemoteError};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FOLDER: &str = "/mods";
pub const TOKEN: &str = "valid-token";

/// 内存中的远程目录
#[derive(Default)]
pub struct MemoryRemote {
    files: Mutex<BTreeMap<String, Bytes>>,
    folders: Mutex<Vec<String>>,
    broken: Mutex<HashSet<String>>,
    pub auth_expired: AtomicBool,
    pub list_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub fetch_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MemoryRemote {
    pub fn with_files(names: &[&str]) -> Arc<Self> {
        let remote = Self::default();
        for name in names {
            remote.put(name, format!("content of {}", name).as_bytes());
        }
        Arc::new(remote)
    }

    pub fn put(&self, name: &str, data: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), Bytes::copy_from_slice(data));
    }

    pub fn add_folder(&self, name: &str) {
        self.folders.lock().unwrap().push(name.to_string());
    }

    /// 下载此文件时返回错误
    pub fn break_file(&self, name: &str) {
        self.broken.lock().unwrap().insert(name.to_string());
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn list_folder(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.auth_expired.load(Ordering::SeqCst) {
            return Err(RemoteError::Auth("expired_access_token".into()));
        }
        if path != FOLDER {
            return Err(RemoteError::NotFound(format!("path/not_found/{}", path)));
        }

        let mut entries: Vec<RemoteEntry> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .map(|name| RemoteEntry {
                name: name.clone(),
                is_file: true,
                handle: format!("{}/{}", FOLDER, name.to_lowercase()),
            })
            .collect();
        entries.extend(self.folders.lock().unwrap().iter().map(|name| RemoteEntry {
            name: name.clone(),
            is_file: false,
            handle: format!("{}/{}", FOLDER, name),
        }));
        Ok(entries)
    }

    async fn fetch_content(&self, handle: &str) -> Result<Bytes, RemoteError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = {
            let files = self.files.lock().unwrap();
            let broken = self.broken.lock().unwrap();
            files
                .iter()
                .find(|(name, _)| format!("{}/{}", FOLDER, name.to_lowercase()) == handle)
                .map(|(name, data)| (name.clone(), data.clone()))
                .ok_or_else(|| RemoteError::NotFound(handle.to_string()))
                .and_then(|(name, data)| {
                    if broken.contains(&name) {
                        Err(RemoteError::Backend(format!("connection reset while reading {}", name)))
                    } else {
                        Ok(data)
                    }
                })
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// 只接受 TOKEN 的连接器
pub struct MemoryConnector {
    pub remote: Arc<MemoryRemote>,
    pub connects: AtomicUsize,
}

impl MemoryConnector {
    pub fn new(remote: Arc<MemoryRemote>) -> Arc<Self> {
        Arc::new(Self {
            remote,
            connects: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl RemoteConnector for MemoryConnector {
    async fn connect(&self, credential: &Credential) -> Result<Arc<dyn RemoteStore>, RemoteError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if credential.secret() != TOKEN {
            return Err(RemoteError::Auth("invalid_access_token".into()));
        }
        Ok(self.remote.clone() as Arc<dyn RemoteStore>)
    }
}

#[derive(Debug, Clone)]
pub enum Recorded {
    State(SyncState),
    Progress(usize, usize),
    Finished(SyncOutcome, Vec<TransferFailure>),
}

/// 记录所有回调
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<Recorded>>,
    /// 第 N 次进度回调后调用
    on_nth_progress: Mutex<Option<(usize, Box<dyn Fn() + Send>)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn after_progress(&self, n: usize, f: impl Fn() + Send + 'static) {
        *self.on_nth_progress.lock().unwrap() = Some((n, Box::new(f)));
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<(usize, usize)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::Progress(c, t) => Some((c, t)),
                _ => None,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<SyncState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn finished_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Recorded::Finished(..)))
            .count()
    }
}

impl ProgressSink for RecordingSink {
    fn on_state(&self, state: SyncState) {
        self.events.lock().unwrap().push(Recorded::State(state));
    }

    fn on_progress(&self, completed: usize, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push(Recorded::Progress(completed, total));

        if let Some((n, f)) = self.on_nth_progress.lock().unwrap().as_ref() {
            if *n == completed {
                f();
            }
        }
    }

    fn on_finished(&self, outcome: &SyncOutcome, failures: &[TransferFailure]) {
        self.events
            .lock()
            .unwrap()
            .push(Recorded::Finished(outcome.clone(), failures.to_vec()));
    }
}

/// 在目录中创建文件
pub fn touch(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), format!("local {}", name)).unwrap();
    }
}

/// 目录中的 .jar 文件名（排序）
pub fn jar_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".jar"))
        .collect();
    names.sort();
    names
}
