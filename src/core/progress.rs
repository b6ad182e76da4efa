//! 进度回调
//!
//! 所有回调都在同步任务内部同步调用，调用方自行负责转发到 UI 线程。

use super::engine::{SyncOutcome, SyncState};
use super::transfer::TransferFailure;
use serde::Serialize;
use tokio::sync::mpsc;

/// 同步进度接收者
pub trait ProgressSink: Send + Sync {
    /// 状态机切换
    fn on_state(&self, _state: SyncState) {}

    /// 每尝试完成一个操作（成功或失败）调用一次
    fn on_progress(&self, completed: usize, total: usize);

    /// 运行结束（前置条件失败时不会调用）
    fn on_finished(&self, outcome: &SyncOutcome, failures: &[TransferFailure]);
}

/// 丢弃所有事件
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&self, _completed: usize, _total: usize) {}

    fn on_finished(&self, _outcome: &SyncOutcome, _failures: &[TransferFailure]) {}
}

/// 发往前端或其他任务的进度事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SyncEvent {
    State {
        state: SyncState,
    },
    Progress {
        completed: usize,
        total: usize,
    },
    Finished {
        outcome: SyncOutcome,
        failures: Vec<TransferFailure>,
    },
}

/// 把回调转换为 channel 消息
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn on_state(&self, state: SyncState) {
        let _ = self.tx.send(SyncEvent::State { state });
    }

    fn on_progress(&self, completed: usize, total: usize) {
        let _ = self.tx.send(SyncEvent::Progress { completed, total });
    }

    fn on_finished(&self, outcome: &SyncOutcome, failures: &[TransferFailure]) {
        let _ = self.tx.send(SyncEvent::Finished {
            outcome: outcome.clone(),
            failures: failures.to_vec(),
        });
    }
}
