pub mod comparator;
pub mod engine;
pub mod progress;
pub mod scanner;
pub mod transfer;

pub use comparator::{diff, DiffResult};
pub use engine::{SyncContext, SyncEngine, SyncOutcome, SyncReport, SyncState};
pub use progress::{ChannelSink, NullSink, ProgressSink, SyncEvent};
pub use scanner::{FileEntry, FileScanner, LocalListing, RemoteListing, ScanConfig, DEFAULT_TRACKED_EXTENSION};
pub use transfer::{TransferExecutor, TransferFailure, TransferOp, TransferSummary};
