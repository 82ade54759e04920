//! Backend synchronization.
//!
//! The session engine talks to the backend only through [`SyncAdapter`].
//! Notifications that cannot be delivered wait in a per-session
//! [`RetryQueue`] and are replayed in order.

pub mod adapter;
pub mod http;
pub mod retry_queue;
pub mod types;
pub mod wire;

pub use adapter::{FailureMode, HistorySource, MemoryAdapter, RecordedCall, SyncAdapter};
pub use http::HttpSyncAdapter;
pub use retry_queue::{PendingOp, RetryPolicy, RetryQueue, RetryReport};
pub use types::SyncError;
pub use wire::{
    AbandonNotice, Ack, CompletionReport, CreateSessionRequest, CreateSessionResponse, PauseNotice,
    ResumeNotice, SyncOp,
};
