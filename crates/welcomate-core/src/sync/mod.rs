//! Offline sync primitives: queued operations, their outcomes, the
//! de-duplication cache and the batch queue.

mod cache;
mod operation;
mod queue;
mod result;

pub use cache::{CacheEntry, OperationCache};
pub use operation::{OperationId, OperationKey, OperationKind, SyncOperation};
pub use queue::{BatchGuard, BatchReport, BatchSyncQueue};
pub use result::SyncResult;
