//! Archiver core: pure archive model, ledger reconciliation and pass reporting.
mod assets;
mod batch;
mod ledger;
mod record;
mod report;

pub use assets::{asset_filename, avatar_filename, local_id, DEFAULT_AVATAR_EXTENSION};
pub use batch::{plan_batches, PublishBatch, DEFAULT_BATCH_SIZE};
pub use ledger::{AuthorEntry, CategoryEntry, Ledger, LedgerEntry, MergeOutcome};
pub use record::{PostRecord, PostStatus};
pub use report::{update, FailedPost, PassReport, SyncEvent};
