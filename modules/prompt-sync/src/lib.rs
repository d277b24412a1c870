pub mod config;
pub mod error;
pub mod normalize;
pub mod sync;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use config::{SyncArgs, SyncConfig};
pub use error::SyncError;
pub use normalize::{build_batch, normalize_record, normalize_tags, PageBatch, PromptRow};
pub use sync::{PromptSync, StopReason, SyncReport};
pub use traits::{DryRunSink, PageSource, RowSink, SupabaseSink};
