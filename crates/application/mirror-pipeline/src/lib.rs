mod io_utils;
pub mod sync;

// Re-export core engine components
pub use sync::{
    FailureKind, FileOpError, Operation, SyncEngine, SyncError, SyncOptions, SyncPhase,
    SyncRequest, SyncSummary,
};

// Re-export types often needed by consumers
pub use mirror_core::ComparisonResult;
