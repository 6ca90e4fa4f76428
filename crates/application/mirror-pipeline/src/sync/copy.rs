use std::fs;

use camino::Utf8Path;
use mirror_core::path_utils::MirrorPath;
use mirror_core::{CopyIntent, CopyTask};
use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, info};

use crate::io_utils::copy_with_metadata;
use crate::sync::{FileOpError, Operation, SyncError};

#[derive(Debug)]
pub struct CopyOutcome {
    pub task: CopyTask,
    pub result: Result<u64, FileOpError>,
}

/// Copies files in fixed-size batches on a bounded worker pool.
///
/// A batch finishes completely before the next one starts. One failed task
/// never stops the others; every task yields exactly one [`CopyOutcome`].
pub struct BatchCopier {
    pool: ThreadPool,
    batch_size: usize,
}

impl BatchCopier {
    pub fn new(batch_size: usize, max_workers: usize) -> Result<Self, SyncError> {
        if batch_size == 0 {
            return Err(SyncError::InvalidOptions(
                "file_copy_batch_size must be a positive integer".into(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers.max(1))
            .thread_name(|i| format!("mirror-copy-{i}"))
            .build()
            .map_err(|e| SyncError::WorkerPool(e.to_string()))?;
        Ok(Self { pool, batch_size })
    }

    pub fn copy_all(&self, tasks: Vec<CopyTask>) -> Vec<CopyOutcome> {
        let total = tasks.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, batch) in tasks.chunks(self.batch_size).enumerate() {
            debug!(
                "Copy batch {} ({} of {} files)",
                index + 1,
                batch.len(),
                total
            );
            let done: Vec<CopyOutcome> = self.pool.install(|| {
                batch
                    .par_iter()
                    .map(|task| CopyOutcome {
                        result: copy_one(task),
                        task: task.clone(),
                    })
                    .collect()
            });
            outcomes.extend(done);
        }
        outcomes
    }
}

/// Convenience wrapper for one-off use.
pub fn copy_all(
    tasks: Vec<CopyTask>,
    batch_size: usize,
    max_workers: usize,
) -> Result<Vec<CopyOutcome>, SyncError> {
    Ok(BatchCopier::new(batch_size, max_workers)?.copy_all(tasks))
}

fn copy_one(task: &CopyTask) -> Result<u64, FileOpError> {
    let operation = match task.intent {
        CopyIntent::Create => Operation::Copy,
        CopyIntent::Update => Operation::Update,
    };
    if !MirrorPath::verify_safe(&task.rel_path) {
        return Err(FileOpError::unsafe_path(&task.rel_path, operation));
    }

    match task.intent {
        CopyIntent::Create => info!("Copying new file {} to {}", task.source, task.destination),
        CopyIntent::Update => info!(
            "Updating modified file {} to {}",
            task.source, task.destination
        ),
    }

    if let Some(parent) = task.destination.parent() {
        ensure_dir(parent).map_err(|e| FileOpError::io(&task.rel_path, operation, &e))?;
    }
    copy_with_metadata(&task.source, &task.destination)
        .map_err(|e| FileOpError::io(&task.rel_path, operation, &e))
}

fn ensure_dir(dir: &Utf8Path) -> std::io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)
}
