use std::fs;
use std::time::Instant;

use mirror_core::{ComparisonResult, CopyIntent};
use mirror_infra::hashing::ChunkHasher;
use tracing::{debug, info};

use crate::sync::compare::TreeComparator;
use crate::sync::copy::BatchCopier;
use crate::sync::reconcile::TreeReconciler;
use crate::sync::{FileOpError, SyncError, SyncPhase, SyncRequest, SyncSummary};

type PhaseObserver = Box<dyn Fn(SyncPhase) + Send + Sync>;

/// Runs synchronization passes: compare, copy, reconcile.
///
/// Holds no state between passes; every pass re-derives the whole picture
/// from the two trees.
pub struct SyncEngine {
    comparator: TreeComparator,
    observer: Option<PhaseObserver>,
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncEngine {
    pub fn new() -> Self {
        Self::with_components(TreeComparator::new())
    }

    pub fn with_components(comparator: TreeComparator) -> Self {
        Self {
            comparator,
            observer: None,
        }
    }

    /// Called on every phase transition, including the final return to idle.
    pub fn with_phase_observer(
        mut self,
        observer: impl Fn(SyncPhase) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    fn enter(&self, phase: SyncPhase) {
        debug!("Sync phase: {}", phase);
        if let Some(observer) = &self.observer {
            observer(phase);
        }
    }

    /// Compare only. Nothing in either tree is modified.
    pub fn compare(&self, req: &SyncRequest) -> Result<ComparisonResult, SyncError> {
        req.options.validate()?;
        let hasher = ChunkHasher::new(req.options.hashing_file_chunk_size);
        self.comparator
            .compare(&req.source_root, &req.replica_root, &hasher)
    }

    /// One full pass. Per-path failures end up in the summary; only an
    /// unusable root or bad options abort the pass.
    pub fn run_once(&self, req: &SyncRequest) -> Result<SyncSummary, SyncError> {
        req.options.validate()?;
        let started = Instant::now();
        let mut summary = SyncSummary::default();

        info!("Synchronizing {} -> {}", req.source_root, req.replica_root);

        self.enter(SyncPhase::Comparing);
        let plan = match self.compare(req) {
            Ok(plan) => plan,
            Err(e) => {
                self.enter(SyncPhase::Idle);
                return Err(e);
            }
        };
        for issue in &plan.issues {
            summary.record(FileOpError::from(issue));
        }
        summary.unchanged = plan.unchanged.len() as u64;

        self.enter(SyncPhase::Copying);
        if let Err(e) = self.copy_phase(req, &plan, &mut summary) {
            self.enter(SyncPhase::Idle);
            return Err(e);
        }

        self.enter(SyncPhase::Reconciling);
        TreeReconciler::new(req.replica_root.clone())
            .apply_deletes(&plan.stale_deletes(), &mut summary);

        self.enter(SyncPhase::Idle);
        summary.elapsed = started.elapsed();
        summary.log();
        Ok(summary)
    }

    fn copy_phase(
        &self,
        req: &SyncRequest,
        plan: &ComparisonResult,
        summary: &mut SyncSummary,
    ) -> Result<(), SyncError> {
        if !req.replica_root.is_dir() {
            info!("Creating replica root {}", req.replica_root);
            fs::create_dir_all(&req.replica_root).map_err(|e| {
                SyncError::ReplicaUnavailable(format!("{}: {e}", req.replica_root))
            })?;
        }

        let copier = BatchCopier::new(req.options.file_copy_batch_size, req.options.max_workers)?;
        let reconciler = TreeReconciler::new(req.replica_root.clone());

        // Entries whose kind changed must go before anything lands in their place.
        reconciler.apply_deletes(&plan.conflicting_deletes(), summary);
        reconciler.apply_creates(&plan.directories_to_create(), summary);

        let tasks = plan.copy_tasks(&req.source_root, &req.replica_root);
        if tasks.is_empty() {
            return Ok(());
        }
        debug!(
            "Copying {} files with {} workers",
            tasks.len(),
            req.options.max_workers
        );
        for outcome in copier.copy_all(tasks) {
            match outcome.result {
                Ok(bytes) => {
                    summary.bytes_copied += bytes;
                    match outcome.task.intent {
                        CopyIntent::Create => summary.files_created += 1,
                        CopyIntent::Update => summary.files_updated += 1,
                    }
                }
                Err(err) => summary.record(err),
            }
        }
        Ok(())
    }
}
