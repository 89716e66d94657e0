// ============================================================================
// proxymirror-core/src/processing/pipeline.rs
// ============================================================================
//
// SCAN PIPELINE: Walk, mirror, select, dispatch
//
// The walk runs on the calling thread. It mirrors every directory before any
// file beneath it is dispatched, classifies files, drops targets that already
// have a proxy, and claims the remaining targets so no two sources can encode
// into the same file. The claimed jobs are then encoded one at a time, or on a
// bounded rayon pool when more than one job is configured.
//
// Only a missing source root or an uncreatable destination root end a run
// with an error. Everything below that is logged and counted in the Summary.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use crate::config::CoreConfig;
use crate::discovery::{Classifier, ScanEntry};
use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegSpawner, check_dependency};
use crate::path_mirror::PathMirror;
use crate::processing::invoker::{EncodeInvoker, EncodeJob, EncodeResult};
use crate::utils::format_duration;

/// A job that produced no proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub reason: String,
}

/// Counters and failures for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Recognized media files found by the walk.
    pub files_considered: usize,
    /// Proxies written by this run.
    pub files_built: usize,
    /// Candidates whose proxy already existed or was claimed by another source.
    pub files_skipped: usize,
    /// Failed jobs plus directories and entries that could not be processed.
    pub errors: usize,
    /// Non-media files and sidecar artifacts.
    pub files_ignored: usize,
    pub failures: Vec<FailedJob>,
    /// Set when cancellation stopped the run before every job was dispatched.
    pub interrupted: bool,
}

impl Summary {
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Run-scoped state shared between the walk and the workers.
pub struct RunContext {
    considered: AtomicUsize,
    built: AtomicUsize,
    skipped: AtomicUsize,
    errors: AtomicUsize,
    ignored: AtomicUsize,
    failures: Mutex<Vec<FailedJob>>,
    /// Written only by the walk, before dispatch starts.
    claimed: HashSet<PathBuf>,
    cancel: Arc<AtomicBool>,
    interrupted: AtomicBool,
}

impl RunContext {
    pub fn new(cancel: Arc<AtomicBool>) -> Self {
        Self {
            considered: AtomicUsize::new(0),
            built: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            ignored: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
            claimed: HashSet::new(),
            cancel,
            interrupted: AtomicBool::new(false),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self, failure: FailedJob) {
        Self::bump(&self.errors);
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(failure);
    }

    fn into_summary(self) -> Summary {
        Summary {
            files_considered: self.considered.into_inner(),
            files_built: self.built.into_inner(),
            files_skipped: self.skipped.into_inner(),
            errors: self.errors.into_inner(),
            files_ignored: self.ignored.into_inner(),
            failures: self
                .failures
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
            interrupted: self.interrupted.into_inner(),
        }
    }
}

/// Scans a source tree and builds every missing proxy.
///
/// ```rust,no_run
/// use proxymirror_core::{CoreConfig, ScanPipeline, SidecarSpawner};
/// use std::path::PathBuf;
///
/// let config = CoreConfig::new(PathBuf::from("/media/rushes"), PathBuf::from("/media/proxies"));
/// let summary = ScanPipeline::new(config, SidecarSpawner)?.run()?;
/// println!("built {} of {}", summary.files_built, summary.files_considered);
/// # Ok::<(), proxymirror_core::CoreError>(())
/// ```
pub struct ScanPipeline<S: FfmpegSpawner> {
    config: CoreConfig,
    mirror: PathMirror,
    classifier: Classifier,
    invoker: EncodeInvoker<S>,
    cancel: Arc<AtomicBool>,
}

impl<S: FfmpegSpawner> ScanPipeline<S> {
    pub fn new(config: CoreConfig, spawner: S) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            mirror: PathMirror::from_config(&config),
            classifier: Classifier::from_config(&config),
            invoker: EncodeInvoker::new(
                spawner,
                config.ffmpeg_path.clone(),
                config.profile.clone(),
            ),
            cancel: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Uses `flag` for cancellation; once it is set no further job is started.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Runs the whole scan. Per-file problems are folded into the returned
    /// [`Summary`]; only root-level problems are returned as errors.
    pub fn run(&self) -> CoreResult<Summary> {
        let start = Instant::now();
        let source = self.mirror.source_root();
        let dest = self.mirror.dest_root();

        if !source.is_dir() {
            error!("Source directory not found: {}", source.display());
            return Err(CoreError::SourceNotFound(source.to_path_buf()));
        }
        PathMirror::ensure_dir(dest).inspect_err(|e| {
            error!("Cannot create destination root: {e}");
        })?;
        Self::check_distinct_roots(source, dest)?;

        info!(
            "Starting proxy build: {} -> {}",
            source.display(),
            dest.display()
        );

        if let Err(e) = check_dependency(self.invoker.program()) {
            warn!("Encoder check failed ({e}); every encode will fail until it is available");
        }

        let mut ctx = RunContext::new(Arc::clone(&self.cancel));
        let jobs = self.collect_jobs(&mut ctx);
        info!(
            "Scan complete: {} candidate(s), {} to build",
            ctx.considered.load(Ordering::Relaxed),
            jobs.len()
        );

        self.dispatch_all(jobs, &ctx)?;

        let summary = ctx.into_summary();
        if summary.interrupted {
            warn!("Run interrupted before all jobs were started");
        }
        info!(
            "Run finished in {}: {} considered, {} built, {} skipped, {} error(s)",
            format_duration(start.elapsed()),
            summary.files_considered,
            summary.files_built,
            summary.files_skipped,
            summary.errors
        );
        Ok(summary)
    }

    /// Walks the source tree, mirrors directories and returns the claimed jobs.
    fn collect_jobs(&self, ctx: &mut RunContext) -> Vec<EncodeJob> {
        let source = self.mirror.source_root();
        let nested_dest = self.nested_dest_relative();
        let mut jobs = Vec::new();

        let mut walker = WalkDir::new(source).min_depth(1).into_iter();
        loop {
            let entry = match walker.next() {
                None => break,
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    error!("Cannot read entry during walk: {}", CoreError::from(e));
                    RunContext::bump(&ctx.errors);
                    continue;
                }
            };

            if ctx.is_cancelled() {
                ctx.interrupted.store(true, Ordering::SeqCst);
                break;
            }

            let path = entry.path();
            let relative = match self.mirror.relative_path(path) {
                Ok(relative) => relative,
                Err(e) => {
                    error!("{e}");
                    RunContext::bump(&ctx.errors);
                    continue;
                }
            };
            let is_dir = entry.file_type().is_dir();

            if is_dir && nested_dest.as_deref() == Some(relative.as_path()) {
                debug!("Skipping destination subtree {}", path.display());
                walker.skip_current_dir();
                continue;
            }

            match self.classifier.classify(&relative, is_dir) {
                ScanEntry::Directory => {
                    let mirrored = self.mirror.dest_root().join(&relative);
                    if let Err(e) = PathMirror::ensure_dir(&mirrored) {
                        error!("{e}; skipping {}", path.display());
                        RunContext::bump(&ctx.errors);
                        walker.skip_current_dir();
                    }
                }
                ScanEntry::IgnoredArtifact => {
                    debug!("Ignoring sidecar artifact {}", path.display());
                    if is_dir {
                        walker.skip_current_dir();
                    } else {
                        RunContext::bump(&ctx.ignored);
                    }
                }
                ScanEntry::NonCandidate => {
                    debug!("Not a media file: {}", path.display());
                    RunContext::bump(&ctx.ignored);
                }
                ScanEntry::CandidateFile => {
                    RunContext::bump(&ctx.considered);
                    if let Some(job) = self.claim(path, ctx) {
                        jobs.push(job);
                    }
                }
            }
        }

        jobs
    }

    /// Decides whether a candidate needs work, claiming its target if so.
    fn claim(&self, path: &Path, ctx: &mut RunContext) -> Option<EncodeJob> {
        let target = match self.mirror.proxy_target(path) {
            Ok(target) => target,
            Err(e) => {
                error!("{e}");
                RunContext::bump(&ctx.errors);
                return None;
            }
        };

        if let Some(existing) = self.mirror.existing_proxy(&target) {
            info!(
                "Skipping {}: proxy exists at {}",
                path.display(),
                existing.display()
            );
            RunContext::bump(&ctx.skipped);
            return None;
        }

        if !ctx.claimed.insert(target.clone()) {
            warn!(
                "Skipping {}: {} is already claimed by another source",
                path.display(),
                target.display()
            );
            RunContext::bump(&ctx.skipped);
            return None;
        }

        Some(EncodeJob::new(
            path.to_path_buf(),
            target,
            self.config.options.clone(),
        ))
    }

    fn dispatch_all(&self, jobs: Vec<EncodeJob>, ctx: &RunContext) -> CoreResult<()> {
        if jobs.is_empty() {
            return Ok(());
        }

        if self.config.jobs <= 1 {
            for job in jobs {
                self.dispatch(job, ctx);
            }
            return Ok(());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .thread_name(|i| format!("proxymirror-encode-{i}"))
            .build()
            .map_err(|e| CoreError::OperationFailed(format!("failed to start worker pool: {e}")))?;
        debug!("Dispatching {} job(s) on {} workers", jobs.len(), self.config.jobs);

        pool.install(|| {
            jobs.into_par_iter().for_each(|job| self.dispatch(job, ctx));
        });
        Ok(())
    }

    fn dispatch(&self, job: EncodeJob, ctx: &RunContext) {
        if ctx.is_cancelled() {
            ctx.interrupted.store(true, Ordering::SeqCst);
            return;
        }

        // The target may have appeared since the walk (another process, a rerun).
        if let Some(existing) = self.mirror.existing_proxy(&job.output_path) {
            info!(
                "Skipping {}: proxy exists at {}",
                job.input_path.display(),
                existing.display()
            );
            RunContext::bump(&ctx.skipped);
            return;
        }

        let result = self.invoker.run_job(job);
        self.record(result, ctx);
    }

    fn record(&self, result: EncodeResult, ctx: &RunContext) {
        if result.is_success() {
            RunContext::bump(&ctx.built);
            return;
        }

        let reason = result.reason();
        error!(
            "Failed to build proxy for {} -> {}: {}",
            result.job.input_path.display(),
            result.job.output_path.display(),
            reason
        );
        if !result.output.trim().is_empty() {
            debug!("Encoder output:\n{}", result.output.trim_end());
        }
        ctx.record_failure(FailedJob {
            input: result.job.input_path,
            output: result.job.output_path,
            reason,
        });
    }

    /// Rejects roots that resolve to the same directory through `..`
    /// components or symlinks.
    fn check_distinct_roots(source: &Path, dest: &Path) -> CoreResult<()> {
        let resolved_source = source.canonicalize()?;
        let resolved_dest = dest.canonicalize()?;
        if resolved_source == resolved_dest {
            error!(
                "Destination {} resolves to the source directory {}",
                dest.display(),
                resolved_source.display()
            );
            return Err(CoreError::Config(format!(
                "source and destination must differ ('{}' and '{}' are the same directory)",
                source.display(),
                dest.display()
            )));
        }
        Ok(())
    }

    /// Position of the destination root below the source root, when nested.
    fn nested_dest_relative(&self) -> Option<PathBuf> {
        let source = self.mirror.source_root().canonicalize().ok()?;
        let dest = self.mirror.dest_root().canonicalize().ok()?;
        dest.strip_prefix(&source)
            .ok()
            .filter(|relative| !relative.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}
