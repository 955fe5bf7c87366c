//! Build orchestration.
//!
//! A build runs in three steps:
//!
//! ```text
//! 1. Index    source/  →  Vec<ContentItem>            (one walk, read-only afterwards)
//! 2. Fan out  templs/  →  RenderJob per (lang, item)  (single-threaded walk)
//! 3. Render   jobs     →  public/                      (worker pool, joined at the end)
//! ```
//!
//! Jobs are spawned into a scoped rayon pool as soon as their template is
//! expanded; the end of the scope is the join barrier. A failing job raises
//! the shared [`ErrorFlag`]. The walk checks the flag before each template and
//! stops launching new work once it is raised, but jobs already spawned always
//! run to completion. There is no cancellation of running renderer processes.
//!
//! Every job's output path is claimed in an [`OutputRegistry`] before it is
//! spawned. Two jobs resolving to the same file would otherwise race; the
//! second claim fails the job instead.

use crate::config::{SiteConfig, effective_threads};
use crate::fanout::{FanoutError, RenderJob, expand, walk_templates};
use crate::index::{ContentItem, IndexError, index_content};
use crate::paths::BuildEnvironment;
use crate::render::{RenderError, Renderer, TemplateKind, dispatch};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Fatal build errors.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Content index failed: {0}")]
    Index(#[from] IndexError),
    #[error("Template fan-out failed: {0}")]
    Fanout(#[from] FanoutError),
    #[error("Could not start render workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Could not remove {dir}: {source}")]
    Clean {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{failed} render job(s) failed, see the log above")]
    JobsFailed { failed: usize },
}

/// Per-job errors. Logged and counted, never propagated past the job.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Output {output} is already produced by {first}")]
    OutputCollision { output: String, first: String },
}

/// Set-once failure flag shared by the walk and the render jobs.
///
/// Only ever moves from `false` to `true`. Relaxed ordering is intended: the
/// walk reads it to decide whether to launch more templates, and observing a
/// failure a step late only means a few more jobs get launched.
#[derive(Debug, Default)]
pub struct ErrorFlag(AtomicBool);

impl ErrorFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Write-once map from output path to the template that claimed it.
#[derive(Debug, Default)]
pub struct OutputRegistry {
    claimed: HashMap<String, String>,
}

impl OutputRegistry {
    /// Claim a job's output path. Jobs without output always succeed.
    pub fn claim(&mut self, job: &RenderJob) -> Result<(), JobError> {
        let Some(output) = job.output_rel() else {
            return Ok(());
        };
        if let Some(first) = self.claimed.get(&output) {
            return Err(JobError::OutputCollision {
                output,
                first: first.clone(),
            });
        }
        self.claimed.insert(output, job.template.clone());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

/// Build statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Number of indexed content files.
    pub content_items: usize,
    /// Template files visited by the walk.
    pub templates: usize,
    /// Script templates skipped.
    pub skipped_scripts: usize,
    /// Jobs handed to the worker pool.
    pub scheduled: usize,
    /// Jobs that wrote their output.
    pub rendered: usize,
    /// Jobs that failed, including output collisions.
    pub failed: usize,
    /// Whether the walk stopped before visiting every template.
    pub stopped_early: bool,
    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

/// The jobs a build would run, computed without rendering anything.
#[derive(Debug, Default)]
pub struct BuildPlan {
    pub content_items: usize,
    pub templates: usize,
    pub skipped_scripts: usize,
    pub jobs: Vec<RenderJob>,
    pub collisions: Vec<(RenderJob, JobError)>,
}

#[derive(Debug, Default)]
struct JobCounters {
    rendered: AtomicUsize,
    failed: AtomicUsize,
}

/// Site builder that orchestrates index, fan-out and rendering.
pub struct Builder<R> {
    env: BuildEnvironment,
    languages: Vec<String>,
    threads: usize,
    renderer: R,
}

impl<R: Renderer> Builder<R> {
    /// Create a builder with one worker per core.
    pub fn new(env: BuildEnvironment, languages: Vec<String>, renderer: R) -> Self {
        Self {
            env,
            languages,
            threads: effective_threads(&Default::default()),
            renderer,
        }
    }

    /// Create a builder from a loaded config.
    pub fn from_config(env: BuildEnvironment, config: &SiteConfig, renderer: R) -> Self {
        Self::new(env, config.languages.clone(), renderer)
            .with_threads(effective_threads(&config.processing))
    }

    /// Set the number of render workers.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn env(&self) -> &BuildEnvironment {
        &self.env
    }

    /// Execute the full build.
    ///
    /// Returns [`BuildError::JobsFailed`] when any job failed, after every
    /// launched job has finished.
    pub fn build(&self) -> Result<BuildStats, BuildError> {
        let start = Instant::now();

        info!(
            templates = %self.env.template_dir.display(),
            output = %self.env.output_dir.display(),
            domain = %self.env.domain,
            threads = self.threads,
            "starting build"
        );

        let index = index_content(&self.env.source_dir)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .thread_name(|i| format!("render-{i}"))
            .build()?;

        let flag = ErrorFlag::new();
        let mut stats = self.run(&pool, &index, &flag)?;
        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            templates = stats.templates,
            rendered = stats.rendered,
            failed = stats.failed,
            duration_ms = stats.duration_ms,
            "build finished"
        );

        if flag.is_raised() {
            return Err(BuildError::JobsFailed {
                failed: stats.failed,
            });
        }
        Ok(stats)
    }

    /// Walk, schedule, and wait. The pool scope returns only after every
    /// spawned job has finished, including when the walk itself fails.
    fn run(
        &self,
        pool: &rayon::ThreadPool,
        index: &[ContentItem],
        flag: &ErrorFlag,
    ) -> Result<BuildStats, BuildError> {
        let counters = JobCounters::default();
        let mut registry = OutputRegistry::default();
        let mut stats = BuildStats {
            content_items: index.len(),
            ..BuildStats::default()
        };

        let walked = pool.scope(|scope| -> Result<(), BuildError> {
            for task in walk_templates(&self.env.template_dir) {
                if flag.is_raised() {
                    warn!("a render job failed, not starting further templates");
                    stats.stopped_early = true;
                    break;
                }
                let task = task?;
                stats.templates += 1;

                if task.kind == TemplateKind::Script {
                    debug!(template = %task.rel_path, "skipping script");
                    stats.skipped_scripts += 1;
                    continue;
                }

                let jobs = expand(&task, index, &self.languages);
                if jobs.is_empty() {
                    debug!(template = %task.rel_path, "no matching content");
                }

                for job in jobs {
                    if let Err(err) = registry.claim(&job) {
                        report_failure(&job, &err);
                        flag.raise();
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    stats.scheduled += 1;
                    let counters = &counters;
                    scope.spawn(move |_| self.run_job(&job, flag, counters));
                }
            }
            Ok(())
        });

        stats.rendered = counters.rendered.load(Ordering::Relaxed);
        stats.failed = counters.failed.load(Ordering::Relaxed);
        walked?;
        Ok(stats)
    }

    fn run_job(&self, job: &RenderJob, flag: &ErrorFlag, counters: &JobCounters) {
        info!(
            "{:?}: {:?} -> {:?}",
            job.template,
            job.source_rel(),
            job.output_rel().unwrap_or_default()
        );
        match dispatch(&self.env, &self.renderer, job) {
            Ok(_) => {
                counters.rendered.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                flag.raise();
                counters.failed.fetch_add(1, Ordering::Relaxed);
                report_failure(job, &JobError::from(err));
            }
        }
    }

    /// Compute the jobs a build would run without rendering.
    ///
    /// Walk and extension errors are fatal exactly as in [`Builder::build`];
    /// output collisions are collected instead.
    pub fn plan(&self) -> Result<BuildPlan, BuildError> {
        let index = index_content(&self.env.source_dir)?;
        let mut registry = OutputRegistry::default();
        let mut plan = BuildPlan {
            content_items: index.len(),
            ..BuildPlan::default()
        };

        for task in walk_templates(&self.env.template_dir) {
            let task = task?;
            plan.templates += 1;
            if task.kind == TemplateKind::Script {
                plan.skipped_scripts += 1;
                continue;
            }
            for job in expand(&task, &index, &self.languages) {
                match registry.claim(&job) {
                    Ok(()) => plan.jobs.push(job),
                    Err(err) => plan.collisions.push((job, err)),
                }
            }
        }
        Ok(plan)
    }
}

fn report_failure(job: &RenderJob, err: &JobError) {
    error!(
        template = %job.template,
        source = %job.source_rel(),
        output = %job.output_stem,
        "failed to compile: {err}"
    );
}

/// Recursively delete the output directory. A missing directory is not an error.
pub fn clean_output(env: &BuildEnvironment) -> Result<(), BuildError> {
    info!(dir = %env.output_dir.display(), "removing output directory");
    match fs::remove_dir_all(&env.output_dir) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(BuildError::Clean {
            dir: env.output_dir.clone(),
            source: err,
        }),
        _ => Ok(()),
    }
}
