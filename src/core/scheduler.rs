use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::config::GlobalConfig;
use crate::core::models::{Artifact, ArtifactKind, ClassifiedTargets, RunDirs};
use crate::core::template::{InputSource, JobSpec, PipelineTemplate, StageGroup};
use crate::utils::fs::is_non_empty_file;

/// Everything a job needs besides its resolved input.
#[derive(Clone, Debug)]
pub struct RunContext {
    pub raw_targets: String,
    pub targets: ClassifiedTargets,
    pub org_name: String,
    pub dirs: RunDirs,
    pub config: GlobalConfig,
    pub bruteforce_timeout_secs: u64,
}

/// A job's input, resolved when its stage group starts. Jobs whose input
/// cannot be resolved are skipped by the coordinator and never reach a runner.
#[derive(Clone, Debug, PartialEq)]
pub enum JobInput {
    Expression(String),
    Targets(Vec<String>),
    File(PathBuf),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    Failed,
    Skipped,
}

#[derive(Clone, Debug)]
pub struct ScanJobResult {
    pub name: String,
    pub status: JobStatus,
    pub artifacts: Vec<Artifact>,
    /// Failure detail or skip reason.
    pub detail: Option<String>,
}

/// Immutable result of one engine invocation: artifact files plus any
/// follow-up jobs discovered at runtime (dynamic fan-out).
#[derive(Clone, Debug, Default)]
pub struct JobOutcome {
    pub artifacts: Vec<Artifact>,
    pub follow_ups: Vec<JobSpec>,
}

#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, spec: &JobSpec, input: JobInput, ctx: &RunContext) -> Result<JobOutcome>;
}

#[derive(Debug, Default)]
pub struct AggregateResult {
    pub jobs: Vec<ScanJobResult>,
}

impl AggregateResult {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|j| j.status == status).count()
    }

    pub fn get(&self, name: &str) -> Option<&ScanJobResult> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

pub struct TaskCoordinator {
    runner: Arc<dyn JobRunner>,
    workers: Arc<Semaphore>,
}

impl TaskCoordinator {
    pub fn new(runner: Arc<dyn JobRunner>, max_concurrent_jobs: usize) -> Self {
        Self {
            runner,
            workers: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    /// Drains every stage group to a terminal state. All jobs in a group are
    /// launched together on the worker pool; the next group starts only once
    /// each of them is terminal. Job failures land in their own result slot
    /// and never escape as an error. There is no cancellation: every launched
    /// job runs to its own terminal state.
    pub async fn execute(
        &self,
        template: PipelineTemplate,
        ctx: Arc<RunContext>,
    ) -> AggregateResult {
        let mut aggregate = AggregateResult::default();
        let mut artifact_index: HashMap<(String, ArtifactKind), PathBuf> = HashMap::new();
        let mut pending: VecDeque<StageGroup> = template.groups.into_iter().collect();

        while let Some(group) = pending.pop_front() {
            let mut handles = Vec::new();

            for spec in group.jobs {
                let input = match resolve_input(&spec, &ctx, &artifact_index) {
                    Ok(input) => input,
                    Err(reason) => {
                        tracing::warn!("Skipping job {}: {}", spec.name, reason);
                        aggregate.jobs.push(ScanJobResult {
                            name: spec.name,
                            status: JobStatus::Skipped,
                            artifacts: Vec::new(),
                            detail: Some(reason),
                        });
                        continue;
                    }
                };

                let runner = Arc::clone(&self.runner);
                let workers = Arc::clone(&self.workers);
                let ctx = Arc::clone(&ctx);
                let name = spec.name.clone();
                let handle = tokio::spawn(async move {
                    let _permit = match workers.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => anyhow::bail!("worker pool closed"),
                    };
                    tracing::info!("Starting job: {}", spec.name);
                    runner.run(&spec, input, &ctx).await
                });
                handles.push((name, handle));
            }

            let (names, running): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
            let joined = join_all(running).await;

            let mut follow_ups: Vec<JobSpec> = Vec::new();
            for (name, joined_result) in names.into_iter().zip(joined) {
                match joined_result {
                    Ok(Ok(outcome)) => {
                        tracing::info!(
                            "Job {} completed with {} artifact(s)",
                            name,
                            outcome.artifacts.len()
                        );
                        for artifact in &outcome.artifacts {
                            artifact_index
                                .insert((name.clone(), artifact.kind), artifact.path.clone());
                        }
                        follow_ups.extend(outcome.follow_ups);
                        aggregate.jobs.push(ScanJobResult {
                            name,
                            status: JobStatus::Succeeded,
                            artifacts: outcome.artifacts,
                            detail: None,
                        });
                    }
                    Ok(Err(err)) => {
                        tracing::error!("Job {} failed: {:#}", name, err);
                        aggregate.jobs.push(ScanJobResult {
                            name,
                            status: JobStatus::Failed,
                            artifacts: Vec::new(),
                            detail: Some(format!("{err:#}")),
                        });
                    }
                    Err(join_err) => {
                        tracing::error!("Job {} aborted: {}", name, join_err);
                        aggregate.jobs.push(ScanJobResult {
                            name,
                            status: JobStatus::Failed,
                            artifacts: Vec::new(),
                            detail: Some(join_err.to_string()),
                        });
                    }
                }
            }

            if !follow_ups.is_empty() {
                tracing::info!(
                    "Scheduling {} follow-up job(s) discovered at runtime",
                    follow_ups.len()
                );
                pending.push_front(StageGroup::of(follow_ups));
            }
        }

        aggregate
    }
}

fn resolve_input(
    spec: &JobSpec,
    ctx: &RunContext,
    artifacts: &HashMap<(String, ArtifactKind), PathBuf>,
) -> Result<JobInput, String> {
    match &spec.input {
        InputSource::RawExpression => {
            if ctx.raw_targets.trim().is_empty() {
                Err("no targets provided".to_string())
            } else {
                Ok(JobInput::Expression(ctx.raw_targets.clone()))
            }
        }
        InputSource::ClassifiedTargets => {
            if ctx.targets.is_empty() {
                Err("no valid targets classified".to_string())
            } else {
                Ok(JobInput::Targets(ctx.targets.all()))
            }
        }
        InputSource::Artifact { producer, kind } => {
            match artifacts.get(&(producer.clone(), *kind)) {
                Some(path) if is_non_empty_file(path) => Ok(JobInput::File(path.clone())),
                Some(path) => Err(format!(
                    "{:?} artifact from '{}' is empty: {:?}",
                    kind, producer, path
                )),
                None => Err(format!("no {:?} artifact available from '{}'", kind, producer)),
            }
        }
        InputSource::Literal(list) => {
            if list.is_empty() {
                Err("no targets discovered for follow-up".to_string())
            } else {
                Ok(JobInput::Targets(list.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::classify;
    use crate::core::template::{JobKind, Mode, ReconIntensity};
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::Mutex;

    struct StubRunner {
        fail: HashSet<String>,
        scratch: PathBuf,
        inputs: Mutex<Vec<(String, JobInput)>>,
    }

    impl StubRunner {
        fn new(scratch: &Path) -> Self {
            Self {
                fail: HashSet::new(),
                scratch: scratch.to_path_buf(),
                inputs: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, name: &str) -> Self {
            self.fail.insert(name.to_string());
            self
        }

        fn input_of(&self, name: &str) -> Option<JobInput> {
            self.inputs
                .lock()
                .unwrap()
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, i)| i.clone())
        }
    }

    #[async_trait]
    impl JobRunner for StubRunner {
        async fn run(
            &self,
            spec: &JobSpec,
            input: JobInput,
            _ctx: &RunContext,
        ) -> Result<JobOutcome> {
            self.inputs
                .lock()
                .unwrap()
                .push((spec.name.clone(), input));
            if self.fail.contains(&spec.name) {
                anyhow::bail!("stub failure");
            }
            match &spec.kind {
                JobKind::Recon { intensity } => {
                    let path = self.scratch.join(format!("{}_subdomains.txt", spec.name));
                    std::fs::write(&path, "a.example.com\nb.example.com\n").unwrap();
                    let mut artifacts = vec![Artifact {
                        kind: ArtifactKind::Subdomains,
                        path,
                    }];
                    if *intensity == ReconIntensity::AttackSurface {
                        let ips = self.scratch.join(format!("{}_ips.txt", spec.name));
                        std::fs::write(&ips, "10.0.0.1\n").unwrap();
                        artifacts.push(Artifact {
                            kind: ArtifactKind::Ips,
                            path: ips,
                        });
                    }
                    Ok(JobOutcome {
                        artifacts,
                        follow_ups: Vec::new(),
                    })
                }
                JobKind::CmsFingerprint => Ok(JobOutcome {
                    artifacts: Vec::new(),
                    follow_ups: vec![JobSpec::new(
                        "wordpress_nuclei",
                        JobKind::CmsTemplateScan,
                        InputSource::Literal(vec!["blog.example.com".to_string()]),
                    )],
                }),
                _ => Ok(JobOutcome::default()),
            }
        }
    }

    fn test_ctx(dir: &Path) -> Arc<RunContext> {
        Arc::new(RunContext {
            raw_targets: "example.com,10.0.0.1".to_string(),
            targets: classify("example.com,10.0.0.1"),
            org_name: "acme".to_string(),
            dirs: RunDirs {
                root: dir.to_path_buf(),
                scans: dir.join("scans"),
                reports: dir.join("reports"),
            },
            config: GlobalConfig::default(),
            bruteforce_timeout_secs: 300,
        })
    }

    #[tokio::test]
    async fn failed_job_is_isolated_and_never_escapes_execute() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(StubRunner::new(dir.path()).failing("rustscan"));
        let coordinator = TaskCoordinator::new(runner, 4);
        let template = PipelineTemplate::for_mode(Mode::Aggressive, false);
        let declared = template.job_count();

        let aggregate = coordinator.execute(template, test_ctx(dir.path())).await;

        // the CMS hit schedules one dynamic follow-up on top of the declared jobs
        assert_eq!(aggregate.len(), declared + 1);
        assert_eq!(aggregate.get("rustscan").unwrap().status, JobStatus::Failed);
        for name in ["bbot", "nuclei", "wordpress_detect", "wordpress_nuclei"] {
            assert_eq!(
                aggregate.get(name).unwrap().status,
                JobStatus::Succeeded,
                "job {} should have succeeded",
                name
            );
        }
    }

    #[tokio::test]
    async fn dependents_of_failed_producer_skip_without_hanging() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(StubRunner::new(dir.path()).failing("bbot"));
        let coordinator = TaskCoordinator::new(runner, 4);
        let template = PipelineTemplate::for_mode(Mode::Aggressive, false);
        let declared = template.job_count();

        let aggregate = coordinator.execute(template, test_ctx(dir.path())).await;

        // no follow-up: the CMS fingerprint never ran
        assert_eq!(aggregate.len(), declared);
        assert_eq!(aggregate.get("bbot").unwrap().status, JobStatus::Failed);
        assert_eq!(aggregate.get("rustscan").unwrap().status, JobStatus::Succeeded);
        assert_eq!(aggregate.get("nuclei").unwrap().status, JobStatus::Skipped);
        assert_eq!(
            aggregate.get("wordpress_detect").unwrap().status,
            JobStatus::Skipped
        );
    }

    #[tokio::test]
    async fn dependent_receives_producer_artifact_file() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(StubRunner::new(dir.path()));
        let coordinator = TaskCoordinator::new(Arc::clone(&runner) as Arc<dyn JobRunner>, 4);
        let template = PipelineTemplate::for_mode(Mode::AttackSurface, false);

        let aggregate = coordinator.execute(template, test_ctx(dir.path())).await;

        assert_eq!(aggregate.count(JobStatus::Failed), 0);
        match runner.input_of("nuclei").unwrap() {
            JobInput::File(path) => assert!(path.to_string_lossy().ends_with("_subdomains.txt")),
            other => panic!("expected file input, got {:?}", other),
        }
        match runner.input_of("rustscan").unwrap() {
            JobInput::File(path) => assert!(path.to_string_lossy().ends_with("_ips.txt")),
            other => panic!("expected file input, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn dynamic_follow_up_receives_discovered_targets() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(StubRunner::new(dir.path()));
        let coordinator = TaskCoordinator::new(Arc::clone(&runner) as Arc<dyn JobRunner>, 4);
        let template = PipelineTemplate::for_mode(Mode::Aggressive, false);

        let aggregate = coordinator.execute(template, test_ctx(dir.path())).await;

        assert_eq!(
            aggregate.get("wordpress_nuclei").unwrap().status,
            JobStatus::Succeeded
        );
        assert_eq!(
            runner.input_of("wordpress_nuclei").unwrap(),
            JobInput::Targets(vec!["blog.example.com".to_string()])
        );
    }

    #[tokio::test]
    async fn empty_target_set_degrades_to_noop_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(StubRunner::new(dir.path()));
        let coordinator = TaskCoordinator::new(runner, 4);
        let template = PipelineTemplate::for_mode(Mode::Normal, false);
        let ctx = Arc::new(RunContext {
            raw_targets: "   ".to_string(),
            targets: classify("   "),
            org_name: "acme".to_string(),
            dirs: RunDirs {
                root: dir.path().to_path_buf(),
                scans: dir.path().join("scans"),
                reports: dir.path().join("reports"),
            },
            config: GlobalConfig::default(),
            bruteforce_timeout_secs: 300,
        });

        let aggregate = coordinator.execute(template, ctx).await;

        assert_eq!(aggregate.len(), 2);
        assert_eq!(aggregate.count(JobStatus::Skipped), 2);
    }
}
