use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use tokio::time::sleep;

use crate::config::RemoteConfig;
use crate::ingest::pipeline::ReportIngestionPipeline;
use crate::remote::client::RemoteScanApi;
use crate::remote::models::RemoteTask;
use crate::utils::fs::atomic_write;
use crate::utils::time::sanitize;

#[derive(Debug, Default)]
pub struct MonitorSummary {
    pub targets_created: usize,
    pub tasks_tracked: usize,
    pub tasks_completed: usize,
    pub reports_ingested: usize,
    pub records_emitted: usize,
    pub skipped_false_positives: usize,
}

/// Drives remote scan tasks through create, start and a polling loop until
/// every tracked task has completed, ingesting reports as they finish.
pub struct LifecycleMonitor<A> {
    api: A,
    ingest: ReportIngestionPipeline,
    reports_dir: PathBuf,
    poll_interval: Duration,
    max_poll_rounds: Option<u32>,
}

impl<A: RemoteScanApi> LifecycleMonitor<A> {
    pub fn new(
        api: A,
        ingest: ReportIngestionPipeline,
        reports_dir: PathBuf,
        config: &RemoteConfig,
    ) -> Self {
        Self {
            api,
            ingest,
            reports_dir,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_poll_rounds: config.max_poll_rounds.filter(|max| *max > 0),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub async fn scan_targets(&self, targets: &[String]) -> Result<MonitorSummary> {
        let mut summary = MonitorSummary::default();
        if targets.is_empty() {
            tracing::warn!("No targets to submit to the remote scanner");
            return Ok(summary);
        }
        tracing::info!("Starting remote scan for {} target(s)", targets.len());

        // Create all targets in parallel. A creation failure removes only its
        // own target: it never produces a task.
        let created = join_all(targets.iter().map(|target| async move {
            let name = format!("Discovered {}", target);
            (
                target,
                self.api
                    .create_target(&name, std::slice::from_ref(target))
                    .await,
            )
        }))
        .await;

        let mut remote_targets = Vec::new();
        for (target, result) in created {
            match result {
                Ok(remote) => {
                    tracing::info!("Created target {} for {}", remote.id, remote.name);
                    remote_targets.push(remote);
                }
                Err(err) => {
                    tracing::error!("Failed to create target for {}: {:#}", target, err)
                }
            }
        }
        summary.targets_created = remote_targets.len();

        // One scan task per created target, same isolation.
        let created_tasks = join_all(remote_targets.iter().map(|target| async move {
            let name = format!("Scan for {}", target.name);
            (target, self.api.create_task(&name, &target.id).await)
        }))
        .await;

        let mut tasks = Vec::new();
        for (target, result) in created_tasks {
            match result {
                Ok(task) => {
                    tracing::info!("Created task {} ({})", task.id, task.name);
                    tasks.push((target.id.clone(), task));
                }
                Err(err) => {
                    tracing::error!("Failed to create task for target {}: {:#}", target.id, err)
                }
            }
        }

        // Start each task exactly once, capturing the report id when the
        // start response already carries one.
        let started = join_all(tasks.iter().map(|(target_id, task)| async move {
            (target_id, task, self.api.start_task(&task.id).await)
        }))
        .await;

        let mut tracked: Vec<RemoteTask> = Vec::new();
        for (target_id, task, result) in started {
            match result {
                Ok(start) => {
                    tracing::info!(
                        "Started task {} (target {}) with report id {:?}",
                        start.task_id,
                        target_id,
                        start.report_id
                    );
                    tracked.push(RemoteTask {
                        id: task.id.clone(),
                        name: task.name.clone(),
                        target_id: target_id.clone(),
                        report_id: start.report_id,
                        completed: false,
                    });
                }
                Err(err) => tracing::error!("Failed to start task {}: {:#}", task.id, err),
            }
        }
        summary.tasks_tracked = tracked.len();

        if tracked.is_empty() {
            tracing::warn!("No remote tasks started; nothing to monitor");
            return Ok(summary);
        }

        self.poll_to_completion(&mut tracked, &mut summary).await;
        summary.tasks_completed = tracked.iter().filter(|t| t.completed).count();
        tracing::info!(
            "Remote scan finished: {}/{} task(s) completed",
            summary.tasks_completed,
            summary.tasks_tracked
        );
        Ok(summary)
    }

    async fn poll_to_completion(&self, tasks: &mut [RemoteTask], summary: &mut MonitorSummary) {
        let mut rounds: u32 = 0;
        loop {
            let remaining = tasks.iter().filter(|t| !t.completed).count();
            if remaining == 0 {
                break;
            }

            if let Some(max) = self.max_poll_rounds {
                if rounds >= max {
                    for task in tasks.iter_mut().filter(|t| !t.completed) {
                        tracing::error!(
                            "Giving up on task {} after {} polling rounds",
                            task.id,
                            max
                        );
                        task.completed = true;
                    }
                    break;
                }
            }
            rounds += 1;

            tracing::info!("Waiting on {} remote task(s)", remaining);
            sleep(self.poll_interval).await;

            for index in 0..tasks.len() {
                if tasks[index].completed {
                    continue;
                }

                let status = match self.api.task_status(&tasks[index].id).await {
                    Ok(response) => {
                        tracing::debug!(
                            "Task {} ({}) status: {}",
                            response.id,
                            response.name,
                            response.status
                        );
                        response.status
                    }
                    Err(err) => {
                        // A transient status error leaves this task in the
                        // loop and never disturbs sibling polling.
                        tracing::error!(
                            "Error checking status for task {}: {:#}",
                            tasks[index].id,
                            err
                        );
                        continue;
                    }
                };

                if status.is_terminal_success() {
                    self.handle_success(&tasks[index], summary).await;
                    tasks[index].completed = true;
                } else if status.is_terminal_failure() {
                    tracing::error!("Task {} ended with status {}", tasks[index].id, status);
                    tasks[index].completed = true;
                }
            }
        }
    }

    /// Fetch, persist and ingest the finished task's report. A report is never
    /// re-fetched: empty bodies and fetch failures still complete the task.
    async fn handle_success(&self, task: &RemoteTask, summary: &mut MonitorSummary) {
        let Some(report_id) = &task.report_id else {
            tracing::warn!("Task {} completed but no report id is available", task.id);
            return;
        };

        match self.api.fetch_report(report_id).await {
            Ok(body) if !body.trim().is_empty() => {
                let filename = format!("report_{}_{}.xml", sanitize(&task.id), sanitize(&task.name));
                let path = self.reports_dir.join(filename);
                if let Err(err) = atomic_write(&path, body.as_bytes()) {
                    tracing::error!("Failed to persist report for task {}: {:#}", task.id, err);
                    return;
                }
                tracing::info!("Report saved: {:?} ({} bytes)", path, body.len());

                let outcome = self.ingest.ingest(&path).await;
                summary.reports_ingested += 1;
                summary.records_emitted += outcome.records.len();
                summary.skipped_false_positives += outcome.skipped_false_positives;
            }
            Ok(_) => tracing::warn!("Report for task {} was empty", task.id),
            Err(err) => tracing::error!(
                "Failed to fetch report {} for task {}: {:#}",
                report_id,
                task.id,
                err
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::epss::ScoreFeed;
    use crate::ingest::records::VulnerabilityRecord;
    use crate::remote::models::{
        CreatedTask, RemoteTarget, StartTaskResponse, TaskStatus, TaskStatusResponse,
    };
    use crate::sink::VulnSink;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const SAMPLE_REPORT: &str = r#"<report id="r-1"><results><result>
  <name>Internal hostname disclosure</name>
  <host>10.0.0.5</host>
  <port>8080/tcp</port>
  <threat>Medium</threat>
  <severity>5.0</severity>
  <qod><value>70</value></qod>
  <description>Service leaks internal hostnames.</description>
  <nvt oid="1.3"><cve>NOCVE</cve></nvt>
</result></results></report>"#;

    fn task_id_for(host: &str) -> String {
        format!("task-{}-id", host)
    }

    struct ScriptedApi {
        statuses: Mutex<HashMap<String, VecDeque<TaskStatus>>>,
        report_body: String,
        fail_create_for: HashSet<String>,
        report_fetches: Arc<AtomicUsize>,
    }

    impl ScriptedApi {
        fn new(report_body: &str) -> Self {
            Self {
                statuses: Mutex::new(HashMap::new()),
                report_body: report_body.to_string(),
                fail_create_for: HashSet::new(),
                report_fetches: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn script(self, host: &str, statuses: &[TaskStatus]) -> Self {
            self.statuses
                .lock()
                .unwrap()
                .insert(task_id_for(host), statuses.iter().cloned().collect());
            self
        }

        fn failing_create(mut self, host: &str) -> Self {
            self.fail_create_for.insert(host.to_string());
            self
        }

        fn fetch_counter(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.report_fetches)
        }
    }

    #[async_trait]
    impl RemoteScanApi for ScriptedApi {
        async fn create_target(&self, name: &str, hosts: &[String]) -> anyhow::Result<RemoteTarget> {
            let host = &hosts[0];
            if self.fail_create_for.contains(host) {
                anyhow::bail!("target rejected by remote scanner");
            }
            Ok(RemoteTarget {
                id: format!("{}-id", host),
                name: name.to_string(),
                hosts: hosts.to_vec(),
            })
        }

        async fn create_task(&self, name: &str, target_id: &str) -> anyhow::Result<CreatedTask> {
            Ok(CreatedTask {
                id: format!("task-{}", target_id),
                name: name.to_string(),
            })
        }

        async fn start_task(&self, task_id: &str) -> anyhow::Result<StartTaskResponse> {
            Ok(StartTaskResponse {
                task_id: task_id.to_string(),
                report_id: Some(format!("rep-{}", task_id)),
                status: Some(TaskStatus::Requested),
            })
        }

        async fn task_status(&self, task_id: &str) -> anyhow::Result<TaskStatusResponse> {
            let mut statuses = self.statuses.lock().unwrap();
            let queue = statuses
                .get_mut(task_id)
                .ok_or_else(|| anyhow::anyhow!("unknown task {}", task_id))?;
            let status = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap_or(TaskStatus::Running)
            };
            Ok(TaskStatusResponse {
                id: task_id.to_string(),
                name: "scan".to_string(),
                status,
            })
        }

        async fn fetch_report(&self, _report_id: &str) -> anyhow::Result<String> {
            self.report_fetches.fetch_add(1, Ordering::Relaxed);
            Ok(self.report_body.clone())
        }
    }

    struct NullFeed;

    #[async_trait]
    impl ScoreFeed for NullFeed {
        async fn exploit_percentile(&self, _cve: &str) -> anyhow::Result<Option<f64>> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct CaptureSink {
        records: Mutex<Vec<VulnerabilityRecord>>,
    }

    #[async_trait]
    impl VulnSink for CaptureSink {
        async fn insert(&self, record: &VulnerabilityRecord, _org_name: &str) -> bool {
            self.records.lock().unwrap().push(record.clone());
            true
        }
    }

    fn monitor(
        api: ScriptedApi,
        dir: &tempfile::TempDir,
        sink: Arc<CaptureSink>,
        max_poll_rounds: Option<u32>,
    ) -> LifecycleMonitor<ScriptedApi> {
        let config = RemoteConfig {
            max_poll_rounds,
            ..Default::default()
        };
        let pipeline = ReportIngestionPipeline::new(Arc::new(NullFeed), sink, "acme".to_string());
        LifecycleMonitor::new(api, pipeline, dir.path().join("reports"), &config)
            .with_poll_interval(Duration::from_millis(2))
    }

    #[tokio::test]
    async fn done_task_fetches_exactly_one_report_and_completes_once() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new(SAMPLE_REPORT).script(
            "10.0.0.1",
            &[TaskStatus::Running, TaskStatus::Running, TaskStatus::Done],
        );
        let fetches = api.fetch_counter();
        let sink = Arc::new(CaptureSink::default());

        let summary = monitor(api, &dir, Arc::clone(&sink), None)
            .scan_targets(&["10.0.0.1".to_string()])
            .await
            .unwrap();

        assert_eq!(summary.targets_created, 1);
        assert_eq!(summary.tasks_tracked, 1);
        assert_eq!(summary.tasks_completed, 1);
        assert_eq!(summary.reports_ingested, 1);
        assert_eq!(summary.records_emitted, 1);
        assert_eq!(fetches.load(Ordering::Relaxed), 1);
        assert_eq!(sink.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_task_never_triggers_a_report_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new(SAMPLE_REPORT)
            .script("10.0.0.1", &[TaskStatus::Running, TaskStatus::Failed]);
        let fetches = api.fetch_counter();
        let sink = Arc::new(CaptureSink::default());

        let summary = monitor(api, &dir, sink, None)
            .scan_targets(&["10.0.0.1".to_string()])
            .await
            .unwrap();

        assert_eq!(summary.tasks_completed, 1);
        assert_eq!(summary.reports_ingested, 0);
        assert_eq!(fetches.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn empty_report_body_still_completes_the_task() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new("").script("10.0.0.1", &[TaskStatus::Done]);
        let fetches = api.fetch_counter();
        let sink = Arc::new(CaptureSink::default());

        let summary = monitor(api, &dir, Arc::clone(&sink), None)
            .scan_targets(&["10.0.0.1".to_string()])
            .await
            .unwrap();

        assert_eq!(summary.tasks_completed, 1);
        assert_eq!(summary.reports_ingested, 0);
        assert_eq!(summary.records_emitted, 0);
        assert_eq!(fetches.load(Ordering::Relaxed), 1);
        assert!(sink.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_target_creation_is_excluded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new(SAMPLE_REPORT)
            .script("10.0.0.1", &[TaskStatus::Done])
            .failing_create("10.0.0.2");
        let sink = Arc::new(CaptureSink::default());

        let summary = monitor(api, &dir, sink, None)
            .scan_targets(&["10.0.0.1".to_string(), "10.0.0.2".to_string()])
            .await
            .unwrap();

        assert_eq!(summary.targets_created, 1);
        assert_eq!(summary.tasks_tracked, 1);
        assert_eq!(summary.tasks_completed, 1);
    }

    #[tokio::test]
    async fn poll_bound_abandons_stuck_tasks_instead_of_looping_forever() {
        let dir = tempfile::tempdir().unwrap();
        let api = ScriptedApi::new(SAMPLE_REPORT).script("10.0.0.1", &[TaskStatus::Running]);
        let fetches = api.fetch_counter();
        let sink = Arc::new(CaptureSink::default());

        let summary = monitor(api, &dir, sink, Some(3))
            .scan_targets(&["10.0.0.1".to_string()])
            .await
            .unwrap();

        assert_eq!(summary.tasks_completed, 1);
        assert_eq!(summary.reports_ingested, 0);
        assert_eq!(fetches.load(Ordering::Relaxed), 0);
    }
}
