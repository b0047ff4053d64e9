use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::remote::models::{
    CreateTargetRequest, CreateTaskRequest, CreatedTask, RemoteTarget, StartTaskResponse,
    TaskStatusResponse,
};

/// HTTP contract of the remote vulnerability scanner. Every call except
/// `start_task` is idempotent on retry; `start_task` must be issued exactly
/// once per task, which the lifecycle monitor guarantees.
#[async_trait]
pub trait RemoteScanApi: Send + Sync {
    async fn create_target(&self, name: &str, hosts: &[String]) -> Result<RemoteTarget>;
    async fn create_task(&self, name: &str, target_id: &str) -> Result<CreatedTask>;
    async fn start_task(&self, task_id: &str) -> Result<StartTaskResponse>;
    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse>;
    async fn fetch_report(&self, report_id: &str) -> Result<String>;
}

pub struct OpenVasClient {
    http: Client,
    base_url: String,
    port_range: String,
}

impl OpenVasClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build remote scanner HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            port_range: config.port_range.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl RemoteScanApi for OpenVasClient {
    async fn create_target(&self, name: &str, hosts: &[String]) -> Result<RemoteTarget> {
        let payload = CreateTargetRequest {
            name,
            hosts,
            port_range: &self.port_range,
            port_list_id: None,
        };
        let response = self
            .http
            .post(self.url("/targets"))
            .json(&payload)
            .send()
            .await
            .context("create_target request failed")?
            .error_for_status()
            .context("create_target rejected")?;
        response
            .json()
            .await
            .context("create_target returned malformed JSON")
    }

    async fn create_task(&self, name: &str, target_id: &str) -> Result<CreatedTask> {
        let payload = CreateTaskRequest { name, target_id };
        let response = self
            .http
            .post(self.url("/tasks"))
            .json(&payload)
            .send()
            .await
            .context("create_task request failed")?
            .error_for_status()
            .context("create_task rejected")?;
        response
            .json()
            .await
            .context("create_task returned malformed JSON")
    }

    async fn start_task(&self, task_id: &str) -> Result<StartTaskResponse> {
        let response = self
            .http
            .post(self.url(&format!("/tasks/{}/start", task_id)))
            .send()
            .await
            .context("start_task request failed")?
            .error_for_status()
            .context("start_task rejected")?;
        response
            .json()
            .await
            .context("start_task returned malformed JSON")
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse> {
        let response = self
            .http
            .get(self.url(&format!("/tasks/{}/status", task_id)))
            .send()
            .await
            .context("task_status request failed")?
            .error_for_status()
            .context("task_status rejected")?;
        response
            .json()
            .await
            .context("task_status returned malformed JSON")
    }

    async fn fetch_report(&self, report_id: &str) -> Result<String> {
        let response = self
            .http
            .get(self.url(&format!("/reports/{}", report_id)))
            .send()
            .await
            .context("report request failed")?
            .error_for_status()
            .context("report rejected")?;
        response.text().await.context("report body was unreadable")
    }
}
