use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote task status as reported by the scanner API. Unknown strings are
/// preserved rather than rejected so new upstream states never break polling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    New,
    Requested,
    Queued,
    Running,
    Done,
    Stopped,
    Failed,
    Interrupted,
    Other(String),
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "New" => TaskStatus::New,
            "Requested" => TaskStatus::Requested,
            "Queued" => TaskStatus::Queued,
            "Running" => TaskStatus::Running,
            "Done" => TaskStatus::Done,
            "Stopped" => TaskStatus::Stopped,
            "Failed" => TaskStatus::Failed,
            "Interrupted" => TaskStatus::Interrupted,
            _ => TaskStatus::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::New => "New",
            TaskStatus::Requested => "Requested",
            TaskStatus::Queued => "Queued",
            TaskStatus::Running => "Running",
            TaskStatus::Done => "Done",
            TaskStatus::Stopped => "Stopped",
            TaskStatus::Failed => "Failed",
            TaskStatus::Interrupted => "Interrupted",
            TaskStatus::Other(other) => other.as_str(),
        };
        f.write_str(name)
    }
}

impl TaskStatus {
    /// Terminal with a report worth fetching.
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Stopped)
    }

    /// Terminal with nothing to fetch.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Interrupted)
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTargetRequest<'a> {
    pub name: &'a str,
    pub hosts: &'a [String],
    pub port_range: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_list_id: Option<&'a str>,
}

/// A target registered with the remote scanner. The id is authoritative only
/// once the create call has succeeded.
#[derive(Clone, Debug, Deserialize)]
pub struct RemoteTarget {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hosts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTaskRequest<'a> {
    pub name: &'a str,
    pub target_id: &'a str,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreatedTask {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StartTaskResponse {
    pub task_id: String,
    /// Some remote implementations only populate this later; absence here is
    /// a valid, non-fatal state.
    #[serde(default)]
    pub report_id: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TaskStatusResponse {
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
}

/// Monitor-owned view of a started remote task. `completed` flips to true
/// exactly once and the record is never touched afterwards.
#[derive(Clone, Debug)]
pub struct RemoteTask {
    pub id: String,
    pub name: String,
    pub target_id: String,
    pub report_id: Option<String>,
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_from_wire_strings() {
        assert_eq!(TaskStatus::from("Done".to_string()), TaskStatus::Done);
        assert_eq!(TaskStatus::from("Running".to_string()), TaskStatus::Running);
        assert_eq!(
            TaskStatus::from("Provisioning".to_string()),
            TaskStatus::Other("Provisioning".to_string())
        );
    }

    #[test]
    fn terminal_classification() {
        assert!(TaskStatus::Done.is_terminal_success());
        assert!(TaskStatus::Stopped.is_terminal_success());
        assert!(TaskStatus::Failed.is_terminal_failure());
        assert!(TaskStatus::Interrupted.is_terminal_failure());
        for status in [
            TaskStatus::New,
            TaskStatus::Requested,
            TaskStatus::Queued,
            TaskStatus::Running,
            TaskStatus::Other("Provisioning".to_string()),
        ] {
            assert!(!status.is_terminal_success() && !status.is_terminal_failure());
        }
    }

    #[test]
    fn start_response_tolerates_missing_report_id() {
        let parsed: StartTaskResponse =
            serde_json::from_str(r#"{"task_id":"t-1","status":"Requested"}"#).unwrap();
        assert_eq!(parsed.report_id, None);
        assert_eq!(parsed.status, Some(TaskStatus::Requested));
    }
}
