use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecError {
    pub tool: String,
    pub args: Vec<String>,
    pub cwd: String,
    pub exit_code: Option<i32>,
    pub stderr_tail: String,
    pub duration_ms: u128,
}

#[derive(Error, Debug)]
pub enum VulnhawkError {
    #[error("engine execution failed: {0:?}")]
    Exec(ExecError),

    #[error("invalid scan mode {0}: expected 1 (passive) through 5 (remote scanner)")]
    InvalidMode(u8),

    #[error("remote scanner failure: {0}")]
    #[allow(dead_code)]
    Remote(String),

    #[error("io error: {0}")]
    #[allow(dead_code)]
    Io(#[from] std::io::Error),
}
