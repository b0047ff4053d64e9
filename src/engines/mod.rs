pub mod cms;
pub mod nuclei;
pub mod portscan;
pub mod recon;

use crate::core::scheduler::{JobInput, JobOutcome, JobRunner, RunContext};
use crate::core::template::{JobKind, JobSpec};
use anyhow::Result;
use async_trait::async_trait;

/// Single dispatch point from tagged job descriptors to engine invocations.
pub struct EngineRunner;

#[async_trait]
impl JobRunner for EngineRunner {
    async fn run(&self, spec: &JobSpec, input: JobInput, ctx: &RunContext) -> Result<JobOutcome> {
        match &spec.kind {
            JobKind::Recon { intensity } => recon::run(*intensity, &input, ctx).await,
            JobKind::PortScan { bruteforce } => portscan::run(*bruteforce, &input, ctx).await,
            JobKind::TemplateScan => nuclei::run(&input, ctx).await,
            JobKind::CmsFingerprint => cms::fingerprint(&input, ctx).await,
            JobKind::CmsTemplateScan => nuclei::run_cms(&input, ctx).await,
        }
    }
}
