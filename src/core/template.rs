use crate::core::errors::VulnhawkError;
use crate::core::models::ArtifactKind;

/// Scan intrusiveness level selected on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Passive,
    Normal,
    Aggressive,
    AttackSurface,
    Remote,
}

impl Mode {
    /// Invalid values are a configuration error surfaced before orchestration starts.
    pub fn from_int(value: u8) -> Result<Self, VulnhawkError> {
        match value {
            1 => Ok(Mode::Passive),
            2 => Ok(Mode::Normal),
            3 => Ok(Mode::Aggressive),
            4 => Ok(Mode::AttackSurface),
            5 => Ok(Mode::Remote),
            other => Err(VulnhawkError::InvalidMode(other)),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Mode::Passive => "PASSIVE - light reconnaissance without active scanning",
            Mode::Normal => "NORMAL - standard scanning with selected active modules",
            Mode::Aggressive => "AGGRESSIVE - full scanning with all active modules",
            Mode::AttackSurface => "ATTACK SURFACE - surface mapping with follow-up scans",
            Mode::Remote => "REMOTE SCANNER - scans driven through the remote scanner API",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconIntensity {
    Passive,
    Normal,
    Aggressive,
    AttackSurface,
}

/// Tagged job descriptor. Kinds are dispatched through a single executor
/// function per kind rather than a trait hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub enum JobKind {
    Recon { intensity: ReconIntensity },
    PortScan { bruteforce: bool },
    TemplateScan,
    CmsFingerprint,
    CmsTemplateScan,
}

/// Where a job's input comes from when its stage group starts.
#[derive(Clone, Debug, PartialEq)]
pub enum InputSource {
    /// The unparsed CLI target expression.
    RawExpression,
    /// Every classified target.
    ClassifiedTargets,
    /// A named prior job's artifact file, gated on presence and non-emptiness.
    Artifact { producer: String, kind: ArtifactKind },
    /// Targets discovered at runtime (dynamic fan-out only).
    Literal(Vec<String>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct JobSpec {
    pub name: String,
    pub kind: JobKind,
    pub input: InputSource,
}

impl JobSpec {
    pub fn new(name: &str, kind: JobKind, input: InputSource) -> Self {
        Self {
            name: name.to_string(),
            kind,
            input,
        }
    }
}

/// Jobs in one group are launched together; the next group starts only after
/// every job in this one is terminal.
#[derive(Clone, Debug, Default)]
pub struct StageGroup {
    pub jobs: Vec<JobSpec>,
}

impl StageGroup {
    pub fn of(jobs: Vec<JobSpec>) -> Self {
        Self { jobs }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineTemplate {
    pub mode: Mode,
    pub groups: Vec<StageGroup>,
}

fn subdomains_of(producer: &str) -> InputSource {
    InputSource::Artifact {
        producer: producer.to_string(),
        kind: ArtifactKind::Subdomains,
    }
}

impl PipelineTemplate {
    /// Static stage graph for a mode. The CMS fingerprint job extends the
    /// graph at runtime by returning follow-up descriptors on a hit, so the
    /// CMS-specific template scan never appears here.
    pub fn for_mode(mode: Mode, bruteforce: bool) -> Self {
        let groups = match mode {
            Mode::Passive => vec![StageGroup::of(vec![JobSpec::new(
                "bbot",
                JobKind::Recon {
                    intensity: ReconIntensity::Passive,
                },
                InputSource::RawExpression,
            )])],

            Mode::Normal => vec![StageGroup::of(vec![
                JobSpec::new(
                    "bbot",
                    JobKind::Recon {
                        intensity: ReconIntensity::Normal,
                    },
                    InputSource::RawExpression,
                ),
                JobSpec::new(
                    "rustscan",
                    JobKind::PortScan { bruteforce: false },
                    InputSource::ClassifiedTargets,
                ),
            ])],

            Mode::Aggressive => vec![
                StageGroup::of(vec![
                    JobSpec::new(
                        "rustscan",
                        JobKind::PortScan { bruteforce },
                        InputSource::ClassifiedTargets,
                    ),
                    JobSpec::new(
                        "bbot",
                        JobKind::Recon {
                            intensity: ReconIntensity::Aggressive,
                        },
                        InputSource::RawExpression,
                    ),
                ]),
                StageGroup::of(vec![
                    JobSpec::new("nuclei", JobKind::TemplateScan, subdomains_of("bbot")),
                    JobSpec::new("wordpress_detect", JobKind::CmsFingerprint, subdomains_of("bbot")),
                ]),
            ],

            Mode::AttackSurface => vec![
                StageGroup::of(vec![JobSpec::new(
                    "bbot",
                    JobKind::Recon {
                        intensity: ReconIntensity::AttackSurface,
                    },
                    InputSource::RawExpression,
                )]),
                StageGroup::of(vec![
                    JobSpec::new("nuclei", JobKind::TemplateScan, subdomains_of("bbot")),
                    JobSpec::new(
                        "rustscan",
                        JobKind::PortScan { bruteforce },
                        InputSource::Artifact {
                            producer: "bbot".to_string(),
                            kind: ArtifactKind::Ips,
                        },
                    ),
                    JobSpec::new("wordpress_detect", JobKind::CmsFingerprint, subdomains_of("bbot")),
                ]),
            ],

            // Targets flow directly to the remote lifecycle monitor.
            Mode::Remote => Vec::new(),
        };

        Self { mode, groups }
    }

    pub fn job_count(&self) -> usize {
        self.groups.iter().map(|g| g.jobs.len()).sum()
    }

    /// Every artifact dependency must name a job declared in an earlier group.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen: Vec<&str> = Vec::new();
        for group in &self.groups {
            for job in &group.jobs {
                if let InputSource::Artifact { producer, .. } = &job.input {
                    if !seen.contains(&producer.as_str()) {
                        anyhow::bail!(
                            "job '{}' consumes artifact of '{}', which is not declared in an earlier group",
                            job.name,
                            producer
                        );
                    }
                }
            }
            seen.extend(group.jobs.iter().map(|j| j.name.as_str()));
        }
        Ok(())
    }
}
