use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "vulnhawk", version, author = "vulnhawk")]
pub struct Cli {
    /// Comma-separated CIDRs, IPs or domains to scan (no http/https prefix)
    #[arg(short = 't', long = "target")]
    pub target: String,

    /// Scan intrusiveness: 1 passive, 2 normal, 3 aggressive, 4 attack surface, 5 remote scanner
    #[arg(short = 'm', long = "mode")]
    pub mode: u8,

    /// Organisation name used to route records in the persistence sink
    #[arg(short = 'o', long = "org")]
    pub org: String,

    /// Chain credential bruteforce against services found by port scans
    #[arg(long = "bruteforce", action = ArgAction::SetTrue)]
    pub bruteforce: bool,

    /// Timeout for each bruteforce attack in seconds
    #[arg(long = "bruteforce-timeout", default_value_t = 300)]
    pub bruteforce_timeout: u64,

    /// Custom configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Verbose human output
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Debug logs (implies verbose)
    #[arg(long = "debug", action = ArgAction::SetTrue)]
    pub debug: bool,
}
