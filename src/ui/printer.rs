use crate::core::scheduler::{AggregateResult, JobStatus};
use crate::remote::monitor::MonitorSummary;
use crossterm::style::{Color, Stylize};

const RULE: &str = "═══════════════════════════════════════";

fn header(target: &str, run_id: &str) {
    println!("\n{}", RULE.with(Color::Green).bold());
    println!("{}", "vulnhawk Run Complete".with(Color::Green).bold());
    println!("{}", RULE.with(Color::Green).bold());

    println!("\n{}: {}", "Target".with(Color::Cyan).bold(), target);
    println!("{}: {}", "Run ID".with(Color::Cyan).bold(), run_id);
}

pub fn print_summary(target: &str, run_id: &str, aggregate: &AggregateResult) {
    header(target, run_id);

    println!("\n{}", "Jobs:".with(Color::Yellow).bold());
    for job in &aggregate.jobs {
        let status = match job.status {
            JobStatus::Succeeded => "ok".with(Color::Green).bold(),
            JobStatus::Failed => "failed".with(Color::Red).bold(),
            JobStatus::Skipped => "skipped".with(Color::Yellow),
        };
        match &job.detail {
            Some(detail) => println!("  • {}: {} ({})", job.name, status, detail),
            None => println!("  • {}: {}", job.name, status),
        }
    }

    println!(
        "\n  {} succeeded, {} failed, {} skipped",
        aggregate
            .count(JobStatus::Succeeded)
            .to_string()
            .with(Color::Green)
            .bold(),
        aggregate
            .count(JobStatus::Failed)
            .to_string()
            .with(Color::Red)
            .bold(),
        aggregate.count(JobStatus::Skipped)
    );

    println!(
        "\n{}",
        "Artifacts written to artifacts/runs/".with(Color::Green).dim()
    );
}

pub fn print_remote_summary(target: &str, run_id: &str, summary: &MonitorSummary) {
    header(target, run_id);

    println!("\n{}", "Remote scan:".with(Color::Yellow).bold());
    println!("  Targets created: {}", summary.targets_created);
    println!(
        "  Tasks completed: {}/{}",
        summary.tasks_completed.to_string().with(Color::Green).bold(),
        summary.tasks_tracked
    );
    println!("  Reports ingested: {}", summary.reports_ingested);
    println!(
        "  Vulnerabilities: {} ({} skipped as false positives)",
        summary
            .records_emitted
            .to_string()
            .with(Color::Green)
            .bold(),
        summary.skipped_false_positives
    );

    println!(
        "\n{}",
        "Reports written to artifacts/runs/".with(Color::Green).dim()
    );
}
