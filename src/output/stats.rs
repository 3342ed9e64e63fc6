//! Run report printing.

use console::style;

use crate::transfer::{BatchReport, RunReport, Stage};

/// Print the outcome of a run.
pub fn print_run_report(report: &RunReport) {
    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style(format!("Run {}:", report.run_id)).bold());
    print_batch(&report.images);
    print_batch(&report.videos);

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!("  {}", style("Failures:").red());
        for failure in failures {
            println!(
                "    [{}] {}: {}",
                failure.stage, failure.item, failure.failure
            );
        }
    }

    if report.cancelled {
        println!("  {}", style("Run was cancelled").yellow());
    }
    println!(
        "  Total:  {}/{} delivered",
        report.total_delivered(),
        report.total_queued()
    );
    println!("{}", style("═".repeat(50)).dim());
}

fn print_batch(batch: &BatchReport) {
    if batch.queued == 0 {
        return;
    }

    let delivered = if batch.is_complete() {
        style(batch.delivered).green()
    } else {
        style(batch.delivered).yellow()
    };
    println!(
        "  {:<7} {}/{} delivered to {} ({} fetch failed, {} upload failed)",
        format!("{}s:", batch.kind),
        delivered,
        batch.queued,
        batch.folder,
        batch.failed_in(Stage::Fetch),
        batch.failed_in(Stage::Upload)
    );
}

/// One-line summary for quiet runs.
pub fn print_summary(report: &RunReport) {
    println!(
        "Delivered: {} images, {} videos ({} failed)",
        style(report.images.delivered).green(),
        style(report.videos.delivered).green(),
        style(report.failures().count()).yellow()
    );
}
