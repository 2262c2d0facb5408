//! Cost gate: show the operator what a run will cost before any paid call.

use console::style;
use dialoguer::Confirm;

use crate::config::Config;
use crate::pipeline::RunPlan;

/// Present the run plan: per-file table, skipped files, and the estimate.
pub fn display_plan(plan: &RunPlan, config: &Config) {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║        hearscribe - Batch Audio Transcription     ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!();

    println!("{}", style("Files to process:").bold());
    for file in &plan.files {
        let split_note = if file.needs_splitting(config.max_file_size_mb) {
            style(" [will be split]").yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} ({:.1} min, {}){}",
            style(file.file_name()).cyan(),
            file.duration.as_secs_f64() / 60.0,
            format_size(file.size_bytes),
            split_note
        );
    }

    if !plan.skipped.is_empty() {
        println!();
        println!("{}", style("Skipped (could not probe):").bold());
        for (path, reason) in &plan.skipped {
            println!("  {} {}", style("!").yellow(), style(path.display()).dim());
            println!("    {}", style(reason).dim());
        }
    }

    println!();
    println!(
        "  Total duration:  {:.1} hours",
        plan.estimate.total_hours()
    );
    println!(
        "  Estimated cost:  {:.1} min × ${} = {}",
        plan.estimate.total_minutes,
        plan.estimate.rate_per_minute,
        style(format!("${:.2} USD", plan.estimate.total_cost)).bold()
    );

    if plan.estimate.is_high() {
        println!(
            "  {} The estimated cost is considerable. Double-check before continuing.",
            style("⚠").yellow()
        );
    }
    println!();
}

/// Ask the operator to approve the estimated spend.
pub fn confirm() -> anyhow::Result<bool> {
    let proceed = Confirm::new()
        .with_prompt("Proceed with transcription?")
        .default(false)
        .interact()?;
    Ok(proceed)
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
