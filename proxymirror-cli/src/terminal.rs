// ============================================================================
// proxymirror-cli/src/terminal.rs
// ============================================================================
//
// TERMINAL OUTPUT: Run header and summary
//
// Log events go to stderr through the logger. This module writes the human
// facing run header and end-of-run summary to stdout, styled with `console`.

use std::time::Duration;

use console::style;
use proxymirror_core::{Summary, format_duration};

/// Fixed label column width for status lines.
const LABEL_WIDTH: usize = 15;

/// Check if color should be used (respects NO_COLOR environment variable)
fn should_use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// Print a section header
pub fn print_section(title: &str) {
    println!();
    if should_use_color() {
        println!("===== {} =====", style(title.to_uppercase()).cyan().bold());
    } else {
        println!("===== {} =====", title.to_uppercase());
    }
}

/// Formats a status line with the label padded to a fixed column.
pub fn format_status(label: &str, value: &str) -> String {
    let padding = LABEL_WIDTH.saturating_sub(label.len()).max(1);
    format!("  {}:{}{}", label, " ".repeat(padding), value)
}

/// Print a status line, optionally with the value in bold
pub fn print_status(label: &str, value: &str, highlight: bool) {
    if should_use_color() && highlight {
        let padding = LABEL_WIDTH.saturating_sub(label.len()).max(1);
        println!("  {}:{}{}", label, " ".repeat(padding), style(value).bold());
    } else {
        println!("{}", format_status(label, value));
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    if should_use_color() {
        println!("  ✓ {}", style(message).green());
    } else {
        println!("  ✓ {message}");
    }
}

/// Print a warning message
pub fn print_warning(message: &str) {
    if should_use_color() {
        println!("  ! {}", style(message).yellow());
    } else {
        println!("  ! {message}");
    }
}

/// Print an error message to stderr
pub fn print_error(message: &str) {
    if should_use_color() {
        eprintln!("{} {}", style("Error:").red().bold(), message);
    } else {
        eprintln!("Error: {message}");
    }
}

/// Label/value rows of the run summary, in display order.
pub fn summary_rows(summary: &Summary, elapsed: Duration) -> Vec<(&'static str, String)> {
    vec![
        ("Considered", summary.files_considered.to_string()),
        ("Built", summary.files_built.to_string()),
        ("Skipped", summary.files_skipped.to_string()),
        ("Errors", summary.errors.to_string()),
        ("Ignored", summary.files_ignored.to_string()),
        ("Elapsed", format_duration(elapsed)),
    ]
}

/// Print the end-of-run summary
pub fn print_summary(summary: &Summary, elapsed: Duration) {
    print_section("Summary");
    for (label, value) in summary_rows(summary, elapsed) {
        let highlight = matches!(label, "Built" | "Errors");
        print_status(label, &value, highlight);
    }

    if !summary.failures.is_empty() {
        print_section("Failures");
        for failure in &summary.failures {
            print_status("Input", &failure.input.display().to_string(), true);
            print_status("Output", &failure.output.display().to_string(), false);
            print_status("Reason", &failure.reason, false);
            println!();
        }
    }

    println!();
    if summary.interrupted {
        print_warning("Run interrupted; rerun to build the remaining proxies");
    } else if summary.errors > 0 {
        print_warning(&format!(
            "{} proxy build(s) failed; see the log for details",
            summary.errors
        ));
    } else {
        print_success(&format!("{} proxy file(s) built", summary.files_built));
    }
}
