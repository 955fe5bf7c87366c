//! CLI output formatting.
//!
//! The `check` task prints the build plan grouped by template, in walk order:
//!
//! ```text
//! Templates (3 files, 1 script skipped)
//! blog/{{NAME}}.tmd
//!     blog/post1.md → blog/post1.html
//!     blog/post2.md → blog/post2.html
//! index.{{LANG}}.tmd
//!     [en] index.{{LANG}}.tmd → index.en.html
//!     [zh] index.{{LANG}}.tmd → index.zh.html
//!
//! Collisions
//!     {{NAME}}.tmd (index.md): Output index.html is already produced by index.html
//!
//! Planned 4 jobs from 2 content files
//! ```
//!
//! Format functions are pure and return lines; `print_*` wrappers write them
//! to stdout. Diagnostics go through `tracing` to stderr instead.

use crate::build::{BuildPlan, BuildStats};
use crate::fanout::RenderJob;

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn job_line(job: &RenderJob) -> String {
    let output = job.output_rel().unwrap_or_default();
    if job.language.is_empty() {
        format!("{}{} → {}", indent(1), job.source_rel(), output)
    } else {
        format!(
            "{}[{}] {} → {}",
            indent(1),
            job.language,
            job.source_rel(),
            output
        )
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Format a build plan for the `check` task.
pub fn format_plan(plan: &BuildPlan) -> Vec<String> {
    let mut lines = Vec::new();

    let mut header = format!("Templates ({}", plural(plan.templates, "file"));
    if plan.skipped_scripts > 0 {
        header.push_str(&format!(", {} skipped", plural(plan.skipped_scripts, "script")));
    }
    header.push(')');
    lines.push(header);

    let mut current: Option<&str> = None;
    for job in &plan.jobs {
        if current != Some(job.template.as_str()) {
            lines.push(job.template.clone());
            current = Some(job.template.as_str());
        }
        lines.push(job_line(job));
    }

    if !plan.collisions.is_empty() {
        lines.push(String::new());
        lines.push("Collisions".to_string());
        for (job, err) in &plan.collisions {
            lines.push(format!(
                "{}{} ({}): {}",
                indent(1),
                job.template,
                job.source_rel(),
                err
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Planned {} from {}",
        plural(plan.jobs.len(), "job"),
        plural(plan.content_items, "content file")
    ));
    lines
}

pub fn print_plan(plan: &BuildPlan) {
    for line in format_plan(plan) {
        println!("{}", line);
    }
}

/// Format the one-line summary printed after a successful build.
pub fn format_summary(stats: &BuildStats) -> String {
    format!(
        "Rendered {} from {} in {}ms",
        plural(stats.rendered, "file"),
        plural(stats.templates - stats.skipped_scripts, "template"),
        stats.duration_ms
    )
}

pub fn print_summary(stats: &BuildStats) {
    println!("{}", format_summary(stats));
}
