use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{CourseTree, UserMatrix};
use crate::stats;
use crate::structure::CourseIndex;

pub fn build_report(
    tree: &CourseTree,
    from: NaiveDate,
    to: NaiveDate,
    index: &CourseIndex,
    matrix: &UserMatrix,
    chapter_rows: &UserMatrix,
) -> String {
    let chapters = stats::chapter_usage(chapter_rows, index);
    let chapter_devs = stats::column_std_devs(chapter_rows, index.chapter_count());
    let ranked = stats::rank_by_total(&stats::vertical_usage(matrix, index));

    let mut output = String::new();

    let _ = writeln!(output, "# Course Engagement Report");
    let _ = writeln!(
        output,
        "Generated for {} (visits from {} to {})",
        tree.name, from, to
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Cohort of {} students across {} content units.",
        matrix.student_count(),
        index.column_count()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Engagement by Chapter");

    if chapters.is_empty() {
        let _ = writeln!(output, "No chapters in this course.");
    } else {
        for ((usage, std_dev), span) in chapters.iter().zip(chapter_devs.iter()).zip(index.chapters())
        {
            let _ = writeln!(
                output,
                "- {}: total {} from {} students over {} units (std dev {})",
                usage.name,
                usage.total,
                usage.students,
                span.subtotal,
                format_dev(*std_dev)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Visited Content");

    if matrix.student_count() == 0 {
        let _ = writeln!(output, "No visits recorded for this window.");
    } else {
        for usage in ranked.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}): total {} from {} students",
                usage.position, usage.tooltip, usage.total, usage.students
            );
        }
    }

    output
}

fn format_dev(value: Option<f64>) -> String {
    match value {
        Some(dev) => format!("{dev:.2}"),
        None => "n/a".to_string(),
    }
}
