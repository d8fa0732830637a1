use crate::models::{ChapterUsage, UserMatrix, VerticalUsage};
use crate::structure::CourseIndex;

/// Totals and distinct-student counts per vertical column.
///
/// A student counts toward a column only with a strictly positive value, so
/// a recorded-but-zero visit does not inflate the student count.
pub fn vertical_usage(matrix: &UserMatrix, index: &CourseIndex) -> Vec<VerticalUsage> {
    index
        .labels()
        .iter()
        .enumerate()
        .map(|(column, label)| {
            let (total, students) = column_summary(matrix, column);
            VerticalUsage {
                position: label.position.clone(),
                tooltip: label.tooltip.clone(),
                total,
                students,
            }
        })
        .collect()
}

/// Totals and distinct-student counts per chapter group, computed over the
/// rolled-up chapter rows.
pub fn chapter_usage(chapter_rows: &UserMatrix, index: &CourseIndex) -> Vec<ChapterUsage> {
    index
        .chapters()
        .iter()
        .enumerate()
        .map(|(column, span)| {
            let (total, students) = column_summary(chapter_rows, column);
            ChapterUsage {
                name: span.name.clone(),
                total,
                students,
            }
        })
        .collect()
}

/// Population standard deviation of each column across students.
///
/// With zero students there is no dispersion to report, so every column
/// yields `None` rather than a NaN.
pub fn column_std_devs(matrix: &UserMatrix, columns: usize) -> Vec<Option<f64>> {
    (0..columns)
        .map(|column| {
            let values: Vec<f64> = matrix.rows.iter().map(|row| row.values[column]).collect();
            population_std_dev(&values)
        })
        .collect()
}

/// Verticals ranked by total engagement, highest first.
pub fn rank_by_total(usage: &[VerticalUsage]) -> Vec<VerticalUsage> {
    let mut ranked = usage.to_vec();
    ranked.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

fn column_summary(matrix: &UserMatrix, column: usize) -> (f64, usize) {
    let mut total = 0.0;
    let mut students = 0;
    for row in &matrix.rows {
        let value = row.values[column];
        total += value;
        if value > 0.0 {
            students += 1;
        }
    }
    (total, students)
}

fn population_std_dev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}
