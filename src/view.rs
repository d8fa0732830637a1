use clap::ValueEnum;

use crate::models::{UserMatrix, UserRow};
use crate::structure::CourseIndex;

/// Granularity of the projected table: one column per chapter, or one per
/// leaf vertical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewMode {
    Grouped,
    Detailed,
}

/// A `(headers, rows)` pair ready for display or flat-file export. The
/// leading header names the student column, so header count is always one
/// more than each row's value count.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<UserRow>,
}

/// Select the pre-computed matrix matching `mode` and pair it with its
/// headers. Pure re-selection: nothing is densified or rolled up again when
/// the caller flips modes.
pub fn project(
    mode: ViewMode,
    index: &CourseIndex,
    matrix: &UserMatrix,
    chapter_rows: &UserMatrix,
) -> TableView {
    let mut headers = vec!["student".to_string()];
    let rows = match mode {
        ViewMode::Grouped => {
            headers.extend(index.chapters().iter().map(|span| span.name.clone()));
            chapter_rows.rows.clone()
        }
        ViewMode::Detailed => {
            headers.extend(index.labels().iter().map(|label| label.position.clone()));
            matrix.rows.clone()
        }
    };

    TableView { headers, rows }
}

/// Serialize a projected table as UTF-8 comma-separated text: one header
/// row, then one row per student with the username first and numbers in
/// plain decimal form.
pub fn write_csv<W: std::io::Write>(view: &TableView, writer: W) -> anyhow::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(&view.headers)?;
    for row in &view.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.username.clone());
        record.extend(row.values.iter().map(|value| value.to_string()));
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}
