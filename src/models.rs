use serde::Deserialize;

/// Course structure snapshot as recovered from the LMS: three fixed levels,
/// chapter -> sequential -> vertical, with visits recorded on the verticals.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseTree {
    pub id: String,
    pub name: String,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chapter {
    pub name: String,
    pub sequentials: Vec<Sequential>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sequential {
    pub name: String,
    pub verticals: Vec<Vertical>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vertical {
    pub vertical_id: String,
    pub name: String,
}

/// One aggregated engagement value for a student on a vertical, already
/// summed over the requested date window by the store.
#[derive(Debug, Clone)]
pub struct VisitRecord {
    pub username: String,
    pub vertical_id: String,
    pub total: f64,
}

/// A student's dense value vector, aligned to the course index columns.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub username: String,
    pub values: Vec<f64>,
}

/// Per-student rows in first-seen order; no username appears twice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserMatrix {
    pub rows: Vec<UserRow>,
}

impl UserMatrix {
    pub fn student_count(&self) -> usize {
        self.rows.len()
    }
}

/// Engagement summary for one vertical column across the whole cohort.
#[derive(Debug, Clone)]
pub struct VerticalUsage {
    pub position: String,
    pub tooltip: String,
    pub total: f64,
    pub students: usize,
}

/// Engagement summary for one chapter group across the whole cohort.
#[derive(Debug, Clone)]
pub struct ChapterUsage {
    pub name: String,
    pub total: f64,
    pub students: usize,
}
