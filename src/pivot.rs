use std::collections::HashMap;

use crate::models::{UserMatrix, UserRow, VisitRecord};
use crate::structure::CourseIndex;

/// Spread sparse visit records into one dense row per student.
///
/// Students keep the order in which they first appear in the record set.
/// Records for verticals outside the index are dropped, but the student row
/// they introduced stays, so a student whose only record is stale still
/// shows up with an all-zero vector. A later record for the same
/// (student, vertical) pair overwrites the earlier value, never adds to it;
/// the store's windowed sum query does not emit such duplicates.
pub fn densify(records: &[VisitRecord], index: &CourseIndex) -> UserMatrix {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<UserRow> = Vec::new();

    for record in records {
        let row = match seen.get(&record.username) {
            Some(&at) => at,
            None => {
                seen.insert(record.username.clone(), rows.len());
                rows.push(UserRow {
                    username: record.username.clone(),
                    values: vec![0.0; index.column_count()],
                });
                rows.len() - 1
            }
        };

        if let Some(column) = index.column_of(&record.vertical_id) {
            rows[row].values[column] = record.total;
        }
    }

    UserMatrix { rows }
}

/// Roll each student's vector up into one subtotal per chapter.
///
/// Chapter spans partition the columns, so every row's subtotals sum to the
/// same value as the source vector.
pub fn rollup(matrix: &UserMatrix, index: &CourseIndex) -> UserMatrix {
    let rows = matrix
        .rows
        .iter()
        .map(|row| UserRow {
            username: row.username.clone(),
            values: (0..index.chapter_count())
                .map(|k| index.chapter_span(k).map(|column| row.values[column]).sum())
                .collect(),
        })
        .collect();

    UserMatrix { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chapter, CourseTree, Sequential, Vertical};

    fn record(username: &str, vertical_id: &str, total: f64) -> VisitRecord {
        VisitRecord {
            username: username.to_string(),
            vertical_id: vertical_id.to_string(),
            total,
        }
    }

    fn chapter(name: &str, verticals: &[(&str, &str)]) -> Chapter {
        Chapter {
            name: name.to_string(),
            sequentials: vec![Sequential {
                name: format!("{name} week"),
                verticals: verticals
                    .iter()
                    .map(|(id, title)| Vertical {
                        vertical_id: id.to_string(),
                        name: title.to_string(),
                    })
                    .collect(),
            }],
        }
    }

    fn index_for(chapters: Vec<Chapter>) -> CourseIndex {
        CourseIndex::build(&CourseTree {
            id: "block-v1:Test+T101+2026".to_string(),
            name: "Test Course".to_string(),
            chapters,
        })
        .unwrap()
    }

    fn small_index() -> CourseIndex {
        index_for(vec![chapter("Intro", &[("v1", "Welcome"), ("v2", "Syllabus")])])
    }

    #[test]
    fn densify_aligns_records_to_columns() {
        let index = small_index();
        let records = vec![
            record("alice", "v1", 3.0),
            record("alice", "v2", 5.0),
            record("bob", "v1", 0.0),
        ];

        let matrix = densify(&records, &index);
        assert_eq!(matrix.student_count(), 2);
        assert_eq!(matrix.rows[0].username, "alice");
        assert_eq!(matrix.rows[0].values, vec![3.0, 5.0]);
        assert_eq!(matrix.rows[1].username, "bob");
        assert_eq!(matrix.rows[1].values, vec![0.0, 0.0]);
    }

    #[test]
    fn unmapped_vertical_keeps_student_with_zero_vector() {
        let index = small_index();
        let records = vec![record("carol", "v9", 7.0)];

        let matrix = densify(&records, &index);
        assert_eq!(matrix.student_count(), 1);
        assert_eq!(matrix.rows[0].username, "carol");
        assert_eq!(matrix.rows[0].values, vec![0.0, 0.0]);
    }

    #[test]
    fn duplicate_records_overwrite_in_input_order() {
        let index = small_index();
        let records = vec![record("alice", "v1", 3.0), record("alice", "v1", 8.0)];

        let matrix = densify(&records, &index);
        // Assignment, not accumulation: 8, never 11.
        assert_eq!(matrix.rows[0].values, vec![8.0, 0.0]);
    }

    #[test]
    fn students_keep_first_seen_order() {
        let index = small_index();
        let records = vec![
            record("zoe", "v2", 1.0),
            record("alice", "v1", 2.0),
            record("zoe", "v1", 4.0),
        ];

        let matrix = densify(&records, &index);
        let usernames: Vec<&str> = matrix.rows.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(usernames, vec!["zoe", "alice"]);
        assert_eq!(matrix.rows[0].values, vec![4.0, 1.0]);
    }

    #[test]
    fn rollup_sums_each_boundary_span() {
        let index = index_for(vec![
            chapter("Intro", &[("v1", "a"), ("v2", "b")]),
            chapter("Basics", &[("v3", "c"), ("v4", "d"), ("v5", "e")]),
        ]);
        assert_eq!(index.boundaries(), &[2, 5]);

        let matrix = UserMatrix {
            rows: vec![UserRow {
                username: "alice".to_string(),
                values: vec![1.0, 2.0, 3.0, 4.0, 5.0],
            }],
        };

        let rolled = rollup(&matrix, &index);
        assert_eq!(rolled.rows[0].values, vec![3.0, 12.0]);
    }

    #[test]
    fn rollup_preserves_each_students_total() {
        let index = index_for(vec![
            chapter("Intro", &[("v1", "a"), ("v2", "b")]),
            chapter("Basics", &[("v3", "c")]),
        ]);
        let records = vec![
            record("alice", "v1", 3.0),
            record("alice", "v3", 2.5),
            record("bob", "v2", 4.0),
        ];

        let matrix = densify(&records, &index);
        let rolled = rollup(&matrix, &index);
        for (row, chapter_row) in matrix.rows.iter().zip(&rolled.rows) {
            let flat: f64 = row.values.iter().sum();
            let grouped: f64 = chapter_row.values.iter().sum();
            assert!((flat - grouped).abs() < 1e-9);
            assert_eq!(chapter_row.values.len(), index.chapter_count());
        }
    }

    #[test]
    fn empty_record_set_yields_empty_matrix() {
        let index = small_index();
        let matrix = densify(&[], &index);
        assert_eq!(matrix.student_count(), 0);
        assert_eq!(rollup(&matrix, &index).student_count(), 0);
    }
}
