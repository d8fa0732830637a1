use std::collections::HashMap;
use std::ops::Range;

use anyhow::bail;

use crate::models::CourseTree;

/// Position label and display-name tooltip for one vertical column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLabel {
    pub position: String,
    pub tooltip: String,
}

#[derive(Debug, Clone)]
pub struct ChapterSpan {
    pub name: String,
    pub subtotal: usize,
}

/// Flat column index over a course tree, built once and read-only after.
///
/// Columns are numbered in traversal order (chapter-major, then sequential,
/// then vertical), so every chapter owns a contiguous column range and the
/// cumulative boundaries describe the whole matrix layout.
#[derive(Debug, Clone)]
pub struct CourseIndex {
    mapping: HashMap<String, usize>,
    labels: Vec<ColumnLabel>,
    chapters: Vec<ChapterSpan>,
    boundaries: Vec<usize>,
}

impl CourseIndex {
    pub fn build(tree: &CourseTree) -> anyhow::Result<Self> {
        let mut mapping = HashMap::new();
        let mut labels = Vec::new();
        let mut chapters = Vec::new();
        let mut boundaries: Vec<usize> = Vec::new();
        let mut next_column = 0usize;

        for (ch_idx, chapter) in tree.chapters.iter().enumerate() {
            let mut subtotal = 0usize;
            for (seq_idx, sequential) in chapter.sequentials.iter().enumerate() {
                for (vert_idx, vertical) in sequential.verticals.iter().enumerate() {
                    if vertical.vertical_id.is_empty() {
                        bail!(
                            "vertical {}.{}.{} in course {} has no identifier",
                            ch_idx + 1,
                            seq_idx + 1,
                            vert_idx + 1,
                            tree.id
                        );
                    }
                    if mapping
                        .insert(vertical.vertical_id.clone(), next_column)
                        .is_some()
                    {
                        bail!(
                            "duplicate vertical identifier {} in course {}",
                            vertical.vertical_id,
                            tree.id
                        );
                    }
                    labels.push(ColumnLabel {
                        position: format!("{}.{}.{}", ch_idx + 1, seq_idx + 1, vert_idx + 1),
                        tooltip: vertical.name.clone(),
                    });
                    next_column += 1;
                }
                subtotal += sequential.verticals.len();
            }
            boundaries.push(boundaries.last().copied().unwrap_or(0) + subtotal);
            chapters.push(ChapterSpan {
                name: chapter.name.clone(),
                subtotal,
            });
        }

        Ok(Self {
            mapping,
            labels,
            chapters,
            boundaries,
        })
    }

    pub fn column_of(&self, vertical_id: &str) -> Option<usize> {
        self.mapping.get(vertical_id).copied()
    }

    pub fn column_count(&self) -> usize {
        self.labels.len()
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// True when there are no leaf verticals, so nothing to aggregate.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[ColumnLabel] {
        &self.labels
    }

    pub fn chapters(&self) -> &[ChapterSpan] {
        &self.chapters
    }

    /// Half-open column range owned by chapter `k`.
    pub fn chapter_span(&self, k: usize) -> Range<usize> {
        let start = if k == 0 { 0 } else { self.boundaries[k - 1] };
        start..self.boundaries[k]
    }

    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chapter, Sequential, Vertical};

    fn vertical(id: &str, name: &str) -> Vertical {
        Vertical {
            vertical_id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn tree(chapters: Vec<Chapter>) -> CourseTree {
        CourseTree {
            id: "block-v1:Test+T101+2026".to_string(),
            name: "Test Course".to_string(),
            chapters,
        }
    }

    fn two_chapter_tree() -> CourseTree {
        tree(vec![
            Chapter {
                name: "Intro".to_string(),
                sequentials: vec![
                    Sequential {
                        name: "Week 1".to_string(),
                        verticals: vec![vertical("v1", "Welcome"), vertical("v2", "Syllabus")],
                    },
                    Sequential {
                        name: "Week 2".to_string(),
                        verticals: vec![vertical("v3", "Reading")],
                    },
                ],
            },
            Chapter {
                name: "Basics".to_string(),
                sequentials: vec![Sequential {
                    name: "Week 3".to_string(),
                    verticals: vec![vertical("v4", "Video"), vertical("v5", "Quiz")],
                }],
            },
        ])
    }

    #[test]
    fn columns_follow_traversal_order() {
        let index = CourseIndex::build(&two_chapter_tree()).unwrap();
        assert_eq!(index.column_count(), 5);
        for (expected, id) in ["v1", "v2", "v3", "v4", "v5"].iter().enumerate() {
            assert_eq!(index.column_of(id), Some(expected));
        }
        assert_eq!(index.column_of("v9"), None);
    }

    #[test]
    fn labels_use_one_based_positions() {
        let index = CourseIndex::build(&two_chapter_tree()).unwrap();
        let positions: Vec<&str> = index
            .labels()
            .iter()
            .map(|l| l.position.as_str())
            .collect();
        assert_eq!(positions, vec!["1.1.1", "1.1.2", "1.2.1", "2.1.1", "2.1.2"]);
        assert_eq!(index.labels()[0].tooltip, "Welcome");
    }

    #[test]
    fn boundaries_are_cumulative_and_close_at_column_count() {
        let index = CourseIndex::build(&two_chapter_tree()).unwrap();
        assert_eq!(index.boundaries(), &[3, 5]);
        assert_eq!(index.chapter_span(0), 0..3);
        assert_eq!(index.chapter_span(1), 3..5);
        assert_eq!(*index.boundaries().last().unwrap(), index.column_count());
    }

    #[test]
    fn childless_chapters_contribute_zero() {
        let course = tree(vec![
            Chapter {
                name: "Empty".to_string(),
                sequentials: vec![Sequential {
                    name: "Nothing yet".to_string(),
                    verticals: vec![],
                }],
            },
            Chapter {
                name: "Content".to_string(),
                sequentials: vec![Sequential {
                    name: "Week 1".to_string(),
                    verticals: vec![vertical("v1", "Welcome")],
                }],
            },
        ]);
        let index = CourseIndex::build(&course).unwrap();
        assert_eq!(index.boundaries(), &[0, 1]);
        assert_eq!(index.chapter_span(0), 0..0);
        assert_eq!(index.chapters()[0].subtotal, 0);
    }

    #[test]
    fn empty_tree_yields_zero_columns() {
        let index = CourseIndex::build(&tree(vec![])).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.column_count(), 0);
        assert_eq!(index.chapter_count(), 0);
    }

    #[test]
    fn missing_identifier_is_rejected() {
        let course = tree(vec![Chapter {
            name: "Intro".to_string(),
            sequentials: vec![Sequential {
                name: "Week 1".to_string(),
                verticals: vec![vertical("", "Welcome")],
            }],
        }]);
        let err = CourseIndex::build(&course).unwrap_err();
        assert!(err.to_string().contains("has no identifier"));
    }

    #[test]
    fn duplicate_identifier_is_rejected() {
        let course = tree(vec![Chapter {
            name: "Intro".to_string(),
            sequentials: vec![Sequential {
                name: "Week 1".to_string(),
                verticals: vec![vertical("v1", "Welcome"), vertical("v1", "Again")],
            }],
        }]);
        let err = CourseIndex::build(&course).unwrap_err();
        assert!(err.to_string().contains("duplicate vertical identifier"));
    }
}
