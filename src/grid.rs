use log::{debug, warn};
use logging_timer::time;
use thiserror::Error;

use crate::layout::{GridLayout, MarkOrdering};
use crate::marks::MarkShape;
use crate::types::Topic;

/// The question a mark answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSlot {
    /// Position of the mark after ordering, starting at 0.
    pub index: u32,
    pub question: u32,
    pub topic: Topic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappedMark {
    pub slot: GridSlot,
    pub mark: MarkShape,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradingError {
    #[error("question {question} has no entry in the answer key, which holds {key_len} answers")]
    QuestionOutOfRange { question: u32, key_len: usize },
    #[error("question {question} falls outside every topic block")]
    NoTopicForQuestion { question: u32 },
}

/// Groups marks into rows by centroid height, then reads each row left to
/// right. A mark joins the current row when its centroid is within half the
/// median mark height of the row's first mark.
pub fn order_row_major(marks: &[MarkShape]) -> Vec<MarkShape> {
    if marks.is_empty() {
        return vec![];
    }

    let mut heights = marks.iter().map(|m| m.bounds.height()).collect::<Vec<u32>>();
    heights.sort_unstable();
    let tolerance = (heights[heights.len() / 2] as f64 / 2.0).max(1.0);

    let mut by_height = marks.to_vec();
    by_height.sort_by(|a, b| a.centroid.y.total_cmp(&b.centroid.y));

    let mut rows: Vec<Vec<MarkShape>> = vec![];
    for mark in by_height {
        match rows.last_mut() {
            Some(row) if mark.centroid.y - row[0].centroid.y <= tolerance => row.push(mark),
            _ => rows.push(vec![mark]),
        }
    }

    debug!("grouped {} marks into {} rows", marks.len(), rows.len());

    rows.into_iter()
        .flat_map(|mut row| {
            row.sort_by(|a, b| a.centroid.x.total_cmp(&b.centroid.x));
            row
        })
        .collect()
}

/// Numbers the marks in reading order and assigns each its topic. Only the
/// first `mark_cap` marks are mapped.
#[time]
pub fn map_marks(
    marks: &[MarkShape],
    layout: &GridLayout,
    ordering: MarkOrdering,
) -> Result<Vec<MappedMark>, GradingError> {
    let ordered = match ordering {
        MarkOrdering::LeftToRight => marks.to_vec(),
        MarkOrdering::RowMajor => order_row_major(marks),
    };

    if ordered.len() as u32 != layout.capacity() {
        warn!(
            "found {} marks but the grid has {} cells",
            ordered.len(),
            layout.capacity()
        );
    }
    if ordered.len() as u32 > layout.mark_cap {
        warn!(
            "ignoring {} marks past the cap of {}",
            ordered.len() as u32 - layout.mark_cap,
            layout.mark_cap
        );
    }

    ordered
        .into_iter()
        .take(layout.mark_cap as usize)
        .enumerate()
        .map(|(index, mark)| {
            let index = index as u32;
            let question = layout.question_number(index);
            let topic = layout
                .topic_for(question)
                .ok_or(GradingError::NoTopicForQuestion { question })?
                .clone();
            Ok(MappedMark {
                slot: GridSlot {
                    index,
                    question,
                    topic,
                },
                mark,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::{point::Point, rect::Rect};
    use std::collections::HashSet;

    fn mark_at(x: i32, y: i32) -> MarkShape {
        let bounds = Rect::at(x, y).of_size(40, 20);
        MarkShape {
            area: 741.0,
            bounds,
            centroid: Point::new(x as f64 + 19.5, y as f64 + 9.5),
        }
    }

    fn grid_marks(rows: i32, columns: i32) -> Vec<MarkShape> {
        let mut marks = vec![];
        for row in 0..rows {
            for column in 0..columns {
                marks.push(mark_at(20 + column * 80, 20 + row * 40));
            }
        }
        marks
    }

    #[test]
    fn test_map_marks_empty() {
        let mapped = map_marks(&[], &GridLayout::default(), MarkOrdering::LeftToRight).unwrap();
        assert!(mapped.is_empty());
    }

    #[test]
    fn test_map_marks_assigns_questions_and_topics() {
        let marks = grid_marks(20, 4);
        let mapped = map_marks(&marks, &GridLayout::default(), MarkOrdering::LeftToRight).unwrap();
        assert_eq!(mapped.len(), 80);

        let questions: Vec<u32> = mapped.iter().map(|m| m.slot.question).collect();
        assert_eq!(questions, (1..=80).collect::<Vec<u32>>());
        assert_eq!(mapped[0].slot.topic.as_str(), "PYTHON");
        assert_eq!(mapped[19].slot.topic.as_str(), "PYTHON");
        assert_eq!(mapped[20].slot.topic.as_str(), "DATA ANALYSIS");
        assert_eq!(mapped[79].slot.topic.as_str(), "POWER BI");
    }

    #[test]
    fn test_map_marks_respects_cap() {
        let marks = grid_marks(50, 3);
        assert_eq!(marks.len(), 150);

        let mapped = map_marks(&marks, &GridLayout::default(), MarkOrdering::LeftToRight).unwrap();
        assert_eq!(mapped.len(), 100);
        assert_eq!(mapped.last().map(|m| m.slot.question), Some(100));
        assert_eq!(mapped.last().map(|m| m.mark.clone()), Some(marks[99].clone()));

        let unique: HashSet<u32> = mapped.iter().map(|m| m.slot.question).collect();
        assert_eq!(unique.len(), 100);
    }

    #[test]
    fn test_map_marks_reports_missing_topic() {
        let layout = GridLayout {
            topics: vec![Topic::from("ONLY")],
            questions_per_topic: 2,
            ..GridLayout::default()
        };
        let marks = grid_marks(1, 3);
        assert_eq!(
            map_marks(&marks, &layout, MarkOrdering::LeftToRight),
            Err(GradingError::NoTopicForQuestion { question: 3 })
        );
    }

    #[test]
    fn test_row_major_reads_rows_first() {
        // Detector order: sorted by left edge only.
        let mut marks = grid_marks(2, 2);
        marks.sort_by_key(|m| m.bounds.left());
        let tops_left: Vec<(i32, i32)> = marks
            .iter()
            .map(|m| (m.bounds.left(), m.bounds.top()))
            .collect();
        assert_eq!(tops_left, vec![(20, 20), (20, 60), (100, 20), (100, 60)]);

        let ordered: Vec<(i32, i32)> = order_row_major(&marks)
            .iter()
            .map(|m| (m.bounds.left(), m.bounds.top()))
            .collect();
        assert_eq!(ordered, vec![(20, 20), (100, 20), (20, 60), (100, 60)]);
    }

    #[test]
    fn test_row_major_tolerates_slight_skew() {
        let marks = vec![mark_at(100, 23), mark_at(20, 20), mark_at(100, 61), mark_at(20, 58)];
        let ordered: Vec<(i32, i32)> = order_row_major(&marks)
            .iter()
            .map(|m| (m.bounds.left(), m.bounds.top()))
            .collect();
        assert_eq!(ordered, vec![(20, 20), (100, 23), (20, 58), (100, 61)]);
    }
}
