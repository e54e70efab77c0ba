use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Topic;

/// The fixed arrangement of an answer sheet: how many bubble rows it has,
/// how marks map onto questions, and which topic each question belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridLayout {
    pub rows: u32,
    pub columns: u32,
    /// Answer choices per mark, read left to right as `A`, `B`, ...
    pub choices: u32,
    pub topics: Vec<Topic>,
    pub questions_per_topic: u32,
    /// Marks past this many are ignored. Deliberately independent of
    /// `rows * columns`.
    pub mark_cap: u32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            rows: 20,
            columns: 4,
            choices: 4,
            topics: ["PYTHON", "DATA ANALYSIS", "MySQL", "POWER BI", "Adv STATS"]
                .into_iter()
                .map(Topic::from)
                .collect(),
            questions_per_topic: 20,
            mark_cap: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout field `{0}` must be greater than zero")]
    Zero(&'static str),
    #[error("layout has {0} choices but at most 26 (A-Z) are supported")]
    TooManyChoices(u32),
    #[error("layout has no topics")]
    NoTopics,
    #[error("topic {0} is listed more than once")]
    DuplicateTopic(Topic),
    #[error("mark cap {mark_cap} exceeds the {question_count} questions covered by topics")]
    MarkCapExceedsTopics { mark_cap: u32, question_count: u32 },
}

impl GridLayout {
    pub fn validate(&self) -> Result<(), LayoutError> {
        for (name, value) in [
            ("rows", self.rows),
            ("columns", self.columns),
            ("choices", self.choices),
            ("questionsPerTopic", self.questions_per_topic),
        ] {
            if value == 0 {
                return Err(LayoutError::Zero(name));
            }
        }

        if self.choices > 26 {
            return Err(LayoutError::TooManyChoices(self.choices));
        }

        if self.topics.is_empty() {
            return Err(LayoutError::NoTopics);
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = self.topics.iter().find(|topic| !seen.insert(*topic)) {
            return Err(LayoutError::DuplicateTopic(duplicate.clone()));
        }

        let question_count = self.question_count();
        if self.mark_cap > question_count {
            return Err(LayoutError::MarkCapExceedsTopics {
                mark_cap: self.mark_cap,
                question_count,
            });
        }

        Ok(())
    }

    /// Number of grid cells, `rows * columns`.
    pub fn capacity(&self) -> u32 {
        self.rows * self.columns
    }

    /// Number of questions covered by the topic blocks.
    pub fn question_count(&self) -> u32 {
        self.topics.len() as u32 * self.questions_per_topic
    }

    /// Maps the `index`th ordered mark to its 1-based question number,
    /// treating marks as filling the grid row by row.
    pub fn question_number(&self, index: u32) -> u32 {
        let row = index / self.columns;
        let column = index % self.columns;
        row * self.columns + column + 1
    }

    pub fn topic_for(&self, question: u32) -> Option<&Topic> {
        if question == 0 {
            return None;
        }
        self.topics
            .get(((question - 1) / self.questions_per_topic) as usize)
    }
}

/// How detected marks are put in order before they are numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkOrdering {
    /// Sort by the left edge of each mark only. Works for sheets whose
    /// contour order already follows the grid.
    #[default]
    LeftToRight,

    /// Group marks into rows by their vertical position, then read each row
    /// left to right.
    RowMajor,
}
