use std::collections::BTreeMap;

use serde::Serialize;

use crate::answer_key::AnswerKey;
use crate::grid::GradingError;
use crate::layout::GridLayout;
use crate::types::{Choice, Topic};

/// The choice read from one question's mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BubbleAnswer {
    pub topic: Topic,
    pub answer: Choice,
}

/// Detected answers keyed by question number.
pub type BubbleAnswers = BTreeMap<u32, BubbleAnswer>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicScore {
    pub topic: Topic,
    pub correct: u32,
}

/// Correct answers per topic. Every topic of the layout is listed, in layout
/// order, including those with nothing correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreResult {
    pub topics: Vec<TopicScore>,
    pub total: u32,
}

impl ScoreResult {
    fn new(topics: Vec<TopicScore>) -> Self {
        let total = topics.iter().map(|t| t.correct).sum();
        Self { topics, total }
    }

    pub fn correct_for(&self, topic: &Topic) -> Option<u32> {
        self.topics
            .iter()
            .find(|t| &t.topic == topic)
            .map(|t| t.correct)
    }
}

/// Counts the detected answers that match the key. The key is compared
/// as written against the lower-cased detected letter.
pub fn score_answers(
    answers: &BubbleAnswers,
    key: &AnswerKey,
    layout: &GridLayout,
) -> Result<ScoreResult, GradingError> {
    let mut counts = layout
        .topics
        .iter()
        .map(|topic| (topic, 0u32))
        .collect::<BTreeMap<&Topic, u32>>();

    for (&question, detected) in answers {
        let expected = key
            .answer_for(question)
            .ok_or(GradingError::QuestionOutOfRange {
                question,
                key_len: key.len(),
            })?;
        if expected == detected.answer.letter().to_lowercase().to_string() {
            let count = counts
                .get_mut(&detected.topic)
                .ok_or(GradingError::NoTopicForQuestion { question })?;
            *count += 1;
        }
    }

    Ok(ScoreResult::new(
        layout
            .topics
            .iter()
            .map(|topic| TopicScore {
                topic: topic.clone(),
                correct: counts.get(topic).copied().unwrap_or(0),
            })
            .collect(),
    ))
}
