use std::fmt;

use serde::Serialize;

/// Letters used to label options in chat messages and on buttons.
pub const OPTION_LABELS: [char; 4] = ['A', 'B', 'C', 'D'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: usize,
    text: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: String,
}

/// One recorded choice. Created once per question and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    question_id: usize,
    selected: String,
    is_correct: bool,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.text())?;
        for (label, option) in OPTION_LABELS.iter().zip(self.options()) {
            writeln!(f, "{}) {}", label, option)?;
        }
        Ok(())
    }
}

impl Question {
    pub fn new(
        id: usize,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            options,
            correct_answer: correct_answer.into(),
            explanation: explanation.into(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn option(&self, idx: usize) -> Option<&str> {
        self.options.get(idx).map(String::as_str)
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn is_correct(&self, selected: &str) -> bool {
        selected == self.correct_answer
    }
}

impl AnswerRecord {
    /// Grades `selected` against `question` at the moment of recording.
    pub fn grade(question: &Question, selected: impl Into<String>) -> Self {
        let selected = selected.into();
        Self {
            question_id: question.id(),
            is_correct: question.is_correct(&selected),
            selected,
        }
    }

    pub fn question_id(&self) -> usize {
        self.question_id
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}
