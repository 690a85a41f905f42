//! Question generation boundary.
//!
//! A [`QuestionSource`] turns a topic into an ordered batch of questions or
//! fails as a whole. The payload handling shared by every source lives here:
//! [`parse_questions`] turns raw JSON text into questions with positional ids,
//! and [`validate_batch`] rejects batches containing unanswerable questions.

use std::{collections::HashSet, future::Future};

use serde::Deserialize;
use thiserror::Error;

use crate::question::Question;

pub mod gemini;

pub use gemini::GeminiSource;

/// Number of questions requested per quiz.
pub const QUESTIONS_PER_QUIZ: usize = 10;
/// Number of options every question must carry.
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service returned no text")]
    EmptyResponse,
    #[error("failed to parse generated questions: {0}")]
    ParseFailure(String),
    #[error("generation service returned no questions")]
    NoQuestions,
    #[error("question #{} is malformed: {reason}", .index + 1)]
    MalformedQuestion { index: usize, reason: Malformed },
    #[error("request to generation service failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// `body` is kept for logs; it is not part of the message.
    #[error("generation service answered HTTP {status}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Malformed {
    #[error("question text is empty")]
    EmptyText,
    #[error("expected 4 options, got {0}")]
    OptionCount(usize),
    #[error("options are not distinct")]
    DuplicateOptions,
    #[error("correct answer '{0}' is not one of the options")]
    CorrectAnswerMissing(String),
}

pub trait QuestionSource: Send + Sync {
    /// Requests one batch of questions about `topic`. Never retries.
    fn generate(
        &self,
        topic: &str,
    ) -> impl Future<Output = Result<Vec<Question>, GenerationError>> + Send;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    text: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: String,
}

/// Parses a generation payload into questions.
///
/// Ids are assigned from array position, ignoring any id the payload carries.
pub fn parse_questions(payload: Option<&str>) -> Result<Vec<Question>, GenerationError> {
    let payload = match payload {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(GenerationError::EmptyResponse),
    };

    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| GenerationError::ParseFailure(e.to_string()))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        other => {
            return Err(GenerationError::ParseFailure(format!(
                "expected a JSON array, found {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(id, item)| {
            let raw: RawQuestion = serde_json::from_value(item).map_err(|e| {
                GenerationError::ParseFailure(format!("question #{}: {}", id + 1, e))
            })?;
            Ok(Question::new(
                id,
                raw.text,
                raw.options,
                raw.correct_answer,
                raw.explanation,
            ))
        })
        .collect()
}

/// Rejects the whole batch if any question cannot be answered as posed.
pub fn validate_batch(questions: Vec<Question>) -> Result<Vec<Question>, GenerationError> {
    if questions.is_empty() {
        return Err(GenerationError::NoQuestions);
    }

    for (index, question) in questions.iter().enumerate() {
        check_question(question)
            .map_err(|reason| GenerationError::MalformedQuestion { index, reason })?;
    }

    Ok(questions)
}

fn check_question(question: &Question) -> Result<(), Malformed> {
    if question.text().trim().is_empty() {
        return Err(Malformed::EmptyText);
    }

    let options = question.options();
    if options.len() != OPTIONS_PER_QUESTION {
        return Err(Malformed::OptionCount(options.len()));
    }

    let distinct: HashSet<&str> = options.iter().map(String::as_str).collect();
    if distinct.len() != options.len() {
        return Err(Malformed::DuplicateOptions);
    }

    if !distinct.contains(question.correct_answer()) {
        return Err(Malformed::CorrectAnswerMissing(
            question.correct_answer().to_owned(),
        ));
    }

    Ok(())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn options(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("  \n"))]
    fn missing_payload_is_empty_response(#[case] payload: Option<&str>) {
        assert!(matches!(
            parse_questions(payload),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[rstest]
    #[case("not json at all")]
    #[case(r#"{"text": "an object, not an array"}"#)]
    #[case("42")]
    #[case(r#"[{"text": "no options"}]"#)]
    fn unusable_payload_is_parse_failure(#[case] payload: &str) {
        assert!(matches!(
            parse_questions(Some(payload)),
            Err(GenerationError::ParseFailure(_))
        ));
    }

    #[test]
    fn ids_follow_array_position() {
        let payload = r#"[
            {"id": 99, "text": "First?", "options": ["a","b","c","d"], "correctAnswer": "a", "explanation": "x"},
            {"id": 99, "text": "Second?", "options": ["a","b","c","d"], "correctAnswer": "d", "explanation": "y"}
        ]"#;

        let questions = parse_questions(Some(payload)).unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id(), 0);
        assert_eq!(questions[1].id(), 1);
        assert_eq!(questions[1].correct_answer(), "d");
        assert_eq!(questions[1].explanation(), "y");
    }

    #[test]
    fn parsing_does_not_validate_shape() {
        let payload = r#"[{"text": "Two options?", "options": ["a","b"], "correctAnswer": "z", "explanation": ""}]"#;

        let questions = parse_questions(Some(payload)).unwrap();

        assert_eq!(questions[0].options().len(), 2);
    }

    #[test]
    fn valid_batch_passes_through() {
        let batch = vec![Question::new(0, "Q", options(&["a", "b", "c", "d"]), "c", "")];

        assert_eq!(validate_batch(batch.clone()).unwrap(), batch);
    }

    #[test]
    fn api_error_message_leaves_out_the_body() {
        let error = GenerationError::Api {
            status: 403,
            body: "{\"error\": \"".to_owned() + &"detail ".repeat(2000) + "\"}",
        };

        assert_eq!(error.to_string(), "generation service answered HTTP 403");
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(
            validate_batch(Vec::new()),
            Err(GenerationError::NoQuestions)
        ));
    }

    #[rstest]
    #[case(Question::new(1, " ", options(&["a", "b", "c", "d"]), "a", ""), Malformed::EmptyText)]
    #[case(Question::new(1, "Q", options(&["a", "b", "c"]), "a", ""), Malformed::OptionCount(3))]
    #[case(Question::new(1, "Q", options(&["a", "b", "c", "d", "e"]), "a", ""), Malformed::OptionCount(5))]
    #[case(Question::new(1, "Q", options(&["a", "a", "c", "d"]), "a", ""), Malformed::DuplicateOptions)]
    #[case(Question::new(1, "Q", options(&["a", "b", "c", "d"]), "e", ""), Malformed::CorrectAnswerMissing("e".into()))]
    fn one_bad_question_rejects_the_batch(#[case] bad: Question, #[case] expected: Malformed) {
        let good = Question::new(0, "Q", options(&["a", "b", "c", "d"]), "a", "");

        match validate_batch(vec![good, bad]) {
            Err(GenerationError::MalformedQuestion { index, reason }) => {
                assert_eq!(index, 1);
                assert_eq!(reason, expected);
            }
            other => panic!("expected a malformed question, got {:?}", other),
        }
    }
}
