//! Quiz session state machine.
//!
//! ```text
//! Idle ─start─▶ Loading ─load_succeeded─▶ InProgress ─advance on last─▶ Finished
//!                 │    ▲                   answer, advance                 │
//!            load_failed └─ start                                          │
//!                 ▼                                                        │
//!              Errored ─restart─▶ Idle ◀──────────────restart──────────────┘
//! ```
//!
//! Every `start` mints a [`RequestToken`]. Load results carry the token they
//! were requested with and are dropped when it is no longer the pending one.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    question::{AnswerRecord, Question},
    source::validate_batch,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    InProgress,
    Errored,
    Finished,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Idle => "idle",
            Status::Loading => "loading",
            Status::InProgress => "in progress",
            Status::Errored => "errored",
            Status::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Identifies one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestToken(Uuid);

impl RequestToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A caller asked for a transition the session cannot take. State is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    #[error("question #{} has already been answered", .0 + 1)]
    AlreadyAnswered(usize),
    #[error("question #{} has not been answered yet", .0 + 1)]
    NotAnswered(usize),
    #[error("'{0}' is not an option of the current question")]
    UnknownOption(String),
    #[error("question #{} is no longer the current question", .0 + 1)]
    NotCurrent(usize),
    #[error("cannot {operation} while the session is {status}")]
    InvalidState {
        operation: &'static str,
        status: Status,
    },
}

/// Owned copy of everything the presentation layer observes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub status: Status,
    pub topic: String,
    pub questions: Vec<Question>,
    pub current_index: usize,
    pub score: usize,
    pub answers: Vec<AnswerRecord>,
    pub error_message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizSession {
    status: Status,
    topic: String,
    questions: Vec<Question>,
    current_index: usize,
    score: usize,
    answers: Vec<AnswerRecord>,
    error_message: String,
    pending: Option<RequestToken>,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins generation for `topic`, discarding any previous attempt.
    ///
    /// Accepted from every status except `InProgress`. Calling it while
    /// `Loading` supersedes the in-flight request.
    pub fn start(&mut self, topic: impl Into<String>) -> Result<RequestToken, SequenceError> {
        self.expect_not("start", Status::InProgress)?;

        let token = RequestToken::new();
        if let Some(previous) = self.pending {
            debug!("Request {} superseded by {}", previous, token);
        }

        *self = Self {
            status: Status::Loading,
            topic: topic.into(),
            pending: Some(token),
            ..Self::default()
        };
        info!("Generating quiz about '{}' ({})", self.topic, token);

        Ok(token)
    }

    /// Applies a generated batch. Returns `false` if `token` is stale and the
    /// batch was discarded.
    ///
    /// A batch containing a malformed question moves the session to `Errored`.
    pub fn load_succeeded(&mut self, token: RequestToken, questions: Vec<Question>) -> bool {
        if !self.is_pending(token) {
            return false;
        }
        self.pending = None;

        match validate_batch(questions) {
            Ok(questions) => {
                info!("Quiz about '{}' ready: {} questions", self.topic, questions.len());
                self.questions = questions;
                self.current_index = 0;
                self.score = 0;
                self.answers.clear();
                self.status = Status::InProgress;
            }
            Err(e) => {
                warn!("Rejected generated batch for '{}': {}", self.topic, e);
                self.error_message = e.to_string();
                self.status = Status::Errored;
            }
        }
        true
    }

    /// Records a generation failure. Returns `false` if `token` is stale.
    pub fn load_failed(&mut self, token: RequestToken, message: impl Into<String>) -> bool {
        if !self.is_pending(token) {
            return false;
        }
        self.pending = None;
        self.error_message = message.into();
        self.status = Status::Errored;
        warn!("Generation for '{}' failed: {}", self.topic, self.error_message);
        true
    }

    /// Records `selected` as the answer to the current question.
    pub fn answer(&mut self, selected: &str) -> Result<&AnswerRecord, SequenceError> {
        self.expect("answer", Status::InProgress)?;

        if self.answers.len() > self.current_index {
            return Err(SequenceError::AlreadyAnswered(self.current_index));
        }

        let question = &self.questions[self.current_index];
        if !question.options().iter().any(|o| o == selected) {
            return Err(SequenceError::UnknownOption(selected.to_owned()));
        }

        let record = AnswerRecord::grade(question, selected);
        if record.is_correct() {
            self.score += 1;
        }
        debug!(
            "Question #{} answered '{}', correct: {}",
            self.current_index + 1,
            selected,
            record.is_correct()
        );
        self.answers.push(record);

        Ok(&self.answers[self.current_index])
    }

    /// Moves past the answered current question; returns the new status.
    pub fn advance(&mut self) -> Result<Status, SequenceError> {
        self.expect("advance", Status::InProgress)?;

        if self.answers.len() <= self.current_index {
            return Err(SequenceError::NotAnswered(self.current_index));
        }

        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
        } else {
            self.status = Status::Finished;
            info!(
                "Quiz about '{}' finished: {}/{}",
                self.topic,
                self.score,
                self.questions.len()
            );
        }

        Ok(self.status)
    }

    /// Returns to `Idle` from `Errored` or `Finished`.
    pub fn restart(&mut self) -> Result<(), SequenceError> {
        match self.status {
            Status::Errored | Status::Finished => {
                *self = Self::default();
                Ok(())
            }
            status => Err(SequenceError::InvalidState {
                operation: "restart",
                status,
            }),
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.status {
            Status::InProgress => self.questions.get(self.current_index),
            _ => None,
        }
    }

    /// The record for the current question, once it has been answered.
    pub fn current_answer(&self) -> Option<&AnswerRecord> {
        match self.status {
            Status::InProgress => self.answers.get(self.current_index),
            _ => None,
        }
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn answer_for(&self, question_id: usize) -> Option<&AnswerRecord> {
        self.answers.iter().find(|a| a.question_id() == question_id)
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn pending_request(&self) -> Option<RequestToken> {
        self.pending
    }

    /// Score as a whole percentage of the question count, rounded half up.
    pub fn percentage(&self) -> usize {
        let total = self.questions.len();
        if total == 0 {
            return 0;
        }
        (self.score * 200 + total) / (2 * total)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status,
            topic: self.topic.clone(),
            questions: self.questions.clone(),
            current_index: self.current_index,
            score: self.score,
            answers: self.answers.clone(),
            error_message: self.error_message.clone(),
        }
    }

    fn is_pending(&self, token: RequestToken) -> bool {
        let pending = self.status == Status::Loading && self.pending == Some(token);
        if !pending {
            debug!("Discarding stale result for request {}", token);
        }
        pending
    }

    fn expect(&self, operation: &'static str, status: Status) -> Result<(), SequenceError> {
        if self.status == status {
            Ok(())
        } else {
            Err(SequenceError::InvalidState {
                operation,
                status: self.status,
            })
        }
    }

    fn expect_not(&self, operation: &'static str, status: Status) -> Result<(), SequenceError> {
        if self.status == status {
            Err(SequenceError::InvalidState {
                operation,
                status: self.status,
            })
        } else {
            Ok(())
        }
    }
}
