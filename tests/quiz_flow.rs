//! End-to-end quiz sessions driven by in-process question sources.

use std::{sync::Arc, time::Duration};

use rstest::rstest;
use tokio::sync::Mutex;
use topicquizbot::{
    question::Question,
    session::{QuizSession, SequenceError, Status},
    source::{parse_questions, GenerationError, QuestionSource, QUESTIONS_PER_QUIZ},
};

/// Answers every topic with the same payload after an optional delay.
struct ScriptedSource {
    payload: Option<String>,
    delay: Duration,
}

impl ScriptedSource {
    fn returning(payload: impl Into<String>) -> Self {
        Self {
            payload: Some(payload.into()),
            delay: Duration::ZERO,
        }
    }

    fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl QuestionSource for ScriptedSource {
    async fn generate(&self, _topic: &str) -> Result<Vec<Question>, GenerationError> {
        tokio::time::sleep(self.delay).await;
        parse_questions(self.payload.as_deref())
    }
}

fn payload(count: usize) -> String {
    let items: Vec<String> = (0..count)
        .map(|n| {
            format!(
                r#"{{"text": "Question {n}?", "options": ["A{n}", "B{n}", "C{n}", "D{n}"], "correctAnswer": "B{n}", "explanation": "B{n} is right."}}"#
            )
        })
        .collect();
    format!("[{}]", items.join(","))
}

async fn run<S: QuestionSource>(session: &mut QuizSession, source: &S, topic: &str) {
    let token = session.start(topic).unwrap();
    assert_eq!(session.status(), Status::Loading);
    match source.generate(topic).await {
        Ok(questions) => assert!(session.load_succeeded(token, questions)),
        Err(e) => assert!(session.load_failed(token, e.to_string())),
    }
}

#[tokio::test]
async fn perfect_run_scores_every_question() {
    let source = ScriptedSource::returning(payload(QUESTIONS_PER_QUIZ));
    let mut session = QuizSession::new();

    run(&mut session, &source, "Space Exploration").await;

    assert_eq!(session.status(), Status::InProgress);
    assert_eq!(session.current_index(), 0);
    for _ in 0..QUESTIONS_PER_QUIZ {
        let correct = session.current_question().unwrap().correct_answer().to_owned();
        session.answer(&correct).unwrap();
        session.advance().unwrap();
    }

    assert_eq!(session.status(), Status::Finished);
    assert_eq!(session.score(), 10);
    assert_eq!(session.answers().len(), 10);
    assert_eq!(session.percentage(), 100);
}

#[rstest]
#[case(&[true, false, true, true, false, false, true, true, true, false])]
#[case(&[false; 10])]
#[case(&[true; 10])]
#[tokio::test]
async fn finished_score_matches_answer_log(#[case] pattern: &[bool]) {
    let source = ScriptedSource::returning(payload(pattern.len()));
    let mut session = QuizSession::new();
    run(&mut session, &source, "Mixed").await;

    for &right in pattern {
        let question = session.current_question().unwrap().clone();
        let choice = if right {
            question.correct_answer()
        } else {
            question.options().iter().find(|o| !question.is_correct(o)).unwrap().as_str()
        };
        session.answer(choice).unwrap();
        session.advance().unwrap();
    }

    let snapshot = session.snapshot();
    assert_eq!(snapshot.status, Status::Finished);
    assert_eq!(snapshot.answers.len(), snapshot.questions.len());
    assert_eq!(
        snapshot.score,
        snapshot.answers.iter().filter(|a| a.is_correct()).count()
    );
    for (question, answer) in snapshot.questions.iter().zip(&snapshot.answers) {
        assert_eq!(answer.question_id(), question.id());
    }
}

#[tokio::test]
async fn parse_failure_errors_then_restarts_clean() {
    let source = ScriptedSource::returning("Sorry, I can't help with that.");
    let mut session = QuizSession::new();

    run(&mut session, &source, "Anything").await;

    assert_eq!(session.status(), Status::Errored);
    assert!(!session.error_message().is_empty());
    assert!(session.error_message().contains("parse"));

    session.restart().unwrap();

    assert_eq!(session.status(), Status::Idle);
    assert_eq!(session.topic(), "");
    assert!(session.questions().is_empty());
}

#[tokio::test]
async fn empty_response_errors() {
    let source = ScriptedSource {
        payload: None,
        delay: Duration::ZERO,
    };
    let mut session = QuizSession::new();

    run(&mut session, &source, "Silence").await;

    assert_eq!(session.status(), Status::Errored);
    assert!(session.error_message().contains("no text"));
}

#[tokio::test]
async fn unanswerable_question_rejects_the_batch() {
    let broken = payload(10).replace(r#""correctAnswer": "B4""#, r#""correctAnswer": "E4""#);
    let source = ScriptedSource::returning(broken);
    let mut session = QuizSession::new();

    run(&mut session, &source, "Broken").await;

    assert_eq!(session.status(), Status::Errored);
    assert!(session.questions().is_empty());
    assert!(session.error_message().contains("question #5"));
}

#[tokio::test]
async fn wrong_answer_is_recorded_without_score() {
    let letters = r#"[{"text": "Second letter?", "options": ["A","B","C","D"], "correctAnswer": "B", "explanation": "A, then B."}]"#;
    let source = ScriptedSource::returning(letters);
    let mut session = QuizSession::new();
    run(&mut session, &source, "Alphabet").await;

    let record = session.answer("C").unwrap().clone();

    assert_eq!(record.selected(), "C");
    assert!(!record.is_correct());
    assert_eq!(session.score(), 0);
    assert_eq!(session.answers(), &[record]);
}

#[tokio::test]
async fn double_answer_and_early_advance_leave_state_alone() {
    let source = ScriptedSource::returning(payload(2));
    let mut session = QuizSession::new();
    run(&mut session, &source, "Guards").await;

    assert_eq!(session.advance(), Err(SequenceError::NotAnswered(0)));
    session.answer("B0").unwrap();
    let before = session.snapshot();

    assert_eq!(session.answer("A0"), Err(SequenceError::AlreadyAnswered(0)));
    assert_eq!(session.snapshot(), before);
}

#[tokio::test(start_paused = true)]
async fn slower_superseded_request_cannot_overwrite_newer_quiz() {
    let session = Arc::new(Mutex::new(QuizSession::new()));
    let slow = ScriptedSource::returning(payload(10)).after(Duration::from_secs(30));
    let fast = ScriptedSource::returning(payload(3)).after(Duration::from_secs(1));

    let first = session.lock().await.start("Slow topic").unwrap();
    let slow_task = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            let questions = slow.generate("Slow topic").await.unwrap();
            session.lock().await.load_succeeded(first, questions)
        })
    };

    let second = session.lock().await.start("Fast topic").unwrap();
    let fast_task = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            let questions = fast.generate("Fast topic").await.unwrap();
            session.lock().await.load_succeeded(second, questions)
        })
    };

    assert!(fast_task.await.unwrap());
    assert!(!slow_task.await.unwrap());

    let session = session.lock().await;
    assert_eq!(session.status(), Status::InProgress);
    assert_eq!(session.topic(), "Fast topic");
    assert_eq!(session.questions().len(), 3);
}
