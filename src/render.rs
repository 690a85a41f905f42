//! HTML message text for each session status.

use teloxide::utils::html::{bold, escape, italic};

use crate::{
    question::{AnswerRecord, Question, OPTION_LABELS},
    session::QuizSession,
};

pub const SUGGESTED_TOPICS: [&str; 5] = [
    "Space Exploration",
    "Ancient History",
    "Movie Trivia",
    "JavaScript",
    "World Capitals",
];

pub const GENERATION_FAILED: &str =
    "We couldn't generate the quiz. Please check your API key and try again.";

/// Telegram rejects messages over 4096 characters; leave room for markup.
const MAX_MESSAGE_LEN: usize = 4000;
const PROGRESS_WIDTH: usize = 10;

// Per-field caps on escaped text in a review entry; together they stay
// under MAX_MESSAGE_LEN.
const REVIEW_TEXT_LEN: usize = 1000;
const REVIEW_ANSWER_LEN: usize = 400;
const REVIEW_EXPLANATION_LEN: usize = 2000;
const ERROR_DETAIL_LEN: usize = 300;

pub fn welcome() -> String {
    format!(
        "{}\nChallenge yourself with AI-generated questions on any topic imaginable.\n\n\
         What do you want to learn about today? Send a topic, or pick a popular one below.",
        bold("Quiz Master")
    )
}

pub fn loading(topic: &str) -> String {
    format!(
        "Generating questions...\nCrafting a unique quiz about {}",
        strong(&format!("\"{}\"", topic))
    )
}

pub fn question(session: &QuizSession) -> Option<String> {
    let question = session.current_question()?;
    let total = session.questions().len();
    let number = session.current_index() + 1;

    let mut text = format!(
        "Question {} of {} · Score: {}\n{}\n\n{}\n",
        number,
        total,
        session.score(),
        progress_bar(session.current_index(), total),
        strong(question.text())
    );
    for (label, option) in OPTION_LABELS.iter().zip(question.options()) {
        text.push_str(&format!("\n{}) {}", label, escape(option)));
    }
    Some(text)
}

pub fn feedback(question: &Question, record: &AnswerRecord) -> String {
    let verdict = if record.is_correct() {
        format!("✅ Correct! You answered {}.", strong(record.selected()))
    } else {
        format!(
            "❌ Incorrect. You answered {}; the correct answer is {}.",
            strong(record.selected()),
            strong(question.correct_answer())
        )
    };
    format!("{}\n\n{}", verdict, emphasis(question.explanation()))
}

pub fn grade_message(percentage: usize) -> &'static str {
    match percentage {
        p if p >= 100 => "Perfect Score! You're a genius!",
        p if p >= 80 => "Great job! You know your stuff.",
        p if p >= 60 => "Good effort! A little more study needed.",
        _ => "Keep learning! You'll get it next time.",
    }
}

/// Summary followed by the per-question review, split to fit Telegram's
/// message size limit.
pub fn results(session: &QuizSession) -> Vec<String> {
    let summary = format!(
        "🏆 {}\n{}\n\n{} / {} ({}%)",
        bold("Quiz Complete!"),
        grade_message(session.percentage()),
        bold(&session.score().to_string()),
        session.questions().len(),
        session.percentage()
    );

    let mut messages = vec![summary];
    let mut current = bold("Review Answers");
    for (idx, question) in session.questions().iter().enumerate() {
        let entry = review_entry(idx, question, session.answer_for(question.id()));
        if current.len() + entry.len() + 2 > MAX_MESSAGE_LEN {
            messages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&entry);
    }
    if !current.is_empty() {
        messages.push(current);
    }
    messages
}

fn review_entry(idx: usize, question: &Question, answer: Option<&AnswerRecord>) -> String {
    let correct = answer.is_some_and(AnswerRecord::is_correct);
    let mark = if correct { "✅" } else { "❌" };
    let selected = answer.map(AnswerRecord::selected).unwrap_or("-");

    let mut entry = format!(
        "{} {}. {}\nYour answer: {}",
        mark,
        idx + 1,
        bold(&clip(escape(question.text()), REVIEW_TEXT_LEN)),
        clip(escape(selected), REVIEW_ANSWER_LEN)
    );
    if !correct {
        entry.push_str(&format!(
            "\nCorrect: {}",
            clip(escape(question.correct_answer()), REVIEW_ANSWER_LEN)
        ));
    }
    entry.push_str(&format!(
        "\n{}",
        italic(&clip(escape(question.explanation()), REVIEW_EXPLANATION_LEN))
    ));
    entry
}

pub fn error(session: &QuizSession) -> String {
    format!(
        "⚠️ {}\n{}\n\n{}",
        bold("Oops! Something went wrong"),
        GENERATION_FAILED,
        italic(&clip(escape(session.error_message()), ERROR_DETAIL_LEN))
    )
}

/// Cuts escaped HTML to at most `limit` bytes plus an ellipsis, never inside
/// a character or an entity.
fn clip(escaped: String, limit: usize) -> String {
    if escaped.len() <= limit {
        return escaped;
    }

    let mut end = limit;
    while !escaped.is_char_boundary(end) {
        end -= 1;
    }
    let head = &escaped[..end];
    let head = match (head.rfind('&'), head.rfind(';')) {
        (Some(amp), semi) if semi.map_or(true, |semi| semi < amp) => &head[..amp],
        _ => head,
    };
    format!("{}…", head)
}

fn strong(text: &str) -> String {
    bold(&escape(text))
}

fn emphasis(text: &str) -> String {
    italic(&escape(text))
}

fn progress_bar(current: usize, total: usize) -> String {
    let filled = if total == 0 {
        0
    } else {
        current * PROGRESS_WIDTH / total
    };
    format!(
        "{}{}",
        "▓".repeat(filled),
        "░".repeat(PROGRESS_WIDTH - filled)
    )
}
