use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::{
    question::{Question, OPTION_LABELS},
    render::SUGGESTED_TOPICS,
};

/// What an inline button asks the session to do.
///
/// Options travel by index: Telegram caps callback data at 64 bytes, which
/// generated option text can exceed. Answers also carry the id of the
/// question the button was shown under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Answer { question: usize, option: usize },
    Next,
    Restart,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "next" => Some(Self::Next),
            "restart" => Some(Self::Restart),
            other => {
                let (question, option) = other.strip_prefix("opt:")?.split_once(':')?;
                Some(Self::Answer {
                    question: question.parse().ok()?,
                    option: option.parse().ok()?,
                })
            }
        }
    }

    pub fn data(&self) -> String {
        match self {
            Self::Answer { question, option } => format!("opt:{}:{}", question, option),
            Self::Next => "next".to_owned(),
            Self::Restart => "restart".to_owned(),
        }
    }
}

pub(crate) fn topics_keyboard() -> KeyboardMarkup {
    let keyboard = SUGGESTED_TOPICS
        .iter()
        .map(|topic| vec![KeyboardButton::new(*topic)]);

    let mut markup = KeyboardMarkup::new(keyboard);
    markup.one_time_keyboard = true;
    markup
}

pub(crate) fn options_keyboard(question: &Question) -> InlineKeyboardMarkup {
    let keyboard: Vec<Vec<InlineKeyboardButton>> = question
        .options()
        .iter()
        .zip(OPTION_LABELS)
        .enumerate()
        .map(|(idx, (option, label))| {
            vec![InlineKeyboardButton::callback(
                format!("{}) {}", label, option),
                CallbackAction::Answer {
                    question: question.id(),
                    option: idx,
                }
                .data(),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(keyboard)
}

pub(crate) fn next_keyboard(is_last: bool) -> InlineKeyboardMarkup {
    let label = if is_last {
        "Finish Quiz 🏁"
    } else {
        "Next Question ➡️"
    };

    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        label,
        CallbackAction::Next.data(),
    )]])
}

pub(crate) fn restart_keyboard(label: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        label,
        CallbackAction::Restart.data(),
    )]])
}
