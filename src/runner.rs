use std::sync::Arc;

use teloxide::{
    dispatching::dialogue::GetChatId,
    payloads::{AnswerCallbackQuerySetters, SendMessageSetters},
    prelude::Requester,
    types::{CallbackQuery, ChatId, Message, ParseMode, ReplyMarkup},
    Bot,
};
use tracing::{error, info, instrument, warn};

use crate::{
    keyboard::{next_keyboard, options_keyboard, restart_keyboard, topics_keyboard, CallbackAction},
    question::Question,
    render,
    session::{QuizSession, RequestToken, SequenceError, Status},
    source::{GenerationError, QuestionSource},
    store::{update_session_with, ChatLocks},
    HandlerError, HandlerResult, UserDialogue,
};

pub const DEFAULT_TOPIC: &str = "General Knowledge";

/// Blank topics fall back to [`DEFAULT_TOPIC`].
pub fn topic_or_default(text: &str) -> String {
    match text.trim() {
        "" => DEFAULT_TOPIC.to_owned(),
        topic => topic.to_owned(),
    }
}

#[instrument(level = "info", skip(bot, dialogue, locks, source))]
pub(crate) async fn receive_topic<Source: QuestionSource + 'static>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    locks: ChatLocks,
    source: Arc<Source>,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please, send a topic as text.")
            .await?;
        return Ok(());
    };

    let topic = topic_or_default(text);
    let (started, session) =
        update_session_with(&dialogue, &locks, |session| session.start(topic.clone())).await?;
    let token = match started {
        Ok(token) => token,
        Err(e) => {
            warn!("Topic ignored in chat {}: {}", msg.chat.id, e);
            return present(&bot, msg.chat.id, &session).await;
        }
    };

    bot.send_message(msg.chat.id, render::loading(&topic))
        .parse_mode(ParseMode::Html)
        .reply_markup(ReplyMarkup::kb_remove())
        .await?;

    tokio::spawn(generate_quiz(bot, dialogue, locks, source, topic, token));
    Ok(())
}

async fn generate_quiz<Source: QuestionSource>(
    bot: Bot,
    dialogue: UserDialogue,
    locks: ChatLocks,
    source: Arc<Source>,
    topic: String,
    token: RequestToken,
) {
    let outcome = source.generate(&topic).await;
    let delivered = match settle_generation(&dialogue, &locks, token, outcome).await {
        Ok(Some(session)) => present(&bot, dialogue.chat_id(), &session).await,
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    };
    if let Err(e) = delivered {
        error!("Failed to deliver quiz about '{}': {}", topic, e);
    }
}

/// Applies a finished generation to the chat's session. Returns the session
/// to show, or `None` when `token` was superseded and the result dropped.
async fn settle_generation(
    dialogue: &UserDialogue,
    locks: &ChatLocks,
    token: RequestToken,
    outcome: Result<Vec<Question>, GenerationError>,
) -> Result<Option<QuizSession>, HandlerError> {
    if let Err(e) = &outcome {
        error!("Failed to generate quiz: {:?}", e);
    }

    let (applied, session) = update_session_with(dialogue, locks, |session| match outcome {
        Ok(questions) => session.load_succeeded(token, questions),
        Err(e) => session.load_failed(token, e.to_string()),
    })
    .await?;

    if !applied {
        info!("Discarded result of superseded request {}", token);
        return Ok(None);
    }
    Ok(Some(session))
}

#[instrument(level = "info", skip(bot, session))]
pub(crate) async fn answer_with_buttons(
    bot: Bot,
    msg: Message,
    session: QuizSession,
) -> HandlerResult {
    bot.send_message(msg.chat.id, "Please, answer using the buttons below.")
        .await?;
    present(&bot, msg.chat.id, &session).await
}

#[instrument(level = "info", skip(bot, dialogue, locks), fields(data = ?q.data))]
pub(crate) async fn take_action(
    bot: Bot,
    dialogue: UserDialogue,
    q: CallbackQuery,
    locks: ChatLocks,
) -> HandlerResult {
    let (Some(action), Some(chat_id)) = (
        q.data.as_deref().and_then(CallbackAction::parse),
        q.chat_id(),
    ) else {
        bot.answer_callback_query(&q.id).await?;
        return Ok(());
    };

    let (outcome, session) =
        update_session_with(&dialogue, &locks, |session| apply_action(session, action)).await?;

    match outcome {
        Ok(()) => {
            bot.answer_callback_query(&q.id).await?;
            if let Some(message) = &q.message {
                bot.edit_message_reply_markup(chat_id, message.id()).await?;
            }
            present(&bot, chat_id, &session).await?;
        }
        Err(e) => {
            warn!("Ignoring {:?} in chat {}: {}", action, chat_id, e);
            bot.answer_callback_query(&q.id).text(e.to_string()).await?;
        }
    }

    Ok(())
}

fn apply_action(session: &mut QuizSession, action: CallbackAction) -> Result<(), SequenceError> {
    match action {
        CallbackAction::Answer { question, option } => take_answer(session, question, option),
        CallbackAction::Next => session.advance().map(|_| ()),
        CallbackAction::Restart => session.restart(),
    }
}

/// Answers with the option at `idx`, provided the button belongs to the
/// question that is current now.
fn take_answer(session: &mut QuizSession, question_id: usize, idx: usize) -> Result<(), SequenceError> {
    let current = session.current_question();
    if current.is_some_and(|question| question.id() != question_id) {
        return Err(SequenceError::NotCurrent(question_id));
    }
    let selected = current
        .and_then(|question| question.option(idx))
        .unwrap_or_default()
        .to_owned();
    session.answer(&selected).map(|_| ())
}

/// Sends whatever the session's status calls for.
pub(crate) async fn present(bot: &Bot, chat_id: ChatId, session: &QuizSession) -> HandlerResult {
    match session.status() {
        Status::Idle => {
            bot.send_message(chat_id, render::welcome())
                .parse_mode(ParseMode::Html)
                .reply_markup(topics_keyboard())
                .await?;
        }
        Status::Loading => {
            bot.send_message(chat_id, render::loading(session.topic()))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Status::InProgress => {
            let (Some(question), Some(text)) =
                (session.current_question(), render::question(session))
            else {
                return Ok(());
            };
            match session.current_answer() {
                None => {
                    bot.send_message(chat_id, text)
                        .parse_mode(ParseMode::Html)
                        .reply_markup(options_keyboard(question))
                        .await?;
                }
                Some(record) => {
                    bot.send_message(chat_id, render::feedback(question, record))
                        .parse_mode(ParseMode::Html)
                        .reply_markup(next_keyboard(session.is_last_question()))
                        .await?;
                }
            }
        }
        Status::Errored => {
            bot.send_message(chat_id, render::error(session))
                .parse_mode(ParseMode::Html)
                .reply_markup(restart_keyboard("Try Again 🔄"))
                .await?;
        }
        Status::Finished => {
            let messages = render::results(session);
            let last = messages.len().saturating_sub(1);
            for (idx, text) in messages.into_iter().enumerate() {
                let request = bot.send_message(chat_id, text).parse_mode(ParseMode::Html);
                if idx == last {
                    request
                        .reply_markup(restart_keyboard("Play Another Quiz 🔄"))
                        .await?;
                } else {
                    request.await?;
                }
            }
        }
    }
    Ok(())
}
