use teloxide::{prelude::Requester, types::Message, utils::command::BotCommands, Bot};
use tracing::instrument;

use crate::{
    runner::present,
    session::QuizSession,
    store::{update_session_with, ChatLocks},
    HandlerResult, UserDialogue,
};

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "display help.")]
    Help,
    #[command(description = "start the bot.")]
    Start,
    #[command(description = "abandon the current quiz.")]
    Cancel,
}

pub(crate) async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, locks))]
pub(crate) async fn cancel(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    locks: ChatLocks,
) -> HandlerResult {
    bot.send_message(msg.chat.id, "Cancelling quiz.").await?;
    reset(&bot, &dialogue, &locks, &msg).await
}

#[instrument(level = "info", skip(bot, dialogue, locks))]
pub(crate) async fn start(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    locks: ChatLocks,
) -> HandlerResult {
    reset(&bot, &dialogue, &locks, &msg).await
}

/// Replaces the chat's session with a fresh one. Results of a generation
/// still in flight are discarded when they arrive.
async fn reset(
    bot: &Bot,
    dialogue: &UserDialogue,
    locks: &ChatLocks,
    msg: &Message,
) -> HandlerResult {
    let ((), session) =
        update_session_with(dialogue, locks, |session| *session = QuizSession::new()).await?;
    present(bot, msg.chat.id, &session).await
}
