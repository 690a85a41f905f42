use teloxide::{
    dispatching::{dialogue, dialogue::InMemStorage, UpdateFilterExt, UpdateHandler},
    dptree,
    types::Update,
};
use tracing::instrument;

use crate::{
    commands::{cancel, help, start, Command},
    runner,
    session::{QuizSession, Status},
    source::QuestionSource,
    HandlerError,
};

/// Dispatch tree. Expects `InMemStorage<QuizSession>`, `ChatLocks` and `Arc<Source>` as dependencies.
pub fn schema<Source: QuestionSource + 'static>() -> UpdateHandler<HandlerError> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(help))
        .branch(case![Command::Start].endpoint(start))
        .branch(case![Command::Cancel].endpoint(cancel));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(
            dptree::filter(|session: QuizSession| session.status() == Status::InProgress)
                .endpoint(runner::answer_with_buttons),
        )
        .branch(dptree::endpoint(runner::receive_topic::<Source>));

    dialogue::enter::<Update, InMemStorage<QuizSession>, QuizSession, _>()
        .branch(message_handler)
        .branch(callback_query_scheme())
}

#[instrument(level = "debug")]
fn callback_query_scheme() -> UpdateHandler<HandlerError> {
    tracing::debug!("Building a dispatching tree for callback query");
    Update::filter_callback_query().endpoint(runner::take_action)
}
