use std::sync::Arc;

use dotenvy::dotenv;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::error_handlers::IgnoringErrorHandlerSafe;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use topicquizbot::config::Config;
use topicquizbot::schema::schema;
use topicquizbot::session::QuizSession;
use topicquizbot::source::GeminiSource;
use topicquizbot::store::ChatLocks;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() {
    dotenv().ok();
    let config = Config::from_env().expect("Configuration should be valid.");

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from_level(config.log_level))
        .json()
        .with_span_events(FmtSpan::ENTER)
        .log_internal_errors(true)
        .with_line_number(true)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to install the subscriber.");
    tracing_log::LogTracer::init().expect("Failed to bridge log records.");

    let source = Arc::new(
        GeminiSource::new(config.gemini.clone()).expect("Failed to build the Gemini client."),
    );

    let bot = Bot::new(&config.teloxide_token);
    info!("Starting bot...");

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema::<GeminiSource>())
        .dependencies(dptree::deps![
            InMemStorage::<QuizSession>::new(),
            ChatLocks::new(),
            source
        ])
        .enable_ctrlc_handler()
        .build();

    if let Some(webhook) = config.webhook {
        let listener = webhooks::axum(bot, Options::new(webhook.addr, webhook.url))
            .await
            .expect("Failed to build a listener.");
        dispatcher
            .dispatch_with_listener(listener, Arc::new(IgnoringErrorHandlerSafe))
            .await
    } else {
        dispatcher.dispatch().await
    }
}
