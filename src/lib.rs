use session::QuizSession;
use teloxide::{dispatching::dialogue::InMemStorage, prelude::Dialogue};

pub mod commands;
pub mod config;
pub mod keyboard;
pub mod question;
pub mod render;
pub mod runner;
pub mod schema;
pub mod session;
pub mod source;
pub mod store;

type UserDialogue = Dialogue<QuizSession, InMemStorage<QuizSession>>;
type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;
type HandlerResult = Result<(), HandlerError>;
