//! Serialised access to each chat's [`QuizSession`].
//!
//! Handlers and the generation task both read a session from dialogue
//! storage, change it and write it back. Each chat's read-modify-write runs
//! under that chat's lock, so a transition never works on a copy another
//! writer has already replaced.

use std::{collections::HashMap, sync::Arc};

use teloxide::types::ChatId;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{session::QuizSession, HandlerError, UserDialogue};

type LockMap = Arc<Mutex<HashMap<ChatId, Arc<Mutex<()>>>>>;

/// One lock per chat, created on first use.
#[derive(Debug, Clone, Default)]
pub struct ChatLocks {
    chats: LockMap,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, chat_id: ChatId) -> OwnedMutexGuard<()> {
        let chat = {
            let mut chats = self.chats.lock().await;
            Arc::clone(chats.entry(chat_id).or_default())
        };
        chat.lock_owned().await
    }
}

/// Applies `change` to the chat's stored session and persists the result.
///
/// Returns the closure's value and a copy of the session as written.
pub(crate) async fn update_session_with<F, T>(
    dialogue: &UserDialogue,
    locks: &ChatLocks,
    change: F,
) -> Result<(T, QuizSession), HandlerError>
where
    F: FnOnce(&mut QuizSession) -> T,
{
    let _guard = locks.lock(dialogue.chat_id()).await;

    let mut session = dialogue.get_or_default().await?;
    let result = change(&mut session);
    dialogue.update(session.clone()).await?;

    Ok((result, session))
}
