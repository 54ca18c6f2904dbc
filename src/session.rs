use teloxide::dispatching::dialogue::{Dialogue, InMemStorage, InMemStorageError};

/// Per-chat progress through quiz setup.
///
/// `Idle` is what the dispatcher sees for a chat without a stored entry; the
/// handlers never store it and drop the entry instead, so a finished or failed
/// session leaves nothing behind in the storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingDocument,
    AwaitingDuration,
    Running,
}

impl SessionState {
    /// Setup states a user may abandon with `/cancel` or restart with `/pdf`.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::AwaitingDocument | Self::AwaitingDuration)
    }
}

pub type SessionStorage = InMemStorage<SessionState>;
pub type SessionDialogue = Dialogue<SessionState, SessionStorage>;

/// Drops the chat's entry; ending a session that is already gone is fine.
pub async fn end_session(dialogue: &SessionDialogue) -> Result<(), InMemStorageError> {
    match dialogue.exit().await {
        Err(InMemStorageError::DialogueNotFound) => Ok(()),
        other => other,
    }
}
