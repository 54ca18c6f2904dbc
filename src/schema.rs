use teloxide::{
    dispatching::{dialogue, UpdateFilterExt, UpdateHandler},
    dptree,
    types::{Message, Update},
};
use tracing::instrument;

use crate::{
    chat::QuizChat,
    commands::{self, Command},
    generator::Completion,
    ingest, runner,
    session::{SessionState, SessionStorage},
    DispatchError,
};

/// Dispatch tree of the bot: commands first, then whatever the chat's session is waiting for.
pub fn schema<C: QuizChat, G: Completion>() -> UpdateHandler<DispatchError> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(commands::start::<C>))
        .branch(case![Command::Help].endpoint(commands::help::<C>))
        .branch(case![Command::Pdf].endpoint(commands::pdf::<C>))
        .branch(case![Command::Cancel].endpoint(commands::cancel::<C>));

    let handler = Update::filter_message()
        .branch(command_handler)
        .branch(session_scheme::<C, G>());

    dialogue::enter::<Update, SessionStorage, SessionState, _>().branch(handler)
}

#[instrument(level = "debug")]
fn session_scheme<C: QuizChat, G: Completion>() -> UpdateHandler<DispatchError> {
    use dptree::case;
    log::debug!("Building dispatching tree for quiz sessions");

    // Anything that falls through here is not meant for the bot and is dropped quietly.
    dptree::entry()
        .branch(
            case![SessionState::AwaitingDocument]
                .filter(|msg: Message| msg.document().is_some())
                .endpoint(ingest::receive_document::<C>),
        )
        .branch(
            case![SessionState::AwaitingDuration]
                .filter(|msg: Message| msg.text().is_some_and(|text| !text.starts_with('/')))
                .endpoint(runner::receive_duration::<C, G>),
        )
}

#[cfg(test)]
mod tests {
    use std::{ops::ControlFlow, sync::Arc};

    use serde_json::{json, Value};
    use teloxide::types::{ChatId, Me};

    use super::*;
    use crate::{
        config::QuizSettings,
        document::scratch_path,
        mocks::{pdf_with_pages, RecordingChat, StubCompletion},
        session::SessionDialogue,
    };

    const GROUP: ChatId = ChatId(-1001);

    struct Harness {
        dir: tempfile::TempDir,
        chat: RecordingChat,
        storage: Arc<SessionStorage>,
    }

    impl Harness {
        async fn in_state(state: Option<SessionState>) -> Self {
            let storage = SessionStorage::new();
            if let Some(state) = state {
                SessionDialogue::new(storage.clone(), GROUP)
                    .update(state)
                    .await
                    .unwrap();
            }
            Self {
                dir: tempfile::tempdir().unwrap(),
                chat: RecordingChat::serving(pdf_with_pages(&["Capital of France is Paris."])),
                storage,
            }
        }

        /// Runs one update through the tree; `true` when some endpoint handled it.
        async fn dispatch(&self, message: Value) -> bool {
            let update: Update = serde_json::from_str(
                &json!({
                    "update_id": 1,
                    "message": message,
                })
                .to_string(),
            )
            .unwrap();
            let settings = Arc::new(QuizSettings {
                scratch_dir: self.dir.path().to_owned(),
                ..QuizSettings::default()
            });
            let completion = Arc::new(StubCompletion::replying("[]"));

            let deps = dptree::deps![
                update,
                me(),
                self.chat.clone(),
                self.storage.clone(),
                settings,
                completion
            ];
            match schema::<RecordingChat, StubCompletion>().dispatch(deps).await {
                ControlFlow::Break(result) => {
                    result.unwrap();
                    true
                }
                ControlFlow::Continue(_) => false,
            }
        }

        async fn state(&self) -> Option<SessionState> {
            SessionDialogue::new(self.storage.clone(), GROUP)
                .get()
                .await
                .unwrap()
        }
    }

    fn me() -> Me {
        serde_json::from_value(json!({
            "id": 7000,
            "is_bot": true,
            "first_name": "Quiz",
            "username": "pdf_quiz_bot",
            "can_join_groups": true,
            "can_read_all_group_messages": false,
            "supports_inline_queries": false,
            "can_connect_to_business": false,
            "has_main_web_app": false,
        }))
        .unwrap()
    }

    fn message(extra: Value) -> Value {
        let mut message = json!({
            "message_id": 10,
            "date": 1_700_000_000,
            "chat": {"id": GROUP.0, "type": "supergroup", "title": "Study group"},
            "from": {"id": 42, "is_bot": false, "first_name": "Asha"},
        });
        if let (Some(message), Some(extra)) = (message.as_object_mut(), extra.as_object()) {
            message.extend(extra.clone());
        }
        message
    }

    fn text(text: &str) -> Value {
        message(json!({ "text": text }))
    }

    fn pdf_document() -> Value {
        message(json!({
            "document": {
                "file_id": "BQACAgIAAxkBAAIB",
                "file_unique_id": "AgADBQAC",
                "file_name": "notes.pdf",
                "mime_type": "application/pdf",
                "file_size": 2048,
            }
        }))
    }

    #[tokio::test]
    async fn documents_are_ignored_unless_a_document_is_expected() {
        for state in [
            None,
            Some(SessionState::AwaitingDuration),
            Some(SessionState::Running),
        ] {
            let harness = Harness::in_state(state.clone()).await;

            assert!(!harness.dispatch(pdf_document()).await, "{state:?}");
            assert!(harness.chat.sent().is_empty(), "{state:?}");
            assert_eq!(harness.state().await, state);
            assert!(!scratch_path(harness.dir.path(), GROUP).exists());
        }
    }

    #[tokio::test]
    async fn text_is_ignored_unless_a_duration_is_expected() {
        for state in [
            None,
            Some(SessionState::AwaitingDocument),
            Some(SessionState::Running),
        ] {
            let harness = Harness::in_state(state.clone()).await;

            assert!(!harness.dispatch(text("15")).await, "{state:?}");
            assert!(harness.chat.sent().is_empty(), "{state:?}");
            assert_eq!(harness.state().await, state);
        }
    }

    #[tokio::test]
    async fn unknown_commands_are_not_taken_for_a_duration() {
        let harness = Harness::in_state(Some(SessionState::AwaitingDuration)).await;

        for input in ["/foo", "/foo@pdf_quiz_bot 15"] {
            assert!(!harness.dispatch(text(input)).await, "{input}");
        }
        assert!(harness.chat.sent().is_empty());
        assert_eq!(harness.state().await, Some(SessionState::AwaitingDuration));
    }

    #[tokio::test]
    async fn document_in_the_waiting_state_is_stored() {
        let harness = Harness::in_state(Some(SessionState::AwaitingDocument)).await;

        assert!(harness.dispatch(pdf_document()).await);
        assert_eq!(harness.state().await, Some(SessionState::AwaitingDuration));
        assert!(scratch_path(harness.dir.path(), GROUP).exists());
    }

    #[tokio::test]
    async fn commands_reach_their_handlers() {
        let harness = Harness::in_state(None).await;

        assert!(harness.dispatch(text("/pdf")).await);
        assert_eq!(harness.state().await, Some(SessionState::AwaitingDocument));

        assert!(harness.dispatch(text("/cancel@pdf_quiz_bot")).await);
        assert_eq!(harness.state().await, None);

        assert!(harness.dispatch(text("/start")).await);
        assert_eq!(harness.chat.last_text().as_deref(), Some(commands::USAGE));
    }
}
