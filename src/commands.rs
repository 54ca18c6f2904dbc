use std::sync::Arc;

use teloxide::{types::Message, utils::command::BotCommands};
use tracing::instrument;

use crate::{
    chat::QuizChat,
    config::QuizSettings,
    document::{remove_scratch, scratch_path},
    error::QuizResult,
    session::{end_session, SessionDialogue, SessionState},
    HandlerResult,
};

pub(crate) const USAGE: &str = "🤖 PDF Quiz Bot ready!\n\n\
Add me to a group and send /pdf there. I will ask for a PDF and the number \
of seconds per question, then turn the document into a quiz.";
pub(crate) const GROUP_ONLY: &str = "❌ Quizzes only run in groups. Send /pdf in a group chat.";
pub(crate) const SEND_PDF: &str = "📄 Send the PDF for the quiz.";
pub(crate) const ALREADY_RUNNING: &str = "⏳ A quiz is already running in this chat.";
pub(crate) const CANCELLED: &str = "Quiz setup cancelled.";
pub(crate) const NOTHING_TO_CANCEL: &str = "There is no quiz setup to cancel.";

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "show usage.")]
    Start,
    #[command(description = "display this text.")]
    Help,
    #[command(description = "make a quiz from a PDF (groups only).")]
    Pdf,
    #[command(description = "abandon the current quiz setup.")]
    Cancel,
}

pub(crate) async fn start<C: QuizChat>(bot: C, msg: Message) -> HandlerResult {
    bot.send_text(msg.chat.id, USAGE.to_owned()).await?;
    Ok(())
}

pub(crate) async fn help<C: QuizChat>(bot: C, msg: Message) -> HandlerResult {
    bot.send_text(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, msg, settings), fields(chat_id = %msg.chat.id))]
pub(crate) async fn pdf<C: QuizChat>(
    bot: C,
    dialogue: SessionDialogue,
    msg: Message,
    settings: Arc<QuizSettings>,
) -> HandlerResult {
    let is_group = msg.chat.is_group() || msg.chat.is_supergroup();
    begin_session(&bot, &dialogue, is_group, &settings).await?;
    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, msg, settings), fields(chat_id = %msg.chat.id))]
pub(crate) async fn cancel<C: QuizChat>(
    bot: C,
    dialogue: SessionDialogue,
    msg: Message,
    settings: Arc<QuizSettings>,
) -> HandlerResult {
    cancel_session(&bot, &dialogue, &settings).await?;
    Ok(())
}

/// Opens a session waiting for a document, or restarts a pending one.
pub async fn begin_session<C: QuizChat>(
    chat: &C,
    dialogue: &SessionDialogue,
    is_group: bool,
    settings: &QuizSettings,
) -> QuizResult<()> {
    let chat_id = dialogue.chat_id();

    if !is_group {
        log::info!("{}: /pdf outside of a group", chat_id);
        chat.send_text(chat_id, GROUP_ONLY.to_owned()).await?;
        return Ok(());
    }

    match dialogue.get().await? {
        Some(SessionState::Running) => {
            chat.send_text(chat_id, ALREADY_RUNNING.to_owned()).await?;
            return Ok(());
        }
        Some(state) if state.is_pending() => {
            log::info!("{}: restarting quiz setup from {:?}", chat_id, state);
            remove_scratch(&scratch_path(&settings.scratch_dir, chat_id)).await;
        }
        _ => {}
    }

    dialogue.update(SessionState::AwaitingDocument).await?;
    log::info!("{}: waiting for a document", chat_id);
    chat.send_text(chat_id, SEND_PDF.to_owned()).await?;
    Ok(())
}

pub async fn cancel_session<C: QuizChat>(
    chat: &C,
    dialogue: &SessionDialogue,
    settings: &QuizSettings,
) -> QuizResult<()> {
    let chat_id = dialogue.chat_id();

    let reply = match dialogue.get().await? {
        Some(SessionState::Running) => ALREADY_RUNNING,
        Some(state) if state.is_pending() => {
            end_session(dialogue).await?;
            remove_scratch(&scratch_path(&settings.scratch_dir, chat_id)).await;
            log::info!("{}: quiz setup cancelled", chat_id);
            CANCELLED
        }
        _ => NOTHING_TO_CANCEL,
    };

    chat.send_text(chat_id, reply.to_owned()).await?;
    Ok(())
}
