use std::{path::Path, sync::Arc, time::Duration};

use teloxide::types::{ChatId, Message};
use thiserror::Error;
use tracing::instrument;

use crate::{
    chat::QuizChat,
    config::QuizSettings,
    document::{extract_text, remove_scratch, scratch_path},
    error::{QuizError, QuizResult},
    generator::{generate_questions, Completion},
    session::{end_session, SessionDialogue, SessionState},
    HandlerResult,
};

pub(crate) const BUILDING: &str = "🧠 Building the quiz...";
pub(crate) const FINISHED: &str = "🏁 Quiz finished!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("❌ Send a whole number of seconds, at least {min}.")]
    NotANumber { min: u32 },
    #[error("❌ Too short. Send a number of seconds, at least {min}.")]
    TooShort { min: u32 },
    #[error("❌ Too long. Telegram polls stay open for at most {max} seconds.")]
    TooLong { max: u32 },
}

pub fn parse_duration(input: &str, settings: &QuizSettings) -> Result<u32, DurationError> {
    let seconds: u32 = input.trim().parse().map_err(|_| DurationError::NotANumber {
        min: settings.min_duration,
    })?;

    if seconds < settings.min_duration {
        Err(DurationError::TooShort {
            min: settings.min_duration,
        })
    } else if seconds > settings.max_duration {
        Err(DurationError::TooLong {
            max: settings.max_duration,
        })
    } else {
        Ok(seconds)
    }
}

#[instrument(level = "info", skip(bot, dialogue, msg, settings, completion), fields(chat_id = %msg.chat.id))]
pub(crate) async fn receive_duration<C: QuizChat, G: Completion>(
    bot: C,
    dialogue: SessionDialogue,
    msg: Message,
    settings: Arc<QuizSettings>,
    completion: Arc<G>,
) -> HandlerResult {
    if let Some(text) = msg.text() {
        accept_duration(&bot, &dialogue, text, &settings, completion.as_ref()).await?;
    }
    Ok(())
}

/// Starts the quiz once a usable duration arrives; anything else is answered and ignored.
pub async fn accept_duration<C: QuizChat, G: Completion>(
    chat: &C,
    dialogue: &SessionDialogue,
    input: &str,
    settings: &QuizSettings,
    completion: &G,
) -> QuizResult<()> {
    let chat_id = dialogue.chat_id();

    let seconds = match parse_duration(input, settings) {
        Ok(seconds) => seconds,
        Err(e) => {
            log::info!("{}: invalid duration {:?}", chat_id, input);
            chat.send_text(chat_id, e.to_string()).await?;
            return Ok(());
        }
    };

    dialogue.update(SessionState::Running).await?;
    // Once Running, only run_quiz may end the session.
    if let Err(e) = chat.send_text(chat_id, BUILDING.to_owned()).await {
        log::warn!("{}: could not announce the quiz: {}", chat_id, e);
    }
    run_quiz(chat, dialogue, seconds, settings, completion).await
}

/// Turns the chat's scratch document into polls, then ends the session and removes the document.
///
/// Pipeline failures are reported to the chat and do not surface as errors; the session and
/// scratch document are cleaned up on every path.
#[instrument(level = "info", skip(chat, dialogue, settings, completion), fields(chat_id = %dialogue.chat_id()))]
pub async fn run_quiz<C: QuizChat, G: Completion>(
    chat: &C,
    dialogue: &SessionDialogue,
    seconds: u32,
    settings: &QuizSettings,
    completion: &G,
) -> QuizResult<()> {
    let chat_id = dialogue.chat_id();
    let path = scratch_path(&settings.scratch_dir, chat_id);

    let report = match publish_quiz(chat, chat_id, &path, seconds, settings, completion).await {
        Ok(count) => {
            log::info!("{}: quiz with {} questions finished", chat_id, count);
            chat.send_text(chat_id, FINISHED.to_owned()).await
        }
        Err(e) => {
            log::error!("{}: quiz failed: {}", chat_id, e);
            chat.send_text(chat_id, format!("❌ Quiz failed: {}", e)).await
        }
    };

    end_session(dialogue).await?;
    remove_scratch(&path).await;
    report
}

async fn publish_quiz<C: QuizChat, G: Completion>(
    chat: &C,
    chat_id: ChatId,
    path: &Path,
    seconds: u32,
    settings: &QuizSettings,
    completion: &G,
) -> QuizResult<usize> {
    let text = extract_text(path, settings.page_limit, settings.char_budget).await?;
    if text.trim().is_empty() {
        return Err(QuizError::EmptyDocument);
    }

    let questions = generate_questions(completion, &text, settings).await?;
    let pause = Duration::from_secs(u64::from(seconds)) + settings.pacing_buffer;

    for (i, question) in questions.iter().enumerate() {
        chat.send_quiz_poll(chat_id, question, seconds).await?;
        log::info!("{}: published question #{}", chat_id, i + 1);
        log::debug!("{}: question #{}:\n{}", chat_id, i + 1, question);
        tokio::time::sleep(pause).await;
    }

    Ok(questions.len())
}
