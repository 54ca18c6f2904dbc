use std::sync::Arc;

use teloxide::types::{Document, FileId, Message};
use tracing::instrument;

use crate::{
    chat::QuizChat,
    config::QuizSettings,
    document::scratch_path,
    error::QuizResult,
    session::{SessionDialogue, SessionState},
    HandlerResult,
};

pub(crate) const NOT_A_PDF: &str = "📄 That is not a PDF. Please send a PDF document.";
pub(crate) const DOWNLOAD_FAILED: &str = "❌ Could not download the document. Please send it again.";

/// The parts of an uploaded document the workflow cares about.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_id: FileId,
    pub size: u64,
    pub is_pdf: bool,
}

impl Upload {
    pub fn from_document(document: &Document) -> Self {
        let by_mime = document
            .mime_type
            .as_ref()
            .is_some_and(|mime| mime.essence_str() == "application/pdf");
        let by_name = document
            .file_name
            .as_deref()
            .is_some_and(|name| name.to_ascii_lowercase().ends_with(".pdf"));

        Self {
            file_id: document.file.id.clone(),
            size: u64::from(document.file.size),
            is_pdf: by_mime || by_name,
        }
    }
}

#[instrument(level = "info", skip(bot, dialogue, msg, settings), fields(chat_id = %msg.chat.id))]
pub(crate) async fn receive_document<C: QuizChat>(
    bot: C,
    dialogue: SessionDialogue,
    msg: Message,
    settings: Arc<QuizSettings>,
) -> HandlerResult {
    if let Some(document) = msg.document() {
        accept_document(&bot, &dialogue, Upload::from_document(document), &settings).await?;
    }
    Ok(())
}

/// Stores the upload as the chat's scratch document and moves on to asking for a duration.
///
/// Rejected uploads leave the session waiting for a document so the user can simply try again.
pub async fn accept_document<C: QuizChat>(
    chat: &C,
    dialogue: &SessionDialogue,
    upload: Upload,
    settings: &QuizSettings,
) -> QuizResult<()> {
    let chat_id = dialogue.chat_id();

    if !upload.is_pdf {
        log::info!("{}: rejected a non-PDF document", chat_id);
        chat.send_text(chat_id, NOT_A_PDF.to_owned()).await?;
        return Ok(());
    }

    if upload.size > settings.max_document_bytes {
        log::info!(
            "{}: rejected a {} byte document, limit is {}",
            chat_id,
            upload.size,
            settings.max_document_bytes
        );
        chat.send_text(chat_id, too_large(settings.max_document_bytes))
            .await?;
        return Ok(());
    }

    tokio::fs::create_dir_all(&settings.scratch_dir).await?;
    let path = scratch_path(&settings.scratch_dir, chat_id);
    if let Err(e) = chat.download_document(&upload.file_id, &path).await {
        log::error!("{}: download of {:?} failed: {}", chat_id, upload.file_id, e);
        chat.send_text(chat_id, DOWNLOAD_FAILED.to_owned()).await?;
        return Ok(());
    }

    log::info!("{}: stored document at {}", chat_id, path.display());
    dialogue.update(SessionState::AwaitingDuration).await?;
    chat.send_text(chat_id, ask_duration(settings.min_duration))
        .await?;
    Ok(())
}

fn ask_duration(min: u32) -> String {
    format!("⏱️ Got it! Now send the number of seconds for each question (at least {min}).")
}

fn too_large(limit: u64) -> String {
    format!(
        "❌ The document is too large. The limit is {} MiB, please send a smaller PDF.",
        limit / (1024 * 1024)
    )
}
