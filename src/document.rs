use std::path::{Path, PathBuf};

use lopdf::Document;
use teloxide::types::ChatId;
use tracing::instrument;

use crate::error::QuizResult;

/// Scratch location of the document a chat is currently turning into a quiz.
pub fn scratch_path(scratch_dir: &Path, chat_id: ChatId) -> PathBuf {
    scratch_dir.join(format!("quiz-{}.pdf", chat_id.0))
}

/// Deletes the scratch document if there is one.
pub async fn remove_scratch(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::debug!("Removed scratch document {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove scratch document {}: {}", path.display(), e),
    }
}

/// Reads the text of the first `page_limit` pages and keeps at most `char_budget` characters.
#[instrument(level = "debug")]
pub async fn extract_text(path: &Path, page_limit: usize, char_budget: usize) -> QuizResult<String> {
    let path = path.to_owned();
    tokio::task::spawn_blocking(move || extract_text_blocking(&path, page_limit, char_budget))
        .await?
}

fn extract_text_blocking(path: &Path, page_limit: usize, char_budget: usize) -> QuizResult<String> {
    let bytes = std::fs::read(path)?;
    let document = Document::load_mem(&bytes)?;

    let mut text = String::new();
    for page_number in document.get_pages().into_keys().take(page_limit) {
        match document.extract_text(&[page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => log::debug!("Page {} has no extractable text: {}", page_number, e),
        }
        if text.chars().count() >= char_budget {
            break;
        }
    }

    Ok(truncate_chars(text, char_budget))
}

pub(crate) fn truncate_chars(mut text: String, char_budget: usize) -> String {
    if let Some((byte_idx, _)) = text.char_indices().nth(char_budget) {
        text.truncate(byte_idx);
    }
    text
}
