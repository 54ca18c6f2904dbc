use std::{future::Future, path::Path};

use teloxide::{
    net::Download,
    prelude::Requester,
    types::{ChatId, FileId, InputPollOption, PollType},
    Bot,
};
use tokio::fs::File;

use crate::{error::QuizResult, quiz::Question};

/// Outbound side of the bot: everything the workflow asks of the chat platform.
pub trait QuizChat: Clone + Send + Sync + 'static {
    fn send_text(
        &self,
        chat_id: ChatId,
        text: String,
    ) -> impl Future<Output = QuizResult<()>> + Send;

    /// Publishes a non-anonymous quiz poll that closes itself after `open_period` seconds.
    fn send_quiz_poll(
        &self,
        chat_id: ChatId,
        question: &Question,
        open_period: u32,
    ) -> impl Future<Output = QuizResult<()>> + Send;

    /// Fetches an uploaded file into `destination`, replacing whatever is there.
    fn download_document(
        &self,
        file_id: &FileId,
        destination: &Path,
    ) -> impl Future<Output = QuizResult<()>> + Send;
}

impl QuizChat for Bot {
    async fn send_text(&self, chat_id: ChatId, text: String) -> QuizResult<()> {
        self.send_message(chat_id, text).await?;
        Ok(())
    }

    async fn send_quiz_poll(
        &self,
        chat_id: ChatId,
        question: &Question,
        open_period: u32,
    ) -> QuizResult<()> {
        let options: Vec<InputPollOption> = question
            .options()
            .iter()
            .cloned()
            .map(InputPollOption::new)
            .collect();

        let mut req = self.send_poll(chat_id, question.text().to_owned(), options);
        req.type_ = Some(PollType::Quiz);
        req.is_anonymous = Some(false);
        req.correct_option_id = Some(question.correct_option() as u8);
        // Durations never exceed 600 seconds here.
        let open_period = u16::try_from(open_period).unwrap_or(u16::MAX);
        req.open_period = Some(open_period.into());

        req.await?;
        Ok(())
    }

    async fn download_document(&self, file_id: &FileId, destination: &Path) -> QuizResult<()> {
        let file = self.get_file(file_id.clone()).await?;
        let mut dst = File::create(destination).await?;
        self.download_file(&file.path, &mut dst).await?;
        dst.sync_all().await?;
        Ok(())
    }
}
