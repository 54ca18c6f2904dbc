//! In-memory stand-ins for the chat platform and the model.
//!
//! Enabled with the `test-support` feature:
//!
//! ```toml
//! [dev-dependencies]
//! pdfquizbot = { path = ".", features = ["test-support"] }
//! ```

use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, Stream,
};
use teloxide::types::{ChatId, FileId};
use tokio::time::Instant;

use crate::{
    chat::QuizChat,
    error::{QuizError, QuizResult},
    generator::Completion,
    quiz::Question,
};

#[derive(Debug, Clone)]
pub enum Sent {
    Text(String),
    Poll {
        question: Question,
        open_period: u32,
        at: Instant,
    },
}

/// Records everything sent and serves `document` for every download.
#[derive(Clone, Default)]
pub struct RecordingChat {
    sent: Arc<Mutex<Vec<Sent>>>,
    document: Arc<Vec<u8>>,
    fail_polls: bool,
    rejected_text: Option<Arc<str>>,
}

impl RecordingChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serving(document: Vec<u8>) -> Self {
        Self {
            document: Arc::new(document),
            ..Self::default()
        }
    }

    pub fn failing_polls() -> Self {
        Self {
            fail_polls: true,
            ..Self::default()
        }
    }

    /// Fails every attempt to send exactly `text`, the way Telegram does when rate limited.
    pub fn rejecting_text(mut self, text: &str) -> Self {
        self.rejected_text = Some(Arc::from(text));
        self
    }

    pub fn document(&self) -> &[u8] {
        &self.document
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Text(text) => Some(text),
                Sent::Poll { .. } => None,
            })
            .collect()
    }

    pub fn polls(&self) -> Vec<(Question, u32, Instant)> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Poll {
                    question,
                    open_period,
                    at,
                } => Some((question, open_period, at)),
                Sent::Text(_) => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }
}

impl QuizChat for RecordingChat {
    async fn send_text(&self, _chat_id: ChatId, text: String) -> QuizResult<()> {
        if self.rejected_text.as_deref() == Some(text.as_str()) {
            return Err(QuizError::Io(std::io::Error::other("429 Too Many Requests")));
        }
        self.sent.lock().unwrap().push(Sent::Text(text));
        Ok(())
    }

    async fn send_quiz_poll(
        &self,
        _chat_id: ChatId,
        question: &Question,
        open_period: u32,
    ) -> QuizResult<()> {
        if self.fail_polls {
            return Err(QuizError::Io(std::io::Error::other("poll rejected")));
        }
        self.sent.lock().unwrap().push(Sent::Poll {
            question: question.clone(),
            open_period,
            at: Instant::now(),
        });
        Ok(())
    }

    async fn download_document(&self, _file_id: &FileId, destination: &Path) -> QuizResult<()> {
        tokio::fs::write(destination, self.document.as_slice()).await?;
        Ok(())
    }
}

/// Answers every prompt with the same reply and counts the calls.
#[derive(Default)]
pub struct StubCompletion {
    reply: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubCompletion {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Completion for StubCompletion {
    async fn complete(&self, prompt: String) -> QuizResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt);
        Ok(self.reply.clone())
    }
}

/// A PDF with one page of Courier text per entry in `pages`.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
