use std::{sync::Mutex, time::Duration};

use pdfquizbot::{
    commands::begin_session,
    config::QuizSettings,
    document::{extract_text, scratch_path},
    error::QuizResult,
    generator::Completion,
    ingest::{accept_document, Upload},
    mocks::{pdf_with_pages as pdf, RecordingChat, Sent},
    runner::accept_duration,
    session::{SessionDialogue, SessionState, SessionStorage},
};
use teloxide::types::{ChatId, FileId};

const GROUP: ChatId = ChatId(-1001234567890);

/// Answers from the prompt, so the quiz really depends on the document text.
struct EchoModel {
    prompts: Mutex<Vec<String>>,
}

impl EchoModel {
    fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl Completion for EchoModel {
    async fn complete(&self, prompt: String) -> QuizResult<String> {
        let knows_paris = prompt.contains("Paris");
        self.prompts.lock().unwrap().push(prompt);

        let reply = if knows_paris {
            r#"Here you go:
```json
[{"question": "What is the capital of France?", "options": ["Lyon", "Marseille", "Paris", "Nice"], "answer": 2}]
```"#
        } else {
            "[]"
        };
        Ok(reply.to_owned())
    }
}

fn settings(dir: &std::path::Path) -> QuizSettings {
    QuizSettings {
        scratch_dir: dir.to_owned(),
        ..QuizSettings::default()
    }
}

#[tokio::test(start_paused = true)]
async fn group_turns_a_pdf_into_a_quiz() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let document = pdf(&["Capital of France is Paris."]);
    let chat = RecordingChat::serving(document.clone());
    let model = EchoModel::new();
    let storage = SessionStorage::new();
    let dialogue = SessionDialogue::new(storage.clone(), GROUP);

    begin_session(&chat, &dialogue, true, &settings).await.unwrap();
    assert_eq!(
        dialogue.get().await.unwrap(),
        Some(SessionState::AwaitingDocument)
    );

    let upload = Upload {
        file_id: FileId("BQACAgQAAxkBAAIC".to_owned()),
        size: document.len() as u64,
        is_pdf: true,
    };
    accept_document(&chat, &dialogue, upload, &settings)
        .await
        .unwrap();
    assert_eq!(
        dialogue.get().await.unwrap(),
        Some(SessionState::AwaitingDuration)
    );
    assert!(scratch_path(dir.path(), GROUP).exists());

    let started = tokio::time::Instant::now();
    accept_duration(&chat, &dialogue, "15", &settings, &model)
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_secs(15 + 2));

    let events = chat.sent();
    let polls: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            Sent::Poll {
                question,
                open_period,
                ..
            } => Some((question, *open_period)),
            Sent::Text(_) => None,
        })
        .collect();
    assert_eq!(polls.len(), 1);
    let (question, open_period) = polls[0];
    assert!(question.text().contains("France"));
    assert_eq!(question.options().len(), 4);
    assert_eq!(question.correct_answer(), "Paris");
    assert_eq!(open_period, 15);

    match events.last() {
        Some(Sent::Text(text)) => assert!(text.contains("Quiz finished")),
        other => panic!("expected a completion message, got {other:?}"),
    }

    assert_eq!(dialogue.get().await.unwrap(), None);
    assert!(!scratch_path(dir.path(), GROUP).exists());
    assert!(model.prompts.lock().unwrap()[0].contains("Capital of France is Paris."));
}

#[tokio::test]
async fn extraction_respects_page_limit_and_budget() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    let pages: Vec<String> = (1..=8).map(|n| format!("PAGE{n} {}", "x".repeat(900))).collect();
    let page_refs: Vec<&str> = pages.iter().map(String::as_str).collect();
    std::fs::write(&path, pdf(&page_refs)).unwrap();

    let text = extract_text(&path, 5, 3000).await.unwrap();
    assert!(text.chars().count() <= 3000);
    assert!(text.contains("PAGE1"));
    assert!(!text.contains("PAGE5"));

    let roomy = extract_text(&path, 3, 100_000).await.unwrap();
    assert!(roomy.contains("PAGE3"));
    assert!(!roomy.contains("PAGE4"));
}

#[tokio::test]
async fn concurrent_chats_keep_their_own_documents() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let storage = SessionStorage::new();

    let first = SessionDialogue::new(storage.clone(), ChatId(-1));
    let second = SessionDialogue::new(storage.clone(), ChatId(-2));
    let first_chat = RecordingChat::serving(pdf(&["Capital of France is Paris."]));
    let second_chat = RecordingChat::serving(pdf(&["Photosynthesis needs light."]));

    for (chat, dialogue) in [(&first_chat, &first), (&second_chat, &second)] {
        begin_session(chat, dialogue, true, &settings).await.unwrap();
        let upload = Upload {
            file_id: FileId("id".to_owned()),
            size: chat.document().len() as u64,
            is_pdf: true,
        };
        accept_document(chat, dialogue, upload, &settings).await.unwrap();
    }

    let first_text = extract_text(&scratch_path(dir.path(), ChatId(-1)), 5, 3000)
        .await
        .unwrap();
    let second_text = extract_text(&scratch_path(dir.path(), ChatId(-2)), 5, 3000)
        .await
        .unwrap();
    assert!(first_text.contains("Paris"));
    assert!(second_text.contains("Photosynthesis"));
    assert!(!second_text.contains("Paris"));
}

#[tokio::test]
async fn model_without_questions_ends_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let chat = RecordingChat::serving(pdf(&["Nothing about capitals here."]));
    let model = EchoModel::new();
    let dialogue = SessionDialogue::new(SessionStorage::new(), GROUP);

    begin_session(&chat, &dialogue, true, &settings).await.unwrap();
    let upload = Upload {
        file_id: FileId("id".to_owned()),
        size: 1024,
        is_pdf: true,
    };
    accept_document(&chat, &dialogue, upload, &settings).await.unwrap();
    accept_duration(&chat, &dialogue, "10", &settings, &model)
        .await
        .unwrap();

    let events = chat.sent();
    assert!(events.iter().all(|event| matches!(event, Sent::Text(_))));
    match events.last() {
        Some(Sent::Text(text)) => assert!(text.contains("model returned no questions")),
        other => panic!("expected an error message, got {other:?}"),
    }
    assert_eq!(dialogue.get().await.unwrap(), None);
    assert!(!scratch_path(dir.path(), GROUP).exists());
}
