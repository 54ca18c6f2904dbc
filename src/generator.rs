use std::future::Future;

use serde_json::Value;
use tracing::instrument;

use crate::{
    config::QuizSettings,
    error::{QuizError, QuizResult},
    quiz::{Question, MAX_OPTION_CHARS, MAX_QUESTION_CHARS, OPTION_COUNT},
};

/// A text completion service that answers one prompt with one reply.
pub trait Completion: Send + Sync + 'static {
    fn complete(&self, prompt: String) -> impl Future<Output = QuizResult<String>> + Send;
}

pub(crate) fn build_prompt(text: &str, settings: &QuizSettings) -> String {
    format!(
        r#"Create {count} multiple-choice questions in {language} from the text below.
Every question must have exactly {options} options.
Give the index of the correct option (0-{last}).
Keep each question under {question_chars} characters and each option under {option_chars}.
Return only JSON, no explanations and no code fences.

Format:
[
 {{
  "question": "",
  "options": ["", "", "", ""],
  "answer": 0
 }}
]

Text:
{text}
"#,
        count = settings.question_count,
        language = settings.language,
        options = OPTION_COUNT,
        last = OPTION_COUNT - 1,
        question_chars = MAX_QUESTION_CHARS,
        option_chars = MAX_OPTION_CHARS,
        text = text,
    )
}

/// Asks the model for questions about `text` and returns them in the order given.
#[instrument(level = "info", skip(completion, text, settings), fields(text_len = text.len()))]
pub async fn generate_questions<C: Completion>(
    completion: &C,
    text: &str,
    settings: &QuizSettings,
) -> QuizResult<Vec<Question>> {
    let reply = completion.complete(build_prompt(text, settings)).await?;
    let questions = parse_questions(&reply)?;
    log::info!("Model produced {} questions", questions.len());
    Ok(questions)
}

/// Pulls the JSON array out of a model reply, tolerating code fences and surrounding prose.
pub fn sanitize_reply(reply: &str) -> QuizResult<&str> {
    let mut body = reply.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.strip_prefix("json").unwrap_or(rest);
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }

    match (body.find('['), body.rfind(']')) {
        (Some(start), Some(end)) if start < end => Ok(&body[start..=end]),
        _ => Err(QuizError::NoJsonArray),
    }
}

pub fn parse_questions(reply: &str) -> QuizResult<Vec<Question>> {
    let items: Vec<Value> = serde_json::from_str(sanitize_reply(reply)?)?;
    if items.is_empty() {
        return Err(QuizError::NoQuestions);
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| validate_question(i + 1, item))
        .collect()
}

fn validate_question(position: usize, item: &Value) -> QuizResult<Question> {
    let object = item
        .as_object()
        .ok_or_else(|| QuizError::malformed(position, "not an object"))?;

    let text = object
        .get("question")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| QuizError::malformed(position, "missing question text"))?;
    if text.chars().count() > MAX_QUESTION_CHARS {
        return Err(QuizError::malformed(
            position,
            format!("question is longer than {} characters", MAX_QUESTION_CHARS),
        ));
    }

    let options = object
        .get("options")
        .and_then(Value::as_array)
        .ok_or_else(|| QuizError::malformed(position, "missing options"))?;
    if options.len() != OPTION_COUNT {
        return Err(QuizError::malformed(
            position,
            format!("expected {} options, got {}", OPTION_COUNT, options.len()),
        ));
    }
    let options = options
        .iter()
        .map(|option| {
            option
                .as_str()
                .map(str::trim)
                .filter(|option| !option.is_empty())
                .map(str::to_owned)
        })
        .collect::<Option<Vec<String>>>()
        .ok_or_else(|| QuizError::malformed(position, "options must be non-empty strings"))?;
    if options
        .iter()
        .any(|option| option.chars().count() > MAX_OPTION_CHARS)
    {
        return Err(QuizError::malformed(
            position,
            format!("an option is longer than {} characters", MAX_OPTION_CHARS),
        ));
    }

    let answer = object
        .get("answer")
        .and_then(Value::as_u64)
        .ok_or_else(|| QuizError::malformed(position, "missing answer index"))?;
    if answer >= OPTION_COUNT as u64 {
        return Err(QuizError::malformed(
            position,
            format!("answer index {} is out of range", answer),
        ));
    }

    Ok(Question::new(text.to_owned(), options, answer as u8))
}
