//! Chat-completions client for question generation.
//!
//! One request per quiz, a single user message and a fixed temperature.
//! The API key never reaches the logs; only model name, latency and token usage do.

use std::time::Instant;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    config::OpenAiConfig,
    error::{QuizError, QuizResult},
    generator::Completion,
};

#[derive(Clone)]
pub struct OpenAi {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAi {
    pub fn new(config: &OpenAiConfig) -> QuizResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessageReq {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        }
    }
}

impl Completion for OpenAi {
    #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: String) -> QuizResult<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let started = Instant::now();

        let res = self
            .client
            .post(&url)
            .header(USER_AGENT, concat!("pdfquizbot/", env!("CARGO_PKG_VERSION")))
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&self.request(&prompt))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = extract_openai_error(&body).unwrap_or(body);
            log::error!("Model request failed with HTTP {}", status);
            return Err(QuizError::Model {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatCompletionResponse = res.json().await?;
        if let Some(usage) = &body.usage {
            log::info!(
                "Model usage: prompt_tokens={:?} completion_tokens={:?} total_tokens={:?}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }
        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        log::info!(
            "Model replied with {} bytes in {:?}",
            text.len(),
            started.elapsed()
        );
        Ok(text)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessageReq<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessageReq<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResp,
}

#[derive(Deserialize)]
struct ChatMessageResp {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
    #[serde(default)]
    total_tokens: Option<u32>,
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct EWrap {
        error: EObj,
    }
    #[derive(Deserialize)]
    struct EObj {
        message: String,
    }

    serde_json::from_str::<EWrap>(body)
        .ok()
        .map(|wrap| wrap.error.message)
}
