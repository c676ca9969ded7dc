//! Gemini adapter for question/answer extraction.
//!
//! Sends the video url as `fileData` together with a fixed instruction
//! template and a JSON response schema, then parses the returned array of
//! `{question_number, question, answer}` objects.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::Extractor;
use crate::domain::{QaTriple, SourceItem};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Instruction sent with every video. Formatting rules are enforced by the
/// service, not checked locally.
pub const INSTRUCTION: &str = "\
請根據影片畫面中的內容，擷取比賽題目與正確答案，並以 JSON 格式輸出。

JSON 結構：
- 每筆資料只包含 question_number（題目編號）、question（題目）與 answer（答案）三個欄位。
- 答案若帶有選項代號（例如「A:」「B:」），請移除代號，只保留答案文字。

文字格式：
1. 標點符號一律使用全形，不得出現 '[', ']', '{', '}' 等符號。
2. 英文與數字使用半形字元。
3. 中文與英文之間保留一個空格。
4. question 與 answer 只能包含繁體中文與英文。

只輸出 JSON，不要加入任何說明或額外文字。";

/// Extraction through the Gemini `generateContent` API
pub struct GeminiExtractor {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiExtractor {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different API root (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body(video_url: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "fileData": { "fileUri": video_url } },
                    { "text": INSTRUCTION },
                ],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "question_number": { "type": "INTEGER" },
                            "question": { "type": "STRING" },
                            "answer": { "type": "STRING" },
                        },
                        "required": ["question_number", "question", "answer"],
                    },
                },
            },
        })
    }
}

/// Pull the triples out of a `generateContent` response
fn parse_response(response: GenerateResponse) -> Result<Vec<QaTriple>> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .context("Gemini response has no candidates")?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        anyhow::bail!(
            "Gemini returned no text (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        );
    }

    serde_json::from_str(text.trim()).context("Gemini output is not a question/answer array")
}

#[async_trait]
impl Extractor for GeminiExtractor {
    fn name(&self) -> &str {
        &self.model
    }

    async fn extract(&self, item: &SourceItem) -> Result<Vec<QaTriple>> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(&item.url))
            .send()
            .await
            .context("Failed to call Gemini")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini returned {}: {}", status, body.trim());
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("Failed to decode Gemini response")?;

        parse_response(parsed)
    }
}
