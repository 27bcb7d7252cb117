use std::fmt;
use std::time::Duration;

use futures_util::StreamExt;
use labeler_core::{parse_answer, Sentiment};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ClassifyError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Instruction preamble sent in front of every row's text, including the
/// campus context the answers depend on.
pub const DEFAULT_PROMPT: &str = "你是一個簡單的情緒判斷助理，僅根據整體輸入內容判斷其情緒為正向、中性或負向。  \n\
請將整個輸入視為一個完整內容，而非逐點或逐句分析。\n\
判斷時，需有明確正向、負向詞彙才判斷成正負向，否則皆視為中性\n\
\n\
輸出結果僅為單一數字：  \n\
'1'表示正向，'0'表示中性，'-1'表示負向。\n\
禁止生成任何其他字符、逐點回應或額外內容。\n\
\n\
你所需要知道的資訊：\n\
1、小詠、大詠是宿舍的名字\n\
2、學餐是指學生餐廳，最近因為學校政策而關閉\n\
3、操場最近換了顏色\n\
\n\
請分析以下文本：\n";

const ERROR_DETAIL_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub prompt: String,
    pub generation: GenerationConfig,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_response_bytes: u64,
}

impl ClientSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            prompt: DEFAULT_PROMPT.to_string(),
            generation: GenerationConfig::default(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_response_bytes: 1024 * 1024,
        }
    }
}

// The key must never end up in logs.
impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("prompt_chars", &self.prompt.chars().count())
            .field("generation", &self.generation)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}

/// One classification request per call, no retries and no memory between calls.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn answer_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// Client for the `generateContent` endpoint of the Generative Language API.
#[derive(Debug, Clone)]
pub struct GeminiClassifier {
    settings: ClientSettings,
    endpoint: Url,
    client: reqwest::Client,
}

impl GeminiClassifier {
    pub fn new(settings: ClientSettings) -> Result<Self, ClassifyError> {
        let endpoint = build_endpoint(&settings)?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ClassifyError::transport(err.without_url().to_string()))?;
        Ok(Self {
            settings,
            endpoint,
            client,
        })
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, ClassifyError> {
        let max_bytes = self.settings.max_response_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ClassifyError::transport(format!(
                    "response too large (max {max_bytes}, actual {content_len})"
                )));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ClassifyError::transport(format!(
                    "response too large (max {max_bytes}, actual {next_len})"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

#[async_trait::async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
        let prompt = format!("{}{}", self.settings.prompt, text);
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: &prompt }],
            }],
            generation_config: &self.settings.generation,
        };
        let body = serde_json::to_vec(&request)
            .map_err(|err| ClassifyError::transport(format!("request encode error: {err}")))?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = self.read_body(response).await?;
        if !status.is_success() {
            let detail = String::from_utf8_lossy(&bytes);
            return Err(ClassifyError::transport(format!(
                "http status {status}: {}",
                truncate_chars(detail.trim(), ERROR_DETAIL_CHARS)
            )));
        }

        let envelope: GenerateResponse = serde_json::from_slice(&bytes)
            .map_err(|err| ClassifyError::transport(format!("response decode error: {err}")))?;
        let answer = envelope
            .answer_text()
            .ok_or_else(|| ClassifyError::invalid_output("response carried no candidate text"))?;

        parse_answer(answer).ok_or_else(|| {
            ClassifyError::invalid_output(format!(
                "unexpected answer {:?}",
                truncate_chars(answer, ERROR_DETAIL_CHARS)
            ))
        })
    }
}

fn build_endpoint(settings: &ClientSettings) -> Result<Url, ClassifyError> {
    let raw = format!(
        "{}/models/{}:generateContent",
        settings.base_url.trim_end_matches('/'),
        settings.model
    );
    let mut endpoint =
        Url::parse(&raw).map_err(|err| ClassifyError::transport(format!("invalid endpoint {raw}: {err}")))?;
    endpoint
        .query_pairs_mut()
        .append_pair("key", &settings.api_key);
    Ok(endpoint)
}

fn map_reqwest_error(err: reqwest::Error) -> ClassifyError {
    // The endpoint URL carries the API key; keep it out of the message.
    ClassifyError::transport(err.without_url().to_string())
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
