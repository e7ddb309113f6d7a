// src/synth/providers.rs
// LLM provider clients. Thin wrappers: one request shape per vendor, inline
// serde structs, shared trait consumed by the synthesizer.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderErrorKind};

#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError>;
    fn name(&self) -> &'static str;
}

fn build_http(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(crate::sources::USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout)
        .build()
        .expect("reqwest client")
}

fn classify_reqwest(provider: &'static str, e: reqwest::Error) -> ProviderError {
    let kind = if e.is_timeout() {
        ProviderErrorKind::Timeout
    } else {
        ProviderErrorKind::InvalidResponse
    };
    ProviderError::new(provider, kind, e.to_string())
}

fn classify_status(provider: &'static str, status: reqwest::StatusCode, body: &str) -> ProviderError {
    let kind = if status.as_u16() == 429 {
        ProviderErrorKind::QuotaExceeded
    } else {
        ProviderErrorKind::InvalidResponse
    };
    let mut snippet = body.to_string();
    snippet.truncate(snippet.char_indices().nth(200).map_or(snippet.len(), |(i, _)| i));
    ProviderError::new(provider, kind, format!("HTTP {status}: {snippet}"))
}

// ------------------------------------------------------------
// Gemini (primary)
// ------------------------------------------------------------

pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            http: build_http(timeout),
            api_key,
            model: "gemini-2.0-flash".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GenerationConfig {
            temperature: f32,
            max_output_tokens: u32,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
            generation_config: GenerationConfig,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: RespContent,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            text: String,
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                max_output_tokens: max_tokens,
            },
        };

        let resp = self
            .http
            .post(url)
            .json(&req)
            .send()
            .await
            .map_err(|e| classify_reqwest(self.name(), e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(self.name(), status, &body));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| classify_reqwest(self.name(), e))?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ProviderError::new(
                self.name(),
                ProviderErrorKind::InvalidResponse,
                "empty candidates",
            ));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Mistral (fallback)
// ------------------------------------------------------------

pub struct MistralProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl MistralProvider {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            http: build_http(timeout),
            api_key,
            model: "mistral-small-latest".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for MistralProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: 0.3,
            max_tokens,
        };

        let resp = self
            .http
            .post("https://api.mistral.ai/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| classify_reqwest(self.name(), e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(self.name(), status, &body));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| classify_reqwest(self.name(), e))?;
        let text = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ProviderError::new(
                self.name(),
                ProviderErrorKind::InvalidResponse,
                "empty choices",
            ));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "mistral"
    }
}

// ------------------------------------------------------------
// Scripted provider for tests and local dry runs
// ------------------------------------------------------------

/// Replays a scripted sequence of outcomes, then repeats the last one.
pub struct MockProvider {
    name: &'static str,
    script: Mutex<VecDeque<Result<String, ProviderErrorKind>>>,
    pub calls: Mutex<u32>,
}

impl MockProvider {
    pub fn scripted(
        name: &'static str,
        script: Vec<Result<String, ProviderErrorKind>>,
    ) -> Self {
        Self {
            name,
            script: Mutex::new(script.into_iter().collect()),
            calls: Mutex::new(0),
        }
    }

    pub fn always_ok(name: &'static str, text: &str) -> Self {
        Self::scripted(name, vec![Ok(text.to_string())])
    }

    pub fn always_failing(name: &'static str, kind: ProviderErrorKind) -> Self {
        Self::scripted(name, vec![Err(kind)])
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().expect("mock counter poisoned")
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, ProviderError> {
        *self.calls.lock().expect("mock counter poisoned") += 1;
        let mut script = self.script.lock().expect("mock script poisoned");
        let next = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap_or(Err(ProviderErrorKind::InvalidResponse))
        };
        next.map_err(|kind| ProviderError::new(self.name, kind, "scripted failure"))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
