// src/llm/backend.rs

use std::time::Duration;

use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::llm::prompt::LlmPrompt;
use crate::provider::{ProviderConfig, ProviderKind};

const PROMPT_VERSION: &str = "v1-gtest-stages";

const CLOUD_TIMEOUT: Duration = Duration::from_secs(60);
const LOCAL_TIMEOUT: Duration = Duration::from_secs(30);
const LOCAL_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const BODY_LIMIT: usize = 2_000;

#[derive(Debug, Clone)]
pub struct LlmRunResult {
    pub text: String,
    pub prompt_hash: String,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0} requires an API key")]
    MissingApiKey(&'static str),

    #[error("request failed: {0}")]
    Http(String),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not parse backend response: {0}")]
    Parse(String),

    #[error("backend returned an empty completion")]
    Empty,
}

/// Execute one generation request against the selected backend.
///
/// One shot: a failure here is final, the caller decides whether to fall
/// back to placeholder output.
pub async fn run(cfg: &ProviderConfig, prompt: &LlmPrompt) -> Result<LlmRunResult, BackendError> {
    let (url, headers, body) = build_request(cfg, prompt)?;

    let timeout = if cfg.kind.is_local() {
        LOCAL_TIMEOUT
    } else {
        CLOUD_TIMEOUT
    };
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if cfg.kind.is_local() {
        builder = builder.connect_timeout(LOCAL_CONNECT_TIMEOUT);
    }
    let client = builder.build().map_err(|e| BackendError::Http(e.to_string()))?;

    let mut req = client.post(url).json(&body);
    for (k, v) in headers {
        req = req.header(k, v);
    }

    let resp = req.send().await.map_err(|e| BackendError::Http(e.to_string()))?;
    let status = resp.status();
    let json: Value = resp
        .json()
        .await
        .map_err(|e| BackendError::Parse(e.to_string()))?;

    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            body: truncate(&json.to_string(), BODY_LIMIT),
        });
    }

    let text = extract_text(cfg.kind, &json)?;
    if text.trim().is_empty() {
        return Err(BackendError::Empty);
    }

    Ok(LlmRunResult {
        text,
        prompt_hash: hash_prompt(prompt),
    })
}

fn hash_prompt(prompt: &LlmPrompt) -> String {
    let mut h = Sha256::new();
    h.update(PROMPT_VERSION.as_bytes());
    h.update(prompt.system.as_bytes());
    h.update(prompt.user.as_bytes());
    hex::encode(h.finalize())
}

/* ============================================================
   Per-provider call shapes
   ============================================================ */

type RequestParts = (String, Vec<(&'static str, String)>, Value);

fn build_request(cfg: &ProviderConfig, prompt: &LlmPrompt) -> Result<RequestParts, BackendError> {
    match cfg.kind {
        ProviderKind::OpenAI => {
            let key = require_key(cfg, "openai")?;
            Ok((
                cfg.endpoint(),
                vec![("Authorization", format!("Bearer {}", key))],
                chat_body(cfg, prompt),
            ))
        }

        ProviderKind::Anthropic => {
            let key = require_key(cfg, "anthropic")?;
            let body = serde_json::json!({
                "model": cfg.model,
                "max_tokens": 4096,
                "system": prompt.system,
                "messages": [
                    { "role": "user", "content": prompt.user }
                ]
            });
            Ok((
                cfg.endpoint(),
                vec![
                    ("x-api-key", key),
                    ("anthropic-version", "2023-06-01".into()),
                ],
                body,
            ))
        }

        ProviderKind::Ollama => {
            let body = serde_json::json!({
                "model": cfg.model,
                "prompt": format!("{}\n\n{}", prompt.system, prompt.user),
                "stream": false,
                "options": { "temperature": 0.2 }
            });
            Ok((cfg.endpoint(), Vec::new(), body))
        }

        // OpenAI-compatible server; a key is accepted but not required.
        ProviderKind::LmStudio => {
            let mut headers = Vec::new();
            if let Some(key) = cfg.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
                headers.push(("Authorization", format!("Bearer {}", key)));
            }
            Ok((cfg.endpoint(), headers, chat_body(cfg, prompt)))
        }
    }
}

fn chat_body(cfg: &ProviderConfig, prompt: &LlmPrompt) -> Value {
    serde_json::json!({
        "model": cfg.model,
        "messages": [
            { "role": "system", "content": prompt.system },
            { "role": "user", "content": prompt.user }
        ],
        "temperature": 0.2
    })
}

fn require_key(cfg: &ProviderConfig, name: &'static str) -> Result<String, BackendError> {
    cfg.api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or(BackendError::MissingApiKey(name))
}

fn extract_text(kind: ProviderKind, v: &Value) -> Result<String, BackendError> {
    let text = match kind {
        ProviderKind::OpenAI | ProviderKind::LmStudio => v
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str),

        ProviderKind::Anthropic => v.pointer("/content/0/text").and_then(Value::as_str),

        ProviderKind::Ollama => v.get("response").and_then(Value::as_str),
    };

    text.map(str::to_owned)
        .ok_or_else(|| BackendError::Parse(format!("{} response missing completion text", kind.key())))
}

fn truncate(s: &str, n: usize) -> String {
    if s.chars().count() <= n {
        s.to_string()
    } else {
        let head: String = s.chars().take(n).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::prompt::{build_prompt, StageContext};
    use crate::stage::Stage;

    fn test_prompt() -> LlmPrompt {
        let ctx = StageContext {
            source: "class Widget {};",
            ..Default::default()
        };
        build_prompt(Stage::Generate, &ctx)
    }

    #[test]
    fn openai_without_key_is_rejected() {
        let cfg = ProviderConfig::for_kind(ProviderKind::OpenAI);
        let err = build_request(&cfg, &test_prompt()).unwrap_err();
        assert!(matches!(err, BackendError::MissingApiKey("openai")));
    }

    #[test]
    fn anthropic_shape_carries_version_header_and_system_field() {
        let mut cfg = ProviderConfig::for_kind(ProviderKind::Anthropic);
        cfg.api_key = Some("sk-test".into());
        let (url, headers, body) = build_request(&cfg, &test_prompt()).unwrap();
        assert_eq!(url, "https://api.anthropic.com/v1/messages");
        assert!(headers.iter().any(|(k, _)| *k == "anthropic-version"));
        assert!(body["system"].as_str().unwrap().contains("Google Test"));
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn ollama_shape_inlines_the_system_prompt() {
        let cfg = ProviderConfig::for_kind(ProviderKind::Ollama);
        let (url, headers, body) = build_request(&cfg, &test_prompt()).unwrap();
        assert_eq!(url, "http://127.0.0.1:11434/api/generate");
        assert!(headers.is_empty());
        assert_eq!(body["stream"], false);
        assert!(body["prompt"].as_str().unwrap().contains("class Widget"));
    }

    #[test]
    fn lmstudio_key_is_optional() {
        let mut cfg = ProviderConfig::for_kind(ProviderKind::LmStudio);
        cfg.base_url = Some("http://127.0.0.1:9999/v1/chat/completions".into());
        let (url, headers, body) = build_request(&cfg, &test_prompt()).unwrap();
        assert_eq!(url, "http://127.0.0.1:9999/v1/chat/completions");
        assert!(headers.is_empty());
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[test]
    fn extract_text_handles_all_response_shapes() {
        let openai = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "TEST(A, B) {}" } }]
        });
        assert_eq!(
            extract_text(ProviderKind::OpenAI, &openai).unwrap(),
            "TEST(A, B) {}"
        );
        assert_eq!(
            extract_text(ProviderKind::LmStudio, &openai).unwrap(),
            "TEST(A, B) {}"
        );

        let anthropic = serde_json::json!({
            "content": [{ "type": "text", "text": "TEST(C, D) {}" }]
        });
        assert_eq!(
            extract_text(ProviderKind::Anthropic, &anthropic).unwrap(),
            "TEST(C, D) {}"
        );

        let ollama = serde_json::json!({ "response": "TEST(E, F) {}", "done": true });
        assert_eq!(
            extract_text(ProviderKind::Ollama, &ollama).unwrap(),
            "TEST(E, F) {}"
        );
    }

    #[test]
    fn extract_text_reports_malformed_responses() {
        let garbage = serde_json::json!({ "unexpected": true });
        assert!(extract_text(ProviderKind::OpenAI, &garbage).is_err());
        assert!(extract_text(ProviderKind::Ollama, &garbage).is_err());
    }

    #[test]
    fn prompt_hash_is_stable_for_identical_prompts() {
        let a = hash_prompt(&test_prompt());
        let b = hash_prompt(&test_prompt());
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
