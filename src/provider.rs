//! Provider configuration and the static backend catalog.

use serde::{Deserialize, Serialize};

/// The interchangeable text-generation backends.
///
/// Two cloud APIs and two local inference servers; each has its own HTTP
/// call shape in `llm::backend`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "lmstudio")]
    LmStudio,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAI,
        ProviderKind::Anthropic,
        ProviderKind::Ollama,
        ProviderKind::LmStudio,
    ];

    pub fn parse(name: &str) -> Option<ProviderKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(ProviderKind::OpenAI),
            "anthropic" => Some(ProviderKind::Anthropic),
            "ollama" => Some(ProviderKind::Ollama),
            "lmstudio" | "lm_studio" => Some(ProviderKind::LmStudio),
            _ => None,
        }
    }

    /// Stable catalog key.
    pub fn key(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
            ProviderKind::LmStudio => "lmstudio",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Ollama => "Ollama",
            ProviderKind::LmStudio => "LM Studio",
        }
    }

    /// Local servers get a short connect timeout; cloud APIs require a key.
    pub fn is_local(&self) -> bool {
        matches!(self, ProviderKind::Ollama | ProviderKind::LmStudio)
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "https://api.openai.com/v1/chat/completions",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1/messages",
            ProviderKind::Ollama => "http://127.0.0.1:11434/api/generate",
            ProviderKind::LmStudio => "http://127.0.0.1:1234/v1/chat/completions",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-sonnet-20241022",
            ProviderKind::Ollama => "codellama:7b",
            ProviderKind::LmStudio => "qwen2.5-coder-7b-instruct",
        }
    }
}

/// Per-request backend selection. Nothing here is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ProviderConfig {
    pub fn for_kind(kind: ProviderKind) -> Self {
        Self {
            kind,
            model: kind.default_model().to_string(),
            base_url: None,
            api_key: None,
        }
    }

    /// Request URL: caller override or the provider default.
    pub fn endpoint(&self) -> String {
        self.base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.kind.default_base_url().to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    /// Approximate on-disk footprint; only meaningful for local models.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub key: &'static str,
    pub name: &'static str,
    pub default_endpoint: &'static str,
    pub default_model: &'static str,
    pub local: bool,
    pub models: Vec<ModelInfo>,
}

/// Static provider catalog served by `GET /api/providers`.
pub fn catalog() -> Vec<CatalogEntry> {
    ProviderKind::ALL
        .iter()
        .map(|kind| CatalogEntry {
            key: kind.key(),
            name: kind.display_name(),
            default_endpoint: kind.default_base_url(),
            default_model: kind.default_model(),
            local: kind.is_local(),
            models: known_models(*kind),
        })
        .collect()
}

fn known_models(kind: ProviderKind) -> Vec<ModelInfo> {
    match kind {
        ProviderKind::OpenAI => vec![
            model("gpt-4o", None),
            model("gpt-4o-mini", None),
            model("gpt-4-turbo", None),
        ],
        ProviderKind::Anthropic => vec![
            model("claude-3-5-sonnet-20241022", None),
            model("claude-3-5-haiku-20241022", None),
            model("claude-3-opus-20240229", None),
        ],
        ProviderKind::Ollama => vec![
            model("codellama:7b", Some("3.8 GB")),
            model("llama3.1:8b", Some("4.9 GB")),
            model("qwen2.5-coder:7b", Some("4.7 GB")),
            model("deepseek-coder:6.7b", Some("3.8 GB")),
        ],
        ProviderKind::LmStudio => vec![
            model("qwen2.5-coder-7b-instruct", Some("4.7 GB")),
            model("meta-llama-3.1-8b-instruct", Some("4.9 GB")),
            model("mistral-7b-instruct-v0.3", Some("4.1 GB")),
        ],
    }
}

fn model(id: &'static str, memory: Option<&'static str>) -> ModelInfo {
    ModelInfo { id, memory }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_the_four_known_providers() {
        let keys: Vec<&str> = catalog().iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["openai", "anthropic", "ollama", "lmstudio"]);
    }

    #[test]
    fn parse_round_trips_every_kind() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::parse(kind.key()), Some(kind));
        }
        assert_eq!(ProviderKind::parse("LM_Studio"), Some(ProviderKind::LmStudio));
        assert_eq!(ProviderKind::parse("cohere"), None);
    }

    #[test]
    fn serde_wire_names_match_catalog_keys() {
        for kind in ProviderKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.key()));
        }
    }

    #[test]
    fn only_local_providers_report_memory_footprints() {
        for entry in catalog() {
            if entry.local {
                assert!(entry.models.iter().all(|m| m.memory.is_some()));
            } else {
                assert!(entry.models.iter().all(|m| m.memory.is_none()));
            }
        }
    }

    #[test]
    fn endpoint_prefers_caller_override() {
        let mut cfg = ProviderConfig::for_kind(ProviderKind::Ollama);
        assert_eq!(cfg.endpoint(), "http://127.0.0.1:11434/api/generate");

        cfg.base_url = Some("http://10.0.0.5:11434/api/generate".into());
        assert_eq!(cfg.endpoint(), "http://10.0.0.5:11434/api/generate");

        cfg.base_url = Some("   ".into());
        assert_eq!(cfg.endpoint(), "http://127.0.0.1:11434/api/generate");
    }
}
