//! Service configuration.
//!
//! Optional TOML file under the user config directory, then environment
//! overrides. Everything has a default; a missing or malformed file is
//! not an error.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

use crate::provider::ProviderKind;

#[derive(Debug, Deserialize)]
struct FileConfig {
    server: Option<ServerSection>,
    scripts: Option<ScriptsSection>,
    llm: Option<LlmSection>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    listen: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScriptsSection {
    analyzer: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen: SocketAddr,
    pub analyzer_script: PathBuf,
    /// Used when a request does not select a provider.
    pub default_provider: ProviderKind,
    pub default_model: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8085)),
            analyzer_script: PathBuf::from("scripts/analyze_repo.py"),
            default_provider: ProviderKind::OpenAI,
            default_model: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Self {
        let mut cfg = Self::default();
        if let Some(file) = load_file() {
            cfg.apply_file(file);
        }
        cfg.apply_env();
        cfg
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(listen) = file.server.and_then(|s| s.listen) {
            match listen.parse() {
                Ok(addr) => self.listen = addr,
                Err(err) => warn!(%err, %listen, "invalid [server].listen, keeping default"),
            }
        }
        if let Some(script) = file.scripts.and_then(|s| s.analyzer) {
            self.analyzer_script = script;
        }
        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                match ProviderKind::parse(&provider) {
                    Some(kind) => self.default_provider = kind,
                    None => warn!(%provider, "unknown [llm].provider, keeping default"),
                }
            }
            self.default_model = llm.model.filter(|m| !m.trim().is_empty());
        }
    }

    fn apply_env(&mut self) {
        if let Ok(listen) = env::var("GTESTSMITH_LISTEN") {
            match listen.parse() {
                Ok(addr) => self.listen = addr,
                Err(err) => warn!(%err, %listen, "invalid GTESTSMITH_LISTEN, keeping default"),
            }
        }
        if let Ok(script) = env::var("GTESTSMITH_ANALYZER") {
            self.analyzer_script = PathBuf::from(script);
        }
    }
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gtestsmith")
        .join("config.toml")
}

fn load_file() -> Option<FileConfig> {
    let raw = fs::read_to_string(config_path()).ok()?;
    match toml::from_str(&raw) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            warn!(%err, "ignoring malformed config file");
            None
        }
    }
}
