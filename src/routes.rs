//! JSON request handlers.
//!
//! Every handler is stateless apart from the immutable app config; clients
//! sequence the pipeline stages themselves by feeding each stage's output
//! into the next request.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analyzer;
use crate::error::ServiceError;
use crate::llm::{backend, fallback, prompt};
use crate::provider::{self, ProviderConfig, ProviderKind};
use crate::samples;
use crate::server::AppState;
use crate::stage::Stage;

/* ============================================================
   Request / response types
   ============================================================ */

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// One of `generate`, `refine`, `build_fix`, `coverage`.
    pub stage: String,

    /// Raw C++ source text.
    #[serde(default)]
    pub source: Option<String>,

    /// Alternative to `source`: a set of named files.
    #[serde(default)]
    pub files: Option<Vec<SourceFile>>,

    /// Alternative to `source`: a repository to clone and summarize.
    #[serde(default)]
    pub repo_url: Option<String>,

    #[serde(default)]
    pub provider: Option<ProviderSelection>,

    #[serde(default)]
    pub previous_tests: Option<String>,

    #[serde(default)]
    pub build_log: Option<String>,

    #[serde(default)]
    pub coverage_report: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ProviderSelection {
    pub kind: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub stage: &'static str,
    pub provider: &'static str,
    pub model: String,
    /// Generated tests, or placeholder output when `fallback` is set.
    pub tests: String,
    pub fallback: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structural summary of an analyzed repository, when one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub repo_url: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub filename: String,
    pub content: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/* ============================================================
   Handlers
   ============================================================ */

pub async fn health() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn providers() -> Json<Value> {
    Json(json!({
        "success": true,
        "providers": provider::catalog(),
    }))
}

/// Run one pipeline stage. Backend failures still answer 200 with
/// placeholder tests; only malformed requests are rejected.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ServiceError> {
    let stage = Stage::parse(&req.stage)
        .ok_or_else(|| ServiceError::BadRequest(format!("unknown stage: {}", req.stage)))?;
    let cfg = resolve_provider(&state, req.provider.as_ref())?;
    let request_id = Uuid::new_v4().to_string();

    let (source, analysis_summary, analysis) = assemble_source(&state, &req).await?;

    let previous_tests = req
        .previous_tests
        .as_deref()
        .filter(|t| !t.trim().is_empty());
    if stage.needs_previous_tests() && previous_tests.is_none() {
        return Err(ServiceError::BadRequest(format!(
            "stage `{}` requires previous_tests",
            stage.name()
        )));
    }

    // absent build/coverage data falls back to the illustrative samples
    let build_log: Option<&str> = match stage {
        Stage::BuildFix => Some(
            req.build_log
                .as_deref()
                .filter(|l| !l.trim().is_empty())
                .unwrap_or(samples::SAMPLE_BUILD_LOG),
        ),
        _ => None,
    };
    let coverage_report: Option<&str> = match stage {
        Stage::Coverage => Some(
            req.coverage_report
                .as_deref()
                .filter(|r| !r.trim().is_empty())
                .unwrap_or(samples::SAMPLE_COVERAGE_REPORT),
        ),
        _ => None,
    };

    let ctx = prompt::StageContext {
        source: &source,
        analysis: analysis_summary.as_deref(),
        previous_tests,
        build_log,
        coverage_report,
    };
    let llm_prompt = prompt::build_prompt(stage, &ctx);

    info!(
        %request_id,
        stage = stage.name(),
        provider = cfg.kind.key(),
        model = %cfg.model,
        "dispatching generation request"
    );

    match backend::run(&cfg, &llm_prompt).await {
        Ok(result) => Ok(Json(GenerateResponse {
            success: true,
            stage: stage.name(),
            provider: cfg.kind.key(),
            model: cfg.model,
            tests: result.text,
            fallback: false,
            request_id,
            error: None,
            analysis,
        })),

        Err(err) => {
            warn!(
                %request_id,
                provider = cfg.kind.key(),
                error = %err,
                "backend failed; returning placeholder tests"
            );
            let reason = err.to_string();
            Ok(Json(GenerateResponse {
                success: false,
                stage: stage.name(),
                provider: cfg.kind.key(),
                model: cfg.model,
                tests: fallback::placeholder_tests(&source, &reason),
                fallback: true,
                request_id,
                error: Some(reason),
                analysis,
            }))
        }
    }
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<Value>, ServiceError> {
    let repo_url = parse_repo_url(&req.repo_url)?;
    let report =
        analyzer::analyze_repository(&state.config.analyzer_script, repo_url.as_str()).await?;
    Ok(Json(json!({ "success": true, "report": report })))
}

/// Illustrative build result. No compiler runs here.
pub async fn build_report() -> Json<Value> {
    let errors = samples::categorize_build_errors(samples::SAMPLE_BUILD_LOG);
    Json(json!({
        "success": true,
        "build_success": false,
        "output": samples::SAMPLE_BUILD_LOG,
        "errors": errors,
    }))
}

/// Illustrative coverage result. No instrumentation runs here.
pub async fn coverage_report() -> Json<Value> {
    Json(json!({
        "success": true,
        "report": samples::SAMPLE_COVERAGE_REPORT,
        "files": samples::parse_coverage(samples::SAMPLE_COVERAGE_REPORT),
        "overall_coverage": samples::overall_coverage(samples::SAMPLE_COVERAGE_REPORT),
    }))
}

/// Return caller-supplied text as a single-file attachment.
pub async fn download(Json(req): Json<DownloadRequest>) -> Result<Response, ServiceError> {
    let filename = sanitize_filename(&req.filename)?;
    let content_type = req
        .content_type
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "text/plain; charset=utf-8".to_string());

    let headers = [
        (header::CONTENT_TYPE, content_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, req.content).into_response())
}

/* ============================================================
   Helpers
   ============================================================ */

fn resolve_provider(
    state: &AppState,
    selection: Option<&ProviderSelection>,
) -> Result<ProviderConfig, ServiceError> {
    match selection {
        Some(sel) => {
            let kind = ProviderKind::parse(&sel.kind)
                .ok_or_else(|| ServiceError::BadRequest(format!("unknown provider: {}", sel.kind)))?;
            let model = sel
                .model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| kind.default_model().to_string());
            Ok(ProviderConfig {
                kind,
                model,
                base_url: sel.base_url.clone(),
                api_key: sel.api_key.clone(),
            })
        }
        None => {
            let kind = state.config.default_provider;
            let model = state
                .config
                .default_model
                .clone()
                .unwrap_or_else(|| kind.default_model().to_string());
            Ok(ProviderConfig {
                kind,
                model,
                base_url: None,
                api_key: None,
            })
        }
    }
}

/// Pick the source text for the prompt, analyzing a repository when one
/// was submitted. Repository analysis is best-effort here: a failed scan
/// degrades to a bare URL mention rather than failing the stage.
async fn assemble_source(
    state: &AppState,
    req: &GenerateRequest,
) -> Result<(String, Option<String>, Option<Value>), ServiceError> {
    if let Some(code) = req.source.as_deref().filter(|s| !s.trim().is_empty()) {
        return Ok((code.to_string(), None, None));
    }

    if let Some(files) = req.files.as_ref().filter(|f| !f.is_empty()) {
        let mut joined = String::new();
        for file in files {
            joined.push_str(&format!("// File: {}\n", file.name));
            joined.push_str(file.content.trim_end());
            joined.push_str("\n\n");
        }
        return Ok((joined, None, None));
    }

    if let Some(raw_url) = req.repo_url.as_deref().filter(|u| !u.trim().is_empty()) {
        let repo_url = parse_repo_url(raw_url)?;
        return match analyzer::analyze_repository(&state.config.analyzer_script, repo_url.as_str())
            .await
        {
            Ok(report) => {
                let summary = analyzer::summarize_for_prompt(&report);
                Ok((
                    format!("// Repository under test: {}", repo_url),
                    Some(summary),
                    report.get("summary").cloned(),
                ))
            }
            Err(err) => {
                warn!(%repo_url, error = %err, "repository analysis unavailable, continuing without it");
                Ok((
                    format!(
                        "// Repository under test: {}\n// (structural analysis unavailable: {})",
                        repo_url, err
                    ),
                    None,
                    None,
                ))
            }
        };
    }

    Err(ServiceError::BadRequest(
        "one of source, files, or repo_url is required".into(),
    ))
}

fn parse_repo_url(raw: &str) -> Result<url::Url, ServiceError> {
    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| ServiceError::BadRequest(format!("invalid repository URL: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ServiceError::BadRequest(format!(
            "unsupported URL scheme: {}",
            parsed.scheme()
        )));
    }
    Ok(parsed)
}

fn sanitize_filename(raw: &str) -> Result<String, ServiceError> {
    let base = raw
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let name: String = base
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();

    if name.is_empty() || name == "." || name == ".." {
        return Err(ServiceError::BadRequest("filename is required".into()));
    }
    Ok(name)
}
