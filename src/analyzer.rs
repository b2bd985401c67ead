//! Repository analysis via an external subprocess.
//!
//! The analysis script clones the repository and prints a structural JSON
//! report to stdout. The service treats it as an opaque subprocess: spawn,
//! wait with a fixed five-minute budget, parse stdout. Failures surface as
//! structured errors; this path has no fallback.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

pub const ANALYZER_TIMEOUT: Duration = Duration::from_secs(300);

const STDERR_LIMIT: usize = 4_000;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to run analysis script: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("analysis script timed out after {}s", ANALYZER_TIMEOUT.as_secs())]
    Timeout,

    #[error("analysis script exited with status {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("analysis script produced invalid JSON: {0}")]
    Parse(String),

    #[error("analysis failed: {0}")]
    Script(String),
}

/// Run the analysis script against `repo_url` and return its JSON report.
pub async fn analyze_repository(script: &Path, repo_url: &str) -> Result<Value, AnalyzerError> {
    debug!(script = %script.display(), repo_url, "spawning analysis script");

    let child = Command::new("python3")
        .arg(script)
        .arg(repo_url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    // kill_on_drop reaps the child when the timeout branch drops the future
    let output = match tokio::time::timeout(ANALYZER_TIMEOUT, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => return Err(AnalyzerError::Timeout),
    };

    if !output.status.success() {
        return Err(AnalyzerError::Failed {
            code: output.status.code().unwrap_or(-1),
            stderr: truncate(&String::from_utf8_lossy(&output.stderr), STDERR_LIMIT),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: Value =
        serde_json::from_str(stdout.trim()).map_err(|e| AnalyzerError::Parse(e.to_string()))?;

    // the script reports soft failures as an error field with exit 0
    if let Some(err) = report.get("error").and_then(Value::as_str) {
        return Err(AnalyzerError::Script(err.to_string()));
    }

    Ok(report)
}

/// Condense a report into the text block appended to generation prompts.
pub fn summarize_for_prompt(report: &Value) -> String {
    let mut out = String::new();

    if let Some(url) = report.get("repository_url").and_then(Value::as_str) {
        out.push_str(&format!("Repository: {}\n", url));
    }
    if let Some(n) = report.get("files_analyzed").and_then(Value::as_u64) {
        out.push_str(&format!("Files analyzed: {}\n", n));
    }

    if let Some(summary) = report.get("summary") {
        for (label, key) in [
            ("Classes", "total_classes"),
            ("Methods", "total_methods"),
            ("Free functions", "total_functions"),
        ] {
            if let Some(v) = summary.get(key).and_then(Value::as_u64) {
                out.push_str(&format!("{}: {}\n", label, v));
            }
        }
        if let Some(names) = joined_list(summary, "unique_namespaces", 12) {
            out.push_str(&format!("Namespaces: {}\n", names));
        }
        if let Some(names) = joined_list(summary, "unique_includes", 20) {
            out.push_str(&format!("Includes: {}\n", names));
        }
    }

    if let Some(files) = report.get("detailed_analysis").and_then(Value::as_array) {
        let mut listed = 0usize;
        for file in files {
            let Some(classes) = file.get("classes").and_then(Value::as_array) else {
                continue;
            };
            for class in classes {
                if listed == 40 {
                    return out;
                }
                if let Some(name) = class.get("name").and_then(Value::as_str) {
                    let methods = class
                        .get("methods")
                        .and_then(Value::as_array)
                        .map(|m| m.len())
                        .unwrap_or(0);
                    out.push_str(&format!("class {} ({} methods)\n", name, methods));
                    listed += 1;
                }
            }
        }
    }

    out
}

fn joined_list(summary: &Value, key: &str, limit: usize) -> Option<String> {
    let names: Vec<&str> = summary
        .get(key)?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .take(limit)
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

fn truncate(s: &str, n: usize) -> String {
    if s.chars().count() <= n {
        s.to_string()
    } else {
        let head: String = s.chars().take(n).collect();
        format!("{}\n...truncated...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_the_script_report() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake_analyzer.py");
        std::fs::write(
            &script,
            r#"import json, sys
print(json.dumps({
    "repository_url": sys.argv[1],
    "files_analyzed": 2,
    "summary": {"total_classes": 1, "total_methods": 3, "total_functions": 0,
                "unique_includes": ["vector"], "unique_namespaces": []},
    "detailed_analysis": []
}))
"#,
        )
        .unwrap();

        let report = analyze_repository(&script, "https://example.com/calc.git")
            .await
            .unwrap();
        assert_eq!(report["files_analyzed"], 2);
        assert_eq!(report["repository_url"], "https://example.com/calc.git");
    }

    #[tokio::test]
    async fn error_field_surfaces_as_script_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("failing_analyzer.py");
        std::fs::write(
            &script,
            "import json\nprint(json.dumps({'error': 'Failed to clone repository'}))\n",
        )
        .unwrap();

        let err = analyze_repository(&script, "https://example.com/missing.git")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Script(ref msg) if msg.contains("clone")));
    }

    #[tokio::test]
    async fn missing_script_is_a_hard_failure() {
        let err = analyze_repository(Path::new("/nonexistent/analyzer.py"), "https://example.com")
            .await
            .unwrap_err();
        // python3 exits non-zero when the script path does not resolve
        assert!(matches!(
            err,
            AnalyzerError::Failed { .. } | AnalyzerError::Spawn(_)
        ));
    }

    #[test]
    fn summary_includes_class_roster() {
        let report = serde_json::json!({
            "repository_url": "https://example.com/calc.git",
            "files_analyzed": 3,
            "summary": {
                "total_classes": 2,
                "total_methods": 5,
                "total_functions": 1,
                "unique_includes": ["vector", "string"],
                "unique_namespaces": ["calc"]
            },
            "detailed_analysis": [
                { "file": "src/calculator.hpp",
                  "classes": [ { "name": "Calculator", "methods": ["add", "sub"] } ] }
            ]
        });

        let text = summarize_for_prompt(&report);
        assert!(text.contains("Files analyzed: 3"));
        assert!(text.contains("Classes: 2"));
        assert!(text.contains("Namespaces: calc"));
        assert!(text.contains("class Calculator (2 methods)"));
    }

    #[test]
    fn truncate_marks_cut_output() {
        assert_eq!(truncate("short", 10), "short");
        assert!(truncate(&"x".repeat(50), 10).contains("...truncated..."));
    }
}
