//! gtestsmith — LLM-assisted unit test generation service for C++ projects.
//!
//! Request flow: JSON API (`server`/`routes`) → stage prompt (`stage`,
//! `llm::prompt`) → provider dispatch (`llm::backend`) → generated text,
//! or the `llm::fallback` placeholder when the backend fails. Repository
//! submissions are summarized by an external script (`analyzer`); build
//! and coverage data are illustrative samples (`samples`).

pub mod analyzer;
pub mod config;
pub mod error;
pub mod llm;
pub mod provider;
pub mod routes;
pub mod samples;
pub mod server;
pub mod stage;
