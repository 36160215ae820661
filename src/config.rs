//! Configuration document
//!
//! Loaded once per page, before context resolution can start. Holds the
//! ordered context definitions plus global settings.
//!
//! Context order is an authoring contract: the matcher takes the first
//! definition that matches. `lint` reports definitions that can never be
//! reached so a misordered file is noticed, but nothing is reordered or
//! rejected.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::context::definition::ContextDefinition;
use crate::context::pattern::compile;
use crate::dom::extractor::CompiledRule;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Limits for mutation-driven DOM extraction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomObservationConfig {
    /// Mutation batches allowed within one window
    pub max_events: u32,
    pub window_ms: f64,
}

impl Default for DomObservationConfig {
    fn default() -> Self {
        Self {
            max_events: 100,
            window_ms: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default)]
    pub contexts: Vec<ContextDefinition>,
    #[serde(default)]
    pub dom_observation: DomObservationConfig,
    /// Menu visibility when the matched context does not override it
    #[serde(default = "default_show_menu")]
    pub show_menu: bool,
}

fn default_show_menu() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: None,
            contexts: Vec::new(),
            dom_observation: DomObservationConfig::default(),
            show_menu: default_show_menu(),
        }
    }
}

/// A problem found in the configuration at load time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConfigDiagnostic {
    /// An address pattern does not compile and will never match
    #[error("context {context_index}: {message}")]
    InvalidPath { context_index: usize, message: String },
    /// A DOM tag rule does not compile and will be skipped
    #[error("context {context_index}: DOM tag rule: {message}")]
    InvalidDomTag { context_index: usize, message: String },
    /// An earlier catch-all definition hides this one
    #[error("context {context_index} is unreachable: context {shadowed_by} matches every address")]
    Unreachable { context_index: usize, shadowed_by: usize },
    /// The same pattern already appears in an earlier definition
    #[error("context {context_index}: pattern `{path}` already used by context {first_index}")]
    DuplicatePath { context_index: usize, path: String, first_index: usize },
}

// =============================================================================
// Loading
// =============================================================================

impl Config {
    /// Parse JSON and log any lint findings
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.log_diagnostics();
        Ok(config)
    }

    pub fn log_diagnostics(&self) {
        for diagnostic in self.lint() {
            log::warn!("configuration: {diagnostic}");
        }
    }

    /// Load-time checks. Never fails; callers decide what to do with findings.
    pub fn lint(&self) -> Vec<ConfigDiagnostic> {
        let mut out = Vec::new();
        let mut seen_paths: Vec<(String, usize)> = Vec::new();
        let mut catch_all: Option<usize> = None;

        for (index, definition) in self.contexts.iter().enumerate() {
            if let Some(shadowed_by) = catch_all {
                out.push(ConfigDiagnostic::Unreachable {
                    context_index: index,
                    shadowed_by,
                });
            }

            for path in &definition.paths {
                if let Err(err) = compile(path) {
                    out.push(ConfigDiagnostic::InvalidPath {
                        context_index: index,
                        message: err.to_string(),
                    });
                    continue;
                }
                let key = path.to_lowercase();
                match seen_paths.iter().find(|(p, _)| *p == key) {
                    Some((_, first_index)) if *first_index != index => {
                        out.push(ConfigDiagnostic::DuplicatePath {
                            context_index: index,
                            path: path.clone(),
                            first_index: *first_index,
                        });
                    }
                    Some(_) => {}
                    None => seen_paths.push((key, index)),
                }
                if catch_all.is_none() && is_catch_all(path) {
                    catch_all = Some(index);
                }
            }

            let mut seen_rules = HashSet::new();
            for rule in &definition.dom_tags {
                if !seen_rules.insert(rule) {
                    continue;
                }
                if let Err(err) = CompiledRule::compile(rule) {
                    out.push(ConfigDiagnostic::InvalidDomTag {
                        context_index: index,
                        message: err.to_string(),
                    });
                }
            }
        }
        out
    }
}

/// Patterns that match any address
fn is_catch_all(path: &str) -> bool {
    matches!(
        path.trim(),
        "" | ".*" | "^.*" | "^.*$" | ".*$" | "(.*)" | "^(.*)$" | ".+" | "^.+$"
    )
}
