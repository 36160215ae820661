//! Context Matcher: first-match resolution of the current address
//!
//! # Algorithm
//! 1. Canonicalize the address (sorted query string)
//! 2. Walk definitions in authored order, and each definition's patterns in order
//! 3. The first pattern that matches wins; nothing after it is evaluated
//!
//! There is no scoring. Definitions must be ordered most-specific-first by
//! whoever writes the configuration. A pattern that does not compile is
//! reported and treated as "does not match".

use serde::Serialize;

use super::address::canonicalize;
use super::definition::{ContextDefinition, FoundContext, MatchedContext};
use super::pattern::{compile, named_captures};

/// Detailed result of a match run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    pub found: FoundContext,
    /// Address actually tested against the patterns
    pub canonical_address: String,
    /// Number of definitions looked at before stopping
    pub evaluated: usize,
    /// Patterns that failed to compile during this run
    pub invalid_patterns: usize,
}

/// Resolve `address` against the ordered `definitions`
pub fn match_context(address: &str, definitions: &[ContextDefinition]) -> FoundContext {
    match_context_detailed(address, definitions).found
}

/// Like [`match_context`], also reporting how far the search went
pub fn match_context_detailed(address: &str, definitions: &[ContextDefinition]) -> MatchOutcome {
    let canonical_address = canonicalize(address);
    let mut evaluated = 0;
    let mut invalid_patterns = 0;

    for (context_index, definition) in definitions.iter().enumerate() {
        evaluated += 1;

        for path in &definition.paths {
            let re = match compile(path) {
                Ok(re) => re,
                Err(err) => {
                    invalid_patterns += 1;
                    log::warn!(
                        "context definition {context_index} ({}): {err}; pattern skipped",
                        definition.contexts
                    );
                    continue;
                }
            };

            if let Some(path_tags) = named_captures(&re, &canonical_address) {
                log::debug!(
                    "address `{canonical_address}` matched context {context_index} ({})",
                    definition.contexts
                );
                return MatchOutcome {
                    found: FoundContext::Found(MatchedContext {
                        definition: definition.clone(),
                        path_tags,
                        context_index,
                        matched_path: path.clone(),
                    }),
                    canonical_address,
                    evaluated,
                    invalid_patterns,
                };
            }
        }
    }

    log::debug!("address `{canonical_address}` matched no context");
    MatchOutcome {
        found: FoundContext::NotFound,
        canonical_address,
        evaluated,
        invalid_patterns,
    }
}
