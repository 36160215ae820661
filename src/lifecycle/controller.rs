//! ContextController: drives context resolution for one page
//!
//! # State Machine
//! ```text
//!   Idle ──navigate──► Resolving ──ok──► Bound ──navigate──► Resolving ...
//!                          │                │
//!                          └──error──► Idle └──observe──► incremental DOM pass
//! ```
//!
//! # Resolving
//! 1. Clear `contextError`, `context`, `pathTags`, `domTags`
//! 2. Match the address against `config.contexts`
//! 3. Write `context` and `pathTags`
//! 4. Rebind DOM tag rules to the new context, scan once, write `domTags`
//!
//! Failures land in `contextError`, which turns `initialisationStatus` to
//! `broken`. The next navigation clears it again. `propTags` and
//! `caseDetailsTags` belong to other producers and are never touched here.

use instant::Instant;
use serde::Serialize;
use std::rc::Rc;
use thiserror::Error;

use crate::auth::{check_authorisation, AuthorisationOutcome};
use crate::config::Config;
use crate::context::definition::FoundContext;
use crate::context::matcher::match_context_detailed;
use crate::dom::document::{Document, MutationRecord};
use crate::dom::extractor::{DomTagExtractor, RuleDiff};
use crate::lifecycle::circuit_breaker::CircuitBreaker;
use crate::store::slot::{ErrorRecord, SlotName, SlotValue};
use crate::store::snapshot::SlotRead;
use crate::store::state::{Patch, Store, StoreError};
use crate::tags::{overlay, render, Rendered, Tags};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No context bound; initial state and the state after a failure
    Idle,
    Resolving,
    /// Context bound, DOM rules active
    Bound,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no configuration loaded; cannot resolve context")]
    MissingConfig,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Summary of one navigation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub found: FoundContext,
    pub canonical_address: String,
    pub rule_diff: RuleDiff,
    /// Tags from the activation scan
    pub dom_tags: Tags,
    pub elapsed_us: u64,
}

// =============================================================================
// ContextController
// =============================================================================

#[derive(Debug)]
pub struct ContextController {
    store: Store,
    extractor: DomTagExtractor,
    breaker: CircuitBreaker,
    phase: Phase,
}

impl ContextController {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            extractor: DomTagExtractor::new(),
            breaker: CircuitBreaker::default(),
            phase: Phase::Idle,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn extractor(&self) -> &DomTagExtractor {
        &self.extractor
    }

    pub fn is_observation_paused(&self) -> bool {
        self.breaker.is_tripped()
    }

    /// Resolve the context for `address` with `doc` as the current page.
    ///
    /// On error the failure is also recorded in `contextError` and the
    /// controller goes back to `Idle`.
    pub fn navigate(&mut self, address: &str, doc: &Document) -> Result<Resolution, ResolveError> {
        let started = Instant::now();
        self.phase = Phase::Resolving;

        match self.resolve(address, doc) {
            Ok(mut resolution) => {
                resolution.elapsed_us = started.elapsed().as_micros() as u64;
                self.phase = Phase::Bound;
                log::info!(
                    "context resolved in {}us: {}",
                    resolution.elapsed_us,
                    describe(&resolution.found)
                );
                Ok(resolution)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn resolve(&mut self, address: &str, doc: &Document) -> Result<Resolution, ResolveError> {
        self.store.write(
            Patch::new()
                .clear(SlotName::ContextError)
                .clear(SlotName::Context)
                .clear(SlotName::PathTags)
                .clear(SlotName::DomTags),
        )?;

        let config: Rc<Config> = match self.store.get(SlotName::Config) {
            Some(SlotValue::Config(config)) => config,
            _ => return Err(ResolveError::MissingConfig),
        };
        self.breaker.reconfigure(&config.dom_observation);

        let outcome = match_context_detailed(address, &config.contexts);
        let found = outcome.found;
        let rule_diff = self.extractor.bind(found.dom_tag_rules());
        if !rule_diff.is_unchanged() {
            log::debug!(
                "DOM tag rules: {} added, {} removed, {} kept, {} rejected",
                rule_diff.added.len(),
                rule_diff.removed.len(),
                rule_diff.kept,
                rule_diff.rejected.len()
            );
        }

        self.store.write(
            Patch::new()
                .set(SlotName::Context, found.clone())
                .set(SlotName::PathTags, found.path_tags()),
        )?;

        if let AuthorisationOutcome::Unauthorised { reason } = self.authorisation() {
            log::info!("context {}: {reason}", describe(&found));
        }

        let dom_tags = if self.extractor.is_bound() {
            self.extractor.scan(doc, doc.root())
        } else {
            Tags::new()
        };
        self.store.set(SlotName::DomTags, dom_tags.clone())?;

        Ok(Resolution {
            found,
            canonical_address: outcome.canonical_address,
            rule_diff,
            dom_tags,
            elapsed_us: 0,
        })
    }

    fn fail(&mut self, err: &ResolveError) {
        log::error!("context resolution failed: {err}");
        self.phase = Phase::Idle;
        self.extractor.unbind();
        if let Err(write_err) = self.store.set(SlotName::ContextError, ErrorRecord::from(err)) {
            log::error!("could not record context error: {write_err}");
        }
    }

    /// Feed a mutation batch to the incremental pass.
    ///
    /// Returns the tags this batch produced, or `None` when the batch was not
    /// processed (not bound, no rules, or observation paused). New tags are
    /// overlaid onto the current `domTags`. If an element stopped producing a
    /// tag, `domTags` is rebuilt from a scan of `doc` instead.
    pub fn observe(&mut self, doc: &Document, records: &[MutationRecord]) -> Result<Option<Tags>, ResolveError> {
        if self.phase != Phase::Bound || !self.extractor.is_bound() || records.is_empty() {
            return Ok(None);
        }
        if !self.breaker.record() {
            return Ok(None);
        }

        let observed = self.extractor.observe(doc, records);
        if observed.dropped {
            log::debug!("DOM tags went stale; rescanning the page");
            let dom_tags = self.extractor.scan(doc, doc.root());
            self.store.set(SlotName::DomTags, dom_tags)?;
        } else if !observed.tags.is_empty() {
            let mut dom_tags = self
                .store
                .snapshot()
                .tags_of(SlotName::DomTags)
                .cloned()
                .unwrap_or_default();
            overlay(&mut dom_tags, &observed.tags);
            self.store.set(SlotName::DomTags, dom_tags)?;
        }
        Ok(Some(observed.tags))
    }

    /// Apply forwarded markup to `doc` and run the incremental pass.
    ///
    /// `path` locates the mutated element by element-child indices from the
    /// root and `html` is its current outer markup. Unchanged markup queues no
    /// records and the batch is skipped.
    pub fn observe_markup(
        &mut self,
        doc: &mut Document,
        path: &[usize],
        html: &str,
    ) -> Result<Option<Tags>, ResolveError> {
        let Some(target) = doc.element_at_path(path) else {
            log::warn!("no element at {path:?}; mutation ignored until the next navigation");
            return Ok(None);
        };
        if !doc.sync_outer_html(target, html) {
            log::warn!("markup forwarded for {path:?} holds no element; mutation ignored");
            return Ok(None);
        }
        let records = doc.take_records();
        self.observe(doc, &records)
    }

    pub fn authorisation(&self) -> AuthorisationOutcome {
        authorisation(&self.store.snapshot())
    }

    pub fn redirect_url(&self) -> Option<Rendered> {
        redirect_url(&self.store.snapshot())
    }

    pub fn show_menu(&self) -> bool {
        show_menu(&self.store.snapshot())
    }
}

// =============================================================================
// Queries over store state
// =============================================================================

/// Whether the current user may see the matched context
pub fn authorisation(state: &impl SlotRead) -> AuthorisationOutcome {
    let requirement = state
        .context()
        .and_then(FoundContext::matched)
        .and_then(|m| m.definition.authorisation.as_ref());
    check_authorisation(requirement, state.auth())
}

/// The matched context's redirect URL rendered against the merged tags
pub fn redirect_url(state: &impl SlotRead) -> Option<Rendered> {
    let template = state
        .context()
        .and_then(FoundContext::matched)
        .and_then(|m| m.definition.redirect_url.as_deref())?;

    let rendered = render(template, &state.tags());
    if !rendered.is_complete() {
        log::debug!("redirect URL `{template}` has no tags for {:?}", rendered.missing);
    }
    Some(rendered)
}

/// Menu visibility: the context override, else the configured default
pub fn show_menu(state: &impl SlotRead) -> bool {
    state
        .context()
        .and_then(FoundContext::matched)
        .and_then(|m| m.definition.show_menu)
        .or_else(|| state.config().map(|c| c.show_menu))
        .unwrap_or(true)
}

fn describe(found: &FoundContext) -> String {
    match found.matched() {
        Some(m) => format!("#{} ({})", m.context_index, m.definition.contexts),
        None => "no context".to_string(),
    }
}
