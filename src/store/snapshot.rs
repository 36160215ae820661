//! Immutable views of store state
//!
//! `Snapshot` is the full raw state. `SlotRead` gives typed access to any
//! slot map, shared by snapshots and ready states.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::auth::AuthResult;
use crate::config::Config;
use crate::context::definition::FoundContext;
use crate::store::slot::{ErrorRecord, Flags, InitialisationStatus, SlotName, SlotValue};
use crate::tags::{merge, Tags};

// =============================================================================
// SlotRead
// =============================================================================

/// Typed getters over a slot map
pub trait SlotRead {
    fn slot(&self, name: SlotName) -> Option<&SlotValue>;

    fn contains(&self, name: SlotName) -> bool {
        self.slot(name).is_some()
    }

    fn config(&self) -> Option<&Config> {
        match self.slot(SlotName::Config) {
            Some(SlotValue::Config(config)) => Some(&**config),
            _ => None,
        }
    }

    fn flags(&self) -> Option<&Flags> {
        match self.slot(SlotName::Flags) {
            Some(SlotValue::Flags(flags)) => Some(&**flags),
            _ => None,
        }
    }

    fn auth(&self) -> Option<&AuthResult> {
        match self.slot(SlotName::Auth) {
            Some(SlotValue::Auth(auth)) => Some(&**auth),
            _ => None,
        }
    }

    fn context(&self) -> Option<&FoundContext> {
        match self.slot(SlotName::Context) {
            Some(SlotValue::Context(found)) => Some(&**found),
            _ => None,
        }
    }

    /// Tags held by any tag-valued slot
    fn tags_of(&self, name: SlotName) -> Option<&Tags> {
        match self.slot(name) {
            Some(SlotValue::Tags(tags)) => Some(tags),
            _ => None,
        }
    }

    /// Merged tags, empty when nothing has been merged yet
    fn tags(&self) -> Tags {
        self.tags_of(SlotName::Tags).cloned().unwrap_or_default()
    }

    fn error(&self, name: SlotName) -> Option<&ErrorRecord> {
        match self.slot(name) {
            Some(SlotValue::Error(record)) => Some(record),
            _ => None,
        }
    }

    fn initialisation_status(&self) -> InitialisationStatus {
        match self.slot(SlotName::InitialisationStatus) {
            Some(SlotValue::Status(status)) => *status,
            _ => InitialisationStatus::default(),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    slots: BTreeMap<SlotName, SlotValue>,
}

impl Default for Snapshot {
    /// Fresh page state: every slot absent except the status
    fn default() -> Self {
        let mut slots = BTreeMap::new();
        slots.insert(
            SlotName::InitialisationStatus,
            SlotValue::Status(InitialisationStatus::Pending),
        );
        Self { slots }
    }
}

impl SlotRead for Snapshot {
    fn slot(&self, name: SlotName) -> Option<&SlotValue> {
        self.slots.get(&name)
    }
}

impl Snapshot {
    pub fn get(&self, name: SlotName) -> Option<&SlotValue> {
        self.slots.get(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotName, &SlotValue)> {
        self.slots.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Set or clear a slot. Returns whether the stored value changed.
    pub(crate) fn put(&mut self, name: SlotName, value: Option<SlotValue>) -> bool {
        match value {
            Some(value) => self.slots.insert(name, value.clone()).as_ref() != Some(&value),
            None => self.slots.remove(&name).is_some(),
        }
    }

    /// Overlay of the four tag sources
    pub fn merged_tags(&self) -> Tags {
        merge(|source| self.tags_of(source.into()))
    }

    pub fn derive_status(&self) -> InitialisationStatus {
        if self.contains(SlotName::FatalInitialisationError) || self.contains(SlotName::ContextError) {
            InitialisationStatus::Broken
        } else if SlotName::INITIALISATION.iter().all(|slot| self.contains(*slot)) {
            InitialisationStatus::Ready
        } else {
            InitialisationStatus::Pending
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::tags_from;

    #[test]
    fn test_default_holds_pending_status() {
        let snapshot = Snapshot::default();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.initialisation_status(), InitialisationStatus::Pending);
        assert!(snapshot.tags().is_empty());
    }

    #[test]
    fn test_put_reports_change() {
        let mut snapshot = Snapshot::default();
        let tags = SlotValue::Tags(tags_from([("a", "1")]));

        assert!(snapshot.put(SlotName::PropTags, Some(tags.clone())));
        assert!(!snapshot.put(SlotName::PropTags, Some(tags)));
        assert!(snapshot.put(SlotName::PropTags, None));
        assert!(!snapshot.put(SlotName::PropTags, None));
    }

    #[test]
    fn test_merged_tags_precedence() {
        let mut snapshot = Snapshot::default();
        snapshot.put(SlotName::PropTags, Some(tags_from([("k", "prop")]).into()));
        snapshot.put(SlotName::PathTags, Some(tags_from([("k", "path"), ("p", "1")]).into()));

        assert_eq!(snapshot.merged_tags(), tags_from([("k", "prop"), ("p", "1")]));
    }

    #[test]
    fn test_derive_status() {
        let mut snapshot = Snapshot::default();
        snapshot.put(SlotName::Config, Some(Config::default().into()));
        snapshot.put(SlotName::Flags, Some(Flags::new().into()));
        snapshot.put(SlotName::Context, Some(FoundContext::NotFound.into()));
        assert_eq!(snapshot.derive_status(), InitialisationStatus::Pending);

        snapshot.put(
            SlotName::Auth,
            Some(
                AuthResult::Unauthed {
                    reason_code: "none".to_string(),
                    reason: "none".to_string(),
                }
                .into(),
            ),
        );
        assert_eq!(snapshot.derive_status(), InitialisationStatus::Ready);

        snapshot.put(SlotName::ContextError, Some(ErrorRecord::new("bad").into()));
        assert_eq!(snapshot.derive_status(), InitialisationStatus::Broken);
    }
}
