//! Reactive slot store
//!
//! Single source of truth for page state. Producers write partial updates,
//! consumers subscribe to slot writes or take snapshots.
//!
//! # Architecture
//!
//! ```text
//! write(Patch) ──► validate every entry ──► apply in order
//!                                              │
//!                   any source slot written ──► derive `tags` once
//!                                           ──► derive `initialisationStatus` once
//!                                              │
//!                   release borrow ──► notify subscribers slot by slot
//! ```
//!
//! A derived slot is notified at most once per write, with its final value:
//! `tags` right after the last tag source in the patch, the status last.
//!
//! The interior borrow is released before any callback runs, so callbacks
//! may read or write the store.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use thiserror::Error;

use crate::store::readiness::{evaluate, Readiness};
use crate::store::slot::{SlotName, SlotValue};
use crate::store::snapshot::{SlotRead, Snapshot};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("the store cannot be reset; write individual slots instead")]
    ResetForbidden,
    #[error("slot `{0}` is derived and cannot be written")]
    DerivedSlot(SlotName),
    #[error("slot `{slot}` does not accept a {found} value")]
    SlotTypeMismatch { slot: SlotName, found: &'static str },
}

// =============================================================================
// Patch
// =============================================================================

/// An ordered partial update. Each entry sets a slot or clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    entries: Vec<(SlotName, Option<SlotValue>)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, slot: SlotName, value: impl Into<SlotValue>) -> Self {
        self.put(slot, Some(value.into()));
        self
    }

    pub fn clear(mut self, slot: SlotName) -> Self {
        self.put(slot, None);
        self
    }

    /// Repeating a slot replaces its earlier entry in place
    pub fn put(&mut self, slot: SlotName, value: Option<SlotValue>) {
        match self.entries.iter_mut().find(|(name, _)| *name == slot) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((slot, value)),
        }
    }

    pub fn slots(&self) -> impl Iterator<Item = SlotName> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn validate(&self) -> Result<(), StoreError> {
        for (slot, value) in &self.entries {
            if slot.is_derived() {
                return Err(StoreError::DerivedSlot(*slot));
            }
            if let Some(value) = value {
                if !slot.accepts(value) {
                    return Err(StoreError::SlotTypeMismatch {
                        slot: *slot,
                        found: value.kind(),
                    });
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Store
// =============================================================================

type Callback = dyn Fn(SlotName, Option<&SlotValue>);

struct Subscriber {
    id: u64,
    active: Cell<bool>,
    callback: Box<Callback>,
}

#[derive(Default)]
struct Inner {
    snapshot: Snapshot,
    subscribers: Vec<Rc<Subscriber>>,
    next_id: u64,
}

/// Shared handle; clones refer to the same store
#[derive(Clone, Default)]
pub struct Store {
    inner: Rc<RefCell<Inner>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Store")
            .field("snapshot", &inner.snapshot)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `patch` and notify subscribers.
    ///
    /// Nothing is applied if any entry is rejected.
    pub fn write(&self, patch: Patch) -> Result<(), StoreError> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        let notifications = {
            let mut inner = self.inner.borrow_mut();
            let snapshot = &mut inner.snapshot;
            let status_before = snapshot.initialisation_status();
            let mut last_source = None;
            let mut out = Vec::with_capacity(patch.entries.len() + 2);

            for (slot, value) in patch.entries {
                snapshot.put(slot, value.clone());
                if slot.tag_source().is_some() {
                    last_source = Some(out.len());
                }
                out.push((slot, value));
            }

            // derived slots see the whole patch, never a partial one
            if let Some(index) = last_source {
                let merged = SlotValue::Tags(snapshot.merged_tags());
                if snapshot.put(SlotName::Tags, Some(merged.clone())) {
                    out.insert(index + 1, (SlotName::Tags, Some(merged)));
                }
            }

            let status = snapshot.derive_status();
            if status != status_before {
                let status = SlotValue::Status(status);
                snapshot.put(SlotName::InitialisationStatus, Some(status.clone()));
                out.push((SlotName::InitialisationStatus, Some(status)));
            }
            out
        };

        self.notify(&notifications);
        Ok(())
    }

    /// Shorthand for a single-slot patch
    pub fn set(&self, slot: SlotName, value: impl Into<SlotValue>) -> Result<(), StoreError> {
        self.write(Patch::new().set(slot, value))
    }

    pub fn clear(&self, slot: SlotName) -> Result<(), StoreError> {
        self.write(Patch::new().clear(slot))
    }

    fn notify(&self, notifications: &[(SlotName, Option<SlotValue>)]) {
        let subscribers: Vec<Rc<Subscriber>> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|s| s.active.get());
            inner.subscribers.clone()
        };

        for (slot, value) in notifications {
            for subscriber in &subscribers {
                if subscriber.active.get() {
                    (subscriber.callback)(*slot, value.as_ref());
                }
            }
        }
    }

    /// Register `callback` for every slot write, including derived slots.
    ///
    /// Callbacks run in registration order. The returned handle detaches the
    /// callback when dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(SlotName, Option<&SlotValue>) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        let subscriber = Rc::new(Subscriber {
            id,
            active: Cell::new(true),
            callback: Box::new(callback),
        });
        inner.subscribers.push(Rc::clone(&subscriber));

        Subscription {
            store: Rc::downgrade(&self.inner),
            subscriber: Rc::downgrade(&subscriber),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|s| s.active.get())
            .count()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.borrow().snapshot.clone()
    }

    pub fn get(&self, slot: SlotName) -> Option<SlotValue> {
        self.inner.borrow().snapshot.slot(slot).cloned()
    }

    /// Slots are never reset wholesale. Always fails.
    pub fn reset(&self) -> Result<(), StoreError> {
        log::error!("store reset requested; only individual slot writes are supported");
        Err(StoreError::ResetForbidden)
    }

    /// Untracked readiness read. Use `ReadinessTracker` to be told about
    /// later writes to the slots read here.
    pub fn ready_state(&self, required: &[SlotName], optional: &[SlotName]) -> Readiness {
        evaluate(&self.snapshot(), required, optional, |_| {})
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Detaches its callback on drop
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    store: Weak<RefCell<Inner>>,
    subscriber: Weak<Subscriber>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    pub fn is_active(&self) -> bool {
        self.subscriber
            .upgrade()
            .is_some_and(|subscriber| subscriber.active.get())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscriber) = self.subscriber.upgrade() {
            subscriber.active.set(false);
        }
        if let Some(store) = self.store.upgrade() {
            // Inactive entries are also pruned on the next notify
            if let Ok(mut inner) = store.try_borrow_mut() {
                inner.subscribers.retain(|s| s.id != self.id);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
