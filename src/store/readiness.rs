//! Readiness gate
//!
//! Consumers declare which slots they need (`required`) and which they can
//! use when present (`optional`). They get either a `Ready` state holding
//! exactly those slots or a `NotReady` raw snapshot to render a placeholder
//! from.
//!
//! Every requested slot is read, present or not. `ReadinessTracker` keeps
//! the read set and calls back when any of those slots is written again.

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::store::slot::{SlotName, SlotValue};
use crate::store::snapshot::{SlotRead, Snapshot};
use crate::store::state::{Store, Subscription};
use crate::tags::Tags;

// =============================================================================
// Types
// =============================================================================

/// The requested slots, plus the always-present ones
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReadyState {
    slots: BTreeMap<SlotName, SlotValue>,
}

impl SlotRead for ReadyState {
    fn slot(&self, name: SlotName) -> Option<&SlotValue> {
        self.slots.get(&name)
    }
}

impl ReadyState {
    pub fn slot_names(&self) -> impl Iterator<Item = SlotName> + '_ {
        self.slots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl From<&Snapshot> for ReadyState {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            slots: snapshot.iter().map(|(name, value)| (name, value.clone())).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    Ready(ReadyState),
    NotReady(Snapshot),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready(_))
    }

    pub fn ready(&self) -> Option<&ReadyState> {
        match self {
            Readiness::Ready(state) => Some(state),
            Readiness::NotReady(_) => None,
        }
    }

    /// Whichever view this result carries
    pub fn state(&self) -> &dyn SlotRead {
        match self {
            Readiness::Ready(state) => state,
            Readiness::NotReady(snapshot) => snapshot,
        }
    }
}

/// JS shape: `{ isReady, state }`
impl Serialize for Readiness {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_struct("Readiness", 2)?;
        out.serialize_field("isReady", &self.is_ready())?;
        match self {
            Readiness::Ready(state) => out.serialize_field("state", state)?,
            Readiness::NotReady(snapshot) => out.serialize_field("state", snapshot)?,
        }
        out.end()
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluate readiness against `snapshot`, reporting each slot read.
///
/// With no slot names at all every slot counts as read and the result is
/// always `Ready` with the full state.
pub fn evaluate<F>(snapshot: &Snapshot, required: &[SlotName], optional: &[SlotName], mut on_read: F) -> Readiness
where
    F: FnMut(SlotName),
{
    if required.is_empty() && optional.is_empty() {
        SlotName::ALL.into_iter().for_each(&mut on_read);
        return Readiness::Ready(ReadyState::from(snapshot));
    }

    let mut state = ReadyState::default();
    let mut ready = true;
    let requested = required
        .iter()
        .map(|slot| (*slot, true))
        .chain(optional.iter().map(|slot| (*slot, false)))
        .chain(SlotName::ALWAYS_PRESENT.into_iter().map(|slot| (slot, false)));

    for (slot, is_required) in requested {
        on_read(slot);
        match snapshot.get(slot) {
            Some(value) => {
                state.slots.insert(slot, value.clone());
            }
            None if slot == SlotName::Tags => {
                state.slots.insert(slot, SlotValue::Tags(Tags::new()));
            }
            None if is_required => ready = false,
            None => {}
        }
    }

    if ready {
        Readiness::Ready(state)
    } else {
        Readiness::NotReady(snapshot.clone())
    }
}

// =============================================================================
// Tracker
// =============================================================================

/// A consumer's view of the store with dependency tracking.
///
/// Slots read through `ready_state` become interests. A later write to an
/// interest calls `on_change`. Dropping the tracker unsubscribes.
pub struct ReadinessTracker {
    store: Store,
    interests: Rc<RefCell<BTreeSet<SlotName>>>,
    _subscription: Subscription,
}

impl ReadinessTracker {
    pub fn new<F>(store: &Store, on_change: F) -> Self
    where
        F: Fn(SlotName) + 'static,
    {
        let interests: Rc<RefCell<BTreeSet<SlotName>>> = Rc::default();
        let watched = Rc::clone(&interests);
        let subscription = store.subscribe(move |slot, _| {
            let interested = watched.borrow().contains(&slot);
            if interested {
                on_change(slot);
            }
        });

        Self {
            store: store.clone(),
            interests,
            _subscription: subscription,
        }
    }

    pub fn ready_state(&self, required: &[SlotName], optional: &[SlotName]) -> Readiness {
        let snapshot = self.store.snapshot();
        let mut interests = self.interests.borrow_mut();
        evaluate(&snapshot, required, optional, |slot| {
            interests.insert(slot);
        })
    }

    pub fn interests(&self) -> Vec<SlotName> {
        self.interests.borrow().iter().copied().collect()
    }
}

impl std::fmt::Debug for ReadinessTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessTracker")
            .field("interests", &self.interests())
            .finish()
    }
}
