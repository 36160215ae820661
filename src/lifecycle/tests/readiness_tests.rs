//! Readiness gate behaviour across a page bootstrap

use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

use super::{authed, bootstrapped, flags, page_config};
use crate::dom::document::Document;
use crate::store::readiness::{Readiness, ReadinessTracker};
use crate::store::slot::{ErrorRecord, InitialisationStatus, SlotName};
use crate::store::snapshot::SlotRead;
use crate::store::state::Store;

#[test]
fn test_required_pair_transitions_to_ready() {
    let store = Store::new();
    store.set(SlotName::Flags, flags()).unwrap();

    let readiness = store.ready_state(&[SlotName::Flags, SlotName::Auth], &[]);
    match &readiness {
        Readiness::NotReady(snapshot) => {
            assert!(snapshot.contains(SlotName::Flags));
            assert!(!snapshot.contains(SlotName::Auth));
        }
        Readiness::Ready(_) => panic!("auth has not been written"),
    }

    store.set(SlotName::Auth, authed(&[])).unwrap();

    let readiness = store.ready_state(&[SlotName::Flags, SlotName::Auth], &[]);
    let state = readiness.ready().expect("both slots written");
    assert!(state.flags().is_some());
    assert!(state.auth().is_some_and(|a| a.is_authed()));
}

#[test]
fn test_everything_mode_reports_real_status() {
    let store = Store::new();
    let readiness = store.ready_state(&[], &[]);
    assert!(readiness.is_ready());
    assert_eq!(readiness.state().initialisation_status(), InitialisationStatus::Pending);

    let (store, mut controller) = bootstrapped(page_config());
    controller.navigate("/cases/321", &Document::new()).unwrap();

    let readiness = store.ready_state(&[], &[]);
    assert!(readiness.is_ready());
    assert_eq!(readiness.state().initialisation_status(), InitialisationStatus::Ready);
    assert!(readiness.state().context().is_some());
}

#[test]
fn test_status_broken_on_fatal_error() {
    let (store, _controller) = bootstrapped(page_config());
    store
        .set(SlotName::FatalInitialisationError, ErrorRecord::new("flags endpoint returned 500"))
        .unwrap();

    let readiness = store.ready_state(&[SlotName::Config], &[]);
    let state = readiness.ready().unwrap();
    assert_eq!(state.initialisation_status(), InitialisationStatus::Broken);
    assert!(state.error(SlotName::FatalInitialisationError).is_some());
}

#[test]
fn test_tracker_rerenders_when_context_resolves() {
    let (store, mut controller) = bootstrapped(page_config());
    let renders: Rc<RefCell<Vec<SlotName>>> = Rc::default();
    let log = Rc::clone(&renders);
    let tracker = ReadinessTracker::new(&store, move |slot| log.borrow_mut().push(slot));

    assert!(!tracker
        .ready_state(&[SlotName::Context, SlotName::Tags], &[SlotName::CaseDetails])
        .is_ready());

    controller.navigate("/cases/321", &Document::new()).unwrap();

    let renders = renders.borrow();
    assert!(renders.contains(&SlotName::Context));
    assert!(renders.contains(&SlotName::Tags));
    assert!(renders.contains(&SlotName::InitialisationStatus));
    assert!(!renders.contains(&SlotName::PathTags));

    let readiness = tracker.ready_state(&[SlotName::Context, SlotName::Tags], &[SlotName::CaseDetails]);
    let state = readiness.ready().unwrap();
    assert_eq!(state.tags().get("caseId").map(String::as_str), Some("321"));
    assert!(!state.contains(SlotName::CaseDetails));
}
