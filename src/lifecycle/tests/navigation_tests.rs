//! Controller resolution, soft navigation and failure recovery

use pretty_assertions::assert_eq;

use super::{authed, bootstrapped, page_config};
use crate::auth::AuthorisationOutcome;
use crate::config::Config;
use crate::context::definition::{ContextDefinition, FoundContext};
use crate::dom::document::Document;
use crate::lifecycle::controller::{ContextController, Phase, ResolveError};
use crate::store::slot::{InitialisationStatus, SlotName};
use crate::store::snapshot::SlotRead;
use crate::store::state::Store;
use crate::tags::{tags_from, Tags};

#[test]
fn test_case_address_resolves() {
    let (store, mut controller) = bootstrapped(page_config());
    assert_eq!(controller.phase(), Phase::Idle);

    let resolution = controller.navigate("/cases/321", &Document::new()).unwrap();

    assert_eq!(controller.phase(), Phase::Bound);
    assert_eq!(resolution.found.context_index(), Some(0));
    assert_eq!(resolution.canonical_address, "/cases/321");

    let snapshot = store.snapshot();
    let matched = snapshot.context().and_then(FoundContext::matched).unwrap();
    assert_eq!(matched.definition.contexts, "case");
    assert_eq!(matched.path_tags, tags_from([("caseId", "321")]));
    assert_eq!(snapshot.tags_of(SlotName::PathTags), Some(&tags_from([("caseId", "321")])));
    assert_eq!(snapshot.tags_of(SlotName::DomTags), Some(&Tags::new()));
    assert_eq!(snapshot.initialisation_status(), InitialisationStatus::Ready);
}

#[test]
fn test_found_context_wire_shape() {
    let (store, mut controller) = bootstrapped(page_config());
    controller.navigate("/cases/321", &Document::new()).unwrap();

    let value = serde_json::to_value(store.snapshot().context().unwrap()).unwrap();
    assert_eq!(value["found"], true);
    assert_eq!(value["contextIndex"], 0);
    assert_eq!(value["contexts"], "case");
    assert_eq!(value["tags"]["caseId"], "321");
}

#[test]
fn test_soft_navigation_keeps_prop_tags() {
    let (store, mut controller) = bootstrapped(page_config());
    store.set(SlotName::PropTags, tags_from([("lang", "en")])).unwrap();
    controller.navigate("/cases/321", &Document::new()).unwrap();
    assert_eq!(store.snapshot().tags().get("caseId").map(String::as_str), Some("321"));

    controller.navigate("/search?q=x", &Document::new()).unwrap();

    let snapshot = store.snapshot();
    assert_eq!(snapshot.tags_of(SlotName::PathTags), Some(&Tags::new()));
    assert_eq!(snapshot.tags_of(SlotName::DomTags), Some(&Tags::new()));
    assert_eq!(snapshot.tags(), tags_from([("lang", "en")]));
    assert_eq!(snapshot.context().and_then(FoundContext::context_index), Some(2));
}

#[test]
fn test_query_order_does_not_change_context() {
    let config = Config {
        contexts: vec![
            ContextDefinition::new(r"/search\?a=1&b=2", "sorted-search"),
            ContextDefinition::new(".*", "other"),
        ],
        ..Default::default()
    };
    let (_store, mut controller) = bootstrapped(config);

    let first = controller.navigate("https://example.gov.uk/search?b=2&a=1", &Document::new()).unwrap();
    let second = controller.navigate("https://example.gov.uk/search?a=1&b=2", &Document::new()).unwrap();

    assert_eq!(first.found, second.found);
    assert_eq!(first.found.context_index(), Some(0));
}

#[test]
fn test_missing_config_breaks_then_recovers() {
    let store = Store::new();
    let mut controller = ContextController::new(store.clone());

    let result = controller.navigate("/cases/321", &Document::new());

    assert!(matches!(result, Err(ResolveError::MissingConfig)));
    assert_eq!(controller.phase(), Phase::Idle);
    let snapshot = store.snapshot();
    assert!(snapshot.error(SlotName::ContextError).is_some());
    assert_eq!(snapshot.initialisation_status(), InitialisationStatus::Broken);

    store.set(SlotName::Config, page_config()).unwrap();
    controller.navigate("/cases/321", &Document::new()).unwrap();

    let snapshot = store.snapshot();
    assert!(!snapshot.contains(SlotName::ContextError));
    assert_eq!(snapshot.initialisation_status(), InitialisationStatus::Pending);
    assert_eq!(controller.phase(), Phase::Bound);
}

#[test]
fn test_no_match_is_not_an_error() {
    let config = Config {
        contexts: vec![ContextDefinition::new("/only-here", "narrow")],
        ..Default::default()
    };
    let (store, mut controller) = bootstrapped(config);

    let resolution = controller.navigate("/somewhere-else", &Document::new()).unwrap();

    assert_eq!(resolution.found, FoundContext::NotFound);
    assert_eq!(store.snapshot().initialisation_status(), InitialisationStatus::Ready);
    assert_eq!(controller.redirect_url(), None);
}

#[test]
fn test_authorisation_outcomes() {
    let (store, mut controller) = bootstrapped(page_config());
    controller.navigate("/cases/321", &Document::new()).unwrap();
    assert_eq!(controller.authorisation(), AuthorisationOutcome::Authorised);

    store.set(SlotName::Auth, authed(&["someone-else"])).unwrap();
    assert!(matches!(
        controller.authorisation(),
        AuthorisationOutcome::Unauthorised { .. }
    ));

    store.clear(SlotName::Auth).unwrap();
    assert_eq!(controller.authorisation(), AuthorisationOutcome::Pending);

    controller.navigate("/workspace", &Document::new()).unwrap();
    assert_eq!(controller.authorisation(), AuthorisationOutcome::NotRequired);
}

#[test]
fn test_redirect_url_uses_merged_tags() {
    let (store, mut controller) = bootstrapped(page_config());
    controller.navigate("/cases/321", &Document::new()).unwrap();

    let rendered = controller.redirect_url().unwrap();
    assert_eq!(rendered.output, "/cases/321/signed-in");
    assert!(rendered.is_complete());

    store.set(SlotName::PropTags, tags_from([("caseId", "999")])).unwrap();
    assert_eq!(controller.redirect_url().unwrap().output, "/cases/999/signed-in");
}

#[test]
fn test_show_menu_override() {
    let mut config = page_config();
    config.show_menu = false;
    config.contexts[1].show_menu = Some(true);
    let (_store, mut controller) = bootstrapped(config);

    controller.navigate("/cases/321", &Document::new()).unwrap();
    assert!(!controller.show_menu());

    controller.navigate("/workspace", &Document::new()).unwrap();
    assert!(controller.show_menu());
}
