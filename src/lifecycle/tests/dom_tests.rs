//! DOM tag extraction driven by the controller

use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

use super::{bootstrapped, page_config};
use crate::config::{Config, DomObservationConfig};
use crate::context::definition::{ContextDefinition, DomTagRule};
use crate::dom::document::{Document, NodeId};
use crate::dom::selector::Selector;
use crate::lifecycle::controller::Phase;
use crate::store::slot::{SlotName, SlotValue};
use crate::store::snapshot::SlotRead;
use crate::tags::{tags_from, Tags};

const WORKSPACE_PAGE: &str = r#"<main><nav><a href="/case-details/foo/123">Case</a></nav></main>"#;

fn first_anchor(doc: &Document) -> NodeId {
    Selector::parse("a").unwrap().select_inclusive(doc, doc.root())[0]
}

#[test]
fn test_activation_scan_writes_dom_tags() {
    let (store, mut controller) = bootstrapped(page_config());
    let doc = Document::parse(WORKSPACE_PAGE);

    let resolution = controller.navigate("/workspace", &doc).unwrap();

    assert_eq!(resolution.rule_diff.added.len(), 1);
    assert_eq!(resolution.dom_tags, tags_from([("urn", "foo"), ("caseId", "123")]));
    assert_eq!(
        store.snapshot().tags_of(SlotName::DomTags),
        Some(&tags_from([("urn", "foo"), ("caseId", "123")]))
    );
}

#[test]
fn test_href_mutation_reaches_merged_tags() {
    let (store, mut controller) = bootstrapped(page_config());
    let mut doc = Document::parse(WORKSPACE_PAGE);
    controller.navigate("/workspace", &doc).unwrap();

    let anchor = first_anchor(&doc);
    doc.set_attribute(anchor, "href", "/case-details/bar/456");
    let records = doc.take_records();

    let observed = controller.observe(&doc, &records).unwrap();

    assert_eq!(observed, Some(tags_from([("urn", "bar"), ("caseId", "456")])));
    assert_eq!(
        store.snapshot().tags(),
        tags_from([("urn", "bar"), ("caseId", "456")])
    );
}

#[test]
fn test_observe_overlays_existing_dom_tags() {
    let (store, mut controller) = bootstrapped(page_config());
    let mut doc = Document::parse(r#"<main><a href="/case-details/foo/123">Case</a><p>x</p></main>"#);
    controller.navigate("/workspace", &doc).unwrap();
    store.set(SlotName::PropTags, tags_from([("lang", "cy")])).unwrap();

    let main = Selector::parse("main").unwrap().select_inclusive(&doc, doc.root())[0];
    doc.append_html(main, r#"<section data-x="1">no links</section>"#);
    let records = doc.take_records();

    assert_eq!(controller.observe(&doc, &records).unwrap(), Some(Tags::new()));
    assert_eq!(
        store.snapshot().tags(),
        tags_from([("urn", "foo"), ("caseId", "123"), ("lang", "cy")])
    );
}

#[test]
fn test_rebinding_on_navigation() {
    let (store, mut controller) = bootstrapped(page_config());
    let doc = Document::parse(WORKSPACE_PAGE);
    controller.navigate("/workspace", &doc).unwrap();
    assert!(controller.extractor().is_bound());

    let resolution = controller.navigate("/cases/1", &doc).unwrap();

    assert_eq!(resolution.rule_diff.removed.len(), 1);
    assert!(!controller.extractor().is_bound());
    assert_eq!(store.snapshot().tags_of(SlotName::DomTags), Some(&Tags::new()));
    assert_eq!(store.snapshot().tags(), tags_from([("caseId", "1")]));

    let again = controller.navigate("/workspace", &doc).unwrap();
    let same = controller.navigate("/workspace", &doc).unwrap();
    assert_eq!(again.rule_diff.added.len(), 1);
    assert_eq!(same.rule_diff.kept, 1);
    assert!(same.rule_diff.added.is_empty());
}

#[test]
fn test_observe_ignored_when_not_bound() {
    let (store, mut controller) = bootstrapped(page_config());
    let mut doc = Document::parse(WORKSPACE_PAGE);
    let anchor = first_anchor(&doc);
    doc.set_attribute(anchor, "href", "/case-details/bar/456");
    let records = doc.take_records();

    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(controller.observe(&doc, &records).unwrap(), None);
    assert!(!store.snapshot().contains(SlotName::DomTags));
}

#[test]
fn test_circuit_breaker_pauses_until_navigation() {
    let mut config = page_config();
    config.dom_observation = DomObservationConfig {
        max_events: 2,
        window_ms: 60_000.0,
    };
    let (store, mut controller) = bootstrapped(config);
    let mut doc = Document::parse(WORKSPACE_PAGE);
    controller.navigate("/workspace", &doc).unwrap();
    let anchor = first_anchor(&doc);

    for n in 1..=2 {
        doc.set_attribute(anchor, "href", &format!("/case-details/u{n}/{n}"));
        let records = doc.take_records();
        assert!(controller.observe(&doc, &records).unwrap().is_some());
    }

    doc.set_attribute(anchor, "href", "/case-details/u3/3");
    let records = doc.take_records();
    assert_eq!(controller.observe(&doc, &records).unwrap(), None);
    assert!(controller.is_observation_paused());
    assert_eq!(store.snapshot().tags().get("urn").map(String::as_str), Some("u2"));

    controller.navigate("/workspace", &doc).unwrap();
    assert!(!controller.is_observation_paused());
    assert_eq!(store.snapshot().tags().get("urn").map(String::as_str), Some("u3"));
}

#[test]
fn test_forwarded_markup_processed_once() {
    let (store, mut controller) = bootstrapped(page_config());
    let mut doc = Document::parse(WORKSPACE_PAGE);
    controller.navigate("/workspace", &doc).unwrap();
    let forwarded = r#"<a href="/case-details/bar/456">Case</a>"#;

    let first = controller.observe_markup(&mut doc, &[0, 0, 0], forwarded).unwrap();
    let capacity = doc.capacity();
    let second = controller.observe_markup(&mut doc, &[0, 0, 0], forwarded).unwrap();
    let third = controller.observe_markup(&mut doc, &[0, 0, 0], forwarded).unwrap();

    assert_eq!(first, Some(tags_from([("urn", "bar"), ("caseId", "456")])));
    assert_eq!((second, third), (None, None));
    assert_eq!(doc.capacity(), capacity);
    assert_eq!(controller.extractor().marked_count(), 1);
    assert_eq!(store.snapshot().tags(), tags_from([("urn", "bar"), ("caseId", "456")]));
}

#[test]
fn test_forwarded_subtree_keeps_arena_bounded() {
    let (store, mut controller) = bootstrapped(page_config());
    let mut doc = Document::parse(r#"<main><ul id="list"></ul></main>"#);
    controller.navigate("/workspace", &doc).unwrap();

    // alternate the item tag so every batch swaps the whole subtree
    for n in 1..=20 {
        let tag = if n % 2 == 0 { "li" } else { "p" };
        let html = format!(r#"<ul id="list"><{tag}><a href="/case-details/u{n}/{n}">x</a></{tag}></ul>"#);
        controller.observe_markup(&mut doc, &[0, 0], &html).unwrap();
    }

    assert_eq!(store.snapshot().tags().get("urn").map(String::as_str), Some("u20"));
    // root, main, ul, one live item of three nodes
    assert_eq!(doc.node_count(), 6);
    // plus the three slots the outgoing item held during a swap
    assert_eq!(doc.capacity(), 9);
}

#[test]
fn test_descendant_rule_on_forwarded_markup() {
    let config = Config {
        contexts: vec![ContextDefinition::new("/workspace", "workspace").with_dom_tags(vec![
            DomTagRule::new(
                "nav a[href*='/case-details/']",
                r"/case-details/(?<urn>[^/]+)/(?<caseId>\d+)",
            ),
        ])],
        ..Default::default()
    };
    let (store, mut controller) = bootstrapped(config);
    let mut doc = Document::parse(WORKSPACE_PAGE);
    controller.navigate("/workspace", &doc).unwrap();
    assert_eq!(store.snapshot().tags(), tags_from([("urn", "foo"), ("caseId", "123")]));

    let observed = controller
        .observe_markup(&mut doc, &[0, 0, 0], r#"<a href="/case-details/bar/456">Case</a>"#)
        .unwrap();

    assert_eq!(observed, Some(tags_from([("urn", "bar"), ("caseId", "456")])));
    assert_eq!(store.snapshot().tags(), tags_from([("urn", "bar"), ("caseId", "456")]));
}

#[test]
fn test_forwarded_markup_with_unknown_path_ignored() {
    let (store, mut controller) = bootstrapped(page_config());
    let mut doc = Document::parse(WORKSPACE_PAGE);
    controller.navigate("/workspace", &doc).unwrap();

    let observed = controller
        .observe_markup(&mut doc, &[0, 3], r#"<a href="/case-details/bar/456">x</a>"#)
        .unwrap();

    assert_eq!(observed, None);
    assert_eq!(store.snapshot().tags().get("urn").map(String::as_str), Some("foo"));
}

#[test]
fn test_link_leaving_rule_drops_its_tags() {
    let (store, mut controller) = bootstrapped(page_config());
    let mut doc = Document::parse(
        r#"<main><a id="one" href="/case-details/foo/123">1</a><p data-ref="x">x</p></main>"#,
    );
    controller.navigate("/workspace", &doc).unwrap();
    store.set(SlotName::PropTags, tags_from([("lang", "cy")])).unwrap();

    let anchor = first_anchor(&doc);
    doc.set_attribute(anchor, "href", "/about");
    let records = doc.take_records();

    assert_eq!(controller.observe(&doc, &records).unwrap(), Some(Tags::new()));
    assert_eq!(store.snapshot().tags_of(SlotName::DomTags), Some(&Tags::new()));
    assert_eq!(store.snapshot().tags(), tags_from([("lang", "cy")]));
}

#[test]
fn test_removed_link_drops_its_tags_but_keeps_others() {
    let (store, mut controller) = bootstrapped(page_config());
    let mut doc = Document::parse(
        r#"<main><section><a href="/case-details/foo/123">1</a></section><aside><a href="/case-details/keep/9">2</a></aside></main>"#,
    );
    controller.navigate("/workspace", &doc).unwrap();
    assert_eq!(store.snapshot().tags(), tags_from([("urn", "keep"), ("caseId", "9")]));

    controller
        .observe_markup(&mut doc, &[0, 1], "<aside></aside>")
        .unwrap();

    assert_eq!(store.snapshot().tags(), tags_from([("urn", "foo"), ("caseId", "123")]));
}

#[test]
fn test_navigation_never_publishes_previous_dom_tags() {
    let (store, mut controller) = bootstrapped(page_config());
    let doc = Document::parse(WORKSPACE_PAGE);
    controller.navigate("/workspace", &doc).unwrap();

    let published = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&published);
    let _subscription = store.subscribe(move |slot, value| {
        if let (SlotName::Tags, Some(SlotValue::Tags(tags))) = (slot, value) {
            sink.borrow_mut().push(tags.clone());
        }
    });

    controller.navigate("/cases/1", &doc).unwrap();

    assert_eq!(*published.borrow(), vec![Tags::new(), tags_from([("caseId", "1")])]);
}
