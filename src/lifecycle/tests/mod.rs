//! Page-level scenarios: store, readiness gate and controller together

mod dom_tests;
mod navigation_tests;
mod readiness_tests;

use serde_json::json;

use crate::auth::AuthResult;
use crate::config::Config;
use crate::context::definition::{ContextDefinition, DomTagRule};
use crate::lifecycle::controller::ContextController;
use crate::store::slot::{Flags, SlotName};
use crate::store::state::{Patch, Store};

pub(super) fn case_link_rule() -> DomTagRule {
    DomTagRule::new(
        "a[href*='/case-details/']",
        r"/case-details/(?<urn>[^/]+)/(?<caseId>\d+)",
    )
}

pub(super) fn page_config() -> Config {
    Config {
        contexts: vec![
            ContextDefinition::new(r"/cases/(?<caseId>\d+)", "case")
                .with_redirect_url("/cases/{caseId}/signed-in")
                .with_authorisation("case-readers"),
            ContextDefinition::new("/workspace", "workspace").with_dom_tags(vec![case_link_rule()]),
            ContextDefinition::new(".*", "other"),
        ],
        ..Default::default()
    }
}

pub(super) fn authed(groups: &[&str]) -> AuthResult {
    AuthResult::Authed {
        username: "jo@example.gov.uk".to_string(),
        groups: groups.iter().map(|g| g.to_string()).collect(),
        object_id: "oid-1".to_string(),
    }
}

pub(super) fn flags() -> Flags {
    match json!({ "isUiEnabled": true }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// A store with config, flags and auth in place, and a controller on it
pub(super) fn bootstrapped(config: Config) -> (Store, ContextController) {
    let store = Store::new();
    store
        .write(
            Patch::new()
                .set(SlotName::Config, config)
                .set(SlotName::Flags, flags())
                .set(SlotName::Auth, authed(&["case-readers"])),
        )
        .unwrap();
    let controller = ContextController::new(store.clone());
    (store, controller)
}
