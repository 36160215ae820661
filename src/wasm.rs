//! JS bindings
//!
//! One `NavCore` per page. The host forwards the page markup on navigation
//! and, from its MutationObserver, the outer HTML of each mutated element
//! together with that element's position.
//!
//! Subscribers run synchronously inside `navigate` and `observeHtml` and may
//! call back into the core: reads and slot writes are always allowed, a
//! nested `navigate` or `observeHtml` is rejected with an error.
//!
//! ```javascript,ignore
//! const core = new NavCore(JSON.stringify(config));
//! core.subscribe((slot) => rerender(core.readyState(['context'], [])));
//! core.writeSlot('flags', flags);
//! core.writeSlot('auth', { isAuthed: true, username, groups, objectId });
//! core.navigate(location.href, document.body.outerHTML);
//!
//! // element-child indices from the parsed root; [0] is <body>
//! const pathOf = (el) => {
//!     const path = [];
//!     for (; el !== document.body; el = el.parentElement) {
//!         path.unshift(Array.prototype.indexOf.call(el.parentElement.children, el));
//!     }
//!     return Uint32Array.from([0, ...path]);
//! };
//! new MutationObserver((records) => {
//!     for (const r of records) {
//!         const el = r.target.nodeType === Node.ELEMENT_NODE ? r.target : r.target.parentElement;
//!         if (el && document.body.contains(el)) core.observeHtml(pathOf(el), el.outerHTML);
//!     }
//! }).observe(document.body, { subtree: true, childList: true, attributes: true, characterData: true });
//! ```

use serde::Serialize;
use std::cell::{Cell, RefCell, RefMut};
use wasm_bindgen::prelude::*;

use crate::config::Config;
use crate::dom::document::Document;
use crate::lifecycle::controller::{self, ContextController, Phase};
use crate::store::slot::{SlotName, SlotValue};
use crate::store::state::{Patch, Store, Subscription};

fn to_js<E: std::fmt::Display>(err: E) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Serialize with maps as plain objects
fn to_js_value<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(to_js)
}

fn parse_slots(names: &[String]) -> Result<Vec<SlotName>, JsValue> {
    names
        .iter()
        .map(|name| name.parse::<SlotName>().map_err(|e| JsValue::from_str(&e)))
        .collect()
}

/// Exclusive access for a resolution call, or an error if one is running
fn exclusive<'a, T>(cell: &'a RefCell<T>, call: &str) -> Result<RefMut<'a, T>, JsValue> {
    cell.try_borrow_mut()
        .map_err(|_| JsValue::from_str(&format!("{call} called from a subscriber while the core is busy")))
}

#[wasm_bindgen]
pub struct NavCore {
    store: Store,
    controller: RefCell<ContextController>,
    document: RefCell<Document>,
    /// Mirrors the controller phase; readable while the controller is busy
    phase: Cell<Phase>,
    subscriptions: RefCell<Vec<Option<Subscription>>>,
}

#[wasm_bindgen]
impl NavCore {
    /// Create a core with `config_json` already in the `config` slot
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<NavCore, JsValue> {
        let config = Config::from_json(config_json).map_err(to_js)?;
        let store = Store::new();
        store.set(SlotName::Config, config).map_err(to_js)?;

        Ok(NavCore {
            controller: RefCell::new(ContextController::new(store.clone())),
            store,
            document: RefCell::new(Document::new()),
            phase: Cell::new(Phase::Idle),
            subscriptions: RefCell::new(Vec::new()),
        })
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve the context for `href` against the page markup `html`.
    /// Returns the resolution summary; failures are also written to
    /// `contextError`.
    #[wasm_bindgen]
    pub fn navigate(&self, href: &str, html: &str) -> Result<JsValue, JsValue> {
        let mut controller = exclusive(&self.controller, "navigate")?;
        let mut document = exclusive(&self.document, "navigate")?;
        *document = Document::parse(html);

        self.phase.set(Phase::Resolving);
        let result = controller.navigate(href, &document);
        self.phase.set(controller.phase());
        to_js_value(&result.map_err(to_js)?)
    }

    /// Run the incremental pass for one mutated element: `path` is its
    /// element-child index path from the root, `html` its outer markup.
    /// Returns the tags found, or `undefined` if nothing changed or the batch
    /// was skipped.
    #[wasm_bindgen(js_name = observeHtml)]
    pub fn observe_html(&self, path: &[u32], html: &str) -> Result<JsValue, JsValue> {
        let mut controller = exclusive(&self.controller, "observeHtml")?;
        let mut document = exclusive(&self.document, "observeHtml")?;
        let path: Vec<usize> = path.iter().map(|index| *index as usize).collect();

        match controller
            .observe_markup(&mut document, &path, html)
            .map_err(to_js)?
        {
            Some(tags) => to_js_value(&tags),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    #[wasm_bindgen]
    pub fn phase(&self) -> String {
        format!("{:?}", self.phase.get()).to_lowercase()
    }

    // ========================================================================
    // Store
    // ========================================================================

    /// Write one slot. `null`/`undefined` clears it.
    #[wasm_bindgen(js_name = writeSlot)]
    pub fn write_slot(&self, name: &str, value: JsValue) -> Result<(), JsValue> {
        let slot: SlotName = name.parse().map_err(|e: String| JsValue::from_str(&e))?;
        let json: serde_json::Value = if value.is_undefined() {
            serde_json::Value::Null
        } else {
            serde_wasm_bindgen::from_value(value).map_err(to_js)?
        };
        let decoded = SlotValue::from_json(slot, json)
            .map_err(|e| JsValue::from_str(&format!("slot `{slot}`: {e}")))?;

        let mut patch = Patch::new();
        patch.put(slot, decoded);
        self.store.write(patch).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setPropTags)]
    pub fn set_prop_tags(&self, tags: JsValue) -> Result<(), JsValue> {
        self.write_slot(SlotName::PropTags.as_str(), tags)
    }

    /// `{ isReady, state }` for the given slot names. No names: everything.
    #[wasm_bindgen(js_name = readyState)]
    pub fn ready_state(&self, required: Vec<String>, optional: Vec<String>) -> Result<JsValue, JsValue> {
        let required = parse_slots(&required)?;
        let optional = parse_slots(&optional)?;
        to_js_value(&self.store.ready_state(&required, &optional))
    }

    #[wasm_bindgen]
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.store.snapshot())
    }

    /// Call `callback(slotName, value)` on every slot write.
    /// Returns an id for `unsubscribe`.
    #[wasm_bindgen]
    pub fn subscribe(&self, callback: js_sys::Function) -> usize {
        let subscription = self.store.subscribe(move |slot, value| {
            let value = match value {
                Some(value) => to_js_value(value).unwrap_or(JsValue::NULL),
                None => JsValue::UNDEFINED,
            };
            if let Err(err) = callback.call2(&JsValue::NULL, &JsValue::from_str(slot.as_str()), &value) {
                log::warn!("subscriber threw on `{slot}`: {err:?}");
            }
        });
        let mut subscriptions = self.subscriptions.borrow_mut();
        subscriptions.push(Some(subscription));
        subscriptions.len() - 1
    }

    #[wasm_bindgen]
    pub fn unsubscribe(&self, id: usize) -> bool {
        // released before the subscription drops
        let taken = self
            .subscriptions
            .borrow_mut()
            .get_mut(id)
            .and_then(Option::take);
        taken.is_some()
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Redirect URL of the matched context, placeholders filled from tags
    #[wasm_bindgen(js_name = redirectUrl)]
    pub fn redirect_url(&self) -> Option<String> {
        controller::redirect_url(&self.store.snapshot()).map(|rendered| rendered.output)
    }

    /// `{ outcome: "authorised" | "unauthorised" | "pending" | "notRequired" }`
    #[wasm_bindgen]
    pub fn authorisation(&self) -> Result<JsValue, JsValue> {
        to_js_value(&controller::authorisation(&self.store.snapshot()))
    }

    #[wasm_bindgen(js_name = showMenu)]
    pub fn show_menu(&self) -> bool {
        controller::show_menu(&self.store.snapshot())
    }
}
