//! Browser backends for wasm32 builds: [`PaqQueue`] pushes onto
//! `window._paq` and [`BrowserDocument`] works against the live DOM.
//!
//! Both are stateless and look the page up on every call, so they are
//! trivially `Send + Sync`.

use std::collections::BTreeMap;

use js_sys::{Array, Function, Reflect};
use tracing::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use matomo_core::Command;

use crate::document::{ClickHandler, ClickTarget, Document, ScriptTag};
use crate::queue::CommandQueue;

const PAQ: &str = "_paq";

/// `window._paq`, created as an empty array on first use.
///
/// Once the Matomo script has loaded it replaces the array with an object
/// whose `push` executes commands immediately; pushes go through whatever
/// `push` the current value exposes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaqQueue;

impl PaqQueue {
    fn obtain() -> Option<JsValue> {
        let window = web_sys::window()?;
        let key = JsValue::from_str(PAQ);
        let existing = Reflect::get(&window, &key).ok()?;
        if !existing.is_undefined() && !existing.is_null() {
            return Some(existing);
        }
        let queue: JsValue = Array::new().into();
        Reflect::set(&window, &key, &queue).ok()?;
        debug!("window._paq created");
        Some(queue)
    }
}

impl CommandQueue for PaqQueue {
    fn len(&self) -> usize {
        match Self::obtain() {
            Some(queue) => match queue.dyn_ref::<Array>() {
                Some(array) => array.length() as usize,
                // The loaded tracker has already drained the initial array.
                None => 1,
            },
            None => 0,
        }
    }

    fn push(&self, command: Command) {
        let Some(queue) = Self::obtain() else {
            warn!("no window; command dropped");
            return;
        };
        let json = match serde_json::to_string(&command) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "command serialization failed; command dropped");
                return;
            }
        };
        let Ok(tuple) = js_sys::JSON::parse(&json) else {
            warn!(%json, "JSON.parse rejected command; command dropped");
            return;
        };
        let push = Reflect::get(&queue, &JsValue::from_str("push"))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok());
        let Some(push) = push else {
            warn!("window._paq has no push function; command dropped");
            return;
        };
        if let Err(e) = push.call1(&queue, &tuple) {
            warn!(error = ?e, command = %json, "window._paq.push threw");
        }
    }
}

/// The live `window.document`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserDocument;

impl BrowserDocument {
    fn document() -> Option<web_sys::Document> {
        web_sys::window()?.document()
    }
}

fn click_target(element: &web_sys::Element) -> ClickTarget {
    let attributes: BTreeMap<String, String> = element
        .get_attribute_names()
        .iter()
        .filter_map(|name| name.as_string())
        .filter_map(|name| {
            let value = element.get_attribute(&name)?;
            Some((name, value))
        })
        .collect();
    ClickTarget::new(attributes)
}

impl Document for BrowserDocument {
    fn title(&self) -> String {
        Self::document().map(|d| d.title()).unwrap_or_default()
    }

    fn location(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().href().ok())
            .unwrap_or_default()
    }

    fn has_script(&self, src: &str) -> bool {
        let Some(document) = Self::document() else {
            return false;
        };
        let scripts = document.get_elements_by_tag_name("script");
        (0..scripts.length())
            .filter_map(|i| scripts.item(i))
            .any(|s| s.get_attribute("src").as_deref() == Some(src))
    }

    fn insert_script(&self, tag: &ScriptTag) {
        let Some(document) = Self::document() else {
            return;
        };
        let Ok(element) = document.create_element("script") else {
            return;
        };
        for (name, value) in tag.attributes() {
            let _ = element.set_attribute(name, &value);
        }

        let first = document.get_elements_by_tag_name("script").item(0);
        let inserted = match first {
            Some(first) => {
                let first: &web_sys::Node = &first;
                first
                    .parent_node()
                    .map(|parent| parent.insert_before(&element, Some(first)).is_ok())
            }
            None => document
                .head()
                .map(|head| head.append_child(&element).is_ok()),
        };
        debug!(src = %tag.src, inserted = inserted.unwrap_or(false), "script element inserted");
    }

    fn add_click_listeners(&self, attribute: &str, value: &str, handler: ClickHandler) -> usize {
        let Some(document) = Self::document() else {
            return 0;
        };
        let selector = format!("[{attribute}=\"{value}\"]");
        let Ok(nodes) = document.query_selector_all(&selector) else {
            return 0;
        };

        let mut bound = 0;
        for element in (0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
        {
            let handler = handler.clone();
            let target = element.clone();
            let listener = Closure::<dyn Fn(web_sys::Event)>::new(move |_event: web_sys::Event| {
                if let Err(e) = handler(&click_target(&target)) {
                    wasm_bindgen::throw_str(&e.to_string());
                }
            });
            if element
                .add_event_listener_with_callback("click", listener.as_ref().unchecked_ref())
                .is_ok()
            {
                bound += 1;
            }
            // Listeners live as long as the page.
            listener.forget();
        }
        bound
    }
}
